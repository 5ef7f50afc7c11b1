//! The reader: open a resource, resolve dataset paths, and fan out batch
//! reads across the worker pool.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

use rayon::prelude::*;

use cloudhdf5_format::data_object::DataObject;
use cloudhdf5_format::error::FormatError;
use cloudhdf5_format::group;
use cloudhdf5_format::source::ByteSource;
use cloudhdf5_format::superblock::Superblock;
use cloudhdf5_io::{driver_for_url, BlockCache, Driver};

use crate::config::ReaderConfig;
use crate::dataset;
use crate::error::Error;
use crate::promise::{Batch, DatasetHandle};
use crate::types::{attrs_to_map, AttrValue, DatasetData, ReadRequest};

/// A read-only HDF5 reader over a cached byte-range source.
///
/// Object headers are parsed once and memoized by address; resolved
/// paths are cached so a batch touching siblings shares the walk.
pub struct H5Reader {
    source: Arc<BlockCache>,
    superblock: Superblock,
    memo: Mutex<HashMap<u64, Arc<DataObject>>>,
    paths: Mutex<HashMap<String, u64>>,
    pool: rayon::ThreadPool,
    native_order: bool,
}

impl H5Reader {
    /// Open a resource URL (`file:///...`, `s3://bucket/key`, or
    /// `bucket/key`) with the given configuration.
    pub fn open(resource: &str, config: ReaderConfig) -> Result<Self, Error> {
        let driver = driver_for_url(resource, &config.region, config.credentials.clone())?;
        Self::from_driver(driver, config)
    }

    /// Open over an explicit driver.
    pub fn from_driver(driver: Box<dyn Driver>, config: ReaderConfig) -> Result<Self, Error> {
        let source = Arc::new(BlockCache::with_config(
            driver,
            config.block_size,
            config.cache_budget,
        )?);
        let superblock = Superblock::discover(source.as_ref())?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .build()
            .map_err(|e| Error::Pool(e.to_string()))?;
        log::debug!(
            "opened reader: superblock v{}, offsets {} bytes, root at {:#x}",
            superblock.version,
            superblock.offset_size,
            superblock.root_group_address
        );
        Ok(Self {
            source,
            superblock,
            memo: Mutex::new(HashMap::new()),
            paths: Mutex::new(HashMap::new()),
            pool,
            native_order: config.native_order,
        })
    }

    /// The parsed superblock.
    pub fn superblock(&self) -> &Superblock {
        &self.superblock
    }

    /// The block cache backing this reader (stats, budgets).
    pub fn cache(&self) -> &BlockCache {
        &self.source
    }

    /// Parse (or fetch memoized) the object header at an address.
    fn object_at(&self, address: u64) -> Result<Arc<DataObject>, Error> {
        if let Some(obj) = self
            .memo
            .lock()
            .expect("metadata memo poisoned")
            .get(&address)
        {
            return Ok(Arc::clone(obj));
        }
        let parsed = Arc::new(DataObject::parse(
            self.source.as_ref() as &dyn ByteSource,
            address,
            &self.superblock,
        )?);
        // a racing insert is benign: both values decode the same bytes
        self.memo
            .lock()
            .expect("metadata memo poisoned")
            .insert(address, Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Resolve an absolute path to its object.
    pub fn resolve(&self, path: &str) -> Result<Arc<DataObject>, Error> {
        let normalized = group::normalize_path(path).to_string();
        if let Some(&addr) = self
            .paths
            .lock()
            .expect("path cache poisoned")
            .get(&normalized)
        {
            return self.object_at(addr);
        }

        let mut address = self.superblock.root_group_address;
        let mut walked = String::new();
        for segment in group::path_segments(&normalized) {
            let parent = self.object_at(address)?;
            let child = group::find_child(
                self.source.as_ref() as &dyn ByteSource,
                &self.superblock,
                &parent,
                segment,
            )?;
            address = child.ok_or_else(|| {
                Error::Format(FormatError::PathNotFound(path.to_string()))
            })?;
            if !walked.is_empty() {
                walked.push('/');
            }
            walked.push_str(segment);
            self.paths
                .lock()
                .expect("path cache poisoned")
                .insert(walked.clone(), address);
        }

        self.object_at(address)
    }

    /// Attributes of the object at `path` (use `/` for the root group).
    pub fn attributes(&self, path: &str) -> Result<BTreeMap<String, AttrValue>, Error> {
        let object = self.resolve(path)?;
        Ok(attrs_to_map(&object.attributes))
    }

    /// Read one dataset synchronously.
    pub fn read_dataset(&self, request: &ReadRequest) -> Result<DatasetData, Error> {
        let cancel = AtomicBool::new(false);
        self.read_one(request, &cancel)
    }

    fn read_one(&self, request: &ReadRequest, cancel: &AtomicBool) -> Result<DatasetData, Error> {
        let object = self.resolve(&request.dataset)?;
        if !object.is_dataset() {
            return Err(Error::NotADataset(request.dataset.clone()));
        }
        dataset::read_dataset(
            self.source.as_ref() as &dyn ByteSource,
            &self.superblock,
            &object,
            &request.hyperslab,
            &self.pool,
            cancel,
            self.native_order,
        )
    }

    /// Read a batch of datasets, blocking until all complete.
    ///
    /// Paths are resolved serially (cheap once the metadata cache is
    /// warm), then each dataset is assembled on the worker pool. A failed
    /// dataset carries its error; the others still complete.
    pub fn read_datasets(
        &self,
        requests: &[ReadRequest],
    ) -> BTreeMap<String, Result<DatasetData, Error>> {
        // warm the path cache serially so workers share the metadata walk
        for request in requests {
            if let Err(e) = self.resolve(&request.dataset) {
                log::warn!("failed to resolve {}: {e}", request.dataset);
            }
        }

        let cancel = AtomicBool::new(false);
        let results: Vec<(String, Result<DatasetData, Error>)> = self.pool.install(|| {
            requests
                .par_iter()
                .map(|request| {
                    let result = self.read_one(request, &cancel);
                    if let Err(e) = &result {
                        log::warn!("read of {} failed: {e}", request.dataset);
                    }
                    (request.dataset.clone(), result)
                })
                .collect()
        });
        results.into_iter().collect()
    }

    /// Dispatch a batch of dataset reads, returning immediately with a
    /// handle per dataset. Each handle blocks only on first access to its
    /// payload; the batch can be cancelled as a unit.
    pub fn read_datasets_deferred(self: &Arc<Self>, requests: &[ReadRequest]) -> Batch {
        let cancel = Arc::new(AtomicBool::new(false));
        let mut handles = BTreeMap::new();

        for request in requests {
            let path = request.dataset.clone();
            let (handle, state) = DatasetHandle::new(path.clone());
            let reader = Arc::clone(self);
            let request = request.clone();
            let cancel_flag = Arc::clone(&cancel);
            self.pool.spawn(move || {
                let result = reader.read_one(&request, &cancel_flag);
                if let Err(e) = &result {
                    log::warn!("deferred read of {} failed: {e}", request.dataset);
                }
                state.complete(result);
            });
            handles.insert(path, handle);
        }

        Batch::new(handles, cancel)
    }
}
