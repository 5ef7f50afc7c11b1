//! Reader configuration.

use cloudhdf5_io::Credentials;

/// Tunables for a reader instance.
///
/// The defaults target high-latency object storage: large cache blocks,
/// a roomy byte budget, and a worker pool sized well past the CPU count
/// so chunk fetches overlap.
#[derive(Debug, Clone)]
pub struct ReaderConfig {
    /// Bytes per cache block; physical reads are multiples of this.
    pub block_size: u64,
    /// Total bytes the block cache may retain.
    pub cache_budget: usize,
    /// Worker threads for per-dataset and per-chunk parallelism.
    pub workers: usize,
    /// Region for object-storage requests.
    pub region: String,
    /// Injected credentials for object storage.
    pub credentials: Option<Credentials>,
    /// Byte-swap big-endian data to native order on read.
    pub native_order: bool,
}

fn default_workers() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (cpus * 4).min(32)
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            block_size: cloudhdf5_io::DEFAULT_BLOCK_SIZE,
            cache_budget: cloudhdf5_io::DEFAULT_CACHE_BUDGET,
            workers: default_workers(),
            region: "us-west-2".to_string(),
            credentials: None,
            native_order: true,
        }
    }
}

impl ReaderConfig {
    /// Override the cache block size.
    pub fn with_block_size(mut self, block_size: u64) -> Self {
        self.block_size = block_size;
        self
    }

    /// Override the cache byte budget.
    pub fn with_cache_budget(mut self, budget: usize) -> Self {
        self.cache_budget = budget;
        self
    }

    /// Override the worker pool size.
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Attach object-storage credentials.
    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Set the object-storage region.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = region.into();
        self
    }
}
