//! Read-only, cloud-optimized HDF5 reader.
//!
//! cloudhdf5 extracts named datasets and attributes from large HDF5
//! files with a small number of large HTTP range requests, exploiting
//! dataset-level parallelism to amortize object-storage first-byte
//! latency. Local files use the same path through the block cache.
//!
//! ```no_run
//! use cloudhdf5::{H5Reader, ReadRequest, ReaderConfig};
//!
//! let reader = H5Reader::open("s3://bucket/granule.h5", ReaderConfig::default())?;
//! let results = reader.read_datasets(&[
//!     ReadRequest::new("/gt1l/heights/h_ph").with_ranges(&[(0, 1000)]),
//!     ReadRequest::new("/gt1l/heights/delta_time"),
//! ]);
//! let heights = results["/gt1l/heights/h_ph"].as_ref().unwrap().as_f32()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod config;
mod dataset;
pub mod error;
pub mod promise;
pub mod reader;
pub mod types;

pub use config::ReaderConfig;
pub use error::{Error, ErrorKind};
pub use promise::{Batch, DatasetHandle};
pub use reader::H5Reader;
pub use types::{AttrValue, DType, DatasetData, DimSlice, Endian, ReadRequest, TypeClass};

pub use cloudhdf5_io::Credentials;
