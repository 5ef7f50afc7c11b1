//! Byte-range drivers and the range-coalescing block cache for the
//! cloudhdf5 reader.
//!
//! Drivers expose `read(offset, length)` + `size()` over local files,
//! memory, and S3-style object storage. The [`BlockCache`] sits between
//! the decoder and a driver, turning many small logical reads into a few
//! large aligned physical reads with LRU retention and per-block
//! single-flight.

pub mod block_cache;
pub mod credentials;
pub mod driver;
#[cfg(feature = "s3")]
pub mod s3;
#[cfg(feature = "s3")]
pub mod sigv4;
pub mod url;

pub use block_cache::{BlockCache, DEFAULT_BLOCK_SIZE, DEFAULT_CACHE_BUDGET};
pub use credentials::Credentials;
pub use driver::{Driver, DriverError, FileDriver, MemoryDriver};
#[cfg(feature = "s3")]
pub use s3::S3Driver;
pub use url::{parse_url, ParsedUrl};

/// Build a driver for a resource URL.
///
/// `file://` URLs open a local file; `s3://bucket/key` and bare
/// `bucket/key` forms target object storage with the given region and
/// optional credentials.
pub fn driver_for_url(
    resource: &str,
    region: &str,
    credentials: Option<Credentials>,
) -> Result<Box<dyn Driver>, DriverError> {
    match parse_url(resource)? {
        ParsedUrl::File(path) => {
            let _ = (region, &credentials);
            Ok(Box::new(FileDriver::open(path)?))
        }
        #[cfg(feature = "s3")]
        ParsedUrl::S3 { bucket, key } => {
            Ok(Box::new(S3Driver::new(&bucket, &key, region, credentials)))
        }
        #[cfg(not(feature = "s3"))]
        ParsedUrl::S3 { .. } => Err(DriverError::InvalidUrl(format!(
            "{resource}: object storage support not compiled in"
        ))),
    }
}
