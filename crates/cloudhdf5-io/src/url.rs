//! Driver URL parsing: `file:///abs/path`, `s3://bucket/key`, and bare
//! `bucket/key` forms.

use std::path::PathBuf;

use crate::driver::DriverError;

/// A parsed driver URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedUrl {
    /// A local filesystem path.
    File(PathBuf),
    /// An object-storage location.
    S3 {
        /// Bucket name.
        bucket: String,
        /// Object key within the bucket.
        key: String,
    },
}

/// Parse a resource URL into a driver location.
pub fn parse_url(url: &str) -> Result<ParsedUrl, DriverError> {
    if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            return Err(DriverError::InvalidUrl(url.to_string()));
        }
        return Ok(ParsedUrl::File(PathBuf::from(path)));
    }

    let rest = match url.strip_prefix("s3://") {
        Some(rest) => rest,
        None if url.contains("://") => {
            return Err(DriverError::InvalidUrl(url.to_string()));
        }
        None => url,
    };

    let mut parts = rest.splitn(2, '/');
    let bucket = parts.next().unwrap_or_default();
    let key = parts.next().unwrap_or_default();
    if bucket.is_empty() || key.is_empty() {
        return Err(DriverError::InvalidUrl(url.to_string()));
    }

    Ok(ParsedUrl::S3 {
        bucket: bucket.to_string(),
        key: key.to_string(),
    })
}
