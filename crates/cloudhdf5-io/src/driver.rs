//! Byte-range drivers: the capability set is `read(offset, length)` plus
//! `size()`. Failures carry the underlying cause and are not retried at
//! this layer.

use std::fmt;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use std::sync::Mutex;

/// Errors produced by byte-range drivers.
#[derive(Debug)]
pub enum DriverError {
    /// Filesystem-level failure.
    Io(std::io::Error),
    /// HTTP-level failure with the response status.
    Http {
        /// HTTP status code (0 when the request never completed).
        status: u16,
        /// Response or transport detail.
        message: String,
    },
    /// A read extended past the end of the source.
    OutOfRange {
        /// Byte position the read needed to reach.
        expected: u64,
        /// Bytes actually available.
        available: u64,
    },
    /// The source returned fewer bytes than requested.
    ShortRead {
        /// Bytes requested.
        expected: usize,
        /// Bytes returned.
        actual: usize,
    },
    /// A driver URL could not be understood.
    InvalidUrl(String),
}

impl fmt::Display for DriverError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DriverError::Io(e) => write!(f, "I/O error: {e}"),
            DriverError::Http { status, message } => {
                write!(f, "HTTP error (status {status}): {message}")
            }
            DriverError::OutOfRange {
                expected,
                available,
            } => write!(f, "read past EOF: need byte {expected}, have {available}"),
            DriverError::ShortRead { expected, actual } => {
                write!(f, "short read: wanted {expected} bytes, got {actual}")
            }
            DriverError::InvalidUrl(url) => write!(f, "invalid driver URL: {url}"),
        }
    }
}

impl std::error::Error for DriverError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DriverError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for DriverError {
    fn from(e: std::io::Error) -> Self {
        DriverError::Io(e)
    }
}

/// Random-access byte-range reader over some storage.
pub trait Driver: Send + Sync {
    /// Read exactly `length` bytes at `offset`.
    fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, DriverError>;

    /// Total size of the source in bytes.
    fn size(&self) -> Result<u64, DriverError>;
}

/// Positioned reads over a local file.
pub struct FileDriver {
    file: Mutex<File>,
    size: u64,
}

impl FileDriver {
    /// Open a local file for range reads.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, DriverError> {
        let file = File::open(path)?;
        let size = file.metadata()?.len();
        Ok(Self {
            file: Mutex::new(file),
            size,
        })
    }
}

impl Driver for FileDriver {
    fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, DriverError> {
        if offset + length as u64 > self.size {
            return Err(DriverError::OutOfRange {
                expected: offset + length as u64,
                available: self.size,
            });
        }
        let mut file = self.file.lock().expect("file driver mutex poisoned");
        file.seek(SeekFrom::Start(offset))?;
        let mut buf = vec![0u8; length];
        file.read_exact(&mut buf)?;
        Ok(buf)
    }

    fn size(&self) -> Result<u64, DriverError> {
        Ok(self.size)
    }
}

/// In-memory driver, used by tests and for already-buffered data.
pub struct MemoryDriver {
    data: Vec<u8>,
}

impl MemoryDriver {
    /// Create a driver over an owned byte vector.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl Driver for MemoryDriver {
    fn read(&self, offset: u64, length: usize) -> Result<Vec<u8>, DriverError> {
        let start = offset as usize;
        let end = start
            .checked_add(length)
            .filter(|&e| e <= self.data.len())
            .ok_or(DriverError::OutOfRange {
                expected: offset + length as u64,
                available: self.data.len() as u64,
            })?;
        Ok(self.data[start..end].to_vec())
    }

    fn size(&self) -> Result<u64, DriverError> {
        Ok(self.data.len() as u64)
    }
}
