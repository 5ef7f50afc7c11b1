//! Error type for the high-level reader API.

use std::fmt;

pub use cloudhdf5_format::error::ErrorKind;
use cloudhdf5_format::error::FormatError;
use cloudhdf5_io::DriverError;

/// Errors surfaced by the reader.
#[derive(Debug)]
pub enum Error {
    /// Low-level structure decoding failed.
    Format(FormatError),
    /// Driver-level failure (file, network).
    Driver(DriverError),
    /// The resolved object is not a dataset.
    NotADataset(String),
    /// A dataset header is missing a required message.
    MissingMetadata(&'static str),
    /// A typed accessor was used on an incompatible datatype.
    TypeMismatch {
        /// The type the accessor produces.
        expected: &'static str,
        /// Description of the actual datatype.
        actual: String,
    },
    /// The batch was cancelled before this dataset completed.
    Cancelled,
    /// The worker pool could not be constructed.
    Pool(String),
}

impl Error {
    /// Classify into the coarse error taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Format(e) => e.kind(),
            Error::Driver(_) | Error::Cancelled | Error::Pool(_) => ErrorKind::Io,
            Error::NotADataset(_) => ErrorKind::PathNotFound,
            Error::MissingMetadata(_) | Error::TypeMismatch { .. } => ErrorKind::Format,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Format(e) => write!(f, "HDF5 format error: {e}"),
            Error::Driver(e) => write!(f, "driver error: {e}"),
            Error::NotADataset(path) => write!(f, "not a dataset: {path}"),
            Error::MissingMetadata(what) => {
                write!(f, "dataset header missing {what} message")
            }
            Error::TypeMismatch { expected, actual } => {
                write!(f, "type mismatch: expected {expected}, dataset is {actual}")
            }
            Error::Cancelled => write!(f, "batch cancelled"),
            Error::Pool(detail) => write!(f, "worker pool error: {detail}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Format(e) => Some(e),
            Error::Driver(e) => Some(e),
            _ => None,
        }
    }
}

impl From<FormatError> for Error {
    fn from(e: FormatError) -> Self {
        Error::Format(e)
    }
}

impl From<DriverError> for Error {
    fn from(e: DriverError) -> Self {
        Error::Driver(e)
    }
}
