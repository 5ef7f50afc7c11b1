//! Error types for HDF5 structure decoding.

use core::fmt;

/// Coarse error classification used by callers that only care about the
/// category of a failure, not the exact structure that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Driver-level failure (network, permission, short read).
    Io,
    /// Structural inconsistency in the file bytes.
    Format,
    /// Valid HDF5 construct this reader does not handle.
    UnsupportedFormat,
    /// Filter id outside the supported set.
    UnsupportedFilter,
    /// A dataset path did not resolve.
    PathNotFound,
    /// A selection exceeds the dataset extents.
    OutOfBounds,
}

/// Errors produced while decoding HDF5 structures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormatError {
    /// Underlying byte source failed.
    Io {
        /// Human-readable description of the driver failure.
        detail: String,
    },
    /// The HDF5 magic signature was not found at any candidate offset.
    SignatureNotFound,
    /// The superblock version is not supported (v1, v3, or unknown).
    UnsupportedSuperblockVersion(u8),
    /// A read ran past the end of the data.
    UnexpectedEof {
        /// Byte position the read needed to reach.
        expected: u64,
        /// Bytes actually available.
        available: u64,
    },
    /// Invalid offset size (must be 2, 4, or 8).
    InvalidOffsetSize(u8),
    /// Invalid length size (must be 2, 4, or 8).
    InvalidLengthSize(u8),
    /// Invalid object header signature.
    InvalidObjectHeaderSignature,
    /// Invalid object header version.
    InvalidObjectHeaderVersion(u8),
    /// Unknown message type carrying the fail-if-unknown flag.
    UnsupportedMessage(u16),
    /// Datatype class outside the supported subset.
    UnsupportedDatatypeClass(u8),
    /// Datatype version not valid for its class.
    InvalidDatatypeVersion {
        /// The type class.
        class: u8,
        /// The version found.
        version: u8,
    },
    /// Invalid string padding type.
    InvalidStringPadding(u8),
    /// Invalid character set.
    InvalidCharacterSet(u8),
    /// Invalid dataspace version.
    InvalidDataspaceVersion(u8),
    /// Invalid dataspace type.
    InvalidDataspaceType(u8),
    /// Data layout version outside the supported subset.
    UnsupportedLayoutVersion(u8),
    /// Invalid data layout class.
    InvalidLayoutClass(u8),
    /// No data allocated for a contiguous layout.
    NoDataAllocated,
    /// Invalid fill value message version.
    InvalidFillValueVersion(u8),
    /// Invalid filter pipeline message version.
    InvalidFilterPipelineVersion(u8),
    /// Filter id outside {deflate, shuffle}.
    UnsupportedFilter(u16),
    /// A filter inverse failed on a chunk.
    FilterError {
        /// Description of the failure.
        detail: String,
    },
    /// Invalid attribute message version.
    InvalidAttributeVersion(u8),
    /// Invalid local heap signature.
    InvalidLocalHeapSignature,
    /// Invalid local heap version.
    InvalidLocalHeapVersion(u8),
    /// Invalid B-tree v1 signature.
    InvalidBTreeSignature,
    /// B-tree node type not valid for the traversal.
    InvalidBTreeNodeType(u8),
    /// Invalid symbol table node signature.
    InvalidSymbolTableNodeSignature,
    /// Invalid symbol table node version.
    InvalidSymbolTableNodeVersion(u8),
    /// Invalid link message version.
    InvalidLinkVersion(u8),
    /// Link type this reader does not follow (soft, external).
    UnsupportedLinkType(u8),
    /// Invalid link info message version.
    InvalidLinkInfoVersion(u8),
    /// Invalid fractal heap signature.
    InvalidFractalHeapSignature,
    /// Invalid fractal heap version.
    InvalidFractalHeapVersion(u8),
    /// Decompressed chunk size did not match the expected size.
    DataSizeMismatch {
        /// Expected size in bytes.
        expected: usize,
        /// Actual size in bytes.
        actual: usize,
    },
    /// CRC32C checksum mismatch.
    ChecksumMismatch {
        /// The checksum stored in the file.
        expected: u32,
        /// The checksum we computed.
        computed: u32,
    },
    /// A path segment did not resolve during group traversal.
    PathNotFound(String),
    /// A hyperslab dimension exceeds the dataset extent.
    OutOfBounds {
        /// Dimension index.
        dim: usize,
        /// Requested start.
        start: u64,
        /// Requested stop (exclusive).
        stop: u64,
        /// Dataset extent along this dimension.
        extent: u64,
    },
    /// A hyperslab is malformed (reversed range, zero stride, too many dims).
    InvalidHyperslab {
        /// Description of the problem.
        detail: String,
    },
}

impl FormatError {
    /// Classify this error into the coarse taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            FormatError::Io { .. } => ErrorKind::Io,
            FormatError::UnsupportedSuperblockVersion(_)
            | FormatError::UnsupportedMessage(_)
            | FormatError::UnsupportedDatatypeClass(_)
            | FormatError::UnsupportedLayoutVersion(_)
            | FormatError::UnsupportedLinkType(_) => ErrorKind::UnsupportedFormat,
            FormatError::UnsupportedFilter(_) => ErrorKind::UnsupportedFilter,
            FormatError::PathNotFound(_) => ErrorKind::PathNotFound,
            FormatError::OutOfBounds { .. } | FormatError::InvalidHyperslab { .. } => {
                ErrorKind::OutOfBounds
            }
            _ => ErrorKind::Format,
        }
    }
}

impl fmt::Display for FormatError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormatError::Io { detail } => write!(f, "I/O error: {detail}"),
            FormatError::SignatureNotFound => {
                write!(f, "HDF5 signature not found at any candidate offset")
            }
            FormatError::UnsupportedSuperblockVersion(v) => {
                write!(f, "unsupported superblock version: {v}")
            }
            FormatError::UnexpectedEof {
                expected,
                available,
            } => {
                write!(f, "unexpected EOF: need byte {expected}, have {available}")
            }
            FormatError::InvalidOffsetSize(s) => {
                write!(f, "invalid offset size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidLengthSize(s) => {
                write!(f, "invalid length size: {s} (must be 2, 4, or 8)")
            }
            FormatError::InvalidObjectHeaderSignature => {
                write!(f, "invalid object header signature")
            }
            FormatError::InvalidObjectHeaderVersion(v) => {
                write!(f, "invalid object header version: {v}")
            }
            FormatError::UnsupportedMessage(id) => {
                write!(
                    f,
                    "unsupported message type {id:#06x} marked as must-understand"
                )
            }
            FormatError::UnsupportedDatatypeClass(c) => {
                write!(f, "unsupported datatype class: {c}")
            }
            FormatError::InvalidDatatypeVersion { class, version } => {
                write!(f, "invalid datatype version {version} for class {class}")
            }
            FormatError::InvalidStringPadding(p) => {
                write!(f, "invalid string padding type: {p}")
            }
            FormatError::InvalidCharacterSet(c) => {
                write!(f, "invalid character set: {c}")
            }
            FormatError::InvalidDataspaceVersion(v) => {
                write!(f, "invalid dataspace version: {v}")
            }
            FormatError::InvalidDataspaceType(t) => {
                write!(f, "invalid dataspace type: {t}")
            }
            FormatError::UnsupportedLayoutVersion(v) => {
                write!(f, "unsupported data layout version: {v}")
            }
            FormatError::InvalidLayoutClass(c) => {
                write!(f, "invalid data layout class: {c}")
            }
            FormatError::NoDataAllocated => {
                write!(f, "no data allocated for contiguous layout")
            }
            FormatError::InvalidFillValueVersion(v) => {
                write!(f, "invalid fill value message version: {v}")
            }
            FormatError::InvalidFilterPipelineVersion(v) => {
                write!(f, "invalid filter pipeline version: {v}")
            }
            FormatError::UnsupportedFilter(id) => {
                write!(f, "unsupported filter id: {id}")
            }
            FormatError::FilterError { detail } => {
                write!(f, "filter error: {detail}")
            }
            FormatError::InvalidAttributeVersion(v) => {
                write!(f, "invalid attribute message version: {v}")
            }
            FormatError::InvalidLocalHeapSignature => {
                write!(f, "invalid local heap signature")
            }
            FormatError::InvalidLocalHeapVersion(v) => {
                write!(f, "invalid local heap version: {v}")
            }
            FormatError::InvalidBTreeSignature => {
                write!(f, "invalid B-tree v1 signature")
            }
            FormatError::InvalidBTreeNodeType(t) => {
                write!(f, "invalid B-tree node type: {t}")
            }
            FormatError::InvalidSymbolTableNodeSignature => {
                write!(f, "invalid symbol table node signature")
            }
            FormatError::InvalidSymbolTableNodeVersion(v) => {
                write!(f, "invalid symbol table node version: {v}")
            }
            FormatError::InvalidLinkVersion(v) => {
                write!(f, "invalid link message version: {v}")
            }
            FormatError::UnsupportedLinkType(t) => {
                write!(f, "unsupported link type: {t}")
            }
            FormatError::InvalidLinkInfoVersion(v) => {
                write!(f, "invalid link info message version: {v}")
            }
            FormatError::InvalidFractalHeapSignature => {
                write!(f, "invalid fractal heap signature")
            }
            FormatError::InvalidFractalHeapVersion(v) => {
                write!(f, "invalid fractal heap version: {v}")
            }
            FormatError::DataSizeMismatch { expected, actual } => {
                write!(
                    f,
                    "data size mismatch: expected {expected} bytes, got {actual} bytes"
                )
            }
            FormatError::ChecksumMismatch { expected, computed } => {
                write!(
                    f,
                    "checksum mismatch: expected {expected:#010x}, computed {computed:#010x}"
                )
            }
            FormatError::PathNotFound(p) => {
                write!(f, "path not found: {p}")
            }
            FormatError::OutOfBounds {
                dim,
                start,
                stop,
                extent,
            } => {
                write!(
                    f,
                    "selection [{start}, {stop}) exceeds extent {extent} in dimension {dim}"
                )
            }
            FormatError::InvalidHyperslab { detail } => {
                write!(f, "invalid hyperslab: {detail}")
            }
        }
    }
}

impl std::error::Error for FormatError {}
