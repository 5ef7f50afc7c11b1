//! HDF5 file signature (magic bytes) discovery.

use crate::error::FormatError;
use crate::source::ByteSource;

/// The 8-byte HDF5 magic signature.
pub const HDF5_SIGNATURE: [u8; 8] = [0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n'];

/// Search for the HDF5 signature at the candidate offsets.
///
/// The signature can appear at offset 0, 512, 1024, 2048, ... (powers of
/// two starting at 512, plus offset 0). Each probe is a small read through
/// the source, so discovery does not pull the whole file.
///
/// Returns the byte offset where the signature was found.
pub fn find_signature(src: &dyn ByteSource) -> Result<u64, FormatError> {
    let len = src.len();

    if len >= 8 && src.read(0, 8)?[..] == HDF5_SIGNATURE {
        return Ok(0);
    }

    let mut offset: u64 = 512;
    while offset + 8 <= len {
        if src.read(offset, 8)?[..] == HDF5_SIGNATURE {
            return Ok(offset);
        }
        offset *= 2;
    }

    Err(FormatError::SignatureNotFound)
}
