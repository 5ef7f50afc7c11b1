//! HDF5 Fill Value message parsing (message type 0x0005, versions 2 and 3).

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

/// Parsed fill value message.
///
/// `bytes` is empty when no fill value is defined; the assembler then
/// fills uncovered regions with zeros.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FillValue {
    /// Raw fill value bytes (one element's worth), or empty if undefined.
    pub bytes: Vec<u8>,
}

fn ensure_len(data: &[u8], needed: usize) -> Result<(), FormatError> {
    if data.len() < needed {
        Err(FormatError::UnexpectedEof {
            expected: needed as u64,
            available: data.len() as u64,
        })
    } else {
        Ok(())
    }
}

impl FillValue {
    /// Parse a fill value message from raw message bytes.
    pub fn parse(data: &[u8]) -> Result<FillValue, FormatError> {
        ensure_len(data, 1)?;
        let version = data[0];

        match version {
            2 => {
                // version(1) + space_alloc_time(1) + write_time(1) + defined(1)
                ensure_len(data, 4)?;
                let defined = data[3];
                if defined == 0 {
                    return Ok(FillValue::default());
                }
                ensure_len(data, 8)?;
                let size = LittleEndian::read_u32(&data[4..8]) as usize;
                ensure_len(data, 8 + size)?;
                Ok(FillValue {
                    bytes: data[8..8 + size].to_vec(),
                })
            }
            3 => {
                // version(1) + flags(1); bit 5 of flags = value defined
                ensure_len(data, 2)?;
                let flags = data[1];
                if flags & 0x20 == 0 {
                    return Ok(FillValue::default());
                }
                ensure_len(data, 6)?;
                let size = LittleEndian::read_u32(&data[2..6]) as usize;
                ensure_len(data, 6 + size)?;
                Ok(FillValue {
                    bytes: data[6..6 + size].to_vec(),
                })
            }
            v => Err(FormatError::InvalidFillValueVersion(v)),
        }
    }

    /// Returns `true` when a fill value is defined.
    pub fn is_defined(&self) -> bool {
        !self.bytes.is_empty()
    }
}
