//! HDF5 Link Info message parsing (message type 0x0002).

use byteorder::{ByteOrder, LittleEndian};

use crate::cursor::is_undefined;
use crate::error::FormatError;

/// Parsed Link Info message for a new-style group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkInfoMessage {
    /// Fractal heap holding this group's link records, if dense storage
    /// is in use.
    pub fractal_heap_address: Option<u64>,
    /// v2 B-tree name index address (not traversed by this reader).
    pub name_index_address: Option<u64>,
}

fn read_offset(data: &[u8], pos: usize, size: u8) -> Result<u64, FormatError> {
    let s = size as usize;
    if pos + s > data.len() {
        return Err(FormatError::UnexpectedEof {
            expected: (pos + s) as u64,
            available: data.len() as u64,
        });
    }
    let slice = &data[pos..pos + s];
    Ok(match size {
        2 => LittleEndian::read_u16(slice) as u64,
        4 => LittleEndian::read_u32(slice) as u64,
        8 => LittleEndian::read_u64(slice),
        _ => return Err(FormatError::InvalidOffsetSize(size)),
    })
}

impl LinkInfoMessage {
    /// Parse a Link Info message from raw message bytes.
    pub fn parse(data: &[u8], offset_size: u8) -> Result<LinkInfoMessage, FormatError> {
        if data.len() < 2 {
            return Err(FormatError::UnexpectedEof {
                expected: 2,
                available: data.len() as u64,
            });
        }

        let version = data[0];
        if version != 0 {
            return Err(FormatError::InvalidLinkInfoVersion(version));
        }
        let flags = data[1];

        let mut pos = 2;
        if flags & 0x01 != 0 {
            pos += 8; // maximum creation index
        }

        let heap_raw = read_offset(data, pos, offset_size)?;
        pos += offset_size as usize;
        let btree_raw = read_offset(data, pos, offset_size)?;

        let fractal_heap_address = if is_undefined(heap_raw, offset_size) {
            None
        } else {
            Some(heap_raw)
        };
        let name_index_address = if is_undefined(btree_raw, offset_size) {
            None
        } else {
            Some(btree_raw)
        };

        Ok(LinkInfoMessage {
            fractal_heap_address,
            name_index_address,
        })
    }
}
