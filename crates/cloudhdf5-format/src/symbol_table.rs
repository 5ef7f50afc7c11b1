//! HDF5 Symbol Table message and Symbol Table Node (SNOD) parsing.

use crate::cursor::Cursor;
use crate::error::FormatError;
use crate::source::ByteSource;

/// Symbol Table message (type 0x0011) found in old-style group headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTableMessage {
    /// Address of the B-tree v1 (type 0) for this group.
    pub btree_address: u64,
    /// Address of the local heap holding link names.
    pub local_heap_address: u64,
}

impl SymbolTableMessage {
    /// Parse a Symbol Table message from raw message bytes.
    pub fn parse(data: &[u8], offset_size: u8) -> Result<SymbolTableMessage, FormatError> {
        let os = offset_size as usize;
        if data.len() < os * 2 {
            return Err(FormatError::UnexpectedEof {
                expected: (os * 2) as u64,
                available: data.len() as u64,
            });
        }
        let read = |pos: usize| -> Result<u64, FormatError> {
            let slice = &data[pos..pos + os];
            Ok(match offset_size {
                2 => u16::from_le_bytes([slice[0], slice[1]]) as u64,
                4 => u32::from_le_bytes([slice[0], slice[1], slice[2], slice[3]]) as u64,
                8 => u64::from_le_bytes([
                    slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6],
                    slice[7],
                ]),
                _ => return Err(FormatError::InvalidOffsetSize(offset_size)),
            })
        };
        Ok(SymbolTableMessage {
            btree_address: read(0)?,
            local_heap_address: read(os)?,
        })
    }
}

/// A single entry in a Symbol Table Node.
#[derive(Debug, Clone)]
pub struct SymbolTableEntry {
    /// Byte offset of the link name in the group's local heap.
    pub link_name_offset: u64,
    /// Address of the child object's header.
    pub object_header_address: u64,
    /// Cache type: 0 = none, 1 = group metadata, 2 = symbolic link.
    pub cache_type: u32,
}

/// A parsed Symbol Table Node (signature `SNOD`).
#[derive(Debug, Clone)]
pub struct SymbolTableNode {
    /// Entries, sorted by link name.
    pub entries: Vec<SymbolTableEntry>,
}

impl SymbolTableNode {
    /// Parse a Symbol Table Node at the given file address.
    pub fn parse(
        src: &dyn ByteSource,
        address: u64,
        offset_size: u8,
    ) -> Result<SymbolTableNode, FormatError> {
        let mut cursor = Cursor::new(src, address);

        let sig = cursor.read_bytes(4)?;
        if sig != b"SNOD" {
            return Err(FormatError::InvalidSymbolTableNodeSignature);
        }
        let version = cursor.read_u8()?;
        if version != 1 {
            return Err(FormatError::InvalidSymbolTableNodeVersion(version));
        }
        cursor.skip(1); // reserved
        let num_symbols = cursor.read_u16()? as usize;

        let mut entries = Vec::with_capacity(num_symbols);
        for _ in 0..num_symbols {
            let link_name_offset = cursor.read_uint(offset_size)?;
            let object_header_address = cursor.read_uint(offset_size)?;
            let cache_type = cursor.read_u32()?;
            cursor.skip(4 + 16); // reserved + scratch pad
            entries.push(SymbolTableEntry {
                link_name_offset,
                object_header_address,
                cache_type,
            });
        }

        Ok(SymbolTableNode { entries })
    }
}
