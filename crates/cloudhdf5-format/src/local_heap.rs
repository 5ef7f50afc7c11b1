//! HDF5 Local Heap parsing (signature `HEAP`).

use crate::cursor::Cursor;
use crate::error::FormatError;
use crate::source::ByteSource;

/// Parsed local heap header.
#[derive(Debug, Clone)]
pub struct LocalHeap {
    /// Size of the data segment in bytes.
    pub data_segment_size: u64,
    /// File address of the data segment.
    pub data_segment_address: u64,
}

impl LocalHeap {
    /// Parse a local heap header at the given file address.
    pub fn parse(
        src: &dyn ByteSource,
        address: u64,
        offset_size: u8,
        length_size: u8,
    ) -> Result<LocalHeap, FormatError> {
        let mut cursor = Cursor::new(src, address);

        let sig = cursor.read_bytes(4)?;
        if sig != b"HEAP" {
            return Err(FormatError::InvalidLocalHeapSignature);
        }
        let version = cursor.read_u8()?;
        if version != 0 {
            return Err(FormatError::InvalidLocalHeapVersion(version));
        }
        cursor.skip(3); // reserved

        let data_segment_size = cursor.read_length(length_size)?;
        let _free_list_head = cursor.read_length(length_size)?;
        let data_segment_address = cursor.read_uint(offset_size)?;

        Ok(LocalHeap {
            data_segment_size,
            data_segment_address,
        })
    }

    /// Read the NUL-terminated string at `string_offset` within the data
    /// segment.
    pub fn read_string(
        &self,
        src: &dyn ByteSource,
        string_offset: u64,
    ) -> Result<String, FormatError> {
        if string_offset >= self.data_segment_size {
            return Err(FormatError::UnexpectedEof {
                expected: string_offset,
                available: self.data_segment_size,
            });
        }
        let cap = (self.data_segment_size - string_offset) as usize;
        let mut cursor = Cursor::bounded(
            src,
            self.data_segment_address + string_offset,
            cap as u64,
        );
        cursor.read_cstring(cap)
    }
}
