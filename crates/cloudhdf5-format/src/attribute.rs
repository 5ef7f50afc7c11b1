//! HDF5 Attribute message parsing (message type 0x000C, versions 1-3).

use byteorder::{ByteOrder, LittleEndian};

use crate::dataspace::Dataspace;
use crate::datatype::Datatype;
use crate::error::FormatError;

/// A parsed attribute: name, type, shape, and the inline raw value.
#[derive(Debug, Clone)]
pub struct AttributeMessage {
    /// Attribute name.
    pub name: String,
    /// Attribute datatype.
    pub datatype: Datatype,
    /// Attribute dataspace.
    pub dataspace: Dataspace,
    /// Raw attribute value bytes.
    pub raw_data: Vec<u8>,
}

fn ensure_len(data: &[u8], offset: usize, needed: usize) -> Result<(), FormatError> {
    if offset + needed > data.len() {
        Err(FormatError::UnexpectedEof {
            expected: (offset + needed) as u64,
            available: data.len() as u64,
        })
    } else {
        Ok(())
    }
}

/// Round up to the next multiple of 8.
fn pad8(x: usize) -> usize {
    (x + 7) & !7
}

fn extract_name(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

impl AttributeMessage {
    /// Parse an attribute message from raw message bytes.
    pub fn parse(data: &[u8], length_size: u8) -> Result<AttributeMessage, FormatError> {
        ensure_len(data, 0, 2)?;
        let version = data[0];
        match version {
            1 => Self::parse_body(data, length_size, 8, true),
            2 => Self::parse_body(data, length_size, 8, false),
            3 => Self::parse_body(data, length_size, 9, false),
            v => Err(FormatError::InvalidAttributeVersion(v)),
        }
    }

    /// Shared body: v1 pads name/type/space blocks to 8 bytes, v2 and v3
    /// pack them; v3 adds a name-encoding byte to the fixed header.
    fn parse_body(
        data: &[u8],
        length_size: u8,
        header_len: usize,
        padded: bool,
    ) -> Result<AttributeMessage, FormatError> {
        ensure_len(data, 0, header_len)?;
        let name_size = LittleEndian::read_u16(&data[2..4]) as usize;
        let datatype_size = LittleEndian::read_u16(&data[4..6]) as usize;
        let dataspace_size = LittleEndian::read_u16(&data[6..8]) as usize;

        let mut pos = header_len;

        ensure_len(data, pos, name_size)?;
        let name = extract_name(&data[pos..pos + name_size]);
        pos += if padded { pad8(name_size) } else { name_size };

        ensure_len(data, pos, datatype_size)?;
        let (datatype, _) = Datatype::parse(&data[pos..pos + datatype_size])?;
        pos += if padded { pad8(datatype_size) } else { datatype_size };

        ensure_len(data, pos, dataspace_size)?;
        let dataspace = Dataspace::parse(&data[pos..pos + dataspace_size], length_size)?;
        pos += if padded { pad8(dataspace_size) } else { dataspace_size };

        let expected = dataspace.num_elements() as usize * datatype.type_size() as usize;
        let available = data.len().saturating_sub(pos);
        let take = expected.min(available);
        let raw_data = data[pos..pos + take].to_vec();

        Ok(AttributeMessage {
            name,
            datatype,
            dataspace,
            raw_data,
        })
    }
}
