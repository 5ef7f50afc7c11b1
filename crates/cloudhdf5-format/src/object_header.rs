//! HDF5 Object Header parsing (versions 1 and 2).
//!
//! Headers are fetched region-by-region through the byte source: the
//! fixed prefix first, then each message block, then any continuation
//! blocks it names. Every non-NIL message is collected exactly once.

use byteorder::{ByteOrder, LittleEndian};

use crate::cursor::Cursor;
use crate::error::FormatError;
use crate::message_type::MessageType;
use crate::source::ByteSource;

/// OHDR signature for v2 object headers.
const OHDR_SIGNATURE: [u8; 4] = [b'O', b'H', b'D', b'R'];

/// OCHK signature for v2 continuation blocks.
const OCHK_SIGNATURE: [u8; 4] = [b'O', b'C', b'H', b'K'];

/// A single parsed header message.
#[derive(Debug, Clone)]
pub struct HeaderMessage {
    /// The message type.
    pub msg_type: MessageType,
    /// Message flags byte.
    pub flags: u8,
    /// Raw message data bytes.
    pub data: Vec<u8>,
}

/// Parsed HDF5 object header.
#[derive(Debug, Clone)]
pub struct ObjectHeader {
    /// Header version (1 or 2).
    pub version: u8,
    /// All non-NIL, non-continuation messages from all blocks.
    pub messages: Vec<HeaderMessage>,
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

/// Parse the continuation message body: block offset + block length.
fn parse_continuation(
    data: &[u8],
    offset_size: u8,
    length_size: u8,
) -> Result<(u64, u64), FormatError> {
    let cont_offset = read_offset(data, 0, offset_size)?;
    let cont_length = read_offset(data, offset_size as usize, length_size)?;
    Ok((cont_offset, cont_length))
}

impl ObjectHeader {
    /// Parse an object header at the given file address.
    pub fn parse(
        src: &dyn ByteSource,
        address: u64,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        let probe = src.read(address, 4)?;
        if probe[..] == OHDR_SIGNATURE {
            Self::parse_v2(src, address, offset_size, length_size)
        } else {
            Self::parse_v1(src, address, offset_size, length_size)
        }
    }

    // ----- version 1 -----

    fn parse_v1(
        src: &dyn ByteSource,
        address: u64,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        // version(1) + reserved(1) + num_messages(2) + ref_count(4) + header_size(4)
        let prefix = src.read(address, 12)?;
        let version = prefix[0];
        if version != 1 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let num_messages = LittleEndian::read_u16(&prefix[2..4]) as usize;
        let header_data_size = LittleEndian::read_u32(&prefix[8..12]) as usize;

        // the 12-byte prefix is padded to 8-byte alignment
        let block = src.read(address + 16, header_data_size)?;

        let mut messages = Vec::new();
        let mut continuations = Vec::new();
        let mut remaining = num_messages;
        Self::scan_v1_block(
            &block,
            offset_size,
            length_size,
            &mut remaining,
            &mut messages,
            &mut continuations,
        )?;

        while let Some((cont_offset, cont_length)) = continuations.pop() {
            let block = src.read(cont_offset, cont_length as usize)?;
            Self::scan_v1_block(
                &block,
                offset_size,
                length_size,
                &mut remaining,
                &mut messages,
                &mut continuations,
            )?;
        }

        Ok(ObjectHeader {
            version: 1,
            messages,
        })
    }

    fn scan_v1_block(
        block: &[u8],
        offset_size: u8,
        length_size: u8,
        remaining: &mut usize,
        messages: &mut Vec<HeaderMessage>,
        continuations: &mut Vec<(u64, u64)>,
    ) -> Result<(), FormatError> {
        let mut pos = 0;
        while *remaining > 0 && pos + 8 <= block.len() {
            let msg_type_raw = LittleEndian::read_u16(&block[pos..pos + 2]);
            let msg_data_size = LittleEndian::read_u16(&block[pos + 2..pos + 4]) as usize;
            let msg_flags = block[pos + 4];
            // reserved(3)
            pos += 8;

            if pos + msg_data_size > block.len() {
                return Err(FormatError::UnexpectedEof {
                    expected: (pos + msg_data_size) as u64,
                    available: block.len() as u64,
                });
            }

            let msg_type = MessageType::from_u16(msg_type_raw);
            if let MessageType::Unknown(id) = msg_type {
                if msg_flags & 0x08 != 0 {
                    return Err(FormatError::UnsupportedMessage(id));
                }
            }

            let data = &block[pos..pos + msg_data_size];
            match msg_type {
                MessageType::Nil => {}
                MessageType::ObjectHeaderContinuation => {
                    continuations.push(parse_continuation(data, offset_size, length_size)?);
                }
                _ => messages.push(HeaderMessage {
                    msg_type,
                    flags: msg_flags,
                    data: data.to_vec(),
                }),
            }

            pos += msg_data_size;
            *remaining -= 1;
        }
        Ok(())
    }

    // ----- version 2 -----

    fn parse_v2(
        src: &dyn ByteSource,
        address: u64,
        offset_size: u8,
        length_size: u8,
    ) -> Result<ObjectHeader, FormatError> {
        let mut cursor = Cursor::new(src, address);
        cursor.skip(4); // OHDR
        let version = cursor.read_u8()?;
        if version != 2 {
            return Err(FormatError::InvalidObjectHeaderVersion(version));
        }
        let flags = cursor.read_u8()?;

        // timestamps (flags bit 2)
        if flags & 0x04 != 0 {
            cursor.skip(16);
        }
        // attribute storage thresholds (flags bit 4)
        if flags & 0x10 != 0 {
            cursor.skip(4);
        }

        let chunk_size_width = match flags & 0x03 {
            0 => 1u8,
            1 => 2,
            2 => 4,
            _ => 8,
        };
        let chunk0_size = cursor.read_uint(chunk_size_width)? as usize;
        let chunk0_start = cursor.position();

        #[cfg(feature = "checksum")]
        {
            let span_len = (chunk0_start - address) as usize + chunk0_size;
            let span = src.read(address, span_len)?;
            let stored =
                LittleEndian::read_u32(&src.read(chunk0_start + chunk0_size as u64, 4)?);
            let computed = crc32c::crc32c(&span);
            if computed != stored {
                return Err(FormatError::ChecksumMismatch {
                    expected: stored,
                    computed,
                });
            }
        }

        let has_creation_order = flags & 0x04 != 0;
        let block = src.read(chunk0_start, chunk0_size)?;

        let mut messages = Vec::new();
        let mut continuations = Vec::new();
        Self::scan_v2_block(
            &block,
            has_creation_order,
            offset_size,
            length_size,
            &mut messages,
            &mut continuations,
        )?;

        while let Some((cont_offset, cont_length)) = continuations.pop() {
            let cont_length = cont_length as usize;
            if cont_length < 8 {
                return Err(FormatError::UnexpectedEof {
                    expected: 8,
                    available: cont_length as u64,
                });
            }
            let block = src.read(cont_offset, cont_length)?;
            if block[..4] != OCHK_SIGNATURE {
                return Err(FormatError::InvalidObjectHeaderSignature);
            }
            #[cfg(feature = "checksum")]
            {
                let stored = LittleEndian::read_u32(&block[cont_length - 4..]);
                let computed = crc32c::crc32c(&block[..cont_length - 4]);
                if computed != stored {
                    return Err(FormatError::ChecksumMismatch {
                        expected: stored,
                        computed,
                    });
                }
            }
            Self::scan_v2_block(
                &block[4..cont_length - 4],
                has_creation_order,
                offset_size,
                length_size,
                &mut messages,
                &mut continuations,
            )?;
        }

        Ok(ObjectHeader {
            version: 2,
            messages,
        })
    }

    fn scan_v2_block(
        block: &[u8],
        has_creation_order: bool,
        offset_size: u8,
        length_size: u8,
        messages: &mut Vec<HeaderMessage>,
        continuations: &mut Vec<(u64, u64)>,
    ) -> Result<(), FormatError> {
        let msg_header_size = if has_creation_order { 6 } else { 4 };
        let mut pos = 0;

        while pos + msg_header_size <= block.len() {
            let msg_type_raw = block[pos] as u16;
            let msg_data_size = LittleEndian::read_u16(&block[pos + 1..pos + 3]) as usize;
            let msg_flags = block[pos + 3];
            pos += msg_header_size;

            if pos + msg_data_size > block.len() {
                // padding at the end of the block
                break;
            }

            let msg_type = MessageType::from_u16(msg_type_raw);
            if let MessageType::Unknown(id) = msg_type {
                if msg_flags & 0x08 != 0 {
                    return Err(FormatError::UnsupportedMessage(id));
                }
            }

            let data = &block[pos..pos + msg_data_size];
            match msg_type {
                MessageType::Nil => {}
                MessageType::ObjectHeaderContinuation => {
                    continuations.push(parse_continuation(data, offset_size, length_size)?);
                }
                _ => messages.push(HeaderMessage {
                    msg_type,
                    flags: msg_flags,
                    data: data.to_vec(),
                }),
            }

            pos += msg_data_size;
        }
        Ok(())
    }

    /// First message of the given type, if present.
    pub fn find_message(&self, msg_type: MessageType) -> Option<&HeaderMessage> {
        self.messages.iter().find(|m| m.msg_type == msg_type)
    }
}
