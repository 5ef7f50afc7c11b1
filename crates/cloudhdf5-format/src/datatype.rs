//! HDF5 Datatype message parsing (message type 0x0003).
//!
//! Only the classes this reader decodes are parsed: fixed-point,
//! floating-point, and fixed-length strings. Compound, reference, enum,
//! variable-length, and the other classes are reported as unsupported
//! rather than silently misread.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;

/// Byte order of numeric data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatatypeByteOrder {
    LittleEndian,
    BigEndian,
}

/// String padding type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringPadding {
    NullTerminate,
    NullPad,
    SpacePad,
}

/// Character set encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharacterSet {
    Ascii,
    Utf8,
}

/// Parsed HDF5 datatype (supported subset).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Datatype {
    /// Class 0: fixed-point (integer) types.
    FixedPoint {
        size: u32,
        byte_order: DatatypeByteOrder,
        signed: bool,
    },
    /// Class 1: floating-point types.
    FloatingPoint {
        size: u32,
        byte_order: DatatypeByteOrder,
    },
    /// Class 3: fixed-length string.
    String {
        size: u32,
        padding: StringPadding,
        charset: CharacterSet,
    },
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

impl Datatype {
    /// Parse a datatype message from raw message bytes.
    ///
    /// Returns `(Datatype, bytes_consumed)`.
    pub fn parse(data: &[u8]) -> Result<(Datatype, usize), FormatError> {
        // class_and_version(1) + bit field(3) + size(4) = 8 byte header
        ensure_len(data, 8)?;

        let class_and_version = data[0];
        let class_id = class_and_version & 0x0F;
        let version = (class_and_version >> 4) & 0x0F;
        if version == 0 || version > 3 {
            return Err(FormatError::InvalidDatatypeVersion {
                class: class_id,
                version,
            });
        }

        let bf0 = data[1];
        let size = LittleEndian::read_u32(&data[4..8]);
        let mut pos = 8;

        match class_id {
            0 => {
                ensure_len(data, pos + 4)?;
                let byte_order = if bf0 & 0x01 == 0 {
                    DatatypeByteOrder::LittleEndian
                } else {
                    DatatypeByteOrder::BigEndian
                };
                let signed = (bf0 >> 3) & 0x01 == 1;
                // bit offset + bit precision
                pos += 4;
                Ok((
                    Datatype::FixedPoint {
                        size,
                        byte_order,
                        signed,
                    },
                    pos,
                ))
            }
            1 => {
                ensure_len(data, pos + 12)?;
                let byte_order = if bf0 & 0x01 == 0 {
                    DatatypeByteOrder::LittleEndian
                } else {
                    DatatypeByteOrder::BigEndian
                };
                // bit offset/precision, exponent and mantissa layout, bias
                pos += 12;
                Ok((Datatype::FloatingPoint { size, byte_order }, pos))
            }
            3 => {
                let padding = match bf0 & 0x0F {
                    0 => StringPadding::NullTerminate,
                    1 => StringPadding::NullPad,
                    2 => StringPadding::SpacePad,
                    p => return Err(FormatError::InvalidStringPadding(p)),
                };
                let charset = match (bf0 >> 4) & 0x0F {
                    0 => CharacterSet::Ascii,
                    1 => CharacterSet::Utf8,
                    c => return Err(FormatError::InvalidCharacterSet(c)),
                };
                Ok((
                    Datatype::String {
                        size,
                        padding,
                        charset,
                    },
                    pos,
                ))
            }
            other => Err(FormatError::UnsupportedDatatypeClass(other)),
        }
    }

    /// Size in bytes of one element of this type.
    pub fn type_size(&self) -> u32 {
        match self {
            Datatype::FixedPoint { size, .. } => *size,
            Datatype::FloatingPoint { size, .. } => *size,
            Datatype::String { size, .. } => *size,
        }
    }

    /// Declared byte order; strings report little-endian.
    pub fn byte_order(&self) -> DatatypeByteOrder {
        match self {
            Datatype::FixedPoint { byte_order, .. } => *byte_order,
            Datatype::FloatingPoint { byte_order, .. } => *byte_order,
            Datatype::String { .. } => DatatypeByteOrder::LittleEndian,
        }
    }

    /// Whether the type is a signed integer.
    pub fn is_signed(&self) -> bool {
        matches!(self, Datatype::FixedPoint { signed: true, .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build_header(class: u8, version: u8, bf: [u8; 3], size: u32) -> Vec<u8> {
        let mut buf = vec![0u8; 8];
        buf[0] = (class & 0x0F) | ((version & 0x0F) << 4);
        buf[1] = bf[0];
        buf[2] = bf[1];
        buf[3] = bf[2];
        LittleEndian::write_u32(&mut buf[4..8], size);
        buf
    }

    fn build_fixed_point(size: u32, be: bool, signed: bool) -> Vec<u8> {
        let bf0 = if be { 0x01 } else { 0x00 } | if signed { 0x08 } else { 0x00 };
        let mut buf = build_header(0, 1, [bf0, 0, 0], size);
        let mut props = [0u8; 4];
        LittleEndian::write_u16(&mut props[2..4], (size * 8) as u16);
        buf.extend_from_slice(&props);
        buf
    }

    fn build_float(size: u32, be: bool) -> Vec<u8> {
        let bf0 = if be { 0x01 } else { 0x00 } | 0x20;
        let mut buf = build_header(1, 1, [bf0, 0x3F, 0], size);
        let mut props = [0u8; 12];
        LittleEndian::write_u16(&mut props[2..4], (size * 8) as u16);
        if size == 4 {
            props[4] = 23; // exponent location
            props[5] = 8; // exponent size
            props[7] = 23; // mantissa size
            LittleEndian::write_u32(&mut props[8..12], 127);
        } else {
            props[4] = 52;
            props[5] = 11;
            props[7] = 52;
            LittleEndian::write_u32(&mut props[8..12], 1023);
        }
        buf.extend_from_slice(&props);
        buf
    }

    #[test]
    fn fixed_point_u8() {
        let (dt, consumed) = Datatype::parse(&build_fixed_point(1, false, false)).unwrap();
        assert_eq!(consumed, 12);
        assert_eq!(
            dt,
            Datatype::FixedPoint {
                size: 1,
                byte_order: DatatypeByteOrder::LittleEndian,
                signed: false,
            }
        );
        assert!(!dt.is_signed());
    }

    #[test]
    fn fixed_point_i32_be() {
        let (dt, _) = Datatype::parse(&build_fixed_point(4, true, true)).unwrap();
        assert_eq!(dt.byte_order(), DatatypeByteOrder::BigEndian);
        assert!(dt.is_signed());
        assert_eq!(dt.type_size(), 4);
    }

    #[test]
    fn float_f32_le() {
        let (dt, consumed) = Datatype::parse(&build_float(4, false)).unwrap();
        assert_eq!(consumed, 20);
        assert_eq!(
            dt,
            Datatype::FloatingPoint {
                size: 4,
                byte_order: DatatypeByteOrder::LittleEndian,
            }
        );
    }

    #[test]
    fn float_f64_be() {
        let (dt, _) = Datatype::parse(&build_float(8, true)).unwrap();
        assert_eq!(dt.type_size(), 8);
        assert_eq!(dt.byte_order(), DatatypeByteOrder::BigEndian);
    }

    #[test]
    fn string_null_terminated_ascii() {
        let buf = build_header(3, 1, [0x00, 0, 0], 10);
        let (dt, consumed) = Datatype::parse(&buf).unwrap();
        assert_eq!(consumed, 8);
        assert_eq!(
            dt,
            Datatype::String {
                size: 10,
                padding: StringPadding::NullTerminate,
                charset: CharacterSet::Ascii,
            }
        );
    }

    #[test]
    fn string_utf8() {
        let buf = build_header(3, 1, [0x10, 0, 0], 32);
        let (dt, _) = Datatype::parse(&buf).unwrap();
        assert_eq!(
            dt,
            Datatype::String {
                size: 32,
                padding: StringPadding::NullTerminate,
                charset: CharacterSet::Utf8,
            }
        );
    }

    #[test]
    fn compound_is_unsupported() {
        let buf = build_header(6, 1, [2, 0, 0], 12);
        assert_eq!(
            Datatype::parse(&buf).unwrap_err(),
            FormatError::UnsupportedDatatypeClass(6)
        );
    }

    #[test]
    fn vlen_is_unsupported() {
        let buf = build_header(9, 1, [1, 1, 0], 16);
        assert_eq!(
            Datatype::parse(&buf).unwrap_err(),
            FormatError::UnsupportedDatatypeClass(9)
        );
    }

    #[test]
    fn truncated_header() {
        assert!(matches!(
            Datatype::parse(&[0u8; 4]),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn invalid_string_padding() {
        let buf = build_header(3, 1, [0x03, 0, 0], 10);
        assert_eq!(
            Datatype::parse(&buf).unwrap_err(),
            FormatError::InvalidStringPadding(3)
        );
    }
}
