//! HDF5 Superblock parsing (versions 0 and 2).
//!
//! Versions 1 and 3 are valid HDF5 but outside this reader's subset and
//! are rejected as unsupported.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;
use crate::signature::{find_signature, HDF5_SIGNATURE};
use crate::source::ByteSource;

/// Largest prefix a superblock of either supported version can occupy
/// (v0 with 8-byte offsets plus the root symbol table entry).
const SUPERBLOCK_SPAN: usize = 96;

/// Parsed HDF5 superblock.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
    /// Superblock version (0 or 2).
    pub version: u8,
    /// Size of file offsets in bytes (2, 4, or 8).
    pub offset_size: u8,
    /// Size of lengths in bytes (2, 4, or 8).
    pub length_size: u8,
    /// File base address.
    pub base_address: u64,
    /// End-of-file address.
    pub eof_address: u64,
    /// Root group object header address.
    pub root_group_address: u64,
    /// Group leaf node K (v0 only).
    pub group_leaf_node_k: Option<u16>,
    /// Group internal node K (v0 only).
    pub group_internal_node_k: Option<u16>,
    /// File consistency flags.
    pub consistency_flags: u32,
    /// Superblock extension address (v2 only).
    pub superblock_extension_address: Option<u64>,
    /// CRC32C checksum (v2 only).
    pub checksum: Option<u32>,
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

fn read_offset(data: &[u8], pos: usize, size: u8) -> Result<u64, FormatError> {
    let s = size as usize;
    ensure_len(data, pos + s)?;
    let slice = &data[pos..pos + s];
    Ok(match size {
        2 => LittleEndian::read_u16(slice) as u64,
        4 => LittleEndian::read_u32(slice) as u64,
        8 => LittleEndian::read_u64(slice),
        _ => return Err(FormatError::InvalidOffsetSize(size)),
    })
}

fn validate_sizes(offset_size: u8, length_size: u8) -> Result<(), FormatError> {
    if !matches!(offset_size, 2 | 4 | 8) {
        return Err(FormatError::InvalidOffsetSize(offset_size));
    }
    if !matches!(length_size, 2 | 4 | 8) {
        return Err(FormatError::InvalidLengthSize(length_size));
    }
    Ok(())
}

impl Superblock {
    /// Discover and parse the superblock by scanning candidate offsets.
    pub fn discover(src: &dyn ByteSource) -> Result<Superblock, FormatError> {
        let offset = find_signature(src)?;
        let span = SUPERBLOCK_SPAN.min((src.len() - offset) as usize);
        let prefix = src.read(offset, span)?;
        Self::parse(&prefix)
    }

    /// Parse a superblock from a buffer that begins with the signature.
    pub fn parse(d: &[u8]) -> Result<Superblock, FormatError> {
        ensure_len(d, 9)?; // signature(8) + version(1)

        if d[..8] != HDF5_SIGNATURE {
            return Err(FormatError::SignatureNotFound);
        }

        match d[8] {
            0 => Self::parse_v0(d),
            2 => Self::parse_v2(d),
            v => Err(FormatError::UnsupportedSuperblockVersion(v)),
        }
    }

    fn parse_v0(d: &[u8]) -> Result<Superblock, FormatError> {
        // sig(8) + version(1) + free_space_ver(1) + root_grp_ver(1) + reserved(1)
        // + shared_hdr_ver(1) + offset_size(1) + length_size(1) + reserved(1)
        // + group_leaf_k(2) + group_internal_k(2) + consistency_flags(4) = 24
        ensure_len(d, 24)?;

        let offset_size = d[13];
        let length_size = d[14];
        validate_sizes(offset_size, length_size)?;

        let group_leaf_node_k = LittleEndian::read_u16(&d[16..18]);
        let group_internal_node_k = LittleEndian::read_u16(&d[18..20]);
        let consistency_flags = LittleEndian::read_u32(&d[20..24]);

        let os = offset_size as usize;
        let mut pos = 24;
        let base_address = read_offset(d, pos, offset_size)?;
        pos += os;
        let _free_space_address = read_offset(d, pos, offset_size)?;
        pos += os;
        let eof_address = read_offset(d, pos, offset_size)?;
        pos += os;
        let _driver_info_address = read_offset(d, pos, offset_size)?;
        pos += os;

        // Root group symbol table entry: link_name_offset + object header address
        let _link_name_offset = read_offset(d, pos, offset_size)?;
        pos += os;
        let root_group_address = read_offset(d, pos, offset_size)?;

        Ok(Superblock {
            version: 0,
            offset_size,
            length_size,
            base_address,
            eof_address,
            root_group_address,
            group_leaf_node_k: Some(group_leaf_node_k),
            group_internal_node_k: Some(group_internal_node_k),
            consistency_flags,
            superblock_extension_address: None,
            checksum: None,
        })
    }

    fn parse_v2(d: &[u8]) -> Result<Superblock, FormatError> {
        // sig(8) + version(1) + offset_size(1) + length_size(1) + consistency_flags(1) = 12
        ensure_len(d, 12)?;

        let offset_size = d[9];
        let length_size = d[10];
        validate_sizes(offset_size, length_size)?;
        let consistency_flags = d[11] as u32;

        let os = offset_size as usize;
        ensure_len(d, 12 + 4 * os + 4)?;

        let mut pos = 12;
        let base_address = read_offset(d, pos, offset_size)?;
        pos += os;
        let superblock_extension_address = read_offset(d, pos, offset_size)?;
        pos += os;
        let eof_address = read_offset(d, pos, offset_size)?;
        pos += os;
        let root_group_address = read_offset(d, pos, offset_size)?;
        pos += os;

        let stored_checksum = LittleEndian::read_u32(&d[pos..pos + 4]);

        #[cfg(feature = "checksum")]
        {
            let computed = crc32c::crc32c(&d[..pos]);
            if computed != stored_checksum {
                return Err(FormatError::ChecksumMismatch {
                    expected: stored_checksum,
                    computed,
                });
            }
        }

        Ok(Superblock {
            version: 2,
            offset_size,
            length_size,
            base_address,
            eof_address,
            root_group_address,
            group_leaf_node_k: None,
            group_internal_node_k: None,
            consistency_flags,
            superblock_extension_address: Some(superblock_extension_address),
            checksum: Some(stored_checksum),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    fn write_offset(buf: &mut Vec<u8>, val: u64, size: u8) {
        match size {
            2 => buf.extend_from_slice(&(val as u16).to_le_bytes()),
            4 => buf.extend_from_slice(&(val as u32).to_le_bytes()),
            8 => buf.extend_from_slice(&val.to_le_bytes()),
            _ => panic!("bad test offset size"),
        }
    }

    pub fn build_v0_bytes(offset_size: u8, root_addr: u64) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&HDF5_SIGNATURE);
        buf.push(0); // version
        buf.push(0); // free_space_version
        buf.push(0); // root_group_version
        buf.push(0); // reserved
        buf.push(0); // shared_header_version
        buf.push(offset_size);
        buf.push(offset_size); // length_size
        buf.push(0); // reserved
        buf.extend_from_slice(&4u16.to_le_bytes()); // group_leaf_node_k
        buf.extend_from_slice(&16u16.to_le_bytes()); // group_internal_node_k
        buf.extend_from_slice(&0u32.to_le_bytes()); // consistency_flags
        write_offset(&mut buf, 0, offset_size); // base_address
        write_offset(&mut buf, u64::MAX, offset_size); // free_space
        write_offset(&mut buf, 4096, offset_size); // eof
        write_offset(&mut buf, u64::MAX, offset_size); // driver_info
        write_offset(&mut buf, 0, offset_size); // link_name_offset
        write_offset(&mut buf, root_addr, offset_size); // root group header
        buf.extend_from_slice(&0u32.to_le_bytes()); // cache_type
        buf.extend_from_slice(&0u32.to_le_bytes()); // reserved
        buf.extend_from_slice(&[0u8; 16]); // scratch pad
        buf
    }

    fn build_v2_bytes(offset_size: u8) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&HDF5_SIGNATURE);
        buf.push(2);
        buf.push(offset_size);
        buf.push(offset_size);
        buf.push(0); // consistency_flags
        write_offset(&mut buf, 0, offset_size); // base
        write_offset(&mut buf, u64::MAX, offset_size); // extension
        write_offset(&mut buf, 2048, offset_size); // eof
        write_offset(&mut buf, 48, offset_size); // root group header
        #[cfg(feature = "checksum")]
        {
            let checksum = crc32c::crc32c(&buf);
            buf.extend_from_slice(&checksum.to_le_bytes());
        }
        #[cfg(not(feature = "checksum"))]
        buf.extend_from_slice(&0u32.to_le_bytes());
        buf
    }

    #[test]
    fn parse_v0_8byte_offsets() {
        let sb = Superblock::parse(&build_v0_bytes(8, 0x60)).unwrap();
        assert_eq!(sb.version, 0);
        assert_eq!(sb.offset_size, 8);
        assert_eq!(sb.length_size, 8);
        assert_eq!(sb.base_address, 0);
        assert_eq!(sb.eof_address, 4096);
        assert_eq!(sb.root_group_address, 0x60);
        assert_eq!(sb.group_leaf_node_k, Some(4));
        assert_eq!(sb.group_internal_node_k, Some(16));
        assert_eq!(sb.checksum, None);
    }

    #[test]
    fn parse_v0_4byte_offsets() {
        let sb = Superblock::parse(&build_v0_bytes(4, 96)).unwrap();
        assert_eq!(sb.offset_size, 4);
        assert_eq!(sb.root_group_address, 96);
    }

    #[test]
    fn parse_v2() {
        let sb = Superblock::parse(&build_v2_bytes(8)).unwrap();
        assert_eq!(sb.version, 2);
        assert_eq!(sb.eof_address, 2048);
        assert_eq!(sb.root_group_address, 48);
        assert!(sb.checksum.is_some());
        assert_eq!(sb.group_leaf_node_k, None);
    }

    #[test]
    fn reject_v1_and_v3() {
        for version in [1u8, 3] {
            let mut data = vec![0u8; 64];
            data[..8].copy_from_slice(&HDF5_SIGNATURE);
            data[8] = version;
            assert_eq!(
                Superblock::parse(&data).unwrap_err(),
                FormatError::UnsupportedSuperblockVersion(version)
            );
        }
    }

    #[test]
    fn invalid_offset_size() {
        let mut data = build_v0_bytes(8, 0x60);
        data[13] = 3;
        assert_eq!(
            Superblock::parse(&data).unwrap_err(),
            FormatError::InvalidOffsetSize(3)
        );
    }

    #[test]
    fn truncated_v0() {
        let mut data = vec![0u8; 20];
        data[..8].copy_from_slice(&HDF5_SIGNATURE);
        data[8] = 0;
        assert!(matches!(
            Superblock::parse(&data),
            Err(FormatError::UnexpectedEof { .. })
        ));
    }

    #[cfg(feature = "checksum")]
    #[test]
    fn checksum_mismatch_v2() {
        let mut data = build_v2_bytes(8);
        let len = data.len();
        data[len - 1] ^= 0xFF;
        assert!(matches!(
            Superblock::parse(&data),
            Err(FormatError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn discover_at_offset_512() {
        let sb_bytes = build_v0_bytes(8, 0x60);
        let mut data = vec![0u8; 1024];
        data[512..512 + sb_bytes.len()].copy_from_slice(&sb_bytes);
        let src = MemorySource::new(data);
        let sb = Superblock::discover(&src).unwrap();
        assert_eq!(sb.version, 0);
        assert_eq!(sb.root_group_address, 0x60);
    }

    #[test]
    fn discover_no_signature() {
        let src = MemorySource::new(vec![0u8; 256]);
        assert_eq!(
            Superblock::discover(&src).unwrap_err(),
            FormatError::SignatureNotFound
        );
    }
}
