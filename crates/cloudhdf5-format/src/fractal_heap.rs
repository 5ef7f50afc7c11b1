//! HDF5 Fractal Heap parsing (signature `FRHP`) for dense group link
//! storage.
//!
//! Link records are enumerated by scanning direct blocks back-to-back:
//! each direct block holds link messages packed head-to-tail, terminated
//! by zero padding. Indirect blocks fan out over the doubling table
//! (rows 0 and 1 at the starting block size, row n at
//! `starting * 2^(n-1)`).

use crate::cursor::{is_undefined, Cursor};
use crate::error::FormatError;
use crate::link_message::LinkMessage;
use crate::source::ByteSource;

/// Parsed fractal heap header.
#[derive(Debug, Clone)]
pub struct FractalHeapHeader {
    /// I/O filter encoded length (non-zero means a filtered heap).
    pub io_filter_encoded_length: u16,
    /// Heap flags; bit 1 set means direct blocks carry checksums.
    pub flags: u8,
    /// Width of the doubling table.
    pub table_width: u16,
    /// Starting block size in the doubling table.
    pub starting_block_size: u64,
    /// Maximum direct block size.
    pub max_direct_block_size: u64,
    /// Maximum heap size in bits (drives the block-offset field width).
    pub max_heap_size: u16,
    /// Address of the root block, or `None` for an empty heap.
    pub root_block_address: Option<u64>,
    /// Rows in the root indirect block (0 = root is a direct block).
    pub current_rows_in_root: u16,
}

impl FractalHeapHeader {
    /// Parse a fractal heap header at the given file address.
    pub fn parse(
        src: &dyn ByteSource,
        address: u64,
        offset_size: u8,
        length_size: u8,
    ) -> Result<FractalHeapHeader, FormatError> {
        let mut cursor = Cursor::new(src, address);

        let sig = cursor.read_bytes(4)?;
        if sig != b"FRHP" {
            return Err(FormatError::InvalidFractalHeapSignature);
        }
        let version = cursor.read_u8()?;
        if version != 0 {
            return Err(FormatError::InvalidFractalHeapVersion(version));
        }

        let _heap_id_length = cursor.read_u16()?;
        let io_filter_encoded_length = cursor.read_u16()?;
        let flags = cursor.read_u8()?;
        let _max_managed_object_size = cursor.read_u32()?;

        let ls = length_size as u64;
        let os = offset_size as u64;
        // next huge id, huge btree addr, free space, free space manager,
        // managed space, allocated space, iterator offset, managed count,
        // huge size, huge count, tiny size, tiny count
        cursor.skip(ls + os + ls + os + ls + ls + ls + ls + ls + ls + ls + ls);

        let table_width = cursor.read_u16()?;
        let starting_block_size = cursor.read_length(length_size)?;
        let max_direct_block_size = cursor.read_length(length_size)?;
        let max_heap_size = cursor.read_u16()?;
        let _starting_rows = cursor.read_u16()?;
        let root_block_address = cursor.read_addr(offset_size)?;
        let current_rows_in_root = cursor.read_u16()?;

        Ok(FractalHeapHeader {
            io_filter_encoded_length,
            flags,
            table_width,
            starting_block_size,
            max_direct_block_size,
            max_heap_size,
            root_block_address,
            current_rows_in_root,
        })
    }

    /// Width in bytes of the block-offset field inside heap blocks.
    fn block_offset_size(&self) -> usize {
        (self.max_heap_size as usize).div_ceil(8)
    }

    fn direct_blocks_checksummed(&self) -> bool {
        self.flags & 0x02 != 0
    }
}

/// Enumerate all link records stored in the heap.
pub fn enumerate_links(
    src: &dyn ByteSource,
    heap: &FractalHeapHeader,
    offset_size: u8,
) -> Result<Vec<LinkMessage>, FormatError> {
    if heap.io_filter_encoded_length > 0 {
        return Err(FormatError::FilterError {
            detail: "filtered fractal heaps are not supported".into(),
        });
    }

    let root = match heap.root_block_address {
        Some(addr) => addr,
        None => return Ok(Vec::new()),
    };

    let mut links = Vec::new();
    if heap.current_rows_in_root == 0 {
        scan_direct_block(
            src,
            heap,
            root,
            heap.starting_block_size,
            offset_size,
            &mut links,
        )?;
    } else {
        scan_indirect_block(
            src,
            heap,
            root,
            heap.current_rows_in_root as usize,
            offset_size,
            &mut links,
        )?;
    }
    Ok(links)
}

fn scan_direct_block(
    src: &dyn ByteSource,
    heap: &FractalHeapHeader,
    address: u64,
    block_size: u64,
    offset_size: u8,
    links: &mut Vec<LinkMessage>,
) -> Result<(), FormatError> {
    let block = src.read(address, block_size as usize)?;
    if block.len() < 5 || block[..4] != *b"FHDB" {
        return Err(FormatError::InvalidFractalHeapSignature);
    }
    if block[4] != 0 {
        return Err(FormatError::InvalidFractalHeapVersion(block[4]));
    }

    let mut pos = 5 + offset_size as usize + heap.block_offset_size();
    if heap.direct_blocks_checksummed() {
        pos += 4;
    }

    while pos < block.len() {
        // zero padding marks the end of the packed records
        let peek = &block[pos..block.len().min(pos + 8)];
        if peek.iter().all(|&b| b == 0) {
            break;
        }
        let (link, consumed) = LinkMessage::parse(&block[pos..], offset_size)?;
        links.push(link);
        pos += consumed;
    }

    Ok(())
}

fn scan_indirect_block(
    src: &dyn ByteSource,
    heap: &FractalHeapHeader,
    address: u64,
    nrows: usize,
    offset_size: u8,
    links: &mut Vec<LinkMessage>,
) -> Result<(), FormatError> {
    let header_len = 5 + offset_size as usize + heap.block_offset_size();
    let header = src.read(address, header_len)?;
    if header[..4] != *b"FHIB" {
        return Err(FormatError::InvalidFractalHeapSignature);
    }
    if header[4] != 0 {
        return Err(FormatError::InvalidFractalHeapVersion(header[4]));
    }

    let width = heap.table_width as usize;
    let mut cursor = Cursor::new(src, address + header_len as u64);

    for row in 0..nrows {
        let row_block_size = match row {
            0 | 1 => heap.starting_block_size,
            n => heap.starting_block_size << (n - 1),
        };
        for _ in 0..width {
            let raw = cursor.read_uint(offset_size)?;
            if is_undefined(raw, offset_size) {
                continue;
            }
            if row_block_size <= heap.max_direct_block_size {
                scan_direct_block(src, heap, raw, row_block_size, offset_size, links)?;
            } else {
                let sub_rows = (row_block_size
                    .ilog2()
                    .saturating_sub((heap.starting_block_size * heap.table_width as u64).ilog2())
                    + 1) as usize;
                scan_indirect_block(src, heap, raw, sub_rows, offset_size, links)?;
            }
        }
    }

    Ok(())
}
