//! HDF5 B-tree v1 traversal (signature `TREE`).
//!
//! Two node types share the on-disk frame: type 0 indexes group children
//! by name (keys are local-heap name offsets), type 1 indexes raw data
//! chunks by origin coordinate (keys are rank+1 8-byte values with a
//! trailing zero). Group lookups descend by binary-searching the sorted
//! keys; chunk traversal prunes subtrees that cannot intersect the
//! selection.

use byteorder::{ByteOrder, LittleEndian};

use crate::cursor::Cursor;
use crate::error::FormatError;
use crate::local_heap::LocalHeap;
use crate::selection::Hyperslab;
use crate::source::ByteSource;
use crate::symbol_table::{SymbolTableEntry, SymbolTableNode};

/// Common B-tree v1 node frame.
struct NodeFrame {
    node_type: u8,
    node_level: u8,
    entries_used: usize,
    /// Position of the first key.
    body_pos: u64,
}

fn read_frame(
    src: &dyn ByteSource,
    address: u64,
    offset_size: u8,
) -> Result<NodeFrame, FormatError> {
    let mut cursor = Cursor::new(src, address);
    let sig = cursor.read_bytes(4)?;
    if sig != b"TREE" {
        return Err(FormatError::InvalidBTreeSignature);
    }
    let node_type = cursor.read_u8()?;
    let node_level = cursor.read_u8()?;
    let entries_used = cursor.read_u16()? as usize;
    cursor.skip(offset_size as u64 * 2); // left/right siblings
    Ok(NodeFrame {
        node_type,
        node_level,
        entries_used,
        body_pos: cursor.position(),
    })
}

// ---------------------------------------------------------------------------
// Group nodes (type 0)
// ---------------------------------------------------------------------------

/// A parsed group B-tree node: `entries_used + 1` name-offset keys and
/// `entries_used` child addresses.
struct GroupNode {
    level: u8,
    keys: Vec<u64>,
    children: Vec<u64>,
}

fn parse_group_node(
    src: &dyn ByteSource,
    address: u64,
    offset_size: u8,
) -> Result<GroupNode, FormatError> {
    let frame = read_frame(src, address, offset_size)?;
    if frame.node_type != 0 {
        return Err(FormatError::InvalidBTreeNodeType(frame.node_type));
    }

    let os = offset_size as usize;
    let eu = frame.entries_used;
    let body = src.read(frame.body_pos, eu * (os * 2) + os)?;

    let read_at = |pos: usize| -> u64 {
        match offset_size {
            2 => LittleEndian::read_u16(&body[pos..]) as u64,
            4 => LittleEndian::read_u32(&body[pos..]) as u64,
            _ => LittleEndian::read_u64(&body[pos..]),
        }
    };

    let mut keys = Vec::with_capacity(eu + 1);
    let mut children = Vec::with_capacity(eu);
    let mut pos = 0;
    for _ in 0..eu {
        keys.push(read_at(pos));
        pos += os;
        children.push(read_at(pos));
        pos += os;
    }
    keys.push(read_at(pos));

    Ok(GroupNode {
        level: frame.node_level,
        keys,
        children,
    })
}

/// Search a group B-tree for a link by name.
///
/// Keys bracket each child's name range, so the descent binary-searches
/// the keys (comparing the heap strings they reference) and follows a
/// single child per level; leaf-level children are symbol table nodes
/// whose sorted entries are binary-searched the same way.
pub fn find_group_entry(
    src: &dyn ByteSource,
    btree_address: u64,
    heap: &LocalHeap,
    name: &str,
    offset_size: u8,
) -> Result<Option<SymbolTableEntry>, FormatError> {
    let node = parse_group_node(src, btree_address, offset_size)?;
    if node.children.is_empty() {
        return Ok(None);
    }

    // First child index whose upper-bound key name is >= the target; the
    // target can only live in that child.
    let mut lo = 0usize;
    let mut hi = node.children.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        let key_name = heap.read_string(src, node.keys[mid + 1])?;
        if key_name.as_str() < name {
            lo = mid + 1;
        } else {
            hi = mid;
        }
    }
    if lo == node.children.len() {
        return Ok(None);
    }

    if node.level > 0 {
        return find_group_entry(src, node.children[lo], heap, name, offset_size);
    }

    // Leaf: the child is a symbol table node with entries sorted by name.
    let snod = SymbolTableNode::parse(src, node.children[lo], offset_size)?;
    let mut lo = 0usize;
    let mut hi = snod.entries.len();
    while lo < hi {
        let mid = (lo + hi) / 2;
        let entry_name = heap.read_string(src, snod.entries[mid].link_name_offset)?;
        match entry_name.as_str().cmp(name) {
            std::cmp::Ordering::Less => lo = mid + 1,
            std::cmp::Ordering::Greater => hi = mid,
            std::cmp::Ordering::Equal => return Ok(Some(snod.entries[mid].clone())),
        }
    }
    Ok(None)
}

/// Enumerate every entry of a group B-tree with its name, in tree order.
pub fn collect_group_entries(
    src: &dyn ByteSource,
    btree_address: u64,
    heap: &LocalHeap,
    offset_size: u8,
) -> Result<Vec<(String, SymbolTableEntry)>, FormatError> {
    let node = parse_group_node(src, btree_address, offset_size)?;
    let mut out = Vec::new();
    for &child in &node.children {
        if node.level > 0 {
            out.extend(collect_group_entries(src, child, heap, offset_size)?);
        } else {
            let snod = SymbolTableNode::parse(src, child, offset_size)?;
            for entry in snod.entries {
                let name = heap.read_string(src, entry.link_name_offset)?;
                out.push((name, entry));
            }
        }
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Chunk nodes (type 1)
// ---------------------------------------------------------------------------

/// Location of a single chunk, as recorded in the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkLocation {
    /// Per-dimension chunk origin (spatial dims only).
    pub origin: Vec<u64>,
    /// Stored (possibly compressed) size in bytes.
    pub size: u32,
    /// Filter mask: bit `i` set means pipeline filter `i` was skipped.
    pub filter_mask: u32,
    /// File address of the chunk bytes.
    pub address: u64,
}

/// One key of a chunk B-tree: stored size, filter mask, and rank+1
/// origin coordinates (the last is always zero).
struct ChunkKey {
    size: u32,
    filter_mask: u32,
    origin: Vec<u64>,
}

fn parse_chunk_key(body: &[u8], pos: usize, rank: usize) -> ChunkKey {
    let size = LittleEndian::read_u32(&body[pos..]);
    let filter_mask = LittleEndian::read_u32(&body[pos + 4..]);
    let mut origin = Vec::with_capacity(rank);
    for d in 0..=rank {
        let v = LittleEndian::read_u64(&body[pos + 8 + d * 8..]);
        if d < rank {
            origin.push(v);
        }
    }
    ChunkKey {
        size,
        filter_mask,
        origin,
    }
}

/// Chunk-grid geometry used to prune internal nodes by linearized chunk
/// ordinal, the same way the selection's first and last chunk are
/// computed.
struct ChunkGrid {
    chunk_dims: Vec<u64>,
    steps: Vec<u64>,
}

impl ChunkGrid {
    fn new(chunk_dims: &[u64], ds_dims: &[u64]) -> Self {
        let rank = chunk_dims.len();
        let mut counts = Vec::with_capacity(rank);
        for d in 0..rank {
            counts.push(ds_dims[d].div_ceil(chunk_dims[d]).max(1));
        }
        let mut steps = vec![1u64; rank];
        for d in (1..rank).rev() {
            steps[d - 1] = steps[d] * counts[d];
        }
        Self {
            chunk_dims: chunk_dims.to_vec(),
            steps,
        }
    }

    fn ordinal(&self, coords: &[u64]) -> u64 {
        coords
            .iter()
            .zip(&self.chunk_dims)
            .zip(&self.steps)
            .map(|((&c, &dim), &step)| (c / dim) * step)
            .sum()
    }

    fn selection_bounds(&self, slab: &Hyperslab) -> (u64, u64) {
        let starts: Vec<u64> = slab.dims().iter().map(|s| s.start).collect();
        let stops: Vec<u64> = slab.dims().iter().map(|s| s.stop).collect();
        (self.ordinal(&starts), self.ordinal(&stops))
    }
}

/// Collect the chunks of a chunked dataset that intersect `selection`,
/// walking the B-tree and skipping subtrees outside the selection's
/// chunk-ordinal range.
pub fn collect_chunks(
    src: &dyn ByteSource,
    btree_address: u64,
    chunk_dims: &[u64],
    ds_dims: &[u64],
    selection: &Hyperslab,
    offset_size: u8,
) -> Result<Vec<ChunkLocation>, FormatError> {
    let grid = ChunkGrid::new(chunk_dims, ds_dims);
    let (sel_lo, sel_hi) = grid.selection_bounds(selection);
    let mut out = Vec::new();
    walk_chunk_node(
        src,
        btree_address,
        chunk_dims,
        selection,
        &grid,
        sel_lo,
        sel_hi,
        offset_size,
        &mut out,
    )?;
    Ok(out)
}

#[allow(clippy::too_many_arguments)]
fn walk_chunk_node(
    src: &dyn ByteSource,
    address: u64,
    chunk_dims: &[u64],
    selection: &Hyperslab,
    grid: &ChunkGrid,
    sel_lo: u64,
    sel_hi: u64,
    offset_size: u8,
    out: &mut Vec<ChunkLocation>,
) -> Result<(), FormatError> {
    let frame = read_frame(src, address, offset_size)?;
    if frame.node_type != 1 {
        return Err(FormatError::InvalidBTreeNodeType(frame.node_type));
    }

    let rank = chunk_dims.len();
    let os = offset_size as usize;
    let key_size = 4 + 4 + (rank + 1) * 8;
    let eu = frame.entries_used;
    let body = src.read(frame.body_pos, eu * (key_size + os) + key_size)?;

    let read_child = |pos: usize| -> u64 {
        match offset_size {
            2 => LittleEndian::read_u16(&body[pos..]) as u64,
            4 => LittleEndian::read_u32(&body[pos..]) as u64,
            _ => LittleEndian::read_u64(&body[pos..]),
        }
    };

    let mut pos = 0;
    let mut key = parse_chunk_key(&body, pos, rank);
    pos += key_size;

    for _ in 0..eu {
        let child = read_child(pos);
        pos += os;
        let next_key = parse_chunk_key(&body, pos, rank);
        pos += key_size;

        if frame.node_level > 0 {
            // Subtree covers origins in [key.origin, next_key.origin]
            let lo = grid.ordinal(&key.origin);
            let hi = grid.ordinal(&next_key.origin);
            if hi >= sel_lo && lo <= sel_hi {
                walk_chunk_node(
                    src,
                    child,
                    chunk_dims,
                    selection,
                    grid,
                    sel_lo,
                    sel_hi,
                    offset_size,
                    out,
                )?;
            }
        } else {
            let intersects = selection
                .dims()
                .iter()
                .zip(&key.origin)
                .zip(chunk_dims)
                .all(|((s, &origin), &clen)| origin < s.stop && origin + clen > s.start);
            if intersects {
                out.push(ChunkLocation {
                    origin: key.origin.clone(),
                    size: key.size,
                    filter_mask: key.filter_mask,
                    address: child,
                });
            }
        }

        key = next_key;
    }

    Ok(())
}
