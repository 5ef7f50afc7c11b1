//! Group child lookup: symbol-table groups search the B-tree by name,
//! link-based groups scan inline link messages and fall back to the
//! fractal heap.

use crate::btree_v1;
use crate::data_object::DataObject;
use crate::error::FormatError;
use crate::fractal_heap::{self, FractalHeapHeader};
use crate::link_message::LinkTarget;
use crate::local_heap::LocalHeap;
use crate::source::ByteSource;
use crate::superblock::Superblock;

/// Strip leading and trailing separators from a dataset path.
pub fn normalize_path(path: &str) -> &str {
    path.trim_matches('/')
}

/// Split a path into its non-empty segments.
pub fn path_segments(path: &str) -> Vec<&str> {
    normalize_path(path)
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

/// Look up a child by name within a group object.
///
/// Returns the child's object header address, or `None` when the group
/// has no such member. Soft and external links are reported as
/// unsupported rather than silently skipped.
pub fn find_child(
    src: &dyn ByteSource,
    superblock: &Superblock,
    group: &DataObject,
    name: &str,
) -> Result<Option<u64>, FormatError> {
    let os = superblock.offset_size;
    let ls = superblock.length_size;

    if let Some(sym) = &group.symbol_table {
        let heap = LocalHeap::parse(src, sym.local_heap_address, os, ls)?;
        let entry = btree_v1::find_group_entry(src, sym.btree_address, &heap, name, os)?;
        return match entry {
            Some(e) if e.cache_type == 2 => Err(FormatError::UnsupportedLinkType(2)),
            Some(e) => Ok(Some(e.object_header_address)),
            None => Ok(None),
        };
    }

    // inline link messages
    for link in &group.links {
        if link.name == name {
            return match &link.target {
                LinkTarget::Hard { address } => Ok(Some(*address)),
                LinkTarget::Soft { .. } => Err(FormatError::UnsupportedLinkType(1)),
                LinkTarget::External { .. } => Err(FormatError::UnsupportedLinkType(64)),
            };
        }
    }

    // dense link storage in a fractal heap
    if let Some(info) = &group.link_info {
        if let Some(heap_addr) = info.fractal_heap_address {
            log::debug!("dense group lookup of {name} via fractal heap at {heap_addr:#x}");
            let heap = FractalHeapHeader::parse(src, heap_addr, os, ls)?;
            for link in fractal_heap::enumerate_links(src, &heap, os)? {
                if link.name == name {
                    return match &link.target {
                        LinkTarget::Hard { address } => Ok(Some(*address)),
                        LinkTarget::Soft { .. } => Err(FormatError::UnsupportedLinkType(1)),
                        LinkTarget::External { .. } => {
                            Err(FormatError::UnsupportedLinkType(64))
                        }
                    };
                }
            }
        }
    }

    Ok(None)
}
