#![allow(dead_code)]
//! Synthetic HDF5 file images for end-to-end reader tests.
//!
//! Files are assembled bottom-up: raw data and chunk B-trees first, then
//! dataset object headers, then the group chain up to the root, and
//! finally a v0 superblock at offset 0. Groups use inline link messages;
//! all offsets and lengths are 8 bytes.

use std::io::Write;

/// An HDF5 file image under construction.
pub struct FileImage {
    data: Vec<u8>,
}

/// The v0 superblock with 8-byte offsets occupies exactly 0x60 bytes, so
/// the first allocation lands at the canonical root-header address.
const SUPERBLOCK_SPAN: usize = 0x60;

impl FileImage {
    pub fn new() -> Self {
        Self {
            data: vec![0u8; SUPERBLOCK_SPAN],
        }
    }

    /// Append `bytes` at the next 8-aligned offset and return it.
    pub fn alloc(&mut self, bytes: &[u8]) -> u64 {
        while self.data.len() % 8 != 0 {
            self.data.push(0);
        }
        let offset = self.data.len() as u64;
        self.data.extend_from_slice(bytes);
        offset
    }

    /// Write the superblock pointing at `root_addr` and return the image.
    pub fn finish(mut self, root_addr: u64) -> Vec<u8> {
        let sb = superblock_v0(root_addr, self.data.len() as u64);
        self.data[..sb.len()].copy_from_slice(&sb);
        self.data
    }
}

fn superblock_v0(root_addr: u64, eof: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&[0x89, b'H', b'D', b'F', b'\r', b'\n', 0x1A, b'\n']);
    buf.push(0); // superblock version
    buf.push(0); // free space version
    buf.push(0); // root group version
    buf.push(0); // reserved
    buf.push(0); // shared header version
    buf.push(8); // offset size
    buf.push(8); // length size
    buf.push(0); // reserved
    buf.extend_from_slice(&4u16.to_le_bytes()); // group leaf K
    buf.extend_from_slice(&16u16.to_le_bytes()); // group internal K
    buf.extend_from_slice(&0u32.to_le_bytes()); // consistency flags
    buf.extend_from_slice(&0u64.to_le_bytes()); // base address
    buf.extend_from_slice(&u64::MAX.to_le_bytes()); // free space address
    buf.extend_from_slice(&eof.to_le_bytes()); // end of file
    buf.extend_from_slice(&u64::MAX.to_le_bytes()); // driver info
    buf.extend_from_slice(&0u64.to_le_bytes()); // root link name offset
    buf.extend_from_slice(&root_addr.to_le_bytes()); // root object header
    buf.extend_from_slice(&0u32.to_le_bytes()); // cache type
    buf.extend_from_slice(&0u32.to_le_bytes()); // reserved
    buf.extend_from_slice(&[0u8; 16]); // scratch pad
    assert_eq!(buf.len(), SUPERBLOCK_SPAN);
    buf
}

/// A v1 object header holding the given `(type, data)` messages.
pub fn object_header_v1(messages: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut msg_bytes = Vec::new();
    for (mtype, mdata) in messages {
        msg_bytes.extend_from_slice(&mtype.to_le_bytes());
        msg_bytes.extend_from_slice(&(mdata.len() as u16).to_le_bytes());
        msg_bytes.push(0); // flags
        msg_bytes.extend_from_slice(&[0u8; 3]);
        msg_bytes.extend_from_slice(mdata);
    }
    let mut buf = Vec::new();
    buf.push(1); // version
    buf.push(0);
    buf.extend_from_slice(&(messages.len() as u16).to_le_bytes());
    buf.extend_from_slice(&1u32.to_le_bytes()); // reference count
    buf.extend_from_slice(&(msg_bytes.len() as u32).to_le_bytes());
    buf.extend_from_slice(&[0u8; 4]); // prefix padding
    buf.extend_from_slice(&msg_bytes);
    buf
}

/// Dataspace message (v1, simple) for the given extents.
pub fn dataspace_msg(dims: &[u64]) -> Vec<u8> {
    let mut buf = vec![1u8, dims.len() as u8, 0, 0];
    buf.extend_from_slice(&[0u8; 4]);
    for &d in dims {
        buf.extend_from_slice(&d.to_le_bytes());
    }
    buf
}

fn numeric_type_msg(class: u8, size: u32, bf0: u8, prop_len: usize) -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    buf[0] = class | 0x10; // version 1
    buf[1] = bf0;
    buf[4..8].copy_from_slice(&size.to_le_bytes());
    let mut props = vec![0u8; prop_len];
    props[2..4].copy_from_slice(&((size * 8) as u16).to_le_bytes());
    buf.extend_from_slice(&props);
    buf
}

pub fn f32_type_msg() -> Vec<u8> {
    numeric_type_msg(1, 4, 0x00, 12)
}

pub fn f64_type_msg() -> Vec<u8> {
    numeric_type_msg(1, 8, 0x00, 12)
}

pub fn f64_be_type_msg() -> Vec<u8> {
    numeric_type_msg(1, 8, 0x01, 12)
}

pub fn i32_type_msg() -> Vec<u8> {
    numeric_type_msg(0, 4, 0x08, 4)
}

pub fn string_type_msg(size: u32) -> Vec<u8> {
    let mut buf = vec![0u8; 8];
    buf[0] = 0x13; // class 3, version 1
    buf[4..8].copy_from_slice(&size.to_le_bytes());
    buf
}

/// Contiguous data layout message (v3).
pub fn contiguous_layout_msg(addr: u64, size: u64) -> Vec<u8> {
    let mut buf = vec![3u8, 1];
    buf.extend_from_slice(&addr.to_le_bytes());
    buf.extend_from_slice(&size.to_le_bytes());
    buf
}

/// Compact data layout message (v3) with inline data.
pub fn compact_layout_msg(data: &[u8]) -> Vec<u8> {
    let mut buf = vec![3u8, 0];
    buf.extend_from_slice(&(data.len() as u16).to_le_bytes());
    buf.extend_from_slice(data);
    buf
}

/// Chunked data layout message (v3): spatial chunk dims + element size.
pub fn chunked_layout_msg(btree_addr: u64, chunk_dims: &[u32], elem_size: u32) -> Vec<u8> {
    let mut buf = vec![3u8, 2, (chunk_dims.len() + 1) as u8];
    buf.extend_from_slice(&btree_addr.to_le_bytes());
    for &d in chunk_dims {
        buf.extend_from_slice(&d.to_le_bytes());
    }
    buf.extend_from_slice(&elem_size.to_le_bytes());
    buf
}

/// Fill value message (v3) with a defined value.
pub fn fill_value_msg(value: &[u8]) -> Vec<u8> {
    let mut buf = vec![3u8, 0x20];
    buf.extend_from_slice(&(value.len() as u32).to_le_bytes());
    buf.extend_from_slice(value);
    buf
}

/// Filter pipeline message (v2); entries are `(filter_id, client_data)`.
pub fn pipeline_msg(filters: &[(u16, Vec<u32>)]) -> Vec<u8> {
    let mut buf = vec![2u8, filters.len() as u8];
    for (id, client_data) in filters {
        buf.extend_from_slice(&id.to_le_bytes());
        buf.extend_from_slice(&0u16.to_le_bytes()); // flags
        buf.extend_from_slice(&(client_data.len() as u16).to_le_bytes());
        for &v in client_data {
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
    buf
}

/// Attribute message (v2) with a fixed-length string value.
pub fn string_attribute_msg(name: &str, value: &str) -> Vec<u8> {
    let name_bytes = {
        let mut n = name.as_bytes().to_vec();
        n.push(0);
        n
    };
    let dt = string_type_msg(value.len() as u32);
    let ds = dataspace_msg(&[]); // scalar
    let mut buf = vec![2u8, 0];
    buf.extend_from_slice(&(name_bytes.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(dt.len() as u16).to_le_bytes());
    buf.extend_from_slice(&(ds.len() as u16).to_le_bytes());
    buf.extend_from_slice(&name_bytes);
    buf.extend_from_slice(&dt);
    buf.extend_from_slice(&ds);
    buf.extend_from_slice(value.as_bytes());
    buf
}

/// Hard link message (v1).
pub fn link_msg(name: &str, addr: u64) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.push(1); // version
    buf.push(0x00); // flags: 1-byte name length
    buf.push(name.len() as u8);
    buf.extend_from_slice(name.as_bytes());
    buf.extend_from_slice(&addr.to_le_bytes());
    buf
}

/// A chunk entry for [`chunk_btree_leaf`].
pub struct ChunkEntry {
    pub origin: Vec<u64>,
    pub stored_size: u32,
    pub filter_mask: u32,
    pub address: u64,
}

/// A single-leaf chunk B-tree (type 1, level 0).
pub fn chunk_btree_leaf(chunks: &[ChunkEntry], rank: usize) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(b"TREE");
    buf.push(1); // raw data chunks
    buf.push(0); // leaf
    buf.extend_from_slice(&(chunks.len() as u16).to_le_bytes());
    buf.extend_from_slice(&u64::MAX.to_le_bytes()); // left sibling
    buf.extend_from_slice(&u64::MAX.to_le_bytes()); // right sibling
    for chunk in chunks {
        buf.extend_from_slice(&chunk.stored_size.to_le_bytes());
        buf.extend_from_slice(&chunk.filter_mask.to_le_bytes());
        for d in 0..rank {
            buf.extend_from_slice(&chunk.origin[d].to_le_bytes());
        }
        buf.extend_from_slice(&0u64.to_le_bytes()); // trailing zero
        buf.extend_from_slice(&chunk.address.to_le_bytes());
    }
    // final bounding key
    buf.extend_from_slice(&0u32.to_le_bytes());
    buf.extend_from_slice(&0u32.to_le_bytes());
    for _ in 0..=rank {
        buf.extend_from_slice(&u64::MAX.to_le_bytes());
    }
    buf
}

/// zlib-compress bytes the way the deflate filter stores them.
pub fn deflate(data: &[u8]) -> Vec<u8> {
    let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(6));
    enc.write_all(data).unwrap();
    enc.finish().unwrap()
}

/// Forward byte-shuffle, element size `elem`.
pub fn shuffle(data: &[u8], elem: usize) -> Vec<u8> {
    let n = data.len() / elem;
    let mut out = vec![0u8; data.len()];
    for i in 0..n {
        for j in 0..elem {
            out[j * n + i] = data[i * elem + j];
        }
    }
    out
}

/// A group object header holding hard links plus any extra messages
/// (attributes, usually).
pub fn group_header(links: &[(&str, u64)], extra: &[(u16, Vec<u8>)]) -> Vec<u8> {
    let mut messages: Vec<(u16, Vec<u8>)> = links
        .iter()
        .map(|&(name, addr)| (0x0006, link_msg(name, addr)))
        .collect();
    messages.extend(extra.iter().cloned());
    object_header_v1(&messages)
}

/// Wrap a dataset header in single-link groups along `path` (segments
/// outermost-first) and return the root group's address. Extra messages
/// land on the root group.
pub fn nest_in_groups(
    image: &mut FileImage,
    path: &[&str],
    leaf_header_addr: u64,
    root_extra: &[(u16, Vec<u8>)],
) -> u64 {
    assert!(!path.is_empty());
    let mut child = leaf_header_addr;
    for (i, segment) in path.iter().enumerate().rev() {
        let extra: &[(u16, Vec<u8>)] = if i == 0 { root_extra } else { &[] };
        let header = group_header(&[(segment, child)], extra);
        child = image.alloc(&header);
    }
    child
}
