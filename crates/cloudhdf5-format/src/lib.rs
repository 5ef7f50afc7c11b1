//! Low-level HDF5 binary structure decoding for the cloudhdf5 reader.
//!
//! Every parser pulls bytes through the [`source::ByteSource`] trait so
//! the same code serves in-memory buffers, local files, and object
//! storage behind a range-coalescing block cache. The supported subset:
//! superblock v0/v2, object headers v1/v2, B-tree v1 group and chunk
//! indexes, local and fractal heaps, data layout v3, filter pipelines
//! v1/v2 with deflate and shuffle.

pub mod attribute;
pub mod btree_v1;
pub mod cursor;
pub mod data_layout;
pub mod data_object;
pub mod dataspace;
pub mod datatype;
pub mod error;
pub mod fill_value;
pub mod filter_pipeline;
pub mod filters;
pub mod fractal_heap;
pub mod group;
pub mod link_info;
pub mod link_message;
pub mod local_heap;
pub mod message_type;
pub mod object_header;
pub mod selection;
pub mod signature;
pub mod source;
pub mod superblock;
pub mod symbol_table;
