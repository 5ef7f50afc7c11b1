//! Dataset assembly: compact, contiguous, and chunked layouts decoded
//! into a caller-owned buffer shaped by the hyperslab selection.
//!
//! Chunk fetch + filter inverse runs on the worker pool; placement into
//! the output buffer is a serial pass over the decoded tiles, each of
//! which touches a disjoint output region.

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use cloudhdf5_format::btree_v1::{self, ChunkLocation};
use cloudhdf5_format::data_layout::DataLayout;
use cloudhdf5_format::data_object::DataObject;
use cloudhdf5_format::dataspace::DataspaceType;
use cloudhdf5_format::datatype::DatatypeByteOrder;
use cloudhdf5_format::error::FormatError;
use cloudhdf5_format::filters;
use cloudhdf5_format::selection::{copy_tile_into_output, element_strides, DimSlice, Hyperslab};
use cloudhdf5_format::source::ByteSource;
use cloudhdf5_format::superblock::Superblock;

use crate::error::Error;
use crate::types::{attrs_to_map, DType, DatasetData, Endian};

/// Read a dataset's selection through the cached source.
pub(crate) fn read_dataset(
    source: &dyn ByteSource,
    superblock: &Superblock,
    object: &DataObject,
    requested: &[DimSlice],
    pool: &rayon::ThreadPool,
    cancel: &AtomicBool,
    native_order: bool,
) -> Result<DatasetData, Error> {
    let datatype = object
        .datatype
        .as_ref()
        .ok_or(Error::MissingMetadata("datatype"))?;
    let dataspace = object
        .dataspace
        .as_ref()
        .ok_or(Error::MissingMetadata("dataspace"))?;
    let layout = object
        .layout
        .as_ref()
        .ok_or(Error::MissingMetadata("data layout"))?;

    let mut dtype = DType::from_datatype(datatype);
    let elem = datatype.type_size() as usize;
    if elem == 0 {
        return Err(Error::Format(FormatError::DataSizeMismatch {
            expected: 1,
            actual: 0,
        }));
    }

    let fill = object
        .fill_value
        .as_ref()
        .filter(|f| f.is_defined())
        .map(|f| f.bytes.clone());
    let attributes = attrs_to_map(&object.attributes);

    if dataspace.space_type == DataspaceType::Null {
        return Ok(DatasetData {
            values: Vec::new(),
            shape: vec![0],
            dtype,
            fill,
            attributes,
        });
    }

    let extents = dataspace.dimensions.clone();
    let slab = Hyperslab::normalize(requested, &extents).map_err(Error::Format)?;
    let shape = slab.shape();
    let total = slab.num_elements() as usize;
    let mut values = vec![0u8; total * elem];

    if total > 0 {
        match layout {
            DataLayout::Compact { data } => {
                let needed = extents.iter().product::<u64>() as usize * elem;
                if data.len() < needed.max(elem) {
                    return Err(Error::Format(FormatError::DataSizeMismatch {
                        expected: needed,
                        actual: data.len(),
                    }));
                }
                let origin = vec![0u64; extents.len()];
                copy_tile_into_output(data, &extents, &origin, &slab, &mut values, elem);
            }
            DataLayout::Contiguous { address, size } => {
                let address = address.ok_or(Error::Format(FormatError::NoDataAllocated))?;
                read_contiguous(
                    source, address, *size, &extents, &slab, &mut values, elem,
                )?;
            }
            DataLayout::Chunked {
                chunk_dimensions,
                btree_address,
            } => {
                read_chunked(
                    source,
                    superblock,
                    object,
                    chunk_dimensions,
                    *btree_address,
                    &extents,
                    &slab,
                    &mut values,
                    elem,
                    fill.as_deref(),
                    pool,
                    cancel,
                )?;
            }
        }
    }

    // byte-swap to native order when requested
    if native_order && datatype.byte_order() == DatatypeByteOrder::BigEndian && elem > 1 {
        for chunk in values.chunks_exact_mut(elem) {
            chunk.reverse();
        }
        dtype.endian = Endian::Little;
    }

    Ok(DatasetData {
        values,
        shape,
        dtype,
        fill,
        attributes,
    })
}

/// Read a contiguous layout: a single range for full unit-stride
/// selections, per-row range reads otherwise, element gather within a
/// row for strided inner dimensions.
fn read_contiguous(
    source: &dyn ByteSource,
    address: u64,
    declared_size: u64,
    extents: &[u64],
    slab: &Hyperslab,
    out: &mut [u8],
    elem: usize,
) -> Result<(), Error> {
    let total_bytes = extents.iter().product::<u64>() * elem as u64;
    if declared_size != 0 && declared_size < total_bytes {
        return Err(Error::Format(FormatError::DataSizeMismatch {
            expected: total_bytes as usize,
            actual: declared_size as usize,
        }));
    }

    let rank = extents.len();
    if rank == 0 {
        let bytes = source.read(address, elem)?;
        out.copy_from_slice(&bytes);
        return Ok(());
    }

    if slab.is_full(extents) {
        let bytes = source.read(address, out.len())?;
        out.copy_from_slice(&bytes);
        return Ok(());
    }

    let shape = slab.shape();
    let ds_strides = element_strides(extents);
    let out_strides = element_strides(&shape);
    let inner = rank - 1;
    let inner_slice = slab.dims()[inner];
    let inner_count = shape[inner] as usize;

    let mut idx = vec![0u64; inner];
    loop {
        let mut src_base = inner_slice.start;
        let mut out_base = 0u64;
        for d in 0..inner {
            let s = slab.dims()[d];
            src_base += (s.start + idx[d] * s.stride) * ds_strides[d];
            out_base += idx[d] * out_strides[d];
        }

        let dst = out_base as usize * elem;
        if inner_slice.stride == 1 {
            let bytes = source.read(address + src_base * elem as u64, inner_count * elem)?;
            out[dst..dst + inner_count * elem].copy_from_slice(&bytes);
        } else {
            // fetch the spanning row once, gather the strided elements
            let span = (inner_count as u64 - 1) * inner_slice.stride + 1;
            let bytes = source.read(address + src_base * elem as u64, span as usize * elem)?;
            for k in 0..inner_count {
                let from = k * inner_slice.stride as usize * elem;
                out[dst + k * elem..dst + (k + 1) * elem]
                    .copy_from_slice(&bytes[from..from + elem]);
            }
        }

        // advance the outer odometer
        let mut d = inner;
        loop {
            if d == 0 {
                return Ok(());
            }
            d -= 1;
            idx[d] += 1;
            if idx[d] < shape[d] {
                break;
            }
            idx[d] = 0;
        }
    }
}

/// Read a chunked layout: prune-enumerate the index, decode intersecting
/// chunks on the pool, place each tile, and leave uncovered regions at
/// the fill value.
#[allow(clippy::too_many_arguments)]
fn read_chunked(
    source: &dyn ByteSource,
    superblock: &Superblock,
    object: &DataObject,
    chunk_dimensions: &[u32],
    btree_address: Option<u64>,
    extents: &[u64],
    slab: &Hyperslab,
    out: &mut [u8],
    elem: usize,
    fill: Option<&[u8]>,
    pool: &rayon::ThreadPool,
    cancel: &AtomicBool,
) -> Result<(), Error> {
    let rank = extents.len();
    if chunk_dimensions.len() != rank + 1 {
        return Err(Error::Format(FormatError::DataSizeMismatch {
            expected: rank + 1,
            actual: chunk_dimensions.len(),
        }));
    }
    if chunk_dimensions[rank] as usize != elem {
        return Err(Error::Format(FormatError::DataSizeMismatch {
            expected: elem,
            actual: chunk_dimensions[rank] as usize,
        }));
    }

    let chunk_dims: Vec<u64> = chunk_dimensions[..rank].iter().map(|&d| d as u64).collect();
    let chunk_elems = chunk_dims.iter().product::<u64>() as usize;
    let chunk_bytes = chunk_elems * elem;
    if chunk_elems == 0 {
        return Err(Error::Format(FormatError::DataSizeMismatch {
            expected: 1,
            actual: 0,
        }));
    }

    // sparse chunks leave gaps at the declared fill value
    if let Some(fill) = fill {
        if !fill.is_empty() {
            for slot in out.chunks_mut(fill.len()) {
                let n = slot.len().min(fill.len());
                slot[..n].copy_from_slice(&fill[..n]);
            }
        }
    }

    let btree_address = match btree_address {
        Some(addr) => addr,
        None => return Ok(()), // no chunks ever written
    };

    let chunks = btree_v1::collect_chunks(
        source,
        btree_address,
        &chunk_dims,
        extents,
        slab,
        superblock.offset_size,
    )?;
    log::debug!(
        "chunked read: {} intersecting chunks, {} bytes each decoded",
        chunks.len(),
        chunk_bytes
    );

    let pipeline = object.pipeline.as_ref();
    let decoded: Result<Vec<(ChunkLocation, Vec<u8>)>, Error> = pool.install(|| {
        chunks
            .into_par_iter()
            .map(|loc| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(Error::Cancelled);
                }
                let raw = source.read(loc.address, loc.size as usize)?;
                let bytes = match pipeline {
                    Some(p) => {
                        filters::reverse_filters(&raw, p, loc.filter_mask, elem, chunk_bytes)?
                    }
                    None => {
                        if raw.len() != chunk_bytes {
                            return Err(Error::Format(FormatError::DataSizeMismatch {
                                expected: chunk_bytes,
                                actual: raw.len(),
                            }));
                        }
                        raw
                    }
                };
                Ok((loc, bytes))
            })
            .collect()
    });

    for (loc, bytes) in decoded? {
        copy_tile_into_output(&bytes, &chunk_dims, &loc.origin, slab, out, elem);
    }

    Ok(())
}
