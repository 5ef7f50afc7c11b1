//! Hyperslab selections: per-dimension `[start, stop)` ranges with an
//! optional stride, validated against dataset extents, plus the N-D copy
//! routine that places chunk regions into an output buffer.

use crate::error::FormatError;

/// One dimension of a hyperslab selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimSlice {
    /// First selected index.
    pub start: u64,
    /// One past the last selectable index.
    pub stop: u64,
    /// Step between selected indices (>= 1).
    pub stride: u64,
}

impl DimSlice {
    /// A contiguous `[start, stop)` slice.
    pub fn range(start: u64, stop: u64) -> Self {
        Self {
            start,
            stop,
            stride: 1,
        }
    }

    /// A strided `[start, stop)` slice.
    pub fn strided(start: u64, stop: u64, stride: u64) -> Self {
        Self {
            start,
            stop,
            stride,
        }
    }

    /// Number of selected indices.
    pub fn count(&self) -> u64 {
        if self.stop <= self.start {
            0
        } else {
            (self.stop - self.start).div_ceil(self.stride)
        }
    }
}

/// An axis-aligned rectangular selection over a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperslab {
    dims: Vec<DimSlice>,
}

impl Hyperslab {
    /// The full-extent selection for the given dataset dimensions.
    pub fn full(extents: &[u64]) -> Self {
        Self {
            dims: extents.iter().map(|&e| DimSlice::range(0, e)).collect(),
        }
    }

    /// Validate a requested selection against dataset extents.
    ///
    /// Dimensions beyond the request default to their full range. A
    /// request with more dimensions than the dataset, a zero stride, or a
    /// reversed range is invalid; a stop past the extent is out of
    /// bounds.
    pub fn normalize(requested: &[DimSlice], extents: &[u64]) -> Result<Hyperslab, FormatError> {
        if requested.len() > extents.len() {
            return Err(FormatError::InvalidHyperslab {
                detail: format!(
                    "selection has {} dimensions, dataset has {}",
                    requested.len(),
                    extents.len()
                ),
            });
        }

        let mut dims = Vec::with_capacity(extents.len());
        for (d, &extent) in extents.iter().enumerate() {
            let slice = match requested.get(d) {
                Some(s) => *s,
                None => DimSlice::range(0, extent),
            };
            if slice.stride == 0 {
                return Err(FormatError::InvalidHyperslab {
                    detail: format!("zero stride in dimension {d}"),
                });
            }
            if slice.stop < slice.start {
                return Err(FormatError::InvalidHyperslab {
                    detail: format!(
                        "reversed range [{}, {}) in dimension {d}",
                        slice.start, slice.stop
                    ),
                });
            }
            if slice.stop > extent {
                return Err(FormatError::OutOfBounds {
                    dim: d,
                    start: slice.start,
                    stop: slice.stop,
                    extent,
                });
            }
            dims.push(slice);
        }

        Ok(Hyperslab { dims })
    }

    /// Per-dimension slices.
    pub fn dims(&self) -> &[DimSlice] {
        &self.dims
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Output shape of this selection.
    pub fn shape(&self) -> Vec<u64> {
        self.dims.iter().map(|s| s.count()).collect()
    }

    /// Total number of selected elements.
    pub fn num_elements(&self) -> u64 {
        self.dims.iter().map(|s| s.count()).product()
    }

    /// Whether every dimension has stride 1.
    pub fn is_unit_stride(&self) -> bool {
        self.dims.iter().all(|s| s.stride == 1)
    }

    /// Whether this selection covers the whole of `extents` contiguously.
    pub fn is_full(&self, extents: &[u64]) -> bool {
        self.dims.len() == extents.len()
            && self
                .dims
                .iter()
                .zip(extents)
                .all(|(s, &e)| s.start == 0 && s.stop == e && s.stride == 1)
    }
}

/// Row-major element strides for the given dimensions.
pub fn element_strides(dims: &[u64]) -> Vec<u64> {
    let rank = dims.len();
    let mut strides = vec![1u64; rank];
    for d in (0..rank.saturating_sub(1)).rev() {
        strides[d] = strides[d + 1] * dims[d + 1];
    }
    strides
}

/// Per-dimension overlap of a selection with a tile at `origin`.
struct DimOverlap {
    /// First selected output index that falls inside the tile.
    k0: u64,
    /// Global coordinate of that index.
    g0: u64,
    /// Number of selected indices inside the tile.
    count: u64,
    /// Selection stride.
    stride: u64,
}

fn dim_overlap(slice: &DimSlice, origin: u64, tile_len: u64) -> Option<DimOverlap> {
    let lo = slice.start.max(origin);
    let k0 = if lo <= slice.start {
        0
    } else {
        (lo - slice.start).div_ceil(slice.stride)
    };
    let g0 = slice.start + k0 * slice.stride;
    let hi = slice.stop.min(origin + tile_len);
    if g0 >= hi {
        return None;
    }
    Some(DimOverlap {
        k0,
        g0,
        count: (hi - g0).div_ceil(slice.stride),
        stride: slice.stride,
    })
}

/// Copy the region of a decoded tile that intersects `slab` into the
/// output buffer.
///
/// `tile` is a row-major buffer of shape `tile_dims` whose element at
/// local coordinate `c` holds the dataset value at `origin + c`. The
/// output buffer is row-major of shape `slab.shape()`. Writes for
/// different tiles touch disjoint output elements, so assembling a
/// dataset is a plain sequence of calls.
pub fn copy_tile_into_output(
    tile: &[u8],
    tile_dims: &[u64],
    origin: &[u64],
    slab: &Hyperslab,
    out: &mut [u8],
    elem_size: usize,
) {
    let rank = slab.rank();
    if rank == 0 {
        let n = elem_size.min(tile.len()).min(out.len());
        out[..n].copy_from_slice(&tile[..n]);
        return;
    }

    let mut overlaps = Vec::with_capacity(rank);
    for d in 0..rank {
        match dim_overlap(&slab.dims()[d], origin[d], tile_dims[d]) {
            Some(o) => overlaps.push(o),
            None => return,
        }
    }

    let out_strides = element_strides(&slab.shape());
    let tile_strides = element_strides(tile_dims);

    let inner = rank - 1;
    let inner_ov = &overlaps[inner];
    let inner_contiguous = inner_ov.stride == 1;

    // odometer over the outer dimensions of the overlap grid
    let mut idx = vec![0u64; inner];
    loop {
        let mut out_base = inner_ov.k0 * out_strides[inner];
        let mut tile_base = (inner_ov.g0 - origin[inner]) * tile_strides[inner];
        for d in 0..inner {
            let o = &overlaps[d];
            let k = o.k0 + idx[d];
            let g = o.g0 + idx[d] * o.stride;
            out_base += k * out_strides[d];
            tile_base += (g - origin[d]) * tile_strides[d];
        }

        let out_base = out_base as usize * elem_size;
        let tile_base = tile_base as usize * elem_size;
        let count = inner_ov.count as usize;

        if inner_contiguous {
            let len = count * elem_size;
            out[out_base..out_base + len].copy_from_slice(&tile[tile_base..tile_base + len]);
        } else {
            let step = inner_ov.stride as usize * elem_size;
            for i in 0..count {
                let src = tile_base + i * step;
                let dst = out_base + i * elem_size;
                out[dst..dst + elem_size].copy_from_slice(&tile[src..src + elem_size]);
            }
        }

        // advance the outer odometer
        let mut d = inner;
        loop {
            if d == 0 {
                return;
            }
            d -= 1;
            idx[d] += 1;
            if idx[d] < overlaps[d].count {
                break;
            }
            idx[d] = 0;
        }
    }
}
