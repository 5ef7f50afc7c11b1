//! Filter pipeline inverses: deflate (zlib) and byte shuffle.
//!
//! Filters are declared in write order; reading reverses them. A chunk's
//! filter mask disables individual filters for that chunk only: bit `i`
//! set means filter `i` of the pipeline was not applied when the chunk
//! was written and must be skipped on read.

use std::io::Read;

use crate::error::FormatError;
use crate::filter_pipeline::{FilterPipeline, FILTER_DEFLATE, FILTER_SHUFFLE};

/// Reverse a chunk's filter pipeline, honoring its filter mask.
///
/// `element_size` drives the shuffle inverse. `expected_size` is the
/// decompressed byte count implied by the chunk shape; a mismatch after
/// the last inverse is a format error.
pub fn reverse_filters(
    data: &[u8],
    pipeline: &FilterPipeline,
    filter_mask: u32,
    element_size: usize,
    expected_size: usize,
) -> Result<Vec<u8>, FormatError> {
    let mut out = data.to_vec();

    for (index, filter) in pipeline.filters.iter().enumerate().rev() {
        if filter_mask & (1 << index) != 0 {
            continue;
        }
        out = match filter.filter_id {
            FILTER_DEFLATE => inflate(&out)?,
            FILTER_SHUFFLE => unshuffle(&out, element_size)?,
            other => return Err(FormatError::UnsupportedFilter(other)),
        };
    }

    if out.len() != expected_size {
        return Err(FormatError::DataSizeMismatch {
            expected: expected_size,
            actual: out.len(),
        });
    }

    Ok(out)
}

/// Inflate zlib-wrapped deflate data.
pub fn inflate(data: &[u8]) -> Result<Vec<u8>, FormatError> {
    let mut decoder = flate2::read::ZlibDecoder::new(data);
    let mut out = Vec::new();
    decoder
        .read_to_end(&mut out)
        .map_err(|e| FormatError::FilterError {
            detail: format!("inflate: {e}"),
        })?;
    Ok(out)
}

/// Undo the byte shuffle: on disk all byte-0s of every element come
/// first, then all byte-1s, and so on. The inverse restores per-element
/// byte order.
pub fn unshuffle(data: &[u8], element_size: usize) -> Result<Vec<u8>, FormatError> {
    if element_size <= 1 {
        return Ok(data.to_vec());
    }
    if data.len() % element_size != 0 {
        return Err(FormatError::FilterError {
            detail: format!(
                "shuffle: {} bytes not a multiple of element size {}",
                data.len(),
                element_size
            ),
        });
    }
    let num_elements = data.len() / element_size;
    let mut out = vec![0u8; data.len()];

    for i in 0..num_elements {
        for j in 0..element_size {
            out[i * element_size + j] = data[j * num_elements + i];
        }
    }

    Ok(out)
}

/// Forward shuffle, used by tests to build reference chunks.
pub fn shuffle(data: &[u8], element_size: usize) -> Result<Vec<u8>, FormatError> {
    if element_size <= 1 {
        return Ok(data.to_vec());
    }
    if data.len() % element_size != 0 {
        return Err(FormatError::FilterError {
            detail: format!(
                "shuffle: {} bytes not a multiple of element size {}",
                data.len(),
                element_size
            ),
        });
    }
    let num_elements = data.len() / element_size;
    let mut out = vec![0u8; data.len()];

    for i in 0..num_elements {
        for j in 0..element_size {
            out[j * num_elements + i] = data[i * element_size + j];
        }
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter_pipeline::FilterDescription;
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut enc = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::new(6));
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    fn descr(id: u16) -> FilterDescription {
        FilterDescription {
            filter_id: id,
            name: None,
            flags: 0,
            client_data: Vec::new(),
        }
    }

    #[test]
    fn shuffle_known_pattern() {
        // 2 elements of size 4: [A0 A1 A2 A3 B0 B1 B2 B3]
        let data = vec![0xA0, 0xA1, 0xA2, 0xA3, 0xB0, 0xB1, 0xB2, 0xB3];
        let shuffled = shuffle(&data, 4).unwrap();
        assert_eq!(
            shuffled,
            vec![0xA0, 0xB0, 0xA1, 0xB1, 0xA2, 0xB2, 0xA3, 0xB3]
        );
        assert_eq!(unshuffle(&shuffled, 4).unwrap(), data);
    }

    #[test]
    fn shuffle_element_size_one_is_identity() {
        let data = vec![5u8, 4, 3, 2, 1];
        assert_eq!(unshuffle(&data, 1).unwrap(), data);
    }

    #[test]
    fn shuffle_bad_length() {
        assert!(matches!(
            unshuffle(&[1, 2, 3], 2),
            Err(FormatError::FilterError { .. })
        ));
    }

    #[test]
    fn inflate_roundtrip() {
        let data: Vec<u8> = (0..=255u8).cycle().take(1024).collect();
        assert_eq!(inflate(&deflate(&data)).unwrap(), data);
    }

    #[test]
    fn inflate_garbage_fails() {
        assert!(matches!(
            inflate(&[0x00, 0x01, 0x02]),
            Err(FormatError::FilterError { .. })
        ));
    }

    #[test]
    fn reverse_shuffle_deflate() {
        // write order: shuffle then deflate → read order: inflate then unshuffle
        let pipeline = FilterPipeline {
            version: 2,
            filters: vec![descr(FILTER_SHUFFLE), descr(FILTER_DEFLATE)],
        };
        let original: Vec<u8> = (0..200u64).flat_map(|i| (i as f64).to_le_bytes()).collect();
        let stored = deflate(&shuffle(&original, 8).unwrap());

        let decoded = reverse_filters(&stored, &pipeline, 0, 8, original.len()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn filter_mask_skips_single_filter() {
        // pipeline [deflate, shuffle]; mask bit 1 disables shuffle for the
        // chunk, so decode is inflate only
        let pipeline = FilterPipeline {
            version: 2,
            filters: vec![descr(FILTER_DEFLATE), descr(FILTER_SHUFFLE)],
        };
        let original: Vec<u8> = (0..64u8).collect();
        let stored = deflate(&original);

        let decoded = reverse_filters(&stored, &pipeline, 0b10, 8, original.len()).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn filter_mask_all_set_is_passthrough() {
        let pipeline = FilterPipeline {
            version: 1,
            filters: vec![descr(FILTER_SHUFFLE), descr(FILTER_DEFLATE)],
        };
        let raw = vec![1u8, 2, 3, 4];
        let decoded = reverse_filters(&raw, &pipeline, 0b11, 4, 4).unwrap();
        assert_eq!(decoded, raw);
    }

    #[test]
    fn unknown_filter_id_fails() {
        let pipeline = FilterPipeline {
            version: 2,
            filters: vec![descr(4)], // szip
        };
        assert_eq!(
            reverse_filters(&[0u8; 8], &pipeline, 0, 1, 8).unwrap_err(),
            FormatError::UnsupportedFilter(4)
        );
    }

    #[test]
    fn size_mismatch_detected() {
        let pipeline = FilterPipeline {
            version: 2,
            filters: vec![descr(FILTER_DEFLATE)],
        };
        let stored = deflate(&[1u8, 2, 3, 4]);
        assert!(matches!(
            reverse_filters(&stored, &pipeline, 0, 1, 100),
            Err(FormatError::DataSizeMismatch {
                expected: 100,
                actual: 4
            })
        ));
    }
}
