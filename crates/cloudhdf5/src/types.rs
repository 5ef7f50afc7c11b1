//! Public data model: read requests, result buffers, and attribute
//! values.

use std::collections::BTreeMap;

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use cloudhdf5_format::attribute::AttributeMessage;
use cloudhdf5_format::datatype::{Datatype, DatatypeByteOrder};
pub use cloudhdf5_format::selection::DimSlice;

use crate::error::Error;

/// Coarse datatype class of a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeClass {
    /// Fixed-point integer.
    Integer,
    /// IEEE floating point.
    Float,
    /// Fixed-length string.
    String,
}

/// Byte order of the returned values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

/// Element type of a dataset result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DType {
    /// Type class.
    pub class: TypeClass,
    /// Element size in bytes.
    pub size: u32,
    /// Whether integers are signed.
    pub signed: bool,
    /// Byte order of `values`.
    pub endian: Endian,
}

impl DType {
    /// Derive the public type descriptor from a parsed datatype.
    pub(crate) fn from_datatype(dt: &Datatype) -> DType {
        let endian = match dt.byte_order() {
            DatatypeByteOrder::LittleEndian => Endian::Little,
            DatatypeByteOrder::BigEndian => Endian::Big,
        };
        let class = match dt {
            Datatype::FixedPoint { .. } => TypeClass::Integer,
            Datatype::FloatingPoint { .. } => TypeClass::Float,
            Datatype::String { .. } => TypeClass::String,
        };
        DType {
            class,
            size: dt.type_size(),
            signed: dt.is_signed(),
            endian,
        }
    }

    fn describe(&self) -> String {
        let kind = match (self.class, self.signed) {
            (TypeClass::Float, _) => "float",
            (TypeClass::Integer, true) => "signed integer",
            (TypeClass::Integer, false) => "unsigned integer",
            (TypeClass::String, _) => "string",
        };
        format!("{}-byte {kind}", self.size)
    }
}

/// A single dataset read request.
#[derive(Debug, Clone)]
pub struct ReadRequest {
    /// Absolute dataset path, e.g. `/gt1l/heights/h_ph`.
    pub dataset: String,
    /// Per-dimension selection; empty means the full extent.
    pub hyperslab: Vec<DimSlice>,
}

impl ReadRequest {
    /// Request the full extent of a dataset.
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            hyperslab: Vec::new(),
        }
    }

    /// Select `[start, stop)` ranges, one per leading dimension.
    pub fn with_ranges(mut self, ranges: &[(u64, u64)]) -> Self {
        self.hyperslab = ranges
            .iter()
            .map(|&(start, stop)| DimSlice::range(start, stop))
            .collect();
        self
    }

    /// Select with explicit per-dimension slices (including strides).
    pub fn with_hyperslab(mut self, dims: Vec<DimSlice>) -> Self {
        self.hyperslab = dims;
        self
    }
}

/// A decoded attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// String attribute, truncated at the first NUL.
    String(String),
    /// Signed integer elements.
    Int(Vec<i64>),
    /// Unsigned integer elements.
    Uint(Vec<u64>),
    /// Floating-point elements.
    Float(Vec<f64>),
}

/// Decode an attribute message into a typed value.
pub(crate) fn decode_attribute(attr: &AttributeMessage) -> AttrValue {
    let raw = &attr.raw_data;
    match &attr.datatype {
        Datatype::String { .. } => {
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            AttrValue::String(String::from_utf8_lossy(&raw[..end]).into_owned())
        }
        Datatype::FixedPoint {
            size,
            byte_order,
            signed,
        } => {
            let size = *size as usize;
            let be = matches!(byte_order, DatatypeByteOrder::BigEndian);
            let ints = raw.chunks_exact(size).map(|c| read_uint(c, be));
            if *signed {
                AttrValue::Int(
                    ints.map(|v| sign_extend(v, size))
                        .collect(),
                )
            } else {
                AttrValue::Uint(ints.collect())
            }
        }
        Datatype::FloatingPoint { size, byte_order } => {
            let size = *size as usize;
            let be = matches!(byte_order, DatatypeByteOrder::BigEndian);
            let floats = raw
                .chunks_exact(size)
                .map(|c| match (size, be) {
                    (4, false) => LittleEndian::read_f32(c) as f64,
                    (4, true) => BigEndian::read_f32(c) as f64,
                    (8, false) => LittleEndian::read_f64(c),
                    (8, true) => BigEndian::read_f64(c),
                    _ => f64::NAN,
                })
                .collect();
            AttrValue::Float(floats)
        }
    }
}

fn read_uint(bytes: &[u8], big_endian: bool) -> u64 {
    let mut v = 0u64;
    if big_endian {
        for &b in bytes {
            v = (v << 8) | b as u64;
        }
    } else {
        for &b in bytes.iter().rev() {
            v = (v << 8) | b as u64;
        }
    }
    v
}

fn sign_extend(v: u64, size: usize) -> i64 {
    let shift = 64 - size * 8;
    ((v << shift) as i64) >> shift
}

/// Convert attribute messages into a name-keyed map.
pub(crate) fn attrs_to_map(attrs: &[AttributeMessage]) -> BTreeMap<String, AttrValue> {
    attrs
        .iter()
        .map(|a| (a.name.clone(), decode_attribute(a)))
        .collect()
}

/// A decoded dataset: raw values plus shape, type, fill, and attributes.
#[derive(Debug, Clone)]
pub struct DatasetData {
    /// Raw element bytes in row-major order.
    pub values: Vec<u8>,
    /// Shape of the selection.
    pub shape: Vec<u64>,
    /// Element type of `values`.
    pub dtype: DType,
    /// Declared fill value bytes, if any.
    pub fill: Option<Vec<u8>>,
    /// Attributes attached to the dataset.
    pub attributes: BTreeMap<String, AttrValue>,
}

macro_rules! typed_accessor {
    ($name:ident, $ty:ty, $class:pat, $size:expr, $read_le:path, $read_be:path) => {
        /// Decode the values into a typed vector.
        pub fn $name(&self) -> Result<Vec<$ty>, Error> {
            if !matches!(self.dtype.class, $class) || self.dtype.size != $size {
                return Err(Error::TypeMismatch {
                    expected: stringify!($ty),
                    actual: self.dtype.describe(),
                });
            }
            let width = $size as usize;
            let out = self
                .values
                .chunks_exact(width)
                .map(|c| match self.dtype.endian {
                    Endian::Little => $read_le(c),
                    Endian::Big => $read_be(c),
                })
                .collect();
            Ok(out)
        }
    };
}

impl DatasetData {
    /// Number of elements in the selection.
    pub fn num_elements(&self) -> u64 {
        self.shape.iter().product()
    }

    typed_accessor!(as_f32, f32, TypeClass::Float, 4, LittleEndian::read_f32, BigEndian::read_f32);
    typed_accessor!(as_f64, f64, TypeClass::Float, 8, LittleEndian::read_f64, BigEndian::read_f64);
    typed_accessor!(as_i32, i32, TypeClass::Integer, 4, LittleEndian::read_i32, BigEndian::read_i32);
    typed_accessor!(as_i64, i64, TypeClass::Integer, 8, LittleEndian::read_i64, BigEndian::read_i64);
    typed_accessor!(as_u32, u32, TypeClass::Integer, 4, LittleEndian::read_u32, BigEndian::read_u32);
    typed_accessor!(as_u64, u64, TypeClass::Integer, 8, LittleEndian::read_u64, BigEndian::read_u64);

    /// Decode a string dataset, truncated at the first NUL.
    pub fn as_string(&self) -> Result<String, Error> {
        if self.dtype.class != TypeClass::String {
            return Err(Error::TypeMismatch {
                expected: "string",
                actual: self.dtype.describe(),
            });
        }
        let end = self
            .values
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.values.len());
        Ok(String::from_utf8_lossy(&self.values[..end]).into_owned())
    }
}
