//! Stateful little-endian cursor over a [`ByteSource`].
//!
//! Field widths for file offsets and lengths are not fixed in HDF5; they
//! are declared in the superblock and passed explicitly to the variable
//! width readers here.

use byteorder::{ByteOrder, LittleEndian};

use crate::error::FormatError;
use crate::source::ByteSource;

/// A positioned reader over a byte source, optionally bounded to a
/// sub-region so a size-prefixed structure cannot be overrun.
pub struct Cursor<'a> {
    src: &'a dyn ByteSource,
    pos: u64,
    limit: Option<u64>,
}

impl<'a> Cursor<'a> {
    /// Create an unbounded cursor positioned at `pos`.
    pub fn new(src: &'a dyn ByteSource, pos: u64) -> Self {
        Self {
            src,
            pos,
            limit: None,
        }
    }

    /// Create a cursor bounded to `[pos, pos + len)`.
    pub fn bounded(src: &'a dyn ByteSource, pos: u64, len: u64) -> Self {
        Self {
            src,
            pos,
            limit: Some(pos.saturating_add(len)),
        }
    }

    /// Current absolute position.
    pub fn position(&self) -> u64 {
        self.pos
    }

    /// Move to an absolute position.
    pub fn seek(&mut self, pos: u64) {
        self.pos = pos;
    }

    /// Advance the position by `n` bytes without reading.
    pub fn skip(&mut self, n: u64) {
        self.pos = self.pos.saturating_add(n);
    }

    /// Bytes remaining before the bound, if this cursor is bounded.
    pub fn remaining(&self) -> Option<u64> {
        self.limit.map(|l| l.saturating_sub(self.pos))
    }

    /// A bounded sub-cursor covering `len` bytes at the current position.
    ///
    /// The parent cursor is not advanced.
    pub fn subcursor(&self, len: u64) -> Cursor<'a> {
        Cursor::bounded(self.src, self.pos, len)
    }

    /// Read exactly `n` bytes, advancing the position.
    pub fn read_bytes(&mut self, n: usize) -> Result<Vec<u8>, FormatError> {
        let end = self
            .pos
            .checked_add(n as u64)
            .ok_or(FormatError::UnexpectedEof {
                expected: u64::MAX,
                available: self.src.len(),
            })?;
        if let Some(limit) = self.limit {
            if end > limit {
                return Err(FormatError::UnexpectedEof {
                    expected: end,
                    available: limit,
                });
            }
        }
        let bytes = self.src.read(self.pos, n)?;
        self.pos = end;
        Ok(bytes)
    }

    /// Read a single byte.
    pub fn read_u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Read a little-endian u16.
    pub fn read_u16(&mut self) -> Result<u16, FormatError> {
        Ok(LittleEndian::read_u16(&self.read_bytes(2)?))
    }

    /// Read a little-endian u32.
    pub fn read_u32(&mut self) -> Result<u32, FormatError> {
        Ok(LittleEndian::read_u32(&self.read_bytes(4)?))
    }

    /// Read a little-endian u64.
    pub fn read_u64(&mut self) -> Result<u64, FormatError> {
        Ok(LittleEndian::read_u64(&self.read_bytes(8)?))
    }

    /// Read an unsigned little-endian integer of width 1, 2, 4, or 8.
    pub fn read_uint(&mut self, width: u8) -> Result<u64, FormatError> {
        match width {
            1 => Ok(self.read_u8()? as u64),
            2 => Ok(self.read_u16()? as u64),
            4 => Ok(self.read_u32()? as u64),
            8 => self.read_u64(),
            other => Err(FormatError::InvalidOffsetSize(other)),
        }
    }

    /// Read a signed little-endian integer of width 1, 2, 4, or 8.
    pub fn read_int(&mut self, width: u8) -> Result<i64, FormatError> {
        match width {
            1 => Ok(self.read_u8()? as i8 as i64),
            2 => Ok(self.read_u16()? as i16 as i64),
            4 => Ok(self.read_u32()? as i32 as i64),
            8 => Ok(self.read_u64()? as i64),
            other => Err(FormatError::InvalidOffsetSize(other)),
        }
    }

    /// Read a file address of superblock-declared width.
    ///
    /// Returns `None` for the undefined-address sentinel (all ones at the
    /// declared width).
    pub fn read_addr(&mut self, offset_size: u8) -> Result<Option<u64>, FormatError> {
        let raw = self.read_uint(offset_size)?;
        if is_undefined(raw, offset_size) {
            Ok(None)
        } else {
            Ok(Some(raw))
        }
    }

    /// Read a length field of superblock-declared width.
    pub fn read_length(&mut self, length_size: u8) -> Result<u64, FormatError> {
        match self.read_uint(length_size) {
            Err(FormatError::InvalidOffsetSize(s)) => Err(FormatError::InvalidLengthSize(s)),
            other => other,
        }
    }

    /// Read a NUL-terminated string of at most `cap` bytes (terminator
    /// included), advancing past the terminator.
    pub fn read_cstring(&mut self, cap: usize) -> Result<String, FormatError> {
        let mut out = Vec::new();
        let mut taken = 0usize;
        while taken < cap {
            let step = 32.min(cap - taken);
            let chunk = self.read_bytes(step)?;
            if let Some(nul) = chunk.iter().position(|&b| b == 0) {
                out.extend_from_slice(&chunk[..nul]);
                // rewind to just past the terminator
                self.pos -= (step - nul - 1) as u64;
                return Ok(String::from_utf8_lossy(&out).into_owned());
            }
            out.extend_from_slice(&chunk);
            taken += step;
        }
        Err(FormatError::UnexpectedEof {
            expected: self.pos + 1,
            available: self.pos,
        })
    }
}

/// Returns `true` when `value` is the all-ones sentinel at `offset_size`.
pub fn is_undefined(value: u64, offset_size: u8) -> bool {
    match offset_size {
        1 => value == 0xFF,
        2 => value == 0xFFFF,
        4 => value == 0xFFFF_FFFF,
        8 => value == u64::MAX,
        _ => false,
    }
}
