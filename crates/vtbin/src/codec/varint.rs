// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Unsigned base-128 varint, the integer path of the wire format.
//!
//! Low 7 bits per byte, least significant group first, bit 7 set on every
//! byte except the last. Signed values go through the same path as their
//! two's-complement bit pattern at the same width, so `-1i32` costs five
//! bytes and `-1i64` ten.
//!
//! ```
//! use vtbin::codec::varint::{decode_varint, encode_varint_array};
//!
//! let (buf, len) = encode_varint_array(300);
//! assert_eq!(&buf[..len], &[0xAC, 0x02]);
//! assert_eq!(decode_varint(&buf[..len]), Ok((300, 2)));
//! ```

use crate::error::Error;

/// Longest encoding of a `u64`.
pub const MAX_VARINT_LEN: usize = 10;

const CONTINUATION_BIT: u8 = 0x80;

const DATA_MASK: u8 = 0x7F;

/// Varint decoding failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VarintError {
    /// Input ended with the continuation bit still set.
    UnexpectedEof,
    /// More than 64 significant bits.
    Overflow,
}

impl std::fmt::Display for VarintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnexpectedEof => write!(f, "unexpected end of input inside varint"),
            Self::Overflow => write!(f, "varint overflows 64 bits"),
        }
    }
}

impl std::error::Error for VarintError {}

impl From<VarintError> for Error {
    fn from(e: VarintError) -> Self {
        Error::Malformed(e.to_string())
    }
}

/// Encode `value` into `buf`, returning the number of bytes written.
///
/// # Panics
///
/// Panics if `buf` is shorter than [`varint_len`]`(value)`.
#[inline]
pub fn encode_varint(mut value: u64, buf: &mut [u8]) -> usize {
    let mut i = 0;
    loop {
        let byte = (value & u64::from(DATA_MASK)) as u8;
        value >>= 7;
        if value == 0 {
            buf[i] = byte;
            return i + 1;
        }
        buf[i] = byte | CONTINUATION_BIT;
        i += 1;
    }
}

/// Encode `value` into a fixed array, returning it with the used length.
#[inline]
pub fn encode_varint_array(value: u64) -> ([u8; MAX_VARINT_LEN], usize) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_varint(value, &mut buf);
    (buf, len)
}

/// Encoded size of `value` in bytes.
#[inline]
#[must_use]
pub const fn varint_len(value: u64) -> usize {
    if value == 0 {
        return 1;
    }
    let bits = 64 - value.leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Decode a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed.
#[inline]
pub fn decode_varint(buf: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut acc = VarintAccumulator::new();
    for (i, &byte) in buf.iter().enumerate() {
        if let Some(value) = acc.push(byte)? {
            return Ok((value, i + 1));
        }
    }
    Err(VarintError::UnexpectedEof)
}

/// Byte-at-a-time decoder for streams where the varint may straddle a
/// buffer refill.
#[derive(Debug, Default, Clone, Copy)]
pub struct VarintAccumulator {
    value: u64,
    shift: u32,
    consumed: usize,
}

impl VarintAccumulator {
    pub const fn new() -> Self {
        Self {
            value: 0,
            shift: 0,
            consumed: 0,
        }
    }

    /// Feed one byte. Returns the value once the terminating byte is seen.
    #[inline]
    pub fn push(&mut self, byte: u8) -> Result<Option<u64>, VarintError> {
        if self.consumed >= MAX_VARINT_LEN {
            return Err(VarintError::Overflow);
        }
        self.consumed += 1;

        let data = u64::from(byte & DATA_MASK);
        // tenth byte may only carry bit 63
        if self.shift == 63 && data > 1 {
            return Err(VarintError::Overflow);
        }
        self.value |= data << self.shift;

        if byte & CONTINUATION_BIT == 0 {
            return Ok(Some(self.value));
        }
        self.shift += 7;
        Ok(None)
    }

    /// Bytes fed so far.
    pub fn consumed(&self) -> usize {
        self.consumed
    }
}
