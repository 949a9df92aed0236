// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Primitive binary codec.
//!
//! [`PrimitiveWriter`] and [`PrimitiveReader`] are exact inverses over the same
//! byte sequence. They know nothing about types or objects: every scalar is a
//! varint, a length-prefixed UTF-8 string, a single byte or a raw byte run.
//!
//! # Wire format
//!
//! | Value | Encoding |
//! |-------|----------|
//! | `u8`..`u64`, `i8`..`i64` | varint of the unsigned bit pattern at the same width |
//! | `f32`, `f64` | varint of the `f64` bit pattern (`f32` is widened first) |
//! | `bool` | one byte, `1` = true, anything else false |
//! | `char` | varint of the Unicode scalar value |
//! | date/time | varint of signed 100 ns ticks since 0001-01-01T00:00:00Z |
//! | time span | varint of signed 100 ns ticks |
//! | string | varint byte length, then UTF-8 bytes |
//! | raw bytes | bytes as-is, no framing |
//!
//! # Padding
//!
//! In buffered mode the writer pads its output with zeros up to a multiple of
//! [`PADDING_BOUNDARY`] when finished, and the reader never reads across a
//! boundary in one refill. Finishing a reader consumes the padding, which
//! leaves the underlying stream where the next writer's output begins.

pub mod reader;
pub mod ticks;
pub mod varint;
pub mod writer;

pub use reader::PrimitiveReader;
pub use writer::PrimitiveWriter;

/// Alignment unit of a buffered stream.
pub const PADDING_BOUNDARY: usize = 1024;

const BOUNDARY: u64 = PADDING_BOUNDARY as u64;

/// Zero bytes needed after `position` to reach a boundary (0 when aligned).
#[inline]
pub const fn padding_to_boundary(position: u64) -> u64 {
    (BOUNDARY - position % BOUNDARY) % BOUNDARY
}

/// Bytes from `position` up to and including the next boundary
/// (a full boundary when aligned).
#[inline]
pub const fn bytes_to_next_boundary(position: u64) -> u64 {
    BOUNDARY - position % BOUNDARY
}
