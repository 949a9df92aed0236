// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Primitive writer.

use super::padding_to_boundary;
use super::ticks::{datetime_to_ticks, timedelta_to_ticks};
use super::varint::encode_varint_array;
use crate::config::CodecConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::io::{self, Read, Write};

const ZEROS: [u8; 256] = [0u8; 256];

/// Scalar encoder over any [`Write`].
///
/// Call [`finish`](Self::finish) to flush, pad and get the stream back.
/// Dropping an unfinished writer finishes it on a best-effort basis.
pub struct PrimitiveWriter<W: Write> {
    stream: Option<W>,
    buf: Vec<u8>,
    capacity: usize,
    buffered: bool,
    total_written: u64,
}

impl<W: Write> PrimitiveWriter<W> {
    /// Buffered writer with the default buffer size.
    pub fn new(stream: W) -> Self {
        Self::with_config(stream, CodecConfig::default())
    }

    pub fn with_config(stream: W, config: CodecConfig) -> Self {
        let capacity = config.effective_buffer_size();
        Self {
            stream: Some(stream),
            buf: if config.buffered {
                Vec::with_capacity(capacity)
            } else {
                Vec::new()
            },
            capacity,
            buffered: config.buffered,
            total_written: 0,
        }
    }

    /// Logical bytes written so far, padding excluded.
    pub fn position(&self) -> u64 {
        self.total_written + self.buf.len() as u64
    }

    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    fn stream(&mut self) -> Result<&mut W> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::Io(io::Error::other("writer already finished")))
    }

    fn flush_buffer(&mut self) -> Result<()> {
        if self.buf.is_empty() {
            return Ok(());
        }
        let pending = std::mem::take(&mut self.buf);
        self.stream()?.write_all(&pending)?;
        self.total_written += pending.len() as u64;
        self.buf = pending;
        self.buf.clear();
        Ok(())
    }

    /// Write a raw byte run, no framing.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.buffered {
            self.stream()?.write_all(bytes)?;
            self.total_written += bytes.len() as u64;
            return Ok(());
        }
        if self.buf.len() + bytes.len() > self.capacity {
            self.flush_buffer()?;
        }
        if bytes.len() >= self.capacity {
            self.stream()?.write_all(bytes)?;
            self.total_written += bytes.len() as u64;
        } else {
            self.buf.extend_from_slice(bytes);
        }
        Ok(())
    }

    /// Write an unsigned varint.
    #[inline]
    pub fn write_varint(&mut self, value: u64) -> Result<()> {
        let (bytes, len) = encode_varint_array(value);
        self.write_bytes(&bytes[..len])
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        self.write_varint(u64::from(value))
    }

    pub fn write_u16(&mut self, value: u16) -> Result<()> {
        self.write_varint(u64::from(value))
    }

    pub fn write_u32(&mut self, value: u32) -> Result<()> {
        self.write_varint(u64::from(value))
    }

    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        self.write_varint(value)
    }

    pub fn write_i8(&mut self, value: i8) -> Result<()> {
        self.write_u8(value as u8)
    }

    pub fn write_i16(&mut self, value: i16) -> Result<()> {
        self.write_u16(value as u16)
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        self.write_u32(value as u32)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_u64(value as u64)
    }

    /// Widened to `f64` before encoding.
    pub fn write_f32(&mut self, value: f32) -> Result<()> {
        self.write_f64(f64::from(value))
    }

    pub fn write_f64(&mut self, value: f64) -> Result<()> {
        self.write_varint(value.to_bits())
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_bytes(&[u8::from(value)])
    }

    pub fn write_char(&mut self, value: char) -> Result<()> {
        self.write_u32(u32::from(value))
    }

    /// Varint byte length, then the UTF-8 bytes.
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.write_varint(value.len() as u64)?;
        self.write_bytes(value.as_bytes())
    }

    pub fn write_datetime(&mut self, value: &DateTime<Utc>) -> Result<()> {
        let ticks = datetime_to_ticks(value)
            .ok_or_else(|| Error::Malformed(format!("date/time {} outside tick range", value)))?;
        self.write_i64(ticks)
    }

    pub fn write_timespan(&mut self, value: &TimeDelta) -> Result<()> {
        let ticks = timedelta_to_ticks(value)
            .ok_or_else(|| Error::Malformed(format!("time span {} outside tick range", value)))?;
        self.write_i64(ticks)
    }

    /// Copy exactly `count` bytes from `source` into the output.
    pub fn write_from<S: Read>(&mut self, source: &mut S, count: u64) -> Result<()> {
        self.flush_buffer()?;
        let position = self.position();
        let copied = io::copy(&mut source.take(count), self.stream()?)?;
        self.total_written += copied;
        if copied < count {
            return Err(Error::TruncatedStream {
                position,
                needed: count - copied,
            });
        }
        Ok(())
    }

    fn finish_inner(&mut self) -> Result<()> {
        self.flush_buffer()?;
        if self.buffered {
            let mut pad = padding_to_boundary(self.total_written);
            while pad > 0 {
                let n = pad.min(ZEROS.len() as u64) as usize;
                self.stream()?.write_all(&ZEROS[..n])?;
                pad -= n as u64;
            }
        }
        self.stream()?.flush()?;
        Ok(())
    }

    /// Flush, pad to the boundary (buffered mode) and return the stream.
    pub fn finish(mut self) -> Result<W> {
        let result = self.finish_inner();
        // detached even on failure so drop does not retry
        let stream = self.stream.take();
        result?;
        stream.ok_or_else(|| Error::Io(io::Error::other("writer already finished")))
    }
}

impl<W: Write> Drop for PrimitiveWriter<W> {
    fn drop(&mut self) {
        if self.stream.is_none() {
            return;
        }
        if let Err(e) = self.finish_inner() {
            log::debug!("[codec] writer finish on drop failed: {}", e);
        }
    }
}

impl<W: Write> std::fmt::Debug for PrimitiveWriter<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveWriter")
            .field("buffered", &self.buffered)
            .field("capacity", &self.capacity)
            .field("position", &self.position())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    struct FailingSink {
        calls: Rc<Cell<usize>>,
    }

    impl Write for FailingSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            self.calls.set(self.calls.get() + 1);
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            self.calls.set(self.calls.get() + 1);
            Err(io::Error::other("disk full"))
        }
    }

    fn written(f: impl FnOnce(&mut PrimitiveWriter<&mut Vec<u8>>) -> Result<()>) -> Vec<u8> {
        let mut out = Vec::new();
        let mut writer = PrimitiveWriter::with_config(&mut out, CodecConfig::unbuffered());
        f(&mut writer).expect("write");
        writer.finish().expect("finish");
        out
    }

    #[test]
    fn test_integer_bit_patterns() {
        assert_eq!(written(|w| w.write_u32(0)), vec![0x00]);
        assert_eq!(written(|w| w.write_u32(128)), vec![0x80, 0x01]);
        assert_eq!(written(|w| w.write_i8(-1)), vec![0xFF, 0x01]);
        assert_eq!(written(|w| w.write_i32(-1)), vec![0xFF, 0xFF, 0xFF, 0xFF, 0x0F]);
    }

    #[test]
    fn test_string_framing() {
        assert_eq!(written(|w| w.write_str("")), vec![0x00]);
        assert_eq!(written(|w| w.write_str("hé")), vec![0x03, b'h', 0xC3, 0xA9]);
    }

    #[test]
    fn test_bool_and_raw_bytes() {
        assert_eq!(written(|w| w.write_bool(true)), vec![1]);
        assert_eq!(written(|w| w.write_bool(false)), vec![0]);
        assert_eq!(written(|w| w.write_bytes(&[9, 8, 7])), vec![9, 8, 7]);
        assert!(written(|w| w.write_bytes(&[])).is_empty());
    }

    #[test]
    fn test_buffered_finish_pads() {
        let mut out = Vec::new();
        let mut writer = PrimitiveWriter::new(&mut out);
        writer.write_str("hello").expect("write");
        assert_eq!(writer.position(), 6);
        writer.finish().expect("finish");
        assert_eq!(out.len(), 1024);
        assert!(out[6..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_buffered_stream_has_no_padding() {
        let mut out = Vec::new();
        PrimitiveWriter::new(&mut out).finish().expect("finish");
        assert!(out.is_empty());
    }

    #[test]
    fn test_large_write_bypasses_buffer() {
        let mut out = Vec::new();
        let mut writer =
            PrimitiveWriter::with_config(&mut out, CodecConfig::new().buffer_size(16));
        writer.write_u8(1).expect("write");
        writer.write_bytes(&[0xAB; 40]).expect("write");
        writer.write_u8(2).expect("write");
        assert_eq!(writer.position(), 42);
        writer.finish().expect("finish");
        assert_eq!(out.len(), 1024);
        assert_eq!(out[0], 1);
        assert_eq!(&out[1..41], &[0xAB; 40][..]);
        assert_eq!(out[41], 2);
    }

    #[test]
    fn test_failed_finish_not_retried_on_drop() {
        let calls = Rc::new(Cell::new(0));
        let mut writer = PrimitiveWriter::new(FailingSink {
            calls: Rc::clone(&calls),
        });
        writer.write_str("lost").expect("buffered");
        assert_eq!(calls.get(), 0);
        assert!(matches!(writer.finish(), Err(Error::Io(_))));
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_drop_finishes() {
        let mut out = Vec::new();
        {
            let mut writer = PrimitiveWriter::new(&mut out);
            writer.write_u64(u64::MAX).expect("write");
        }
        assert_eq!(out.len(), 1024);
    }

    #[test]
    fn test_write_from_short_source() {
        let mut out = Vec::new();
        let mut writer = PrimitiveWriter::with_config(&mut out, CodecConfig::unbuffered());
        let mut source: &[u8] = &[1, 2, 3];
        let err = writer.write_from(&mut source, 5).unwrap_err();
        assert!(matches!(err, Error::TruncatedStream { position: 0, needed: 2 }));
    }
}
