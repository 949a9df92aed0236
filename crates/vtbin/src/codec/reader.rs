// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Primitive reader.

use super::ticks::{ticks_to_datetime, ticks_to_timedelta};
use super::varint::VarintAccumulator;
use super::{bytes_to_next_boundary, padding_to_boundary};
use crate::config::CodecConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, TimeDelta, Utc};
use std::io::{self, Read, Write};

// Upper bound on speculative allocation for length-prefixed payloads.
const MAX_PREALLOC: usize = 64 * 1024;

/// Scalar decoder over any [`Read`].
///
/// A reader pulls at most one padding boundary per refill, so it never reads
/// past the end of what the matching writer produced. Call
/// [`finish`](Self::finish) to consume the trailing padding; dropping an
/// unfinished reader does the same on a best-effort basis.
pub struct PrimitiveReader<R: Read> {
    stream: Option<R>,
    buf: Box<[u8]>,
    start: usize,
    end: usize,
    buffered: bool,
    total_read: u64,
}

macro_rules! read_narrow {
    ($(#[$doc:meta])* $name:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $name(&mut self) -> Result<$ty> {
            let value = self.read_varint()?;
            <$ty>::try_from(value).map_err(|_| {
                Error::Malformed(format!(
                    "varint {} out of range for {}",
                    value,
                    stringify!($ty)
                ))
            })
        }
    };
}

impl<R: Read> PrimitiveReader<R> {
    /// Buffered reader with the default buffer size.
    pub fn new(stream: R) -> Self {
        Self::with_config(stream, CodecConfig::default())
    }

    pub fn with_config(stream: R, config: CodecConfig) -> Self {
        let capacity = if config.buffered {
            config.effective_buffer_size()
        } else {
            0
        };
        Self {
            stream: Some(stream),
            buf: vec![0u8; capacity].into_boxed_slice(),
            start: 0,
            end: 0,
            buffered: config.buffered,
            total_read: 0,
        }
    }

    /// Logical bytes consumed so far.
    pub fn position(&self) -> u64 {
        self.total_read - (self.end - self.start) as u64
    }

    pub fn is_buffered(&self) -> bool {
        self.buffered
    }

    fn stream(&mut self) -> Result<&mut R> {
        self.stream
            .as_mut()
            .ok_or_else(|| Error::Io(io::Error::other("reader already finished")))
    }

    fn fill(&mut self) -> Result<()> {
        let chunk = (self.buf.len() as u64).min(bytes_to_next_boundary(self.total_read)) as usize;
        let position = self.position();
        let Some(stream) = self.stream.as_mut() else {
            return Err(Error::Io(io::Error::other("reader already finished")));
        };
        stream
            .read_exact(&mut self.buf[..chunk])
            .map_err(|e| Error::from_read(e, position, chunk as u64))?;
        self.start = 0;
        self.end = chunk;
        self.total_read += chunk as u64;
        Ok(())
    }

    /// Fill `dst` completely.
    pub fn read_bytes(&mut self, dst: &mut [u8]) -> Result<()> {
        if !self.buffered {
            let position = self.position();
            self.stream()?
                .read_exact(dst)
                .map_err(|e| Error::from_read(e, position, dst.len() as u64))?;
            self.total_read += dst.len() as u64;
            return Ok(());
        }
        let mut filled = 0;
        while filled < dst.len() {
            if self.start == self.end {
                self.fill()?;
            }
            let n = (self.end - self.start).min(dst.len() - filled);
            dst[filled..filled + n].copy_from_slice(&self.buf[self.start..self.start + n]);
            self.start += n;
            filled += n;
        }
        Ok(())
    }

    /// Read `len` bytes into a fresh vector, growing it as data arrives.
    pub fn read_byte_vec(&mut self, len: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(len.min(MAX_PREALLOC));
        while out.len() < len {
            let step = (len - out.len()).min(MAX_PREALLOC);
            let at = out.len();
            out.resize(at + step, 0);
            self.read_bytes(&mut out[at..])?;
        }
        Ok(out)
    }

    fn read_byte(&mut self) -> Result<u8> {
        if self.start < self.end {
            let b = self.buf[self.start];
            self.start += 1;
            return Ok(b);
        }
        let mut b = [0u8; 1];
        self.read_bytes(&mut b)?;
        Ok(b[0])
    }

    /// Read an unsigned varint.
    pub fn read_varint(&mut self) -> Result<u64> {
        let mut acc = VarintAccumulator::new();
        loop {
            if let Some(value) = acc.push(self.read_byte()?)? {
                return Ok(value);
            }
        }
    }

    read_narrow!(read_u8, u8);
    read_narrow!(read_u16, u16);
    read_narrow!(read_u32, u32);

    pub fn read_u64(&mut self) -> Result<u64> {
        self.read_varint()
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_i16(&mut self) -> Result<i16> {
        Ok(self.read_u16()? as i16)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        Ok(self.read_u32()? as i32)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        Ok(self.read_u64()? as i64)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.read_varint()?))
    }

    /// Narrowed from the stored `f64`.
    pub fn read_f32(&mut self) -> Result<f32> {
        Ok(self.read_f64()? as f32)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? == 1)
    }

    pub fn read_char(&mut self) -> Result<char> {
        let scalar = self.read_u32()?;
        char::from_u32(scalar)
            .ok_or_else(|| Error::Malformed(format!("invalid Unicode scalar value {:#x}", scalar)))
    }

    /// Read a varint length or element count as `usize`.
    pub fn read_len(&mut self) -> Result<usize> {
        let len = self.read_varint()?;
        usize::try_from(len).map_err(|_| Error::Malformed(format!("length {} overflows usize", len)))
    }

    pub fn read_string(&mut self) -> Result<String> {
        let len = self.read_len()?;
        let bytes = self.read_byte_vec(len)?;
        String::from_utf8(bytes).map_err(|e| Error::Malformed(format!("invalid UTF-8 string: {}", e)))
    }

    pub fn read_datetime(&mut self) -> Result<DateTime<Utc>> {
        let ticks = self.read_i64()?;
        ticks_to_datetime(ticks)
            .ok_or_else(|| Error::Malformed(format!("date/time ticks {} out of range", ticks)))
    }

    pub fn read_timespan(&mut self) -> Result<TimeDelta> {
        let ticks = self.read_i64()?;
        ticks_to_timedelta(ticks)
            .ok_or_else(|| Error::Malformed(format!("time span ticks {} out of range", ticks)))
    }

    /// Copy exactly `count` bytes into `dest`: buffered bytes first, then
    /// straight from the stream.
    pub fn copy_to<D: Write + ?Sized>(&mut self, dest: &mut D, count: u64) -> Result<()> {
        let buffered = ((self.end - self.start) as u64).min(count) as usize;
        dest.write_all(&self.buf[self.start..self.start + buffered])?;
        self.start += buffered;

        let rem = count - buffered as u64;
        if rem == 0 {
            return Ok(());
        }
        let position = self.position();
        let copied = io::copy(&mut self.stream()?.take(rem), dest)?;
        self.total_read += copied;
        if copied < rem {
            return Err(Error::TruncatedStream {
                position: position + copied,
                needed: rem - copied,
            });
        }
        Ok(())
    }

    fn consume_padding(&mut self) -> Result<()> {
        self.start = self.end;
        if !self.buffered {
            return Ok(());
        }
        let pad = padding_to_boundary(self.total_read);
        if pad == 0 {
            return Ok(());
        }
        let position = self.total_read;
        let skipped = io::copy(&mut self.stream()?.take(pad), &mut io::sink())?;
        self.total_read += skipped;
        if skipped < pad {
            return Err(Error::TruncatedStream {
                position: position + skipped,
                needed: pad - skipped,
            });
        }
        Ok(())
    }

    /// Discard unread buffered bytes, consume the writer's padding and return
    /// the stream positioned at the next boundary.
    pub fn finish(mut self) -> Result<R> {
        let result = self.consume_padding();
        // detached even on failure so drop does not retry
        let stream = self.stream.take();
        result?;
        stream.ok_or_else(|| Error::Io(io::Error::other("reader already finished")))
    }
}

impl<R: Read> Drop for PrimitiveReader<R> {
    fn drop(&mut self) {
        if self.stream.is_none() {
            return;
        }
        if let Err(e) = self.consume_padding() {
            log::debug!("[codec] reader finish on drop failed: {}", e);
        }
    }
}

impl<R: Read> std::fmt::Debug for PrimitiveReader<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrimitiveReader")
            .field("buffered", &self.buffered)
            .field("capacity", &self.buf.len())
            .field("position", &self.position())
            .finish()
    }
}
