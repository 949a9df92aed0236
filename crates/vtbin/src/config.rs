// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Codec and session configuration.
//!
//! Both structs are plain values with builder-style setters. Writer and
//! reader must agree on [`CodecConfig::buffered`]; the buffer size is a local
//! I/O tuning knob and never changes the bytes on the wire.
//!
//! ```
//! use vtbin::{SessionConfig, VersionTolerance};
//!
//! let config = SessionConfig::new()
//!     .tolerance(VersionTolerance::ALLOW_MODULE_ID_CHANGE | VersionTolerance::ALLOW_FIELD_ADDITION)
//!     .buffer_size(4096);
//! assert!(config.codec.buffered);
//! ```

use crate::codec::PADDING_BOUNDARY;
use crate::tolerance::VersionTolerance;

/// Primitive codec configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CodecConfig {
    /// Buffered mode pads the stream to [`PADDING_BOUNDARY`] on finish and
    /// reads ahead in boundary-sized chunks. Unbuffered mode does neither.
    pub buffered: bool,

    /// Size of the internal read-ahead / write-behind buffer in bytes.
    pub buffer_size: usize,
}

impl CodecConfig {
    pub fn new() -> Self {
        Self {
            buffered: true,
            buffer_size: PADDING_BOUNDARY,
        }
    }

    /// Configuration for direct, unpadded I/O.
    pub fn unbuffered() -> Self {
        Self {
            buffered: false,
            ..Self::new()
        }
    }

    /// Set buffered mode.
    pub fn buffered(mut self, buffered: bool) -> Self {
        self.buffered = buffered;
        self
    }

    /// Set the buffer size (at least one byte).
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.buffer_size = size.max(1);
        self
    }

    pub(crate) fn effective_buffer_size(&self) -> usize {
        self.buffer_size.max(1)
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration of a read or write session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SessionConfig {
    /// Drift accepted when reconciling structure stamps.
    pub tolerance: VersionTolerance,

    /// Give collection types a structure stamp as if they were plain objects.
    pub treat_collection_as_user_object: bool,

    /// Primitive codec settings.
    pub codec: CodecConfig,
}

impl SessionConfig {
    /// Strict policy, collections treated as opaque, buffered codec.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the version tolerance policy.
    pub fn tolerance(mut self, tolerance: VersionTolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Stamp collection types like user objects.
    pub fn treat_collection_as_user_object(mut self, enabled: bool) -> Self {
        self.treat_collection_as_user_object = enabled;
        self
    }

    /// Replace the codec settings.
    pub fn codec(mut self, codec: CodecConfig) -> Self {
        self.codec = codec;
        self
    }

    /// Set the codec buffer size.
    pub fn buffer_size(mut self, size: usize) -> Self {
        self.codec = self.codec.buffer_size(size);
        self
    }
}
