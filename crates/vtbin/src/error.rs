// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Error type shared by the codec, the descriptor engine and the sessions.
//!
//! Every variant is fatal for the stream being processed: there is no
//! partial or degraded deserialization.

use crate::module::{ModuleVersion, ModuleVersionId};
use std::io;
use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while encoding, decoding or reconciling type shapes.
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A read ran past the end of the stream.
    #[error("stream truncated at byte {position}: needed {needed} more bytes")]
    TruncatedStream { position: u64, needed: u64 },

    /// Bytes were present but do not decode to a valid value.
    #[error("malformed data: {0}")]
    Malformed(String),

    /// The module resolver does not know the module named in the stream.
    #[error("module {name} {version} cannot be resolved")]
    UnresolvedModule { name: String, version: ModuleVersion },

    /// The type named in an identity stamp does not exist in its module.
    #[error("type {name} not found in module {module}")]
    UnresolvedType { module: String, name: String },

    /// A generic definition was closed over the wrong number of arguments.
    #[error("generic type {type_name} expects {expected} type arguments, found {found}")]
    GenericArity {
        type_name: String,
        expected: usize,
        found: usize,
    },

    /// A session reference id points to nothing seen so far.
    #[error("unknown {kind} reference {id}")]
    UnknownReference { kind: &'static str, id: u64 },

    #[error("type {type_name}: module content id changed from {stored} to {current}")]
    IncompatibleModuleIdentity {
        type_name: String,
        stored: ModuleVersionId,
        current: ModuleVersionId,
    },

    #[error("type {type_name}: base type changed from {stored} to {current}")]
    IncompatibleInheritance {
        type_name: String,
        stored: String,
        current: String,
    },

    #[error("type {type_name}: module {module} version changed from {stored} to {current}")]
    IncompatibleVersion {
        type_name: String,
        module: String,
        stored: ModuleVersion,
        current: ModuleVersion,
    },

    /// Never gated by policy.
    #[error("type {type_name}: field {field} changed type from {stored} to {current}")]
    FieldTypeChanged {
        type_name: String,
        field: String,
        stored: String,
        current: String,
    },

    #[error("type {type_name}: fields added since the data was written: {}", .fields.join(", "))]
    FieldAdded {
        type_name: String,
        fields: Vec<String>,
    },

    #[error("type {type_name}: fields removed since the data was written: {}", .fields.join(", "))]
    FieldRemoved {
        type_name: String,
        fields: Vec<String>,
    },
}

impl Error {
    /// Map an I/O failure that happened while reading `needed` bytes at
    /// `position`. End-of-file always becomes [`Error::TruncatedStream`].
    pub(crate) fn from_read(err: io::Error, position: u64, needed: u64) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::TruncatedStream { position, needed }
        } else {
            Self::Io(err)
        }
    }

    /// True for the structural-compatibility failures raised by the
    /// version tolerance check.
    pub fn is_incompatibility(&self) -> bool {
        matches!(
            self,
            Self::IncompatibleModuleIdentity { .. }
                | Self::IncompatibleInheritance { .. }
                | Self::IncompatibleVersion { .. }
                | Self::FieldTypeChanged { .. }
                | Self::FieldAdded { .. }
                | Self::FieldRemoved { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_maps_to_truncated() {
        let err = Error::from_read(io::Error::from(io::ErrorKind::UnexpectedEof), 12, 4);
        assert!(matches!(
            err,
            Error::TruncatedStream {
                position: 12,
                needed: 4
            }
        ));
    }

    #[test]
    fn test_other_io_kept() {
        let err = Error::from_read(io::Error::from(io::ErrorKind::PermissionDenied), 0, 1);
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_field_lists_in_message() {
        let err = Error::FieldAdded {
            type_name: "app.Node".into(),
            fields: vec!["app.Node::a".into(), "app.Node::b".into()],
        };
        assert_eq!(
            err.to_string(),
            "type app.Node: fields added since the data was written: app.Node::a, app.Node::b"
        );
        assert!(err.is_incompatibility());
    }
}
