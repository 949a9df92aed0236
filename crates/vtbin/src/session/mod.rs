// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Minimal read and write sessions.
//!
//! A session owns the primitive codec and the per-stream reference tables
//! that deduplicate module and type stamps. It does not walk object graphs:
//! callers write a value's type with [`WriteSession::write_type`], then its
//! fields through [`WriteSession::writer`]; on the read side
//! [`ReadSession::read_type`] returns the descriptor and
//! [`ReadSession::field_plan`] says which slots to assign or skip.
//!
//! References are varints: `0` is null, `id + 1` otherwise. A reference to
//! an id not seen before is followed by the stamp it introduces.

mod reader;
mod writer;

pub use reader::ReadSession;
pub use writer::WriteSession;
