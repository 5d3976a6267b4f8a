// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pretty-printing and tree dumps for graticule diagnostics.
//!
//! This crate provides development-time views over
//! [`graticule_core`](graticule_core) state:
//!
//! - [`pretty::PrettyPrintSink`] — a
//!   [`TraceSink`](graticule_core::trace::TraceSink) with human-readable
//!   one-line-per-event output.
//! - [`pretty::dump_tree`] — an indented snapshot of a node store's
//!   topology and poses.

pub mod pretty;
