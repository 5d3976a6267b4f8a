// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Hierarchical double-precision transform nodes for scenes whose
//! coordinates outrange single-precision floats.
//!
//! `graticule_core` keeps the authoritative pose of every object in `f64`
//! (position), unit quaternions, and `f32` scale, arranged in a parent/child
//! tree, and synchronizes with a host scene graph whose own transform type
//! is 32-bit. It is `no_std` compatible (with `alloc`) and uses
//! struct-of-arrays storage with index handles for cache-friendly traversal.
//!
//! # Architecture
//!
//! The crate is organized around one synchronous pass per host frame:
//!
//! ```text
//!   Host scene (f32 poses, changed flags)
//!       │                                        ▲
//!       │ sync_from_host()                       │ sync_to_host()
//!       ▼                                        │
//!   NodeStore ── lazy cached getters ──► world matrices ──► SyncChanges
//!       │
//!       ▼
//!   graticule_math (compose, invert, decompose)
//! ```
//!
//! **[`node`]** — Struct-of-arrays node tree with generational handles.
//! Local position/rotation/scale are the source of truth; local, universe,
//! and world matrices (plus universe rotation) are lazily computed caches,
//! each guarded by its own validity flag and invalidated downward only.
//!
//! **[`dirty`]** — Host-sync and topology dirty channels via
//! `understory_dirty`. The pose channel propagates eagerly to descendants,
//! since a node's world pose depends on every ancestor.
//!
//! **[`host`]** — The [`HostScene`](host::HostScene) trait: the narrow
//! boundary to the host's single-precision transform representation.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types
//! for sync-pass instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Concurrency
//!
//! All mutation and cache recomputation is single-threaded and frame-driven;
//! a [`NodeStore`](node::NodeStore) must not be shared across threads. The
//! math kernel underneath is pure and freely shareable.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-node
//!   change events.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod dirty;
pub mod host;
pub mod node;
pub mod trace;
