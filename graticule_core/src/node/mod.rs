// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node tree data model.
//!
//! A *node* is an entry in the double-precision transform hierarchy. Each
//! node has:
//!
//! - An identity ([`NodeId`]) — a generational handle that becomes stale
//!   when the node is destroyed, preventing use-after-free bugs at the API
//!   level.
//! - Topology — parent, first-child, and sibling links forming an ordered
//!   tree.
//! - **Authoritative local state** set by the caller:
//!   [`local position`](NodeStore::set_local_position) (`f64`),
//!   [`local rotation`](NodeStore::set_local_rotation) (unit quaternion),
//!   and [`local scale`](NodeStore::set_local_scale) (`f32`).
//! - **Cached derived state**, recomputed lazily on read and each guarded
//!   by its own [`CacheState`] flag: the local matrix, universe rotation,
//!   universe matrix, and world matrix. Mutations invalidate a node and its
//!   descendants, never its ancestors.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles for
//! cache-friendly traversal.
//!
//! # Universe vs. world
//!
//! The *universe* transform composes this hierarchy only, root-down, in
//! full double precision. The *world* transform is what the host's
//! single-precision scene ultimately consumes: the universe transform
//! re-expressed relative to the store's
//! [world origin](NodeStore::set_world_origin). With the default identity
//! origin the two coincide; hosts rebase the origin to keep world
//! coordinates small near the viewer.
//!
//! # Scale modes
//!
//! A node with children is constrained to **uniform** scale — only the X
//! component is meaningful and it is broadcast to all three axes on read.
//! A leaf supports **anisotropic** scale. The rule is derived from the
//! child count on every read; transitions across zero children invalidate
//! the local-matrix cache.
//!
//! # Host synchronization
//!
//! Property mutations mark the [`POSE`](crate::dirty::POSE) channel with
//! eager descendant propagation; topology mutations mark
//! [`TOPOLOGY`](crate::dirty::TOPOLOGY).
//! [`sync_from_host`](NodeStore::sync_from_host) adopts out-of-band host
//! edits, [`sync_to_host`](NodeStore::sync_to_host) drains the channels and
//! rewrites stale host poses parents-first, reporting what it did as
//! [`SyncChanges`].

mod cache;
mod id;
mod store;
mod sync;
mod traverse;

pub use cache::CacheState;
pub use id::{INVALID, NodeId};
pub use store::{NodeStore, ScaleMode};
pub use sync::SyncChanges;
pub use traverse::Children;
