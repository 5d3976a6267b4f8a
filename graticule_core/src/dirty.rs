// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Dirty-tracking channel constants.
//!
//! Graticule uses multi-channel dirty tracking (via [`understory_dirty`]) to
//! decide which nodes must be rewritten into the host scene. The lazily
//! cached matrices carry their own per-node validity flags (see
//! [`CacheState`](crate::node::CacheState)); the channels here track the
//! host-facing consequences of a change.
//!
//! # Propagation semantics
//!
//! - **Propagating** — [`POSE`] uses
//!   [`EagerPolicy`](understory_dirty::EagerPolicy) and has dependency
//!   edges from child to parent. Marking a node dirty automatically marks
//!   all descendants, because a world pose is inherited through every
//!   ancestor.
//!
//! - **Structural** — [`TOPOLOGY`] is marked on topology mutations
//!   (add/remove child, create/destroy node). It triggers a traversal-order
//!   rebuild during the next sync pass but does not propagate to
//!   descendants.
//!
//! # Consumption
//!
//! Callers never query dirty state directly. Each
//! [`NodeStore::sync_to_host`](crate::node::NodeStore::sync_to_host) call
//! drains both channels, rewrites the affected host poses, and surfaces the
//! results as [`SyncChanges`](crate::node::SyncChanges).

use understory_dirty::Channel;

/// Local transform or ancestry changed — the node's (and every
/// descendant's) host pose must be rewritten.
pub const POSE: Channel = Channel::new(0);

/// Tree topology changed — triggers traversal order rebuild.
pub const TOPOLOGY: Channel = Channel::new(1);
