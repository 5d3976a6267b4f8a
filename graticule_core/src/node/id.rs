// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node identity.

use core::fmt;

/// Sentinel value indicating "no node" in index fields.
pub const INVALID: u32 = u32::MAX;

/// A handle to a node in a [`NodeStore`](super::NodeStore).
///
/// Contains both a slot index and a generation counter so that stale handles
/// can be detected after a node is destroyed and the slot is reused.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    /// Slot index into the store's arrays.
    pub(crate) idx: u32,
    /// Generation counter — must match the store's generation for this slot.
    pub(crate) generation: u32,
}

impl NodeId {
    /// Returns the raw slot index (for diagnostics and host bindings).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}@gen{})", self.idx, self.generation)
    }
}
