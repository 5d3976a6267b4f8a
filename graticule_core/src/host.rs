// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host contract for scene-graph integrations.
//!
//! Graticule never talks to a host engine directly. Integrations implement
//! [`HostScene`] over the host's own single-precision transform objects,
//! addressed by the raw slot indices of a
//! [`NodeStore`](crate::node::NodeStore). The contract is deliberately
//! narrow: per-slot pose access, a consumable change flag, and ancestor
//! discovery. Component lifecycle, serialization, and rendering stay on the
//! host side of this boundary.
//!
//! # Frame loop pseudocode
//!
//! A typical host tick wires the pieces together like this:
//!
//! ```rust,ignore
//! fn on_tick(store: &mut NodeStore, host: &mut MyHostScene) {
//!     // Adopt out-of-band host edits (inspector tweaks, animation).
//!     store.sync_from_host(host);
//!
//!     // Mutate authoritative double-precision state.
//!     store.set_universe_position(probe, orbit_position(t));
//!
//!     // Rewrite every stale host pose, parents before children.
//!     let changes = store.sync_to_host(host);
//! }
//! ```

use graticule_math::Vec3f;

/// Single-precision pose storage on the host side, addressed by node slot
/// index.
///
/// Rotations cross this boundary as `[x, y, z, w]` quaternion components.
/// The change flag is the host's "modified since last observed" bit; the
/// store clears it whenever it consumes or overwrites the host pose.
pub trait HostScene {
    /// Returns the host-local position of the slot.
    fn position(&self, idx: u32) -> Vec3f;

    /// Returns the host-local rotation of the slot.
    fn rotation(&self, idx: u32) -> [f32; 4];

    /// Returns the host-local scale of the slot.
    fn scale(&self, idx: u32) -> Vec3f;

    /// Writes the host-local position of the slot.
    fn set_position(&mut self, idx: u32, position: Vec3f);

    /// Writes the host-local rotation of the slot.
    fn set_rotation(&mut self, idx: u32, rotation: [f32; 4]);

    /// Writes the host-local scale of the slot.
    fn set_scale(&mut self, idx: u32, scale: Vec3f);

    /// Has the host modified this slot's pose since the flag was last
    /// cleared?
    fn changed(&self, idx: u32) -> bool;

    /// Clears the slot's change flag after the store has consumed it.
    fn clear_changed(&mut self, idx: u32);

    /// Returns the nearest ancestor of `idx` **in the host hierarchy** that
    /// is also bound to a node, if any.
    ///
    /// Used by [`NodeStore::rebind`](crate::node::NodeStore::rebind) when
    /// the host reparents an object: intervening host objects that do not
    /// participate in the double-precision hierarchy are skipped.
    fn resolve_parent(&self, idx: u32) -> Option<u32>;
}
