// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and lazy
//! transform caches.

use alloc::vec::Vec;

use understory_dirty::{CycleHandling, DirtyTracker, EagerPolicy};

use graticule_math::{Matrix4d, Quat, Vec3d, Vec3f};

use super::cache::CacheState;
use super::id::{INVALID, NodeId};
use super::traverse::Children;
use crate::dirty;

/// Whether a node's scale reads as uniform or per-axis.
///
/// Derived from the child count on every read, never cached: a node with
/// children broadcasts its X scale to all three axes so that descendants
/// inherit a well-defined similarity transform; a leaf keeps all three
/// components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScaleMode {
    /// The node has children; only the X scale component is meaningful.
    Uniform,
    /// The node is a leaf; all three scale components are independent.
    Anisotropic,
}

/// Struct-of-arrays storage for all nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Local position, rotation, and scale are the authoritative state. The
/// local, universe, and world matrices plus the universe rotation are
/// caches, recomputed lazily on read and invalidated downward (a node and
/// its descendants, never its ancestors) on mutation.
#[derive(Debug)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Authoritative local state (set by callers) --
    pub(crate) local_position: Vec<Vec3d>,
    pub(crate) local_rotation: Vec<Quat>,
    pub(crate) local_scale: Vec<Vec3f>,
    pub(crate) initialized: Vec<bool>,
    pub(crate) local_changed: Vec<bool>,

    // -- Lazy caches, one validity flag each --
    pub(crate) local_matrix: Vec<Matrix4d>,
    pub(crate) local_matrix_state: Vec<CacheState>,
    pub(crate) universe_rotation: Vec<Quat>,
    pub(crate) universe_rotation_state: Vec<CacheState>,
    pub(crate) universe_matrix: Vec<Matrix4d>,
    pub(crate) universe_matrix_state: Vec<CacheState>,
    pub(crate) world_matrix: Vec<Matrix4d>,
    pub(crate) world_matrix_state: Vec<CacheState>,

    // -- World origin anchor --
    pub(crate) origin_position: Vec3d,
    pub(crate) origin_rotation: Quat,
    /// Maps universe coordinates to host-world coordinates.
    pub(crate) world_from_universe: Matrix4d,
    /// Maps host-world coordinates back to universe coordinates.
    pub(crate) universe_from_world: Matrix4d,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Dirty tracking --
    pub(crate) dirty: DirtyTracker<u32>,

    // -- Traversal cache --
    pub(crate) traversal_order: Vec<u32>,
    pub(crate) traversal_dirty: bool,
    pub(crate) topology_pending: bool,

    // -- Lifecycle tracking --
    pub(crate) pending_added: Vec<u32>,
    pub(crate) pending_removed: Vec<u32>,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates an empty node store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            local_position: Vec::new(),
            local_rotation: Vec::new(),
            local_scale: Vec::new(),
            initialized: Vec::new(),
            local_changed: Vec::new(),
            local_matrix: Vec::new(),
            local_matrix_state: Vec::new(),
            universe_rotation: Vec::new(),
            universe_rotation_state: Vec::new(),
            universe_matrix: Vec::new(),
            universe_matrix_state: Vec::new(),
            world_matrix: Vec::new(),
            world_matrix_state: Vec::new(),
            origin_position: Vec3d::ZERO,
            origin_rotation: Quat::IDENTITY,
            world_from_universe: Matrix4d::IDENTITY,
            universe_from_world: Matrix4d::IDENTITY,
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            dirty: DirtyTracker::with_cycle_handling(CycleHandling::Error),
            traversal_order: Vec::new(),
            traversal_dirty: true,
            topology_pending: false,
            pending_added: Vec::new(),
            pending_removed: Vec::new(),
        }
    }

    // -- Allocation API --

    /// Creates a new node and returns its handle.
    ///
    /// The node starts detached, at the local identity pose (zero position,
    /// identity rotation, unit scale), with every cache stale and its host
    /// pose pending a first push.
    pub fn create_node(&mut self) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.local_position[i] = Vec3d::ZERO;
            self.local_rotation[i] = Quat::IDENTITY;
            self.local_scale[i] = Vec3f::ONE;
            self.initialized[i] = false;
            self.local_changed[i] = true;
            self.local_matrix[i] = Matrix4d::IDENTITY;
            self.local_matrix_state[i] = CacheState::Stale;
            self.universe_rotation[i] = Quat::IDENTITY;
            self.universe_rotation_state[i] = CacheState::Stale;
            self.universe_matrix[i] = Matrix4d::IDENTITY;
            self.universe_matrix_state[i] = CacheState::Stale;
            self.world_matrix[i] = Matrix4d::IDENTITY;
            self.world_matrix_state[i] = CacheState::Stale;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.local_position.push(Vec3d::ZERO);
            self.local_rotation.push(Quat::IDENTITY);
            self.local_scale.push(Vec3f::ONE);
            self.initialized.push(false);
            self.local_changed.push(true);
            self.local_matrix.push(Matrix4d::IDENTITY);
            self.local_matrix_state.push(CacheState::Stale);
            self.universe_rotation.push(Quat::IDENTITY);
            self.universe_rotation_state.push(CacheState::Stale);
            self.universe_matrix.push(Matrix4d::IDENTITY);
            self.universe_matrix_state.push(CacheState::Stale);
            self.world_matrix.push(Matrix4d::IDENTITY);
            self.world_matrix_state.push(CacheState::Stale);
            self.generation.push(0);
            idx
        };

        self.note_topology_change();
        self.pending_added.push(idx);
        self.dirty.mark(idx, dirty::POSE);
        self.dirty.mark(idx, dirty::TOPOLOGY);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node, freeing its slot for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the node has children (remove them first) or if the handle
    /// is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx;
        assert!(
            self.first_child[idx as usize] == INVALID,
            "cannot destroy node with children"
        );

        // Remove from parent's child list if attached.
        if self.parent[idx as usize] != INVALID {
            let p = self.parent[idx as usize];
            self.unlink_from_parent(idx);
            // Losing the last child switches the parent back to
            // anisotropic scale.
            if self.first_child[p as usize] == INVALID {
                self.invalidate_transform(p);
            }
        }

        // Remove dirty tracking dependencies.
        self.dirty.remove_key(idx);

        // Bump generation so old handles immediately fail validation.
        self.generation[idx as usize] += 1;

        self.free_list.push(idx);
        self.note_topology_change();
        self.pending_removed.push(idx);
        self.dirty.mark(idx, dirty::TOPOLOGY);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`.
    ///
    /// The child's derived caches go stale under the new ancestry. If the
    /// parent was a leaf, its scale switches to uniform mode, which also
    /// invalidates the parent's subtree.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if `child` already has a parent.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        let p = parent.idx;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );

        let was_leaf = self.first_child[p as usize] == INVALID;
        self.link_last_child(p, c);

        // Dirty dependency edge: child's pose depends on parent's.
        let _ = self.dirty.add_dependency(c, p, dirty::POSE);

        if was_leaf {
            self.invalidate_transform(p);
        }
        self.mark_derived_stale(c);
        self.dirty.mark_with(c, dirty::POSE, &EagerPolicy);
        self.note_topology_change();
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Removes `child` from its current parent, making it a root.
    ///
    /// The child's derived caches go stale under the lost ancestry. If the
    /// parent has no remaining children, its scale switches back to
    /// anisotropic mode, which also invalidates the parent.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "node has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.dirty.remove_dependency(c, p, dirty::POSE);

        if self.first_child[p as usize] == INVALID {
            self.invalidate_transform(p);
        }
        self.mark_derived_stale(c);
        self.dirty.mark_with(c, dirty::POSE, &EagerPolicy);
        self.note_topology_change();
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Moves `child` to be a child of `new_parent`, keeping its local
    /// transform (so its world pose generally changes).
    ///
    /// If `child` already has a parent, it is removed first. See
    /// [`reparent_preserving_world`](Self::reparent_preserving_world) for
    /// the variant that recomputes the local transform instead.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn reparent(&mut self, child: NodeId, new_parent: NodeId) {
        self.validate(child);
        self.validate(new_parent);
        let c = child.idx;

        if self.parent[c as usize] != INVALID {
            let old_p = self.parent[c as usize];
            self.unlink_from_parent(c);
            self.dirty.remove_dependency(c, old_p, dirty::POSE);
            if self.first_child[old_p as usize] == INVALID {
                self.invalidate_transform(old_p);
            }
            self.dirty.mark(old_p, dirty::TOPOLOGY);
        }

        let p = new_parent.idx;
        let was_leaf = self.first_child[p as usize] == INVALID;
        self.link_last_child(p, c);
        let _ = self.dirty.add_dependency(c, p, dirty::POSE);

        if was_leaf {
            self.invalidate_transform(p);
        }
        self.mark_derived_stale(c);
        self.dirty.mark_with(c, dirty::POSE, &EagerPolicy);
        self.note_topology_change();
        self.dirty.mark(p, dirty::TOPOLOGY);
    }

    /// Moves `child` under `new_parent` (or to root for `None`), recomputing
    /// its local transform so that its world pose is preserved.
    ///
    /// The new local transform is the old world matrix re-expressed in the
    /// new parent's frame; scale sign is restored from the child's previous
    /// local scale, since decomposition recovers magnitudes only.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn reparent_preserving_world(&mut self, child: NodeId, new_parent: Option<NodeId>) {
        self.validate(child);
        if let Some(p) = new_parent {
            self.validate(p);
        }
        let c = child.idx;
        let old_world = self.world_matrix_at(c);

        // Detach from the current parent, if any.
        if self.parent[c as usize] != INVALID {
            let old_p = self.parent[c as usize];
            self.unlink_from_parent(c);
            self.dirty.remove_dependency(c, old_p, dirty::POSE);
            if self.first_child[old_p as usize] == INVALID {
                self.invalidate_transform(old_p);
            }
            self.dirty.mark(old_p, dirty::TOPOLOGY);
        }

        let parent_from_world = match new_parent {
            Some(p) => self.world_matrix_at(p.idx).inverse(),
            None => self.universe_from_world,
        };
        let (t, r, s) = (parent_from_world * old_world).decompose_trs();
        let s = s.copy_sign(self.local_scale[c as usize]);
        self.store_local_trs(c, t, r, s);

        if let Some(p) = new_parent {
            let pi = p.idx;
            let was_leaf = self.first_child[pi as usize] == INVALID;
            self.link_last_child(pi, c);
            let _ = self.dirty.add_dependency(c, pi, dirty::POSE);
            if was_leaf {
                self.invalidate_transform(pi);
            }
            self.dirty.mark(pi, dirty::TOPOLOGY);
        }

        self.invalidate_transform(c);
        self.note_topology_change();
        self.dirty.mark(c, dirty::TOPOLOGY);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            None
        } else {
            Some(NodeId {
                idx: p,
                generation: self.generation[p as usize],
            })
        }
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the root nodes (those with no parent).
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        let mut roots = Vec::new();
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                roots.push(NodeId {
                    idx,
                    generation: self.generation[idx as usize],
                });
            }
        }
        roots
    }

    // -- Local transform --

    /// Returns the local position.
    #[must_use]
    pub fn local_position(&self, id: NodeId) -> Vec3d {
        self.validate(id);
        self.local_position[id.idx as usize]
    }

    /// Sets the local position.
    ///
    /// Invalidates this node's local matrix and the derived caches of the
    /// node and all its descendants; ancestors are untouched.
    pub fn set_local_position(&mut self, id: NodeId, position: Vec3d) {
        self.validate(id);
        debug_assert!(position.is_finite(), "non-finite local position");
        self.local_position[id.idx as usize] = position;
        self.local_changed[id.idx as usize] = true;
        self.invalidate_transform(id.idx);
    }

    /// Returns the local rotation.
    #[must_use]
    pub fn local_rotation(&self, id: NodeId) -> Quat {
        self.validate(id);
        self.local_rotation[id.idx as usize]
    }

    /// Sets the local rotation. Invalidation as for
    /// [`set_local_position`](Self::set_local_position).
    pub fn set_local_rotation(&mut self, id: NodeId, rotation: Quat) {
        self.validate(id);
        debug_assert!(rotation.is_finite(), "non-finite local rotation");
        self.local_rotation[id.idx as usize] = rotation;
        self.local_changed[id.idx as usize] = true;
        self.invalidate_transform(id.idx);
    }

    /// Returns the local scale, with the node's scale mode applied: uniform
    /// (X broadcast to all axes) when the node has children, anisotropic
    /// when it is a leaf.
    #[must_use]
    pub fn local_scale(&self, id: NodeId) -> Vec3f {
        self.validate(id);
        self.scale_for(id.idx)
    }

    /// Sets the local scale. All three components are stored; whether the
    /// Y and Z components take effect depends on the node's scale mode at
    /// read time. Invalidation as for
    /// [`set_local_position`](Self::set_local_position).
    pub fn set_local_scale(&mut self, id: NodeId, scale: Vec3f) {
        self.validate(id);
        debug_assert!(scale.is_finite(), "non-finite local scale");
        self.local_scale[id.idx as usize] = scale;
        self.local_changed[id.idx as usize] = true;
        self.invalidate_transform(id.idx);
    }

    /// Returns the node's current scale mode.
    #[must_use]
    pub fn scale_mode(&self, id: NodeId) -> ScaleMode {
        self.validate(id);
        if self.first_child[id.idx as usize] == INVALID {
            ScaleMode::Anisotropic
        } else {
            ScaleMode::Uniform
        }
    }

    // -- Universe transform --

    /// Returns the node's position relative to the hierarchy root, in full
    /// double precision.
    #[must_use]
    pub fn universe_position(&mut self, id: NodeId) -> Vec3d {
        self.validate(id);
        let i = id.idx as usize;
        let p = self.parent[i];
        if p == INVALID {
            self.local_position[i]
        } else {
            let parent_universe = self.universe_matrix_at(p);
            parent_universe.transform_point(self.local_position[i])
        }
    }

    /// Moves the node to the given universe position by recomputing its
    /// local position through the parent's inverse universe matrix, then
    /// delegating to [`set_local_position`](Self::set_local_position).
    pub fn set_universe_position(&mut self, id: NodeId, position: Vec3d) {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        let local = if p == INVALID {
            position
        } else {
            self.universe_matrix_at(p).inverse().transform_point(position)
        };
        self.set_local_position(id, local);
    }

    /// Returns the node's rotation relative to the hierarchy root
    /// (lazily cached).
    #[must_use]
    pub fn universe_rotation(&mut self, id: NodeId) -> Quat {
        self.validate(id);
        self.universe_rotation_at(id.idx)
    }

    /// Rotates the node to the given universe rotation by recomputing its
    /// local rotation against the parent's inverse universe rotation, then
    /// delegating to [`set_local_rotation`](Self::set_local_rotation).
    pub fn set_universe_rotation(&mut self, id: NodeId, rotation: Quat) {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        let local = if p == INVALID {
            rotation
        } else {
            self.universe_rotation_at(p).inverse() * rotation
        };
        self.set_local_rotation(id, local);
    }

    // -- Matrices --

    /// Returns the node's local TRS matrix (lazily cached).
    #[must_use]
    pub fn local_matrix(&mut self, id: NodeId) -> Matrix4d {
        self.validate(id);
        self.local_matrix_at(id.idx)
    }

    /// Returns the node's universe matrix — the product of ancestor local
    /// matrices down to this node (lazily cached).
    #[must_use]
    pub fn universe_matrix(&mut self, id: NodeId) -> Matrix4d {
        self.validate(id);
        self.universe_matrix_at(id.idx)
    }

    /// Returns the node's world matrix — the universe matrix re-expressed
    /// relative to the [world origin](Self::set_world_origin) (lazily
    /// cached). This is the pose the host scene consumes.
    #[must_use]
    pub fn world_matrix(&mut self, id: NodeId) -> Matrix4d {
        self.validate(id);
        self.world_matrix_at(id.idx)
    }

    // -- World origin --

    /// Sets the universe pose of the host world origin.
    ///
    /// World matrices become the universe matrices re-expressed relative to
    /// this pose. Hosts rebase it (e.g. to the viewer's vicinity) so that
    /// single-precision world coordinates stay small while universe
    /// coordinates remain planetary. Every node's world matrix goes stale;
    /// universe state is untouched.
    pub fn set_world_origin(&mut self, position: Vec3d, rotation: Quat) {
        debug_assert!(
            position.is_finite() && rotation.is_finite(),
            "non-finite world origin"
        );
        self.origin_position = position;
        self.origin_rotation = rotation;
        self.universe_from_world = Matrix4d::compose_trs(position, rotation, Vec3f::ONE);
        // Exact rigid inverse: conjugate rotation, back-rotated negated
        // translation.
        let inverse_rotation = rotation.inverse();
        self.world_from_universe =
            Matrix4d::compose_trs(inverse_rotation.rotate(-position), inverse_rotation, Vec3f::ONE);

        for idx in 0..self.len {
            if self.free_list.contains(&idx) {
                continue;
            }
            self.world_matrix_state[idx as usize] = CacheState::Stale;
            self.dirty.mark(idx, dirty::POSE);
        }
    }

    /// Returns the universe pose of the host world origin.
    #[must_use]
    pub fn world_origin(&self) -> (Vec3d, Quat) {
        (self.origin_position, self.origin_rotation)
    }

    /// Converts a universe-space point to host-world space.
    #[must_use]
    pub fn universe_to_world(&self, point: Vec3d) -> Vec3d {
        self.world_from_universe.transform_point(point)
    }

    /// Converts a host-world-space point to universe space.
    #[must_use]
    pub fn world_to_universe(&self, point: Vec3d) -> Vec3d {
        self.universe_from_world.transform_point(point)
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Appends `c` to `p`'s child list. Does not touch dirty state.
    fn link_last_child(&mut self, p: u32, c: u32) {
        #[cfg(debug_assertions)]
        {
            // Acyclicity: the prospective parent must not sit in the
            // child's subtree.
            let mut a = p;
            while a != INVALID {
                debug_assert!(a != c, "attaching a node under its own descendant");
                a = self.parent[a as usize];
            }
        }

        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty
    /// state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }

    /// Records that the tree shape changed.
    fn note_topology_change(&mut self) {
        self.traversal_dirty = true;
        self.topology_pending = true;
    }

    /// The effective scale under the node's current scale mode.
    pub(crate) fn scale_for(&self, idx: u32) -> Vec3f {
        let i = idx as usize;
        let s = self.local_scale[i];
        if self.first_child[i] == INVALID {
            s
        } else {
            Vec3f::splat(s.x)
        }
    }

    /// Stores a decomposed local transform without the caller-input
    /// finiteness checks (internal results may legitimately carry
    /// non-finite values from singular ancestry, which propagate silently).
    pub(crate) fn store_local_trs(&mut self, idx: u32, t: Vec3d, r: Quat, s: Vec3f) {
        let i = idx as usize;
        self.local_position[i] = t;
        self.local_rotation[i] = r;
        self.local_scale[i] = s;
        self.local_changed[i] = true;
    }

    /// Invalidates the node's local matrix, the derived caches of its whole
    /// subtree, and marks its pose dirty (propagating to descendants).
    pub(crate) fn invalidate_transform(&mut self, idx: u32) {
        self.local_matrix_state[idx as usize] = CacheState::Stale;
        self.mark_derived_stale(idx);
        self.dirty.mark_with(idx, dirty::POSE, &EagerPolicy);
    }

    /// Marks the derived caches of `idx` and all its descendants stale.
    ///
    /// Early-outs when the node is already fully stale: a fully stale node
    /// implies a fully stale subtree, since any descendant read would have
    /// refreshed this node first.
    pub(crate) fn mark_derived_stale(&mut self, idx: u32) {
        let i = idx as usize;
        if self.universe_rotation_state[i].is_stale()
            && self.universe_matrix_state[i].is_stale()
            && self.world_matrix_state[i].is_stale()
        {
            return;
        }
        self.universe_rotation_state[i] = CacheState::Stale;
        self.universe_matrix_state[i] = CacheState::Stale;
        self.world_matrix_state[i] = CacheState::Stale;

        let mut child = self.first_child[i];
        while child != INVALID {
            self.mark_derived_stale(child);
            child = self.next_sibling[child as usize];
        }
    }

    pub(crate) fn local_matrix_at(&mut self, idx: u32) -> Matrix4d {
        let i = idx as usize;
        if self.local_matrix_state[i].is_stale() {
            self.local_matrix[i] = Matrix4d::compose_trs(
                self.local_position[i],
                self.local_rotation[i],
                self.scale_for(idx),
            );
            self.local_matrix_state[i] = CacheState::Fresh;
        }
        self.local_matrix[i]
    }

    pub(crate) fn universe_rotation_at(&mut self, idx: u32) -> Quat {
        let i = idx as usize;
        if self.universe_rotation_state[i].is_stale() {
            let p = self.parent[i];
            self.universe_rotation[i] = if p == INVALID {
                self.local_rotation[i]
            } else {
                self.universe_rotation_at(p) * self.local_rotation[i]
            };
            self.universe_rotation_state[i] = CacheState::Fresh;
        }
        self.universe_rotation[i]
    }

    pub(crate) fn universe_matrix_at(&mut self, idx: u32) -> Matrix4d {
        let i = idx as usize;
        if self.universe_matrix_state[i].is_stale() {
            let p = self.parent[i];
            self.universe_matrix[i] = if p == INVALID {
                self.local_matrix_at(idx)
            } else {
                self.universe_matrix_at(p) * self.local_matrix_at(idx)
            };
            self.universe_matrix_state[i] = CacheState::Fresh;
        }
        self.universe_matrix[i]
    }

    pub(crate) fn world_matrix_at(&mut self, idx: u32) -> Matrix4d {
        let i = idx as usize;
        if self.world_matrix_state[i].is_stale() {
            let p = self.parent[i];
            self.world_matrix[i] = if p == INVALID {
                self.world_from_universe * self.local_matrix_at(idx)
            } else {
                self.world_matrix_at(p) * self.local_matrix_at(idx)
            };
            self.world_matrix_state[i] = CacheState::Fresh;
        }
        self.world_matrix[i]
    }
}
