// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host synchronization and change tracking.
//!
//! Synchronization follows a drain-rewrite pattern over the dirty channels:
//!
//! 1. **Pull** ([`NodeStore::sync_from_host`] / [`NodeStore::pull`]) —
//!    Adopt host-side edits into the double-precision store. A node pulls
//!    once at initialization, and afterwards only when the host reports a
//!    change *and* no local-side change is pending — local changes always
//!    win, so initialization-order races resolve toward this store.
//! 2. **Push** ([`NodeStore::sync_to_host`]) — Drain the
//!    [`POSE`](crate::dirty::POSE) channel (parents before children) and
//!    rewrite each affected host pose. Interior nodes reset the host-local
//!    transform to identity plus uniform scale, because their descendants
//!    write *absolute* world poses and the host's own matrix stack must not
//!    apply ancestor transforms twice. Leaves decompose the world matrix
//!    and write it out, restoring scale sign from the current local scale.
//!
//! [`SyncChanges`] uses raw slot indices (`u32`) rather than
//! [`NodeId`](super::NodeId) handles so that host adapters can correlate
//! them with their own slot tables without paying for generation checks.

use alloc::vec::Vec;

use graticule_math::{Matrix4d, Quat, Vec3f};

use super::id::{INVALID, NodeId};
use super::store::NodeStore;
use crate::dirty;
use crate::host::HostScene;

/// The set of changes produced by a single [`NodeStore::sync_to_host`] call.
///
/// Each list contains the raw slot indices of nodes that changed in the
/// corresponding category. Host adapters use these to apply incremental
/// updates (create bindings for `added`, drop them for `removed`).
#[derive(Clone, Debug, Default)]
pub struct SyncChanges {
    /// Nodes whose host pose was rewritten.
    pub poses: Vec<u32>,
    /// Nodes created since the last sync.
    pub added: Vec<u32>,
    /// Nodes destroyed since the last sync.
    pub removed: Vec<u32>,
    /// Whether the tree topology changed since the last sync.
    pub topology_changed: bool,
}

impl SyncChanges {
    /// Clears all change lists.
    pub fn clear(&mut self) {
        self.poses.clear();
        self.added.clear();
        self.removed.clear();
        self.topology_changed = false;
    }
}

impl NodeStore {
    /// Adopts the host pose of one node, if the sync rules allow it.
    ///
    /// Pulls unconditionally while the node has never been initialized from
    /// the host. Afterwards, pulls only when the host reports an
    /// out-of-band change and no local-side change is pending. Returns
    /// whether a pull happened.
    ///
    /// The host pose is interpreted as `worldFromObject`, re-expressed in
    /// the parent's frame via `inverse(parent.worldMatrix)`, decomposed,
    /// and stored as the local transform; scale sign is restored from the
    /// host's previous scale since decomposition recovers magnitudes only.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn pull(&mut self, id: NodeId, host: &mut impl HostScene) -> bool {
        self.validate(id);
        let i = id.idx as usize;
        if self.initialized[i] && (self.local_changed[i] || !host.changed(id.idx)) {
            return false;
        }
        self.pull_at(id.idx, host);
        true
    }

    fn pull_at(&mut self, idx: u32, host: &mut impl HostScene) {
        let parent_idx = self.parent[idx as usize];
        let parent_from_world = if parent_idx == INVALID {
            self.universe_from_world
        } else {
            self.world_matrix_at(parent_idx).inverse()
        };
        let world_from_object = Matrix4d::compose_trs(
            host.position(idx).to_f64(),
            Quat::from_xyzw_f32(host.rotation(idx)),
            host.scale(idx),
        );
        let (t, r, s) = (parent_from_world * world_from_object).decompose_trs();
        let s = s.copy_sign(host.scale(idx));

        self.store_local_trs(idx, t, r, s);
        self.initialized[idx as usize] = true;
        self.local_changed[idx as usize] = false;
        host.clear_changed(idx);
        self.invalidate_transform(idx);
    }

    /// Sweeps the tree in parent-before-child order and pulls every node
    /// the sync rules allow. Returns how many nodes were pulled.
    pub fn sync_from_host(&mut self, host: &mut impl HostScene) -> u32 {
        if self.traversal_dirty {
            self.rebuild_traversal_order();
            self.traversal_dirty = false;
        }

        let order = core::mem::take(&mut self.traversal_order);
        let mut pulled = 0;
        for &idx in &order {
            let i = idx as usize;
            if self.initialized[i] && (self.local_changed[i] || !host.changed(idx)) {
                continue;
            }
            self.pull_at(idx, host);
            pulled += 1;
        }
        self.traversal_order = order;
        pulled
    }

    /// Rewrites every stale host pose and returns the set of changes.
    ///
    /// Rebuilds the traversal order if topology changed, then drains the
    /// pose channel in parent-before-child order so the host observes
    /// ancestor state before descendants are written.
    pub fn sync_to_host(&mut self, host: &mut impl HostScene) -> SyncChanges {
        let mut changes = SyncChanges::default();
        self.sync_to_host_into(host, &mut changes);
        changes
    }

    /// Like [`sync_to_host`](Self::sync_to_host), but reuses a
    /// caller-provided buffer to avoid allocation.
    pub fn sync_to_host_into(&mut self, host: &mut impl HostScene, changes: &mut SyncChanges) {
        changes.clear();

        if self.traversal_dirty {
            self.rebuild_traversal_order();
            self.traversal_dirty = false;
        }
        changes.topology_changed = self.topology_pending;
        self.topology_pending = false;

        // Drain POSE — dependency edges order parents before children.
        let dirty_poses: Vec<u32> = self
            .dirty
            .drain(dirty::POSE)
            .affected()
            .deterministic()
            .run()
            .collect();
        for &idx in &dirty_poses {
            let i = idx as usize;
            if self.first_child[i] != INVALID {
                // Interior node: descendants write absolute world poses, so
                // the host-side transform must contribute nothing but the
                // uniform scale.
                let s = self.local_scale[i].x;
                host.set_position(idx, Vec3f::ZERO);
                host.set_rotation(idx, Quat::IDENTITY.to_xyzw_f32());
                host.set_scale(idx, Vec3f::splat(s));
            } else {
                let world = self.world_matrix_at(idx);
                let (t, r, s) = world.decompose_trs();
                let s = s.copy_sign(self.local_scale[i]);
                host.set_position(idx, t.to_f32());
                host.set_rotation(idx, r.to_xyzw_f32());
                host.set_scale(idx, s);
            }
            // Our own writes must not read back as host edits.
            host.clear_changed(idx);
            self.local_changed[i] = false;
        }
        changes.poses = dirty_poses;

        // Drain TOPOLOGY (just consume; the rebuild already happened).
        let _: Vec<u32> = self
            .dirty
            .drain(dirty::TOPOLOGY)
            .deterministic()
            .run()
            .collect();

        // Move lifecycle lists.
        core::mem::swap(&mut self.pending_added, &mut changes.added);
        core::mem::swap(&mut self.pending_removed, &mut changes.removed);
    }

    /// Re-resolves the node's parent through the host hierarchy and, if it
    /// differs from the tracked parent, re-links the node while preserving
    /// its world pose.
    ///
    /// Hosts call this when an object's parent changed on their side; the
    /// nearest host ancestor that is bound to a node becomes the new parent
    /// (none makes the node a root).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the host resolves an unknown slot.
    pub fn rebind(&mut self, id: NodeId, host: &impl HostScene) {
        self.validate(id);
        let resolved = host.resolve_parent(id.idx);
        if resolved.unwrap_or(INVALID) == self.parent[id.idx as usize] {
            return;
        }
        let new_parent = resolved.map(|idx| {
            assert!(
                idx < self.len && !self.free_list.contains(&idx),
                "host resolved an unknown slot: {idx}"
            );
            NodeId {
                idx,
                generation: self.generation[idx as usize],
            }
        });
        self.reparent_preserving_world(id, new_parent);
    }

    /// Returns the current traversal order (depth-first pre-order).
    ///
    /// Only valid after a sync pass has run at least once.
    #[must_use]
    pub fn traversal_order(&self) -> &[u32] {
        &self.traversal_order
    }

    /// Rebuilds the depth-first pre-order traversal of all live nodes.
    pub(crate) fn rebuild_traversal_order(&mut self) {
        self.traversal_order.clear();
        // Start from roots.
        for idx in 0..self.len {
            if self.parent[idx as usize] == INVALID && !self.free_list.contains(&idx) {
                self.dfs_collect(idx);
            }
        }
    }

    /// Depth-first pre-order collection starting from `idx`.
    fn dfs_collect(&mut self, idx: u32) {
        self.traversal_order.push(idx);
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            self.dfs_collect(child);
            child = self.next_sibling[child as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use graticule_math::Vec3d;

    use super::*;

    const EPS: f64 = 1e-5;

    /// Vec-backed host double with the change-flag semantics of a real
    /// engine: external edits set `changed`, the store's own writes do not.
    struct MockHost {
        position: Vec<Vec3f>,
        rotation: Vec<[f32; 4]>,
        scale: Vec<Vec3f>,
        changed: Vec<bool>,
        parents: Vec<Option<u32>>,
    }

    impl MockHost {
        fn with_slots(n: usize) -> Self {
            Self {
                position: vec![Vec3f::ZERO; n],
                rotation: vec![[0.0, 0.0, 0.0, 1.0]; n],
                scale: vec![Vec3f::ONE; n],
                changed: vec![false; n],
                parents: vec![None; n],
            }
        }

        /// Simulates a host-side edit (sets the change flag).
        fn edit_position(&mut self, idx: u32, p: Vec3f) {
            self.position[idx as usize] = p;
            self.changed[idx as usize] = true;
        }
    }

    impl HostScene for MockHost {
        fn position(&self, idx: u32) -> Vec3f {
            self.position[idx as usize]
        }

        fn rotation(&self, idx: u32) -> [f32; 4] {
            self.rotation[idx as usize]
        }

        fn scale(&self, idx: u32) -> Vec3f {
            self.scale[idx as usize]
        }

        fn set_position(&mut self, idx: u32, position: Vec3f) {
            self.position[idx as usize] = position;
        }

        fn set_rotation(&mut self, idx: u32, rotation: [f32; 4]) {
            self.rotation[idx as usize] = rotation;
        }

        fn set_scale(&mut self, idx: u32, scale: Vec3f) {
            self.scale[idx as usize] = scale;
        }

        fn changed(&self, idx: u32) -> bool {
            self.changed[idx as usize]
        }

        fn clear_changed(&mut self, idx: u32) {
            self.changed[idx as usize] = false;
        }

        fn resolve_parent(&self, idx: u32) -> Option<u32> {
            self.parents[idx as usize]
        }
    }

    #[test]
    fn pull_initializes_from_host_pose() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(1);
        let node = store.create_node();

        host.position[0] = Vec3f::new(1.0, 2.0, 3.0);
        host.scale[0] = Vec3f::new(-2.0, 3.0, 4.0);

        assert!(store.pull(node, &mut host));
        let p = store.local_position(node);
        assert!((p.x - 1.0).abs() < EPS && (p.y - 2.0).abs() < EPS && (p.z - 3.0).abs() < EPS);
        // Sign restored from the host's scale.
        let s = store.local_scale(node);
        assert!((f64::from(s.x) + 2.0).abs() < EPS, "got {s:?}");
        assert!((f64::from(s.y) - 3.0).abs() < EPS);
        assert!((f64::from(s.z) - 4.0).abs() < EPS);
    }

    #[test]
    fn pull_interprets_host_pose_in_parent_frame() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(2);
        let parent = store.create_node();
        let child = store.create_node();
        store.add_child(parent, child);
        store.set_local_position(parent, Vec3d::new(10.0, 0.0, 0.0));

        host.position[child.index() as usize] = Vec3f::new(11.0, 0.0, 0.0);
        assert!(store.pull(child, &mut host));

        let local = store.local_position(child);
        assert!((local.x - 1.0).abs() < EPS, "got {local:?}");
    }

    #[test]
    fn pull_respects_local_priority() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(1);
        let node = store.create_node();

        assert!(store.pull(node, &mut host), "first pull initializes");

        // No host change: nothing to pull.
        assert!(!store.pull(node, &mut host));

        // Host change, but a local change landed first: local wins.
        store.set_local_position(node, Vec3d::new(5.0, 0.0, 0.0));
        host.edit_position(0, Vec3f::new(99.0, 0.0, 0.0));
        assert!(!store.pull(node, &mut host));
        assert!((store.local_position(node).x - 5.0).abs() < EPS);

        // After the push clears the local flag, the host edit gets through.
        let _ = store.sync_to_host(&mut host);
        host.edit_position(0, Vec3f::new(42.0, 0.0, 0.0));
        assert!(store.pull(node, &mut host));
        assert!((store.local_position(node).x - 42.0).abs() < EPS);
    }

    #[test]
    fn sync_from_host_pulls_changed_nodes_parents_first() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(2);
        let parent = store.create_node();
        let child = store.create_node();
        store.add_child(parent, child);

        // Initialize both, then edit both on the host side.
        let _ = store.sync_from_host(&mut host);
        let _ = store.sync_to_host(&mut host);
        host.edit_position(parent.index(), Vec3f::new(7.0, 0.0, 0.0));
        host.edit_position(child.index(), Vec3f::new(9.0, 0.0, 0.0));

        assert_eq!(store.sync_from_host(&mut host), 2);
        // The child's host pose is world-absolute; with the parent at
        // (7,0,0) its local X becomes 2.
        assert!((store.local_position(parent).x - 7.0).abs() < EPS);
        assert!((store.local_position(child).x - 2.0).abs() < EPS);
    }

    #[test]
    fn sync_to_host_writes_leaf_world_pose_and_resets_interior() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(2);
        let parent = store.create_node();
        let child = store.create_node();
        store.add_child(parent, child);

        store.set_local_position(parent, Vec3d::new(10.0, 0.0, 0.0));
        store.set_local_scale(parent, Vec3f::new(1.0, 1.0, 1.0));
        store.set_local_position(child, Vec3d::new(0.0, 5.0, 0.0));

        let changes = store.sync_to_host(&mut host);
        assert!(changes.poses.contains(&parent.index()));
        assert!(changes.poses.contains(&child.index()));

        // Interior node resets to identity so the host stack cannot
        // double-apply its transform.
        assert_eq!(host.position[parent.index() as usize], Vec3f::ZERO);
        assert_eq!(host.scale[parent.index() as usize], Vec3f::ONE);

        // Leaf writes its absolute world pose.
        let p = host.position[child.index() as usize];
        assert!((f64::from(p.x) - 10.0).abs() < EPS && (f64::from(p.y) - 5.0).abs() < EPS);
    }

    #[test]
    fn sync_to_host_reports_lifecycle_and_topology() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(2);
        let a = store.create_node();
        let b = store.create_node();
        store.add_child(a, b);

        let changes = store.sync_to_host(&mut host);
        assert!(changes.topology_changed);
        assert!(changes.added.contains(&a.index()));
        assert!(changes.added.contains(&b.index()));
        assert!(changes.removed.is_empty());

        // A quiet frame reports nothing.
        let changes = store.sync_to_host(&mut host);
        assert!(!changes.topology_changed);
        assert!(changes.poses.is_empty());
        assert!(changes.added.is_empty());

        store.remove_from_parent(b);
        store.destroy_node(b);
        let changes = store.sync_to_host(&mut host);
        assert!(changes.topology_changed);
        assert!(changes.removed.contains(&b.index()));
    }

    #[test]
    fn parent_mutation_pushes_descendants_too() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(3);
        let root = store.create_node();
        let mid = store.create_node();
        let leaf = store.create_node();
        store.add_child(root, mid);
        store.add_child(mid, leaf);
        let _ = store.sync_to_host(&mut host);

        store.set_local_position(root, Vec3d::new(0.0, 0.0, 3.0));
        let changes = store.sync_to_host(&mut host);
        assert!(changes.poses.contains(&root.index()));
        assert!(changes.poses.contains(&mid.index()));
        assert!(changes.poses.contains(&leaf.index()));

        let p = host.position[leaf.index() as usize];
        assert!((f64::from(p.z) - 3.0).abs() < EPS, "got {p:?}");
    }

    #[test]
    fn leaf_mutation_does_not_push_ancestors() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(2);
        let parent = store.create_node();
        let child = store.create_node();
        store.add_child(parent, child);
        let _ = store.sync_to_host(&mut host);

        store.set_local_position(child, Vec3d::new(1.0, 0.0, 0.0));
        let changes = store.sync_to_host(&mut host);
        assert_eq!(changes.poses, vec![child.index()]);
    }

    #[test]
    fn push_restores_scale_sign_from_local_scale() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(1);
        let node = store.create_node();
        store.set_local_scale(node, Vec3f::new(-2.0, 3.0, 4.0));

        let _ = store.sync_to_host(&mut host);
        let s = host.scale[0];
        assert!((f64::from(s.x) + 2.0).abs() < EPS, "got {s:?}");
        assert!((f64::from(s.y) - 3.0).abs() < EPS);
        assert!((f64::from(s.z) - 4.0).abs() < EPS);
    }

    #[test]
    fn push_applies_world_origin() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(1);
        let node = store.create_node();
        store.set_local_position(node, Vec3d::new(6_378_137.0, 0.0, 25.0));
        store.set_world_origin(Vec3d::new(6_378_137.0, 0.0, 0.0), Quat::IDENTITY);

        let _ = store.sync_to_host(&mut host);
        let p = host.position[0];
        assert!((f64::from(p.x)).abs() < EPS && (f64::from(p.z) - 25.0).abs() < EPS);
    }

    #[test]
    fn rebind_follows_host_reparent_and_preserves_world() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(3);
        let a = store.create_node();
        let b = store.create_node();
        let node = store.create_node();

        store.set_local_position(a, Vec3d::new(10.0, 0.0, 0.0));
        store.set_local_position(b, Vec3d::new(0.0, 20.0, 0.0));
        store.add_child(a, node);
        store.set_local_position(node, Vec3d::new(1.0, 0.0, 0.0));
        host.parents[node.index() as usize] = Some(a.index());

        // Same resolved parent: no-op.
        store.rebind(node, &host);
        assert_eq!(store.parent(node), Some(a));

        // Host moved the object under b's subtree.
        host.parents[node.index() as usize] = Some(b.index());
        let before = store.world_matrix(node);
        store.rebind(node, &host);
        assert_eq!(store.parent(node), Some(b));
        let after = store.world_matrix(node);
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                assert!((before.cols[j][i] - after.cols[j][i]).abs() < 1e-6);
                i += 1;
            }
            j += 1;
        }
        // The local position now carries the frame change.
        assert!((store.local_position(node).x - 11.0).abs() < EPS);
        assert!((store.local_position(node).y + 20.0).abs() < EPS);
    }

    #[test]
    fn traversal_order_is_depth_first() {
        let mut store = NodeStore::new();
        let mut host = MockHost::with_slots(4);
        let a = store.create_node();
        let b = store.create_node();
        let c = store.create_node();
        let d = store.create_node();

        // Tree: a -> [b -> [d], c]
        store.add_child(a, b);
        store.add_child(a, c);
        store.add_child(b, d);

        let _ = store.sync_to_host(&mut host);
        assert_eq!(
            store.traversal_order(),
            &[a.index(), b.index(), d.index(), c.index()]
        );
    }
}
