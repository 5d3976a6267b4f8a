// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable diagnostics output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).
//! [`dump_tree`] writes an indented snapshot of a [`NodeStore`]'s topology
//! and poses.

use std::io::Write;

use graticule_core::node::{NodeId, NodeStore, ScaleMode};
use graticule_core::trace::{
    NodeChange, SyncDirection, SyncPassEvent, TopologyRebuildEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write)
/// destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

fn direction_name(direction: SyncDirection) -> &'static str {
    match direction {
        SyncDirection::FromHost => "pull",
        SyncDirection::ToHost => "push",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_sync_pass(&mut self, e: &SyncPassEvent) {
        let _ = writeln!(
            self.writer,
            "[sync] {} nodes={}",
            direction_name(e.direction),
            e.nodes,
        );
    }

    fn on_topology_rebuild(&mut self, e: &TopologyRebuildEvent) {
        let _ = writeln!(self.writer, "[topology] nodes={}", e.nodes);
    }

    fn on_node_changes(&mut self, changes: &[NodeChange]) {
        let _ = writeln!(self.writer, "[nodes] changes={}", changes.len());
    }
}

/// Writes an indented snapshot of the store's topology and poses.
///
/// One line per node: handle, local position, effective local scale, and
/// scale mode. Reads go through the store's lazy getters, so the dump
/// reflects (and freshens) current state.
pub fn dump_tree<W: Write>(store: &mut NodeStore, writer: &mut W) {
    for root in store.roots() {
        dump_subtree(store, root, 0, writer);
    }
}

fn dump_subtree<W: Write>(store: &mut NodeStore, id: NodeId, depth: usize, writer: &mut W) {
    let p = store.universe_position(id);
    let s = store.local_scale(id);
    let mode = match store.scale_mode(id) {
        ScaleMode::Uniform => "uniform",
        ScaleMode::Anisotropic => "anisotropic",
    };
    let _ = writeln!(
        writer,
        "{:indent$}{id:?} universe=({:.3}, {:.3}, {:.3}) scale=({}, {}, {}) [{mode}]",
        "",
        p.x,
        p.y,
        p.z,
        s.x,
        s.y,
        s.z,
        indent = depth * 2,
    );

    let children: Vec<NodeId> = store.children(id).collect();
    for child in children {
        dump_subtree(store, child, depth + 1, writer);
    }
}
