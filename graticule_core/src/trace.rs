// Copyright 2026 the Graticule Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the sync loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that
//! frame-loop instrumentation calls around the synchronization passes. All
//! method bodies default to no-ops, so implementing only the events you care
//! about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.
//!
//! # Crate features
//!
//! - `trace` — enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`) — gates [`NodeChange`] events plus the
//!   corresponding `TraceSink` method.

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which direction a host synchronization pass ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SyncDirection {
    /// Host poses pulled into the double-precision store.
    FromHost,
    /// Stale world poses pushed out to the host.
    ToHost,
}

/// Which property of a node changed.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NodeField {
    /// Local or universe position.
    Position,
    /// Local or universe rotation.
    Rotation,
    /// Local scale.
    Scale,
    /// Topology (parent/child relationships).
    Topology,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted after a host synchronization pass completes.
#[derive(Clone, Copy, Debug)]
pub struct SyncPassEvent {
    /// Which direction the pass ran.
    pub direction: SyncDirection,
    /// How many node poses the pass transferred.
    pub nodes: u32,
}

/// Emitted when the depth-first traversal order is rebuilt.
#[derive(Clone, Copy, Debug)]
pub struct TopologyRebuildEvent {
    /// How many live nodes the rebuilt order covers.
    pub nodes: u32,
}

/// A per-pass node change record.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct NodeChange {
    /// Slot index of the node that changed.
    pub node_index: u32,
    /// Which field changed.
    pub field: NodeField,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the sync loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called after a synchronization pass.
    fn on_sync_pass(&mut self, e: &SyncPassEvent) {
        _ = e;
    }

    /// Called when the traversal order is rebuilt.
    fn on_topology_rebuild(&mut self, e: &TopologyRebuildEvent) {
        _ = e;
    }

    /// Called with per-pass node changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_node_changes(&mut self, changes: &[NodeChange]) {
        _ = changes;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`SyncPassEvent`].
    #[inline]
    pub fn sync_pass(&mut self, e: &SyncPassEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_sync_pass(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`TopologyRebuildEvent`].
    #[inline]
    pub fn topology_rebuild(&mut self, e: &TopologyRebuildEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_topology_rebuild(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits node changes (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn node_changes(&mut self, changes: &[NodeChange]) {
        if let Some(s) = &mut self.sink {
            s.on_node_changes(changes);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_sync_pass(&SyncPassEvent {
            direction: SyncDirection::ToHost,
            nodes: 3,
        });
        sink.on_topology_rebuild(&TopologyRebuildEvent { nodes: 7 });
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.sync_pass(&SyncPassEvent {
            direction: SyncDirection::FromHost,
            nodes: 0,
        });
        tracer.topology_rebuild(&TopologyRebuildEvent { nodes: 0 });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct RecordingSink {
            passes: Vec<u32>,
        }
        impl TraceSink for RecordingSink {
            fn on_sync_pass(&mut self, e: &SyncPassEvent) {
                self.passes.push(e.nodes);
            }
        }

        let mut sink = RecordingSink { passes: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.sync_pass(&SyncPassEvent {
            direction: SyncDirection::ToHost,
            nodes: 42,
        });
        drop(tracer);
        assert_eq!(sink.passes, &[42]);
    }
}
