//! Graph Nodes
//!
//! This module defines the contract every node in the dataflow graph
//! satisfies: a process-unique id, an opaque state value and a dirty flag.

use std::any::Any;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use futures_util::future::BoxFuture;

use crate::error::FlowResult;

/// The value held by a node. Opaque to the engine.
pub type State = serde_json::Value;

/// A state change that has not settled yet.
pub type Pending = BoxFuture<'static, FlowResult<()>>;

/// Unique identifier for a node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u64);

impl NodeId {
    /// Generate a new unique node ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<u64> for NodeId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of node in the dependency graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Holds the last state it was given.
    Store,

    /// State is a function of the current inputs.
    Transformer,

    /// A user type registered through [`Graph::wrap`](crate::Graph::wrap).
    Custom,
}

/// Outcome of handing a node its new inputs.
pub enum StateChange {
    /// The new state is already visible.
    Ready,

    /// The new state becomes visible once the future resolves.
    Deferred(Pending),
}

impl fmt::Debug for StateChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => f.write_str("Ready"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A node in the dataflow graph.
///
/// Nodes know nothing about each other. Adjacency lives in the
/// [`Graph`](crate::Graph), which calls back into nodes while propagating.
pub trait Node: Send + Sync + 'static {
    /// The node's process-unique id.
    fn id(&self) -> NodeId;

    /// Which variant this node is.
    fn kind(&self) -> NodeKind;

    /// The last computed or assigned state.
    fn state(&self) -> State;

    /// Replace the state from the ordered states of the node's inputs.
    fn set_state(&self, inputs: Vec<State>) -> FlowResult<StateChange>;

    /// Whether the state is stale within the current propagation pass.
    fn is_dirty(&self) -> bool;

    /// Set or clear the dirty flag.
    fn mark_dirty(&self, dirty: bool);

    /// Called after this node gained downstream bindings.
    fn on_bind(&self, _destinations: &[NodeId]) {}

    /// Called after this node lost downstream bindings.
    fn on_unbind(&self, _destinations: &[NodeId]) {}

    /// Called after this node was removed from the graph.
    fn on_remove(&self) {}

    /// Downcasting support for variant-specific operations.
    fn as_any(&self) -> &dyn Any;
}

/// Identity and dirty flag shared by every node implementation.
#[derive(Debug)]
pub struct NodeCore {
    id: NodeId,
    dirty: AtomicBool,
}

impl NodeCore {
    /// Create a clean core with a fresh id.
    pub fn new() -> Self {
        Self {
            id: NodeId::new(),
            dirty: AtomicBool::new(false),
        }
    }

    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Check the dirty flag.
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::Acquire)
    }

    /// Set or clear the dirty flag.
    pub fn mark_dirty(&self, dirty: bool) {
        self.dirty.store(dirty, Ordering::Release);
    }
}

impl Default for NodeCore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_ids_are_unique() {
        let id1 = NodeId::new();
        let id2 = NodeId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn node_id_display() {
        assert_eq!(NodeId::from(42).to_string(), "#42");
        assert_eq!(NodeId::from(42).raw(), 42);
    }

    #[test]
    fn core_starts_clean() {
        let core = NodeCore::new();
        assert!(!core.is_dirty());
    }

    #[test]
    fn dirty_flag_transitions() {
        let core = NodeCore::new();

        core.mark_dirty(true);
        assert!(core.is_dirty());

        // Marking twice is harmless
        core.mark_dirty(true);
        assert!(core.is_dirty());

        core.mark_dirty(false);
        assert!(!core.is_dirty());
    }
}
