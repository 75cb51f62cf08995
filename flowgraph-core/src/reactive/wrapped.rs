//! Custom Nodes
//!
//! Any type can join the graph by implementing [`Behavior`] and being
//! handed to [`Graph::wrap`]. The wrapper supplies identity and the dirty
//! flag; the behavior supplies state and, optionally, lifecycle hooks that
//! run around bind, unbind and removal.
//!
//! ```rust,ignore
//! struct Counter { hits: u64 }
//!
//! impl Behavior for Counter {
//!     fn state(&self) -> State { json!(self.hits) }
//!     fn set_state(&mut self, _inputs: Vec<State>) -> FlowResult<()> {
//!         self.hits += 1;
//!         Ok(())
//!     }
//! }
//!
//! let counter = graph.wrap(Counter { hits: 0 });
//! ```

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;

use super::handle::NodeRef;
use crate::error::FlowResult;
use crate::graph::{Graph, Node, NodeCore, NodeId, NodeKind, State, StateChange};

/// State and lifecycle of a user-defined node.
pub trait Behavior: Send + 'static {
    /// The node's current state.
    fn state(&self) -> State;

    /// Accept the ordered states of the node's inputs.
    fn set_state(&mut self, inputs: Vec<State>) -> FlowResult<()>;

    /// Called after downstream bindings were added.
    fn on_bind(&mut self, _destinations: &[NodeId]) {}

    /// Called after downstream bindings were removed.
    fn on_unbind(&mut self, _destinations: &[NodeId]) {}

    /// Called after the node left the graph.
    fn on_remove(&mut self) {}
}

/// A [`Behavior`] registered as a graph node.
pub struct Wrapped<B> {
    core: NodeCore,
    behavior: Mutex<B>,
}

impl<B: Behavior> Wrapped<B> {
    /// Wrap a behavior without registering it.
    pub fn new(behavior: B) -> Self {
        Self {
            core: NodeCore::new(),
            behavior: Mutex::new(behavior),
        }
    }

    /// Run `f` with exclusive access to the behavior.
    pub fn with<R>(&self, f: impl FnOnce(&mut B) -> R) -> R {
        f(&mut self.behavior.lock())
    }
}

impl<B: Behavior> Node for Wrapped<B> {
    fn id(&self) -> NodeId {
        self.core.id()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Custom
    }

    fn state(&self) -> State {
        self.behavior.lock().state()
    }

    fn set_state(&self, inputs: Vec<State>) -> FlowResult<StateChange> {
        self.behavior.lock().set_state(inputs)?;
        Ok(StateChange::Ready)
    }

    fn is_dirty(&self) -> bool {
        self.core.is_dirty()
    }

    fn mark_dirty(&self, dirty: bool) {
        self.core.mark_dirty(dirty);
    }

    fn on_bind(&self, destinations: &[NodeId]) {
        self.behavior.lock().on_bind(destinations);
    }

    fn on_unbind(&self, destinations: &[NodeId]) {
        self.behavior.lock().on_unbind(destinations);
    }

    fn on_remove(&self) {
        self.behavior.lock().on_remove();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl<B> fmt::Debug for Wrapped<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wrapped")
            .field("id", &self.core.id())
            .field("dirty", &self.core.is_dirty())
            .finish_non_exhaustive()
    }
}

impl Graph {
    /// Register a custom node.
    pub fn wrap<B: Behavior>(&self, behavior: B) -> NodeRef {
        self.adopt(Arc::new(Wrapped::new(behavior)))
    }
}
