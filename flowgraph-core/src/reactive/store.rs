//! Store Implementation
//!
//! A Store is the plain state holder of the graph. Assigning it replaces
//! the value outright. When it is fed by several inputs in one recompute,
//! all inputs are expected to agree; the first one wins either way.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::warn;

use super::handle::NodeRef;
use crate::config::ConsistencyCheck;
use crate::error::FlowResult;
use crate::graph::{Graph, Node, NodeCore, NodeId, NodeKind, State, StateChange};

/// A node that holds the last state it was given.
pub struct Store {
    core: NodeCore,

    /// The current value.
    state: RwLock<State>,

    /// Whether disagreeing inputs are reported.
    consistency: ConsistencyCheck,
}

impl Store {
    /// Create an unregistered store holding `state`.
    pub fn new(state: State, consistency: ConsistencyCheck) -> Self {
        Self {
            core: NodeCore::new(),
            state: RwLock::new(state),
            consistency,
        }
    }
}

impl Node for Store {
    fn id(&self) -> NodeId {
        self.core.id()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Store
    }

    fn state(&self) -> State {
        self.state.read().clone()
    }

    /// Keep the first input. An empty input list leaves the state alone.
    fn set_state(&self, inputs: Vec<State>) -> FlowResult<StateChange> {
        let mut inputs = inputs.into_iter();
        let Some(first) = inputs.next() else {
            return Ok(StateChange::Ready);
        };

        if self.consistency == ConsistencyCheck::Warn && inputs.any(|value| value != first) {
            warn!(
                node = %self.id(),
                "inconsistent state detected, make sure transforms are correct"
            );
        }

        *self.state.write() = first;
        Ok(StateChange::Ready)
    }

    fn is_dirty(&self) -> bool {
        self.core.is_dirty()
    }

    fn mark_dirty(&self, dirty: bool) {
        self.core.mark_dirty(dirty);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl Graph {
    /// Create and register a store holding `state`.
    pub fn store(&self, state: impl Into<State>) -> NodeRef {
        let node = Store::new(state.into(), self.config().consistency);
        self.adopt(Arc::new(node))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn store_get_and_set() {
        let store = Store::new(json!(0), ConsistencyCheck::Warn);
        assert_eq!(store.state(), json!(0));

        store.set_state(vec![json!(42)]).unwrap();
        assert_eq!(store.state(), json!(42));
    }

    #[test]
    fn store_holds_composite_values() {
        let store = Store::new(State::Null, ConsistencyCheck::Warn);
        store
            .set_state(vec![json!({ "field": "I am a state.", "tags": [1, 2] })])
            .unwrap();
        assert_eq!(store.state()["field"], json!("I am a state."));
    }

    #[test]
    fn first_input_wins() {
        let store = Store::new(State::Null, ConsistencyCheck::Silent);
        store.set_state(vec![json!(1), json!(2)]).unwrap();
        assert_eq!(store.state(), json!(1));

        // Agreement after a disagreement in the middle still keeps the first
        store.set_state(vec![json!(3), json!(4), json!(3)]).unwrap();
        assert_eq!(store.state(), json!(3));
    }

    #[test]
    fn empty_inputs_keep_state() {
        let store = Store::new(json!("kept"), ConsistencyCheck::Warn);
        store.set_state(Vec::new()).unwrap();
        assert_eq!(store.state(), json!("kept"));
    }

    #[test]
    fn graph_store_is_registered() {
        let graph = Graph::new();
        let node = graph.store(json!(5));

        assert!(node.is_registered());
        assert_eq!(node.kind(), NodeKind::Store);
        assert_eq!(graph.get_state(node.id()), Some(json!(5)));
    }
}
