//! Node Handles
//!
//! [`NodeRef`] pairs a node with the graph it lives in, so bindings and
//! updates can be chained straight off a node:
//!
//! ```rust,ignore
//! let graph = Graph::new();
//! let a = graph.store(json!(1));
//! let b = graph.store(State::Null);
//!
//! a.transform(|v| json!(v[0].as_i64().unwrap_or(0) * 2))?.bind(&b)?;
//! a.update().await;
//! assert_eq!(b.state(), json!(2));
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::transformer::{TransformFn, Transformer};
use crate::error::{FlowError, FlowResult};
use crate::graph::{Graph, Node, NodeId, NodeKind, State, StateChange};

/// A handle to a registered node.
///
/// Cloning is cheap; clones refer to the same node.
#[derive(Clone)]
pub struct NodeRef {
    node: Arc<dyn Node>,
    graph: Graph,
}

impl NodeRef {
    /// Get the node's ID.
    pub fn id(&self) -> NodeId {
        self.node.id()
    }

    /// Get the node's kind.
    pub fn kind(&self) -> NodeKind {
        self.node.kind()
    }

    /// The current state.
    pub fn state(&self) -> State {
        self.node.state()
    }

    /// Whether the node is waiting for a recompute in the current pass.
    pub fn is_dirty(&self) -> bool {
        self.node.is_dirty()
    }

    /// Whether the node is still in its graph.
    pub fn is_registered(&self) -> bool {
        self.graph.is_registered(self.id())
    }

    /// The graph this node belongs to.
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// The underlying node.
    pub fn node(&self) -> &Arc<dyn Node> {
        &self.node
    }

    /// Downcast to a transformer.
    pub fn as_transformer(&self) -> Option<&Transformer> {
        self.node.as_any().downcast_ref()
    }

    /// Hand the node a single value, as if it had one input.
    ///
    /// Does not propagate; call [`update`](Self::update) afterwards.
    pub fn set(&self, value: impl Into<State>) -> FlowResult<StateChange> {
        self.node.set_state(vec![value.into()])
    }

    /// Hand the node an ordered list of input values.
    pub fn set_state(&self, inputs: Vec<State>) -> FlowResult<StateChange> {
        self.node.set_state(inputs)
    }

    /// Bind this node into `destination` and return the destination.
    pub fn bind(&self, destination: &NodeRef) -> FlowResult<NodeRef> {
        self.graph.bind(self.id(), &[destination.id()])?;
        Ok(destination.clone())
    }

    /// Bind this node into every destination and return the last one
    /// (or this node when `destinations` is empty).
    pub fn bind_all(&self, destinations: &[NodeRef]) -> FlowResult<NodeRef> {
        let ids: Vec<_> = destinations.iter().map(NodeRef::id).collect();
        self.graph.bind(self.id(), &ids)?;
        Ok(destinations.last().unwrap_or(self).clone())
    }

    /// Create a store holding `value`, bind into it and return it.
    pub fn bind_value(&self, value: impl Into<State>) -> FlowResult<NodeRef> {
        self.ensure_registered()?;
        let store = self.graph.store(value);
        self.bind(&store)
    }

    /// Bind every input into this node.
    ///
    /// All inputs are validated first; on error nothing is bound.
    pub fn bind_inputs(&self, inputs: &[NodeRef]) -> FlowResult<&Self> {
        self.ensure_registered()?;
        if let Some(missing) = inputs.iter().find(|input| !input.is_registered()) {
            return Err(FlowError::Unregistered(missing.id()));
        }
        for input in inputs {
            self.graph.bind(input.id(), &[self.id()])?;
        }
        Ok(self)
    }

    /// Remove the binding into `destination`.
    pub fn unbind(&self, destination: &NodeRef) -> bool {
        self.graph.unbind(self.id(), &[destination.id()])
    }

    /// Remove the bindings into every destination.
    pub fn unbind_all(&self, destinations: &[NodeRef]) -> bool {
        let ids: Vec<_> = destinations.iter().map(NodeRef::id).collect();
        self.graph.unbind(self.id(), &ids)
    }

    /// Create a transformer fed by this node and return it.
    pub fn transform<F>(&self, f: F) -> FlowResult<NodeRef>
    where
        F: Fn(&[State]) -> State + Send + Sync + 'static,
    {
        self.attach(TransformFn::new(f))
    }

    /// Like [`transform`](Self::transform) with a fallible function.
    pub fn try_transform<F>(&self, f: F) -> FlowResult<NodeRef>
    where
        F: Fn(&[State]) -> FlowResult<State> + Send + Sync + 'static,
    {
        self.attach(TransformFn::fallible(f))
    }

    /// Like [`transform`](Self::transform) with an asynchronous function.
    pub fn transform_async<F, Fut>(&self, f: F) -> FlowResult<NodeRef>
    where
        F: Fn(Vec<State>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FlowResult<State>> + Send + 'static,
    {
        self.attach(TransformFn::deferred(f))
    }

    /// The inverse of a transformer, if one is attached.
    pub fn inverse(&self) -> Option<NodeRef> {
        let inverse = self.as_transformer()?.inverse()?;
        self.graph.handle(inverse)
    }

    /// Attach a freshly registered inverse to this transformer and return it.
    pub fn set_inverse<F>(&self, f: F) -> FlowResult<NodeRef>
    where
        F: Fn(&[State]) -> State + Send + Sync + 'static,
    {
        let Some(transformer) = self.as_transformer() else {
            return Err(FlowError::NotTransformer(self.id()));
        };
        let inverse = self.graph.transformer(f);
        transformer.set_inverse(inverse.id());
        Ok(inverse)
    }

    /// Propagate this node's state downstream.
    ///
    /// Never fails; errors along the way are logged. Do not start another
    /// update over an overlapping subgraph until this one settles.
    pub async fn update(&self) {
        self.graph.update(self.id()).await;
    }

    /// Propagate this node's state downstream without awaiting.
    pub fn update_sync(&self) {
        self.graph.update_sync(self.id());
    }

    /// Remove the node and every binding touching it.
    pub fn remove(&self) -> bool {
        self.graph.remove(self.id())
    }

    fn attach(&self, compute: TransformFn) -> FlowResult<NodeRef> {
        self.ensure_registered()?;
        let transformer = self.graph.transformer_from(compute);
        self.bind(&transformer)
    }

    fn ensure_registered(&self) -> FlowResult<()> {
        if self.is_registered() {
            Ok(())
        } else {
            Err(FlowError::Unregistered(self.id()))
        }
    }
}

impl PartialEq for NodeRef {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for NodeRef {}

impl fmt::Debug for NodeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeRef")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("state", &self.state())
            .field("dirty", &self.is_dirty())
            .finish()
    }
}

impl Graph {
    /// Register a node and return a handle to it.
    ///
    /// Fresh nodes always carry an unused id, so registration cannot fail.
    pub(crate) fn adopt(&self, node: Arc<dyn Node>) -> NodeRef {
        self.register(Arc::clone(&node));
        NodeRef {
            node,
            graph: self.clone(),
        }
    }

    /// A handle to a registered node.
    pub fn handle(&self, id: NodeId) -> Option<NodeRef> {
        self.node_from_id(id).map(|node| NodeRef {
            node,
            graph: self.clone(),
        })
    }
}
