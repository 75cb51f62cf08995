//! Node Registry
//!
//! The graph owns every node and both adjacency relations:
//!
//! - `bindings[a]` holds the nodes that consume `a` (downstream edges)
//! - `inputs[b]` holds the nodes that `b` consumes (upstream edges)
//!
//! The two maps are exact inverses of each other. Every mutation below
//! touches both under one write lock, and node hooks run only after the lock
//! is released so they may call back into the graph.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::{RwLock, RwLockReadGuard};
use tracing::debug;

use super::node::{Node, NodeId, State};
use crate::config::GraphConfig;
use crate::error::{FlowError, FlowResult};

/// Adjacency data guarded by the graph lock.
#[derive(Default)]
pub(crate) struct Registry {
    pub(crate) nodes: HashMap<NodeId, Arc<dyn Node>>,
    pub(crate) bindings: HashMap<NodeId, IndexSet<NodeId>>,
    pub(crate) inputs: HashMap<NodeId, IndexSet<NodeId>>,
}

impl Registry {
    /// Nodes consuming `id`, in bind order.
    pub(crate) fn downstream(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.bindings.get(&id).into_iter().flatten().copied()
    }

    /// Nodes consumed by `id`, in bind order.
    pub(crate) fn upstream(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.inputs.get(&id).into_iter().flatten().copied()
    }

    fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
}

struct GraphInner {
    registry: RwLock<Registry>,
    config: GraphConfig,
}

/// The shared registry of nodes and bindings.
///
/// `Graph` is a cheap handle: clones refer to the same registry. Construct
/// one per dataflow and tear it down with [`Graph::clear`].
#[derive(Clone)]
pub struct Graph {
    inner: Arc<GraphInner>,
}

impl Graph {
    /// Create an empty graph with the default configuration.
    pub fn new() -> Self {
        Self::with_config(GraphConfig::default())
    }

    /// Create an empty graph with the given configuration.
    pub fn with_config(config: GraphConfig) -> Self {
        Self {
            inner: Arc::new(GraphInner {
                registry: RwLock::new(Registry::default()),
                config,
            }),
        }
    }

    /// The configuration this graph was built with.
    pub fn config(&self) -> &GraphConfig {
        &self.inner.config
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.inner.registry.read()
    }

    /// Insert a node with empty binding and input sets.
    ///
    /// Returns `false` without touching the graph if the id is taken.
    pub fn register(&self, node: Arc<dyn Node>) -> bool {
        let id = node.id();
        let mut registry = self.inner.registry.write();
        if registry.contains(id) {
            return false;
        }
        registry.nodes.insert(id, node);
        registry.bindings.insert(id, IndexSet::new());
        registry.inputs.insert(id, IndexSet::new());
        true
    }

    /// Bind `source` to every destination: each destination consumes
    /// `source`'s state.
    ///
    /// All parties are validated before any edge is added, so a failed call
    /// leaves the graph untouched. Rebinding an existing edge is a no-op.
    pub fn bind(&self, source: NodeId, destinations: &[NodeId]) -> FlowResult<()> {
        let node = {
            let mut registry = self.inner.registry.write();
            let Some(node) = registry.nodes.get(&source).cloned() else {
                return Err(FlowError::Unregistered(source));
            };
            if let Some(&missing) = destinations.iter().find(|d| !registry.contains(**d)) {
                return Err(FlowError::Unregistered(missing));
            }

            for &destination in destinations {
                registry
                    .bindings
                    .entry(source)
                    .or_default()
                    .insert(destination);
                registry
                    .inputs
                    .entry(destination)
                    .or_default()
                    .insert(source);
            }
            node
        };

        debug!(%source, count = destinations.len(), "bound");
        node.on_bind(destinations);
        Ok(())
    }

    /// Remove the edges from `source` to each destination.
    ///
    /// Returns `false` without touching the graph if `source` or any
    /// destination is unregistered.
    pub fn unbind(&self, source: NodeId, destinations: &[NodeId]) -> bool {
        let node = {
            let mut registry = self.inner.registry.write();
            let Some(node) = registry.nodes.get(&source).cloned() else {
                return false;
            };
            if destinations.iter().any(|d| !registry.contains(*d)) {
                return false;
            }

            for destination in destinations {
                if let Some(children) = registry.bindings.get_mut(&source) {
                    children.shift_remove(destination);
                }
                if let Some(parents) = registry.inputs.get_mut(destination) {
                    parents.shift_remove(&source);
                }
            }
            node
        };

        debug!(%source, count = destinations.len(), "unbound");
        node.on_unbind(destinations);
        true
    }

    /// Deregister a node and sever every binding touching it.
    ///
    /// Returns `false` if the node was not registered.
    pub fn remove(&self, id: NodeId) -> bool {
        let node = {
            let mut registry = self.inner.registry.write();
            let Some(node) = registry.nodes.remove(&id) else {
                return false;
            };
            for child in registry.bindings.remove(&id).unwrap_or_default() {
                if let Some(parents) = registry.inputs.get_mut(&child) {
                    parents.shift_remove(&id);
                }
            }
            for parent in registry.inputs.remove(&id).unwrap_or_default() {
                if let Some(children) = registry.bindings.get_mut(&parent) {
                    children.shift_remove(&id);
                }
            }
            node
        };

        debug!(%id, "removed");
        node.on_remove();
        true
    }

    /// Remove every node and edge.
    pub fn clear(&self) {
        let nodes: Vec<_> = {
            let mut registry = self.inner.registry.write();
            registry.bindings.clear();
            registry.inputs.clear();
            registry.nodes.drain().map(|(_, node)| node).collect()
        };

        debug!(count = nodes.len(), "cleared graph");
        for node in nodes {
            node.on_remove();
        }
    }

    /// Look up a node by id.
    pub fn node_from_id(&self, id: NodeId) -> Option<Arc<dyn Node>> {
        self.read().nodes.get(&id).cloned()
    }

    /// The current state of a node, if it is registered.
    pub fn get_state(&self, id: NodeId) -> Option<State> {
        self.node_from_id(id).map(|node| node.state())
    }

    /// Whether a node with this id is registered.
    pub fn is_registered(&self, id: NodeId) -> bool {
        self.read().contains(id)
    }

    /// Downstream consumers of `id`, in bind order.
    pub fn bindings(&self, id: NodeId) -> Vec<NodeId> {
        self.read().downstream(id).collect()
    }

    /// Upstream inputs of `id`, in bind order.
    pub fn inputs(&self, id: NodeId) -> Vec<NodeId> {
        self.read().upstream(id).collect()
    }

    /// Get the total number of nodes in the graph.
    pub fn node_count(&self) -> usize {
        self.read().nodes.len()
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("node_count", &self.node_count())
            .field("config", &self.inner.config)
            .finish()
    }
}
