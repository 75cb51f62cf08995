//! Dependency Graph
//!
//! This module implements the registry that tracks relationships between
//! nodes, and the engine that propagates state changes along them.
//!
//! # Overview
//!
//! The graph is a directed graph where:
//!
//! - Nodes hold state (stores) or compute it from their inputs (transformers)
//! - Edges are one-way bindings: if B consumes A, there is an edge from A to B
//!
//! When a node changes, we traverse the graph to find all affected nodes
//! and mark them as dirty, then recompute them from the sinks upward.
//!
//! # Design Decisions
//!
//! 1. We use a centralized graph rather than per-node subscriber lists:
//!    - Nodes stay ignorant of each other and only carry id, state and a flag
//!    - Binding and unbinding update both directions under one lock
//!
//! 2. The graph is indexed by node ID for O(1) lookups.
//!
//! 3. We maintain both downstream (bindings) and upstream (inputs) edges:
//!    the push phase walks the first, the pull phase walks the second.
//!
//! 4. Cycles are legal. Traversal terminates on them but no fixed point is
//!    computed.

mod lifecycle;
mod node;
mod registry;
mod scheduler;

pub use node::{Node, NodeCore, NodeId, NodeKind, Pending, State, StateChange};
pub use registry::Graph;
pub use scheduler::Terminals;
