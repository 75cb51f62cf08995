//! Flowgraph Core
//!
//! This crate provides the core engine for the Flowgraph reactive dataflow
//! library. It implements:
//!
//! - A registry of stateful nodes joined by one-way data bindings
//! - Dirty-tracked, incremental propagation of a single change
//! - Store, transformer and custom node variants
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `graph`: node registry, binding protocol and propagation engine
//! - `reactive`: node variants and the `NodeRef` handle
//! - `config`: engine configuration
//! - `error`: error types
//!
//! # Example
//!
//! ```rust,ignore
//! use flowgraph_core::{Graph, State};
//! use serde_json::json;
//!
//! let graph = Graph::new();
//! let a = graph.store(json!(1));
//! let b = graph.store(State::Null);
//!
//! // a -> (x2) -> b
//! a.transform(|v| json!(v[0].as_i64().unwrap_or(0) * 2))?.bind(&b)?;
//!
//! a.set(json!(3))?;
//! a.update_sync();
//! assert_eq!(b.state(), json!(6));
//! ```

pub mod config;
pub mod error;
pub mod graph;
pub mod reactive;

pub use config::{ConsistencyCheck, DeferredPolicy, GraphConfig};
pub use error::{FlowError, FlowResult};
pub use graph::{Graph, Node, NodeCore, NodeId, NodeKind, Pending, State, StateChange};
pub use reactive::{Behavior, NodeRef, Store, TransformFn, Transformer, Wrapped};
