//! Node Variants
//!
//! This module implements the nodes that live in a [`Graph`](crate::Graph)
//! and the handle used to compose them.
//!
//! # Concepts
//!
//! ## Stores
//!
//! A Store holds whatever state it was last given. Stores are the usual
//! entry points of a change: assign a value, then call `update`.
//!
//! ## Transformers
//!
//! A Transformer computes its state from the states of its inputs. The
//! function may be synchronous, fallible or asynchronous, and a transformer
//! may carry an inverse for two-way bindings.
//!
//! ## Custom nodes
//!
//! Any type implementing [`Behavior`] can be wrapped into a node, with hooks
//! that run when it is bound, unbound or removed.

mod handle;
mod store;
mod transformer;
mod wrapped;

pub use handle::NodeRef;
pub use store::Store;
pub use transformer::{ComputeFn, DeferredFn, TransformFn, Transformer};
pub use wrapped::{Behavior, Wrapped};
