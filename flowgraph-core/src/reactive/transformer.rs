//! Transformer Implementation
//!
//! A Transformer's state is always its function applied to the current
//! states of its inputs, in bind order.
//!
//! # Deferred results
//!
//! A transform may be asynchronous. Its `set_state` then hands back a
//! pending future that writes the state once it resolves; the propagation
//! engine awaits it before anything downstream reads the value.
//!
//! # Inverses
//!
//! A transformer may carry an inverse, itself a registered transformer.
//! It is only used to wire two-way bindings (see
//! [`Graph::synchronize`](crate::Graph::synchronize)). Its correctness is
//! the caller's business.

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use parking_lot::RwLock;

use super::handle::NodeRef;
use crate::error::{FlowError, FlowResult};
use crate::graph::{Graph, Node, NodeCore, NodeId, NodeKind, State, StateChange};

/// A synchronous transform.
pub type ComputeFn = dyn Fn(&[State]) -> FlowResult<State> + Send + Sync;

/// An asynchronous transform.
pub type DeferredFn = dyn Fn(Vec<State>) -> BoxFuture<'static, FlowResult<State>> + Send + Sync;

/// The function a transformer applies to its inputs.
#[derive(Clone)]
pub enum TransformFn {
    /// Completes inside `set_state`.
    Sync(Arc<ComputeFn>),

    /// Completes when the returned future resolves.
    Deferred(Arc<DeferredFn>),
}

impl TransformFn {
    /// Wrap an infallible synchronous function.
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[State]) -> State + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(move |inputs: &[State]| -> FlowResult<State> {
            Ok(f(inputs))
        }))
    }

    /// Wrap a fallible synchronous function.
    pub fn fallible<F>(f: F) -> Self
    where
        F: Fn(&[State]) -> FlowResult<State> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(f))
    }

    /// Wrap an asynchronous function.
    pub fn deferred<F, Fut>(f: F) -> Self
    where
        F: Fn(Vec<State>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FlowResult<State>> + Send + 'static,
    {
        Self::Deferred(Arc::new(move |inputs: Vec<State>| f(inputs).boxed()))
    }
}

impl fmt::Debug for TransformFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync(_) => f.write_str("Sync(..)"),
            Self::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// A node whose state is a pure function of its inputs.
pub struct Transformer {
    core: NodeCore,

    /// The last computed value. Shared with pending deferred results.
    state: Arc<RwLock<State>>,

    /// The transform.
    compute: TransformFn,

    /// Id of the registered inverse transformer, if any.
    inverse: RwLock<Option<NodeId>>,
}

impl Transformer {
    /// Create an unregistered transformer with a `Null` state.
    pub fn new(compute: TransformFn) -> Self {
        Self {
            core: NodeCore::new(),
            state: Arc::new(RwLock::new(State::Null)),
            compute,
            inverse: RwLock::new(None),
        }
    }

    /// The inverse transformer's id.
    pub fn inverse(&self) -> Option<NodeId> {
        *self.inverse.read()
    }

    /// Whether an inverse is attached.
    pub fn invertible(&self) -> bool {
        self.inverse().is_some()
    }

    pub(crate) fn set_inverse(&self, inverse: NodeId) {
        *self.inverse.write() = Some(inverse);
    }
}

impl Node for Transformer {
    fn id(&self) -> NodeId {
        self.core.id()
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Transformer
    }

    fn state(&self) -> State {
        self.state.read().clone()
    }

    fn set_state(&self, inputs: Vec<State>) -> FlowResult<StateChange> {
        match &self.compute {
            TransformFn::Sync(f) => {
                let value = f(&inputs)?;
                *self.state.write() = value;
                Ok(StateChange::Ready)
            }
            TransformFn::Deferred(f) => {
                let result = f(inputs);
                let state = Arc::clone(&self.state);
                Ok(StateChange::Deferred(
                    async move {
                        let value = result.await?;
                        *state.write() = value;
                        Ok::<_, FlowError>(())
                    }
                    .boxed(),
                ))
            }
        }
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

impl fmt::Debug for Transformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Transformer")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("compute", &self.compute)
            .field("inverse", &self.inverse())
            .finish()
    }
}

impl Graph {
    /// Create and register a transformer from any [`TransformFn`].
    pub fn transformer_from(&self, compute: TransformFn) -> NodeRef {
        self.adopt(Arc::new(Transformer::new(compute)))
    }

    /// Create and register a synchronous transformer.
    pub fn transformer<F>(&self, f: F) -> NodeRef
    where
        F: Fn(&[State]) -> State + Send + Sync + 'static,
    {
        self.transformer_from(TransformFn::new(f))
    }

    /// Create and register a transformer whose function may fail.
    pub fn try_transformer<F>(&self, f: F) -> NodeRef
    where
        F: Fn(&[State]) -> FlowResult<State> + Send + Sync + 'static,
    {
        self.transformer_from(TransformFn::fallible(f))
    }

    /// Create and register an asynchronous transformer.
    pub fn async_transformer<F, Fut>(&self, f: F) -> NodeRef
    where
        F: Fn(Vec<State>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = FlowResult<State>> + Send + 'static,
    {
        self.transformer_from(TransformFn::deferred(f))
    }

    /// Create and register a transformer together with its inverse.
    pub fn invertible_transformer<F, G>(&self, f: F, inverse: G) -> NodeRef
    where
        F: Fn(&[State]) -> State + Send + Sync + 'static,
        G: Fn(&[State]) -> State + Send + Sync + 'static,
    {
        let inverse = self.transformer(inverse);
        let node = Transformer::new(TransformFn::new(f));
        node.set_inverse(inverse.id());
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

    fn double(inputs: &[State]) -> State {
        json!(inputs[0].as_i64().unwrap_or_default() * 2)
    }

    #[test]
    fn transformer_applies_function() {
        let node = Transformer::new(TransformFn::new(double));
        assert_eq!(node.state(), State::Null);

        node.set_state(vec![json!(21)]).unwrap();
        assert_eq!(node.state(), json!(42));
    }

    #[test]
    fn transformer_sees_all_inputs_in_order() {
        let node = Transformer::new(TransformFn::new(|inputs| {
            json!(inputs.iter().map(|v| v.as_str().unwrap_or("?")).collect::<String>())
        }));
        node.set_state(vec![json!("a"), json!("b"), json!("c")]).unwrap();
        assert_eq!(node.state(), json!("abc"));
    }

    #[test]
    fn failing_transform_keeps_previous_state() {
        let node = Transformer::new(TransformFn::fallible(|inputs| match inputs[0].as_f64() {
            Some(v) if v != 0.0 => Ok(json!(1.0 / v)),
            _ => Err(FlowError::compute("division by zero")),
        }));

        node.set_state(vec![json!(4.0)]).unwrap();
        assert_eq!(node.state(), json!(0.25));

        assert!(node.set_state(vec![json!(0.0)]).is_err());
        assert_eq!(node.state(), json!(0.25));
    }

    #[tokio::test]
    async fn deferred_transform_applies_when_awaited() {
        let node = Transformer::new(TransformFn::deferred(|inputs: Vec<State>| async move {
            Ok::<_, FlowError>(json!(inputs.len()))
        }));

        let StateChange::Deferred(pending) = node.set_state(vec![json!(1), json!(2)]).unwrap()
        else {
            panic!("expected a deferred state change");
        };
        assert_eq!(node.state(), State::Null);

        pending.await.unwrap();
        assert_eq!(node.state(), json!(2));
    }

    #[test]
    fn invertible_transformer_registers_inverse() {
        let graph = Graph::new();
        let node = graph.invertible_transformer(double, |inputs| inputs[0].clone());

        let inverse = node.inverse().expect("inverse attached");
        assert!(inverse.is_registered());
        assert_eq!(inverse.kind(), NodeKind::Transformer);
        assert!(node.as_transformer().is_some_and(Transformer::invertible));
        assert_eq!(graph.node_count(), 2);
    }
}
