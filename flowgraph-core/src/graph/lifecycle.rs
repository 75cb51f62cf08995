//! Two-way bindings built from ordinary one-way ones.

use super::node::NodeId;
use super::registry::Graph;
use crate::error::{FlowError, FlowResult};
use crate::reactive::NodeRef;

impl Graph {
    /// Keep `a` and `b` in step with each other.
    ///
    /// Without `via`, `a` and `b` are bound to each other directly. With
    /// `via`, `a` feeds `b` through the transformer and `b` feeds `a`
    /// through its inverse.
    pub fn synchronize(&self, a: &NodeRef, b: &NodeRef, via: Option<&NodeRef>) -> FlowResult<()> {
        let Some(via) = via else {
            self.bind(a.id(), &[b.id()])?;
            self.bind(b.id(), &[a.id()])?;
            return Ok(());
        };

        let inverse = via.inverse().ok_or(FlowError::NotInvertible(via.id()))?;
        a.bind(via)?.bind(b)?;
        b.bind(&inverse)?.bind(a)?;
        Ok(())
    }

    /// Remove every binding between any two of `nodes`, in either
    /// direction. Unregistered ids are skipped.
    pub fn desynchronize(&self, nodes: &[NodeId]) {
        for &source in nodes {
            let targets: Vec<_> = self
                .bindings(source)
                .into_iter()
                .filter(|target| nodes.contains(target))
                .collect();
            if !targets.is_empty() {
                self.unbind(source, &targets);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::graph::State;

    fn half(v: &[State]) -> State {
        json!(v[0].as_f64().unwrap_or_default() / 2.0)
    }

    fn double(v: &[State]) -> State {
        json!(v[0].as_f64().unwrap_or_default() * 2.0)
    }

    #[test]
    fn direct_synchronize_binds_both_ways() {
        let graph = Graph::new();
        let a = graph.store(json!(1));
        let b = graph.store(json!(1));

        graph.synchronize(&a, &b, None).unwrap();

        assert_eq!(graph.bindings(a.id()), vec![b.id()]);
        assert_eq!(graph.bindings(b.id()), vec![a.id()]);
    }

    #[test]
    fn synchronize_through_inverse() {
        let graph = Graph::new();
        let a = graph.store(json!(1.0));
        let b = graph.store(json!(2.0));
        let xf = graph.invertible_transformer(double, half);

        graph.synchronize(&a, &b, Some(&xf)).unwrap();

        b.set(json!(8.0)).unwrap();
        b.update_sync();
        assert_eq!(a.state().as_f64(), Some(4.0));

        a.set(json!(5.0)).unwrap();
        a.update_sync();
        assert_eq!(b.state().as_f64(), Some(10.0));
    }

    #[test]
    fn synchronize_requires_inverse() {
        let graph = Graph::new();
        let a = graph.store(json!(1));
        let b = graph.store(json!(1));
        let xf = graph.transformer(double);

        let err = graph.synchronize(&a, &b, Some(&xf)).unwrap_err();
        assert!(matches!(err, FlowError::NotInvertible(id) if id == xf.id()));
        assert!(graph.bindings(a.id()).is_empty());
    }

    #[test]
    fn desynchronize_removes_internal_edges_only() {
        let graph = Graph::new();
        let a = graph.store(json!(1));
        let b = graph.store(json!(1));
        let outside = graph.store(State::Null);
        graph.synchronize(&a, &b, None).unwrap();
        a.bind(&outside).unwrap();

        graph.desynchronize(&[a.id(), b.id()]);

        assert_eq!(graph.bindings(a.id()), vec![outside.id()]);
        assert!(graph.bindings(b.id()).is_empty());
        assert_eq!(graph.inputs(a.id()), Vec::<NodeId>::new());
    }
}
