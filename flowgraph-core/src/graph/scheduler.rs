//! Update Scheduler
//!
//! Propagates one node's change to everything downstream of it.
//!
//! # Algorithm
//!
//! A pass runs in three steps:
//!
//! 1. Discover: depth-first search over the downstream bindings of the
//!    changed node. Every newly reached node is marked dirty. Nodes with
//!    nothing left to visit below them are terminal candidates.
//! 2. Plan: depth-first search upward from each terminal over dirty inputs.
//!    Each reached node gets one step listing the dirty inputs it waits
//!    for. An input already on the current search path is read as is, which
//!    is what stops the pull from looping around a cycle.
//! 3. Recompute: each step waits for its planned inputs, then calls
//!    `set_state` with the current state of every input in bind order.
//!
//! Steps are recorded in finishing order and only ever wait on earlier
//! steps, so the waits cannot deadlock. In the async engine every step is a
//! single shared future: consumers of the same input all await the same
//! recompute, and siblings run concurrently. Cycles terminate but are not
//! solved to a fixed point.
//!
//! Concurrent calls to [`Graph::update`] over overlapping subgraphs
//! interleave their dirty flags and are not supported. Callers serialize
//! their updates.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures_util::future::{join_all, BoxFuture, Shared};
use futures_util::FutureExt;
use indexmap::IndexSet;
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

use super::node::{Node, NodeId, Pending, State, StateChange};
use super::registry::{Graph, Registry};
use crate::config::DeferredPolicy;
use crate::error::{FlowError, FlowResult};

/// Terminals of a single pass.
pub type Terminals = SmallVec<[NodeId; 4]>;

/// Result of one step, shared with every step waiting on it.
type Outcome = Result<(), Arc<FlowError>>;

/// A step's recompute, awaitable by any number of consumers.
type Settled = Shared<BoxFuture<'static, Outcome>>;

/// One node's recompute within a pass.
struct Step {
    id: NodeId,
    node: Arc<dyn Node>,

    /// All inputs, in bind order.
    inputs: Vec<NodeId>,

    /// Slots of the earlier steps this one waits for.
    awaits: SmallVec<[usize; 4]>,
}

/// Recompute order for one pass.
#[derive(Default)]
struct Plan {
    /// Steps in finishing order.
    steps: Vec<Step>,
    slots: HashMap<NodeId, usize>,

    /// Each terminal with its step slot.
    roots: SmallVec<[(NodeId, usize); 4]>,
}

impl Plan {
    fn build(registry: &Registry, terminals: &[NodeId]) -> Self {
        let mut plan = Self::default();
        let mut path = HashSet::new();
        for &terminal in terminals {
            if let Some(slot) = plan.visit(registry, terminal, &mut path) {
                plan.roots.push((terminal, slot));
            }
        }
        plan
    }

    fn visit(
        &mut self,
        registry: &Registry,
        id: NodeId,
        path: &mut HashSet<NodeId>,
    ) -> Option<usize> {
        if let Some(&slot) = self.slots.get(&id) {
            return Some(slot);
        }
        let node = registry.nodes.get(&id)?.clone();

        path.insert(id);
        let inputs: Vec<_> = registry.upstream(id).collect();
        let mut awaits = SmallVec::new();
        for &input in &inputs {
            let dirty = registry.nodes.get(&input).is_some_and(|n| n.is_dirty());
            if !dirty || path.contains(&input) {
                continue;
            }
            if let Some(slot) = self.visit(registry, input, path) {
                awaits.push(slot);
            }
        }
        path.remove(&id);

        let slot = self.steps.len();
        self.steps.push(Step {
            id,
            node,
            inputs,
            awaits,
        });
        self.slots.insert(id, slot);
        Some(slot)
    }
}

impl Graph {
    /// Mark everything downstream of `origin` dirty and return the terminal
    /// nodes that recomputation should start from.
    ///
    /// `origin` itself is never marked. It is returned as a terminal only
    /// when nothing downstream of it is left to visit.
    pub fn terminals_from(&self, origin: NodeId) -> Terminals {
        let registry = self.read();
        if !registry.nodes.contains_key(&origin) {
            return Terminals::new();
        }

        let mut visited = HashSet::from([origin]);
        let mut marked = IndexSet::new();
        let mut candidates = Vec::new();
        let mut stack = vec![origin];

        while let Some(current) = stack.pop() {
            let mut terminal = true;
            for child in registry.downstream(current) {
                if visited.insert(child) {
                    terminal = false;
                    if let Some(node) = registry.nodes.get(&child) {
                        node.mark_dirty(true);
                    }
                    marked.insert(child);
                    stack.push(child);
                }
            }
            if terminal {
                candidates.push(current);
            }
        }

        // A candidate feeding a marked node is pulled by that node instead.
        let (mut terminals, pruned): (Terminals, Terminals) = candidates
            .into_iter()
            .partition(|&id| !registry.downstream(id).any(|c| marked.contains(&c)));

        // Inside a dirty cycle nothing may pull a pruned candidate; restore
        // those so every marked node still gets recomputed.
        let mut covered = HashSet::new();
        for &terminal in &terminals {
            cover(&registry, terminal, &marked, &mut covered);
        }
        for candidate in pruned {
            if !covered.contains(&candidate) {
                cover(&registry, candidate, &marked, &mut covered);
                terminals.push(candidate);
            }
        }

        debug!(%origin, marked = marked.len(), terminals = terminals.len(), "discovered terminals");
        terminals
    }

    /// Propagate a change of `origin` through the graph.
    ///
    /// Terminals recompute concurrently. Failures are logged and never
    /// returned; independent subgraphs still settle.
    pub async fn update(&self, origin: NodeId) {
        let plan = self.plan(origin);

        let mut settled: Vec<Settled> = Vec::with_capacity(plan.steps.len());
        for step in plan.steps {
            let upstream = step.awaits.iter().map(|&slot| settled[slot].clone()).collect();
            settled.push(recompute(self.clone(), step, upstream).boxed().shared());
        }

        let passes = plan.roots.iter().map(|&(_, slot)| settled[slot].clone());
        let results = join_all(passes).await;

        for (&(terminal, _), result) in plan.roots.iter().zip(results) {
            if let Err(error) = result {
                warn!(%origin, %terminal, %error, "update failed");
            }
        }
    }

    /// Propagate a change of `origin` without awaiting anything.
    ///
    /// Every `set_state` along the way must finish immediately. A deferred
    /// state change gets one poll; if it is still pending it is handled per
    /// [`GraphConfig::deferred_in_sync`](crate::GraphConfig) and its result
    /// is not visible when this returns.
    pub fn update_sync(&self, origin: NodeId) {
        let plan = self.plan(origin);

        let mut outcomes: Vec<Outcome> = Vec::with_capacity(plan.steps.len());
        for step in &plan.steps {
            step.node.mark_dirty(false);
            let failed = step
                .awaits
                .iter()
                .find_map(|&slot| outcomes[slot].clone().err());
            let outcome = match failed {
                Some(error) => Err(error),
                None => self.recompute_sync(step).map_err(Arc::new),
            };
            outcomes.push(outcome);
        }

        for &(terminal, slot) in &plan.roots {
            if let Err(error) = &outcomes[slot] {
                warn!(%origin, %terminal, %error, "update failed");
            }
        }
    }

    fn plan(&self, origin: NodeId) -> Plan {
        let terminals = self.terminals_from(origin);
        let plan = Plan::build(&self.read(), &terminals);
        trace!(%origin, steps = plan.steps.len(), "planned recompute");
        plan
    }

    fn recompute_sync(&self, step: &Step) -> FlowResult<()> {
        trace!(id = %step.id, inputs = step.inputs.len(), "recompute (sync)");
        match step.node.set_state(self.input_states(&step.inputs))? {
            StateChange::Ready => Ok(()),
            StateChange::Deferred(pending) => self.settle_deferred(step.id, pending),
        }
    }

    fn settle_deferred(&self, id: NodeId, mut pending: Pending) -> FlowResult<()> {
        if let Some(result) = (&mut pending).now_or_never() {
            return result;
        }

        let handle = match self.config().deferred_in_sync {
            DeferredPolicy::Spawn => tokio::runtime::Handle::try_current().ok(),
            DeferredPolicy::Drop => None,
        };
        match handle {
            Some(handle) => {
                debug!(%id, "deferred state spawned");
                handle.spawn(async move {
                    if let Err(error) = pending.await {
                        warn!(%id, %error, "deferred state failed");
                    }
                });
            }
            None => warn!(%id, "deferred state dropped by synchronous update"),
        }
        Ok(())
    }

    fn input_states(&self, inputs: &[NodeId]) -> Vec<State> {
        inputs
            .iter()
            .map(|&input| self.get_state(input).unwrap_or(State::Null))
            .collect()
    }
}

/// Wait for the step's planned inputs, then recompute it.
async fn recompute(graph: Graph, step: Step, upstream: Vec<Settled>) -> Outcome {
    step.node.mark_dirty(false);

    // Siblings all run to completion before the first error is taken.
    for outcome in join_all(upstream).await {
        outcome?;
    }

    trace!(id = %step.id, inputs = step.inputs.len(), "recompute");
    match step.node.set_state(graph.input_states(&step.inputs))? {
        StateChange::Ready => Ok(()),
        StateChange::Deferred(pending) => Ok(pending.await?),
    }
}

/// Walk upstream from `id` through marked nodes, collecting what a pull
/// starting at `id` would recompute.
fn cover(
    registry: &Registry,
    id: NodeId,
    marked: &IndexSet<NodeId>,
    covered: &mut HashSet<NodeId>,
) {
    let mut stack = vec![id];
    while let Some(current) = stack.pop() {
        if !covered.insert(current) {
            continue;
        }
        stack.extend(registry.upstream(current).filter(|input| marked.contains(input)));
    }
}
