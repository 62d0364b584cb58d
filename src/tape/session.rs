//! Tape construction sessions.
//!
//! A [`GradSession`] is opened against a traced forward graph, fed one
//! `record` call per evaluated operation, and closed with `finish`, which
//! runs stop-gradient propagation, a single reverse backpropagation sweep
//! over the adjoint table, and the final assembly of the gradient graph.
//!
//! The session is single-threaded and synchronous: it exclusively owns
//! its adjoint table and tape, and borrows the registry and identity
//! caches mutably for its lifetime.

use std::mem;
use std::sync::Arc;

use log::{debug, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{
    cache::GradCaches,
    error::{AutodiffError, Result},
    graph::{Graph, GraphOp, NodeId, Value},
    registry::BpropRegistry,
    tape::adjoint::{Adjoint, AdjointKind, AdjointTable},
    tape::reconstruct,
};

/// An in-progress reverse-mode differentiation of one traced graph.
#[derive(Debug)]
pub struct GradSession<'a> {
    pub(crate) forward: &'a Graph,
    registry: &'a mut BpropRegistry,
    caches: &'a mut GradCaches,
    /// The gradient graph under construction.
    tape: Graph,
    pub(crate) adjoints: AdjointTable,
    inputs: Vec<NodeId>,
    /// Traced nodes excluded from gradient flow. Insert-only.
    pub(crate) stopped: FxHashSet<NodeId>,
    need_propagate_stop_gradient: bool,
    /// Current terminal of the trace; the most recently recorded node
    /// unless overridden by `set_terminal`.
    last_node: Option<NodeId>,
    backward_calls: usize,
    finished: bool,
}

impl<'a> GradSession<'a> {
    /// Opens a session. Every entry of `inputs` must be a parameter node
    /// of the forward graph; the tape receives one parameter per input up
    /// front, in order.
    pub fn begin(
        forward: &'a Graph,
        inputs: &[NodeId],
        registry: &'a mut BpropRegistry,
        caches: &'a mut GradCaches,
    ) -> Result<Self> {
        let mut tape = Graph::new();
        for input in inputs {
            let data = forward.node(*input);
            if !data.op.is_param() {
                return Err(AutodiffError::NotAParameter(*input));
            }
            tape.param(data.sig.clone());
        }
        Ok(GradSession {
            forward,
            registry,
            caches,
            tape,
            adjoints: AdjointTable::new(),
            inputs: inputs.to_vec(),
            stopped: FxHashSet::default(),
            need_propagate_stop_gradient: false,
            last_node: None,
            backward_calls: 0,
            finished: false,
        })
    }

    /// Reports one evaluated operation: the traced node, the concrete
    /// values of its operands, and its concrete result. The backward
    /// subgraph is resolved from the registry; a missing definition is
    /// replaced with an inert placeholder.
    pub fn record(&mut self, node: NodeId, op_args: Vec<Value>, out: Value) -> Result<()> {
        self.ensure_active()?;
        let data = self.forward.node(node);
        let arity = data.src.len();
        match &data.op {
            GraphOp::Prim(p) => {
                let p = *p;
                if p.is_barrier() {
                    debug!("barrier operation recorded at node {node:?}");
                    self.need_propagate_stop_gradient = true;
                }
                let bprop = match self.registry.resolve(p, arity) {
                    Some(b) => b,
                    None => {
                        debug!("no bprop defined for {}, substituting placeholder", p.name());
                        self.registry.undefined_backward(arity)
                    }
                };
                self.build_adjoint(node, op_args, out, AdjointKind::Op { bprop })
            }
            GraphOp::MakeTuple => {
                let bprop = self.registry.sequence_backward(arity);
                self.build_adjoint(node, op_args, out, AdjointKind::Structural { bprop })
            }
            GraphOp::TupleGetItem(index) => {
                let index = *index;
                let container_sig = op_args
                    .first()
                    .map(Value::signature)
                    .ok_or(AutodiffError::OperandCountMismatch {
                        node,
                        given: 0,
                        expected: arity,
                    })?;
                let bprop = self.registry.extract_backward(index, &container_sig)?;
                self.build_adjoint(node, op_args, out, AdjointKind::Structural { bprop })
            }
            _ => Err(AutodiffError::ExpectedOperation(node)),
        }
    }

    /// Reports an operation together with a user-supplied backward
    /// subgraph, bypassing the registry. The subgraph must declare one
    /// gradient slot per operand.
    pub fn record_with_backward(
        &mut self,
        node: NodeId,
        op_args: Vec<Value>,
        out: Value,
        bprop: Arc<Graph>,
    ) -> Result<()> {
        self.ensure_active()?;
        let data = self.forward.node(node);
        if !data.op.is_operation() {
            return Err(AutodiffError::ExpectedOperation(node));
        }
        let expected = data.src.len();
        let declared = bprop
            .output_arity()
            .ok_or(AutodiffError::ArityMismatch {
                node,
                declared: 0,
                expected,
            })?;
        if declared != expected {
            return Err(AutodiffError::ArityMismatch {
                node,
                declared,
                expected,
            });
        }
        self.build_adjoint(node, op_args, out, AdjointKind::Op { bprop })
    }

    /// Overrides which node is treated as the trace's output. A missing
    /// adjoint is reconstructed when the node is a sequence projection,
    /// and fatal otherwise.
    pub fn set_terminal(&mut self, node: NodeId) -> Result<()> {
        self.ensure_active()?;
        debug!("terminal node set to {node:?}");
        self.last_node = Some(node);
        if self.adjoints.contains(node) {
            return Ok(());
        }
        match self.forward.node(node).op {
            GraphOp::TupleGetItem(_) => reconstruct::forge(self, node),
            _ => Err(AutodiffError::MissingAdjoint(node)),
        }
    }

    /// Closes the tape: propagates stop-gradient flags, seeds the
    /// terminal gradient, appends weight parameters, runs the reverse
    /// sweep, assembles the requested gradients and rewires the finished
    /// graph onto its own parameters.
    ///
    /// With `has_seed`, the tape gains a trailing parameter (after the
    /// input parameters, before the weight parameters) through which the
    /// caller passes the seed gradient; otherwise the seed is a ones-like
    /// of the terminal's output value.
    pub fn finish(
        &mut self,
        weights: &[NodeId],
        grad_inputs: bool,
        grad_weights: bool,
        has_seed: bool,
    ) -> Result<Graph> {
        self.ensure_active()?;
        self.finished = true;
        self.propagate_stop_gradient();

        let last = self.last_node.ok_or(AutodiffError::MissingTerminal)?;
        let terminal_out = match self.adjoints.get(last) {
            Some(adjoint) => adjoint.out().clone(),
            None => return Err(AutodiffError::MissingTerminal),
        };
        if has_seed {
            let sens = self.tape.param(terminal_out.signature());
            self.accumulate(last, sens)?;
        } else {
            let ones = self.ones_like_value(terminal_out)?;
            self.accumulate(last, ones)?;
        }

        for weight in weights {
            let data = self.forward.node(*weight);
            let GraphOp::Param { default } = &data.op else {
                return Err(AutodiffError::NotAParameter(*weight));
            };
            match default {
                Some(value) => {
                    self.tape.param_with_default(data.sig.clone(), value.clone());
                }
                None => {
                    self.tape.param(data.sig.clone());
                }
            }
        }

        self.back_propagate()?;
        self.set_output(weights, grad_inputs, grad_weights)?;
        self.replace_primal_refs(weights, has_seed);
        Ok(mem::take(&mut self.tape))
    }

    // --- Introspection ------------------------------------------------

    /// Number of backward subgraphs invoked by the reverse sweep.
    pub fn backward_calls(&self) -> usize {
        self.backward_calls
    }

    /// Number of traced operations (non-leaf adjoints).
    pub fn recorded_operations(&self) -> usize {
        (0..self.adjoints.len())
            .filter(|i| !self.adjoints.entry(*i).1.is_leaf())
            .count()
    }

    /// Whether gradient flow through `node` has been cut off.
    pub fn is_stopped(&self, node: NodeId) -> bool {
        self.stopped.contains(&node)
    }

    /// The adjoint recorded for `node`, if any.
    pub fn adjoint(&self, node: NodeId) -> Option<&Adjoint> {
        self.adjoints.get(node)
    }

    // --- Internals ----------------------------------------------------

    fn ensure_active(&self) -> Result<()> {
        if self.finished {
            return Err(AutodiffError::SessionFinished);
        }
        Ok(())
    }

    /// Creates the adjoint for a freshly recorded node, synthesizing
    /// operand adjoints on demand and wiring user back-references.
    pub(crate) fn build_adjoint(
        &mut self,
        node: NodeId,
        op_args: Vec<Value>,
        out: Value,
        kind: AdjointKind,
    ) -> Result<()> {
        if self.adjoints.contains(node) {
            return Err(AutodiffError::DuplicateRecord(node));
        }
        let operands = self.forward.node(node).src.clone();
        if op_args.len() != operands.len() {
            return Err(AutodiffError::OperandCountMismatch {
                node,
                given: op_args.len(),
                expected: operands.len(),
            });
        }

        for (i, operand) in operands.iter().enumerate() {
            if self.adjoints.contains(*operand) {
                self.adjoints.add_user(*operand, node)?;
                continue;
            }
            let operand_op = &self.forward.node(*operand).op;
            if operand_op.is_structural() {
                reconstruct::forge(self, *operand)?;
                self.adjoints.add_user(*operand, node)?;
            } else if operand_op.is_operation() {
                // A compound operand that was never reported and is not
                // reconstructable.
                return Err(AutodiffError::UnsupportedOperand(*operand));
            } else {
                self.adjoints
                    .insert(*operand, Adjoint::leaf(op_args[i].shallow_copy()))?;
                self.adjoints.add_user(*operand, node)?;
            }
        }

        let op_args = op_args.iter().map(Value::shallow_copy).collect();
        let adjoint = Adjoint {
            kind,
            dout: None,
            users: Vec::new(),
            op_args,
            out: out.shallow_copy(),
        };
        self.adjoints.insert(node, adjoint)?;
        self.last_node = Some(node);
        debug!("recorded adjoint for node {node:?}");
        Ok(())
    }

    /// First contribution lands verbatim; later ones are combined with
    /// the per-signature "add" subgraph.
    fn accumulate(&mut self, node: NodeId, factor: NodeId) -> Result<()> {
        let (existing, sig) = {
            let adjoint = self
                .adjoints
                .get(node)
                .ok_or(AutodiffError::MissingAdjoint(node))?;
            (adjoint.dout, adjoint.out.signature())
        };
        let new_dout = match existing {
            None => factor,
            Some(current) => {
                debug!("accumulating gradient contribution into node {node:?}");
                let add_fg = self.caches.add.add_for(self.registry, &sig)?;
                self.tape.splice(&add_fg, &[current, factor])?
            }
        };
        if let Some(adjoint) = self.adjoints.get_mut(node) {
            adjoint.dout = Some(new_dout);
        }
        Ok(())
    }

    /// The accumulated gradient of `node`, or a fresh zeros-like of its
    /// output value: backward functions always receive a concrete
    /// gradient, never an absent one.
    fn real_dout(&mut self, node: NodeId) -> Result<NodeId> {
        let (dout, out) = {
            let adjoint = self
                .adjoints
                .get(node)
                .ok_or(AutodiffError::MissingAdjoint(node))?;
            (adjoint.dout, adjoint.out().clone())
        };
        match dout {
            Some(d) => Ok(d),
            None => self.zeros_like_value(out),
        }
    }

    fn zeros_like_value(&mut self, value: Value) -> Result<NodeId> {
        let sig = value.signature();
        let fg = self.caches.like.zeros_like(self.registry, &sig)?;
        let arg = self.tape.constant(value);
        self.tape.splice(&fg, &[arg])
    }

    fn ones_like_value(&mut self, value: Value) -> Result<NodeId> {
        let sig = value.signature();
        let fg = self.caches.like.ones_like(self.registry, &sig)?;
        let arg = self.tape.constant(value);
        self.tape.splice(&fg, &[arg])
    }

    /// Zeros-like referencing the traced node itself; used for inputs
    /// that never appear in the trace, so the reference can later be
    /// rewired onto the tape's own parameter.
    fn zeros_like_node(&mut self, node: NodeId) -> Result<NodeId> {
        let sig = self.forward.node(node).sig.clone();
        let fg = self.caches.like.zeros_like(self.registry, &sig)?;
        let arg = self.tape.primal(node, sig);
        self.tape.splice(&fg, &[arg])
    }

    /// One reverse pass over the adjoint table. Nodes become stopped if
    /// they are barriers or if every recorded user is already stopped;
    /// users are recorded before their operands are revisited, so a
    /// single pass reaches the fixpoint.
    fn propagate_stop_gradient(&mut self) {
        if !self.need_propagate_stop_gradient {
            return;
        }
        for i in (0..self.adjoints.len()).rev() {
            let (node, _) = self.adjoints.entry(i);
            let op = &self.forward.node(node).op;
            if !op.is_operation() || self.stopped.contains(&node) {
                continue;
            }
            if op.is_barrier() || self.all_references_stopped(node) {
                debug!("stop_gradient flag set for node {node:?}");
                self.stopped.insert(node);
            }
        }
    }

    fn all_references_stopped(&self, node: NodeId) -> bool {
        let Some(adjoint) = self.adjoints.get(node) else {
            return false;
        };
        if adjoint.users().is_empty() {
            return false;
        }
        adjoint
            .users()
            .iter()
            .all(|u| self.forward.node(*u).op.is_operation() && self.stopped.contains(u))
    }

    /// The reverse backpropagation sweep, most-recent-first over the
    /// adjoint table.
    fn back_propagate(&mut self) -> Result<()> {
        for i in (0..self.adjoints.len()).rev() {
            let (node, bprop, op_args, out) = {
                let (node, adjoint) = self.adjoints.entry(i);
                let Some(bprop) = adjoint.bprop() else {
                    continue;
                };
                (
                    node,
                    Arc::clone(bprop),
                    adjoint.op_args.clone(),
                    adjoint.out().clone(),
                )
            };
            if self.stopped.contains(&node) {
                debug!("bypassing backward for stopped node {node:?}");
                continue;
            }

            let operands = self.forward.node(node).src.clone();
            let declared = bprop
                .output_arity()
                .ok_or(AutodiffError::ArityMismatch {
                    node,
                    declared: 0,
                    expected: operands.len(),
                })?;
            if declared != operands.len() {
                return Err(AutodiffError::ArityMismatch {
                    node,
                    declared,
                    expected: operands.len(),
                });
            }

            let mut args = Vec::with_capacity(op_args.len() + 2);
            for value in &op_args {
                args.push(self.tape.constant(value.clone()));
            }
            args.push(self.tape.constant(out));
            args.push(self.real_dout(node)?);
            let app = self.tape.splice(&bprop, &args)?;
            self.backward_calls += 1;
            debug!("backward subgraph invoked for node {node:?}");

            for (slot, operand) in operands.iter().enumerate() {
                let operand_op = &self.forward.node(*operand).op;
                if operand_op.is_const() {
                    // Gradients of literals are inert.
                    continue;
                }
                if operand_op.is_operation() && self.stopped.contains(operand) {
                    debug!("bypassing gradient accumulation into stopped node {operand:?}");
                    continue;
                }
                if !self.adjoints.contains(*operand) {
                    return Err(AutodiffError::MissingAdjoint(*operand));
                }
                let din = self.tape.tuple_get(app, slot);
                self.accumulate(*operand, din)?;
            }
        }
        Ok(())
    }

    /// Assembles the tape output from the requested gradient sets.
    fn set_output(
        &mut self,
        weights: &[NodeId],
        grad_inputs: bool,
        grad_weights: bool,
    ) -> Result<()> {
        let inputs = self.inputs.clone();
        let tape_output = if grad_inputs && grad_weights {
            let gi = self.grad_tuple(&inputs, false)?;
            let gw = self.grad_tuple(weights, true)?;
            self.tape.make_tuple(vec![gi, gw])
        } else if grad_inputs {
            self.grad_tuple(&inputs, false)?
        } else if grad_weights {
            self.grad_tuple(weights, true)?
        } else if inputs.len() == 1 {
            // Neither gradient set requested: a single traced input
            // yields its gradient directly; every other case gets the
            // tuple form, including an empty tuple for an empty trace.
            self.node_grad(inputs[0], false)?
        } else {
            self.grad_tuple(&inputs, false)?
        };
        self.tape.set_output(tape_output);
        Ok(())
    }

    fn grad_tuple(&mut self, nodes: &[NodeId], is_weight: bool) -> Result<NodeId> {
        let nodes = nodes.to_vec();
        let mut elems = Vec::with_capacity(nodes.len());
        for node in nodes {
            elems.push(self.node_grad(node, is_weight)?);
        }
        Ok(self.tape.make_tuple(elems))
    }

    /// The gradient of a requested input/weight. A node absent from the
    /// trace degrades to a warned zeros-like substitution; unused
    /// parameters are a legitimate, common case.
    fn node_grad(&mut self, node: NodeId, is_weight: bool) -> Result<NodeId> {
        if self.adjoints.contains(node) {
            return self.real_dout(node);
        }
        warn!(
            "{} is not used in the trace, substituting a zero gradient: {node:?}",
            if is_weight { "weight" } else { "input" },
        );
        if is_weight {
            if let GraphOp::Param {
                default: Some(value),
            } = &self.forward.node(node).op
            {
                let value = value.clone();
                return self.zeros_like_value(value);
            }
        }
        self.zeros_like_node(node)
    }

    /// Rewires every reference to an original traced input/weight node
    /// onto the tape's own parameters. The replacement map is computed in
    /// full before the rewrite, so the commit is atomic.
    fn replace_primal_refs(&mut self, weights: &[NodeId], has_seed: bool) {
        let weight_offset = self.inputs.len() + usize::from(has_seed);
        let mut map = FxHashMap::default();
        for (i, data) in self.tape.nodes.iter().enumerate() {
            let GraphOp::Primal(fwd) = data.op else {
                continue;
            };
            let target = if let Some(pos) = self.inputs.iter().position(|x| *x == fwd) {
                Some(self.tape.params[pos])
            } else {
                weights
                    .iter()
                    .position(|x| *x == fwd)
                    .map(|pos| self.tape.params[weight_offset + pos])
            };
            if let Some(param) = target {
                map.insert(NodeId(i), param);
            }
        }
        self.tape.substitute(&map);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{DType, TypeSig};

    fn scalar_sig() -> TypeSig {
        TypeSig::scalar(DType::F32)
    }

    #[test]
    fn begin_rejects_non_parameter_input() {
        let mut fwd = Graph::new();
        let x = fwd.param(scalar_sig());
        let y = fwd.mul(x, x);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let err = GradSession::begin(&fwd, &[y], &mut registry, &mut caches).unwrap_err();
        assert!(matches!(err, AutodiffError::NotAParameter(_)));
    }

    #[test]
    fn duplicate_record_is_fatal() {
        let mut fwd = Graph::new();
        let x = fwd.param(scalar_sig());
        let y = fwd.mul(x, x);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[x], &mut registry, &mut caches).unwrap();
        session
            .record(y, vec![Value::scalar(3.0); 2], Value::scalar(9.0))
            .unwrap();
        let err = session
            .record(y, vec![Value::scalar(3.0); 2], Value::scalar(9.0))
            .unwrap_err();
        assert!(matches!(err, AutodiffError::DuplicateRecord(_)));
    }

    #[test]
    fn finish_without_terminal_is_fatal() {
        let mut fwd = Graph::new();
        let x = fwd.param(scalar_sig());

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[x], &mut registry, &mut caches).unwrap();
        let err = session.finish(&[], true, false, false).unwrap_err();
        assert!(matches!(err, AutodiffError::MissingTerminal));
    }

    #[test]
    fn session_cannot_be_reused_after_finish() {
        let mut fwd = Graph::new();
        let x = fwd.param(scalar_sig());
        let y = fwd.mul(x, x);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[x], &mut registry, &mut caches).unwrap();
        session
            .record(y, vec![Value::scalar(3.0); 2], Value::scalar(9.0))
            .unwrap();
        session.finish(&[], true, false, false).unwrap();

        let err = session
            .record(y, vec![Value::scalar(3.0); 2], Value::scalar(9.0))
            .unwrap_err();
        assert!(matches!(err, AutodiffError::SessionFinished));
        let err = session.finish(&[], true, false, false).unwrap_err();
        assert!(matches!(err, AutodiffError::SessionFinished));
    }

    #[test]
    fn custom_backward_must_cover_every_operand() {
        let mut fwd = Graph::new();
        let x = fwd.param(scalar_sig());
        let y = fwd.mul(x, x);

        // One gradient slot for a two-operand node.
        let mut bad = Graph::new();
        let p = bad.param(TypeSig::Any);
        let _out = bad.param(TypeSig::Any);
        let _dout = bad.param(TypeSig::Any);
        let t = bad.make_tuple(vec![p]);
        bad.set_output(t);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[x], &mut registry, &mut caches).unwrap();
        let err = session
            .record_with_backward(
                y,
                vec![Value::scalar(3.0); 2],
                Value::scalar(9.0),
                Arc::new(bad),
            )
            .unwrap_err();
        assert!(matches!(err, AutodiffError::ArityMismatch { .. }));
    }

    #[test]
    fn barrier_cuts_backward_invocations() {
        let mut fwd = Graph::new();
        let x = fwd.param(scalar_sig());
        let sq = fwd.mul(x, x);
        let cut = fwd.stop_gradient(sq);
        let z = fwd.mul(cut, cut);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[x], &mut registry, &mut caches).unwrap();
        session
            .record(sq, vec![Value::scalar(3.0); 2], Value::scalar(9.0))
            .unwrap();
        session
            .record(cut, vec![Value::scalar(9.0)], Value::scalar(9.0))
            .unwrap();
        session
            .record(z, vec![Value::scalar(9.0); 2], Value::scalar(81.0))
            .unwrap();
        assert_eq!(session.recorded_operations(), 3);

        session.finish(&[], true, false, false).unwrap();
        // The barrier and everything upstream of it are bypassed; only
        // the terminal multiply runs its backward.
        assert!(session.is_stopped(cut));
        assert!(session.is_stopped(sq));
        assert!(!session.is_stopped(z));
        assert_eq!(session.backward_calls(), 1);
    }

    #[test]
    fn stop_propagation_is_idempotent() {
        let mut fwd = Graph::new();
        let x = fwd.param(scalar_sig());
        let sq = fwd.mul(x, x);
        let cut = fwd.stop_gradient(sq);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[x], &mut registry, &mut caches).unwrap();
        session
            .record(sq, vec![Value::scalar(3.0); 2], Value::scalar(9.0))
            .unwrap();
        session
            .record(cut, vec![Value::scalar(9.0)], Value::scalar(9.0))
            .unwrap();

        session.propagate_stop_gradient();
        assert!(session.is_stopped(cut));
        assert!(session.is_stopped(sq));
        let first = session.stopped.len();

        session.propagate_stop_gradient();
        assert_eq!(session.stopped.len(), first);
    }

    #[test]
    fn seed_parameter_sits_between_inputs_and_weights() {
        let mut fwd = Graph::new();
        let x = fwd.param(scalar_sig());
        let w = fwd.param_with_default(scalar_sig(), Value::scalar(4.0));
        let y = fwd.mul(x, w);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[x], &mut registry, &mut caches).unwrap();
        session
            .record(y, vec![Value::scalar(3.0), Value::scalar(4.0)], Value::scalar(12.0))
            .unwrap();
        let tape = session.finish(&[w], true, true, true).unwrap();

        // One input, the seed, one weight.
        assert_eq!(tape.params.len(), 3);
        let GraphOp::Param { default } = &tape.node(tape.params[2]).op else {
            panic!("weight parameter missing");
        };
        assert_eq!(default, &Some(Value::scalar(4.0)));
        assert_eq!(tape.output_arity(), Some(2));
    }
}
