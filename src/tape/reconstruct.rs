//! Adjoint reconstruction for sequence nodes.
//!
//! Sequence packs and projections are frequently consumed without ever
//! being reported through `record`: a caller traces `make_tuple` /
//! `tuple_get_item` chains without evaluating them as operations. When
//! such a node first shows up as an operand (or as the designated
//! terminal), its adjoint is forged here on demand, recursively, from the
//! concrete values already known to the table.

use log::debug;

use crate::{
    error::{AutodiffError, Result},
    graph::{GraphOp, NodeId, Value},
    tape::adjoint::Adjoint,
    tape::session::GradSession,
};

/// Forges the adjoint of a sequence node that was never recorded.
/// Fatal for any other kind of node.
pub(crate) fn forge(session: &mut GradSession<'_>, node: NodeId) -> Result<()> {
    match session.forward.node(node).op {
        GraphOp::TupleGetItem(index) => forge_get_item(session, node, index),
        GraphOp::MakeTuple => forge_make_tuple(session, node),
        _ => Err(AutodiffError::UnsupportedOperand(node)),
    }
}

/// Reconstructs a projection: the container's concrete value is looked
/// up (forging the container first if needed) and the element value is
/// extracted from it, then the node is recorded as if the caller had
/// reported the projection itself.
fn forge_get_item(session: &mut GradSession<'_>, node: NodeId, index: usize) -> Result<()> {
    debug!("forging adjoint for projection node {node:?}");
    let container = session.forward.node(node).src[0];
    if !session.adjoints.contains(container) {
        let container_op = &session.forward.node(container).op;
        if container_op.is_structural() {
            forge(session, container)?;
        } else if container_op.is_operation() {
            return Err(AutodiffError::UnsupportedOperand(container));
        } else {
            return Err(AutodiffError::MissingAdjoint(container));
        }
    }
    let container_value = session
        .adjoints
        .get(container)
        .ok_or(AutodiffError::MissingAdjoint(container))?
        .out()
        .shallow_copy();
    let len = container_value
        .as_tuple()
        .ok_or(AutodiffError::NotASequence(container))?
        .len();
    let out = container_value
        .tuple_get(index)
        .ok_or(AutodiffError::IndexOutOfRange { node, index, len })?
        .shallow_copy();
    session.record(node, vec![container_value], out)
}

/// Reconstructs a pack: element values are gathered from operand
/// adjoints (forging compound operands recursively) or from literal /
/// default parameter values, and the pack is recorded with the assembled
/// sequence as its output.
///
/// An empty pack carries no gradient at all: it gets a unit-valued leaf
/// adjoint and is immediately marked stopped.
fn forge_make_tuple(session: &mut GradSession<'_>, node: NodeId) -> Result<()> {
    debug!("forging adjoint for pack node {node:?}");
    let operands = session.forward.node(node).src.clone();
    if operands.is_empty() {
        session.adjoints.insert(node, Adjoint::leaf(Value::Unit))?;
        session.stopped.insert(node);
        return Ok(());
    }

    let mut values = Vec::with_capacity(operands.len());
    for operand in operands {
        if !session.adjoints.contains(operand) {
            let operand_op = &session.forward.node(operand).op;
            if operand_op.is_structural() {
                forge(session, operand)?;
            } else if operand_op.is_operation() {
                return Err(AutodiffError::UnsupportedOperand(operand));
            }
        }
        let value = if let Some(adjoint) = session.adjoints.get(operand) {
            adjoint.out().shallow_copy()
        } else {
            match &session.forward.node(operand).op {
                GraphOp::Const(v) => v.shallow_copy(),
                GraphOp::Param { default: Some(v) } => v.shallow_copy(),
                // A bare parameter reached only through reconstruction
                // has no concrete value to forge from.
                _ => return Err(AutodiffError::MissingAdjoint(operand)),
            }
        };
        values.push(value);
    }
    let out = Value::Tuple(values.iter().map(Value::shallow_copy).collect());
    session.record(node, values, out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        cache::GradCaches,
        graph::{DType, Graph, TypeSig},
        registry::BpropRegistry,
    };

    fn scalar_sig() -> TypeSig {
        TypeSig::scalar(DType::F32)
    }

    #[test]
    fn forges_pack_and_projection_on_first_use() {
        let mut fwd = Graph::new();
        let a = fwd.param_with_default(scalar_sig(), Value::scalar(2.0));
        let b = fwd.param_with_default(scalar_sig(), Value::scalar(5.0));
        let t = fwd.make_tuple(vec![a, b]);
        let e = fwd.tuple_get(t, 1);
        let y = fwd.mul(e, e);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[a, b], &mut registry, &mut caches).unwrap();

        // Recording the multiply forges the projection, which in turn
        // forges the pack.
        session
            .record(y, vec![Value::scalar(5.0); 2], Value::scalar(25.0))
            .unwrap();
        assert!(session.adjoint(t).is_some());
        let forged = session.adjoint(e).unwrap();
        assert_eq!(forged.out(), &Value::scalar(5.0));
        assert_eq!(forged.users(), &[y, y]);
    }

    #[test]
    fn empty_pack_is_unit_valued_and_stopped() {
        let mut fwd = Graph::new();
        let t = fwd.make_tuple(Vec::new());

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[], &mut registry, &mut caches).unwrap();

        forge(&mut session, t).unwrap();
        let adjoint = session.adjoint(t).unwrap();
        assert!(adjoint.is_leaf());
        assert_eq!(adjoint.out(), &Value::Unit);
        assert!(session.is_stopped(t));
    }

    #[test]
    fn projection_out_of_range_is_fatal() {
        let mut fwd = Graph::new();
        let a = fwd.param_with_default(scalar_sig(), Value::scalar(1.0));
        let t = fwd.make_tuple(vec![a]);
        let bad = fwd.add_node(GraphOp::TupleGetItem(3), vec![t], TypeSig::Any);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[a], &mut registry, &mut caches).unwrap();

        let err = forge(&mut session, bad).unwrap_err();
        assert!(matches!(err, AutodiffError::IndexOutOfRange { .. }));
    }

    #[test]
    fn projection_of_non_sequence_is_fatal() {
        let mut fwd = Graph::new();
        let a = fwd.param(scalar_sig());
        let sq = fwd.mul(a, a);
        let bad = fwd.add_node(GraphOp::TupleGetItem(0), vec![sq], TypeSig::Any);

        let mut registry = BpropRegistry::new();
        let mut caches = GradCaches::new();
        let mut session = GradSession::begin(&fwd, &[a], &mut registry, &mut caches).unwrap();

        session
            .record(sq, vec![Value::scalar(3.0); 2], Value::scalar(9.0))
            .unwrap();
        let err = forge(&mut session, bad).unwrap_err();
        assert!(matches!(err, AutodiffError::NotASequence(_)));
    }
}
