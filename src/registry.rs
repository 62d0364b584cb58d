//! Backward-function registry.
//!
//! Maps operator identity to a small backward subgraph ("bprop") that
//! computes input gradients from `(inputs..., output, output_gradient)`.
//! The registry also owns the generators for the zero-like, one-like and
//! gradient-add subgraphs consumed by the identity caches.
//!
//! All backward subgraphs follow one calling convention: parameters are
//! `[x_0, ..., x_{n-1}, out, dout]` and the output is a sequence with one
//! gradient slot per operand.
//!
//! The registry is an explicit, injectable object rather than module
//! state; one writer at a time per instance.

use std::sync::Arc;

use log::debug;
use rustc_hash::FxHashMap;

use crate::{
    error::{AutodiffError, Result},
    graph::{Graph, GraphOp, NodeId, PrimOp, TypeSig, Value},
};

/// Registry of backward subgraphs, keyed by operator identity.
#[derive(Debug, Default)]
pub struct BpropRegistry {
    /// Primitive bprops, memoized per (operator, arity).
    prim: FxHashMap<(PrimOp, usize), Arc<Graph>>,
    /// Sequence-construction bprops, memoized per arity; their shape is
    /// independent of element types.
    sequence: FxHashMap<usize, Arc<Graph>>,
    /// Sequence-projection bprops, memoized per (index, container type).
    extract: FxHashMap<(usize, TypeSig), Arc<Graph>>,
}

impl BpropRegistry {
    pub fn new() -> Self {
        BpropRegistry::default()
    }

    /// Resolves the backward subgraph for a primitive operation, or
    /// `None` when the operation has no backward defined (or is invoked
    /// with the wrong arity).
    pub fn resolve(&mut self, op: PrimOp, arity: usize) -> Option<Arc<Graph>> {
        if arity != op.arity() {
            return None;
        }
        if let Some(cached) = self.prim.get(&(op, arity)) {
            debug!("bprop cache hit for {}/{arity}", op.name());
            return Some(Arc::clone(cached));
        }
        let built = Arc::new(build_prim_bprop(op)?);
        self.prim.insert((op, arity), Arc::clone(&built));
        Some(built)
    }

    /// The backward of "pack" is "unpack": one projection per element.
    pub fn sequence_backward(&mut self, arity: usize) -> Arc<Graph> {
        if let Some(cached) = self.sequence.get(&arity) {
            debug!("bprop cache hit for make_tuple/{arity}");
            return Arc::clone(cached);
        }
        let mut g = Graph::new();
        for _ in 0..arity {
            g.param(TypeSig::Any);
        }
        let _out = g.param(TypeSig::Any);
        let dout = g.param(TypeSig::Any);
        let dins = (0..arity).map(|i| g.tuple_get(dout, i)).collect();
        let output = g.make_tuple(dins);
        g.set_output(output);
        let built = Arc::new(g);
        self.sequence.insert(arity, Arc::clone(&built));
        built
    }

    /// The backward of a projection routes the output gradient into its
    /// slot of the container gradient and fills every other slot with a
    /// zero-like value. Specialized and memoized per (index, container
    /// signature).
    pub fn extract_backward(&mut self, index: usize, container: &TypeSig) -> Result<Arc<Graph>> {
        let key = (index, container.clone());
        if let Some(cached) = self.extract.get(&key) {
            debug!("bprop cache hit for tuple_get_item[{index}]");
            return Ok(Arc::clone(cached));
        }
        let TypeSig::Tuple(elems) = container else {
            return Err(AutodiffError::UnsupportedSignature(container.clone()));
        };
        if index >= elems.len() {
            return Err(AutodiffError::UnsupportedSignature(container.clone()));
        }
        let mut g = Graph::new();
        let x0 = g.param(container.clone());
        let _out = g.param(elems[index].clone());
        let dout = g.param(elems[index].clone());
        let mut parts = Vec::with_capacity(elems.len());
        for (i, elem_sig) in elems.iter().enumerate() {
            if i == index {
                parts.push(dout);
            } else {
                let slot = g.tuple_get(x0, i);
                parts.push(like_node(&mut g, slot, elem_sig, 0.0)?);
            }
        }
        let din = g.make_tuple(parts);
        let output = g.make_tuple(vec![din]);
        g.set_output(output);
        let built = Arc::new(g);
        self.extract.insert(key, Arc::clone(&built));
        Ok(built)
    }

    /// Placeholder for a missing backward definition. Every gradient slot
    /// is the same inert sentinel, so arity obligations hold for graphs
    /// that never actually evaluate this backward.
    pub fn undefined_backward(&self, arity: usize) -> Arc<Graph> {
        let mut g = Graph::new();
        for _ in 0..arity {
            g.param(TypeSig::Any);
        }
        let _out = g.param(TypeSig::Any);
        let _dout = g.param(TypeSig::Any);
        let sentinel = g.add_node(GraphOp::UndefinedBackward, Vec::new(), TypeSig::Any);
        let output = g.make_tuple(vec![sentinel; arity]);
        g.set_output(output);
        Arc::new(g)
    }

    // --- Generators for the identity caches ---------------------------

    /// Builds the zero-filled "like" subgraph for a signature.
    pub fn build_zeros_like(&self, sig: &TypeSig) -> Result<Graph> {
        build_like(sig, 0.0)
    }

    /// Builds the one-filled "like" subgraph for a signature.
    pub fn build_ones_like(&self, sig: &TypeSig) -> Result<Graph> {
        build_like(sig, 1.0)
    }

    /// Builds the type-polymorphic gradient-accumulation subgraph for a
    /// signature: two parameters, one elementwise sum.
    pub fn build_add(&self, sig: &TypeSig) -> Result<Graph> {
        let mut g = Graph::new();
        let a = g.param(sig.clone());
        let b = g.param(sig.clone());
        let out = add_like(&mut g, a, b, sig)?;
        g.set_output(out);
        Ok(g)
    }
}

fn build_like(sig: &TypeSig, fill: f64) -> Result<Graph> {
    let mut g = Graph::new();
    let p = g.param(sig.clone());
    let out = like_node(&mut g, p, sig, fill)?;
    g.set_output(out);
    Ok(g)
}

/// Emits nodes computing a value of type `sig`, shaped like `src`, with
/// every element set to `fill`.
fn like_node(g: &mut Graph, src: NodeId, sig: &TypeSig, fill: f64) -> Result<NodeId> {
    match sig {
        TypeSig::Tensor { .. } => Ok(g.fill(src, fill, sig.clone())),
        TypeSig::Tuple(elems) => {
            let mut parts = Vec::with_capacity(elems.len());
            for (i, elem_sig) in elems.iter().enumerate() {
                let slot = g.tuple_get(src, i);
                parts.push(like_node(g, slot, elem_sig, fill)?);
            }
            Ok(g.make_tuple(parts))
        }
        TypeSig::Int => Ok(g.constant(Value::Int(fill as i64))),
        TypeSig::Unit => Ok(g.constant(Value::Unit)),
        TypeSig::Any => Err(AutodiffError::UnsupportedSignature(sig.clone())),
    }
}

/// Emits nodes computing the elementwise sum of `a` and `b` of type `sig`.
fn add_like(g: &mut Graph, a: NodeId, b: NodeId, sig: &TypeSig) -> Result<NodeId> {
    match sig {
        TypeSig::Tensor { .. } | TypeSig::Int => Ok(g.add(a, b)),
        TypeSig::Tuple(elems) => {
            let mut parts = Vec::with_capacity(elems.len());
            for (i, elem_sig) in elems.iter().enumerate() {
                let ea = g.tuple_get(a, i);
                let eb = g.tuple_get(b, i);
                parts.push(add_like(g, ea, eb, elem_sig)?);
            }
            Ok(g.make_tuple(parts))
        }
        TypeSig::Unit => Ok(a),
        TypeSig::Any => Err(AutodiffError::UnsupportedSignature(sig.clone())),
    }
}

/// Builds the backward subgraph for a primitive operation, or `None` for
/// operations without a defined backward.
fn build_prim_bprop(op: PrimOp) -> Option<Graph> {
    let arity = op.arity();
    let mut g = Graph::new();
    let xs: Vec<NodeId> = (0..arity).map(|_| g.param(TypeSig::Any)).collect();
    let out = g.param(TypeSig::Any);
    let dout = g.param(TypeSig::Any);

    let dins = match op {
        PrimOp::Add => vec![dout, dout],
        PrimOp::Sub => {
            let n = g.neg(dout);
            vec![dout, n]
        }
        PrimOp::Mul => {
            let da = g.mul(dout, xs[1]);
            let db = g.mul(dout, xs[0]);
            vec![da, db]
        }
        PrimOp::Div => {
            // d(a/b) = (dout/b, -dout*a/b^2)
            let r = g.recip(xs[1]);
            let da = g.mul(dout, r);
            let rr = g.mul(r, r);
            let arr = g.mul(xs[0], rr);
            let db_pos = g.mul(dout, arr);
            let db = g.neg(db_pos);
            vec![da, db]
        }
        PrimOp::Neg => vec![g.neg(dout)],
        PrimOp::Recip => {
            // d(1/x) = -out^2 * dout
            let oo = g.mul(out, out);
            let t = g.mul(dout, oo);
            vec![g.neg(t)]
        }
        PrimOp::Exp => vec![g.mul(dout, out)],
        PrimOp::Log => {
            let r = g.recip(xs[0]);
            vec![g.mul(dout, r)]
        }
        PrimOp::Sin => {
            let c = g.cos(xs[0]);
            vec![g.mul(dout, c)]
        }
        PrimOp::Cos => {
            let s = g.sin(xs[0]);
            let t = g.mul(dout, s);
            vec![g.neg(t)]
        }
        PrimOp::Sqrt => {
            // d(sqrt(x)) = dout / (2 * out)
            let two_out = g.add(out, out);
            let r = g.recip(two_out);
            vec![g.mul(dout, r)]
        }
        PrimOp::Less | PrimOp::StopGradient => return None,
    };

    let output = g.make_tuple(dins);
    g.set_output(output);
    Some(g)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::DType;

    #[test]
    fn resolve_memoizes_per_op_and_arity() {
        let mut reg = BpropRegistry::new();
        let a = reg.resolve(PrimOp::Mul, 2).unwrap();
        let b = reg.resolve(PrimOp::Mul, 2).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.output_arity(), Some(2));
        assert_eq!(a.params.len(), 4);
    }

    #[test]
    fn resolve_rejects_wrong_arity() {
        let mut reg = BpropRegistry::new();
        assert!(reg.resolve(PrimOp::Neg, 2).is_none());
        assert!(reg.resolve(PrimOp::Add, 1).is_none());
    }

    #[test]
    fn barrier_and_comparison_have_no_backward() {
        let mut reg = BpropRegistry::new();
        assert!(reg.resolve(PrimOp::StopGradient, 1).is_none());
        assert!(reg.resolve(PrimOp::Less, 2).is_none());
    }

    #[test]
    fn undefined_backward_matches_arity() {
        let reg = BpropRegistry::new();
        let fake = reg.undefined_backward(3);
        assert_eq!(fake.output_arity(), Some(3));
        assert_eq!(fake.params.len(), 5);
    }

    #[test]
    fn sequence_backward_unpacks() {
        let mut reg = BpropRegistry::new();
        let b = reg.sequence_backward(2);
        assert_eq!(b.output_arity(), Some(2));
        // Cached per arity.
        let b2 = reg.sequence_backward(2);
        assert!(Arc::ptr_eq(&b, &b2));
        assert!(!Arc::ptr_eq(&b, &reg.sequence_backward(3)));
    }

    #[test]
    fn extract_backward_requires_sequence_signature() {
        let mut reg = BpropRegistry::new();
        let err = reg
            .extract_backward(0, &TypeSig::scalar(DType::F32))
            .unwrap_err();
        assert!(matches!(err, AutodiffError::UnsupportedSignature(_)));
    }

    #[test]
    fn extract_backward_specialized_per_index_and_type() {
        let mut reg = BpropRegistry::new();
        let sig = TypeSig::Tuple(vec![
            TypeSig::scalar(DType::F32),
            TypeSig::scalar(DType::F32),
        ]);
        let b0 = reg.extract_backward(0, &sig).unwrap();
        let b0_again = reg.extract_backward(0, &sig).unwrap();
        assert!(Arc::ptr_eq(&b0, &b0_again));
        let b1 = reg.extract_backward(1, &sig).unwrap();
        assert!(!Arc::ptr_eq(&b0, &b1));
        assert_eq!(b0.output_arity(), Some(1));
    }

    #[test]
    fn add_generator_handles_nested_tuples() {
        let reg = BpropRegistry::new();
        let sig = TypeSig::Tuple(vec![
            TypeSig::scalar(DType::F32),
            TypeSig::Tuple(vec![TypeSig::Int]),
        ]);
        let g = reg.build_add(&sig).unwrap();
        assert_eq!(g.params.len(), 2);
        assert!(g.output.is_some());
    }

    #[test]
    fn like_generator_rejects_any() {
        let reg = BpropRegistry::new();
        let err = reg.build_zeros_like(&TypeSig::Any).unwrap_err();
        assert!(matches!(err, AutodiffError::UnsupportedSignature(_)));
    }
}
