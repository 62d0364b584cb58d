use rustc_hash::FxHashMap;

use crate::{
    error::{AutodiffError, Result},
    graph::{
        node::{NodeData, NodeId},
        op::{GraphOp, PrimOp},
        signature::TypeSig,
        value::Value,
    },
};

/// Owns all the nodes of a computation graph.
///
/// Nodes live in an arena and are referenced by stable `NodeId`s; operands
/// always precede their consumers, so the arena order is a valid
/// topological order. Both traced forward graphs and gradient tapes use
/// this representation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Graph {
    /// A vector holding the data for all nodes in the graph.
    pub nodes: Vec<NodeData>,
    /// Parameter nodes, in declaration order.
    pub params: Vec<NodeId>,
    /// The output node, once designated.
    pub output: Option<NodeId>,
}

impl Graph {
    /// Creates a new, empty computation graph.
    pub fn new() -> Self {
        Graph::default()
    }

    /// Adds a new node to the graph. This is the internal primitive all
    /// constructors go through.
    pub fn add_node(&mut self, op: GraphOp, src: Vec<NodeId>, sig: TypeSig) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(NodeData { op, src, sig });
        id
    }

    /// Borrows the data of a node. The id must come from this graph.
    pub fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.0]
    }

    /// Adds a new parameter node.
    pub fn param(&mut self, sig: TypeSig) -> NodeId {
        let id = self.add_node(GraphOp::Param { default: None }, Vec::new(), sig);
        self.params.push(id);
        id
    }

    /// Adds a parameter node carrying a default/initial value.
    pub fn param_with_default(&mut self, sig: TypeSig, default: Value) -> NodeId {
        let id = self.add_node(
            GraphOp::Param {
                default: Some(default),
            },
            Vec::new(),
            sig,
        );
        self.params.push(id);
        id
    }

    /// Adds a literal constant node.
    pub fn constant(&mut self, value: Value) -> NodeId {
        let sig = value.signature();
        self.add_node(GraphOp::Const(value), Vec::new(), sig)
    }

    /// Adds a reference back to a node of another (traced) graph.
    pub fn primal(&mut self, node: NodeId, sig: TypeSig) -> NodeId {
        self.add_node(GraphOp::Primal(node), Vec::new(), sig)
    }

    /// Adds a node shaped like `src`, filled with `value`.
    pub fn fill(&mut self, src: NodeId, value: f64, sig: TypeSig) -> NodeId {
        self.add_node(GraphOp::Fill(value), vec![src], sig)
    }

    // --- Elementwise constructors -------------------------------------

    fn binary(&mut self, op: PrimOp, lhs: NodeId, rhs: NodeId) -> NodeId {
        let lhs_sig = self.node(lhs).sig.clone();
        let rhs_sig = &self.node(rhs).sig;
        if let (TypeSig::Tensor { shape: ls, .. }, TypeSig::Tensor { shape: rs, .. }) =
            (&lhs_sig, rhs_sig)
        {
            assert_eq!(ls, rs, "shape mismatch in {}: {ls:?} vs {rs:?}", op.name());
        }
        self.add_node(GraphOp::Prim(op), vec![lhs, rhs], lhs_sig)
    }

    fn unary(&mut self, op: PrimOp, src: NodeId) -> NodeId {
        let sig = self.node(src).sig.clone();
        self.add_node(GraphOp::Prim(op), vec![src], sig)
    }

    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(PrimOp::Add, lhs, rhs)
    }

    pub fn sub(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(PrimOp::Sub, lhs, rhs)
    }

    pub fn mul(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(PrimOp::Mul, lhs, rhs)
    }

    pub fn div(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(PrimOp::Div, lhs, rhs)
    }

    pub fn less(&mut self, lhs: NodeId, rhs: NodeId) -> NodeId {
        self.binary(PrimOp::Less, lhs, rhs)
    }

    pub fn neg(&mut self, src: NodeId) -> NodeId {
        self.unary(PrimOp::Neg, src)
    }

    pub fn recip(&mut self, src: NodeId) -> NodeId {
        self.unary(PrimOp::Recip, src)
    }

    pub fn exp(&mut self, src: NodeId) -> NodeId {
        self.unary(PrimOp::Exp, src)
    }

    pub fn log(&mut self, src: NodeId) -> NodeId {
        self.unary(PrimOp::Log, src)
    }

    pub fn sin(&mut self, src: NodeId) -> NodeId {
        self.unary(PrimOp::Sin, src)
    }

    pub fn cos(&mut self, src: NodeId) -> NodeId {
        self.unary(PrimOp::Cos, src)
    }

    pub fn sqrt(&mut self, src: NodeId) -> NodeId {
        self.unary(PrimOp::Sqrt, src)
    }

    pub fn stop_gradient(&mut self, src: NodeId) -> NodeId {
        self.unary(PrimOp::StopGradient, src)
    }

    // --- Structural constructors --------------------------------------

    /// Packs the given nodes into a sequence.
    pub fn make_tuple(&mut self, elems: Vec<NodeId>) -> NodeId {
        let sig = TypeSig::Tuple(elems.iter().map(|e| self.node(*e).sig.clone()).collect());
        self.add_node(GraphOp::MakeTuple, elems, sig)
    }

    /// Projects element `index` out of a sequence-valued node.
    pub fn tuple_get(&mut self, src: NodeId, index: usize) -> NodeId {
        let sig = match &self.node(src).sig {
            TypeSig::Tuple(elems) => {
                assert!(index < elems.len(), "tuple index out of bounds");
                elems[index].clone()
            }
            TypeSig::Any => TypeSig::Any,
            other => panic!("tuple_get on non-sequence signature {other}"),
        };
        self.add_node(GraphOp::TupleGetItem(index), vec![src], sig)
    }

    // --- Output -------------------------------------------------------

    pub fn set_output(&mut self, id: NodeId) {
        self.output = Some(id);
    }

    /// Declared arity of the output, when the output is a sequence
    /// construction. Backward subgraphs use this as their gradient slot
    /// count.
    pub fn output_arity(&self) -> Option<usize> {
        let out = self.output?;
        match self.node(out).op {
            GraphOp::MakeTuple => Some(self.node(out).src.len()),
            _ => None,
        }
    }

    // --- Graph-to-graph operations ------------------------------------

    /// Structurally clones `sub` into this graph, binding the sub-graph's
    /// parameters to `args` in order. Returns the id of the remapped
    /// output node.
    ///
    /// This is how cached subgraphs are invoked: the cached instance is
    /// never shared, every use gets its own copy of the nodes.
    pub fn splice(&mut self, sub: &Graph, args: &[NodeId]) -> Result<NodeId> {
        if args.len() != sub.params.len() {
            return Err(AutodiffError::BadSpliceArgs {
                expected: sub.params.len(),
                given: args.len(),
            });
        }
        let output = sub.output.ok_or(AutodiffError::MissingOutput)?;

        let mut remap: FxHashMap<NodeId, NodeId> = FxHashMap::default();
        for (param, arg) in sub.params.iter().zip(args) {
            remap.insert(*param, *arg);
        }
        for (i, data) in sub.nodes.iter().enumerate() {
            let id = NodeId(i);
            if remap.contains_key(&id) {
                continue;
            }
            let mut src = Vec::with_capacity(data.src.len());
            for s in &data.src {
                src.push(*remap.get(s).ok_or(AutodiffError::MalformedSubgraph)?);
            }
            let new_id = self.add_node(data.op.clone(), src, data.sig.clone());
            remap.insert(id, new_id);
        }
        remap
            .get(&output)
            .copied()
            .ok_or(AutodiffError::MalformedSubgraph)
    }

    /// Rewrites every node reference through `map`, including the output.
    ///
    /// The map is fully computed before any edge is touched, so the
    /// rewrite is committed atomically: no node ever observes a mix of
    /// old and new references.
    pub fn substitute(&mut self, map: &FxHashMap<NodeId, NodeId>) {
        if map.is_empty() {
            return;
        }
        for data in &mut self.nodes {
            for s in &mut data.src {
                if let Some(r) = map.get(s) {
                    *s = *r;
                }
            }
        }
        if let Some(out) = self.output {
            if let Some(r) = map.get(&out) {
                self.output = Some(*r);
            }
        }
    }
}
