//! Per-node gradient bookkeeping.
//!
//! Every traced node owns exactly one [`Adjoint`]: the running sum of
//! gradient contributions flowing into it, the nodes consuming it, the
//! concrete operand/result values of its operation, and the backward
//! subgraph that turns an output gradient into operand gradients.

use std::sync::Arc;

use rustc_hash::FxHashMap;

use crate::{
    error::{AutodiffError, Result},
    graph::{Graph, NodeId, Value},
};

/// What kind of traced node an adjoint belongs to.
///
/// Closed set, dispatched by pattern match: leaves (parameters,
/// constants), plain primitive operations, and structural sequence
/// operations.
#[derive(Debug, Clone)]
pub enum AdjointKind {
    /// Parameter or constant; no backward subgraph.
    Leaf,
    /// A primitive operation with its resolved backward subgraph.
    Op { bprop: Arc<Graph> },
    /// A sequence construction/projection with its backward subgraph.
    Structural { bprop: Arc<Graph> },
}

/// Gradient bookkeeping for one traced node.
#[derive(Debug, Clone)]
pub struct Adjoint {
    pub(crate) kind: AdjointKind,
    /// Running sum of gradient contributions; a node id in the tape.
    /// Absent until the first contribution arrives.
    pub(crate) dout: Option<NodeId>,
    /// Traced nodes that consume this node as an operand.
    pub(crate) users: Vec<NodeId>,
    /// Concrete values of the operation's inputs.
    pub(crate) op_args: Vec<Value>,
    /// Concrete value of the operation's output (for leaves, the leaf's
    /// own value).
    pub(crate) out: Value,
}

impl Adjoint {
    /// An adjoint for a leaf node holding its concrete value.
    pub fn leaf(out: Value) -> Self {
        Adjoint {
            kind: AdjointKind::Leaf,
            dout: None,
            users: Vec::new(),
            op_args: Vec::new(),
            out,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, AdjointKind::Leaf)
    }

    /// The backward subgraph, absent for leaves.
    pub fn bprop(&self) -> Option<&Arc<Graph>> {
        match &self.kind {
            AdjointKind::Leaf => None,
            AdjointKind::Op { bprop } | AdjointKind::Structural { bprop } => Some(bprop),
        }
    }

    pub fn out(&self) -> &Value {
        &self.out
    }

    pub fn users(&self) -> &[NodeId] {
        &self.users
    }
}

/// Insertion-ordered mapping from traced node to its adjoint.
///
/// Modeled as an explicit ordered list plus a position index so that the
/// backprop sweep's reverse-insertion-order contract stays explicit.
/// Nodes are traced only after all their operands, so reverse order is
/// reverse-dependency order and no separate topological sort is needed.
#[derive(Debug, Default)]
pub struct AdjointTable {
    entries: Vec<(NodeId, Adjoint)>,
    index: FxHashMap<NodeId, usize>,
}

impl AdjointTable {
    pub fn new() -> Self {
        AdjointTable::default()
    }

    /// Inserts the adjoint for a node. Each traced node must be recorded
    /// exactly once.
    pub fn insert(&mut self, node: NodeId, adjoint: Adjoint) -> Result<()> {
        if self.index.contains_key(&node) {
            return Err(AutodiffError::DuplicateRecord(node));
        }
        self.index.insert(node, self.entries.len());
        self.entries.push((node, adjoint));
        Ok(())
    }

    pub fn contains(&self, node: NodeId) -> bool {
        self.index.contains_key(&node)
    }

    pub fn get(&self, node: NodeId) -> Option<&Adjoint> {
        self.index.get(&node).map(|i| &self.entries[*i].1)
    }

    pub fn get_mut(&mut self, node: NodeId) -> Option<&mut Adjoint> {
        let i = *self.index.get(&node)?;
        Some(&mut self.entries[i].1)
    }

    /// Registers `user` as a consumer of `node`.
    pub fn add_user(&mut self, node: NodeId, user: NodeId) -> Result<()> {
        let adjoint = self
            .get_mut(node)
            .ok_or(AutodiffError::MissingAdjoint(node))?;
        adjoint.users.push(user);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry at insertion position `i`.
    pub fn entry(&self, i: usize) -> (NodeId, &Adjoint) {
        let (node, adjoint) = &self.entries[i];
        (*node, adjoint)
    }
}
