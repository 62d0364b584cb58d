use crate::graph::{op::GraphOp, signature::TypeSig};

/// A unique identifier for a node within a `Graph`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// The data associated with a single node in a computation graph.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeData {
    /// The operation performed by this node.
    pub op: GraphOp,
    /// The `NodeId`s of the input nodes to this operation.
    pub src: Vec<NodeId>,
    /// The abstract type of the value produced by this node.
    pub sig: TypeSig,
}
