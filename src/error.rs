//! Error types for the autodiff engine.

use thiserror::Error;

use crate::graph::{node::NodeId, signature::TypeSig};

/// Main error type for tape construction and backpropagation.
///
/// Every failure here is fatal for the current differentiation session;
/// the engine performs no local recovery.
#[derive(Debug, Error)]
pub enum AutodiffError {
    /// A traced node was recorded more than once.
    #[error("node {0:?} was already recorded on the tape")]
    DuplicateRecord(NodeId),

    /// A referenced node has no adjoint in the table.
    #[error("no adjoint exists for node {0:?}")]
    MissingAdjoint(NodeId),

    /// `finish` was called on a trace without a usable terminal node.
    #[error("no terminal node was recorded for this trace")]
    MissingTerminal,

    /// A backward subgraph's declared output arity does not match the
    /// operand count of its primal operation.
    #[error("backward subgraph of node {node:?} declares {declared} gradient slots, expected {expected}")]
    ArityMismatch {
        node: NodeId,
        declared: usize,
        expected: usize,
    },

    /// The number of recorded operand values differs from the node's
    /// operand count.
    #[error("node {node:?} was recorded with {given} operand values for {expected} operands")]
    OperandCountMismatch {
        node: NodeId,
        given: usize,
        expected: usize,
    },

    /// A sequence operation was applied to a non-sequence value.
    #[error("value of node {0:?} is not a sequence")]
    NotASequence(NodeId),

    /// A projection index falls outside its container.
    #[error("index {index} out of range for sequence of length {len} at node {node:?}")]
    IndexOutOfRange {
        node: NodeId,
        index: usize,
        len: usize,
    },

    /// A node expected to be an operation is a leaf.
    #[error("node {0:?} is not an operation")]
    ExpectedOperation(NodeId),

    /// A node expected to be a parameter is not one.
    #[error("node {0:?} is not a parameter")]
    NotAParameter(NodeId),

    /// An operand is neither recorded, reconstructable, nor a literal.
    #[error("cannot derive an adjoint for operand {0:?}")]
    UnsupportedOperand(NodeId),

    /// The registry cannot produce a generator for the signature.
    #[error("no generator available for signature {0}")]
    UnsupportedSignature(TypeSig),

    /// A subgraph was spliced with the wrong number of arguments.
    #[error("subgraph expects {expected} arguments, got {given}")]
    BadSpliceArgs { expected: usize, given: usize },

    /// A subgraph has no output node to splice or inspect.
    #[error("subgraph has no output node")]
    MissingOutput,

    /// A subgraph node references an operand that does not exist.
    #[error("malformed subgraph: node references an undefined operand")]
    MalformedSubgraph,

    /// The session already produced its tape.
    #[error("session is already finished")]
    SessionFinished,
}

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, AutodiffError>;
