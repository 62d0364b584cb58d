//! The value/graph model manipulated by the autodiff engine.
//!
//! Graphs are node arenas: every node is a `NodeData` identified by a
//! stable `NodeId`, with operands recorded before their consumers. The
//! same representation serves both the traced forward graph and the
//! gradient tape the engine emits.

#[allow(clippy::module_inception)]
mod graph;
pub mod node;
pub mod op;
pub mod signature;
pub mod value;

pub use graph::Graph;
pub use node::{NodeData, NodeId};
pub use op::{GraphOp, PrimOp};
pub use signature::{DType, TypeSig};
pub use value::{TensorValue, Value};
