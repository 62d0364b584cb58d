//! Reverse-mode automatic differentiation as graph construction.
//!
//! The engine never executes numeric kernels. A caller traces a forward
//! computation into a [`Graph`], reports each evaluated operation to a
//! [`GradSession`] together with its concrete operand and result values,
//! and receives back a second graph, the gradient tape, that computes
//! the gradients of the traced output with respect to the traced inputs
//! and weights. Executing either graph is the caller's business.
//!
//! ```
//! use tapegrad::{BpropRegistry, DType, GradCaches, GradSession, Graph, TypeSig, Value};
//!
//! // Trace y = x * x.
//! let mut fwd = Graph::new();
//! let x = fwd.param(TypeSig::scalar(DType::F32));
//! let y = fwd.mul(x, x);
//!
//! // Differentiate it at x = 3.
//! let mut registry = BpropRegistry::new();
//! let mut caches = GradCaches::new();
//! let mut session = GradSession::begin(&fwd, &[x], &mut registry, &mut caches)?;
//! session.record(y, vec![Value::scalar(3.0), Value::scalar(3.0)], Value::scalar(9.0))?;
//! let tape = session.finish(&[], true, false, false)?;
//! assert!(tape.output.is_some());
//! # Ok::<(), tapegrad::AutodiffError>(())
//! ```
//!
//! The registry and caches are long-lived: backward subgraphs and
//! zero/one-like generators are built once and structurally cloned into
//! every tape that needs them, so repeated differentiation of similar
//! traces amortizes their construction.

pub mod cache;
pub mod error;
pub mod graph;
pub mod registry;
pub mod tape;

pub use cache::{AddCache, GradCaches, LikeCache};
pub use error::{AutodiffError, Result};
pub use graph::{DType, Graph, GraphOp, NodeData, NodeId, PrimOp, TensorValue, TypeSig, Value};
pub use registry::BpropRegistry;
pub use tape::{Adjoint, AdjointKind, AdjointTable, GradSession};
