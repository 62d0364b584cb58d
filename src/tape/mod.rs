//! The gradient tape: adjoint bookkeeping, reconstruction of unrecorded
//! sequence nodes, and the session driving tape construction.

pub mod adjoint;
pub(crate) mod reconstruct;
pub mod session;

pub use adjoint::{Adjoint, AdjointKind, AdjointTable};
pub use session::GradSession;
