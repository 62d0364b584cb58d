//! Abstract type signatures.
//!
//! A `TypeSig` describes the type of a value without holding the value
//! itself. Signatures are the cache keys used by the identity-function
//! caches and the backward-function registry, so they implement `Hash`
//! and `Eq`.

use std::fmt;

/// Element data types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DType {
    F32,
    F64,
    I64,
    Bool,
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::F32 => write!(f, "f32"),
            DType::F64 => write!(f, "f64"),
            DType::I64 => write!(f, "i64"),
            DType::Bool => write!(f, "bool"),
        }
    }
}

/// Abstract type descriptor for a graph value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeSig {
    /// A tensor with a fixed dtype and shape.
    Tensor { dtype: DType, shape: Vec<usize> },
    /// A fixed-arity sequence of values.
    Tuple(Vec<TypeSig>),
    /// An integer scalar (used for indices).
    Int,
    /// The unit value.
    Unit,
    /// Placeholder used inside arity-generic backward graphs, where the
    /// concrete types are not known until the graph is spliced at a call
    /// site. Never a valid cache key.
    Any,
}

impl TypeSig {
    /// A scalar (rank-0) tensor signature.
    pub fn scalar(dtype: DType) -> Self {
        TypeSig::Tensor {
            dtype,
            shape: Vec::new(),
        }
    }
}

impl fmt::Display for TypeSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSig::Tensor { dtype, shape } => write!(f, "{dtype}{shape:?}"),
            TypeSig::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
            TypeSig::Int => write!(f, "int"),
            TypeSig::Unit => write!(f, "unit"),
            TypeSig::Any => write!(f, "any"),
        }
    }
}
