//! Concrete values carried through a trace.
//!
//! The engine never executes kernels; values exist so that adjoints can
//! remember the concrete inputs and outputs of each traced operation and
//! embed them as constants in the gradient tape.

use crate::graph::signature::{DType, TypeSig};

/// A dense tensor value.
#[derive(Debug, Clone, PartialEq)]
pub struct TensorValue {
    pub dtype: DType,
    pub shape: Vec<usize>,
    pub data: Vec<f64>,
}

impl TensorValue {
    /// A rank-0 tensor holding a single element.
    pub fn scalar(value: f64, dtype: DType) -> Self {
        TensorValue {
            dtype,
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// A tensor of the given shape with every element set to `value`.
    pub fn fill(shape: Vec<usize>, value: f64, dtype: DType) -> Self {
        let len = shape.iter().product();
        TensorValue {
            dtype,
            shape,
            data: vec![value; len],
        }
    }
}

/// A concrete value flowing through a traced graph.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Tensor(TensorValue),
    Tuple(Vec<Value>),
    Int(i64),
    Unit,
}

impl Value {
    /// A scalar f32 tensor value. Convenience for tests and examples.
    pub fn scalar(value: f64) -> Self {
        Value::Tensor(TensorValue::scalar(value, DType::F32))
    }

    /// The abstract type signature of this value.
    pub fn signature(&self) -> TypeSig {
        match self {
            Value::Tensor(t) => TypeSig::Tensor {
                dtype: t.dtype,
                shape: t.shape.clone(),
            },
            Value::Tuple(elems) => TypeSig::Tuple(elems.iter().map(Value::signature).collect()),
            Value::Int(_) => TypeSig::Int,
            Value::Unit => TypeSig::Unit,
        }
    }

    /// Copy of this value with its own buffers.
    ///
    /// Adjoints store copies of the caller's values so that later mutation
    /// of a traced tensor cannot alias the engine's bookkeeping.
    pub fn shallow_copy(&self) -> Value {
        match self {
            Value::Tensor(t) => Value::Tensor(t.clone()),
            Value::Tuple(elems) => Value::Tuple(elems.iter().map(Value::shallow_copy).collect()),
            other => other.clone(),
        }
    }

    /// The elements of this value, if it is a sequence.
    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(elems) => Some(elems),
            _ => None,
        }
    }

    /// Element at `index`, if this is a sequence and the index is in range.
    pub fn tuple_get(&self, index: usize) -> Option<&Value> {
        self.as_tuple().and_then(|elems| elems.get(index))
    }
}
