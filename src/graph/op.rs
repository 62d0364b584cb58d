use crate::graph::{node::NodeId, value::Value};

/// Primitive elementwise operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimOp {
    Add,
    Sub,
    Mul,
    Div,
    Neg,
    Recip,
    Exp,
    Log,
    Sin,
    Cos,
    Sqrt,
    /// Comparison; carries no registered backward.
    Less,
    /// Gradient barrier. Forwards its operand unchanged and cuts gradient
    /// flow through it.
    StopGradient,
}

impl PrimOp {
    pub fn name(&self) -> &'static str {
        match self {
            PrimOp::Add => "add",
            PrimOp::Sub => "sub",
            PrimOp::Mul => "mul",
            PrimOp::Div => "div",
            PrimOp::Neg => "neg",
            PrimOp::Recip => "recip",
            PrimOp::Exp => "exp",
            PrimOp::Log => "log",
            PrimOp::Sin => "sin",
            PrimOp::Cos => "cos",
            PrimOp::Sqrt => "sqrt",
            PrimOp::Less => "less",
            PrimOp::StopGradient => "stop_gradient",
        }
    }

    /// Number of operands the operation expects.
    pub fn arity(&self) -> usize {
        match self {
            PrimOp::Add | PrimOp::Sub | PrimOp::Mul | PrimOp::Div | PrimOp::Less => 2,
            _ => 1,
        }
    }

    /// Whether this operation is a designated gradient barrier.
    pub fn is_barrier(&self) -> bool {
        matches!(self, PrimOp::StopGradient)
    }
}

/// An enumeration of all possible graph node operations.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphOp {
    /// A graph parameter, optionally carrying a default/initial value.
    Param { default: Option<Value> },
    /// A literal constant.
    Const(Value),
    /// A reference from a gradient tape back to a node of the traced
    /// forward graph. Eliminated by the final substitution pass.
    Primal(NodeId),
    /// A primitive elementwise operation.
    Prim(PrimOp),
    /// Sequence construction.
    MakeTuple,
    /// Sequence projection at a fixed index.
    TupleGetItem(usize),
    /// A value shaped like the single operand, filled with a constant.
    Fill(f64),
    /// Inert sentinel standing in for a missing backward definition.
    UndefinedBackward,
}

impl GraphOp {
    /// Whether the node applies an operation to operands, as opposed to
    /// being a leaf (parameter, constant, primal reference, sentinel).
    pub fn is_operation(&self) -> bool {
        matches!(
            self,
            GraphOp::Prim(_) | GraphOp::MakeTuple | GraphOp::TupleGetItem(_) | GraphOp::Fill(_)
        )
    }

    /// Whether the node is a structural (sequence) operation.
    pub fn is_structural(&self) -> bool {
        matches!(self, GraphOp::MakeTuple | GraphOp::TupleGetItem(_))
    }

    pub fn is_const(&self) -> bool {
        matches!(self, GraphOp::Const(_))
    }

    pub fn is_param(&self) -> bool {
        matches!(self, GraphOp::Param { .. })
    }

    pub fn is_barrier(&self) -> bool {
        matches!(self, GraphOp::Prim(p) if p.is_barrier())
    }
}
