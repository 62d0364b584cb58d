//! Shared test support: a small interpreter for computation graphs.
//!
//! The engine itself never executes anything, so the tests bring their
//! own evaluator to check that emitted gradient tapes compute the right
//! numbers.

use tapegrad::{Graph, GraphOp, NodeId, PrimOp, TensorValue, Value};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Evaluates the graph's output with the given positional arguments.
/// Parameters without a matching argument fall back to their default
/// value. Only nodes reachable from the output are evaluated.
pub fn eval(graph: &Graph, args: &[Value]) -> Value {
    let output = graph.output.expect("graph has no output");
    let mut memo: Vec<Option<Value>> = vec![None; graph.nodes.len()];
    eval_node(graph, output, args, &mut memo)
}

/// Evaluates every node of the graph in arena order. Used to produce the
/// concrete per-operation values a trace reports to a session.
pub fn eval_all(graph: &Graph, args: &[Value]) -> Vec<Value> {
    let mut memo: Vec<Option<Value>> = vec![None; graph.nodes.len()];
    (0..graph.nodes.len())
        .map(|i| eval_node(graph, NodeId(i), args, &mut memo))
        .collect()
}

fn eval_node(graph: &Graph, id: NodeId, args: &[Value], memo: &mut Vec<Option<Value>>) -> Value {
    if let Some(v) = &memo[id.0] {
        return v.clone();
    }
    let data = graph.node(id);
    let value = match &data.op {
        GraphOp::Param { default } => {
            let pos = graph
                .params
                .iter()
                .position(|p| *p == id)
                .expect("parameter not registered in its graph");
            match args.get(pos) {
                Some(v) => v.clone(),
                None => default
                    .clone()
                    .unwrap_or_else(|| panic!("no argument or default for parameter {pos}")),
            }
        }
        GraphOp::Const(v) => v.clone(),
        GraphOp::Primal(n) => panic!("unresolved primal reference to {n:?}"),
        GraphOp::Prim(op) => {
            let srcs: Vec<Value> = data
                .src
                .iter()
                .map(|s| eval_node(graph, *s, args, memo))
                .collect();
            eval_prim(*op, &srcs)
        }
        GraphOp::MakeTuple => Value::Tuple(
            data.src
                .iter()
                .map(|s| eval_node(graph, *s, args, memo))
                .collect(),
        ),
        GraphOp::TupleGetItem(i) => {
            let v = eval_node(graph, data.src[0], args, memo);
            v.tuple_get(*i)
                .unwrap_or_else(|| panic!("tuple index {i} out of range"))
                .clone()
        }
        GraphOp::Fill(fill) => {
            let v = eval_node(graph, data.src[0], args, memo);
            fill_like(&v, *fill)
        }
        GraphOp::UndefinedBackward => panic!("evaluated a placeholder backward"),
    };
    memo[id.0] = Some(value.clone());
    value
}

fn eval_prim(op: PrimOp, srcs: &[Value]) -> Value {
    match op {
        PrimOp::Add => match (&srcs[0], &srcs[1]) {
            (Value::Int(a), Value::Int(b)) => Value::Int(a + b),
            (a, b) => map2(a, b, |x, y| x + y),
        },
        PrimOp::Sub => map2(&srcs[0], &srcs[1], |x, y| x - y),
        PrimOp::Mul => map2(&srcs[0], &srcs[1], |x, y| x * y),
        PrimOp::Div => map2(&srcs[0], &srcs[1], |x, y| x / y),
        PrimOp::Less => map2(&srcs[0], &srcs[1], |x, y| if x < y { 1.0 } else { 0.0 }),
        PrimOp::Neg => map1(&srcs[0], |x| -x),
        PrimOp::Recip => map1(&srcs[0], |x| 1.0 / x),
        PrimOp::Exp => map1(&srcs[0], f64::exp),
        PrimOp::Log => map1(&srcs[0], f64::ln),
        PrimOp::Sin => map1(&srcs[0], f64::sin),
        PrimOp::Cos => map1(&srcs[0], f64::cos),
        PrimOp::Sqrt => map1(&srcs[0], f64::sqrt),
        PrimOp::StopGradient => srcs[0].clone(),
    }
}

fn map2(a: &Value, b: &Value, f: impl Fn(f64, f64) -> f64) -> Value {
    let (Value::Tensor(a), Value::Tensor(b)) = (a, b) else {
        panic!("elementwise binary op on non-tensor values");
    };
    assert_eq!(a.shape, b.shape, "shape mismatch in test evaluator");
    Value::Tensor(TensorValue {
        dtype: a.dtype,
        shape: a.shape.clone(),
        data: a.data.iter().zip(&b.data).map(|(x, y)| f(*x, *y)).collect(),
    })
}

fn map1(a: &Value, f: impl Fn(f64) -> f64) -> Value {
    let Value::Tensor(a) = a else {
        panic!("elementwise unary op on non-tensor value");
    };
    Value::Tensor(TensorValue {
        dtype: a.dtype,
        shape: a.shape.clone(),
        data: a.data.iter().map(|x| f(*x)).collect(),
    })
}

fn fill_like(v: &Value, fill: f64) -> Value {
    match v {
        Value::Tensor(t) => Value::Tensor(TensorValue::fill(t.shape.clone(), fill, t.dtype)),
        Value::Tuple(elems) => Value::Tuple(elems.iter().map(|e| fill_like(e, fill)).collect()),
        Value::Int(_) => Value::Int(fill as i64),
        Value::Unit => Value::Unit,
    }
}

/// The single element of a rank-0 tensor value.
pub fn scalar_of(v: &Value) -> f64 {
    let Value::Tensor(t) = v else {
        panic!("expected a tensor value, got {v:?}");
    };
    assert!(t.shape.is_empty(), "expected a rank-0 tensor");
    t.data[0]
}

pub fn assert_scalar(v: &Value, expected: f64) {
    let got = scalar_of(v);
    assert!(
        (got - expected).abs() < 1e-9,
        "expected {expected}, got {got}"
    );
}
