// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The evaluation walk.

use lamtree_expr::{BinOp, Expression, LambdaTree, PrimType, Type, UnaryOp};

use crate::value::{ClosureValue, Value};

#[derive(Debug, thiserror::Error)]
pub enum EvalError {
    #[error("wrong number of arguments: expected {expected}, got {got}")]
    Arity { expected: usize, got: usize },

    #[error("integer division by zero")]
    DivisionByZero,

    /// The tree references a host object the evaluator cannot see.
    #[error("opaque host reference: {0}")]
    Opaque(String),

    #[error("type error: {0}")]
    Type(String),
}

fn type_err(msg: impl Into<String>) -> EvalError {
    EvalError::Type(msg.into())
}

/// Apply a reconstructed tree to argument values.
pub fn evaluate(tree: &LambdaTree, args: &[Value]) -> Result<Value, EvalError> {
    if args.len() != tree.params.len() {
        return Err(EvalError::Arity { expected: tree.params.len(), got: args.len() });
    }
    eval(&tree.body, args)
}

fn eval(e: &Expression, env: &[Value]) -> Result<Value, EvalError> {
    match e {
        Expression::Constant { value, .. } => Value::from_const(value)
            .ok_or_else(|| EvalError::Opaque(format!("constant {value}"))),
        Expression::Parameter { index, .. } => env
            .get(*index)
            .cloned()
            .ok_or_else(|| type_err(format!("unbound parameter p{index}"))),
        Expression::Unary { op, operand, .. } => unary(op, eval(operand, env)?),
        Expression::Binary { op, left, right, .. } => binary(*op, left, right, env),
        Expression::Member { member, .. } => {
            Err(EvalError::Opaque(format!("{}.{}", member.owner, member.name)))
        }
        Expression::Invocation { target, args, .. } => {
            let callee = match eval(target, env)? {
                Value::Closure(c) => c,
                other => return Err(type_err(format!("cannot invoke a {}", other.kind()))),
            };
            let mut bound = callee.bound;
            for a in args {
                bound.push(eval(a, env)?);
            }
            apply(callee.tree, bound)
        }
        Expression::Lambda(tree) => {
            Ok(Value::Closure(ClosureValue { tree: tree.clone(), bound: Vec::new() }))
        }
        Expression::Delegate { target, .. } => match eval(target, env)? {
            v @ Value::Closure(_) => Ok(v),
            other => Err(type_err(format!("delegate bound to a {}", other.kind()))),
        },
        Expression::Conditional { test, if_true, if_false, .. } => {
            let t = eval(test, env)?
                .as_bool()
                .ok_or_else(|| type_err("conditional test is not a bool"))?;
            eval(if t { if_true } else { if_false }, env)
        }
    }
}

fn apply(tree: std::sync::Arc<LambdaTree>, bound: Vec<Value>) -> Result<Value, EvalError> {
    match bound.len().cmp(&tree.params.len()) {
        std::cmp::Ordering::Less => Ok(Value::Closure(ClosureValue { tree, bound })),
        std::cmp::Ordering::Equal => evaluate(&tree, &bound),
        std::cmp::Ordering::Greater => {
            Err(EvalError::Arity { expected: tree.params.len(), got: bound.len() })
        }
    }
}

fn unary(op: &UnaryOp, v: Value) -> Result<Value, EvalError> {
    match op {
        UnaryOp::Neg => match v {
            Value::Int(n) => Ok(Value::Int(n.wrapping_neg())),
            Value::Float(f) => Ok(Value::Float(-f)),
            other => Err(type_err(format!("cannot negate a {}", other.kind()))),
        },
        UnaryOp::Not => match v {
            Value::Bool(b) => Ok(Value::Bool(!b)),
            other => Err(type_err(format!("cannot logically negate a {}", other.kind()))),
        },
        UnaryOp::Convert(to) => convert(v, to),
        UnaryOp::IsNull => Ok(Value::Bool(matches!(v, Value::Null))),
        UnaryOp::InstanceOf(ty) => instance_of(&v, ty),
        UnaryOp::ArrayLength => Err(EvalError::Opaque("array length of a host array".into())),
    }
}

fn convert(v: Value, to: &Type) -> Result<Value, EvalError> {
    let p = match to.prim() {
        Some(p) => p,
        None => return Ok(v), // reference conversions are identity here
    };
    match p {
        PrimType::Bool => v
            .as_bool()
            .map(Value::Bool)
            .ok_or_else(|| type_err(format!("cannot convert {} to bool", v.kind()))),
        PrimType::I8 => int_conv(v, |n| n as i8 as i64),
        PrimType::I16 => int_conv(v, |n| n as i16 as i64),
        PrimType::Char => int_conv(v, |n| n as u16 as i64),
        PrimType::I32 => int_conv(v, |n| n as i32 as i64),
        PrimType::I64 => int_conv(v, |n| n),
        PrimType::F32 => v
            .as_float()
            .map(|f| Value::Float(f as f32 as f64))
            .ok_or_else(|| type_err(format!("cannot convert {} to f32", v.kind()))),
        PrimType::F64 => v
            .as_float()
            .map(Value::Float)
            .ok_or_else(|| type_err(format!("cannot convert {} to f64", v.kind()))),
    }
}

fn int_conv(v: Value, f: impl Fn(i64) -> i64) -> Result<Value, EvalError> {
    match v {
        Value::Int(n) => Ok(Value::Int(f(n))),
        Value::Float(x) => Ok(Value::Int(f(x as i64))),
        other => Err(type_err(format!("cannot convert {} to an integer", other.kind()))),
    }
}

fn instance_of(v: &Value, ty: &Type) -> Result<Value, EvalError> {
    let hit = match (v, ty) {
        (Value::Null, _) => false,
        (_, Type::Any) => true,
        (Value::Bool(_), t) => t.is_bool(),
        (Value::Int(_), Type::Prim(p) | Type::Boxed(p)) => p.is_integer(),
        (Value::Float(_), Type::Prim(p) | Type::Boxed(p)) => p.is_float(),
        (Value::Str(_), t) => *t == Type::string(),
        (Value::Closure(_), Type::Fn { .. }) => true,
        _ => return Err(EvalError::Opaque(format!("instance test against {ty}"))),
    };
    Ok(Value::Bool(hit))
}

fn binary(
    op: BinOp,
    left: &Expression,
    right: &Expression,
    env: &[Value],
) -> Result<Value, EvalError> {
    // Short-circuit operators evaluate the right side lazily.
    match op {
        BinOp::LogicalAnd => {
            let l = eval_bool(left, env)?;
            return if l { Ok(Value::Bool(eval_bool(right, env)?)) } else { Ok(Value::Bool(false)) };
        }
        BinOp::LogicalOr => {
            let l = eval_bool(left, env)?;
            return if l { Ok(Value::Bool(true)) } else { Ok(Value::Bool(eval_bool(right, env)?)) };
        }
        BinOp::ArrayIndex => {
            return Err(EvalError::Opaque("indexing into a host array".into()));
        }
        _ => {}
    }

    let l = eval(left, env)?;
    let r = eval(right, env)?;

    if op.is_comparison() {
        return compare(op, &l, &r);
    }

    match (&l, &r) {
        (Value::Int(a), Value::Int(b)) => int_arith(op, *a, *b),
        _ => {
            let (a, b) = (
                l.as_float().ok_or_else(|| type_err(format!("{} in arithmetic", l.kind())))?,
                r.as_float().ok_or_else(|| type_err(format!("{} in arithmetic", r.kind())))?,
            );
            float_arith(op, a, b)
        }
    }
}

fn eval_bool(e: &Expression, env: &[Value]) -> Result<bool, EvalError> {
    eval(e, env)?.as_bool().ok_or_else(|| type_err("logical operand is not a bool"))
}

fn int_arith(op: BinOp, a: i64, b: i64) -> Result<Value, EvalError> {
    Ok(Value::Int(match op {
        BinOp::Add => a.wrapping_add(b),
        BinOp::Sub => a.wrapping_sub(b),
        BinOp::Mul => a.wrapping_mul(b),
        BinOp::Div => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.wrapping_div(b)
        }
        BinOp::Rem => {
            if b == 0 {
                return Err(EvalError::DivisionByZero);
            }
            a.wrapping_rem(b)
        }
        BinOp::And => a & b,
        BinOp::Or => a | b,
        BinOp::Xor => a ^ b,
        BinOp::Shl => a.wrapping_shl(b as u32),
        BinOp::Shr => a.wrapping_shr(b as u32),
        BinOp::Ushr => ((a as u64).wrapping_shr(b as u32)) as i64,
        other => return Err(type_err(format!("{other:?} over integers"))),
    }))
}

fn float_arith(op: BinOp, a: f64, b: f64) -> Result<Value, EvalError> {
    Ok(Value::Float(match op {
        BinOp::Add => a + b,
        BinOp::Sub => a - b,
        BinOp::Mul => a * b,
        BinOp::Div => a / b,
        BinOp::Rem => a % b,
        other => return Err(type_err(format!("{other:?} over floats"))),
    }))
}

fn compare(op: BinOp, l: &Value, r: &Value) -> Result<Value, EvalError> {
    // Equality is defined across all value kinds; ordering only over
    // numbers.
    if matches!(op, BinOp::Eq | BinOp::Ne) {
        let eq = match (l, r) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            _ => match (l.as_float(), r.as_float()) {
                (Some(a), Some(b)) => a == b,
                _ => return Err(type_err(format!("{} == {}", l.kind(), r.kind()))),
            },
        };
        return Ok(Value::Bool(if op == BinOp::Eq { eq } else { !eq }));
    }

    let ord = match (l, r) {
        (Value::Int(a), Value::Int(b)) => a.partial_cmp(b),
        _ => match (l.as_float(), r.as_float()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => return Err(type_err(format!("ordering {} against {}", l.kind(), r.kind()))),
        },
    };
    let hit = match ord {
        Some(ord) => match op {
            BinOp::Lt => ord.is_lt(),
            BinOp::Le => ord.is_le(),
            BinOp::Gt => ord.is_gt(),
            BinOp::Ge => ord.is_ge(),
            _ => false,
        },
        // NaN compares false against everything.
        None => false,
    };
    Ok(Value::Bool(hit))
}
