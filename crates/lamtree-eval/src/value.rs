// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Runtime values of the evaluator.

use std::fmt;
use std::sync::Arc;

use lamtree_expr::{ConstValue, LambdaTree};

/// A closure value: a tree plus the arguments a partial application has
/// already bound.
#[derive(Debug, Clone)]
pub struct ClosureValue {
    pub tree: Arc<LambdaTree>,
    pub bound: Vec<Value>,
}

/// An evaluated value. Integers evaluate in 64 bits and floats in double
/// precision; explicit conversion nodes narrow where the tree asks for it.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    Closure(ClosureValue),
}

impl Value {
    pub fn from_const(v: &ConstValue) -> Option<Value> {
        Some(match v {
            ConstValue::Null => Value::Null,
            ConstValue::Bool(b) => Value::Bool(*b),
            ConstValue::I8(n) => Value::Int(i64::from(*n)),
            ConstValue::I16(n) => Value::Int(i64::from(*n)),
            ConstValue::Char(c) => Value::Int(i64::from(u32::from(*c))),
            ConstValue::I32(n) => Value::Int(i64::from(*n)),
            ConstValue::I64(n) => Value::Int(*n),
            ConstValue::F32(f) => Value::Float(f64::from(*f)),
            ConstValue::F64(f) => Value::Float(*f),
            ConstValue::Str(s) => Value::Str(s.clone()),
            // Capture wrappers and unresolved closures never survive into
            // a finished tree.
            ConstValue::Env(_) | ConstValue::Closure(_) => return None,
        })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(n) => Some(*n as f64),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Closure(_) => "closure",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(x) => write!(f, "{}", x),
            Value::Str(s) => write!(f, "{:?}", s),
            Value::Closure(c) => write!(f, "{}", c.tree),
        }
    }
}
