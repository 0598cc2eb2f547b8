// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Constant values carried by `Expression::Constant` and closure captures.

use std::hash::{Hash, Hasher};

use indexmap::IndexMap;

use crate::descriptor::ClosureDescriptor;
use crate::types::{MethodSig, PrimType, Type, TypeRef};

/// A constant runtime value.
///
/// Implements structural equality and hashing (floats compare by bit
/// pattern) so that closure descriptors, which embed captured values, can
/// key a reconstruction cache.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstValue {
    Null,
    Bool(bool),
    I8(i8),
    I16(i16),
    Char(char),
    I32(i32),
    I64(i64),
    F32(f32),
    F64(f64),
    Str(String),
    /// A synthetic capture wrapper: an object whose fields are captured
    /// literals. Reads against it are inlined during decode.
    Env(Box<CaptureEnv>),
    /// An opaque closure value awaiting resolution.
    Closure(Box<ClosureDescriptor>),
}

/// The field environment of a synthetic capture wrapper.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CaptureEnv {
    pub type_name: String,
    pub fields: IndexMap<String, ConstValue>,
}

impl CaptureEnv {
    pub fn new(type_name: impl Into<String>) -> Self {
        CaptureEnv { type_name: type_name.into(), fields: IndexMap::new() }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: ConstValue) -> Self {
        self.fields.insert(name.into(), value);
        self
    }
}

impl ConstValue {
    /// The statically known type of this value.
    pub fn ty(&self) -> Type {
        match self {
            ConstValue::Null => Type::Any,
            ConstValue::Bool(_) => Type::BOOL,
            ConstValue::I8(_) => Type::I8,
            ConstValue::I16(_) => Type::I16,
            ConstValue::Char(_) => Type::CHAR,
            ConstValue::I32(_) => Type::I32,
            ConstValue::I64(_) => Type::I64,
            ConstValue::F32(_) => Type::F32,
            ConstValue::F64(_) => Type::F64,
            ConstValue::Str(_) => Type::string(),
            ConstValue::Env(env) => Type::Object(TypeRef::synthetic(env.type_name.clone())),
            ConstValue::Closure(desc) => {
                let MethodSig { params, ret } = desc.exposed_sig();
                Type::Fn { params, ret: Box::new(ret) }
            }
        }
    }

    pub fn prim(&self) -> Option<PrimType> {
        self.ty().prim()
    }

    /// Integer view, for folding and widening.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConstValue::I8(v) => Some(*v as i64),
            ConstValue::I16(v) => Some(*v as i64),
            ConstValue::Char(v) => Some(*v as i64),
            ConstValue::I32(v) => Some(*v as i64),
            ConstValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    /// Floating view, also defined for integers (widening).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ConstValue::F32(v) => Some(*v as f64),
            ConstValue::F64(v) => Some(*v),
            other => other.as_i64().map(|v| v as f64),
        }
    }

    /// The zero/false value of a primitive type.
    pub fn zero_of(p: PrimType) -> ConstValue {
        match p {
            PrimType::Bool => ConstValue::Bool(false),
            PrimType::I8 => ConstValue::I8(0),
            PrimType::I16 => ConstValue::I16(0),
            PrimType::Char => ConstValue::Char('\0'),
            PrimType::I32 => ConstValue::I32(0),
            PrimType::I64 => ConstValue::I64(0),
            PrimType::F32 => ConstValue::F32(0.0),
            PrimType::F64 => ConstValue::F64(0.0),
        }
    }
}

impl PartialEq for ConstValue {
    fn eq(&self, other: &Self) -> bool {
        use ConstValue::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (I8(a), I8(b)) => a == b,
            (I16(a), I16(b)) => a == b,
            (Char(a), Char(b)) => a == b,
            (I32(a), I32(b)) => a == b,
            (I64(a), I64(b)) => a == b,
            (F32(a), F32(b)) => a.to_bits() == b.to_bits(),
            (F64(a), F64(b)) => a.to_bits() == b.to_bits(),
            (Str(a), Str(b)) => a == b,
            (Env(a), Env(b)) => a == b,
            (Closure(a), Closure(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for ConstValue {}

impl Hash for ConstValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            ConstValue::Null => {}
            ConstValue::Bool(v) => v.hash(state),
            ConstValue::I8(v) => v.hash(state),
            ConstValue::I16(v) => v.hash(state),
            ConstValue::Char(v) => v.hash(state),
            ConstValue::I32(v) => v.hash(state),
            ConstValue::I64(v) => v.hash(state),
            ConstValue::F32(v) => v.to_bits().hash(state),
            ConstValue::F64(v) => v.to_bits().hash(state),
            ConstValue::Str(v) => v.hash(state),
            ConstValue::Env(env) => {
                env.type_name.hash(state);
                for (k, v) in &env.fields {
                    k.hash(state);
                    v.hash(state);
                }
            }
            ConstValue::Closure(desc) => desc.hash(state),
        }
    }
}

impl std::fmt::Display for ConstValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConstValue::Null => write!(f, "null"),
            ConstValue::Bool(v) => write!(f, "{}", v),
            ConstValue::I8(v) => write!(f, "{}", v),
            ConstValue::I16(v) => write!(f, "{}", v),
            ConstValue::Char(v) => write!(f, "{:?}", v),
            ConstValue::I32(v) => write!(f, "{}", v),
            ConstValue::I64(v) => write!(f, "{}", v),
            ConstValue::F32(v) => write!(f, "{}", v),
            ConstValue::F64(v) => write!(f, "{}", v),
            ConstValue::Str(v) => write!(f, "{:?}", v),
            ConstValue::Env(env) => write!(f, "<captures of {}>", env.type_name),
            ConstValue::Closure(desc) => write!(f, "<closure {}.{}>", desc.owner, desc.method),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(ConstValue::F64(1.5), ConstValue::F64(1.5));
        assert_ne!(ConstValue::F64(0.0), ConstValue::F64(-0.0));
        // NaN equals itself under bit equality, which a cache key needs.
        assert_eq!(ConstValue::F64(f64::NAN), ConstValue::F64(f64::NAN));
    }

    #[test]
    fn env_value_types_as_synthetic_wrapper() {
        let env = CaptureEnv::new("acme/Fn$1").with_field("x", ConstValue::I32(7));
        let ty = ConstValue::Env(Box::new(env)).ty();
        assert!(ty.is_synthetic());
    }
}
