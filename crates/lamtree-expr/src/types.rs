// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type definitions and assignability rules.

use std::fmt;

/// A primitive value type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PrimType {
    Bool,
    I8,
    I16,
    Char,
    I32,
    I64,
    F32,
    F64,
}

impl PrimType {
    /// Whether values of this type occupy two consecutive local slots.
    pub fn is_wide(self) -> bool {
        matches!(self, PrimType::I64 | PrimType::F64)
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimType::I8 | PrimType::I16 | PrimType::Char | PrimType::I32 | PrimType::I64
        )
    }

    pub fn is_float(self) -> bool {
        matches!(self, PrimType::F32 | PrimType::F64)
    }

    pub fn is_numeric(self) -> bool {
        self != PrimType::Bool
    }

    /// Primitive widening: the fixed partial order
    /// i8 < i16 < i32 < i64 < f32 < f64, with char widening like i16.
    /// Bool widens to nothing.
    pub fn widens_to(self, to: PrimType) -> bool {
        use PrimType::*;
        match self {
            Bool => false,
            I8 => matches!(to, I16 | I32 | I64 | F32 | F64),
            I16 | Char => matches!(to, I32 | I64 | F32 | F64),
            I32 => matches!(to, I64 | F32 | F64),
            I64 => matches!(to, F32 | F64),
            F32 => matches!(to, F64),
            F64 => false,
        }
    }

    /// Numeric promotion for a binary operation over two primitives.
    pub fn promote(self, other: PrimType) -> PrimType {
        if self == other {
            return self;
        }
        if self.widens_to(other) {
            other
        } else {
            self
        }
    }
}

/// A named reference type. `synthetic` marks compiler-generated wrapper
/// classes that only exist to carry captured values; those never appear in
/// a finished tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeRef {
    pub name: String,
    pub synthetic: bool,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef { name: name.into(), synthetic: false }
    }

    pub fn synthetic(name: impl Into<String>) -> Self {
        TypeRef { name: name.into(), synthetic: true }
    }
}

/// A type in a reconstructed tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    /// Unboxed primitive
    Prim(PrimType),
    /// Boxed counterpart of a primitive
    Boxed(PrimType),
    /// Named reference type
    Object(TypeRef),
    /// Array of an element type
    Array(Box<Type>),
    /// Function type of a closure value
    Fn { params: Vec<Type>, ret: Box<Type> },
    /// The universal base type; every value boxes into it
    Any,
    /// No value
    Void,
}

impl Type {
    pub const BOOL: Type = Type::Prim(PrimType::Bool);
    pub const I8: Type = Type::Prim(PrimType::I8);
    pub const I16: Type = Type::Prim(PrimType::I16);
    pub const CHAR: Type = Type::Prim(PrimType::Char);
    pub const I32: Type = Type::Prim(PrimType::I32);
    pub const I64: Type = Type::Prim(PrimType::I64);
    pub const F32: Type = Type::Prim(PrimType::F32);
    pub const F64: Type = Type::Prim(PrimType::F64);

    pub fn string() -> Type {
        Type::Object(TypeRef::named("string"))
    }

    pub fn prim(&self) -> Option<PrimType> {
        match self {
            Type::Prim(p) | Type::Boxed(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_bool(&self) -> bool {
        self.prim() == Some(PrimType::Bool)
    }

    pub fn is_synthetic(&self) -> bool {
        matches!(self, Type::Object(r) if r.synthetic)
    }

    /// Whether a value of `from` is assignable to `self` without an explicit
    /// conversion node: identity, primitive widening, box/unbox (combined
    /// with widening when the target is unboxed), or boxing into `Any`.
    ///
    /// Reference types carry no subtype knowledge here, so they accept only
    /// themselves; a boxed target never accepts a wider-than-identity
    /// primitive (widening happens before boxing, not after).
    pub fn accepts(&self, from: &Type) -> bool {
        if self == from {
            return true;
        }
        match (self, from) {
            (Type::Any, Type::Void) => false,
            (Type::Any, _) => true,
            (Type::Prim(a), Type::Prim(b)) | (Type::Prim(a), Type::Boxed(b)) => {
                a == b || b.widens_to(*a)
            }
            (Type::Boxed(a), Type::Prim(b)) => a == b,
            (Type::Fn { params: ap, ret: ar }, Type::Fn { params: bp, ret: br }) => {
                ap == bp && ar.accepts(br)
            }
            _ => false,
        }
    }
}

impl fmt::Display for PrimType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PrimType::Bool => "bool",
            PrimType::I8 => "i8",
            PrimType::I16 => "i16",
            PrimType::Char => "char",
            PrimType::I32 => "i32",
            PrimType::I64 => "i64",
            PrimType::F32 => "f32",
            PrimType::F64 => "f64",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Prim(p) => write!(f, "{}", p),
            Type::Boxed(p) => write!(f, "Boxed<{}>", p),
            Type::Object(r) => write!(f, "{}", r.name),
            Type::Array(elem) => write!(f, "[{}]", elem),
            Type::Fn { params, ret } => {
                write!(f, "fn(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", p)?;
                }
                write!(f, ") -> {}", ret)
            }
            Type::Any => write!(f, "any"),
            Type::Void => write!(f, "void"),
        }
    }
}

/// An operation signature: ordered parameter types plus a result type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodSig {
    pub params: Vec<Type>,
    pub ret: Type,
}

impl MethodSig {
    pub fn new(params: Vec<Type>, ret: Type) -> Self {
        MethodSig { params, ret }
    }
}

impl fmt::Display for MethodSig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", p)?;
        }
        write!(f, ") -> {}", self.ret)
    }
}
