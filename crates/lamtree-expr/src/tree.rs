// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The reconstructed closure tree.

use std::fmt;

use crate::expr::Expression;
use crate::types::Type;

/// A formal parameter of a reconstructed closure.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub index: usize,
    pub ty: Type,
}

/// A fully reconstructed closure: ordered parameters, a single body
/// expression, and the declared result type. Immutable once built and
/// safe to share across threads behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct LambdaTree {
    pub params: Vec<Param>,
    pub body: Expression,
    pub result_type: Type,
}

impl LambdaTree {
    pub fn new(params: Vec<Param>, body: Expression, result_type: Type) -> Self {
        LambdaTree { params, body, result_type }
    }

    /// The function type this tree denotes.
    pub fn fn_type(&self) -> Type {
        Type::Fn {
            params: self.params.iter().map(|p| p.ty.clone()).collect(),
            ret: Box::new(self.result_type.clone()),
        }
    }
}

impl fmt::Display for LambdaTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{(")?;
        for (i, p) in self.params.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} p{}", p.ty, p.index)?;
        }
        write!(f, ") -> {}}}", self.body)
    }
}
