// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression nodes and their smart constructors.
//!
//! Nodes are immutable once built and carry their result type from
//! construction. The constructors do the small amount of algebra the
//! branch reducer relies on: numeric promotion, constant folding of
//! arithmetic and negation, comparison flipping under logical not, and
//! the boolean simplification of conditionals that turns branch shapes
//! back into `&&`/`||`.

use std::fmt;
use std::sync::Arc;

use crate::tree::LambdaTree;
use crate::types::{PrimType, Type};
use crate::value::ConstValue;

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    // Bitwise / shifts
    And,
    Or,
    Xor,
    Shl,
    Shr,
    Ushr,
    // Comparison
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    // Short-circuit logical
    LogicalAnd,
    LogicalOr,
    // Array element read
    ArrayIndex,
}

impl BinOp {
    pub fn is_comparison(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    /// The comparison with the opposite truth value, used when a logical
    /// not is pushed into a comparison node.
    pub fn negated(self) -> Option<BinOp> {
        Some(match self {
            BinOp::Eq => BinOp::Ne,
            BinOp::Ne => BinOp::Eq,
            BinOp::Lt => BinOp::Ge,
            BinOp::Ge => BinOp::Lt,
            BinOp::Gt => BinOp::Le,
            BinOp::Le => BinOp::Gt,
            _ => return None,
        })
    }

    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::And => "&",
            BinOp::Or => "|",
            BinOp::Xor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Ushr => ">>>",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
            BinOp::LogicalAnd => "&&",
            BinOp::LogicalOr => "||",
            BinOp::ArrayIndex => "[]",
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, PartialEq)]
pub enum UnaryOp {
    /// Arithmetic negation
    Neg,
    /// Logical not
    Not,
    /// Explicit numeric/boxing conversion to the carried type
    Convert(Type),
    /// Runtime type test
    InstanceOf(Type),
    /// Null test
    IsNull,
    /// Array length read
    ArrayLength,
}

/// What kind of member a `MemberRef` names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Field,
    Method,
    Constructor,
}

/// A reference to a member of a named type.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberRef {
    pub owner: String,
    pub name: String,
    pub kind: MemberKind,
}

impl MemberRef {
    pub fn field(owner: impl Into<String>, name: impl Into<String>) -> Self {
        MemberRef { owner: owner.into(), name: name.into(), kind: MemberKind::Field }
    }

    pub fn method(owner: impl Into<String>, name: impl Into<String>) -> Self {
        MemberRef { owner: owner.into(), name: name.into(), kind: MemberKind::Method }
    }

    pub fn constructor(owner: impl Into<String>) -> Self {
        MemberRef { owner: owner.into(), name: "<init>".into(), kind: MemberKind::Constructor }
    }
}

/// A reconstructed expression. Closed: the decoder, reducer, coercion
/// engine and evaluator all match exhaustively over these variants.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Constant {
        value: ConstValue,
        ty: Type,
    },
    Parameter {
        index: usize,
        ty: Type,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
        ty: Type,
    },
    Binary {
        op: BinOp,
        left: Box<Expression>,
        right: Box<Expression>,
        ty: Type,
    },
    /// A field read, method reference or constructor; invocable members
    /// are wrapped in `Invocation` to apply them.
    Member {
        instance: Option<Box<Expression>>,
        member: MemberRef,
        param_types: Vec<Type>,
        ty: Type,
    },
    Invocation {
        target: Box<Expression>,
        args: Vec<Expression>,
        ty: Type,
    },
    Lambda(Arc<LambdaTree>),
    /// An invocable standing for "the lambda bound to this inner
    /// expression", produced when a captured closure is spliced in.
    Delegate {
        target: Box<Expression>,
        param_types: Vec<Type>,
        ty: Type,
    },
    Conditional {
        test: Box<Expression>,
        if_true: Box<Expression>,
        if_false: Box<Expression>,
        ty: Type,
    },
}

impl Expression {
    pub fn result_type(&self) -> Type {
        match self {
            Expression::Constant { ty, .. }
            | Expression::Parameter { ty, .. }
            | Expression::Unary { ty, .. }
            | Expression::Binary { ty, .. }
            | Expression::Member { ty, .. }
            | Expression::Invocation { ty, .. }
            | Expression::Delegate { ty, .. }
            | Expression::Conditional { ty, .. } => ty.clone(),
            Expression::Lambda(tree) => tree.fn_type(),
        }
    }

    /// A constant typed by its value.
    pub fn constant(value: ConstValue) -> Expression {
        let ty = value.ty();
        Expression::Constant { value, ty }
    }

    /// A constant with an explicit type (e.g. a re-typed literal).
    pub fn constant_typed(value: ConstValue, ty: Type) -> Expression {
        Expression::Constant { value, ty }
    }

    pub fn parameter(index: usize, ty: Type) -> Expression {
        Expression::Parameter { index, ty }
    }

    /// Binary node with numeric promotion; comparisons yield bool.
    /// Two numeric literals fold immediately.
    pub fn binary(op: BinOp, left: Expression, right: Expression) -> Expression {
        let ty = if op.is_comparison() || matches!(op, BinOp::LogicalAnd | BinOp::LogicalOr) {
            Type::BOOL
        } else if op == BinOp::ArrayIndex {
            match left.result_type() {
                Type::Array(elem) => *elem,
                other => other,
            }
        } else {
            match (left.result_type().prim(), right.result_type().prim()) {
                (Some(a), Some(b)) => Type::Prim(a.promote(b)),
                _ => left.result_type(),
            }
        };

        if let Some(folded) = fold_binary(op, &left, &right, &ty) {
            return Expression::Constant { value: folded, ty };
        }

        Expression::Binary { op, left: Box::new(left), right: Box::new(right), ty }
    }

    /// Arithmetic negation; literal operands fold.
    pub fn negate(operand: Expression) -> Expression {
        if let Expression::Constant { value, ty } = &operand {
            let folded = match value {
                ConstValue::I32(v) => Some(ConstValue::I32(v.wrapping_neg())),
                ConstValue::I64(v) => Some(ConstValue::I64(v.wrapping_neg())),
                ConstValue::F32(v) => Some(ConstValue::F32(-v)),
                ConstValue::F64(v) => Some(ConstValue::F64(-v)),
                _ => None,
            };
            if let Some(value) = folded {
                return Expression::Constant { value, ty: ty.clone() };
            }
        }
        let ty = operand.result_type();
        Expression::Unary { op: UnaryOp::Neg, operand: Box::new(operand), ty }
    }

    /// Logical not. Unwraps double negation, flips comparisons, folds
    /// boolean literals.
    pub fn logical_not(e: Expression) -> Expression {
        match e {
            Expression::Unary { op: UnaryOp::Not, operand, .. } => *operand,
            Expression::Constant { value: ConstValue::Bool(b), ty } => {
                Expression::Constant { value: ConstValue::Bool(!b), ty }
            }
            Expression::Binary { op, left, right, ty } => match op.negated() {
                Some(flipped) => Expression::Binary { op: flipped, left, right, ty },
                None => Expression::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(Expression::Binary { op, left, right, ty }),
                    ty: Type::BOOL,
                },
            },
            other => {
                Expression::Unary { op: UnaryOp::Not, operand: Box::new(other), ty: Type::BOOL }
            }
        }
    }

    pub fn logical_and(left: Expression, right: Expression) -> Expression {
        // !a && !b is !(a || b); keeps fused short-circuit tests flat.
        if let (
            Expression::Unary { op: UnaryOp::Not, operand: a, .. },
            Expression::Unary { op: UnaryOp::Not, operand: b, .. },
        ) = (&left, &right)
        {
            let inner = Expression::binary(BinOp::LogicalOr, (**a).clone(), (**b).clone());
            return Expression::logical_not(inner);
        }
        Expression::binary(BinOp::LogicalAnd, left, right)
    }

    pub fn logical_or(left: Expression, right: Expression) -> Expression {
        if let (
            Expression::Unary { op: UnaryOp::Not, operand: a, .. },
            Expression::Unary { op: UnaryOp::Not, operand: b, .. },
        ) = (&left, &right)
        {
            let inner = Expression::binary(BinOp::LogicalAnd, (**a).clone(), (**b).clone());
            return Expression::logical_not(inner);
        }
        Expression::binary(BinOp::LogicalOr, left, right)
    }

    /// Conditional node. When the branches are boolean literals the node
    /// simplifies to a logical form; this is what fuses the two tests of a
    /// short-circuit `&&`/`||` into one composite expression.
    pub fn conditional(test: Expression, if_true: Expression, if_false: Expression) -> Expression {
        if if_true.result_type().is_bool() && if_false.result_type().is_bool() {
            match (bool_literal(&if_true), bool_literal(&if_false)) {
                (Some(true), Some(false)) => return test,
                (Some(false), Some(true)) => return Expression::logical_not(test),
                (Some(true), None) => return Expression::logical_or(test, if_false),
                (Some(false), None) => {
                    return Expression::logical_and(Expression::logical_not(test), if_false)
                }
                (None, Some(false)) => return Expression::logical_and(test, if_true),
                (None, Some(true)) => {
                    return Expression::logical_or(Expression::logical_not(test), if_true)
                }
                _ => {}
            }
        }
        let ty = if_true.result_type();
        Expression::Conditional {
            test: Box::new(test),
            if_true: Box::new(if_true),
            if_false: Box::new(if_false),
            ty,
        }
    }

    pub fn is_null(operand: Expression) -> Expression {
        Expression::Unary { op: UnaryOp::IsNull, operand: Box::new(operand), ty: Type::BOOL }
    }

    pub fn instance_of(operand: Expression, target: Type) -> Expression {
        Expression::Unary {
            op: UnaryOp::InstanceOf(target),
            operand: Box::new(operand),
            ty: Type::BOOL,
        }
    }

    pub fn convert(operand: Expression, to: Type) -> Expression {
        Expression::Unary { op: UnaryOp::Convert(to.clone()), operand: Box::new(operand), ty: to }
    }

    /// Apply an invocable. Applying fewer arguments than the target's
    /// parameters yields a partial application typed as the remaining
    /// function.
    pub fn invoke(target: Expression, args: Vec<Expression>) -> Expression {
        let ty = invocation_type(&target, args.len());
        Expression::Invocation { target: Box::new(target), args, ty }
    }
}

fn bool_literal(e: &Expression) -> Option<bool> {
    match e {
        Expression::Constant { value: ConstValue::Bool(b), .. } => Some(*b),
        _ => None,
    }
}

fn invocation_type(target: &Expression, argc: usize) -> Type {
    match target {
        Expression::Lambda(tree) => {
            if argc < tree.params.len() {
                Type::Fn {
                    params: tree.params[argc..].iter().map(|p| p.ty.clone()).collect(),
                    ret: Box::new(tree.result_type.clone()),
                }
            } else {
                tree.result_type.clone()
            }
        }
        Expression::Member { ty, .. } | Expression::Delegate { ty, .. } => ty.clone(),
        other => match other.result_type() {
            Type::Fn { params, ret } if argc < params.len() => {
                Type::Fn { params: params[argc..].to_vec(), ret }
            }
            Type::Fn { ret, .. } => *ret,
            other_ty => other_ty,
        },
    }
}

/// Fold arithmetic over two numeric literals in the promoted type.
/// Integer division by zero is left unfolded and fails at evaluation.
fn fold_binary(op: BinOp, left: &Expression, right: &Expression, ty: &Type) -> Option<ConstValue> {
    let (Expression::Constant { value: lv, .. }, Expression::Constant { value: rv, .. }) =
        (left, right)
    else {
        return None;
    };
    let prim = ty.prim()?;
    if !prim.is_numeric() {
        return None;
    }
    if prim.is_float() {
        let (a, b) = (lv.as_f64()?, rv.as_f64()?);
        let v = match op {
            BinOp::Add => a + b,
            BinOp::Sub => a - b,
            BinOp::Mul => a * b,
            BinOp::Div => a / b,
            BinOp::Rem => a % b,
            _ => return None,
        };
        Some(if prim == PrimType::F32 { ConstValue::F32(v as f32) } else { ConstValue::F64(v) })
    } else {
        let (a, b) = (lv.as_i64()?, rv.as_i64()?);
        let v = match op {
            BinOp::Add => a.wrapping_add(b),
            BinOp::Sub => a.wrapping_sub(b),
            BinOp::Mul => a.wrapping_mul(b),
            BinOp::Div if b != 0 => a.wrapping_div(b),
            BinOp::Rem if b != 0 => a.wrapping_rem(b),
            BinOp::And => a & b,
            BinOp::Or => a | b,
            BinOp::Xor => a ^ b,
            _ => return None,
        };
        Some(match prim {
            PrimType::I32 => ConstValue::I32(v as i32),
            PrimType::I64 => ConstValue::I64(v),
            _ => return None,
        })
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Constant { value, .. } => write!(f, "{}", value),
            Expression::Parameter { index, .. } => write!(f, "p{}", index),
            Expression::Unary { op, operand, .. } => match op {
                UnaryOp::Neg => write!(f, "-{}", operand),
                UnaryOp::Not => write!(f, "!{}", operand),
                UnaryOp::Convert(to) => write!(f, "({}){}", to, operand),
                UnaryOp::InstanceOf(t) => write!(f, "({} instanceof {})", operand, t),
                UnaryOp::IsNull => write!(f, "({} == null)", operand),
                UnaryOp::ArrayLength => write!(f, "{}.length", operand),
            },
            Expression::Binary { op: BinOp::ArrayIndex, left, right, .. } => {
                write!(f, "{}[{}]", left, right)
            }
            Expression::Binary { op, left, right, .. } => {
                write!(f, "({} {} {})", left, op.symbol(), right)
            }
            Expression::Member { instance, member, .. } => {
                if let Some(instance) = instance {
                    write!(f, "{}.{}", instance, member.name)
                } else {
                    write!(f, "{}.{}", member.owner, member.name)
                }
            }
            Expression::Invocation { target, args, .. } => {
                write!(f, "{}(", target)?;
                for (i, a) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", a)?;
                }
                write!(f, ")")
            }
            Expression::Lambda(tree) => write!(f, "{}", tree),
            Expression::Delegate { target, .. } => write!(f, "delegate({})", target),
            Expression::Conditional { test, if_true, if_false, .. } => {
                write!(f, "({} ? {} : {})", test, if_true, if_false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(i: usize, ty: Type) -> Expression {
        Expression::parameter(i, ty)
    }

    #[test]
    fn binary_promotes_mixed_numeric_operands() {
        let e = Expression::binary(BinOp::Add, p(0, Type::I32), p(1, Type::F64));
        assert_eq!(e.result_type(), Type::F64);
    }

    #[test]
    fn mixed_literals_fold_in_the_promoted_type() {
        let e = Expression::binary(
            BinOp::Mul,
            Expression::constant(ConstValue::I32(3)),
            Expression::constant(ConstValue::F64(0.5)),
        );
        assert_eq!(e, Expression::constant(ConstValue::F64(1.5)));
    }

    #[test]
    fn int_division_by_zero_does_not_fold() {
        let e = Expression::binary(
            BinOp::Div,
            Expression::constant(ConstValue::I32(1)),
            Expression::constant(ConstValue::I32(0)),
        );
        assert!(matches!(e, Expression::Binary { .. }));
    }

    #[test]
    fn logical_not_flips_comparisons() {
        let cmp = Expression::binary(BinOp::Gt, p(0, Type::I32), p(1, Type::I32));
        let not = Expression::logical_not(cmp);
        assert!(matches!(not, Expression::Binary { op: BinOp::Le, .. }));
    }

    #[test]
    fn logical_not_unwraps_double_negation() {
        let x = p(0, Type::BOOL);
        let twice = Expression::logical_not(Expression::logical_not(x.clone()));
        assert_eq!(twice, x);
    }

    #[test]
    fn conditional_with_boolean_literal_branches_fuses() {
        let a = p(0, Type::BOOL);
        let b = p(1, Type::BOOL);
        // a ? b : false  →  a && b
        let e = Expression::conditional(
            a.clone(),
            b.clone(),
            Expression::constant(ConstValue::Bool(false)),
        );
        assert!(matches!(e, Expression::Binary { op: BinOp::LogicalAnd, .. }));
        // a ? true : b  →  a || b
        let e = Expression::conditional(a.clone(), Expression::constant(ConstValue::Bool(true)), b);
        assert!(matches!(e, Expression::Binary { op: BinOp::LogicalOr, .. }));
        // a ? true : false  →  a
        let e = Expression::conditional(
            a.clone(),
            Expression::constant(ConstValue::Bool(true)),
            Expression::constant(ConstValue::Bool(false)),
        );
        assert_eq!(e, a);
    }

    #[test]
    fn display_is_readable() {
        let e = Expression::conditional(
            Expression::binary(BinOp::Gt, p(0, Type::I32), Expression::constant(ConstValue::I32(0))),
            p(0, Type::I32),
            Expression::negate(p(0, Type::I32)),
        );
        assert_eq!(e.to_string(), "((p0 > 0) ? p0 : -p0)");
    }
}
