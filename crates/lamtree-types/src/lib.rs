// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Type coercion for reconstructed expressions.
//!
//! Argument and result positions carry declared types that rarely match
//! the erased types the decoder produces. [`coerce`] rewrites an
//! expression to a target type along the legal paths only: identity,
//! primitive widening, box/unbox, literal re-typing, and
//! structure-preserving pushes into composite nodes. Anything else is a
//! hard [`ReconstructError::TypeMismatch`].

use lamtree_expr::{BinOp, ConstValue, Expression, PrimType, ReconstructError, Type};

/// Whether a value of `from` may flow into a slot of type `to` without an
/// explicit conversion node.
pub fn is_assignable(to: &Type, from: &Type) -> bool {
    to.accepts(from)
}

/// Rewrite `e` to have result type `to`.
///
/// Literals are re-typed in place (including the int-as-bool encoding
/// `0`/`1`), arithmetic and conditional nodes push the target into their
/// operands, parameters re-type when the move is widening or the declared
/// type was erased to `Any`. Opaque nodes get an explicit `Convert`
/// wrapper when a legal path exists.
pub fn coerce(e: &Expression, to: &Type) -> Result<Expression, ReconstructError> {
    let from = e.result_type();
    if &from == to {
        return Ok(e.clone());
    }

    match e {
        Expression::Constant { value, .. } => {
            if let Some(v) = retype_literal(value, to) {
                return Ok(Expression::constant_typed(v, to.clone()));
            }
        }
        Expression::Parameter { index, .. } => {
            if to.accepts(&from) || from == Type::Any {
                return Ok(Expression::parameter(*index, to.clone()));
            }
        }
        Expression::Binary { op, left, right, .. } if pushes_through(*op, to) => {
            return Ok(Expression::binary(*op, coerce(left, to)?, coerce(right, to)?));
        }
        Expression::Conditional { test, if_true, if_false, .. } => {
            return Ok(Expression::conditional(
                (**test).clone(),
                coerce(if_true, to)?,
                coerce(if_false, to)?,
            ));
        }
        _ => {}
    }

    if to.accepts(&from) || from == Type::Any {
        Ok(Expression::convert(e.clone(), to.clone()))
    } else {
        Err(ReconstructError::TypeMismatch { from, to: to.clone() })
    }
}

/// Operators whose result type distributes over both operands.
/// Comparisons, logicals and shifts (whose right operand keeps its own
/// type) do not qualify.
fn pushes_through(op: BinOp, to: &Type) -> bool {
    let numeric_target = to.prim().map(PrimType::is_numeric).unwrap_or(false);
    numeric_target
        && matches!(
            op,
            BinOp::Add
                | BinOp::Sub
                | BinOp::Mul
                | BinOp::Div
                | BinOp::Rem
                | BinOp::And
                | BinOp::Or
                | BinOp::Xor
        )
}

/// Re-type a literal to the target, when the value is representable.
fn retype_literal(value: &ConstValue, to: &Type) -> Option<ConstValue> {
    match to {
        Type::Prim(p) | Type::Boxed(p) => retype_prim(value, *p),
        Type::Any => Some(value.clone()),
        Type::Object(_) | Type::Array(_) | Type::Fn { .. } => {
            // Only null flows into an arbitrary reference slot unchanged.
            matches!(value, ConstValue::Null).then(|| ConstValue::Null)
        }
        Type::Void => None,
    }
}

fn retype_prim(value: &ConstValue, p: PrimType) -> Option<ConstValue> {
    match p {
        // Conditionals over booleans compile to int constants.
        PrimType::Bool => match value.as_i64()? {
            0 => Some(ConstValue::Bool(false)),
            1 => Some(ConstValue::Bool(true)),
            _ => None,
        },
        PrimType::I8 => i8::try_from(value.as_i64()?).ok().map(ConstValue::I8),
        PrimType::I16 => i16::try_from(value.as_i64()?).ok().map(ConstValue::I16),
        PrimType::Char => {
            u32::try_from(value.as_i64()?).ok().and_then(char::from_u32).map(ConstValue::Char)
        }
        PrimType::I32 => i32::try_from(value.as_i64()?).ok().map(ConstValue::I32),
        PrimType::I64 => value.as_i64().map(ConstValue::I64),
        PrimType::F32 => value.as_f64().map(|v| ConstValue::F32(v as f32)),
        PrimType::F64 => value.as_f64().map(ConstValue::F64),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamtree_expr::TypeRef;

    fn c(v: ConstValue) -> Expression {
        Expression::constant(v)
    }

    #[test]
    fn int_zero_and_one_become_bool() {
        assert_eq!(
            coerce(&c(ConstValue::I32(0)), &Type::BOOL).unwrap(),
            c(ConstValue::Bool(false))
        );
        assert_eq!(
            coerce(&c(ConstValue::I32(1)), &Type::BOOL).unwrap(),
            c(ConstValue::Bool(true))
        );
        assert!(coerce(&c(ConstValue::I32(2)), &Type::BOOL).is_err());
    }

    #[test]
    fn literals_retype_rather_than_wrap() {
        assert_eq!(coerce(&c(ConstValue::I32(3)), &Type::F64).unwrap(), c(ConstValue::F64(3.0)));
        assert_eq!(coerce(&c(ConstValue::I16(7)), &Type::I64).unwrap(), c(ConstValue::I64(7)));
    }

    #[test]
    fn coercion_pushes_through_arithmetic() {
        let sum = Expression::binary(
            BinOp::Add,
            Expression::parameter(0, Type::I32),
            c(ConstValue::I32(1)),
        );
        let coerced = coerce(&sum, &Type::F64).unwrap();
        match coerced {
            Expression::Binary { op: BinOp::Add, left, right, ty } => {
                assert_eq!(ty, Type::F64);
                assert_eq!(*left, Expression::parameter(0, Type::F64));
                assert_eq!(*right, c(ConstValue::F64(1.0)));
            }
            other => panic!("expected pushed-through add, got {other}"),
        }
    }

    #[test]
    fn coercion_pushes_into_conditional_branches() {
        let e = Expression::Conditional {
            test: Box::new(Expression::parameter(0, Type::BOOL)),
            if_true: Box::new(c(ConstValue::I32(1))),
            if_false: Box::new(c(ConstValue::I32(0))),
            ty: Type::I32,
        };
        let coerced = coerce(&e, &Type::F64).unwrap();
        match coerced {
            Expression::Conditional { if_true, if_false, ty, .. } => {
                assert_eq!(ty, Type::F64);
                assert_eq!(*if_true, c(ConstValue::F64(1.0)));
                assert_eq!(*if_false, c(ConstValue::F64(0.0)));
            }
            other => panic!("expected conditional, got {other}"),
        }
    }

    #[test]
    fn opaque_nodes_get_an_explicit_convert() {
        let p = Expression::Unary {
            op: lamtree_expr::UnaryOp::ArrayLength,
            operand: Box::new(Expression::parameter(0, Type::Array(Box::new(Type::I32)))),
            ty: Type::I32,
        };
        let coerced = coerce(&p, &Type::I64).unwrap();
        assert!(matches!(
            coerced,
            Expression::Unary { op: lamtree_expr::UnaryOp::Convert(Type::I64), .. }
        ));
    }

    #[test]
    fn narrowing_between_references_is_a_mismatch() {
        let a = Expression::parameter(0, Type::Object(TypeRef::named("a/B")));
        let err = coerce(&a, &Type::Object(TypeRef::named("a/C"))).unwrap_err();
        assert!(matches!(err, ReconstructError::TypeMismatch { .. }));
    }
}
