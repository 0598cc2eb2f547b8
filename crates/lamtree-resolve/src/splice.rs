// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Rewrites applied while splicing a captured closure into a tree.
//!
//! When capture `i` is itself a closure, every member call made *on*
//! parameter `i` inside the body is really an application of that closure.
//! The rewrite replaces such member targets with a `Delegate` node whose
//! inner expression is the parameter re-typed to the resolved closure's
//! function type; the partial application then feeds the resolved
//! `Lambda` in through that parameter.

use std::sync::Arc;

use lamtree_expr::{Expression, LambdaTree};

/// Replace member-call targets on parameter `index` with delegates of
/// `inner`'s function type.
pub(crate) fn delegate_captured_param(
    e: &Expression,
    index: usize,
    inner: &Arc<LambdaTree>,
) -> Expression {
    let rewrite = |e: &Expression| delegate_captured_param(e, index, inner);
    match e {
        Expression::Member { instance: Some(instance), member, param_types, ty } => {
            if let Expression::Parameter { index: pi, .. } = **instance {
                if pi == index {
                    return Expression::Delegate {
                        target: Box::new(Expression::parameter(index, inner.fn_type())),
                        param_types: param_types.clone(),
                        ty: ty.clone(),
                    };
                }
            }
            Expression::Member {
                instance: Some(Box::new(rewrite(instance))),
                member: member.clone(),
                param_types: param_types.clone(),
                ty: ty.clone(),
            }
        }
        Expression::Member { instance: None, .. }
        | Expression::Constant { .. }
        | Expression::Parameter { .. }
        | Expression::Lambda(_) => e.clone(),
        Expression::Unary { op, operand, ty } => Expression::Unary {
            op: op.clone(),
            operand: Box::new(rewrite(operand)),
            ty: ty.clone(),
        },
        Expression::Binary { op, left, right, ty } => Expression::Binary {
            op: *op,
            left: Box::new(rewrite(left)),
            right: Box::new(rewrite(right)),
            ty: ty.clone(),
        },
        Expression::Invocation { target, args, ty } => Expression::Invocation {
            target: Box::new(rewrite(target)),
            args: args.iter().map(rewrite).collect(),
            ty: ty.clone(),
        },
        Expression::Delegate { target, param_types, ty } => Expression::Delegate {
            target: Box::new(rewrite(target)),
            param_types: param_types.clone(),
            ty: ty.clone(),
        },
        Expression::Conditional { test, if_true, if_false, ty } => Expression::Conditional {
            test: Box::new(rewrite(test)),
            if_true: Box::new(rewrite(if_true)),
            if_false: Box::new(rewrite(if_false)),
            ty: ty.clone(),
        },
    }
}

/// Whether any constant in the tree still holds an unresolved closure
/// value. A finished tree never does.
#[cfg(test)]
pub(crate) fn contains_closure_constant(e: &Expression) -> bool {
    match e {
        Expression::Constant { value, .. } => {
            matches!(value, lamtree_expr::ConstValue::Closure(_))
        }
        Expression::Parameter { .. } => false,
        Expression::Unary { operand, .. } => contains_closure_constant(operand),
        Expression::Binary { left, right, .. } => {
            contains_closure_constant(left) || contains_closure_constant(right)
        }
        Expression::Member { instance, .. } => {
            instance.as_deref().map(contains_closure_constant).unwrap_or(false)
        }
        Expression::Invocation { target, args, .. } => {
            contains_closure_constant(target) || args.iter().any(contains_closure_constant)
        }
        Expression::Lambda(tree) => contains_closure_constant(&tree.body),
        Expression::Delegate { target, .. } => contains_closure_constant(target),
        Expression::Conditional { test, if_true, if_false, .. } => {
            contains_closure_constant(test)
                || contains_closure_constant(if_true)
                || contains_closure_constant(if_false)
        }
    }
}
