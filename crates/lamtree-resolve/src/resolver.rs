// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The resolver proper.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use lamtree_decode::{decode, DecodeContext};
use lamtree_expr::{
    ClosureDescriptor, ConstValue, Expression, LambdaTree, MethodSig, Param, ReconstructError,
    Type, UnaryOp,
};
use lamtree_types::coerce;

use crate::host::Host;
use crate::splice::delegate_captured_param;

/// Ceiling on nested capture resolution. Well-formed closures nest a
/// handful of levels at most; a self-referential descriptor would recurse
/// forever without this.
pub const DEFAULT_RECURSION_LIMIT: usize = 32;

/// Reconstructs closure trees, caching finished ones by descriptor.
///
/// The cache holds immutable entries only, so concurrent resolution of
/// the same closure can at worst duplicate equal work, never corrupt.
pub struct Resolver<'h> {
    host: &'h dyn Host,
    cache: RwLock<HashMap<ClosureDescriptor, Arc<LambdaTree>>>,
    recursion_limit: usize,
}

impl<'h> Resolver<'h> {
    pub fn new(host: &'h dyn Host) -> Self {
        Self::with_recursion_limit(host, DEFAULT_RECURSION_LIMIT)
    }

    pub fn with_recursion_limit(host: &'h dyn Host, recursion_limit: usize) -> Self {
        Resolver { host, cache: RwLock::new(HashMap::new()), recursion_limit }
    }

    /// Reconstruct from an opaque closure value, asking the host to
    /// describe anything that is not already a descriptor-carrying value.
    pub fn reconstruct(&self, value: &ConstValue) -> Result<Arc<LambdaTree>, ReconstructError> {
        let desc = match value {
            ConstValue::Closure(d) => (**d).clone(),
            other => self.host.describe_closure(other)?,
        };
        self.resolve_at_depth(&desc, 0)
    }

    /// Reconstruct from an explicit descriptor.
    pub fn reconstruct_descriptor(
        &self,
        desc: &ClosureDescriptor,
    ) -> Result<Arc<LambdaTree>, ReconstructError> {
        self.resolve_at_depth(desc, 0)
    }

    fn resolve_at_depth(
        &self,
        desc: &ClosureDescriptor,
        depth: usize,
    ) -> Result<Arc<LambdaTree>, ReconstructError> {
        if depth >= self.recursion_limit {
            return Err(ReconstructError::RecursionLimitExceeded(depth));
        }
        if let Some(tree) =
            self.cache.read().unwrap_or_else(PoisonError::into_inner).get(desc)
        {
            return Ok(tree.clone());
        }

        let body = self.host.fetch_body(&desc.owner, &desc.method, &desc.signature)?;
        let receiver = if desc.has_receiver {
            let v = desc.captures.first().cloned().ok_or_else(|| {
                ReconstructError::NotAClosure("receiver capture missing from descriptor".into())
            })?;
            Some(Expression::constant(v))
        } else {
            None
        };

        let hooks = Hooks { resolver: self, depth };
        let (raw, params) = decode(&body, &desc.signature, receiver, &hooks)?;
        let coerced = coerce(&raw, &desc.signature.ret)?;

        let full = match eta_reduce(&coerced, &params) {
            Some(inner) => inner,
            None => Arc::new(LambdaTree::new(params, coerced, desc.signature.ret.clone())),
        };
        let tree = self.splice(full, desc, depth)?;

        if tree.params.len() != desc.arity {
            return Err(ReconstructError::ArityMismatch {
                declared: desc.arity,
                found: tree.params.len(),
            });
        }

        Ok(self
            .cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(desc.clone())
            .or_insert(tree)
            .clone())
    }

    /// Bind captured values as the leading arguments of a partial
    /// application over the full tree; only genuinely unbound parameters
    /// survive, renumbered from zero. Captured closures resolve
    /// recursively, depth-first in capture-list order.
    fn splice(
        &self,
        full: Arc<LambdaTree>,
        desc: &ClosureDescriptor,
        depth: usize,
    ) -> Result<Arc<LambdaTree>, ReconstructError> {
        let bound = desc.bound_captures();
        if bound.is_empty() {
            return Ok(full);
        }
        if bound.len() > full.params.len() {
            return Err(ReconstructError::ArityMismatch {
                declared: full.params.len(),
                found: bound.len(),
            });
        }

        let mut tree = (*full).clone();
        let mut args = Vec::with_capacity(tree.params.len());
        for (i, cap) in bound.iter().enumerate() {
            let arg = match cap {
                ConstValue::Closure(inner_desc) => {
                    let inner = self.resolve_at_depth(inner_desc, depth + 1)?;
                    tree.body = delegate_captured_param(&tree.body, i, &inner);
                    Expression::Lambda(inner)
                }
                other => Expression::constant(other.clone()),
            };
            args.push(arg);
        }

        let exposed: Vec<Param> = tree.params[bound.len()..]
            .iter()
            .enumerate()
            .map(|(j, p)| Param { index: j, ty: p.ty.clone() })
            .collect();
        for p in &exposed {
            args.push(Expression::parameter(p.index, p.ty.clone()));
        }

        let ret = tree.result_type.clone();
        let body = Expression::invoke(Expression::Lambda(Arc::new(tree)), args);
        Ok(Arc::new(LambdaTree::new(exposed, body, ret)))
    }
}

/// Decode-time hooks: nested resolution re-enters the resolver one level
/// deeper; name lookups go straight to the host.
struct Hooks<'r, 'h> {
    resolver: &'r Resolver<'h>,
    depth: usize,
}

impl DecodeContext for Hooks<'_, '_> {
    fn resolve_closure(
        &self,
        desc: &ClosureDescriptor,
    ) -> Result<Arc<LambdaTree>, ReconstructError> {
        self.resolver.resolve_at_depth(desc, self.depth + 1)
    }

    fn resolve_lambda(
        &self,
        owner: &str,
        method: &str,
        sig: &MethodSig,
    ) -> Result<Arc<LambdaTree>, ReconstructError> {
        let desc = ClosureDescriptor {
            owner: owner.to_string(),
            method: method.to_string(),
            signature: sig.clone(),
            arity: sig.params.len(),
            has_receiver: false,
            captures: Vec::new(),
        };
        self.resolver.resolve_at_depth(&desc, self.depth + 1)
    }

    fn resolve_type(&self, name: &str) -> Result<Type, ReconstructError> {
        self.resolver.host.resolve_type(name)
    }

    fn static_value(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<ConstValue>, ReconstructError> {
        self.resolver.host.static_value(owner, name)
    }
}

/// A body that merely forwards all parameters, in order, to an inner
/// closure collapses into that closure. Convert wrappers added by result
/// coercion are transparent to the check.
fn eta_reduce(body: &Expression, params: &[Param]) -> Option<Arc<LambdaTree>> {
    let mut stripped = body;
    while let Expression::Unary { op: UnaryOp::Convert(_), operand, .. } = stripped {
        stripped = operand;
    }
    let Expression::Invocation { target, args, .. } = stripped else {
        return None;
    };
    let Expression::Lambda(inner) = &**target else {
        return None;
    };
    if args.len() != params.len() || inner.params.len() != args.len() {
        return None;
    }
    for (i, arg) in args.iter().enumerate() {
        let Expression::Parameter { index, ty } = arg else {
            return None;
        };
        if *index != params[i].index {
            return None;
        }
        if !inner.params[i].ty.accepts(ty) {
            return None;
        }
    }
    Some(inner.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    use lamtree_bytecode::{class_type, BodyBuilder, InvokeKind, MethodBody};
    use lamtree_expr::{BinOp, TypeRef};

    use crate::splice::contains_closure_constant;

    struct TestHost {
        bodies: HashMap<(String, String), MethodBody>,
        synthetic: HashSet<String>,
    }

    impl TestHost {
        fn new() -> Self {
            TestHost { bodies: HashMap::new(), synthetic: HashSet::new() }
        }

        fn body(mut self, owner: &str, method: &str, body: MethodBody) -> Self {
            self.bodies.insert((owner.to_string(), method.to_string()), body);
            self
        }

        fn synthetic(mut self, owner: &str) -> Self {
            self.synthetic.insert(owner.to_string());
            self
        }
    }

    impl Host for TestHost {
        fn fetch_body(
            &self,
            owner: &str,
            method: &str,
            _sig: &MethodSig,
        ) -> Result<MethodBody, ReconstructError> {
            self.bodies
                .get(&(owner.to_string(), method.to_string()))
                .cloned()
                .ok_or_else(|| ReconstructError::ResourceNotFound(format!("{owner}.{method}")))
        }

        fn describe_closure(
            &self,
            value: &ConstValue,
        ) -> Result<ClosureDescriptor, ReconstructError> {
            Err(ReconstructError::NotAClosure(value.to_string()))
        }

        fn resolve_type(&self, name: &str) -> Result<Type, ReconstructError> {
            if self.synthetic.contains(name) {
                Ok(Type::Object(TypeRef::synthetic(name)))
            } else {
                Ok(class_type(name))
            }
        }

        fn static_value(
            &self,
            _owner: &str,
            _name: &str,
        ) -> Result<Option<ConstValue>, ReconstructError> {
            Ok(None)
        }
    }

    fn add_body() -> MethodBody {
        let mut b = BodyBuilder::new();
        b.load(0).load(1).arith(BinOp::Add).ret();
        b.finish()
    }

    fn double_body() -> MethodBody {
        let mut b = BodyBuilder::new();
        b.load(0).iconst(2).arith(BinOp::Mul).ret();
        b.finish()
    }

    fn i_i_sig() -> MethodSig {
        MethodSig::new(vec![Type::I32], Type::I32)
    }

    fn descriptor(owner: &str, method: &str, sig: MethodSig) -> ClosureDescriptor {
        let arity = sig.params.len();
        ClosureDescriptor {
            owner: owner.to_string(),
            method: method.to_string(),
            signature: sig,
            arity,
            has_receiver: false,
            captures: Vec::new(),
        }
    }

    #[test]
    fn resolution_is_cached_and_idempotent() {
        let host = TestHost::new().body("acme/Math", "lambda$add$0", add_body());
        let resolver = Resolver::new(&host);
        let desc = descriptor(
            "acme/Math",
            "lambda$add$0",
            MethodSig::new(vec![Type::I32, Type::I32], Type::I32),
        );
        let first = resolver.reconstruct_descriptor(&desc).unwrap();
        let second = resolver.reconstruct_descriptor(&desc).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(
            first.body,
            Expression::binary(
                BinOp::Add,
                Expression::parameter(0, Type::I32),
                Expression::parameter(1, Type::I32),
            )
        );
    }

    #[test]
    fn forwarding_wrapper_eta_reduces_to_the_inner_tree() {
        // outer(x) = inner(x); inner(x) = x * 2
        let mut b = BodyBuilder::new();
        b.load(0).invoke(InvokeKind::Static, "acme/Ops$1", "apply", i_i_sig()).ret();
        let host = TestHost::new()
            .body("acme/Ops", "lambda$outer$0", b.finish())
            .body("acme/Ops$1", "apply", double_body())
            .synthetic("acme/Ops$1");
        let resolver = Resolver::new(&host);

        let tree = resolver
            .reconstruct_descriptor(&descriptor("acme/Ops", "lambda$outer$0", i_i_sig()))
            .unwrap();
        assert_eq!(
            tree.body,
            Expression::binary(
                BinOp::Mul,
                Expression::parameter(0, Type::I32),
                Expression::constant(ConstValue::I32(2)),
            ),
            "wrapper invocation should have been discarded"
        );
    }

    #[test]
    fn captured_closure_splices_into_a_partial_application() {
        // outer captures f and computes f(x); f(x) = x * 2
        let mut b = BodyBuilder::new();
        b.load(0).load(1).invoke(InvokeKind::Instance, "acme/Fn", "apply", i_i_sig()).ret();
        let host = TestHost::new()
            .body("acme/Fns", "lambda$apply$0", b.finish())
            .body("acme/Fns", "lambda$double$0", double_body());
        let resolver = Resolver::new(&host);

        let inner = descriptor("acme/Fns", "lambda$double$0", i_i_sig());
        let outer = ClosureDescriptor {
            owner: "acme/Fns".into(),
            method: "lambda$apply$0".into(),
            signature: MethodSig::new(
                vec![Type::Object(TypeRef::named("acme/Fn")), Type::I32],
                Type::I32,
            ),
            arity: 1,
            has_receiver: false,
            captures: vec![ConstValue::Closure(Box::new(inner))],
        };

        let tree = resolver.reconstruct_descriptor(&outer).unwrap();
        assert_eq!(tree.params, vec![Param { index: 0, ty: Type::I32 }]);
        assert!(
            !contains_closure_constant(&tree.body),
            "no constant may still hold an unresolved closure: {}",
            tree.body
        );
        // The spliced body is a partial application feeding the resolved
        // lambda in as the bound leading argument.
        match &tree.body {
            Expression::Invocation { target, args, .. } => {
                assert!(matches!(**target, Expression::Lambda(_)));
                assert_eq!(args.len(), 2);
                assert!(matches!(args[0], Expression::Lambda(_)));
                assert_eq!(args[1], Expression::parameter(0, Type::I32));
            }
            other => panic!("expected partial application, got {other}"),
        }
    }

    #[test]
    fn declared_arity_must_match() {
        let host = TestHost::new().body("acme/Math", "lambda$add$0", add_body());
        let resolver = Resolver::new(&host);
        let mut desc = descriptor(
            "acme/Math",
            "lambda$add$0",
            MethodSig::new(vec![Type::I32, Type::I32], Type::I32),
        );
        desc.arity = 1;
        let err = resolver.reconstruct_descriptor(&desc).unwrap_err();
        assert!(matches!(err, ReconstructError::ArityMismatch { declared: 1, found: 2 }));
    }

    #[test]
    fn self_referential_resolution_hits_the_recursion_ceiling() {
        // A body that invokes its own synthetic owner again.
        let mut b = BodyBuilder::new();
        b.load(0).invoke(InvokeKind::Static, "acme/Rec$1", "apply", i_i_sig()).ret();
        let host =
            TestHost::new().body("acme/Rec$1", "apply", b.finish()).synthetic("acme/Rec$1");
        let resolver = Resolver::with_recursion_limit(&host, 8);
        let err = resolver
            .reconstruct_descriptor(&descriptor("acme/Rec$1", "apply", i_i_sig()))
            .unwrap_err();
        assert!(matches!(err, ReconstructError::RecursionLimitExceeded(8)), "got {err}");
    }

    #[test]
    fn missing_body_reports_resource_not_found() {
        let host = TestHost::new();
        let resolver = Resolver::new(&host);
        let err = resolver
            .reconstruct_descriptor(&descriptor("acme/Nope", "lambda$x$0", i_i_sig()))
            .unwrap_err();
        assert!(matches!(err, ReconstructError::ResourceNotFound(_)));
    }

    #[test]
    fn opaque_non_closure_values_are_rejected() {
        let host = TestHost::new();
        let resolver = Resolver::new(&host);
        let err = resolver.reconstruct(&ConstValue::I32(42)).unwrap_err();
        assert!(matches!(err, ReconstructError::NotAClosure(_)));
    }
}
