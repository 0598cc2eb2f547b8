// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The instruction-stream decoder.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use indexmap::IndexMap;

use lamtree_bytecode::{Instr, InvokeKind, Label, MethodBody};
use lamtree_expr::{
    BinOp, ClosureDescriptor, ConstValue, Expression, LambdaTree, MemberRef, MethodSig, Param,
    ReconstructError, Type,
};
use lamtree_types::coerce;

use crate::frames::{Frames, StackId};
use crate::reduce::reduce_join;

/// Collaborator hooks the decoder needs while walking one stream: nested
/// closure resolution and name lookups. Implemented by the resolver.
pub trait DecodeContext {
    /// Resolve a captured closure value into its reconstructed tree.
    fn resolve_closure(
        &self,
        desc: &ClosureDescriptor,
    ) -> Result<Arc<LambdaTree>, ReconstructError>;

    /// Resolve a named target operation (a compiler-generated closure body)
    /// into its reconstructed tree.
    fn resolve_lambda(
        &self,
        owner: &str,
        method: &str,
        sig: &MethodSig,
    ) -> Result<Arc<LambdaTree>, ReconstructError>;

    /// Look up a structural type name.
    fn resolve_type(&self, name: &str) -> Result<Type, ReconstructError>;

    /// The value of a static field when it is an inlineable constant;
    /// `None` leaves the read as an opaque member node.
    fn static_value(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<ConstValue>, ReconstructError>;
}

/// Join-label key of the pending-stack table. `Terminal` collects the
/// stacks moved aside by return instructions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum JoinKey {
    Label(Label),
    Terminal,
}

/// Decode one instruction stream into its root expression and formal
/// parameter list.
///
/// `sig` is the target operation's signature; `receiver` is the expression
/// occupying local slot 0 when the operation is instance-scoped, shifting
/// all parameter slots up by one.
pub fn decode(
    body: &MethodBody,
    sig: &MethodSig,
    receiver: Option<Expression>,
    ctx: &dyn DecodeContext,
) -> Result<(Expression, Vec<Param>), ReconstructError> {
    let mut d = Decoder::new(sig, receiver, ctx);
    for instr in &body.instrs {
        d.step(instr)?;
    }
    d.finish()
}

struct Decoder<'a> {
    frames: Frames,
    active: Option<StackId>,
    pending: IndexMap<JoinKey, Vec<StackId>>,
    /// Labels already passed; a jump to one of these is a loop.
    seen: HashSet<Label>,
    params: Vec<Param>,
    slots: HashMap<usize, (usize, Type)>,
    receiver: Option<Expression>,
    ctx: &'a dyn DecodeContext,
}

fn unsupported(what: impl Into<String>) -> ReconstructError {
    ReconstructError::UnsupportedConstruct(what.into())
}

fn malformed(msg: &str) -> ReconstructError {
    ReconstructError::MalformedBranchState(msg.to_string())
}

impl<'a> Decoder<'a> {
    fn new(sig: &MethodSig, receiver: Option<Expression>, ctx: &'a dyn DecodeContext) -> Self {
        let (frames, root) = Frames::new();
        let mut params = Vec::with_capacity(sig.params.len());
        let mut slots = HashMap::new();
        let mut slot = usize::from(receiver.is_some());
        for (index, ty) in sig.params.iter().enumerate() {
            params.push(Param { index, ty: ty.clone() });
            slots.insert(slot, (index, ty.clone()));
            let wide = ty.prim().map(|p| p.is_wide()).unwrap_or(false);
            slot += if wide { 2 } else { 1 };
        }
        Decoder {
            frames,
            active: Some(root),
            pending: IndexMap::new(),
            seen: HashSet::new(),
            params,
            slots,
            receiver,
            ctx,
        }
    }

    fn active(&self) -> Result<StackId, ReconstructError> {
        self.active.ok_or_else(|| malformed("no active stack (unreachable code)"))
    }

    fn push(&mut self, e: Expression) -> Result<(), ReconstructError> {
        let s = self.active()?;
        self.frames.push(s, e);
        Ok(())
    }

    fn pop(&mut self) -> Result<Expression, ReconstructError> {
        let s = self.active()?;
        self.frames.pop(s)
    }

    fn step(&mut self, instr: &Instr) -> Result<(), ReconstructError> {
        match instr {
            Instr::Const(v) => self.push(Expression::constant(v.clone())),
            Instr::Load(slot) => {
                let e = self.load(*slot)?;
                self.push(e)
            }
            Instr::Arith(op) => {
                if op.is_comparison() || matches!(op, BinOp::LogicalAnd | BinOp::LogicalOr) {
                    return Err(unsupported("comparison operator outside a conditional jump"));
                }
                let second = self.pop()?;
                let first = self.pop()?;
                self.push(Expression::binary(*op, first, second))
            }
            // Three-way compare lowers to a subtraction; the conditional
            // jump that follows splits it back into its operands.
            Instr::Cmp => {
                let second = self.pop()?;
                let first = self.pop()?;
                self.push(Expression::binary(BinOp::Sub, first, second))
            }
            Instr::Neg => {
                let e = self.pop()?;
                self.push(Expression::negate(e))
            }
            Instr::Convert(p) => {
                let e = self.pop()?;
                let to = Type::Prim(*p);
                // Literals re-type in place when representable.
                let converted = match coerce(&e, &to) {
                    Ok(c) => c,
                    Err(_) => Expression::convert(e, to),
                };
                self.push(converted)
            }
            Instr::GetField { owner, name, ty } => {
                let instance = self.pop()?;
                let e = self.read_field(instance, owner, name, ty)?;
                self.push(e)
            }
            Instr::GetStatic { owner, name, ty } => {
                let e = match self.ctx.static_value(owner, name)? {
                    Some(v) => Expression::constant(v),
                    None => Expression::Member {
                        instance: None,
                        member: MemberRef::field(owner.clone(), name.clone()),
                        param_types: Vec::new(),
                        ty: ty.clone(),
                    },
                };
                self.push(e)
            }
            Instr::InstanceOf(ty) => {
                let e = self.pop()?;
                self.push(Expression::instance_of(e, ty.clone()))
            }
            Instr::CheckCast(ty) => {
                // Only the no-op upcast to the universal base is modeled.
                if *ty == Type::Any {
                    Ok(())
                } else {
                    Err(unsupported(format!("narrowing reference cast to {ty}")))
                }
            }
            Instr::ArrayLoad => {
                let index = self.pop()?;
                let array = self.pop()?;
                self.push(Expression::binary(BinOp::ArrayIndex, array, index))
            }
            Instr::ArrayLength => {
                let array = self.pop()?;
                self.push(Expression::Unary {
                    op: lamtree_expr::UnaryOp::ArrayLength,
                    operand: Box::new(array),
                    ty: Type::I32,
                })
            }
            Instr::New(ty) => {
                // Placeholder consumed by the matching constructor call.
                self.push(Expression::constant_typed(ConstValue::Null, ty.clone()))
            }
            Instr::Invoke { kind, owner, method, sig } => self.invoke(*kind, owner, method, sig),
            Instr::MakeClosure { owner, method, sig, captured } => {
                self.make_closure(owner, method, sig, *captured)
            }
            Instr::Mark(label) => {
                self.seen.insert(*label);
                self.join(JoinKey::Label(*label))
            }
            Instr::Jump(target) => {
                self.check_forward(*target)?;
                let s = self.active()?;
                self.pending.entry(JoinKey::Label(*target)).or_default().push(s);
                self.active = None;
                Ok(())
            }
            Instr::JumpIf { cond, target } => {
                let second = self.pop()?;
                let first = self.pop()?;
                let test = comparison(cond.inverted(), first, second);
                self.branch(*target, test)
            }
            Instr::JumpIfZero { cond, target } => {
                self.push_zero_or_split()?;
                let second = self.pop()?;
                let first = self.pop()?;
                let test = comparison(cond.inverted(), first, second);
                self.branch(*target, test)
            }
            Instr::JumpIfNull(target) => {
                let e = self.pop()?;
                let test = Expression::logical_not(Expression::is_null(e));
                self.branch(*target, test)
            }
            Instr::JumpIfNonNull(target) => {
                let e = self.pop()?;
                self.branch(*target, Expression::is_null(e))
            }
            Instr::Return => {
                let s = self.active()?;
                self.pending.entry(JoinKey::Terminal).or_default().push(s);
                self.active = None;
                Ok(())
            }
            Instr::Dup(n) => {
                let s = self.active()?;
                self.frames.dup(s, *n)
            }
            Instr::Swap => {
                let s = self.active()?;
                self.frames.swap(s)
            }
            Instr::Pop => Err(unsupported("discarded computation")),
            Instr::Store(slot) => Err(unsupported(format!("local store to slot {slot}"))),
            Instr::Iinc(slot) => Err(unsupported(format!("local increment of slot {slot}"))),
            Instr::Switch => Err(unsupported("multi-way switch")),
            Instr::Throw => Err(unsupported("exception throw")),
            Instr::ArrayStore => Err(unsupported("array element store")),
            Instr::PutField { owner, name } => {
                Err(unsupported(format!("field store to {owner}.{name}")))
            }
        }
    }

    fn finish(mut self) -> Result<(Expression, Vec<Param>), ReconstructError> {
        self.join(JoinKey::Terminal)?;
        let s = self.active()?;
        let result = self.frames.pop(s)?;
        if self.frames.len(s) != 0 {
            return Err(malformed("values left on the operand stack after return"));
        }
        Ok((result, self.params))
    }

    fn load(&self, slot: usize) -> Result<Expression, ReconstructError> {
        if slot == 0 {
            if let Some(receiver) = &self.receiver {
                return Ok(receiver.clone());
            }
        }
        match self.slots.get(&slot) {
            Some((index, ty)) => Ok(Expression::parameter(*index, ty.clone())),
            None => Err(unsupported(format!("read of undeclared local slot {slot}"))),
        }
    }

    fn check_forward(&self, target: Label) -> Result<(), ReconstructError> {
        if self.seen.contains(&target) {
            Err(unsupported("backward jump (loop)"))
        } else {
            Ok(())
        }
    }

    /// Split the active stack on `test`: the fall-through path (test holds)
    /// becomes active, the jump target receives the false branch.
    fn branch(&mut self, target: Label, test: Expression) -> Result<(), ReconstructError> {
        self.check_forward(target)?;
        let s = self.active()?;
        let b = self.frames.split(s, test);
        let false_stack = self.frames.false_stack(b);
        self.pending.entry(JoinKey::Label(target)).or_default().push(false_stack);
        self.active = Some(self.frames.true_stack(b));
        Ok(())
    }

    /// A single-operand conditional jump compares against an implicit
    /// zero/false, unless the top of stack is the subtraction a three-way
    /// compare lowered to, in which case it splits back into its operands.
    fn push_zero_or_split(&mut self) -> Result<(), ReconstructError> {
        let s = self.active()?;
        if let Expression::Binary { op: BinOp::Sub, .. } = self.frames.peek(s)? {
            if let Expression::Binary { left, right, .. } = self.frames.pop(s)? {
                self.frames.push(s, *left);
                self.frames.push(s, *right);
            }
            return Ok(());
        }
        let ty = self.frames.peek(s)?.result_type();
        match ty.prim() {
            Some(p) => {
                self.frames.push(s, Expression::constant(ConstValue::zero_of(p)));
                Ok(())
            }
            None => {
                // Null tests use the dedicated jump forms.
                Err(unsupported(format!("zero comparison against {ty}")))
            }
        }
    }

    fn join(&mut self, key: JoinKey) -> Result<(), ReconstructError> {
        let mut gathered = self.pending.swap_remove(&key).unwrap_or_default();
        gathered.retain(|s| !self.frames.is_reduced(*s));
        if let Some(s) = self.active.take() {
            gathered.push(s);
        }
        if gathered.is_empty() {
            // A label nothing reaches; stay inactive until the next join.
            return Ok(());
        }
        self.active = Some(reduce_join(&mut self.frames, gathered)?);
        Ok(())
    }

    fn read_field(
        &mut self,
        instance: Expression,
        owner: &str,
        name: &str,
        ty: &Type,
    ) -> Result<Expression, ReconstructError> {
        // Reads against a synthetic capture wrapper inline the captured
        // literal instead of modeling the wrapper object.
        if let Expression::Constant { value: ConstValue::Env(env), .. } = &instance {
            return match env.fields.get(name) {
                Some(v) => Ok(Expression::constant(v.clone())),
                None => Err(ReconstructError::ResourceNotFound(format!(
                    "captured field {owner}.{name}"
                ))),
            };
        }
        Ok(Expression::Member {
            instance: Some(Box::new(instance)),
            member: MemberRef::field(owner, name),
            param_types: Vec::new(),
            ty: ty.clone(),
        })
    }

    fn pop_args(&mut self, param_types: &[Type]) -> Result<Vec<Expression>, ReconstructError> {
        let mut args = Vec::with_capacity(param_types.len());
        for _ in param_types {
            args.push(self.pop()?);
        }
        args.reverse();
        for (arg, ty) in args.iter_mut().zip(param_types) {
            *arg = coerce(arg, ty)?;
        }
        Ok(args)
    }

    fn invoke(
        &mut self,
        kind: InvokeKind,
        owner: &str,
        method: &str,
        sig: &MethodSig,
    ) -> Result<(), ReconstructError> {
        if kind == InvokeKind::Special && method == "<init>" {
            return self.construct(owner, sig);
        }
        let args = self.pop_args(&sig.params)?;

        let e = match kind {
            InvokeKind::Static => {
                let owner_ty = self.ctx.resolve_type(owner)?;
                if owner_ty.is_synthetic() {
                    // A compiler-generated closure body: splice its tree in.
                    let tree = self.ctx.resolve_lambda(owner, method, sig)?;
                    Expression::invoke(Expression::Lambda(tree), args)
                } else {
                    let member = Expression::Member {
                        instance: None,
                        member: MemberRef::method(owner, method),
                        param_types: sig.params.clone(),
                        ty: sig.ret.clone(),
                    };
                    Expression::invoke(member, args)
                }
            }
            InvokeKind::Instance | InvokeKind::Special => {
                let instance = self.pop()?;
                match &instance {
                    // Calling through a captured closure constant resolves
                    // the closure and invokes its tree directly.
                    Expression::Constant { value: ConstValue::Closure(desc), .. } => {
                        let tree = self.ctx.resolve_closure(desc)?;
                        let param_types: Vec<Type> =
                            tree.params.iter().map(|p| p.ty.clone()).collect();
                        let mut args = args;
                        for (arg, ty) in args.iter_mut().zip(&param_types) {
                            *arg = coerce(arg, ty)?;
                        }
                        Expression::invoke(Expression::Lambda(tree), args)
                    }
                    Expression::Constant { value: ConstValue::Env(_), .. } => {
                        let tree = self.ctx.resolve_lambda(owner, method, sig)?;
                        Expression::invoke(Expression::Lambda(tree), args)
                    }
                    _ => {
                        let owner_ty = self.ctx.resolve_type(owner)?;
                        let from = instance.result_type();
                        let instance = if owner_ty.accepts(&from) || from == Type::Any {
                            coerce(&instance, &owner_ty)?
                        } else {
                            instance
                        };
                        let member = Expression::Member {
                            instance: Some(Box::new(instance)),
                            member: MemberRef::method(owner, method),
                            param_types: sig.params.clone(),
                            ty: sig.ret.clone(),
                        };
                        Expression::invoke(member, args)
                    }
                }
            }
        };
        self.push(e)
    }

    /// `New T; Dup; args...; <init>` collapses into one constructor node.
    fn construct(&mut self, owner: &str, sig: &MethodSig) -> Result<(), ReconstructError> {
        let args = self.pop_args(&sig.params)?;
        let placeholder = self.pop()?; // the duplicated placeholder
        let ty = placeholder.result_type();
        self.pop()?; // the original underneath it
        let member = Expression::Member {
            instance: None,
            member: MemberRef::constructor(owner),
            param_types: sig.params.clone(),
            ty,
        };
        self.push(Expression::invoke(member, args))
    }

    /// Inline closure creation: resolve the target body and bind the
    /// captured operands as a partial application.
    fn make_closure(
        &mut self,
        owner: &str,
        method: &str,
        sig: &MethodSig,
        captured: usize,
    ) -> Result<(), ReconstructError> {
        let tree = self.ctx.resolve_lambda(owner, method, sig)?;
        if captured == 0 {
            return self.push(Expression::Lambda(tree));
        }
        if captured > tree.params.len() {
            return Err(ReconstructError::ArityMismatch {
                declared: tree.params.len(),
                found: captured,
            });
        }
        let leading: Vec<Type> = tree.params[..captured].iter().map(|p| p.ty.clone()).collect();
        let args = self.pop_args(&leading)?;
        self.push(Expression::invoke(Expression::Lambda(tree), args))
    }
}

/// Build a comparison test, simplifying against boolean literals so that
/// `x != false` comes out as `x` rather than a redundant comparison.
fn comparison(op: BinOp, left: Expression, right: Expression) -> Expression {
    if left.result_type().is_bool() {
        if let Expression::Constant { value: ConstValue::Bool(b), .. } = right {
            return match (op, b) {
                (BinOp::Ne, false) | (BinOp::Eq, true) => left,
                (BinOp::Eq, false) | (BinOp::Ne, true) => Expression::logical_not(left),
                _ => Expression::binary(op, left, Expression::constant(ConstValue::Bool(b))),
            };
        }
    }
    Expression::binary(op, left, right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use lamtree_bytecode::{class_type, BodyBuilder, JumpCond};
    use lamtree_expr::{CaptureEnv, UnaryOp};

    struct TestCtx {
        lambdas: HashMap<String, Arc<LambdaTree>>,
    }

    impl TestCtx {
        fn empty() -> Self {
            TestCtx { lambdas: HashMap::new() }
        }

        fn with_lambda(owner: &str, tree: LambdaTree) -> Self {
            let mut lambdas = HashMap::new();
            lambdas.insert(owner.to_string(), Arc::new(tree));
            TestCtx { lambdas }
        }
    }

    impl DecodeContext for TestCtx {
        fn resolve_closure(
            &self,
            desc: &ClosureDescriptor,
        ) -> Result<Arc<LambdaTree>, ReconstructError> {
            self.lambdas
                .get(&desc.owner)
                .cloned()
                .ok_or_else(|| ReconstructError::ResourceNotFound(desc.owner.clone()))
        }

        fn resolve_lambda(
            &self,
            owner: &str,
            _method: &str,
            _sig: &MethodSig,
        ) -> Result<Arc<LambdaTree>, ReconstructError> {
            self.lambdas
                .get(owner)
                .cloned()
                .ok_or_else(|| ReconstructError::ResourceNotFound(owner.to_string()))
        }

        fn resolve_type(&self, name: &str) -> Result<Type, ReconstructError> {
            Ok(class_type(name))
        }

        fn static_value(
            &self,
            _owner: &str,
            _name: &str,
        ) -> Result<Option<ConstValue>, ReconstructError> {
            Ok(None)
        }
    }

    fn decode_ok(
        body: &MethodBody,
        sig: &MethodSig,
        ctx: &TestCtx,
    ) -> (Expression, Vec<Param>) {
        decode(body, sig, None, ctx).expect("decode failed")
    }

    #[test]
    fn straight_line_arithmetic() {
        let sig = MethodSig::new(vec![Type::I32, Type::I32], Type::I32);
        let mut b = BodyBuilder::new();
        b.load(0).load(1).arith(BinOp::Add).ret();
        let (expr, params) = decode_ok(&b.finish(), &sig, &TestCtx::empty());
        assert_eq!(params.len(), 2);
        assert_eq!(
            expr,
            Expression::binary(
                BinOp::Add,
                Expression::parameter(0, Type::I32),
                Expression::parameter(1, Type::I32),
            )
        );
    }

    #[test]
    fn wide_params_occupy_two_slots() {
        let sig = MethodSig::new(vec![Type::I64, Type::I64], Type::I64);
        let mut b = BodyBuilder::new();
        b.load(0).load(2).arith(BinOp::Mul).ret();
        let (expr, _) = decode_ok(&b.finish(), &sig, &TestCtx::empty());
        assert_eq!(
            expr,
            Expression::binary(
                BinOp::Mul,
                Expression::parameter(0, Type::I64),
                Expression::parameter(1, Type::I64),
            )
        );
    }

    #[test]
    fn ternary_reconstructs_as_one_conditional() {
        // |x| if x > 0 { x } else { -x }
        let sig = MethodSig::new(vec![Type::I32], Type::I32);
        let mut b = BodyBuilder::new();
        let neg = b.fresh_label();
        let end = b.fresh_label();
        b.load(0)
            .jump_if_zero(JumpCond::Le, neg)
            .load(0)
            .jump(end)
            .mark(neg)
            .load(0)
            .neg()
            .mark(end)
            .ret();
        let (expr, _) = decode_ok(&b.finish(), &sig, &TestCtx::empty());
        let x = Expression::parameter(0, Type::I32);
        assert_eq!(
            expr,
            Expression::Conditional {
                test: Box::new(Expression::binary(
                    BinOp::Gt,
                    x.clone(),
                    Expression::constant(ConstValue::I32(0)),
                )),
                if_true: Box::new(x.clone()),
                if_false: Box::new(Expression::negate(x)),
                ty: Type::I32,
            }
        );
    }

    #[test]
    fn short_circuit_and_fuses_into_one_test() {
        // |a, b| a && b
        let sig = MethodSig::new(vec![Type::BOOL, Type::BOOL], Type::BOOL);
        let mut b = BodyBuilder::new();
        let els = b.fresh_label();
        let end = b.fresh_label();
        b.load(0)
            .jump_if_zero(JumpCond::Eq, els)
            .load(1)
            .jump_if_zero(JumpCond::Eq, els)
            .iconst(1)
            .jump(end)
            .mark(els)
            .iconst(0)
            .mark(end)
            .ret();
        let (raw, _) = decode_ok(&b.finish(), &sig, &TestCtx::empty());
        let expr = coerce(&raw, &Type::BOOL).expect("coerce failed");
        assert_eq!(
            expr,
            Expression::binary(
                BinOp::LogicalAnd,
                Expression::parameter(0, Type::BOOL),
                Expression::parameter(1, Type::BOOL),
            )
        );
    }

    #[test]
    fn three_way_compare_splits_back_into_a_comparison() {
        // |x: i64, y: i64| x > y
        let sig = MethodSig::new(vec![Type::I64, Type::I64], Type::BOOL);
        let mut b = BodyBuilder::new();
        let els = b.fresh_label();
        let end = b.fresh_label();
        b.load(0)
            .load(2)
            .cmp()
            .jump_if_zero(JumpCond::Le, els)
            .iconst(1)
            .jump(end)
            .mark(els)
            .iconst(0)
            .mark(end)
            .ret();
        let (raw, _) = decode_ok(&b.finish(), &sig, &TestCtx::empty());
        let expr = coerce(&raw, &Type::BOOL).expect("coerce failed");
        assert_eq!(
            expr,
            Expression::binary(
                BinOp::Gt,
                Expression::parameter(0, Type::I64),
                Expression::parameter(1, Type::I64),
            )
        );
    }

    #[test]
    fn backward_jump_is_rejected_as_a_loop() {
        let sig = MethodSig::new(vec![Type::I32], Type::I32);
        let mut b = BodyBuilder::new();
        let top = b.fresh_label();
        b.mark(top).load(0).jump_if_zero(JumpCond::Gt, top).load(0).ret();
        let err = decode(&b.finish(), &sig, None, &TestCtx::empty()).unwrap_err();
        assert!(matches!(err, ReconstructError::UnsupportedConstruct(_)), "got {err}");
    }

    #[test]
    fn stores_are_rejected() {
        let sig = MethodSig::new(vec![Type::I32], Type::I32);
        let mut b = BodyBuilder::new();
        b.load(0).push(Instr::Store(1)).load(0).ret();
        let err = decode(&b.finish(), &sig, None, &TestCtx::empty()).unwrap_err();
        assert!(matches!(err, ReconstructError::UnsupportedConstruct(_)));
    }

    #[test]
    fn switches_and_throws_are_rejected() {
        let sig = MethodSig::new(vec![Type::I32], Type::I32);
        for imperative in [Instr::Switch, Instr::Throw, Instr::ArrayStore] {
            let mut b = BodyBuilder::new();
            b.load(0).push(imperative).load(0).ret();
            let err = decode(&b.finish(), &sig, None, &TestCtx::empty()).unwrap_err();
            assert!(matches!(err, ReconstructError::UnsupportedConstruct(_)), "got {err}");
        }
    }

    #[test]
    fn synthetic_wrapper_fields_inline_as_literals() {
        let env = CaptureEnv::new("acme/Adder$1").with_field("n", ConstValue::I32(7));
        let sig = MethodSig::new(vec![Type::I32], Type::I32);
        let mut b = BodyBuilder::new();
        b.constant(ConstValue::Env(Box::new(env)))
            .get_field("acme/Adder$1", "n", Type::I32)
            .load(0)
            .arith(BinOp::Add)
            .ret();
        let (expr, _) = decode_ok(&b.finish(), &sig, &TestCtx::empty());
        assert_eq!(
            expr,
            Expression::binary(
                BinOp::Add,
                Expression::constant(ConstValue::I32(7)),
                Expression::parameter(0, Type::I32),
            )
        );
    }

    #[test]
    fn instance_calls_become_member_invocations() {
        let owner = "acme/Pricer";
        let sig = MethodSig::new(vec![Type::Object(lamtree_expr::TypeRef::named(owner))], Type::F64);
        let call_sig = MethodSig::new(vec![Type::I32], Type::F64);
        let mut b = BodyBuilder::new();
        b.load(0).iconst(3).invoke(InvokeKind::Instance, owner, "price", call_sig.clone()).ret();
        let (expr, _) = decode_ok(&b.finish(), &sig, &TestCtx::empty());
        match expr {
            Expression::Invocation { target, args, ty } => {
                assert_eq!(ty, Type::F64);
                assert_eq!(args, vec![Expression::constant(ConstValue::I32(3))]);
                match *target {
                    Expression::Member { instance, member, .. } => {
                        assert!(instance.is_some());
                        assert_eq!(member.name, "price");
                    }
                    other => panic!("expected member target, got {other}"),
                }
            }
            other => panic!("expected invocation, got {other}"),
        }
    }

    #[test]
    fn make_closure_binds_captures_as_partial_application() {
        // target: |c, x| c + x, with c captured
        let target = LambdaTree::new(
            vec![
                Param { index: 0, ty: Type::I32 },
                Param { index: 1, ty: Type::I32 },
            ],
            Expression::binary(
                BinOp::Add,
                Expression::parameter(0, Type::I32),
                Expression::parameter(1, Type::I32),
            ),
            Type::I32,
        );
        let ctx = TestCtx::with_lambda("acme/Adders", target);
        let target_sig = MethodSig::new(vec![Type::I32, Type::I32], Type::I32);

        let sig = MethodSig::new(vec![], Type::Fn {
            params: vec![Type::I32],
            ret: Box::new(Type::I32),
        });
        let mut b = BodyBuilder::new();
        b.iconst(5).make_closure("acme/Adders", "lambda$add$0", target_sig, 1).ret();
        let (expr, _) = decode_ok(&b.finish(), &sig, &ctx);
        match expr {
            Expression::Invocation { target, args, ty } => {
                assert!(matches!(*target, Expression::Lambda(_)));
                assert_eq!(args, vec![Expression::constant(ConstValue::I32(5))]);
                assert_eq!(ty, Type::Fn { params: vec![Type::I32], ret: Box::new(Type::I32) });
            }
            other => panic!("expected partial application, got {other}"),
        }
    }

    #[test]
    fn unbalanced_branches_are_malformed() {
        let sig = MethodSig::new(vec![Type::I32], Type::I32);
        let mut b = BodyBuilder::new();
        let els = b.fresh_label();
        let end = b.fresh_label();
        // True side pushes two values, false side one.
        b.load(0)
            .jump_if_zero(JumpCond::Eq, els)
            .iconst(1)
            .iconst(2)
            .arith(BinOp::Add)
            .jump(end)
            .mark(els)
            .iconst(3)
            .mark(end)
            .ret();
        // Both sides end with one value, so this one reduces fine; the
        // malformed shape is a side that returns leaving extra values.
        assert!(decode(&b.finish(), &sig, None, &TestCtx::empty()).is_ok());

        let mut b = BodyBuilder::new();
        let end = b.fresh_label();
        b.load(0).iconst(1).jump(end).mark(end).ret();
        let err = decode(&b.finish(), &sig, None, &TestCtx::empty()).unwrap_err();
        assert!(matches!(err, ReconstructError::MalformedBranchState(_)), "got {err}");
    }
}

