// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Instruction set of the stack machine.

use lamtree_expr::{BinOp, ConstValue, MethodSig, PrimType, Type};

/// A jump target. Labels are positions: an instruction stream contains
/// `Mark(l)` exactly once for every label its jumps name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Label(pub u32);

/// Comparison condition of a conditional jump.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum JumpCond {
    Eq,
    Ne,
    Lt,
    Ge,
    Gt,
    Le,
}

impl JumpCond {
    /// The comparison operator for the *fall-through* path: a conditional
    /// jump transfers control when its test holds, so the code after it
    /// runs under the negation.
    pub fn inverted(self) -> BinOp {
        match self {
            JumpCond::Eq => BinOp::Ne,
            JumpCond::Ne => BinOp::Eq,
            JumpCond::Lt => BinOp::Ge,
            JumpCond::Ge => BinOp::Lt,
            JumpCond::Gt => BinOp::Le,
            JumpCond::Le => BinOp::Gt,
        }
    }
}

/// How an `Invoke` dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvokeKind {
    /// Instance dispatch: pops a receiver under the arguments.
    Instance,
    /// Static dispatch: no receiver.
    Static,
    /// Non-virtual instance dispatch; `<init>` calls arrive this way.
    Special,
}

/// One instruction. The decoder models the pure expression subset;
/// variants past `PutField` exist so that imperative streams are
/// recognized and rejected by name rather than falling through.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Instr {
    /// Push a literal.
    Const(ConstValue),
    /// Push the value in local slot `0`; wide primitives occupy two slots.
    Load(usize),
    /// Pop two, push the binary result. Arithmetic, bitwise and shift
    /// operators only.
    Arith(BinOp),
    /// Three-way compare: pops two, pushes -1/0/1. A following conditional
    /// jump turns it back into the comparison it encodes.
    Cmp,
    /// Pop one, push its arithmetic negation.
    Neg,
    /// Pop one, push it converted to the given primitive.
    Convert(PrimType),
    /// Pop an instance, push one of its fields.
    GetField { owner: String, name: String, ty: Type },
    /// Push a static field's value.
    GetStatic { owner: String, name: String, ty: Type },
    /// Pop one, push whether it is an instance of the type.
    InstanceOf(Type),
    /// Assert the top of stack has the given type.
    CheckCast(Type),
    /// Pop an index and an array, push the element.
    ArrayLoad,
    /// Pop an array, push its length.
    ArrayLength,
    /// Push an uninitialized instance; consumed by a later `<init>` call.
    New(Type),
    /// Pop `sig.params` arguments (and a receiver for non-static kinds),
    /// push the result unless `sig.ret` is void.
    Invoke { kind: InvokeKind, owner: String, method: String, sig: MethodSig },
    /// Pop `captured` values, push a closure over the named target with
    /// those values bound to its leading parameters.
    MakeClosure { owner: String, method: String, sig: MethodSig, captured: usize },
    /// Define a label position.
    Mark(Label),
    /// Unconditional jump.
    Jump(Label),
    /// Pop two, jump if the comparison holds.
    JumpIf { cond: JumpCond, target: Label },
    /// Pop one, jump if it compares as given against zero/false.
    JumpIfZero { cond: JumpCond, target: Label },
    /// Pop one, jump if it is null.
    JumpIfNull(Label),
    /// Pop one, jump if it is not null.
    JumpIfNonNull(Label),
    /// Return the top of stack.
    Return,
    /// Replicate the top `n` values.
    Dup(usize),
    /// Exchange the top two values.
    Swap,
    /// Discard the top value. Outside the pure subset.
    Pop,
    /// Write a local slot. Outside the pure subset.
    Store(usize),
    /// Increment a local slot. Outside the pure subset.
    Iinc(usize),
    /// Multi-way dispatch. Outside the pure subset.
    Switch,
    /// Raise an exception. Outside the pure subset.
    Throw,
    /// Write an array element. Outside the pure subset.
    ArrayStore,
    /// Write an instance field. Outside the pure subset.
    PutField { owner: String, name: String },
}

/// A closure body: the instruction stream of its target operation.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MethodBody {
    pub instrs: Vec<Instr>,
}

impl MethodBody {
    pub fn new(instrs: Vec<Instr>) -> Self {
        MethodBody { instrs }
    }
}
