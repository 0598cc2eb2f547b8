// SPDX-License-Identifier: (MIT OR Apache-2.0)

//! BodyBuilder - helper for assembling instruction streams.

use lamtree_expr::{BinOp, ConstValue, MethodSig, PrimType, Type};

use crate::instr::{Instr, InvokeKind, JumpCond, Label, MethodBody};

pub struct BodyBuilder {
    instrs: Vec<Instr>,
    next_label: u32,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self { instrs: Vec::new(), next_label: 0 }
    }

    pub fn fresh_label(&mut self) -> Label {
        let l = Label(self.next_label);
        self.next_label += 1;
        l
    }

    pub fn push(&mut self, instr: Instr) -> &mut Self {
        self.instrs.push(instr);
        self
    }

    pub fn constant(&mut self, v: ConstValue) -> &mut Self {
        self.push(Instr::Const(v))
    }

    pub fn iconst(&mut self, v: i32) -> &mut Self {
        self.constant(ConstValue::I32(v))
    }

    pub fn load(&mut self, slot: usize) -> &mut Self {
        self.push(Instr::Load(slot))
    }

    pub fn arith(&mut self, op: BinOp) -> &mut Self {
        self.push(Instr::Arith(op))
    }

    pub fn cmp(&mut self) -> &mut Self {
        self.push(Instr::Cmp)
    }

    pub fn neg(&mut self) -> &mut Self {
        self.push(Instr::Neg)
    }

    pub fn convert(&mut self, to: PrimType) -> &mut Self {
        self.push(Instr::Convert(to))
    }

    pub fn get_field(
        &mut self,
        owner: impl Into<String>,
        name: impl Into<String>,
        ty: Type,
    ) -> &mut Self {
        self.push(Instr::GetField { owner: owner.into(), name: name.into(), ty })
    }

    pub fn invoke(
        &mut self,
        kind: InvokeKind,
        owner: impl Into<String>,
        method: impl Into<String>,
        sig: MethodSig,
    ) -> &mut Self {
        self.push(Instr::Invoke { kind, owner: owner.into(), method: method.into(), sig })
    }

    pub fn make_closure(
        &mut self,
        owner: impl Into<String>,
        method: impl Into<String>,
        sig: MethodSig,
        captured: usize,
    ) -> &mut Self {
        self.push(Instr::MakeClosure {
            owner: owner.into(),
            method: method.into(),
            sig,
            captured,
        })
    }

    pub fn mark(&mut self, label: Label) -> &mut Self {
        self.push(Instr::Mark(label))
    }

    pub fn jump(&mut self, target: Label) -> &mut Self {
        self.push(Instr::Jump(target))
    }

    pub fn jump_if(&mut self, cond: JumpCond, target: Label) -> &mut Self {
        self.push(Instr::JumpIf { cond, target })
    }

    pub fn jump_if_zero(&mut self, cond: JumpCond, target: Label) -> &mut Self {
        self.push(Instr::JumpIfZero { cond, target })
    }

    pub fn ret(&mut self) -> &mut Self {
        self.push(Instr::Return)
    }

    pub fn dup(&mut self, n: usize) -> &mut Self {
        self.push(Instr::Dup(n))
    }

    pub fn swap(&mut self) -> &mut Self {
        self.push(Instr::Swap)
    }

    pub fn finish(&mut self) -> MethodBody {
        MethodBody::new(std::mem::take(&mut self.instrs))
    }
}

impl Default for BodyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_stream_in_push_order() {
        let mut b = BodyBuilder::new();
        let end = b.fresh_label();
        b.load(0).jump_if_zero(JumpCond::Eq, end).iconst(1).mark(end).ret();
        let body = b.finish();
        assert_eq!(body.instrs.len(), 5);
        assert_eq!(body.instrs[1], Instr::JumpIfZero { cond: JumpCond::Eq, target: end });
    }
}
