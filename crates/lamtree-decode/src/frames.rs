// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Arena storage for operand stacks and branch nodes.
//!
//! Both live only for the duration of one decode call. Stacks reference
//! the branch they descend from, branches reference their parent stack
//! and two child stacks; everything links by index into the arena, so a
//! branch can be rewired without touching a live object graph.

use lamtree_expr::{Expression, ReconstructError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StackId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BranchId(usize);

/// One operand-stack slot. A split leaves a marker for its branch on the
/// parent stack; the reducer pops it when the branch folds.
#[derive(Debug, Clone)]
enum Slot {
    Expr(Expression),
    Branch(BranchId),
}

#[derive(Debug)]
struct StackFrame {
    slots: Vec<Slot>,
    parent: Option<BranchId>,
    reduced: bool,
}

#[derive(Debug)]
struct BranchNode {
    test: Expression,
    parent: StackId,
    true_stack: StackId,
    false_stack: StackId,
}

#[derive(Debug, Default)]
pub(crate) struct Frames {
    stacks: Vec<StackFrame>,
    branches: Vec<BranchNode>,
}

fn malformed(msg: &str) -> ReconstructError {
    ReconstructError::MalformedBranchState(msg.to_string())
}

impl Frames {
    pub fn new() -> (Frames, StackId) {
        let mut frames = Frames::default();
        let root = frames.alloc_stack(None);
        (frames, root)
    }

    fn alloc_stack(&mut self, parent: Option<BranchId>) -> StackId {
        let id = StackId(self.stacks.len());
        self.stacks.push(StackFrame { slots: Vec::new(), parent, reduced: false });
        id
    }

    /// Split `on`: allocate a branch guarded by `test`, leave its marker on
    /// `on`, and return the branch with two fresh child stacks.
    pub fn split(&mut self, on: StackId, test: Expression) -> BranchId {
        let id = BranchId(self.branches.len());
        let true_stack = self.alloc_stack(Some(id));
        let false_stack = self.alloc_stack(Some(id));
        self.branches.push(BranchNode { test, parent: on, true_stack, false_stack });
        self.stacks[on.0].slots.push(Slot::Branch(id));
        id
    }

    /// Allocate a rewired branch over existing child stacks, replacing the
    /// marker of `old` on the parent stack and reparenting the children.
    pub fn rewire(
        &mut self,
        parent: StackId,
        old: BranchId,
        test: Expression,
        true_stack: StackId,
        false_stack: StackId,
    ) -> Result<BranchId, ReconstructError> {
        self.pop_marker(parent, old)?;
        let id = BranchId(self.branches.len());
        self.branches.push(BranchNode { test, parent, true_stack, false_stack });
        self.stacks[true_stack.0].parent = Some(id);
        self.stacks[false_stack.0].parent = Some(id);
        self.stacks[parent.0].slots.push(Slot::Branch(id));
        Ok(id)
    }

    pub fn true_stack(&self, b: BranchId) -> StackId {
        self.branches[b.0].true_stack
    }

    pub fn false_stack(&self, b: BranchId) -> StackId {
        self.branches[b.0].false_stack
    }

    pub fn branch_parent(&self, b: BranchId) -> StackId {
        self.branches[b.0].parent
    }

    pub fn test(&self, b: BranchId) -> Expression {
        self.branches[b.0].test.clone()
    }

    pub fn parent_branch(&self, s: StackId) -> Option<BranchId> {
        self.stacks[s.0].parent
    }

    /// Number of ancestor branches above this stack.
    pub fn depth(&self, s: StackId) -> usize {
        let mut depth = 0;
        let mut cur = s;
        while let Some(b) = self.stacks[cur.0].parent {
            depth += 1;
            cur = self.branches[b.0].parent;
        }
        depth
    }

    pub fn len(&self, s: StackId) -> usize {
        self.stacks[s.0].slots.len()
    }

    pub fn is_reduced(&self, s: StackId) -> bool {
        self.stacks[s.0].reduced
    }

    pub fn mark_reduced(&mut self, s: StackId) {
        self.stacks[s.0].reduced = true;
    }

    pub fn push(&mut self, s: StackId, e: Expression) {
        self.stacks[s.0].slots.push(Slot::Expr(e));
    }

    pub fn pop(&mut self, s: StackId) -> Result<Expression, ReconstructError> {
        match self.stacks[s.0].slots.pop() {
            Some(Slot::Expr(e)) => Ok(e),
            Some(Slot::Branch(_)) => Err(malformed("unreduced branch where a value was expected")),
            None => Err(malformed("operand stack underflow")),
        }
    }

    pub fn peek(&self, s: StackId) -> Result<&Expression, ReconstructError> {
        match self.stacks[s.0].slots.last() {
            Some(Slot::Expr(e)) => Ok(e),
            Some(Slot::Branch(_)) => Err(malformed("unreduced branch where a value was expected")),
            None => Err(malformed("operand stack underflow")),
        }
    }

    fn pop_marker(&mut self, s: StackId, expected: BranchId) -> Result<(), ReconstructError> {
        match self.stacks[s.0].slots.pop() {
            Some(Slot::Branch(b)) if b == expected => Ok(()),
            _ => Err(malformed("branch marker out of position")),
        }
    }

    /// Fold a sibling pair: pop the branch marker off the parent stack and
    /// push the folded expression in its place.
    pub fn replace_marker(
        &mut self,
        b: BranchId,
        folded: Expression,
    ) -> Result<StackId, ReconstructError> {
        let parent = self.branches[b.0].parent;
        self.pop_marker(parent, b)?;
        self.push(parent, folded);
        Ok(parent)
    }

    /// Replicate the top `n` expressions in order.
    pub fn dup(&mut self, s: StackId, n: usize) -> Result<(), ReconstructError> {
        let len = self.stacks[s.0].slots.len();
        if n > len {
            return Err(malformed("operand stack underflow"));
        }
        let mut copies = Vec::with_capacity(n);
        for slot in &self.stacks[s.0].slots[len - n..] {
            match slot {
                Slot::Expr(e) => copies.push(Slot::Expr(e.clone())),
                Slot::Branch(_) => {
                    return Err(malformed("unreduced branch where a value was expected"))
                }
            }
        }
        self.stacks[s.0].slots.extend(copies);
        Ok(())
    }

    pub fn swap(&mut self, s: StackId) -> Result<(), ReconstructError> {
        let a = self.pop(s)?;
        let b = self.pop(s)?;
        self.push(s, a);
        self.push(s, b);
        Ok(())
    }
}
