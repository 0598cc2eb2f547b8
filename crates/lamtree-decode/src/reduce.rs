// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Branch reduction at control-flow join points.
//!
//! At a join the decoder hands over every stack that targets the label;
//! reduction works pairwise from the most recently added backward. The
//! sibling case folds an ordinary ternary. The two short-circuit cases
//! recognize the stack shapes `&&`/`||` compile to and fuse the branch
//! tests into one composite logical expression, deferring the final
//! conditional to a later join. Anything left unreduced is a hard error,
//! never a silently chosen branch.

use lamtree_expr::{Expression, ReconstructError};

use crate::frames::{Frames, StackId};

fn malformed(msg: &str) -> ReconstructError {
    ReconstructError::MalformedBranchState(msg.to_string())
}

/// Collapse the stacks gathered at one join label into a single stack.
pub(crate) fn reduce_join(
    frames: &mut Frames,
    mut stacks: Vec<StackId>,
) -> Result<StackId, ReconstructError> {
    let second = match stacks.pop() {
        Some(s) => s,
        None => return Err(malformed("join label with no incoming stacks")),
    };
    if stacks.is_empty() {
        return Ok(second);
    }
    let first = stacks[stacks.len() - 1];
    if let Some(reduced) = reduce_pair(frames, first, second)? {
        let last = stacks.len() - 1;
        stacks[last] = reduced;
        return reduce_join(frames, stacks);
    }
    // The most recent pair did not fold directly; reduce the rest first,
    // then retry against the combined result.
    let first = reduce_join(frames, stacks)?;
    match reduce_pair(frames, first, second)? {
        Some(s) => Ok(s),
        None => Err(malformed("residual branch states at join")),
    }
}

/// Try to fold two stacks. Returns the surviving stack, or `None` when the
/// pair matches no reducible shape.
fn reduce_pair(
    frames: &mut Frames,
    first: StackId,
    second: StackId,
) -> Result<Option<StackId>, ReconstructError> {
    let first_depth = frames.depth(first);
    let second_depth = frames.depth(second);

    if first_depth == second_depth {
        let (first_b, second_b) = match (frames.parent_branch(first), frames.parent_branch(second))
        {
            (Some(a), Some(b)) => (a, b),
            _ => return Ok(None),
        };

        if first_b == second_b {
            // Sibling case: both children of one branch, one value each.
            let if_true = frames.pop(frames.true_stack(first_b))?;
            let if_false = frames.pop(frames.false_stack(first_b))?;
            let folded = Expression::conditional(frames.test(first_b), if_true, if_false);
            return frames.replace_marker(first_b, folded).map(Some);
        }

        if frames.len(first) == 0 && frames.len(second) == 0 {
            // Equal-depth short circuit: the two branches hang off the two
            // children of a common grandparent. Fuse the three tests into a
            // conditional-of-tests and rewire one branch under the
            // grandparent's parent.
            let first_bb = frames.parent_branch(frames.branch_parent(first_b));
            let second_bb = frames.parent_branch(frames.branch_parent(second_b));
            if let (Some(first_bb), Some(second_bb)) = (first_bb, second_bb) {
                if first_bb == second_bb {
                    let mut f_test = frames.test(first_b);
                    let survivor_sibling;
                    if frames.true_stack(first_b) != first {
                        f_test = Expression::logical_not(f_test);
                        survivor_sibling = frames.true_stack(first_b);
                    } else {
                        survivor_sibling = frames.false_stack(first_b);
                    }

                    let mut s_test = frames.test(second_b);
                    if frames.true_stack(second_b) != second {
                        s_test = Expression::logical_not(s_test);
                        frames.mark_reduced(frames.true_stack(second_b));
                    } else {
                        frames.mark_reduced(frames.false_stack(second_b));
                    }

                    let mut root_test = frames.test(first_bb);
                    if frames.true_stack(first_bb) != frames.branch_parent(first_b) {
                        root_test = Expression::logical_not(root_test);
                    }
                    let fused = Expression::conditional(root_test, f_test, s_test);

                    let parent = frames.branch_parent(first_bb);
                    frames.rewire(parent, first_bb, fused, first, survivor_sibling)?;
                    return Ok(Some(first));
                }
            }
        }
        return Ok(None);
    }

    if frames.len(first) == 0 && frames.len(second) == 0 {
        // Unequal-depth short circuit: the deeper branch nests inside a
        // child of the shallower one; fuse its test conjunctively.
        let (older, younger) =
            if first_depth > second_depth { (second, first) } else { (first, second) };
        let (older_b, younger_b) =
            match (frames.parent_branch(older), frames.parent_branch(younger)) {
                (Some(a), Some(b)) => (a, b),
                _ => return Ok(None),
            };

        let on_true = frames.true_stack(older_b) == older;

        let mut young_test = frames.test(younger_b);
        let same_side =
            if on_true { frames.true_stack(younger_b) } else { frames.false_stack(younger_b) };
        let other = if same_side != younger {
            young_test = Expression::logical_not(young_test);
            same_side
        } else if on_true {
            frames.false_stack(younger_b)
        } else {
            frames.true_stack(younger_b)
        };

        let mut test = Expression::logical_and(frames.test(older_b), young_test);
        if !on_true {
            test = Expression::logical_not(test);
        }

        let parent = frames.branch_parent(older_b);
        frames.rewire(parent, older_b, test, older, other)?;
        return Ok(Some(older));
    }

    Ok(None)
}
