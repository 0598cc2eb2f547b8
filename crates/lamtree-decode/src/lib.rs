// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Instruction decoding: an operand-stack emulator that turns a linear
//! instruction stream back into one expression tree.
//!
//! The decoder threads explicit state through a per-instruction loop: one
//! *active* stack plus a table of stacks *pending* at join labels. At each
//! label the branch reducer folds the gathered stacks back into structured
//! conditionals and short-circuit logical operators. Stack and branch
//! frames live in a flat arena and link by index.

mod decoder;
mod frames;
mod reduce;

pub use decoder::{decode, DecodeContext};
