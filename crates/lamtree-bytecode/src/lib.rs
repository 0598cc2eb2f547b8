// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The linear stack-machine instruction model.
//!
//! A compiled closure body arrives as a [`MethodBody`]: a flat instruction
//! sequence with labels marking join points. This crate defines the
//! instruction set, descriptor-string parsing into structured
//! [`MethodSig`]s, and a [`BodyBuilder`] for assembling streams by hand.

mod builder;
mod instr;
mod sig;

pub use builder::BodyBuilder;
pub use instr::{Instr, InvokeKind, JumpCond, Label, MethodBody};
pub use sig::{class_type, parse_method_descriptor, parse_type_descriptor, SigError};
