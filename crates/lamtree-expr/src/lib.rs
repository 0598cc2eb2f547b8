// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Expression data model for reconstructed closure bodies.
//!
//! Everything downstream (decoder, reducer, resolver, evaluator) builds on
//! the types here: the closed [`Expression`] sum type, the [`Type`] lattice
//! with its assignability rules, constant values, closure descriptors, and
//! the shared [`ReconstructError`] taxonomy.

mod descriptor;
mod error;
mod expr;
mod tree;
mod types;
mod value;

pub use descriptor::ClosureDescriptor;
pub use error::ReconstructError;
pub use expr::{BinOp, Expression, MemberKind, MemberRef, UnaryOp};
pub use tree::{LambdaTree, Param};
pub use types::{MethodSig, PrimType, Type, TypeRef};
pub use value::{CaptureEnv, ConstValue};
