// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! A tree-walking evaluator for reconstructed closure trees.
//!
//! Useful for testing reconstructions against the original closure's
//! behavior and for executing trees detached from any host runtime.
//! Member nodes reference host objects the evaluator cannot see and fail
//! with [`EvalError::Opaque`].

mod interp;
mod value;

pub use interp::{evaluate, EvalError};
pub use value::{ClosureValue, Value};
