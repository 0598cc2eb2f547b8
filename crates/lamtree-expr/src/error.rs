// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The shared reconstruction error taxonomy.
//!
//! Every error is terminal for the enclosing reconstruct call: no partial
//! tree is ever returned, and nested failures propagate unchanged so the
//! caller sees exactly which operation failed.

use crate::types::Type;

#[derive(Debug, thiserror::Error)]
pub enum ReconstructError {
    /// The inspected value is not a closure, or its descriptor is unusable.
    #[error("not a closure: {0}")]
    NotAClosure(String),

    /// The instruction stream contains a construct outside the pure,
    /// loop-free, single-expression subset (stores, loops, switches, ...).
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(String),

    /// Branch reduction could not fold the pending stacks into one result.
    #[error("malformed branch state: {0}")]
    MalformedBranchState(String),

    /// No legal widening/boxing path between two types.
    #[error("cannot coerce {from} to {to}")]
    TypeMismatch { from: Type, to: Type },

    /// The collaborator could not supply an instruction stream or type.
    #[error("resource not found: {0}")]
    ResourceNotFound(String),

    /// Declared and discovered parameter counts disagree.
    #[error("arity mismatch: declared {declared}, found {found}")]
    ArityMismatch { declared: usize, found: usize },

    /// Nested capture resolution exceeded the fail-fast ceiling.
    #[error("closure resolution recursion limit exceeded at depth {0}")]
    RecursionLimitExceeded(usize),
}
