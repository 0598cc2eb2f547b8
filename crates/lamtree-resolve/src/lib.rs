// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Closure resolution: the top-level reconstruction entry point.
//!
//! A [`Resolver`] turns an opaque closure value (or an explicit
//! [`lamtree_expr::ClosureDescriptor`]) into a shared
//! [`lamtree_expr::LambdaTree`]: it fetches the target instruction stream
//! from a [`Host`], drives the decoder, eta-reduces forwarding wrappers,
//! splices captured closures in recursively, and caches finished trees by
//! descriptor.

mod dump;
mod host;
mod resolver;
mod splice;

pub use dump::{DumpArtifact, DumpError, DumpHost, DumpedBody, DumpedClosure, DumpedStatic};
pub use host::Host;
pub use resolver::{Resolver, DEFAULT_RECURSION_LIMIT};
