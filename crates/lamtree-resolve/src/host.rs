// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! The collaborator supplying instruction streams and name lookups.

use lamtree_bytecode::MethodBody;
use lamtree_expr::{ClosureDescriptor, ConstValue, MethodSig, ReconstructError, Type};

/// Everything the resolver consumes from the host runtime. The core never
/// loads classes or touches the filesystem itself; a `Host` does, however
/// it sees fit (live runtime, dump artifact, test fixture).
pub trait Host {
    /// The instruction stream of a target operation.
    fn fetch_body(
        &self,
        owner: &str,
        method: &str,
        sig: &MethodSig,
    ) -> Result<MethodBody, ReconstructError>;

    /// Extract the structured descriptor of an opaque closure value.
    fn describe_closure(&self, value: &ConstValue)
        -> Result<ClosureDescriptor, ReconstructError>;

    /// Look up a structural type name.
    fn resolve_type(&self, name: &str) -> Result<Type, ReconstructError>;

    /// The value of a static field, when the host can see it as an
    /// inlineable constant.
    fn static_value(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<ConstValue>, ReconstructError>;
}
