// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Closure descriptors: the structured identity of a closure's target
//! operation plus its captured environment.

use crate::types::MethodSig;
use crate::value::ConstValue;

/// Metadata naming a closure's target operation and listing its captured
/// values, as produced by a host's `describe_closure`.
///
/// The target signature covers the *implementation* operation: captured
/// values bind its leading parameters (after the receiver, when present),
/// and `arity` is the number of parameters the closure exposes to callers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClosureDescriptor {
    /// Owner type of the target operation, as a structural name.
    pub owner: String,
    /// Target operation name.
    pub method: String,
    /// Target operation signature (captures + exposed parameters).
    pub signature: MethodSig,
    /// Number of parameters the closure exposes after captures are bound.
    pub arity: usize,
    /// Whether `captures[0]` is an implicit receiver occupying slot 0.
    pub has_receiver: bool,
    /// Captured values, in binding order.
    pub captures: Vec<ConstValue>,
}

impl ClosureDescriptor {
    /// Captured values that bind parameters, i.e. excluding the receiver.
    pub fn bound_captures(&self) -> &[ConstValue] {
        if self.has_receiver && !self.captures.is_empty() {
            &self.captures[1..]
        } else {
            &self.captures
        }
    }

    /// The signature the closure exposes once captures are bound: the
    /// trailing `arity` parameters of the target signature.
    pub fn exposed_sig(&self) -> MethodSig {
        let skip = self.signature.params.len().saturating_sub(self.arity);
        MethodSig {
            params: self.signature.params[skip..].to_vec(),
            ret: self.signature.ret.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Type;

    #[test]
    fn exposed_sig_drops_bound_leading_params() {
        let desc = ClosureDescriptor {
            owner: "acme/Math".into(),
            method: "scaled".into(),
            signature: MethodSig::new(vec![Type::F64, Type::I32], Type::F64),
            arity: 1,
            has_receiver: false,
            captures: vec![ConstValue::F64(2.5)],
        };
        assert_eq!(desc.exposed_sig(), MethodSig::new(vec![Type::I32], Type::F64));
        assert_eq!(desc.bound_captures(), &[ConstValue::F64(2.5)]);
    }
}
