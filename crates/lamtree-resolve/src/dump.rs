// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! A host backed by a dumped JSON artifact.
//!
//! When structural introspection of live closures is unavailable, the
//! producing side can dump descriptors and instruction streams to a JSON
//! artifact; [`DumpHost`] then serves reconstruction entirely from that
//! file.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use lamtree_bytecode::{class_type, MethodBody};
use lamtree_expr::{ClosureDescriptor, ConstValue, MethodSig, ReconstructError, Type, TypeRef};

use crate::host::Host;

#[derive(Debug, thiserror::Error)]
pub enum DumpError {
    #[error("cannot read dump artifact: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed dump artifact: {0}")]
    Json(#[from] serde_json::Error),
}

/// A named closure entry of the artifact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpedClosure {
    pub name: String,
    pub descriptor: ClosureDescriptor,
}

/// One dumped instruction stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpedBody {
    pub owner: String,
    pub method: String,
    pub body: MethodBody,
}

/// A dumped static-field constant, inlineable during decode.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DumpedStatic {
    pub owner: String,
    pub name: String,
    pub value: ConstValue,
}

/// The artifact root: named closures, the instruction streams they (and
/// their nested targets) need, and name-resolution side tables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DumpArtifact {
    pub closures: Vec<DumpedClosure>,
    pub bodies: Vec<DumpedBody>,
    #[serde(default)]
    pub synthetic_types: Vec<String>,
    #[serde(default)]
    pub statics: Vec<DumpedStatic>,
}

pub struct DumpHost {
    artifact: DumpArtifact,
}

impl DumpHost {
    pub fn new(artifact: DumpArtifact) -> Self {
        DumpHost { artifact }
    }

    pub fn from_json(json: &str) -> Result<Self, DumpError> {
        Ok(DumpHost::new(serde_json::from_str(json)?))
    }

    pub fn from_file(path: &Path) -> Result<Self, DumpError> {
        DumpHost::from_json(&fs::read_to_string(path)?)
    }

    pub fn closures(&self) -> impl Iterator<Item = &DumpedClosure> {
        self.artifact.closures.iter()
    }

    pub fn closure(&self, name: &str) -> Option<&ClosureDescriptor> {
        self.artifact.closures.iter().find(|c| c.name == name).map(|c| &c.descriptor)
    }
}

impl Host for DumpHost {
    fn fetch_body(
        &self,
        owner: &str,
        method: &str,
        _sig: &MethodSig,
    ) -> Result<MethodBody, ReconstructError> {
        self.artifact
            .bodies
            .iter()
            .find(|b| b.owner == owner && b.method == method)
            .map(|b| b.body.clone())
            .ok_or_else(|| ReconstructError::ResourceNotFound(format!("{owner}.{method}")))
    }

    fn describe_closure(
        &self,
        value: &ConstValue,
    ) -> Result<ClosureDescriptor, ReconstructError> {
        match value {
            ConstValue::Closure(desc) => Ok((**desc).clone()),
            other => Err(ReconstructError::NotAClosure(other.to_string())),
        }
    }

    fn resolve_type(&self, name: &str) -> Result<Type, ReconstructError> {
        if self.artifact.synthetic_types.iter().any(|s| s == name) {
            Ok(Type::Object(TypeRef::synthetic(name)))
        } else {
            Ok(class_type(name))
        }
    }

    fn static_value(
        &self,
        owner: &str,
        name: &str,
    ) -> Result<Option<ConstValue>, ReconstructError> {
        Ok(self
            .artifact
            .statics
            .iter()
            .find(|s| s.owner == owner && s.name == name)
            .map(|s| s.value.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    use lamtree_bytecode::{BodyBuilder, Instr};
    use lamtree_expr::{BinOp, Expression};

    use crate::resolver::Resolver;

    fn sample_artifact() -> DumpArtifact {
        let mut b = BodyBuilder::new();
        b.load(0).push(Instr::Const(ConstValue::I32(1))).arith(BinOp::Add).ret();
        let sig = MethodSig::new(vec![Type::I32], Type::I32);
        DumpArtifact {
            closures: vec![DumpedClosure {
                name: "increment".into(),
                descriptor: ClosureDescriptor {
                    owner: "acme/Math".into(),
                    method: "lambda$increment$0".into(),
                    signature: sig,
                    arity: 1,
                    has_receiver: false,
                    captures: Vec::new(),
                },
            }],
            bodies: vec![DumpedBody {
                owner: "acme/Math".into(),
                method: "lambda$increment$0".into(),
                body: b.finish(),
            }],
            synthetic_types: Vec::new(),
            statics: Vec::new(),
        }
    }

    #[test]
    fn artifact_round_trips_through_json() {
        let artifact = sample_artifact();
        let json = serde_json::to_string(&artifact).unwrap();
        let host = DumpHost::from_json(&json).unwrap();
        assert!(host.closure("increment").is_some());
        assert!(host.closure("missing").is_none());
    }

    #[test]
    fn resolves_a_closure_from_a_dumped_file() {
        let json = serde_json::to_string(&sample_artifact()).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();

        let host = DumpHost::from_file(file.path()).unwrap();
        let resolver = Resolver::new(&host);
        let desc = host.closure("increment").unwrap().clone();
        let tree = resolver.reconstruct_descriptor(&desc).unwrap();
        assert_eq!(
            tree.body,
            Expression::binary(
                BinOp::Add,
                Expression::parameter(0, Type::I32),
                Expression::constant(ConstValue::I32(1)),
            )
        );
    }

    #[test]
    fn malformed_artifacts_fail_loudly() {
        assert!(matches!(DumpHost::from_json("{not json"), Err(DumpError::Json(_))));
    }
}
