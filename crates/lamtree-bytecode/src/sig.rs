// SPDX-License-Identifier: (MIT OR Apache-2.0)
//! Descriptor-string parsing.
//!
//! Signatures travel in the compact descriptor form the dump format uses,
//! e.g. `(IJ)D` for `(i32, i64) -> f64` or `(Ljava/lang/String;)Z`.

use lamtree_expr::{MethodSig, PrimType, Type, TypeRef};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SigError {
    #[error("descriptor ended unexpectedly")]
    UnexpectedEnd,
    #[error("unexpected character {0:?} at offset {1}")]
    UnexpectedChar(char, usize),
    #[error("trailing input after descriptor: {0:?}")]
    TrailingInput(String),
}

/// Map a structural class name to a type. Known box classes become
/// `Boxed`, the universal base becomes `Any`, strings get their dedicated
/// object type, everything else is an opaque named reference.
pub fn class_type(name: &str) -> Type {
    match name {
        "java/lang/Object" => Type::Any,
        "java/lang/String" => Type::string(),
        "java/lang/Boolean" => Type::Boxed(PrimType::Bool),
        "java/lang/Byte" => Type::Boxed(PrimType::I8),
        "java/lang/Short" => Type::Boxed(PrimType::I16),
        "java/lang/Character" => Type::Boxed(PrimType::Char),
        "java/lang/Integer" => Type::Boxed(PrimType::I32),
        "java/lang/Long" => Type::Boxed(PrimType::I64),
        "java/lang/Float" => Type::Boxed(PrimType::F32),
        "java/lang/Double" => Type::Boxed(PrimType::F64),
        _ => Type::Object(TypeRef::named(name)),
    }
}

/// Parse a single type descriptor, e.g. `I`, `[D`, `Lacme/Point;`.
pub fn parse_type_descriptor(desc: &str) -> Result<Type, SigError> {
    let mut p = Parser::new(desc);
    let ty = p.ty()?;
    p.end()?;
    Ok(ty)
}

/// Parse a method descriptor, e.g. `(ILjava/lang/String;)Z`.
pub fn parse_method_descriptor(desc: &str) -> Result<MethodSig, SigError> {
    let mut p = Parser::new(desc);
    p.expect('(')?;
    let mut params = Vec::new();
    while p.peek()? != ')' {
        params.push(p.ty()?);
    }
    p.expect(')')?;
    let ret = p.ty()?;
    p.end()?;
    Ok(MethodSig::new(params, ret))
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Parser { src, pos: 0 }
    }

    fn peek(&self) -> Result<char, SigError> {
        self.src[self.pos..].chars().next().ok_or(SigError::UnexpectedEnd)
    }

    fn bump(&mut self) -> Result<char, SigError> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Ok(c)
    }

    fn expect(&mut self, want: char) -> Result<(), SigError> {
        let at = self.pos;
        let got = self.bump()?;
        if got == want {
            Ok(())
        } else {
            Err(SigError::UnexpectedChar(got, at))
        }
    }

    fn end(&self) -> Result<(), SigError> {
        if self.pos == self.src.len() {
            Ok(())
        } else {
            Err(SigError::TrailingInput(self.src[self.pos..].to_string()))
        }
    }

    fn ty(&mut self) -> Result<Type, SigError> {
        let at = self.pos;
        Ok(match self.bump()? {
            'Z' => Type::BOOL,
            'B' => Type::I8,
            'S' => Type::I16,
            'C' => Type::CHAR,
            'I' => Type::I32,
            'J' => Type::I64,
            'F' => Type::F32,
            'D' => Type::F64,
            'V' => Type::Void,
            '[' => Type::Array(Box::new(self.ty()?)),
            'L' => {
                let start = self.pos;
                loop {
                    if self.bump()? == ';' {
                        break;
                    }
                }
                class_type(&self.src[start..self.pos - 1])
            }
            other => return Err(SigError::UnexpectedChar(other, at)),
        })
    }
}
