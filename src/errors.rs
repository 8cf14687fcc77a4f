//! Error types for the shape lowering stage and the reference interpreter.

use derive_more::Display;
use trunk_ir::rewrite::IllegalOp;

pub type LoweringResult<T> = Result<T, LoweringError>;

#[derive(Clone, Display, Debug, PartialEq)]
#[display("{kind}")]
pub struct LoweringError {
    kind: Box<LoweringErrorKind>,
}

impl<E> From<E> for LoweringError
where
    LoweringErrorKind: From<E>,
{
    fn from(error: E) -> Self {
        LoweringError {
            kind: Box::new(LoweringErrorKind::from(error)),
        }
    }
}

impl LoweringError {
    pub fn not_a_module(msg: impl std::fmt::Display) -> Self {
        LoweringErrorKind::NotAModule(msg.to_string()).into()
    }

    pub fn kind(&self) -> &LoweringErrorKind {
        &self.kind
    }

    /// The illegal operations left behind, if that is why lowering failed.
    pub fn illegal_operations(&self) -> &[IllegalOp] {
        match &*self.kind {
            LoweringErrorKind::IllegalOperations(ops) => ops,
            LoweringErrorKind::NotAModule(_) => &[],
        }
    }
}

#[derive(Clone, Display, Debug, PartialEq, derive_more::From)]
pub enum LoweringErrorKind {
    #[display("Illegal operations remain after lowering: {}", format_ops(_0))]
    IllegalOperations(Vec<IllegalOp>),

    #[display("Not a module: {_0}")]
    #[from(skip)]
    NotAModule(String),
}

fn format_ops(ops: &[IllegalOp]) -> String {
    ops.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl std::error::Error for LoweringError {}

pub type InterpResult<T> = Result<T, InterpError>;

/// Failure while executing lowered IR.
#[derive(Clone, Display, Debug, PartialEq)]
pub enum InterpError {
    #[display("Function not found: {_0}")]
    FunctionNotFound(String),

    #[display("Unsupported operation: {_0}")]
    UnsupportedOperation(String),

    #[display("Type mismatch in {op}: expected {expected}")]
    TypeMismatch { op: String, expected: &'static str },

    #[display("Index {index} out of bounds for extent {extent}")]
    OutOfBounds { index: u64, extent: u64 },

    #[display("Arity mismatch in {op}: expected {expected}, got {actual}")]
    ArityMismatch {
        op: String,
        expected: usize,
        actual: usize,
    },

    #[display("Requirement failed: {_0}")]
    RequirementFailed(String),

    #[display("Value {_0} used before definition")]
    Undefined(String),
}

impl std::error::Error for InterpError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        let err = LoweringError::not_a_module("func.func");
        assert_eq!(err.to_string(), "Not a module: func.func");
        assert!(err.illegal_operations().is_empty());

        let err = InterpError::OutOfBounds {
            index: 3,
            extent: 2,
        };
        assert_eq!(err.to_string(), "Index 3 out of bounds for extent 2");
    }
}
