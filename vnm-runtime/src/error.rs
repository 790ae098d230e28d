use std::io;

use thiserror::Error;
use vnm_ast::node::NodeKind;

use crate::value::ValueType;

#[derive(Debug, Error)]
#[error("{kind} (in `{node}`)")]
pub struct RuntimeError {
    pub kind: RuntimeErrorKind,
    /// Kind of the node whose handler failed.
    pub node: NodeKind,
}

impl RuntimeError {
    pub fn new(kind: RuntimeErrorKind, node: NodeKind) -> Self {
        Self { kind, node }
    }
}

#[derive(Debug, Error)]
pub enum RuntimeErrorKind {
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: ValueType,
        found: ValueType,
    },
    #[error(transparent)]
    Arithmetic(#[from] ArithmeticFault),
    /// The tree broke an invariant its producer guarantees.
    #[error("malformed node: {0}")]
    MalformedNode(String),
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ArithmeticFault {
    #[error("division by zero")]
    DivisionByZero,
    #[error("modulo by zero")]
    ModuloByZero,
}
