use std::fmt;

use crate::error::RuntimeErrorKind;

/// Result of evaluating a node. `Absent` is the value of statements such as
/// `print`, and of an `if` whose condition failed with no else clause.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    #[default]
    Absent,
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Absent => ValueType::Absent,
            Value::Int(_) => ValueType::Int,
            Value::Bool(_) => ValueType::Bool,
            Value::Text(_) => ValueType::Text,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    pub fn as_int(&self) -> Result<i64, RuntimeErrorKind> {
        match self {
            Value::Int(n) => Ok(*n),
            other => Err(RuntimeErrorKind::TypeMismatch {
                expected: ValueType::Int,
                found: other.value_type(),
            }),
        }
    }

    pub fn as_bool(&self) -> Result<bool, RuntimeErrorKind> {
        match self {
            Value::Bool(b) => Ok(*b),
            other => Err(RuntimeErrorKind::TypeMismatch {
                expected: ValueType::Bool,
                found: other.value_type(),
            }),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Absent => Ok(()),
            Value::Int(n) => write!(f, "{n}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Text(s) => write!(f, "{s}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueType {
    Absent,
    Int,
    Bool,
    Text,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::Absent => "nothing",
            ValueType::Int => "integer",
            ValueType::Bool => "boolean",
            ValueType::Text => "string",
        };
        f.write_str(name)
    }
}
