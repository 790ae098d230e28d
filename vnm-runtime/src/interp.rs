use vnm_ast::ast::Ast;

use crate::{error::RuntimeError, value::Value};

pub trait Interpreter {
    fn interpret(&mut self, ast: &Ast) -> Result<Value, RuntimeError>;
}
