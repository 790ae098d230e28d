use std::io::Write;

use tracing::{debug, instrument};
use vnm_ast::{
    ast::Ast,
    node::{Literal, Node, NodeKind},
};
use vnm_runtime::{
    error::{ArithmeticFault, RuntimeError, RuntimeErrorKind},
    interp::Interpreter,
    value::Value,
};

use crate::stack::ensure_sufficient_stack;

/// Evaluates a tree node by node, writing `print` output to `out`.
pub struct TreeWalkInterpreter<W> {
    out: W,
}

impl<W: Write> TreeWalkInterpreter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_output(self) -> W {
        self.out
    }

    /// Evaluates `node` with `ctx` threaded through to its children.
    ///
    /// Statements that are only walked (declarations, loops, calls, ...)
    /// evaluate to `ctx` itself.
    #[instrument(level = "trace", skip(self, node, ctx), fields(kind = %node.kind))]
    pub fn evaluate(&mut self, node: &Node, ctx: &Value) -> Result<Value, RuntimeError> {
        ensure_sufficient_stack(|| self.eval_node(node, ctx))
    }

    fn eval_node(&mut self, node: &Node, ctx: &Value) -> Result<Value, RuntimeError> {
        let value = match node.kind {
            NodeKind::Print => {
                self.print(node, false)?;
                Value::Absent
            }
            NodeKind::Println => {
                self.print(node, true)?;
                Value::Absent
            }

            NodeKind::Sum => {
                let mut total: i64 = 0;
                for child in &node.children {
                    total = total.wrapping_add(self.int_operand(node, child, ctx)?);
                }
                Value::Int(total)
            }
            NodeKind::Mul => {
                let (left, right) = self.int_operands(node, ctx)?;
                Value::Int(left.wrapping_mul(right))
            }
            NodeKind::Div => {
                let (left, right) = self.int_operands(node, ctx)?;
                if right == 0 {
                    return Err(fault(node, ArithmeticFault::DivisionByZero));
                }
                Value::Int(left.wrapping_div(right))
            }
            NodeKind::Mod => {
                let (left, right) = self.int_operands(node, ctx)?;
                if right == 0 {
                    return Err(fault(node, ArithmeticFault::ModuloByZero));
                }
                Value::Int(left.wrapping_rem(right))
            }
            NodeKind::Neg => {
                let operand = self.int_operand(node, child(node, 0)?, ctx)?;
                Value::Int(operand.wrapping_neg())
            }
            NodeKind::Pos => self.evaluate(child(node, 0)?, ctx)?,

            NodeKind::Or => {
                for child in &node.children {
                    if self.bool_operand(node, child, ctx)? {
                        return Ok(Value::Bool(true));
                    }
                }
                Value::Bool(false)
            }
            NodeKind::And => {
                for child in &node.children {
                    if !self.bool_operand(node, child, ctx)? {
                        return Ok(Value::Bool(false));
                    }
                }
                Value::Bool(true)
            }
            NodeKind::Not => Value::Bool(!self.bool_operand(node, child(node, 0)?, ctx)?),

            NodeKind::If => self.if_else(node, ctx)?,
            NodeKind::Null => Value::Absent,

            NodeKind::Comparison => {
                let left = self.int_operand(node, child(node, 0)?, ctx)?;
                let right = self.int_operand(node, child(node, 1)?, ctx)?;
                match node.op {
                    Some(op) => Value::Bool(op.apply(left, right)),
                    None => {
                        debug!("comparison has no operator, evaluating to false");
                        Value::Bool(false)
                    }
                }
            }
            // only meaningful inside a comparison
            NodeKind::Lt
            | NodeKind::Le
            | NodeKind::Gt
            | NodeKind::Ge
            | NodeKind::Eq
            | NodeKind::Ne => Value::Absent,

            NodeKind::Number => number(node)?,
            NodeKind::String => string(node)?,
            NodeKind::True => Value::Bool(true),
            NodeKind::False => Value::Bool(false),

            NodeKind::Body
            | NodeKind::Clause
            | NodeKind::VarDecl
            | NodeKind::FnDecl
            | NodeKind::IdentList
            | NodeKind::FnCall
            | NodeKind::BooleanCall
            | NodeKind::ExpList
            | NodeKind::ConditionList
            | NodeKind::Return
            | NodeKind::Assign
            | NodeKind::For
            | NodeKind::While
            | NodeKind::VecConst
            | NodeKind::IdVec
            | NodeKind::IdNum
            | NodeKind::IdBool
            | NodeKind::In
            | NodeKind::NotIn => {
                if node.kind != NodeKind::Body && node.kind != NodeKind::Clause {
                    debug!(kind = %node.kind, "statement is not executed, walking children only");
                }
                for child in &node.children {
                    self.evaluate(child, ctx)?;
                }
                ctx.clone()
            }
        };

        Ok(value)
    }

    fn print(&mut self, node: &Node, newline: bool) -> Result<(), RuntimeError> {
        for child in &node.children {
            let value = self.evaluate(child, &Value::Absent)?;
            if !value.is_absent() {
                write!(self.out, "{value}").map_err(|e| output_error(node, e))?;
                self.out.flush().map_err(|e| output_error(node, e))?;
            }
        }

        if newline {
            writeln!(self.out).map_err(|e| output_error(node, e))?;
            self.out.flush().map_err(|e| output_error(node, e))?;
        }

        Ok(())
    }

    fn if_else(&mut self, node: &Node, ctx: &Value) -> Result<Value, RuntimeError> {
        if self.bool_operand(node, child(node, 0)?, ctx)? {
            return self.evaluate(child(node, 1)?, ctx);
        }

        match node.child(2) {
            Some(else_branch) if else_branch.kind != NodeKind::Null => {
                self.evaluate(else_branch, ctx)
            }
            _ => Ok(Value::Absent),
        }
    }

    fn int_operands(&mut self, node: &Node, ctx: &Value) -> Result<(i64, i64), RuntimeError> {
        let left = self.int_operand(node, child(node, 0)?, ctx)?;
        let right = self.int_operand(node, child(node, 1)?, ctx)?;
        Ok((left, right))
    }

    fn int_operand(
        &mut self,
        parent: &Node,
        operand: &Node,
        ctx: &Value,
    ) -> Result<i64, RuntimeError> {
        self.evaluate(operand, ctx)?
            .as_int()
            .map_err(|kind| RuntimeError::new(kind, parent.kind))
    }

    fn bool_operand(
        &mut self,
        parent: &Node,
        operand: &Node,
        ctx: &Value,
    ) -> Result<bool, RuntimeError> {
        self.evaluate(operand, ctx)?
            .as_bool()
            .map_err(|kind| RuntimeError::new(kind, parent.kind))
    }
}

impl<W: Write> Interpreter for TreeWalkInterpreter<W> {
    fn interpret(&mut self, ast: &Ast) -> Result<Value, RuntimeError> {
        self.evaluate(&ast.root, &Value::Absent)
    }
}

fn number(node: &Node) -> Result<Value, RuntimeError> {
    match &node.literal {
        Some(Literal::Int(n)) => Ok(Value::Int(*n)),
        Some(Literal::Text(text)) => text
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|e| malformed(node, format!("invalid integer literal `{text}`: {e}"))),
        None => Err(malformed(node, "number literal without a value".to_string())),
    }
}

fn string(node: &Node) -> Result<Value, RuntimeError> {
    match &node.literal {
        Some(Literal::Text(raw)) => Ok(Value::Text(unquote(raw).to_string())),
        Some(Literal::Int(n)) => Ok(Value::Text(n.to_string())),
        None => Err(malformed(node, "string literal without a value".to_string())),
    }
}

/// Strips one pair of surrounding double quotes, if there is one.
fn unquote(raw: &str) -> &str {
    raw.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(raw)
}

fn child(node: &Node, index: usize) -> Result<&Node, RuntimeError> {
    node.child(index).ok_or_else(|| {
        malformed(
            node,
            format!("expected child {index}, found {} children", node.children.len()),
        )
    })
}

fn fault(node: &Node, fault: ArithmeticFault) -> RuntimeError {
    RuntimeError::new(fault.into(), node.kind)
}

fn malformed(node: &Node, message: String) -> RuntimeError {
    RuntimeError::new(RuntimeErrorKind::MalformedNode(message), node.kind)
}

fn output_error(node: &Node, error: std::io::Error) -> RuntimeError {
    RuntimeError::new(error.into(), node.kind)
}
