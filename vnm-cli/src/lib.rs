use std::{
    fs,
    io::{self, Read, Write},
    path::Path,
};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};
use vnm_ast::ast::Ast;
use vnm_runtime::{error::RuntimeError, interp::Interpreter, value::Value};
use vnm_treewalk::interp::TreeWalkInterpreter;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to read program: {0}")]
    Read(#[source] io::Error),
    #[error("failed to write output: {0}")]
    Write(#[source] io::Error),
    #[error("invalid syntax tree: {0}")]
    Json(#[from] serde_json::Error),
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// Evaluates a JSON-encoded tree, writing program output to `out`.
pub fn run_source(source: &str, out: &mut impl Write) -> Result<Value, CliError> {
    let ast = load(source)?;
    debug!(root = %ast.root.kind, "loaded syntax tree");

    let mut interp = TreeWalkInterpreter::new(out);
    let value = interp.interpret(&ast)?;

    info!(?value, "evaluation finished");
    Ok(value)
}

/// Parses a tree of any depth. Nesting is bounded only by memory.
pub fn load(source: &str) -> Result<Ast, CliError> {
    let mut json = serde_json::Deserializer::from_str(source);
    json.disable_recursion_limit();
    let ast = Ast::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(ast)
}

pub fn run_file(path: &Path, out: &mut impl Write) -> Result<Value, CliError> {
    let source = fs::read_to_string(path).map_err(CliError::Read)?;
    run_source(&source, out)
}

pub fn run_stdin(out: &mut impl Write) -> Result<Value, CliError> {
    let mut source = String::new();
    io::stdin()
        .read_to_string(&mut source)
        .map_err(CliError::Read)?;
    run_source(&source, out)
}

/// Writes the root value on its own line, unless it is absent.
pub fn print_result(value: &Value, out: &mut impl Write) -> Result<(), CliError> {
    if !value.is_absent() {
        writeln!(out, "{value}").map_err(CliError::Write)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_json_tree() {
        let source = r#"{
            "kind": "println",
            "children": [
                { "kind": "string", "value": "\"n=\"" },
                { "kind": "sum", "children": [
                    { "kind": "number", "value": "40" },
                    { "kind": "number", "value": 2 }
                ] }
            ]
        }"#;
        let mut out = Vec::new();
        let value = run_source(source, &mut out).unwrap();
        assert_eq!(value, Value::Absent);
        assert_eq!(String::from_utf8(out).unwrap(), "n=42\n");
    }

    #[test]
    fn returns_root_value() {
        let source = r#"{ "kind": "neg", "children": [{ "kind": "number", "value": 3 }] }"#;
        let mut out = Vec::new();
        assert_eq!(run_source(source, &mut out).unwrap(), Value::Int(-3));
    }

    fn nested(kind: &str, depth: usize, leaf: &str) -> String {
        let mut source = leaf.to_string();
        for _ in 0..depth {
            source = format!(r#"{{ "kind": "{kind}", "children": [{source}] }}"#);
        }
        source
    }

    #[test]
    fn loads_deeply_nested_trees() {
        let source = nested("pos", 100, r#"{ "kind": "number", "value": 1 }"#);
        let mut out = Vec::new();
        assert_eq!(run_source(&source, &mut out).unwrap(), Value::Int(1));

        let source = nested(
            "clause",
            2_000,
            r#"{ "kind": "println", "children": [{ "kind": "number", "value": 7 }] }"#,
        );
        let mut out = Vec::new();
        assert_eq!(run_source(&source, &mut out).unwrap(), Value::Absent);
        assert_eq!(String::from_utf8(out).unwrap(), "7\n");
    }

    #[test]
    fn rejects_trailing_input() {
        let mut out = Vec::new();
        let err = run_source(r#"{ "kind": "true" } {"#, &mut out).unwrap_err();
        assert!(matches!(err, CliError::Json(_)));
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn print_result_skips_absent_values() {
        let mut out = Vec::new();
        print_result(&Value::Absent, &mut out).unwrap();
        print_result(&Value::Int(-3), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "-3\n");
    }

    #[test]
    fn print_result_reports_write_failures() {
        let err = print_result(&Value::Bool(true), &mut BrokenPipe).unwrap_err();
        assert!(matches!(err, CliError::Write(_)));
        assert!(err.to_string().starts_with("failed to write output"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let mut out = Vec::new();
        let err = run_file(Path::new("does/not/exist.json"), &mut out).unwrap_err();
        assert!(matches!(err, CliError::Read(_)));
    }

    #[test]
    fn rejects_unknown_kind() {
        let mut out = Vec::new();
        let err = run_source(r#"{ "kind": "lambda" }"#, &mut out).unwrap_err();
        assert!(matches!(err, CliError::Json(_)));
    }

    #[test]
    fn reports_runtime_errors() {
        let source = r#"{ "kind": "div", "children": [
            { "kind": "number", "value": 1 },
            { "kind": "number", "value": 0 }
        ] }"#;
        let mut out = Vec::new();
        let err = run_source(source, &mut out).unwrap_err();
        assert!(matches!(err, CliError::Runtime(_)));
        assert_eq!(err.to_string(), "runtime error: division by zero (in `div`)");
    }
}
