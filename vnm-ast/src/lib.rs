pub mod ast;
pub mod node;
