use serde::Deserialize;

use crate::node::Node;

/// A finished tree handed over by the front end.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(transparent)]
pub struct Ast {
    pub root: Node,
}

impl Ast {
    pub fn new(root: Node) -> Self {
        Self { root }
    }
}
