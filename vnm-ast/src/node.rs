use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "RawNode")]
pub struct Node {
    pub kind: NodeKind,
    pub children: Vec<Node>,
    pub literal: Option<Literal>,
    /// Operator of a `Comparison` node. Always `None` for other kinds.
    pub op: Option<CompareOp>,
}

impl Node {
    pub fn new(kind: NodeKind, children: Vec<Node>) -> Self {
        Self {
            kind,
            children,
            literal: None,
            op: None,
        }
    }

    pub fn leaf(kind: NodeKind, literal: Option<Literal>) -> Self {
        Self {
            kind,
            children: Vec::new(),
            literal,
            op: None,
        }
    }

    pub fn number(n: i64) -> Self {
        Self::leaf(NodeKind::Number, Some(Literal::Int(n)))
    }

    /// A string literal as the front end stores it, quotes included.
    pub fn string(raw: impl Into<String>) -> Self {
        Self::leaf(NodeKind::String, Some(Literal::Text(raw.into())))
    }

    pub fn comparison(left: Node, op: CompareOp, right: Node) -> Self {
        Self {
            kind: NodeKind::Comparison,
            children: vec![left, right],
            literal: None,
            op: Some(op),
        }
    }

    pub fn marker(op: CompareOp) -> Self {
        Self::new(op.into(), Vec::new())
    }

    pub fn child(&self, index: usize) -> Option<&Node> {
        self.children.get(index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    // I/O
    Print,
    Println,

    // arithmetic
    Sum,
    Mul,
    Div,
    Mod,
    Neg,
    Pos,

    // logic
    Or,
    And,
    Not,

    // control flow
    If,
    Null,

    // comparison and its operator markers
    Comparison,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,

    // literals
    Number,
    String,
    True,
    False,

    // statements the evaluator only walks through
    Body,
    Clause,
    VarDecl,
    FnDecl,
    IdentList,
    FnCall,
    BooleanCall,
    ExpList,
    ConditionList,
    Return,
    Assign,
    For,
    While,
    VecConst,
    IdVec,
    IdNum,
    IdBool,
    In,
    NotIn,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Print => "print",
            NodeKind::Println => "println",
            NodeKind::Sum => "sum",
            NodeKind::Mul => "mul",
            NodeKind::Div => "div",
            NodeKind::Mod => "mod",
            NodeKind::Neg => "neg",
            NodeKind::Pos => "pos",
            NodeKind::Or => "or",
            NodeKind::And => "and",
            NodeKind::Not => "not",
            NodeKind::If => "if",
            NodeKind::Null => "null",
            NodeKind::Comparison => "comparison",
            NodeKind::Lt => "lt",
            NodeKind::Le => "le",
            NodeKind::Gt => "gt",
            NodeKind::Ge => "ge",
            NodeKind::Eq => "eq",
            NodeKind::Ne => "ne",
            NodeKind::Number => "number",
            NodeKind::String => "string",
            NodeKind::True => "true",
            NodeKind::False => "false",
            NodeKind::Body => "body",
            NodeKind::Clause => "clause",
            NodeKind::VarDecl => "var_decl",
            NodeKind::FnDecl => "fn_decl",
            NodeKind::IdentList => "ident_list",
            NodeKind::FnCall => "fn_call",
            NodeKind::BooleanCall => "boolean_call",
            NodeKind::ExpList => "exp_list",
            NodeKind::ConditionList => "condition_list",
            NodeKind::Return => "return",
            NodeKind::Assign => "assign",
            NodeKind::For => "for",
            NodeKind::While => "while",
            NodeKind::VecConst => "vec_const",
            NodeKind::IdVec => "id_vec",
            NodeKind::IdNum => "id_num",
            NodeKind::IdBool => "id_bool",
            NodeKind::In => "in",
            NodeKind::NotIn => "not_in",
        };
        f.write_str(name)
    }
}

/// Token payload of a leaf. Numbers may arrive already parsed.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Int(i64),
    Text(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Int(n) => write!(f, "{n}"),
            Literal::Text(s) => f.write_str(s),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    Equal,
    NotEqual,
}

bijective_enum_map::injective_enum_map! {
    CompareOp, NodeKind,
    Less <=> NodeKind::Lt,
    LessEqual <=> NodeKind::Le,
    Greater <=> NodeKind::Gt,
    GreaterEqual <=> NodeKind::Ge,
    Equal <=> NodeKind::Eq,
    NotEqual <=> NodeKind::Ne,
}

impl CompareOp {
    pub fn apply(self, left: i64, right: i64) -> bool {
        match self {
            CompareOp::Less => left < right,
            CompareOp::LessEqual => left <= right,
            CompareOp::Greater => left > right,
            CompareOp::GreaterEqual => left >= right,
            CompareOp::Equal => left == right,
            CompareOp::NotEqual => left != right,
        }
    }
}

/// The shape the front end emits. A comparison arrives as
/// `[left, marker, right]` and is lowered to `[left, right]` plus `op`.
#[derive(Deserialize)]
struct RawNode {
    kind: NodeKind,
    #[serde(default)]
    children: Vec<Node>,
    #[serde(default)]
    value: Option<Literal>,
    #[serde(default)]
    op: Option<CompareOp>,
}

impl From<RawNode> for Node {
    fn from(raw: RawNode) -> Self {
        let RawNode {
            kind,
            mut children,
            value,
            mut op,
        } = raw;

        if kind == NodeKind::Comparison && op.is_none() && children.len() == 3 {
            let marker = children.remove(1);
            // a non-marker middle child leaves `op` unset
            op = CompareOp::try_from(marker.kind).ok();
        }

        Node {
            kind,
            children,
            literal: value,
            op: if kind == NodeKind::Comparison { op } else { None },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_map_to_operators() {
        assert_eq!(CompareOp::try_from(NodeKind::Le), Ok(CompareOp::LessEqual));
        assert_eq!(NodeKind::from(CompareOp::NotEqual), NodeKind::Ne);
        assert!(CompareOp::try_from(NodeKind::Sum).is_err());
    }

    #[test]
    fn deserialize_lowers_ternary_comparison() {
        let json = r#"{
            "kind": "comparison",
            "children": [
                { "kind": "number", "value": 1 },
                { "kind": "ge" },
                { "kind": "number", "value": "2" }
            ]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(
            node,
            Node::comparison(
                Node::number(1),
                CompareOp::GreaterEqual,
                Node::leaf(NodeKind::Number, Some(Literal::Text("2".into()))),
            )
        );
    }

    #[test]
    fn deserialize_keeps_unknown_operator_unset() {
        let json = r#"{
            "kind": "comparison",
            "children": [
                { "kind": "number", "value": 1 },
                { "kind": "true" },
                { "kind": "number", "value": 2 }
            ]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.op, None);
        assert_eq!(node.children.len(), 2);
    }

    #[test]
    fn deserialize_pass_through_and_strings() {
        let json = r#"{
            "kind": "assign",
            "children": [
                { "kind": "id_num", "value": "x" },
                { "kind": "string", "value": "\"hi\"" }
            ]
        }"#;
        let node: Node = serde_json::from_str(json).unwrap();
        assert_eq!(node.kind, NodeKind::Assign);
        assert_eq!(node.child(1), Some(&Node::string("\"hi\"")));
        assert_eq!(node.child(2), None);
    }
}
