//! Language-neutral view over a tree-sitter parse tree.
//!
//! A [`SyntaxPass`] turns grammar-specific nodes into [`NodeShape`]s, which is
//! all the locator and the operators ever look at. Supporting a new language
//! means writing one more pass.

use camino::Utf8Path;
use serde::{Deserialize, Serialize};
use tree_sitter::{Language, Node, Parser, Point, Tree};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl ArithOp {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "+" => Some(ArithOp::Add),
            "-" => Some(ArithOp::Sub),
            "*" => Some(ArithOp::Mul),
            "/" => Some(ArithOp::Div),
            _ => None,
        }
    }

    pub fn token(self) -> &'static str {
        match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Conditional {
    If,
    While,
}

/// A node the operators know how to rewrite.
#[derive(Debug, Clone, Copy)]
pub enum NodeShape<'t> {
    /// `left <op> right`; `operator` is the operator token.
    Binary { op: ArithOp, operator: Node<'t> },
    /// The boolean test of an `if` or `while`.
    Test { kind: Conditional, condition: Node<'t> },
}

impl<'t> NodeShape<'t> {
    /// The token whose position identifies this shape within its file.
    pub fn anchor(&self) -> Node<'t> {
        match self {
            NodeShape::Binary { operator, .. } => *operator,
            NodeShape::Test { condition, .. } => *condition,
        }
    }
}

pub trait SyntaxPass: Send + Sync {
    fn name(&self) -> &'static str;

    fn extensions(&self) -> &'static [&'static str];

    fn language(&self) -> Language;

    fn classify<'t>(&self, node: Node<'t>, source: &str) -> Option<NodeShape<'t>>;

    /// Wrap a condition so that it evaluates to the opposite truth value.
    fn negate(&self, condition: &str) -> String;

    /// Files that belong to the project's own test suite.
    fn is_test_file(&self, path: &Utf8Path) -> bool;

    fn handles(&self, path: &Utf8Path) -> bool {
        path.extension()
            .is_some_and(|ext| self.extensions().contains(&ext))
    }

    /// Parse `source`, rejecting any tree that contains error or missing nodes.
    fn parse(&self, source: &str) -> Result<Tree, String> {
        let mut parser = Parser::new();
        parser
            .set_language(&self.language())
            .map_err(|e| format!("unable to load {} grammar: {}", self.name(), e))?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| "parser gave up".to_string())?;
        let root = tree.root_node();
        if root.has_error() {
            let at = first_error(root).unwrap_or(root.start_position());
            return Err(format!(
                "syntax error at line {}, column {}",
                at.row + 1,
                at.column + 1
            ));
        }
        Ok(tree)
    }

    fn is_well_formed(&self, source: &str) -> bool {
        self.parse(source).is_ok()
    }
}

pub fn node_text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    &source[node.start_byte()..node.end_byte()]
}

fn first_error(node: Node) -> Option<Point> {
    if node.is_error() || node.is_missing() {
        return Some(node.start_position());
    }
    if !node.has_error() {
        return None;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        if let Some(at) = first_error(child) {
            return Some(at);
        }
    }
    None
}

/// Every shape in the tree, in document order.
pub fn shapes<'t>(pass: &dyn SyntaxPass, tree: &'t Tree, source: &str) -> Vec<NodeShape<'t>> {
    let mut found = Vec::new();
    let mut stack = vec![tree.root_node()];
    while let Some(node) = stack.pop() {
        if let Some(shape) = pass.classify(node, source) {
            found.push(shape);
        }
        let mut cursor = node.walk();
        let children: Vec<Node<'t>> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    found
}
