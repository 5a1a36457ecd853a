use camino::Utf8Path;
use tree_sitter::{Language, Node};

use crate::syntax::{ArithOp, Conditional, NodeShape, SyntaxPass, node_text};

pub struct RustPass;

pub static RUST: RustPass = RustPass;

impl SyntaxPass for RustPass {
    fn name(&self) -> &'static str {
        "rust"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["rs"]
    }

    fn language(&self) -> Language {
        tree_sitter_rust::LANGUAGE.into()
    }

    fn classify<'t>(&self, node: Node<'t>, source: &str) -> Option<NodeShape<'t>> {
        let kind = match node.kind() {
            "binary_expression" => {
                let operator = node.child_by_field_name("operator")?;
                let op = ArithOp::from_token(node_text(operator, source))?;
                return Some(NodeShape::Binary { op, operator });
            }
            "if_expression" => Conditional::If,
            "while_expression" => Conditional::While,
            _ => return None,
        };
        let condition = node.child_by_field_name("condition")?;
        // Pattern matches have no boolean to negate.
        if matches!(condition.kind(), "let_condition" | "let_chain") {
            return None;
        }
        Some(NodeShape::Test { kind, condition })
    }

    fn negate(&self, condition: &str) -> String {
        format!("!({})", condition)
    }

    fn is_test_file(&self, path: &Utf8Path) -> bool {
        path.components().next().is_some_and(|c| c.as_str() == "tests")
            || path.file_name().is_some_and(|name| name == "tests.rs")
    }
}
