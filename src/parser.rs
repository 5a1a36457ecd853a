use camino::Utf8Path;
use tree_sitter::{Language, Node};

use crate::syntax::{ArithOp, Conditional, NodeShape, SyntaxPass, node_text};

pub struct PythonPass;

pub static PYTHON: PythonPass = PythonPass;

impl SyntaxPass for PythonPass {
    fn name(&self) -> &'static str {
        "python"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn language(&self) -> Language {
        tree_sitter_python::LANGUAGE.into()
    }

    fn classify<'t>(&self, node: Node<'t>, source: &str) -> Option<NodeShape<'t>> {
        match node.kind() {
            "binary_operator" => {
                let operator = node.child_by_field_name("operator")?;
                let op = ArithOp::from_token(node_text(operator, source))?;
                Some(NodeShape::Binary { op, operator })
            }
            // An elif is a nested if in the language semantics.
            "if_statement" | "elif_clause" => Some(NodeShape::Test {
                kind: Conditional::If,
                condition: node.child_by_field_name("condition")?,
            }),
            "while_statement" => Some(NodeShape::Test {
                kind: Conditional::While,
                condition: node.child_by_field_name("condition")?,
            }),
            _ => None,
        }
    }

    fn negate(&self, condition: &str) -> String {
        format!("not ({})", condition)
    }

    fn is_test_file(&self, path: &Utf8Path) -> bool {
        let name = path.file_name().unwrap_or_default();
        name == "conftest.py"
            || name.starts_with("test_")
            || name.ends_with("_test.py")
            || path
                .parent()
                .is_some_and(|dir| dir.components().any(|c| c.as_str() == "tests"))
    }
}
