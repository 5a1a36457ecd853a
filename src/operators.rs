//! Mutation operators.
//!
//! Operators are plain functions of a [`NodeShape`]: a predicate deciding whether
//! the operator applies, and an edit producing replacement text for exactly one
//! span. When several operators accept the same node, the first one in
//! [`PRIORITY`] (restricted to the enabled set) is the only one ever generated.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::syntax::{ArithOp, Conditional, NodeShape, SyntaxPass, node_text};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorId {
    AddToSub,
    SubToAdd,
    MulToDiv,
    DivToMul,
    NegateIf,
    NegateWhile,
}

/// Tie-break order, highest priority first.
pub const PRIORITY: [OperatorId; 6] = [
    OperatorId::AddToSub,
    OperatorId::SubToAdd,
    OperatorId::MulToDiv,
    OperatorId::DivToMul,
    OperatorId::NegateIf,
    OperatorId::NegateWhile,
];

impl OperatorId {
    pub fn name(self) -> &'static str {
        match self {
            OperatorId::AddToSub => "add_to_sub",
            OperatorId::SubToAdd => "sub_to_add",
            OperatorId::MulToDiv => "mul_to_div",
            OperatorId::DivToMul => "div_to_mul",
            OperatorId::NegateIf => "negate_if",
            OperatorId::NegateWhile => "negate_while",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        PRIORITY.into_iter().find(|op| op.name() == name)
    }

    pub fn matches(self, shape: &NodeShape) -> bool {
        match (self, shape) {
            (OperatorId::AddToSub, NodeShape::Binary { op, .. }) => *op == ArithOp::Add,
            (OperatorId::SubToAdd, NodeShape::Binary { op, .. }) => *op == ArithOp::Sub,
            (OperatorId::MulToDiv, NodeShape::Binary { op, .. }) => *op == ArithOp::Mul,
            (OperatorId::DivToMul, NodeShape::Binary { op, .. }) => *op == ArithOp::Div,
            (OperatorId::NegateIf, NodeShape::Test { kind, .. }) => *kind == Conditional::If,
            (OperatorId::NegateWhile, NodeShape::Test { kind, .. }) => *kind == Conditional::While,
            _ => false,
        }
    }
}

impl fmt::Display for OperatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pick the operator for `shape` among `enabled`, honouring [`PRIORITY`].
pub fn select(shape: &NodeShape, enabled: &[OperatorId]) -> Option<OperatorId> {
    PRIORITY
        .into_iter()
        .filter(|op| enabled.contains(op))
        .find(|op| op.matches(shape))
}

/// A single-span replacement in a source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edit {
    pub start_byte: usize,
    pub end_byte: usize,
    pub original: String,
    pub replacement: String,
}

/// The edit `op` makes to `shape`, or `None` if the operator does not apply.
pub fn edit_for(
    op: OperatorId,
    shape: &NodeShape,
    source: &str,
    pass: &dyn SyntaxPass,
) -> Option<Edit> {
    if !op.matches(shape) {
        return None;
    }
    let span = shape.anchor();
    let original = node_text(span, source).to_string();
    let replacement = match (op, shape) {
        (OperatorId::AddToSub, _) => ArithOp::Sub.token().to_string(),
        (OperatorId::SubToAdd, _) => ArithOp::Add.token().to_string(),
        (OperatorId::MulToDiv, _) => ArithOp::Div.token().to_string(),
        (OperatorId::DivToMul, _) => ArithOp::Mul.token().to_string(),
        (OperatorId::NegateIf | OperatorId::NegateWhile, _) => pass.negate(&original),
    };
    Some(Edit {
        start_byte: span.start_byte(),
        end_byte: span.end_byte(),
        original,
        replacement,
    })
}

pub fn splice(source: &str, edit: &Edit) -> String {
    let mut result = String::with_capacity(source.len() + edit.replacement.len());
    result.push_str(&source[..edit.start_byte]);
    result.push_str(&edit.replacement);
    result.push_str(&source[edit.end_byte..]);
    result
}
