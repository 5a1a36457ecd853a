pub mod config;
pub mod copy_tree;
pub mod engine;
pub mod error;
pub mod locator;
pub mod mutants;
pub mod operators;
pub mod output;
pub mod parser;
pub mod parser_rust;
pub mod pool;
pub mod runner;
pub mod sandbox;
pub mod stats;
pub mod syntax;

use syntax::SyntaxPass;

/// Every language the tool can mutate.
pub static PASSES: [&dyn SyntaxPass; 2] = [&parser::PYTHON, &parser_rust::RUST];

pub fn pass_by_name(name: &str) -> Option<&'static dyn SyntaxPass> {
    PASSES.iter().copied().find(|p| p.name() == name)
}
