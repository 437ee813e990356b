//! Rule Engine Core - parse, combine and evaluate rule expressions
//!
//! Rule text such as `"age > 30 AND department = 'Sales'"` is parsed into an
//! immutable AST, ASTs can be folded together with AND, and an AST is
//! evaluated against a [`Record`] of named attributes to a boolean verdict.
//! ASTs travel to and from storage in the `{node_type, value, left, right}`
//! shape of [`rule::WireNode`].
//!
//! Python bindings are available behind the `python` feature.

pub mod config;
pub mod engine;
pub mod error;
pub mod record;
pub mod rule;

#[cfg(feature = "python")]
mod python;

pub use crate::config::{EngineConfig, Grammar, TrailingTokens};
pub use crate::engine::RuleEngine;
pub use crate::error::{
    CombineError, ParseError, RecordError, Result, RuleEngineError, WireError,
};
pub use crate::record::{Record, Value};
pub use crate::rule::{Comparator, Condition, Evaluation, Literal, LogicalOp, Node, Unresolved};

use std::sync::Arc;

/// Parse rule text into an AST
pub fn parse_rule(text: &str) -> std::result::Result<Node, ParseError> {
    rule::parse(text)
}

/// Fold ASTs into one with AND, sharing the inputs as subtrees
pub fn combine_rules(asts: &[Arc<Node>]) -> std::result::Result<Arc<Node>, CombineError> {
    rule::combine(asts)
}

/// Evaluate an AST against a record
pub fn evaluate_rule(ast: &Node, record: &Record) -> bool {
    rule::evaluate(ast, record)
}
