//! Rule evaluator
//!
//! Evaluation never fails for a well-formed tree. Conditions that cannot
//! apply to a record (missing field, unsupported comparator for the value's
//! type) count as `false`; [`evaluate_with_report`] additionally lists them.

use crate::record::{Record, Value};
use crate::rule::ast::{Comparator, Condition, Node};
use smallvec::SmallVec;

/// Why an operand evaluated to `false` without being decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    /// The record has no value for the field
    MissingField { field: String },
    /// The record value's type does not support the comparator or literal
    TypeMismatch {
        field: String,
        comparator: Comparator,
        value_kind: &'static str,
    },
}

impl Unresolved {
    pub fn field(&self) -> &str {
        match self {
            Unresolved::MissingField { field } | Unresolved::TypeMismatch { field, .. } => field,
        }
    }
}

/// Verdict plus the operands that could not be decided
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evaluation {
    pub verdict: bool,
    pub unresolved: SmallVec<[Unresolved; 4]>,
}

impl Evaluation {
    /// True when every operand was decided from the record
    pub fn is_conclusive(&self) -> bool {
        self.unresolved.is_empty()
    }
}

/// Evaluate an AST against a record
pub fn evaluate(node: &Node, record: &Record) -> bool {
    walk(node, record, &mut ())
}

/// Evaluate an AST and report every operand that collapsed to `false`
pub fn evaluate_with_report(node: &Node, record: &Record) -> Evaluation {
    let mut unresolved = SmallVec::new();
    let verdict = walk(node, record, &mut unresolved);
    Evaluation {
        verdict,
        unresolved,
    }
}

trait Diagnostics {
    fn note(&mut self, issue: impl FnOnce() -> Unresolved);
}

impl Diagnostics for () {
    #[inline]
    fn note(&mut self, _issue: impl FnOnce() -> Unresolved) {}
}

impl Diagnostics for SmallVec<[Unresolved; 4]> {
    fn note(&mut self, issue: impl FnOnce() -> Unresolved) {
        self.push(issue());
    }
}

fn walk<D: Diagnostics>(node: &Node, record: &Record, diagnostics: &mut D) -> bool {
    match node {
        Node::Operand(cond) => check_condition(cond, record, diagnostics),
        // Both sides always run, no short-circuit
        Node::Operator { op, left, right } => {
            let left = walk(left, record, diagnostics);
            let right = walk(right, record, diagnostics);
            op.apply(left, right)
        }
    }
}

fn check_condition<D: Diagnostics>(cond: &Condition, record: &Record, diagnostics: &mut D) -> bool {
    let Some(value) = record.get(cond.field()) else {
        diagnostics.note(|| Unresolved::MissingField {
            field: cond.field().to_string(),
        });
        return false;
    };

    let literal = cond.literal();
    match (value, cond.comparator(), literal.as_integer()) {
        // Numeric comparisons against an integer literal
        (Value::Integer(v), Comparator::Greater, Some(lit)) => i128::from(*v) > lit,
        (Value::Integer(v), Comparator::Less, Some(lit)) => i128::from(*v) < lit,
        (Value::Float(v), Comparator::Greater, Some(lit)) => *v > lit as f64,
        (Value::Float(v), Comparator::Less, Some(lit)) => *v < lit as f64,

        // String equality against the literal text, whatever its kind
        (Value::String(s), Comparator::Equal, _) => s == literal.text(),

        // Default: false for unsupported combinations
        _ => {
            diagnostics.note(|| Unresolved::TypeMismatch {
                field: cond.field().to_string(),
                comparator: cond.comparator(),
                value_kind: value.kind(),
            });
            false
        }
    }
}
