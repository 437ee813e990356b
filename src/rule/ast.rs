//! Abstract Syntax Tree for rule expressions

use crate::error::ParseError;
use crate::rule::parser::{parse_condition, parse_literal};
use crate::rule::wire::WireNode;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

/// AST node for rule expressions
///
/// Children are reference counted so that combined rules can share the
/// subtrees they were built from. Nothing hands out mutable access to a
/// node once it exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "WireNode", try_from = "WireNode")]
pub enum Node {
    /// Single condition like `age > 30`
    Operand(Condition),
    /// AND / OR over two subtrees
    Operator {
        op: LogicalOp,
        left: Arc<Node>,
        right: Arc<Node>,
    },
}

impl Node {
    pub fn operand(condition: Condition) -> Self {
        Node::Operand(condition)
    }

    pub fn operator(op: LogicalOp, left: impl Into<Arc<Node>>, right: impl Into<Arc<Node>>) -> Self {
        Node::Operator {
            op,
            left: left.into(),
            right: right.into(),
        }
    }

    pub fn and(left: impl Into<Arc<Node>>, right: impl Into<Arc<Node>>) -> Self {
        Self::operator(LogicalOp::And, left, right)
    }

    pub fn or(left: impl Into<Arc<Node>>, right: impl Into<Arc<Node>>) -> Self {
        Self::operator(LogicalOp::Or, left, right)
    }

    pub fn is_operand(&self) -> bool {
        matches!(self, Node::Operand(_))
    }

    /// The condition of an operand node
    pub fn condition(&self) -> Option<&Condition> {
        match self {
            Node::Operand(cond) => Some(cond),
            Node::Operator { .. } => None,
        }
    }

    /// The logical operator of an operator node
    pub fn logical_op(&self) -> Option<LogicalOp> {
        match self {
            Node::Operand(_) => None,
            Node::Operator { op, .. } => Some(*op),
        }
    }

    /// Both children of an operator node
    pub fn children(&self) -> Option<(&Arc<Node>, &Arc<Node>)> {
        match self {
            Node::Operand(_) => None,
            Node::Operator { left, right, .. } => Some((left, right)),
        }
    }

    /// Number of nodes in the tree, shared subtrees counted once per reference
    pub fn size(&self) -> usize {
        match self {
            Node::Operand(_) => 1,
            Node::Operator { left, right, .. } => 1 + left.size() + right.size(),
        }
    }

    /// Conditions of all operands, left to right
    pub fn conditions(&self) -> Vec<&Condition> {
        let mut out = Vec::new();
        self.collect_conditions(&mut out);
        out
    }

    fn collect_conditions<'a>(&'a self, out: &mut Vec<&'a Condition>) {
        match self {
            Node::Operand(cond) => out.push(cond),
            Node::Operator { left, right, .. } => {
                left.collect_conditions(out);
                right.collect_conditions(out);
            }
        }
    }
}

/// Renders infix rule text; nested operators are parenthesized so the
/// output parses back into the same tree. A word holding an unclosed `(`
/// swallows a closing parenthesis written right after it.
impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Node::Operand(cond) => write!(f, "{}", cond),
            Node::Operator { op, left, right } => {
                write_child(f, left)?;
                write!(f, " {} ", op)?;
                write_child(f, right)
            }
        }
    }
}

fn write_child(f: &mut fmt::Formatter<'_>, child: &Node) -> fmt::Result {
    if child.is_operand() {
        write!(f, "{}", child)
    } else {
        write!(f, "({})", child)
    }
}

/// Single `field comparator literal` condition
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Condition {
    field: String,
    comparator: Comparator,
    literal: Literal,
}

impl Condition {
    /// Build a condition whose text reads back as the same condition
    ///
    /// Fails when `field` is not a single bare word: whitespace, a leading
    /// quote or parenthesis, or an unmatched `)`.
    pub fn new(
        field: impl Into<String>,
        comparator: Comparator,
        literal: Literal,
    ) -> Result<Self, ParseError> {
        let condition = Self::from_parts(field.into(), comparator, literal);
        match parse_condition(&condition.to_string()) {
            Ok(read) if read == condition => Ok(condition),
            _ => Err(ParseError::malformed(format!(
                "field '{}' is not a single bare word",
                condition.field
            ))),
        }
    }

    /// Parts already split by the tokenizer
    pub(crate) fn from_parts(field: String, comparator: Comparator, literal: Literal) -> Self {
        Self {
            field,
            comparator,
            literal,
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn comparator(&self) -> Comparator {
        self.comparator
    }

    pub fn literal(&self) -> &Literal {
        &self.literal
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.comparator, self.literal)
    }
}

/// Comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparator {
    /// Greater than (>)
    Greater,
    /// Less than (<)
    Less,
    /// Equal (=)
    Equal,
}

impl Comparator {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparator::Greater => ">",
            Comparator::Less => "<",
            Comparator::Equal => "=",
        }
    }
}

impl fmt::Display for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Comparator {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            ">" => Ok(Comparator::Greater),
            "<" => Ok(Comparator::Less),
            "=" => Ok(Comparator::Equal),
            other => Err(ParseError::malformed(format!(
                "unknown comparator '{}', expected one of >, <, =",
                other
            ))),
        }
    }
}

/// Logical operators joining two subtrees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogicalOp {
    And,
    Or,
}

impl LogicalOp {
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalOp::And => "AND",
            LogicalOp::Or => "OR",
        }
    }

    /// Combine two already evaluated sides
    pub fn apply(self, left: bool, right: bool) -> bool {
        match self {
            LogicalOp::And => left && right,
            LogicalOp::Or => left || right,
        }
    }
}

impl fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; `and` and `Or` are accepted
impl FromStr for LogicalOp {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("AND") {
            Ok(LogicalOp::And)
        } else if s.eq_ignore_ascii_case("OR") {
            Ok(LogicalOp::Or)
        } else {
            Err(ParseError::malformed(format!(
                "unknown logical operator '{}', expected AND or OR",
                s
            )))
        }
    }
}

/// Condition literal, typed once from its token
///
/// Every constructor yields a literal whose text reads back as the same
/// literal, so operand text can be stored and parsed again.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(Repr);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Repr {
    /// Bare token parsing as an integer; `raw` keeps the source spelling
    Integer { value: i128, raw: String },
    /// Quoted token, or a bare token that is not an integer
    Text { value: String, quoted: bool },
}

impl Literal {
    pub fn integer(value: i64) -> Self {
        Literal(Repr::Integer {
            value: i128::from(value),
            raw: value.to_string(),
        })
    }

    /// String literal, written bare when it reads back as the same word
    /// and quoted otherwise
    pub fn string(value: impl Into<String>) -> Result<Self, ParseError> {
        let value = value.into();
        match value.parse::<Literal>() {
            Ok(bare) if !bare.is_quoted() && bare.as_integer().is_none() && bare.text() == value => {
                Ok(bare)
            }
            _ => Literal::quoted(value),
        }
    }

    /// Always-quoted string literal
    ///
    /// Fails when the value holds a `'` directly followed by whitespace or
    /// `)`, which would close the quote early.
    pub fn quoted(value: impl Into<String>) -> Result<Self, ParseError> {
        let literal = Literal(Repr::Text {
            value: value.into(),
            quoted: true,
        });
        let text = literal.to_string();
        match text.parse::<Literal>() {
            Ok(read) if read == literal => Ok(literal),
            _ => Err(ParseError::malformed(format!(
                "{} cannot be written as a quoted literal",
                text
            ))),
        }
    }

    /// Type a lexed token: quoted → string, integer → number, else string
    pub(crate) fn from_token(token: &str) -> Self {
        if let Some(inner) = strip_quotes(token) {
            return Literal(Repr::Text {
                value: inner.to_string(),
                quoted: true,
            });
        }
        match token.parse::<i128>() {
            Ok(value) => Literal(Repr::Integer {
                value,
                raw: token.to_string(),
            }),
            Err(_) => Literal(Repr::Text {
                value: token.to_string(),
                quoted: false,
            }),
        }
    }

    pub fn as_integer(&self) -> Option<i128> {
        match &self.0 {
            Repr::Integer { value, .. } => Some(*value),
            Repr::Text { .. } => None,
        }
    }

    pub fn is_quoted(&self) -> bool {
        matches!(self.0, Repr::Text { quoted: true, .. })
    }

    /// Literal text with one layer of surrounding quotes removed
    pub fn text(&self) -> &str {
        match &self.0 {
            Repr::Integer { raw, .. } => raw,
            Repr::Text { value, .. } => value,
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Repr::Integer { raw, .. } => f.write_str(raw),
            Repr::Text {
                value,
                quoted: true,
            } => write!(f, "'{}'", value),
            Repr::Text {
                value,
                quoted: false,
            } => f.write_str(value),
        }
    }
}

/// Reads exactly one literal token, as it would appear in a rule
impl FromStr for Literal {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_literal(s)
    }
}

fn strip_quotes(token: &str) -> Option<&str> {
    if token.len() >= 2 && token.starts_with('\'') && token.ends_with('\'') {
        Some(&token[1..token.len() - 1])
    } else {
        None
    }
}
