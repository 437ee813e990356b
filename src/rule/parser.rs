//! Rule string parser

use crate::config::{EngineConfig, Grammar, TrailingTokens};
use crate::error::ParseError;
use crate::rule::ast::{Comparator, Condition, Literal, LogicalOp, Node};
use std::fmt;
use tracing::debug;

type Result<T> = std::result::Result<T, ParseError>;

/// Token count of a legacy `f1 c1 v1 OP f2 c2 v2` rule
pub const FLAT_RULE_TOKENS: usize = 7;

/// Parse a rule string into an AST with the default grammar
pub fn parse(rule: &str) -> Result<Node> {
    Parser::default().parse(rule)
}

/// Parse exactly one `field comparator literal` predicate
pub fn parse_condition(text: &str) -> Result<Condition> {
    let tokens = tokenize(text);
    let mut stream = TokenStream::new(&tokens);
    let condition = parse_predicate(&mut stream)?;
    match stream.peek() {
        None => Ok(condition),
        Some(token) => Err(ParseError::malformed(format!(
            "unexpected {} after condition '{}'",
            token, condition
        ))),
    }
}

/// Read a single literal token
pub(crate) fn parse_literal(text: &str) -> Result<Literal> {
    match tokenize(text).as_slice() {
        [Token::Word(token)] | [Token::Quoted(token)] => Ok(Literal::from_token(token)),
        _ => Err(ParseError::malformed(format!(
            "'{}' is not a single literal",
            text
        ))),
    }
}

/// Rule parser for one grammar
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Parser {
    grammar: Grammar,
    trailing: TrailingTokens,
}

impl Parser {
    pub fn new(grammar: Grammar, trailing: TrailingTokens) -> Self {
        Self { grammar, trailing }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.grammar, config.trailing_tokens)
    }

    pub fn grammar(&self) -> Grammar {
        self.grammar
    }

    pub fn parse(&self, rule: &str) -> Result<Node> {
        let result = match self.grammar {
            Grammar::Nested => parse_nested(rule),
            Grammar::Flat => self.parse_flat(rule),
        };
        if let Err(err) = &result {
            debug!(rule, error = %err, "rejected rule");
        }
        result
    }

    fn parse_flat(&self, rule: &str) -> Result<Node> {
        let tokens: Vec<&str> = rule.split_whitespace().collect();
        if tokens.len() < FLAT_RULE_TOKENS {
            return Err(ParseError::malformed(format!(
                "expected {} tokens, found {}",
                FLAT_RULE_TOKENS,
                tokens.len()
            )));
        }
        if tokens.len() > FLAT_RULE_TOKENS {
            let extra = tokens.len() - FLAT_RULE_TOKENS;
            match self.trailing {
                TrailingTokens::Ignore => {
                    debug!(rule, discarded = extra, "discarding trailing tokens");
                }
                TrailingTokens::Reject => {
                    return Err(ParseError::malformed(format!(
                        "expected {} tokens, found {} trailing",
                        FLAT_RULE_TOKENS, extra
                    )));
                }
            }
        }

        let left = flat_condition(&tokens[0..3])?;
        let op = tokens[3].parse::<LogicalOp>()?;
        let right = flat_condition(&tokens[4..7])?;
        Ok(Node::operator(op, Node::Operand(left), Node::Operand(right)))
    }
}

// Each token must read back alone, or the stored operand text would not parse
fn flat_condition(tokens: &[&str]) -> Result<Condition> {
    let comparator = tokens[1].parse::<Comparator>()?;
    let literal = tokens[2].parse::<Literal>()?;
    Condition::new(tokens[0], comparator, literal)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Word(&'a str),
    /// Single-quoted string, quotes included
    Quoted(&'a str),
    OpenParen,
    CloseParen,
}

impl Token<'_> {
    fn logical_op(&self) -> Option<LogicalOp> {
        match self {
            Token::Word(word) => word.parse().ok(),
            _ => None,
        }
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Word(word) => write!(f, "'{}'", word),
            Token::Quoted(text) => f.write_str(text),
            Token::OpenParen => f.write_str("'('"),
            Token::CloseParen => f.write_str("')'"),
        }
    }
}

/// Split on whitespace.
///
/// A `(` or `)` opening a token stands alone. Inside a word, `(` is kept and
/// a `)` is kept only while it closes one of them, so `f(x)` is one word and
/// `30)` ends a group. A token opening with `'` runs to the first `'` that is
/// followed by whitespace, `)` or the end, spaces included; without one it
/// is an ordinary word.
fn tokenize(rule: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut pos = 0;

    while let Some(c) = rule[pos..].chars().next() {
        if c.is_whitespace() {
            pos += c.len_utf8();
            continue;
        }

        let rest = &rule[pos..];
        let (token, len) = match c {
            '(' => (Token::OpenParen, 1),
            ')' => (Token::CloseParen, 1),
            '\'' => match quoted_len(rest) {
                Some(len) => (Token::Quoted(&rest[..len]), len),
                None => {
                    let len = word_len(rest);
                    (Token::Word(&rest[..len]), len)
                }
            },
            _ => {
                let len = word_len(rest);
                (Token::Word(&rest[..len]), len)
            }
        };
        tokens.push(token);
        pos += len;
    }

    tokens
}

fn quoted_len(text: &str) -> Option<usize> {
    text.char_indices().skip(1).find_map(|(i, ch)| {
        let closes = ch == '\''
            && text[i + 1..]
                .chars()
                .next()
                .map_or(true, |next| next.is_whitespace() || next == ')');
        closes.then_some(i + 1)
    })
}

fn word_len(text: &str) -> usize {
    let mut depth = 0usize;
    for (i, ch) in text.char_indices() {
        match ch {
            ch if ch.is_whitespace() => return i,
            '(' => depth += 1,
            ')' if depth == 0 => return i,
            ')' => depth -= 1,
            _ => {}
        }
    }
    text.len()
}

struct TokenStream<'t, 'a> {
    tokens: &'t [Token<'a>],
    pos: usize,
}

impl<'t, 'a> TokenStream<'t, 'a> {
    fn new(tokens: &'t [Token<'a>]) -> Self {
        Self { tokens, pos: 0 }
    }

    fn peek(&self) -> Option<Token<'a>> {
        self.tokens.get(self.pos).copied()
    }

    fn next(&mut self) -> Option<Token<'a>> {
        let token = self.peek();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Consume the next token if it is the given logical operator
    fn eat_logical(&mut self, op: LogicalOp) -> bool {
        match self.peek().and_then(|t| t.logical_op()) {
            Some(found) if found == op => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }
}

fn parse_nested(rule: &str) -> Result<Node> {
    let tokens = tokenize(rule);
    if tokens.is_empty() {
        return Err(ParseError::malformed("empty rule"));
    }

    let mut stream = TokenStream::new(&tokens);
    let node = parse_or(&mut stream)?;

    match stream.peek() {
        None => Ok(node),
        Some(Token::CloseParen) => Err(ParseError::malformed(
            "unbalanced parentheses: unexpected ')'",
        )),
        Some(token) => Err(ParseError::malformed(format!(
            "unexpected {} after complete expression",
            token
        ))),
    }
}

// OR has lower precedence than AND; both fold left
fn parse_or(stream: &mut TokenStream<'_, '_>) -> Result<Node> {
    let mut node = parse_and(stream)?;
    while stream.eat_logical(LogicalOp::Or) {
        let right = parse_and(stream)?;
        node = Node::operator(LogicalOp::Or, node, right);
    }
    Ok(node)
}

fn parse_and(stream: &mut TokenStream<'_, '_>) -> Result<Node> {
    let mut node = parse_primary(stream)?;
    while stream.eat_logical(LogicalOp::And) {
        let right = parse_primary(stream)?;
        node = Node::operator(LogicalOp::And, node, right);
    }
    Ok(node)
}

fn parse_primary(stream: &mut TokenStream<'_, '_>) -> Result<Node> {
    match stream.peek() {
        Some(Token::OpenParen) => {
            stream.next();
            let node = parse_or(stream)?;
            match stream.next() {
                Some(Token::CloseParen) => Ok(node),
                Some(token) => Err(ParseError::malformed(format!(
                    "expected ')', found {}",
                    token
                ))),
                None => Err(ParseError::malformed(
                    "unbalanced parentheses: missing ')'",
                )),
            }
        }
        Some(_) => parse_predicate(stream).map(Node::Operand),
        None => Err(ParseError::malformed(
            "unexpected end of rule, expected a condition",
        )),
    }
}

fn parse_predicate(stream: &mut TokenStream<'_, '_>) -> Result<Condition> {
    let field = match stream.next() {
        Some(Token::Word(word)) => word,
        Some(token) => {
            return Err(ParseError::malformed(format!(
                "expected a field name, found {}",
                token
            )))
        }
        None => {
            return Err(ParseError::malformed(
                "unexpected end of rule, expected a field name",
            ))
        }
    };

    let comparator = match stream.next() {
        Some(Token::Word(word)) => word.parse::<Comparator>()?,
        Some(token) => {
            return Err(ParseError::malformed(format!(
                "expected a comparator after '{}', found {}",
                field, token
            )))
        }
        None => {
            return Err(ParseError::malformed(format!(
                "unexpected end of rule, expected a comparator after '{}'",
                field
            )))
        }
    };

    let literal = match stream.next() {
        Some(Token::Word(text)) | Some(Token::Quoted(text)) => Literal::from_token(text),
        Some(token) => {
            return Err(ParseError::malformed(format!(
                "expected a literal after '{} {}', found {}",
                field, comparator, token
            )))
        }
        None => {
            return Err(ParseError::malformed(format!(
                "unexpected end of rule, expected a literal after '{} {}'",
                field, comparator
            )))
        }
    };

    Ok(Condition::from_parts(field.to_string(), comparator, literal))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operand_text(node: &Node) -> String {
        node.condition().expect("operand").to_string()
    }

    #[test]
    fn test_parse_two_predicate_rule() {
        let ast = parse("age > 30 AND department = 'Sales'").unwrap();
        match &ast {
            Node::Operator { op, left, right } => {
                assert_eq!(*op, LogicalOp::And);
                assert_eq!(operand_text(left), "age > 30");
                assert_eq!(operand_text(right), "department = 'Sales'");

                let cond = left.condition().unwrap();
                assert_eq!(cond.field(), "age");
                assert_eq!(cond.comparator(), Comparator::Greater);
                assert_eq!(cond.literal().as_integer(), Some(30));
            }
            _ => panic!("Expected operator node"),
        }
    }

    #[test]
    fn test_logical_op_normalized() {
        let ast = parse("experience > 5 or salary > 50000").unwrap();
        assert_eq!(ast.logical_op(), Some(LogicalOp::Or));
    }

    #[test]
    fn test_single_predicate() {
        let ast = parse("age > 30").unwrap();
        assert_eq!(operand_text(&ast), "age > 30");
    }

    #[test]
    fn test_too_short_rule_is_malformed() {
        for rule in ["age >", "", "   ", "age", "age > 30 AND", "age > 30 AND salary <"] {
            let err = parse(rule).unwrap_err();
            assert!(
                matches!(err, ParseError::MalformedRule(_)),
                "Expected malformed for: {:?}",
                rule
            );
        }
    }

    #[test]
    fn test_operator_precedence() {
        // a OR b AND c parses as a OR (b AND c)
        let ast = parse("a > 1 OR b > 2 AND c > 3").unwrap();
        match ast {
            Node::Operator { op, left, right } => {
                assert_eq!(op, LogicalOp::Or);
                assert!(left.is_operand());
                assert_eq!(right.logical_op(), Some(LogicalOp::And));
            }
            _ => panic!("Expected OR at the root"),
        }
    }

    #[test]
    fn test_chains_are_left_deep() {
        let ast = parse("a > 1 AND b > 2 AND c > 3").unwrap();
        let (left, right) = ast.children().unwrap();
        assert_eq!(left.logical_op(), Some(LogicalOp::And));
        assert_eq!(operand_text(right), "c > 3");
    }

    #[test]
    fn test_parentheses_override_precedence() {
        let ast = parse("(a > 1 OR b > 2) AND c > 3").unwrap();
        let (left, right) = ast.children().unwrap();
        assert_eq!(ast.logical_op(), Some(LogicalOp::And));
        assert_eq!(left.logical_op(), Some(LogicalOp::Or));
        assert!(right.is_operand());

        // Parentheses may hug the tokens
        let tight = parse("(a > 1 OR b > 2)AND (c > 3)").unwrap();
        assert_eq!(tight, ast);
    }

    #[test]
    fn test_unbalanced_parentheses() {
        assert!(parse("(a > 1 AND b > 2").is_err());
        assert!(parse("a > 1 AND b > 2)").is_err());
        assert!(parse("()").is_err());
    }

    #[test]
    fn test_quoted_literal_with_spaces() {
        let ast = parse("city = 'New York' OR city = 'Paris'").unwrap();
        let (left, _) = ast.children().unwrap();
        let cond = left.condition().unwrap();
        assert_eq!(cond.literal().text(), "New York");
        assert_eq!(cond.to_string(), "city = 'New York'");
    }

    #[test]
    fn test_unbalanced_quote_is_a_bare_word() {
        let ast = parse("name = 'x AND b > 1").unwrap();
        let (left, _) = ast.children().unwrap();
        let literal = left.condition().unwrap().literal();
        assert!(!literal.is_quoted());
        assert_eq!(literal.text(), "'x");

        let ast = parse("a = ' AND b > 2").unwrap();
        let (left, _) = ast.children().unwrap();
        assert_eq!(operand_text(left), "a = '");

        // A quote closes only before whitespace, ')' or the end
        let ast = parse("a = 'x'y").unwrap();
        assert_eq!(ast.condition().unwrap().literal().text(), "'x'y");
        let ast = parse("a = 'it's here'").unwrap();
        assert_eq!(ast.condition().unwrap().literal().text(), "it's here");
    }

    #[test]
    fn test_parentheses_inside_words() {
        let ast = parse("f(x) > 1 AND b > 2").unwrap();
        let (left, right) = ast.children().unwrap();
        assert_eq!(left.condition().unwrap().field(), "f(x)");
        assert_eq!(operand_text(right), "b > 2");

        let ast = parse("(f(x) > 1 OR g(y > 2) AND c > 3").unwrap();
        assert_eq!(ast.logical_op(), Some(LogicalOp::And));
        let (left, _) = ast.children().unwrap();
        let (_, inner) = left.children().unwrap();
        assert_eq!(operand_text(inner), "g(y > 2");
    }

    #[test]
    fn test_legacy_rules_parse_the_same_under_both_grammars() {
        let flat = Parser::new(Grammar::Flat, TrailingTokens::Ignore);
        for rule in [
            "name = 'x AND b > 1",
            "f(x) > 1 AND b > 2",
            "a = ' AND b > 2",
            "tag = it's OR n < -4",
        ] {
            assert_eq!(flat.parse(rule).unwrap(), parse(rule).unwrap(), "Rule: {}", rule);
        }
    }

    #[test]
    fn test_unknown_comparator() {
        assert!(parse("age >= 30").is_err());
        assert!(parse("age != 30 AND b > 1").is_err());
    }

    #[test]
    fn test_dangling_tokens_rejected() {
        assert!(parse("age > 30 department").is_err());
        assert!(parse("age > 30 AND b > 1 extra").is_err());
        assert!(parse("age > 30 XOR b > 1").is_err());
    }

    #[test]
    fn test_flat_grammar() {
        let parser = Parser::new(Grammar::Flat, TrailingTokens::Ignore);
        let flat = parser.parse("age > 30 and department = 'Sales'").unwrap();
        let nested = parse("age > 30 AND department = 'Sales'").unwrap();
        assert_eq!(flat, nested);

        assert!(parser.parse("age >").is_err());
        assert!(parser.parse("age > 30 NAND b > 1").is_err());
    }

    #[test]
    fn test_flat_grammar_rejects_tokens_that_cannot_be_stored() {
        let parser = Parser::new(Grammar::Flat, TrailingTokens::Ignore);
        for rule in [
            "(age > 30 AND b > 1)",
            "a)b > 1 AND c > 2",
            "a > 1 AND c > 2)x",
            "'a' > 1 AND c > 2",
        ] {
            assert!(parser.parse(rule).is_err(), "Expected rejection for: {}", rule);
        }
    }

    #[test]
    fn test_flat_grammar_trailing_tokens() {
        let rule = "age > 30 AND salary > 50000 OR experience > 5";

        let ignore = Parser::new(Grammar::Flat, TrailingTokens::Ignore);
        let ast = ignore.parse(rule).unwrap();
        assert_eq!(ast, parse("age > 30 AND salary > 50000").unwrap());

        let reject = Parser::new(Grammar::Flat, TrailingTokens::Reject);
        assert!(reject.parse(rule).is_err());
    }

    #[test]
    fn test_parse_condition() {
        let cond = parse_condition("department = 'Sales'").unwrap();
        assert_eq!(cond.field(), "department");
        assert_eq!(cond.literal().text(), "Sales");

        assert!(parse_condition("a > 1 AND b > 2").is_err());
        assert!(parse_condition("a >").is_err());
    }

    #[test]
    fn test_display_reparses() {
        let rule = "(a > 1 OR b < 2) AND (c = 'x y' OR d = z)";
        let ast = parse(rule).unwrap();
        assert_eq!(ast.to_string(), rule);
        assert_eq!(parse(&ast.to_string()).unwrap(), ast);
    }
}
