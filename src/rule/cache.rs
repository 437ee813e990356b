//! Parsed rule cache - keyed by rule text, fast hashing

use crate::config::{EngineConfig, DEFAULT_CACHE_CAPACITY};
use crate::error::ParseError;
use crate::record::Record;
use crate::rule::ast::Node;
use crate::rule::evaluator::evaluate;
use crate::rule::parser::Parser;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::trace;

/// Process-wide cache for the default grammar
static DEFAULT_CACHE: Lazy<RuleCache> =
    Lazy::new(|| RuleCache::new(Parser::default(), DEFAULT_CACHE_CAPACITY));

/// Rule text → shared AST, for one parser
///
/// Once `capacity` entries are held, further rules are still parsed but no
/// longer stored.
#[derive(Debug)]
pub struct RuleCache {
    parser: Parser,
    capacity: usize,
    entries: RwLock<AHashMap<String, Arc<Node>>>,
}

impl RuleCache {
    pub fn new(parser: Parser, capacity: usize) -> Self {
        Self {
            parser,
            capacity,
            entries: RwLock::new(AHashMap::with_capacity(capacity.min(DEFAULT_CACHE_CAPACITY))),
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(Parser::from_config(config), config.cache_capacity)
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Get or parse a rule, sharing the cached AST on repeated text
    #[inline]
    pub fn get_or_parse(&self, rule: &str) -> Result<Arc<Node>, ParseError> {
        // Fast path: read lock only
        {
            let entries = self.entries.read();
            if let Some(ast) = entries.get(rule) {
                trace!(rule, "rule cache hit");
                return Ok(Arc::clone(ast));
            }
        }

        // Slow path: parse outside the lock, then insert
        let ast = Arc::new(self.parser.parse(rule)?);
        trace!(rule, "rule cache miss");

        let mut entries = self.entries.write();
        if let Some(existing) = entries.get(rule) {
            return Ok(Arc::clone(existing));
        }
        if entries.len() < self.capacity {
            entries.insert(rule.to_string(), Arc::clone(&ast));
        }
        Ok(ast)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Get or parse a rule with the default grammar, using the shared cache
#[inline]
pub fn get_or_parse(rule: &str) -> Result<Arc<Node>, ParseError> {
    DEFAULT_CACHE.get_or_parse(rule)
}

/// Check a rule against a record, using the shared cache
#[inline]
pub fn check_rule(rule: &str, record: &Record) -> Result<bool, ParseError> {
    let ast = get_or_parse(rule)?;
    Ok(evaluate(&ast, record))
}

/// Clear the shared cache
pub fn clear_cache() {
    DEFAULT_CACHE.clear();
}

/// Number of rules in the shared cache
pub fn cache_size() -> usize {
    DEFAULT_CACHE.len()
}
