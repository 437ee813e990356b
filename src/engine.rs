//! Engine facade: configuration plus a parse cache

use crate::config::EngineConfig;
use crate::error::{CombineError, ParseError};
use crate::record::Record;
use crate::rule::{combine, evaluate, evaluate_with_report, Evaluation, Node, RuleCache};
use std::sync::Arc;

/// Configured rule engine
///
/// Holds no per-request state; share it behind an `Arc` and call it from
/// any number of threads.
#[derive(Debug)]
pub struct RuleEngine {
    config: EngineConfig,
    cache: RuleCache,
}

impl RuleEngine {
    pub fn new(config: EngineConfig) -> Self {
        let cache = RuleCache::from_config(&config);
        Self { config, cache }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &RuleCache {
        &self.cache
    }

    /// Parse rule text with the configured grammar; repeated text shares one AST
    pub fn parse_rule(&self, rule: &str) -> Result<Arc<Node>, ParseError> {
        self.cache.get_or_parse(rule)
    }

    pub fn combine_rules(&self, asts: &[Arc<Node>]) -> Result<Arc<Node>, CombineError> {
        combine(asts)
    }

    pub fn evaluate_rule(&self, ast: &Node, record: &Record) -> bool {
        evaluate(ast, record)
    }

    pub fn evaluate_with_report(&self, ast: &Node, record: &Record) -> Evaluation {
        evaluate_with_report(ast, record)
    }

    /// Parse (cached) and evaluate in one step
    pub fn check(&self, rule: &str, record: &Record) -> Result<bool, ParseError> {
        let ast = self.parse_rule(rule)?;
        Ok(evaluate(&ast, record))
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
