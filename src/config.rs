//! Engine configuration
//!
//! Every field has a default, so `{}` is a valid configuration. Unknown
//! keys are rejected to catch typos in host configuration files.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Default number of parsed rules kept by a [`crate::rule::RuleCache`]
pub const DEFAULT_CACHE_CAPACITY: usize = 2048;

/// Rule grammar accepted by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Grammar {
    /// Recursive descent: any number of predicates, AND before OR, parentheses
    #[default]
    Nested,
    /// Legacy form: exactly `f1 c1 v1 OP f2 c2 v2`
    Flat,
}

/// What the flat grammar does with tokens after the seventh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrailingTokens {
    #[default]
    Ignore,
    Reject,
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub grammar: Grammar,
    pub trailing_tokens: TrailingTokens,
    /// Zero disables caching
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grammar: Grammar::default(),
            trailing_tokens: TrailingTokens::default(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Deserialize configuration from a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Deserialize configuration from an already decoded JSON value
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
