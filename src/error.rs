//! Error types for the rule engine core

use thiserror::Error;

/// Rule text could not be turned into an AST
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Malformed rule: {0}")]
    MalformedRule(String),
}

impl ParseError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        ParseError::MalformedRule(reason.into())
    }
}

/// A set of ASTs could not be combined
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineError {
    #[error("No valid rules found to combine")]
    NoValidRules,
}

/// A stored `{node_type, value, left, right}` record breaks the node shape rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WireError {
    #[error("Unknown node_type: {0}")]
    UnknownNodeType(String),

    #[error("Operand node '{0}' must not have children")]
    OperandWithChildren(String),

    #[error("Operator node '{operator}' is missing its {side} child")]
    MissingChild {
        operator: String,
        side: &'static str,
    },

    #[error("Unknown logical operator: {0}")]
    UnknownOperator(String),

    #[error("Invalid operand condition: {0}")]
    InvalidCondition(#[from] ParseError),
}

/// Untyped user data could not be decoded into a record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("User data must be an object, got {0}")]
    NotAnObject(&'static str),

    #[error("Unsupported value for field '{field}': {kind}")]
    UnsupportedValue { field: String, kind: &'static str },
}

/// Main error type for the rule engine core
#[derive(Error, Debug)]
pub enum RuleEngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Record(#[from] RecordError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[cfg(feature = "python")]
impl From<RuleEngineError> for pyo3::PyErr {
    fn from(err: RuleEngineError) -> pyo3::PyErr {
        use pyo3::exceptions::{PyLookupError, PyValueError};

        match err {
            RuleEngineError::Combine(e) => PyLookupError::new_err(e.to_string()),
            other => PyValueError::new_err(other.to_string()),
        }
    }
}

/// Result type alias for the rule engine core
pub type Result<T> = std::result::Result<T, RuleEngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_message() {
        let err = ParseError::malformed("expected 7 tokens, found 2");
        assert_eq!(err.to_string(), "Malformed rule: expected 7 tokens, found 2");
    }

    #[test]
    fn test_umbrella_is_transparent() {
        let err: RuleEngineError = CombineError::NoValidRules.into();
        assert_eq!(err.to_string(), "No valid rules found to combine");

        let err: RuleEngineError = WireError::UnknownOperator("XOR".to_string()).into();
        assert_eq!(err.to_string(), "Unknown logical operator: XOR");
    }
}
