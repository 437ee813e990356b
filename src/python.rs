//! Python bindings via PyO3
//!
//! ASTs cross the boundary as plain dicts in the storage shape
//! `{"node_type", "value", "left", "right"}`, so a Python service can keep
//! storing them as-is.

use crate::config::EngineConfig;
use crate::engine::RuleEngine;
use crate::error::{RecordError, RuleEngineError};
use crate::record::{Record, Value};
use crate::rule::{evaluate, Node, NodeType, Unresolved, WireNode};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyList};
use std::sync::Arc;
use tracing::info;

// ============================================================================
// Configured Engine
// ============================================================================

/// Engine used by the module functions; default until `init_config` runs
static ENGINE: OnceCell<RwLock<Arc<RuleEngine>>> = OnceCell::new();

fn engine() -> Arc<RuleEngine> {
    ENGINE
        .get_or_init(|| RwLock::new(Arc::new(RuleEngine::default())))
        .read()
        .clone()
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Build engine configuration from a Python dict like `{"grammar": "flat"}`
fn config_from_dict(dict: &Bound<'_, PyDict>) -> PyResult<EngineConfig> {
    let mut object = serde_json::Map::new();
    for (key, value) in dict.iter() {
        let key: String = key.extract()?;
        let value = if let Ok(n) = value.extract::<u64>() {
            serde_json::Value::from(n)
        } else if let Ok(s) = value.extract::<String>() {
            serde_json::Value::from(s)
        } else {
            return Err(RuleEngineError::Config(format!("unsupported value for '{}'", key)).into());
        };
        object.insert(key, value);
    }
    Ok(EngineConfig::from_json(serde_json::Value::Object(object))?)
}

fn wire_to_py<'py>(py: Python<'py>, wire: &WireNode) -> PyResult<Bound<'py, PyDict>> {
    let dict = PyDict::new(py);
    dict.set_item("node_type", wire.node_type.as_str())?;
    dict.set_item("value", wire.value.as_str())?;
    match &wire.left {
        Some(left) => dict.set_item("left", wire_to_py(py, left)?)?,
        None => dict.set_item("left", py.None())?,
    }
    match &wire.right {
        Some(right) => dict.set_item("right", wire_to_py(py, right)?)?,
        None => dict.set_item("right", py.None())?,
    }
    Ok(dict)
}

fn wire_from_py(obj: &Bound<'_, PyAny>) -> PyResult<WireNode> {
    let dict = obj.cast::<PyDict>()?;
    let node_type: String = required_item(dict, "node_type")?.extract()?;
    let node_type = node_type
        .parse::<NodeType>()
        .map_err(RuleEngineError::from)?;
    let value: String = required_item(dict, "value")?.extract()?;

    Ok(WireNode {
        node_type,
        value,
        left: optional_child(dict, "left")?,
        right: optional_child(dict, "right")?,
    })
}

fn required_item<'py>(dict: &Bound<'py, PyDict>, name: &str) -> PyResult<Bound<'py, PyAny>> {
    dict.get_item(name)?
        .ok_or_else(|| pyo3::exceptions::PyKeyError::new_err(name.to_string()))
}

fn optional_child(dict: &Bound<'_, PyDict>, name: &str) -> PyResult<Option<Box<WireNode>>> {
    match dict.get_item(name)? {
        Some(child) if !child.is_none() => Ok(Some(Box::new(wire_from_py(&child)?))),
        _ => Ok(None),
    }
}

fn node_from_py(obj: &Bound<'_, PyAny>) -> PyResult<Node> {
    let wire = wire_from_py(obj)?;
    Ok(Node::from_wire(&wire).map_err(RuleEngineError::from)?)
}

/// Decode user data; bool is checked before int since it subclasses int
fn record_from_py(data: &Bound<'_, PyDict>) -> PyResult<Record> {
    let mut record = Record::with_capacity(data.len());
    for (key, value) in data.iter() {
        let field: String = key.extract()?;
        let value = if value.is_instance_of::<PyBool>() {
            return Err(unsupported(field, "bool"));
        } else if let Ok(i) = value.extract::<i64>() {
            Value::Integer(i)
        } else if value.is_instance_of::<PyFloat>() {
            Value::Float(value.extract()?)
        } else if let Ok(s) = value.extract::<String>() {
            Value::String(s)
        } else {
            return Err(unsupported(field, "object"));
        };
        record.insert(field, value);
    }
    Ok(record)
}

fn unsupported(field: String, kind: &'static str) -> PyErr {
    RuleEngineError::from(RecordError::UnsupportedValue { field, kind }).into()
}

fn describe(issue: &Unresolved) -> String {
    match issue {
        Unresolved::MissingField { field } => format!("{}: missing", field),
        Unresolved::TypeMismatch {
            field,
            comparator,
            value_kind,
        } => format!("{}: '{}' not supported for {}", field, comparator, value_kind),
    }
}

// ============================================================================
// Python Functions
// ============================================================================

/// Configure the engine (grammar, trailing token policy, cache capacity)
///
/// # Arguments
/// * `config` - Optional dict, e.g. `{"grammar": "flat", "trailing_tokens": "reject"}`;
///   omitted keys keep their defaults
#[pyfunction]
#[pyo3(signature = (config=None))]
fn init_config(config: Option<&Bound<'_, PyDict>>) -> PyResult<()> {
    let config = match config {
        Some(dict) => config_from_dict(dict)?,
        None => EngineConfig::default(),
    };
    info!(
        grammar = ?config.grammar,
        trailing_tokens = ?config.trailing_tokens,
        cache_capacity = config.cache_capacity,
        "configured rule engine"
    );

    let engine = Arc::new(RuleEngine::new(config));
    let slot = ENGINE.get_or_init(|| RwLock::new(Arc::clone(&engine)));
    *slot.write() = engine;
    Ok(())
}

/// Parse a rule string into its AST dict
///
/// # Raises
/// ValueError if the rule is malformed
#[pyfunction]
fn parse_rule<'py>(py: Python<'py>, rule: &str) -> PyResult<Bound<'py, PyDict>> {
    let ast = engine().parse_rule(rule).map_err(RuleEngineError::from)?;
    wire_to_py(py, &ast.to_wire())
}

/// AND together a list of AST dicts
///
/// # Raises
/// LookupError if the list is empty, ValueError if an AST is invalid
#[pyfunction]
fn combine_rules<'py>(py: Python<'py>, asts: &Bound<'py, PyList>) -> PyResult<Bound<'py, PyDict>> {
    let nodes = asts
        .iter()
        .map(|item| node_from_py(&item).map(Arc::new))
        .collect::<PyResult<Vec<_>>>()?;
    let combined = engine().combine_rules(&nodes).map_err(RuleEngineError::from)?;
    wire_to_py(py, &combined.to_wire())
}

/// Evaluate an AST dict against user data
#[pyfunction]
fn evaluate_rule(ast: &Bound<'_, PyDict>, data: &Bound<'_, PyDict>) -> PyResult<bool> {
    let node = node_from_py(ast.as_any())?;
    let record = record_from_py(data)?;
    Ok(engine().evaluate_rule(&node, &record))
}

/// Evaluate and also list the conditions that could not be decided
///
/// # Returns
/// `(verdict, ["field: reason", ...])`
#[pyfunction]
fn evaluate_report(ast: &Bound<'_, PyDict>, data: &Bound<'_, PyDict>) -> PyResult<(bool, Vec<String>)> {
    let node = node_from_py(ast.as_any())?;
    let record = record_from_py(data)?;
    let evaluation = engine().evaluate_with_report(&node, &record);
    let issues = evaluation.unresolved.iter().map(describe).collect();
    Ok((evaluation.verdict, issues))
}

/// Evaluate on a blocking thread, returning an awaitable
///
/// # Example (Python)
/// ```python
/// matched = await evaluate_async(ast, {"age": 35, "department": "Sales"})
/// ```
#[pyfunction]
fn evaluate_async<'py>(
    py: Python<'py>,
    ast: &Bound<'py, PyDict>,
    data: &Bound<'py, PyDict>,
) -> PyResult<Bound<'py, PyAny>> {
    // Decode while holding the GIL
    let node = node_from_py(ast.as_any())?;
    let record = record_from_py(data)?;

    pyo3_async_runtimes::tokio::future_into_py(py, async move {
        let matched = tokio::task::spawn_blocking(move || evaluate(&node, &record))
            .await
            .map_err(|e| {
                PyErr::new::<pyo3::exceptions::PyRuntimeError, _>(format!(
                    "Evaluation task panicked: {}",
                    e
                ))
            })?;
        Ok(matched)
    })
}

// ============================================================================
// Python Module Definition
// ============================================================================

#[pymodule]
fn rule_engine_core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_function(wrap_pyfunction!(init_config, m)?)?;
    m.add_function(wrap_pyfunction!(parse_rule, m)?)?;
    m.add_function(wrap_pyfunction!(combine_rules, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_rule, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_report, m)?)?;
    m.add_function(wrap_pyfunction!(evaluate_async, m)?)?;
    Ok(())
}
