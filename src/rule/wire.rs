//! Storage shape of an AST: `{node_type, value, left, right}`
//!
//! Operand `value` is the condition text (`"age > 30"`), operator `value`
//! is `"AND"` or `"OR"`. This is what the persistence layer stores.

use crate::error::{Result, WireError};
use crate::rule::ast::{LogicalOp, Node};
use crate::rule::parser::parse_condition;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Node kind tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeType {
    Operator,
    Operand,
}

impl NodeType {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Operator => "operator",
            NodeType::Operand => "operand",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = WireError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "operator" => Ok(NodeType::Operator),
            "operand" => Ok(NodeType::Operand),
            other => Err(WireError::UnknownNodeType(other.to_string())),
        }
    }
}

/// Plain nested record form of a [`Node`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireNode {
    pub node_type: NodeType,
    pub value: String,
    #[serde(default)]
    pub left: Option<Box<WireNode>>,
    #[serde(default)]
    pub right: Option<Box<WireNode>>,
}

impl From<&Node> for WireNode {
    fn from(node: &Node) -> Self {
        match node {
            Node::Operand(cond) => WireNode {
                node_type: NodeType::Operand,
                value: cond.to_string(),
                left: None,
                right: None,
            },
            Node::Operator { op, left, right } => WireNode {
                node_type: NodeType::Operator,
                value: op.to_string(),
                left: Some(Box::new(WireNode::from(left.as_ref()))),
                right: Some(Box::new(WireNode::from(right.as_ref()))),
            },
        }
    }
}

impl From<Node> for WireNode {
    fn from(node: Node) -> Self {
        WireNode::from(&node)
    }
}

impl TryFrom<&WireNode> for Node {
    type Error = WireError;

    fn try_from(wire: &WireNode) -> std::result::Result<Self, Self::Error> {
        match wire.node_type {
            NodeType::Operand => {
                if wire.left.is_some() || wire.right.is_some() {
                    return Err(WireError::OperandWithChildren(wire.value.clone()));
                }
                Ok(Node::Operand(parse_condition(&wire.value)?))
            }
            NodeType::Operator => {
                let op = wire
                    .value
                    .parse::<LogicalOp>()
                    .map_err(|_| WireError::UnknownOperator(wire.value.clone()))?;
                let left = wire.left.as_deref().ok_or_else(|| WireError::MissingChild {
                    operator: wire.value.clone(),
                    side: "left",
                })?;
                let right = wire.right.as_deref().ok_or_else(|| WireError::MissingChild {
                    operator: wire.value.clone(),
                    side: "right",
                })?;
                Ok(Node::operator(op, Node::try_from(left)?, Node::try_from(right)?))
            }
        }
    }
}

impl TryFrom<WireNode> for Node {
    type Error = WireError;

    fn try_from(wire: WireNode) -> std::result::Result<Self, Self::Error> {
        Node::try_from(&wire)
    }
}

impl Node {
    pub fn to_wire(&self) -> WireNode {
        WireNode::from(self)
    }

    pub fn from_wire(wire: &WireNode) -> std::result::Result<Node, WireError> {
        Node::try_from(wire).inspect_err(|err| debug!(error = %err, "rejected stored rule"))
    }

    pub fn to_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self.to_wire())?)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Node> {
        let wire: WireNode = serde_json::from_value(value)?;
        Ok(Node::from_wire(&wire)?)
    }
}
