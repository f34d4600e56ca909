//! Deterministic, read-only explanation of collect plans; must not execute or validate.

use crate::error::InternalError;
use serde::Serialize;

///
/// ExplainPlan
///
/// Stable, ordered representation of a planned clause for observability.
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExplainPlan {
    pub nodes: Vec<ExplainNode>,
}

impl ExplainPlan {
    /// Node type names in execution order.
    #[must_use]
    pub fn node_types(&self) -> Vec<&'static str> {
        self.nodes.iter().map(ExplainNode::node_type).collect()
    }

    /// The first collect node, if any.
    #[must_use]
    pub fn collect_node(&self) -> Option<&ExplainNode> {
        self.nodes
            .iter()
            .find(|node| matches!(node, ExplainNode::CollectNode { .. }))
    }

    /// Render as JSON.
    pub fn to_json(&self) -> Result<serde_json::Value, InternalError> {
        serde_json::to_value(self)
            .map_err(|err| InternalError::serialize_unsupported(format!("explain plan: {err}")))
    }
}

///
/// ExplainNode
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ExplainNode {
    CollectNode {
        method: &'static str,
        count: bool,
        distinct: bool,
        groups: Vec<ExplainGroup>,
        aggregates: Vec<ExplainAggregate>,
    },
    SortNode {
        keys: Vec<ExplainSortKey>,
    },
}

impl ExplainNode {
    #[must_use]
    pub const fn node_type(&self) -> &'static str {
        match self {
            Self::CollectNode { .. } => "CollectNode",
            Self::SortNode { .. } => "SortNode",
        }
    }
}

///
/// ExplainGroup
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExplainGroup {
    pub output: String,
    pub expression: String,
}

///
/// ExplainAggregate
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExplainAggregate {
    pub output: String,
    pub function: &'static str,
    pub input: String,
}

///
/// ExplainSortKey
///

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct ExplainSortKey {
    pub variable: String,
    pub ascending: bool,
}
