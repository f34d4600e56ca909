//! Module: query::plan
//! Responsibility: choose the grouping strategy for a validated clause.
//! Does not own: execution of either strategy.
//! Boundary: plans are immutable once built; callers may only override the
//! method on an explicitly constructed `CollectNode`.

#[cfg(test)]
mod tests;

use crate::{
    db::query::{
        clause::Assignment,
        explain::{ExplainAggregate, ExplainGroup, ExplainNode, ExplainPlan, ExplainSortKey},
        validate::{ValidatedAggregate, ValidatedClause},
    },
    obs::sink::{MetricsEvent, record},
};
use serde::Serialize;

///
/// CollectMethod
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectMethod {
    /// Consecutive equal keys are folded as they arrive.
    Merge,
    /// Keys are bucketed by stable hash until end of input.
    Hash,
}

impl CollectMethod {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Merge => "merge",
            Self::Hash => "hash",
        }
    }
}

///
/// CollectNode
///
/// Plan node descriptor for one grouping step.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollectNode {
    pub(in crate::db) groups: Vec<Assignment>,
    pub(in crate::db) aggregates: Vec<ValidatedAggregate>,
    pub(in crate::db) method: CollectMethod,
    pub(in crate::db) count_into: Option<String>,
    pub(in crate::db) into: Option<String>,
    pub(in crate::db) distinct: bool,
}

impl CollectNode {
    /// Build a node directly from a validated clause with an explicit method.
    ///
    /// `Merge` with group expressions is only correct when the caller
    /// guarantees that equal keys arrive consecutively.
    #[must_use]
    pub fn from_clause(clause: ValidatedClause, method: CollectMethod) -> Self {
        let ValidatedClause {
            groups,
            aggregates,
            count_into,
            into,
            distinct,
        } = clause;

        Self {
            groups,
            aggregates,
            method,
            count_into,
            into,
            distinct,
        }
    }

    #[must_use]
    pub const fn with_method(mut self, method: CollectMethod) -> Self {
        self.method = method;
        self
    }

    #[must_use]
    pub const fn method(&self) -> CollectMethod {
        self.method
    }

    #[must_use]
    pub fn groups(&self) -> &[Assignment] {
        &self.groups
    }

    #[must_use]
    pub fn aggregates(&self) -> &[ValidatedAggregate] {
        &self.aggregates
    }

    #[must_use]
    pub fn count_into(&self) -> Option<&str> {
        self.count_into.as_deref()
    }

    #[must_use]
    pub fn into_variable(&self) -> Option<&str> {
        self.into.as_deref()
    }

    #[must_use]
    pub const fn is_distinct(&self) -> bool {
        self.distinct
    }

    fn explain(&self) -> ExplainNode {
        ExplainNode::CollectNode {
            method: self.method.label(),
            count: self.count_into.is_some(),
            distinct: self.distinct,
            groups: self
                .groups
                .iter()
                .map(|g| ExplainGroup {
                    output: g.output.clone(),
                    expression: g.expr.to_string(),
                })
                .collect(),
            aggregates: self
                .aggregates
                .iter()
                .map(|a| ExplainAggregate {
                    output: a.output.clone(),
                    function: a.function.name(),
                    input: a.input.to_string(),
                })
                .collect(),
        }
    }
}

///
/// SortKey
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortKey {
    pub variable: String,
    pub ascending: bool,
}

///
/// SortNode
///
/// Orders the rows of the preceding collect step by bound variables.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SortNode {
    pub keys: Vec<SortKey>,
}

impl SortNode {
    fn explain(&self) -> ExplainNode {
        ExplainNode::SortNode {
            keys: self
                .keys
                .iter()
                .map(|k| ExplainSortKey {
                    variable: k.variable.clone(),
                    ascending: k.ascending,
                })
                .collect(),
        }
    }
}

///
/// CollectPlan
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollectPlan {
    pub(in crate::db) collect: CollectNode,
    pub(in crate::db) sort: Option<SortNode>,
}

impl CollectPlan {
    /// Wrap an explicitly built node. No sort step is added.
    #[must_use]
    pub const fn from_node(collect: CollectNode) -> Self {
        Self {
            collect,
            sort: None,
        }
    }

    #[must_use]
    pub const fn collect(&self) -> &CollectNode {
        &self.collect
    }

    #[must_use]
    pub const fn sort(&self) -> Option<&SortNode> {
        self.sort.as_ref()
    }

    /// Deterministic node-by-node description of this plan.
    #[must_use]
    pub fn explain(&self) -> ExplainPlan {
        let mut nodes = vec![self.collect.explain()];
        if let Some(sort) = &self.sort {
            nodes.push(sort.explain());
        }

        ExplainPlan { nodes }
    }
}

/// Plan one validated clause.
///
/// Grouped clauses hash and then sort ascending by their group outputs.
/// Ungrouped clauses merge into a single row and need no sort.
#[must_use]
pub fn plan_collect(clause: ValidatedClause) -> CollectPlan {
    let sort = (!clause.groups.is_empty()).then(|| SortNode {
        keys: clause
            .groups
            .iter()
            .map(|g| SortKey {
                variable: g.output.clone(),
                ascending: true,
            })
            .collect(),
    });
    let method = if sort.is_some() {
        CollectMethod::Hash
    } else {
        CollectMethod::Merge
    };

    record(MetricsEvent::Plan {
        method: method.label(),
        sorted: sort.is_some(),
    });

    CollectPlan {
        collect: CollectNode::from_clause(clause, method),
        sort,
    }
}
