//! Module: db::query
//! Responsibility: clause text to an immutable, explainable collect plan.
//! Does not own: row evaluation or grouping state.
//! Boundary: parse, then validate, then plan; each stage has its own error type.

pub mod clause;
pub mod explain;
pub mod parse;
pub mod plan;
pub mod validate;

// re-exports
pub use clause::{Assignment, CollectClause};
pub use explain::{ExplainAggregate, ExplainGroup, ExplainNode, ExplainPlan, ExplainSortKey};
pub use parse::{ParseError, parse_collect, parse_expr};
pub use plan::{CollectMethod, CollectNode, CollectPlan, SortKey, SortNode, plan_collect};
pub use validate::{PlanError, Scope, ValidatedAggregate, ValidatedClause, validate_clause};
