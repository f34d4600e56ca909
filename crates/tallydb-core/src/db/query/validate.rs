//! Module: query::validate
//! Responsibility: semantic admission of a parsed COLLECT clause.
//! Does not own: grammar (see `query::parse`) or strategy choice (see `query::plan`).
//! Boundary: `ValidatedClause` can only be produced here, so the planner never
//! sees an aggregate it cannot build a reducer for.

use crate::db::{
    executor::AggregateFunction,
    expr::Expr,
    query::clause::{Assignment, CollectClause},
};
use std::collections::BTreeSet;
use thiserror::Error as ThisError;

///
/// PlanError
///
/// Clause-shape and scoping errors raised before planning.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum PlanError {
    #[error("output variable '{name}' is declared more than once")]
    DuplicateOutputVariable { name: String },

    #[error("COLLECT clause declares no groups, aggregates, count or into variable")]
    EmptyClause,

    #[error("invalid aggregate expression for '{output}': {reason}")]
    InvalidAggregateExpression { output: String, reason: String },

    #[error("invalid DISTINCT clause: {reason}")]
    InvalidDistinct { reason: &'static str },

    #[error("unknown variable '{name}' referenced by '{output}'")]
    UnknownVariable { name: String, output: String },
}

///
/// Scope
///
/// Variable names bound by the pipeline before the clause runs.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Scope {
    names: BTreeSet<String>,
}

impl Scope {
    #[must_use]
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

///
/// ValidatedAggregate
///
/// One aggregate assignment resolved against the function registry.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatedAggregate {
    pub(in crate::db) output: String,
    pub(in crate::db) function: AggregateFunction,
    pub(in crate::db) input: Expr,
}

impl ValidatedAggregate {
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    #[must_use]
    pub const fn function(&self) -> AggregateFunction {
        self.function
    }

    #[must_use]
    pub const fn input(&self) -> &Expr {
        &self.input
    }
}

///
/// ValidatedClause
///
/// Clause that passed every admission rule. Immutable input to the planner.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ValidatedClause {
    pub(in crate::db) groups: Vec<Assignment>,
    pub(in crate::db) aggregates: Vec<ValidatedAggregate>,
    pub(in crate::db) count_into: Option<String>,
    pub(in crate::db) into: Option<String>,
    pub(in crate::db) distinct: bool,
}

impl ValidatedClause {
    #[must_use]
    pub fn groups(&self) -> &[Assignment] {
        &self.groups
    }

    #[must_use]
    pub fn aggregates(&self) -> &[ValidatedAggregate] {
        &self.aggregates
    }
}

/// Admit one parsed clause against the variables in scope.
///
/// Aggregate shape and registry membership are checked for every aggregate
/// before any variable reference is resolved, so a clause with both kinds of
/// problem reports the aggregate one.
pub fn validate_clause(clause: &CollectClause, scope: &Scope) -> Result<ValidatedClause, PlanError> {
    let is_empty = clause.groups.is_empty()
        && clause.aggregates.is_empty()
        && clause.count_into.is_none()
        && clause.into.is_none();
    if is_empty {
        return Err(PlanError::EmptyClause);
    }

    let aggregates = clause
        .aggregates
        .iter()
        .map(resolve_aggregate)
        .collect::<Result<Vec<_>, _>>()?;

    for group in &clause.groups {
        check_scope(&group.output, &group.expr, scope)?;
    }
    for aggregate in &aggregates {
        check_scope(&aggregate.output, &aggregate.input, scope)?;
    }

    check_unique_outputs(clause)?;
    if clause.distinct {
        check_distinct(clause)?;
    }

    Ok(ValidatedClause {
        groups: clause.groups.clone(),
        aggregates,
        count_into: clause.count_into.clone(),
        into: clause.into.clone(),
        distinct: clause.distinct,
    })
}

// An aggregate must be exactly one call to a registry function with one argument.
fn resolve_aggregate(assignment: &Assignment) -> Result<ValidatedAggregate, PlanError> {
    let invalid = |reason: String| PlanError::InvalidAggregateExpression {
        output: assignment.output.clone(),
        reason,
    };

    let Expr::Call { name, args } = &assignment.expr else {
        return Err(invalid(format!(
            "'{}' is not a call to an aggregate function",
            assignment.expr
        )));
    };

    let function = AggregateFunction::from_name(name)
        .ok_or_else(|| invalid(format!("'{name}' is not an aggregate function")))?;

    let [input] = args.as_slice() else {
        return Err(invalid(format!(
            "{function} expects exactly 1 argument, found {}",
            args.len()
        )));
    };

    Ok(ValidatedAggregate {
        output: assignment.output.clone(),
        function,
        input: input.clone(),
    })
}

fn check_scope(output: &str, expr: &Expr, scope: &Scope) -> Result<(), PlanError> {
    match expr.variables().into_iter().find(|name| !scope.contains(name)) {
        Some(name) => Err(PlanError::UnknownVariable {
            name: name.to_string(),
            output: output.to_string(),
        }),
        None => Ok(()),
    }
}

fn check_unique_outputs(clause: &CollectClause) -> Result<(), PlanError> {
    let mut seen = BTreeSet::new();
    for name in clause.outputs() {
        if !seen.insert(name) {
            return Err(PlanError::DuplicateOutputVariable {
                name: name.to_string(),
            });
        }
    }

    Ok(())
}

fn check_distinct(clause: &CollectClause) -> Result<(), PlanError> {
    if clause.groups.is_empty() {
        return Err(PlanError::InvalidDistinct {
            reason: "DISTINCT requires at least one group expression",
        });
    }
    if !clause.aggregates.is_empty() || clause.count_into.is_some() || clause.into.is_some() {
        return Err(PlanError::InvalidDistinct {
            reason: "DISTINCT cannot be combined with AGGREGATE, WITH COUNT or INTO",
        });
    }

    Ok(())
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::parse::parse_collect;

    fn validate(text: &str) -> Result<ValidatedClause, PlanError> {
        let clause = parse_collect(text).expect("clause should parse");
        validate_clause(&clause, &Scope::new(["i"]))
    }

    #[test]
    fn resolves_aliases_to_canonical_functions() {
        let clause = validate("COLLECT AGGREGATE a = avg(i.v), n = COUNT(i)").expect("valid clause");

        assert_eq!(clause.aggregates()[0].function(), AggregateFunction::Average);
        assert_eq!(clause.aggregates()[1].function(), AggregateFunction::Length);
        assert_eq!(clause.aggregates()[1].input(), &Expr::variable("i"));
    }

    #[test]
    fn non_call_aggregates_are_rejected() {
        let cases = [
            "COLLECT AGGREGATE c = 1",
            "COLLECT AGGREGATE c = i.test",
            "COLLECT AGGREGATE c = i.test + 1",
            "COLLECT AGGREGATE c = LENGTH(i) + 1",
            "COLLECT AGGREGATE c = 1 + LENGTH(i)",
            "COLLECT AGGREGATE c = i.v > 1 ? SUM(i.v) : 0",
        ];

        for text in cases {
            let err = validate(text).expect_err("non-call aggregate must fail");
            assert!(
                matches!(err, PlanError::InvalidAggregateExpression { .. }),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn scalar_functions_are_not_aggregates() {
        let cases = [
            "COLLECT AGGREGATE c = IS_NUMBER(i)",
            "COLLECT AGGREGATE c = IS_STRING(i)",
            "COLLECT AGGREGATE c = IS_ARRAY(i)",
            "COLLECT AGGREGATE c = IS_OBJECT(i)",
            "COLLECT AGGREGATE length = LENGTH(i), c = IS_OBJECT(i)",
            "COLLECT g = i.group AGGREGATE c = IS_OBJECT(i)",
        ];

        for text in cases {
            let err = validate(text).expect_err("scalar function must fail");
            assert!(
                matches!(err, PlanError::InvalidAggregateExpression { ref output, .. } if output == "c"),
                "{text}: {err}"
            );
        }
    }

    #[test]
    fn argument_count_is_checked() {
        let err = validate("COLLECT AGGREGATE c = SUM(i, i)").expect_err("two arguments must fail");

        assert_eq!(
            err,
            PlanError::InvalidAggregateExpression {
                output: "c".to_string(),
                reason: "SUM expects exactly 1 argument, found 2".to_string(),
            }
        );
    }

    #[test]
    fn own_group_outputs_are_not_in_scope() {
        let err = validate("COLLECT group = i.group AGGREGATE length = LENGTH(group)")
            .expect_err("group output must not be visible to aggregates");

        assert_eq!(
            err,
            PlanError::UnknownVariable {
                name: "group".to_string(),
                output: "length".to_string(),
            }
        );
    }

    #[test]
    fn group_expressions_are_scoped_too() {
        let err = validate("COLLECT doc = j").expect_err("unbound group input must fail");

        assert!(matches!(err, PlanError::UnknownVariable { ref name, .. } if name == "j"));
    }

    #[test]
    fn aggregate_errors_win_over_scope_errors() {
        let err = validate("COLLECT g = j.x AGGREGATE c = IS_NUMBER(i)")
            .expect_err("clause must fail");

        assert!(matches!(err, PlanError::InvalidAggregateExpression { .. }));
    }

    #[test]
    fn duplicate_outputs_are_rejected() {
        let err = validate("COLLECT a = i.a AGGREGATE a = SUM(i.v)").expect_err("duplicate must fail");

        assert_eq!(
            err,
            PlanError::DuplicateOutputVariable {
                name: "a".to_string()
            }
        );
    }

    #[test]
    fn distinct_requires_plain_groups() {
        validate("COLLECT DISTINCT v = i.v").expect("plain distinct is valid");

        let err = validate("COLLECT DISTINCT v = i.v WITH COUNT INTO n")
            .expect_err("distinct with count must fail");
        assert!(matches!(err, PlanError::InvalidDistinct { .. }));

        let err = validate("COLLECT DISTINCT INTO g").expect_err("distinct without groups must fail");
        assert!(matches!(err, PlanError::InvalidDistinct { .. }));
    }

    #[test]
    fn empty_programmatic_clause_is_rejected() {
        let err = validate_clause(&CollectClause::new(), &Scope::default())
            .expect_err("empty clause must fail");

        assert_eq!(err, PlanError::EmptyClause);
    }
}
