//! Module: executor::aggregate
//! Responsibility: the aggregate function registry and per-group reducer states.
//! Does not own: group-key bucketing or clause validation.
//! Boundary: reducer states are created and finalized only through `AggregateFunction`.

mod state;

#[cfg(test)]
mod tests;

use crate::value::Value;
use serde::Serialize;
use std::fmt;

// re-exports
pub(in crate::db) use state::AggregateState;

///
/// AggregateFunction
///
/// Fixed registry of functions allowed in an AGGREGATE assignment.
/// Aliases resolve to their canonical member at lookup time.
///

#[remain::sorted]
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AggregateFunction {
    Average,
    Length,
    Max,
    Min,
    Sum,
    Variance,
    VarianceSample,
}

impl AggregateFunction {
    /// Every registry member, in name order.
    pub const ALL: [Self; 7] = [
        Self::Average,
        Self::Length,
        Self::Max,
        Self::Min,
        Self::Sum,
        Self::Variance,
        Self::VarianceSample,
    ];

    /// Resolve a function name (case-insensitive, aliases included).
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.to_ascii_uppercase();
        let function = match upper.as_str() {
            "AVERAGE" | "AVG" => Self::Average,
            "LENGTH" | "COUNT" => Self::Length,
            "MAX" => Self::Max,
            "MIN" => Self::Min,
            "SUM" => Self::Sum,
            "VARIANCE" | "VARIANCE_POPULATION" => Self::Variance,
            "VARIANCE_SAMPLE" => Self::VarianceSample,
            _ => return None,
        };

        Some(function)
    }

    /// Canonical upper-case function name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Average => "AVERAGE",
            Self::Length => "LENGTH",
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::Sum => "SUM",
            Self::Variance => "VARIANCE",
            Self::VarianceSample => "VARIANCE_SAMPLE",
        }
    }

    /// Build the initial reducer state for this function.
    #[must_use]
    pub(in crate::db) const fn new_state(self) -> AggregateState {
        AggregateState::for_function(self)
    }

    /// Fold a materialized list the way the scalar function of the same name does.
    ///
    /// Identical to the aggregate fold except that SUM over no valid values
    /// yields the numeric identity `0` instead of null.
    #[must_use]
    pub(in crate::db) fn fold_scalar(self, items: &[Value]) -> Value {
        let mut state = self.new_state();
        for item in items {
            state.update(item.clone());
        }

        state.finalize_scalar()
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
