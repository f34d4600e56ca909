//! Module: db::executor
//! Responsibility: pull-based execution of collect plans.
//! Does not own: planning or clause validation.
//! Boundary: every executor is a `RowSource` over its upstream `RowSource`.

pub mod aggregate;
pub mod collect;
pub mod group;
pub mod sort;

use crate::{db::expr::EvalError, error::InternalError};
use thiserror::Error as ThisError;

// re-exports
pub use aggregate::AggregateFunction;
pub use collect::{CollectExecutor, CollectPhase};
pub use group::{GroupError, GroupedExecutionConfig};
pub use sort::SortExecutor;

///
/// ExecuteError
///
/// Runtime failure of one pipeline pull. The pipeline that returned it
/// yields nothing further.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ExecuteError {
    #[error("{0}")]
    Evaluation(#[from] EvalError),

    #[error("{0}")]
    Group(#[from] GroupError),

    #[error("{0}")]
    Internal(#[from] InternalError),
}
