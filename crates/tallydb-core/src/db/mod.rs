//! Module: db
//! Responsibility: the COLLECT/AGGREGATE clause from text to grouped rows.
//! Does not own: value ordering/hashing (see `value`) or metrics state (see `obs`).
//! Boundary: `CollectQuery` is the only entrypoint callers need.

pub mod executor;
pub mod expr;
pub mod query;
pub mod row;

mod session;


use crate::{
    db::{
        executor::{ExecuteError, GroupError},
        query::{ParseError, PlanError},
    },
    error::InternalError,
};
use thiserror::Error as ThisError;

// re-exports
pub use session::{CollectQuery, PlanStream};

///
/// QueryError
///
/// Unified error surface for compiling, planning and executing one clause.
/// Every failure aborts the whole clause; there is no partial-result mode.
///

#[derive(Debug, ThisError)]
pub enum QueryError {
    #[error("{0}")]
    Parse(#[from] ParseError),

    #[error("{0}")]
    Plan(#[from] PlanError),

    #[error("{0}")]
    Execute(#[from] ExecuteError),

    #[error("{0}")]
    Internal(#[from] InternalError),
}

impl QueryError {
    /// Stable classification for callers that branch on failure kind.
    #[must_use]
    pub const fn kind(&self) -> QueryErrorKind {
        match self {
            Self::Parse(_) => QueryErrorKind::Grammar,
            Self::Plan(PlanError::InvalidAggregateExpression { .. }) => {
                QueryErrorKind::InvalidAggregateExpression
            }
            Self::Plan(PlanError::UnknownVariable { .. }) => QueryErrorKind::UnknownVariable,
            Self::Plan(
                PlanError::DuplicateOutputVariable { .. }
                | PlanError::EmptyClause
                | PlanError::InvalidDistinct { .. },
            ) => QueryErrorKind::InvalidClause,
            Self::Execute(ExecuteError::Evaluation(_)) => QueryErrorKind::Evaluation,
            Self::Execute(ExecuteError::Group(GroupError::MemoryLimitExceeded { .. })) => {
                QueryErrorKind::ResourceLimit
            }
            Self::Execute(ExecuteError::Internal(_)) | Self::Internal(_) => {
                QueryErrorKind::Internal
            }
        }
    }
}

///
/// QueryErrorKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryErrorKind {
    Grammar,
    InvalidAggregateExpression,
    UnknownVariable,
    InvalidClause,
    Evaluation,
    ResourceLimit,
    Internal,
}
