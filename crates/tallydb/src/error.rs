use derive_more::Display;
use serde::{Deserialize, Serialize};
use tallydb_core::{
    db::{QueryError, QueryErrorKind, executor::ExecuteError},
    error::{ErrorOrigin as CoreErrorOrigin, InternalError},
};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Debug, Deserialize, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self::new(ErrorKind::Internal, err.origin.into(), err.message)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        let kind = ErrorKind::from(err.kind());
        match err {
            QueryError::Parse(_) | QueryError::Plan(_) => {
                Self::new(kind, ErrorOrigin::Query, err.to_string())
            }
            QueryError::Execute(ExecuteError::Internal(inner)) | QueryError::Internal(inner) => {
                inner.into()
            }
            QueryError::Execute(_) => Self::new(kind, ErrorOrigin::Executor, err.to_string()),
        }
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    /// Clause text is not well-formed.
    Grammar,

    /// An AGGREGATE assignment is not a single registry function call.
    InvalidAggregateExpression,

    /// An expression references a variable that is not in scope.
    UnknownVariable,

    /// Clause shape is invalid (duplicate outputs, bad DISTINCT).
    InvalidClause,

    /// Row evaluation failed.
    Evaluation,

    /// A grouping hard limit was exceeded.
    ResourceLimit,

    /// The caller cannot remediate this.
    Internal,
}

impl From<QueryErrorKind> for ErrorKind {
    fn from(kind: QueryErrorKind) -> Self {
        match kind {
            QueryErrorKind::Grammar => Self::Grammar,
            QueryErrorKind::InvalidAggregateExpression => Self::InvalidAggregateExpression,
            QueryErrorKind::UnknownVariable => Self::UnknownVariable,
            QueryErrorKind::InvalidClause => Self::InvalidClause,
            QueryErrorKind::Evaluation => Self::Evaluation,
            QueryErrorKind::ResourceLimit => Self::ResourceLimit,
            QueryErrorKind::Internal => Self::Internal,
        }
    }
}

///
/// ErrorOrigin
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Executor,
    Query,
    Serialize,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Executor => Self::Executor,
            CoreErrorOrigin::Query => Self::Query,
            CoreErrorOrigin::Serialize => Self::Serialize,
        }
    }
}
