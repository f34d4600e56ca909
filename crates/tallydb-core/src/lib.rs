//! Core runtime for TallyDB: the dynamic value domain, the COLLECT/AGGREGATE
//! clause (parser, validator, planner rule, explain), the aggregate
//! accumulators, and the grouping engine that executes one clause.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod db;
pub mod error;
pub mod obs;
pub mod types;
pub mod value;

///
/// CONSTANTS
///

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No executors, sinks, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::{
            CollectQuery, QueryError, QueryErrorKind,
            row::{Row, RowSource, VecRowSource},
        },
        value::Value,
    };
}
