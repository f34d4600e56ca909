//! ## Crate layout
//! - `core`: value domain, COLLECT/AGGREGATE clause, grouping engine, and observability.
//! - `error`: public error type with a stable kind taxonomy.
//!
//! The `prelude` module carries the vocabulary needed to compile and run a
//! clause over in-memory documents.

pub use tallydb_core as core;

pub mod error;

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub use crate::core::db;
pub use error::{Error, ErrorKind, ErrorOrigin};

use crate::core::{
    db::{
        CollectQuery,
        query::Scope,
        row::{Row, VecRowSource},
    },
    value::Value,
};

/// Compile one clause with only `variable` in scope and run it over
/// `documents`, each bound to `variable`.
pub fn collect(
    text: &str,
    variable: &str,
    documents: impl IntoIterator<Item = Value>,
) -> Result<Vec<Row>, Error> {
    let query = CollectQuery::compile(text, &Scope::new([variable]))?;
    let rows = query
        .execute(VecRowSource::from_documents(variable, documents))
        .collect_rows()?;

    Ok(rows)
}

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error, ErrorKind,
        core::{
            db::{
                CollectQuery,
                executor::GroupedExecutionConfig,
                query::Scope,
                row::{Row, RowSource, VecRowSource},
            },
            value::Value,
        },
    };
}
