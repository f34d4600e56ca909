//! Module: executor::sort
//! Responsibility: stable in-memory ordering of rows by bound variables.
//! Boundary: buffers its whole input on the first pull.

use crate::{
    db::{
        executor::ExecuteError,
        query::SortNode,
        row::{Row, RowSource},
    },
    obs::sink::{MetricsEvent, record},
    value::{Value, canonical_cmp},
};
use std::{cmp::Ordering, collections::VecDeque};

///
/// SortExecutor
///
/// Rows missing a key variable sort as if it were bound to null.
///

pub struct SortExecutor<'a, S> {
    node: &'a SortNode,
    input: S,
    sorted: Option<VecDeque<Row>>,
    failed: bool,
}

impl<'a, S: RowSource> SortExecutor<'a, S> {
    #[must_use]
    pub const fn new(node: &'a SortNode, input: S) -> Self {
        Self {
            node,
            input,
            sorted: None,
            failed: false,
        }
    }

    fn buffer(&mut self) -> Result<VecDeque<Row>, ExecuteError> {
        let mut rows = Vec::new();
        while let Some(row) = self.input.next_row()? {
            rows.push(row);
        }

        // stable: equal keys keep upstream order
        rows.sort_by(|left, right| compare_rows(self.node, left, right));
        record(MetricsEvent::SortFinish {
            rows: u64::try_from(rows.len()).unwrap_or(u64::MAX),
        });

        Ok(rows.into())
    }
}

impl<S: RowSource> RowSource for SortExecutor<'_, S> {
    fn next_row(&mut self) -> Result<Option<Row>, ExecuteError> {
        if self.failed {
            return Ok(None);
        }

        if self.sorted.is_none() {
            match self.buffer() {
                Ok(rows) => self.sorted = Some(rows),
                Err(err) => {
                    self.failed = true;
                    return Err(err);
                }
            }
        }

        Ok(self.sorted.as_mut().and_then(VecDeque::pop_front))
    }
}

fn compare_rows(node: &SortNode, left: &Row, right: &Row) -> Ordering {
    for key in &node.keys {
        let l = left.get(&key.variable).unwrap_or(&Value::Null);
        let r = right.get(&key.variable).unwrap_or(&Value::Null);

        let ordering = if key.ascending {
            canonical_cmp(l, r)
        } else {
            canonical_cmp(r, l)
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }

    Ordering::Equal
}

///
/// TESTS
///
