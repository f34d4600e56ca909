//! Module: executor::collect
//! Responsibility: the grouping engine that runs one `CollectNode`.
//! Does not own: strategy choice (made by the planner) or output ordering.
//! Boundary: rows are pulled from upstream only while collecting; once any
//! pull fails the engine is done and yields nothing further.

mod strategy;


use crate::{
    db::{
        executor::{
            ExecuteError,
            group::{ExecutionContext, GroupError, GroupKey, GroupedExecutionConfig},
        },
        expr::Evaluator,
        query::{CollectMethod, CollectNode},
        row::{Row, RowSource},
    },
    error::InternalError,
    obs::sink::CollectSpan,
    value::Value,
};
use std::collections::VecDeque;
use strategy::{GroupRecord, GroupingStrategy, HashGrouping, MergeGrouping, RowInputs};

///
/// CollectPhase
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CollectPhase {
    /// Pulling rows from upstream and folding them into records.
    Collecting,
    /// Upstream is exhausted; held records are being released.
    Finalizing,
    /// Nothing further will be produced.
    Done,
}

///
/// CollectExecutor
///
/// Pull-based grouping engine over one upstream row source.
///

pub struct CollectExecutor<'a, S> {
    node: &'a CollectNode,
    evaluator: &'a dyn Evaluator,
    input: S,
    strategy: Box<dyn GroupingStrategy>,
    context: ExecutionContext,
    phase: CollectPhase,
    ready: VecDeque<GroupRecord>,
    span: CollectSpan,
}

impl<'a, S: RowSource> CollectExecutor<'a, S> {
    #[must_use]
    pub fn new(
        node: &'a CollectNode,
        input: S,
        evaluator: &'a dyn Evaluator,
        config: GroupedExecutionConfig,
    ) -> Self {
        let functions = node.aggregates.iter().map(|a| a.function).collect();
        let strategy: Box<dyn GroupingStrategy> = match node.method {
            CollectMethod::Hash => Box::new(HashGrouping::new(functions)),
            CollectMethod::Merge => Box::new(MergeGrouping::new(functions)),
        };

        Self {
            node,
            evaluator,
            input,
            strategy,
            context: ExecutionContext::new(config),
            phase: CollectPhase::Collecting,
            ready: VecDeque::new(),
            span: CollectSpan::new(node.method.label()),
        }
    }

    #[must_use]
    pub const fn phase(&self) -> CollectPhase {
        self.phase
    }

    fn advance(&mut self) -> Result<Option<Row>, ExecuteError> {
        loop {
            if let Some(record) = self.ready.pop_front() {
                return self.emit(record).map(Some);
            }

            match self.phase {
                CollectPhase::Collecting => match self.input.next_row()? {
                    Some(row) => self.collect_row(&row)?,
                    None => self.phase = CollectPhase::Finalizing,
                },
                CollectPhase::Finalizing => {
                    self.ready.extend(self.strategy.finish());

                    // an ungrouped clause always yields exactly one row
                    if self.ready.is_empty() && self.node.groups.is_empty() {
                        let functions: Vec<_> =
                            self.node.aggregates.iter().map(|a| a.function).collect();
                        self.ready
                            .push_back(GroupRecord::new(GroupKey::empty(), &functions));
                    }
                    self.phase = CollectPhase::Done;
                }
                CollectPhase::Done => {
                    self.span.finish();
                    return Ok(None);
                }
            }
        }
    }

    fn collect_row(&mut self, row: &Row) -> Result<(), ExecuteError> {
        self.span.add_row_in();

        let (key, inputs) = self.evaluate_row(row)?;
        match self.strategy.accept(key, inputs, &mut self.context) {
            Ok(Some(record)) => self.ready.push_back(record),
            Ok(None) => {}
            Err(err) => return Err(self.group_failed(err)),
        }

        Ok(())
    }

    fn evaluate_row(&self, row: &Row) -> Result<(GroupKey, RowInputs), ExecuteError> {
        let key_values = self
            .node
            .groups
            .iter()
            .map(|group| self.evaluator.evaluate(&group.expr, row))
            .collect::<Result<Vec<_>, _>>()?;

        let aggregates = self
            .node
            .aggregates
            .iter()
            .map(|aggregate| self.evaluator.evaluate(&aggregate.input, row))
            .collect::<Result<Vec<_>, _>>()?;

        let inputs = RowInputs {
            aggregates,
            into: self.node.into.as_ref().map(|_| row.to_value()),
        };

        Ok((GroupKey::new(key_values), inputs))
    }

    fn group_failed(&self, err: GroupError) -> ExecuteError {
        self.span.limit_exceeded(err.resource());

        err.into()
    }

    // finalize one record into its output row
    fn emit(&mut self, record: GroupRecord) -> Result<Row, ExecuteError> {
        let GroupRecord {
            key,
            states,
            count,
            into_rows,
        } = record;

        let key_values = key.into_values();
        if key_values.len() != self.node.groups.len() || states.len() != self.node.aggregates.len()
        {
            return Err(InternalError::executor_invariant(format!(
                "group record shape mismatch: {} keys for {} groups, {} states for {} aggregates",
                key_values.len(),
                self.node.groups.len(),
                states.len(),
                self.node.aggregates.len(),
            ))
            .into());
        }

        let mut row = Row::new();
        for (group, value) in self.node.groups.iter().zip(key_values) {
            row.bind(group.output.clone(), value);
        }

        if !self.node.distinct {
            for (aggregate, state) in self.node.aggregates.iter().zip(states) {
                row.bind(aggregate.output.clone(), state.finalize());
            }
            if let Some(name) = &self.node.count_into {
                row.bind(name.clone(), count_value(count));
            }
            if let Some(name) = &self.node.into {
                row.bind(name.clone(), Value::List(into_rows));
            }
        }

        self.span.add_group();
        self.span.add_row_out();

        Ok(row)
    }
}

impl<S: RowSource> RowSource for CollectExecutor<'_, S> {
    fn next_row(&mut self) -> Result<Option<Row>, ExecuteError> {
        if self.phase == CollectPhase::Done && self.ready.is_empty() {
            return Ok(None);
        }

        let result = self.advance();
        if result.is_err() {
            self.phase = CollectPhase::Done;
            self.ready.clear();
            self.span.finish();
        }

        result
    }
}

#[expect(clippy::cast_precision_loss)]
fn count_value(count: u64) -> Value {
    Value::from_f64(count as f64)
}
