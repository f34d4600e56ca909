use crate::{
    db::{
        QueryError,
        executor::{CollectExecutor, GroupedExecutionConfig, SortExecutor},
        expr::{Evaluator, ExprEvaluator},
        query::{CollectPlan, ExplainPlan, Scope, parse_collect, plan_collect, validate_clause},
        row::{Row, RowSource, VecRowSource},
    },
    error::InternalError,
    obs::sink::{MetricsSink, with_metrics_sink},
};
use std::mem;

///
/// CollectQuery
///
/// Compiled COLLECT clause with execution policy (limits, metrics).
/// Compilation validates and plans once; every execution builds a fresh
/// pipeline, so re-running a query never observes earlier state.
///

#[derive(Clone)]
pub struct CollectQuery {
    plan: CollectPlan,
    config: GroupedExecutionConfig,
    metrics: Option<&'static dyn MetricsSink>,
}

impl CollectQuery {
    /// Parse, validate and plan one clause against the variables in scope.
    pub fn compile(text: &str, scope: &Scope) -> Result<Self, QueryError> {
        let clause = parse_collect(text)?;
        let validated = validate_clause(&clause, scope)?;

        Ok(Self::new(plan_collect(validated)))
    }

    /// Wrap an explicitly built plan.
    ///
    /// Sort keys must name variables the collect step binds.
    pub fn from_plan(plan: CollectPlan) -> Result<Self, QueryError> {
        if let Some(sort) = plan.sort() {
            let collect = plan.collect();
            let bound = |name: &str| collect.groups().iter().any(|g| g.output == name);

            if let Some(key) = sort.keys.iter().find(|key| !bound(&key.variable)) {
                return Err(InternalError::query_invariant(format!(
                    "sort key '{}' is not a group output of the collect step",
                    key.variable
                ))
                .into());
            }
        }

        Ok(Self::new(plan))
    }

    fn new(plan: CollectPlan) -> Self {
        Self {
            plan,
            config: GroupedExecutionConfig::unbounded(),
            metrics: None,
        }
    }

    #[must_use]
    pub const fn with_config(mut self, config: GroupedExecutionConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub const fn metrics_sink(mut self, sink: &'static dyn MetricsSink) -> Self {
        self.metrics = Some(sink);
        self
    }

    #[must_use]
    pub const fn plan(&self) -> &CollectPlan {
        &self.plan
    }

    #[must_use]
    pub const fn config(&self) -> &GroupedExecutionConfig {
        &self.config
    }

    #[must_use]
    pub fn explain(&self) -> ExplainPlan {
        self.plan.explain()
    }

    /// Run over `source` with the default evaluator.
    #[must_use]
    pub fn execute<'a>(&'a self, source: impl RowSource + 'a) -> PlanStream<'a> {
        self.execute_with(source, &ExprEvaluator)
    }

    /// Run over `source` with the default evaluator and explicit limits.
    #[must_use]
    pub fn execute_with_config<'a>(
        &'a self,
        source: impl RowSource + 'a,
        config: GroupedExecutionConfig,
    ) -> PlanStream<'a> {
        self.build(source, &ExprEvaluator, config)
    }

    /// Run over `source` with a caller-provided evaluator.
    #[must_use]
    pub fn execute_with<'a>(
        &'a self,
        source: impl RowSource + 'a,
        evaluator: &'a dyn Evaluator,
    ) -> PlanStream<'a> {
        self.build(source, evaluator, self.config)
    }

    fn build<'a>(
        &'a self,
        source: impl RowSource + 'a,
        evaluator: &'a dyn Evaluator,
        config: GroupedExecutionConfig,
    ) -> PlanStream<'a> {
        let pipeline = self.with_metrics(|| {
            let collect = CollectExecutor::new(self.plan.collect(), source, evaluator, config);
            let pipeline: Box<dyn RowSource + 'a> = match self.plan.sort() {
                Some(sort) => Box::new(SortExecutor::new(sort, collect)),
                None => Box::new(collect),
            };

            pipeline
        });

        PlanStream {
            pipeline,
            metrics: self.metrics,
            done: false,
        }
    }

    fn with_metrics<T>(&self, f: impl FnOnce() -> T) -> T {
        if let Some(sink) = self.metrics {
            with_metrics_sink(sink, f)
        } else {
            f()
        }
    }
}

///
/// PlanStream
///
/// Downstream end of one execution. Yields grouped rows until exhausted or
/// until the first error, after which it yields nothing.
///

pub struct PlanStream<'a> {
    pipeline: Box<dyn RowSource + 'a>,
    metrics: Option<&'static dyn MetricsSink>,
    done: bool,
}

impl PlanStream<'_> {
    /// Drain every remaining row, failing on the first error.
    pub fn collect_rows(self) -> Result<Vec<Row>, QueryError> {
        self.collect()
    }
}

impl Iterator for PlanStream<'_> {
    type Item = Result<Row, QueryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let pipeline = &mut self.pipeline;
        let pulled = match self.metrics {
            Some(sink) => with_metrics_sink(sink, || pipeline.next_row()),
            None => pipeline.next_row(),
        };

        match pulled {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err.into()))
            }
        }
    }
}

impl Drop for PlanStream<'_> {
    // an abandoned pipeline still reports its collect span to the session sink
    fn drop(&mut self) {
        if let Some(sink) = self.metrics {
            let pipeline = mem::replace(&mut self.pipeline, Box::new(VecRowSource::default()));
            with_metrics_sink(sink, || drop(pipeline));
        }
    }
}
