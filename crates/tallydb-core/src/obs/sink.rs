//! Metrics sink boundary.
//!
//! Core DB logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between execution logic
//! and the global metrics state.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// MetricsEvent
///
/// `method` is the stable grouping-method label ("hash" or "merge").
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    Plan {
        method: &'static str,
        sorted: bool,
    },
    CollectStart {
        method: &'static str,
    },
    CollectFinish {
        method: &'static str,
        rows_in: u64,
        groups: u64,
        rows_out: u64,
    },
    GroupLimitExceeded {
        method: &'static str,
        resource: &'static str,
    },
    SortFinish {
        rows: u64,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default thread-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::Plan { method, sorted } => {
                metrics::with_state_mut(|m| {
                    match method {
                        "merge" => m.ops.plan_merge = m.ops.plan_merge.saturating_add(1),
                        _ => m.ops.plan_hash = m.ops.plan_hash.saturating_add(1),
                    }
                    if sorted {
                        m.ops.plan_sort_nodes = m.ops.plan_sort_nodes.saturating_add(1);
                    }
                });
            }

            MetricsEvent::CollectStart { method } => {
                metrics::with_state_mut(|m| {
                    m.ops.collect_calls = m.ops.collect_calls.saturating_add(1);
                    let entry = m.methods.entry(method.to_string()).or_default();
                    entry.collect_calls = entry.collect_calls.saturating_add(1);
                });
            }

            MetricsEvent::CollectFinish {
                method,
                rows_in,
                groups,
                rows_out,
            } => {
                metrics::with_state_mut(|m| {
                    m.ops.rows_collected = m.ops.rows_collected.saturating_add(rows_in);
                    m.ops.groups_created = m.ops.groups_created.saturating_add(groups);
                    m.ops.rows_emitted = m.ops.rows_emitted.saturating_add(rows_out);

                    let entry = m.methods.entry(method.to_string()).or_default();
                    entry.rows_collected = entry.rows_collected.saturating_add(rows_in);
                    entry.groups_created = entry.groups_created.saturating_add(groups);
                    entry.rows_emitted = entry.rows_emitted.saturating_add(rows_out);
                });
            }

            MetricsEvent::GroupLimitExceeded { method, .. } => {
                metrics::with_state_mut(|m| {
                    m.ops.group_limit_hits = m.ops.group_limit_hits.saturating_add(1);
                    let entry = m.methods.entry(method.to_string()).or_default();
                    entry.group_limit_hits = entry.group_limit_hits.saturating_add(1);
                });
            }

            MetricsEvent::SortFinish { rows } => {
                metrics::with_state_mut(|m| {
                    m.ops.sort_calls = m.ops.sort_calls.saturating_add(1);
                    m.ops.rows_sorted = m.ops.rows_sorted.saturating_add(rows);
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // Preconditions:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` always restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        //
        // Aliasing:
        // - Only a shared reference is materialized, matching the shared borrow
        //   used to install the override.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current thread's metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics state.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
///
/// Overrides nest; the previous sink is restored when `f` returns or unwinds.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` always restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

///
/// CollectSpan
///
/// RAII guard that emits start/finish events for one grouping-engine run.
/// Finish accounting happens exactly once, also when the engine is dropped
/// early or an error cuts the run short.
///

pub(crate) struct CollectSpan {
    method: &'static str,
    rows_in: u64,
    groups: u64,
    rows_out: u64,
    finished: bool,
}

impl CollectSpan {
    /// Start a metrics span for one grouping method.
    #[must_use]
    pub(crate) fn new(method: &'static str) -> Self {
        record(MetricsEvent::CollectStart { method });

        Self {
            method,
            rows_in: 0,
            groups: 0,
            rows_out: 0,
            finished: false,
        }
    }

    pub(crate) const fn add_row_in(&mut self) {
        self.rows_in = self.rows_in.saturating_add(1);
    }

    pub(crate) const fn add_group(&mut self) {
        self.groups = self.groups.saturating_add(1);
    }

    pub(crate) const fn add_row_out(&mut self) {
        self.rows_out = self.rows_out.saturating_add(1);
    }

    pub(crate) fn limit_exceeded(&self, resource: &'static str) {
        record(MetricsEvent::GroupLimitExceeded {
            method: self.method,
            resource,
        });
    }

    /// Finish the span early (also happens on Drop).
    pub(crate) fn finish(&mut self) {
        if !self.finished {
            record(MetricsEvent::CollectFinish {
                method: self.method,
                rows_in: self.rows_in,
                groups: self.groups,
                rows_out: self.rows_out,
            });
            self.finished = true;
        }
    }
}

impl Drop for CollectSpan {
    fn drop(&mut self) {
        self.finish();
    }
}

///
/// TESTS
///
