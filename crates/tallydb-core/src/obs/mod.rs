//! Observability: runtime telemetry (metrics) and sink abstractions.
//!
//! Execution code never touches `obs::metrics` directly; every counter update
//! flows through a `MetricsEvent` recorded on the active `MetricsSink`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, EventState, MethodCounters, MethodSummary};
pub use sink::{MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink};
