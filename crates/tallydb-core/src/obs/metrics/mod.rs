use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    cmp::Ordering,
    collections::BTreeMap,
    time::{SystemTime, UNIX_EPOCH},
};

///
/// EventState
/// Ephemeral, in-memory counters for planning, collecting and sorting.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct EventState {
    pub ops: EventOps,
    pub methods: BTreeMap<String, MethodCounters>,
    pub since_ms: u64,
}

impl Default for EventState {
    fn default() -> Self {
        Self {
            ops: EventOps::default(),
            methods: BTreeMap::new(),
            since_ms: now_millis(),
        }
    }
}

///
/// EventOps
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventOps {
    // Planner decisions
    pub plan_hash: u64,
    pub plan_merge: u64,
    pub plan_sort_nodes: u64,

    // Grouping engine
    pub collect_calls: u64,
    pub rows_collected: u64,
    pub groups_created: u64,
    pub rows_emitted: u64,
    pub group_limit_hits: u64,

    // Sort step
    pub sort_calls: u64,
    pub rows_sorted: u64,
}

///
/// MethodCounters
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MethodCounters {
    pub collect_calls: u64,
    pub rows_collected: u64,
    pub groups_created: u64,
    pub rows_emitted: u64,
    pub group_limit_hits: u64,
}

thread_local! {
    static EVENT_STATE: RefCell<EventState> = RefCell::new(EventState::default());
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| {
            u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX)
        })
}

/// Borrow metrics immutably.
pub(crate) fn with_state<R>(f: impl FnOnce(&EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&m.borrow()))
}

/// Borrow metrics mutably.
pub(crate) fn with_state_mut<R>(f: impl FnOnce(&mut EventState) -> R) -> R {
    EVENT_STATE.with(|m| f(&mut m.borrow_mut()))
}

/// Reset all counters.
pub(crate) fn reset_all() {
    with_state_mut(|m| *m = EventState::default());
}

///
/// EventReport
/// Counter snapshot plus per-method averages.
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct EventReport {
    /// Ephemeral runtime counters since `since_ms`.
    pub counters: Option<EventState>,
    /// Per-method counters and averages.
    pub method_summaries: Vec<MethodSummary>,
}

///
/// MethodSummary
///

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct MethodSummary {
    pub method: String,
    pub collect_calls: u64,
    pub rows_collected: u64,
    pub groups_created: u64,
    pub rows_emitted: u64,
    pub group_limit_hits: u64,
    pub avg_rows_per_group: f64,
    pub avg_groups_per_collect: f64,
}

/// Build a metrics report by inspecting in-memory counters only.
#[must_use]
#[expect(clippy::cast_precision_loss)]
pub(crate) fn report() -> EventReport {
    let snap = with_state(Clone::clone);

    let mut method_summaries = snap
        .methods
        .iter()
        .map(|(method, ops)| {
            let avg_rows_per_group = if ops.groups_created > 0 {
                ops.rows_collected as f64 / ops.groups_created as f64
            } else {
                0.0
            };
            let avg_groups_per_collect = if ops.collect_calls > 0 {
                ops.groups_created as f64 / ops.collect_calls as f64
            } else {
                0.0
            };

            MethodSummary {
                method: method.clone(),
                collect_calls: ops.collect_calls,
                rows_collected: ops.rows_collected,
                groups_created: ops.groups_created,
                rows_emitted: ops.rows_emitted,
                group_limit_hits: ops.group_limit_hits,
                avg_rows_per_group,
                avg_groups_per_collect,
            }
        })
        .collect::<Vec<_>>();

    // busiest method first, name as tie-break
    method_summaries.sort_by(|a, b| match b.rows_collected.cmp(&a.rows_collected) {
        Ordering::Equal => a.method.cmp(&b.method),
        other => other,
    });

    EventReport {
        counters: Some(snap),
        method_summaries,
    }
}

///
/// TESTS
///

#[cfg(test)]
#[expect(clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn reset_all_clears_state() {
        with_state_mut(|m| {
            m.ops.collect_calls = 3;
            m.ops.rows_sorted = 2;
            m.methods.insert(
                "hash".to_string(),
                MethodCounters {
                    collect_calls: 1,
                    ..Default::default()
                },
            );
        });

        reset_all();

        with_state(|m| {
            assert_eq!(m.ops.collect_calls, 0);
            assert_eq!(m.ops.rows_sorted, 0);
            assert!(m.methods.is_empty());
        });
    }

    #[test]
    fn report_orders_methods_by_rows_and_averages_per_group() {
        reset_all();
        with_state_mut(|m| {
            m.methods.insert(
                "merge".to_string(),
                MethodCounters {
                    collect_calls: 2,
                    rows_collected: 4,
                    groups_created: 2,
                    ..Default::default()
                },
            );
            m.methods.insert(
                "hash".to_string(),
                MethodCounters {
                    collect_calls: 1,
                    rows_collected: 9,
                    groups_created: 3,
                    ..Default::default()
                },
            );
        });

        let report = report();
        let names = report
            .method_summaries
            .iter()
            .map(|s| s.method.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, vec!["hash", "merge"]);
        assert_eq!(report.method_summaries[0].avg_rows_per_group, 3.0);
        assert_eq!(report.method_summaries[1].avg_groups_per_collect, 1.0);
    }

    #[test]
    fn report_serializes_to_json() {
        reset_all();
        let json = serde_json::to_value(report()).expect("report should serialize");

        assert!(json.get("counters").is_some());
        assert!(json["method_summaries"].as_array().is_some_and(Vec::is_empty));
    }
}
