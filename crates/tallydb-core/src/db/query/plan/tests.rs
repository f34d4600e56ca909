use crate::{
    db::query::{
        CollectMethod, ExplainNode, Scope, parse_collect, plan::CollectPlan, plan_collect,
        validate_clause,
    },
    obs::sink::{MetricsEvent, MetricsSink, with_metrics_sink},
};
use serde_json::json;
use std::cell::RefCell;

fn plan(text: &str) -> CollectPlan {
    let clause = parse_collect(text).expect("clause should parse");
    let validated = validate_clause(&clause, &Scope::new(["i"])).expect("clause should validate");

    plan_collect(validated)
}

#[test]
fn grouped_clause_hashes_and_sorts_by_group_outputs() {
    let plan = plan("COLLECT b = i.b, a = i.a AGGREGATE s = SUM(i.v)");

    assert_eq!(plan.collect().method(), CollectMethod::Hash);
    let sort = plan.sort().expect("grouped plan must sort");
    let variables: Vec<_> = sort.keys.iter().map(|k| k.variable.as_str()).collect();
    assert_eq!(variables, ["b", "a"]);
    assert!(sort.keys.iter().all(|k| k.ascending));
}

#[test]
fn ungrouped_clause_merges_without_sort() {
    let plan = plan("COLLECT AGGREGATE s = SUM(i.v)");

    assert_eq!(plan.collect().method(), CollectMethod::Merge);
    assert!(plan.sort().is_none());
    assert_eq!(plan.explain().node_types(), ["CollectNode"]);
}

#[test]
fn count_only_clause_is_ungrouped() {
    let plan = plan("COLLECT WITH COUNT INTO n");

    assert_eq!(plan.collect().method(), CollectMethod::Merge);
    assert_eq!(plan.collect().count_into(), Some("n"));
}

#[test]
fn explain_reports_canonical_function_names() {
    let explain = plan("COLLECT g = i.g AGGREGATE a = avg(i.v), n = COUNT(i)").explain();

    assert_eq!(explain.node_types(), ["CollectNode", "SortNode"]);
    let Some(ExplainNode::CollectNode {
        method, aggregates, ..
    }) = explain.collect_node()
    else {
        panic!("expected a collect node");
    };
    assert_eq!(*method, "hash");
    let functions: Vec<_> = aggregates.iter().map(|a| a.function).collect();
    assert_eq!(functions, ["AVERAGE", "LENGTH"]);
}

#[test]
fn explain_renders_json() {
    let explain = plan("COLLECT g = i.g WITH COUNT INTO n").explain();
    let rendered = explain.to_json().expect("explain should serialize");

    assert_eq!(
        rendered,
        json!({
            "nodes": [
                {
                    "type": "CollectNode",
                    "method": "hash",
                    "count": true,
                    "distinct": false,
                    "groups": [{"output": "g", "expression": "i.g"}],
                    "aggregates": [],
                },
                {
                    "type": "SortNode",
                    "keys": [{"variable": "g", "ascending": true}],
                },
            ]
        })
    );
}

#[test]
fn with_method_overrides_explicit_nodes_only() {
    let planned = plan("COLLECT g = i.g");
    let node = planned.collect().clone().with_method(CollectMethod::Merge);
    let explicit = CollectPlan::from_node(node);

    assert_eq!(explicit.collect().method(), CollectMethod::Merge);
    assert!(explicit.sort().is_none());
    assert_eq!(planned.collect().method(), CollectMethod::Hash);
}

#[test]
fn planning_records_metrics_event() {
    struct Capture(RefCell<Vec<MetricsEvent>>);

    impl MetricsSink for Capture {
        fn record(&self, event: MetricsEvent) {
            self.0.borrow_mut().push(event);
        }
    }

    let capture = Capture(RefCell::new(Vec::new()));
    with_metrics_sink(&capture, || plan("COLLECT g = i.g"));

    assert_eq!(
        capture.0.into_inner(),
        vec![MetricsEvent::Plan {
            method: "hash",
            sorted: true,
        }]
    );
}
