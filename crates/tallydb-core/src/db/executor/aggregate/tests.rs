use crate::{
    db::executor::aggregate::{AggregateFunction, AggregateState},
    value::Value,
};
use serde_json::json;

// ---- helpers -----------------------------------------------------------

fn values(json: serde_json::Value) -> Vec<Value> {
    match Value::from_json(&json) {
        Value::List(items) => items,
        other => vec![other],
    }
}

fn fold(function: AggregateFunction, json: serde_json::Value) -> Value {
    let mut state = function.new_state();
    for value in values(json) {
        state.update(value);
    }

    state.finalize()
}

fn fold_f64(function: AggregateFunction, json: serde_json::Value) -> f64 {
    fold(function, json)
        .as_f64()
        .expect("numeric aggregate result")
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-3,
        "expected {expected}, got {actual}"
    );
}

// ---- registry ----------------------------------------------------------

#[test]
fn from_name_resolves_aliases_case_insensitively() {
    assert_eq!(AggregateFunction::from_name("count"), Some(AggregateFunction::Length));
    assert_eq!(AggregateFunction::from_name("Avg"), Some(AggregateFunction::Average));
    assert_eq!(
        AggregateFunction::from_name("VARIANCE_POPULATION"),
        Some(AggregateFunction::Variance)
    );
    assert_eq!(AggregateFunction::from_name("IS_NUMBER"), None);
    assert_eq!(AggregateFunction::from_name("UNIQUE"), None);
}

#[test]
fn canonical_names_round_trip_through_lookup() {
    for function in AggregateFunction::ALL {
        assert_eq!(AggregateFunction::from_name(function.name()), Some(function));
    }
}

// ---- LENGTH ------------------------------------------------------------

#[test]
fn length_counts_every_row_including_null() {
    assert_eq!(fold(AggregateFunction::Length, json!([])), Value::from(0));
    assert_eq!(
        fold(AggregateFunction::Length, json!([null, "a", 1, [], {}])),
        Value::from(5)
    );
}

// ---- MIN / MAX ---------------------------------------------------------

#[test]
fn min_max_over_mixed_values_use_value_ordering() {
    let input = json!([
        "foo", "bar", "baz", true, "bachelor", null, [], false, {}, {"zzz": 15}, {"zzz": 2},
        9999, -9999
    ]);

    assert_eq!(fold(AggregateFunction::Min, input.clone()), Value::Bool(false));
    assert_eq!(
        fold(AggregateFunction::Max, input),
        Value::from_json(&json!({"zzz": 15}))
    );
}

#[test]
fn min_max_over_only_null_or_nothing_are_null() {
    for function in [AggregateFunction::Min, AggregateFunction::Max] {
        assert_eq!(fold(function, json!([])), Value::Null);
        assert_eq!(fold(function, json!([null, null])), Value::Null);
    }
}

// ---- SUM / AVERAGE -----------------------------------------------------

#[test]
fn sum_and_average_over_numbers() {
    let input = json!([1, 42, 23, 19.5, 4, -28]);

    assert_close(fold_f64(AggregateFunction::Sum, input.clone()), 61.5);
    assert_close(fold_f64(AggregateFunction::Average, input), 10.25);
}

#[test]
fn sum_and_average_ignore_null() {
    let input = json!([null, 1, null, 3]);

    assert_close(fold_f64(AggregateFunction::Sum, input.clone()), 4.0);
    assert_close(fold_f64(AggregateFunction::Average, input), 2.0);
}

#[test]
fn numeric_aggregates_over_no_valid_values_are_null() {
    for function in [
        AggregateFunction::Sum,
        AggregateFunction::Average,
        AggregateFunction::Variance,
        AggregateFunction::VarianceSample,
    ] {
        assert_eq!(fold(function, json!([])), Value::Null, "{function} over []");
        assert_eq!(fold(function, json!([null])), Value::Null, "{function} over [null]");
    }
}

#[test]
fn non_numeric_input_poisons_regardless_of_position() {
    for function in [
        AggregateFunction::Sum,
        AggregateFunction::Average,
        AggregateFunction::Variance,
        AggregateFunction::VarianceSample,
    ] {
        assert_eq!(fold(function, json!(["a", 1, 2])), Value::Null);
        assert_eq!(fold(function, json!([1, 2, true])), Value::Null);
        assert_eq!(fold(function, json!([1, [], 2])), Value::Null);
        assert_eq!(fold(function, json!([1, {}, 2])), Value::Null);
    }
}

#[test]
fn poisoned_state_stays_poisoned() {
    let mut state = AggregateFunction::Sum.new_state();
    state.update(Value::from("x"));
    for n in 0..10 {
        state.update(Value::from(n));
    }

    assert_eq!(state.finalize(), Value::Null);
}

#[test]
fn sum_overflow_finalizes_to_null() {
    let mut state = AggregateFunction::Sum.new_state();
    state.update(Value::from_f64(f64::MAX));
    state.update(Value::from_f64(f64::MAX));

    assert_eq!(state.finalize(), Value::Null);
}

// ---- VARIANCE ----------------------------------------------------------

#[test]
fn variance_of_two_values() {
    assert_close(fold_f64(AggregateFunction::Variance, json!([19, 23])), 4.0);
    assert_close(fold_f64(AggregateFunction::VarianceSample, json!([19, 23])), 8.0);
}

#[test]
fn variance_single_value_edges() {
    assert_eq!(fold(AggregateFunction::Variance, json!([7])), Value::from(0));
    assert_eq!(fold(AggregateFunction::VarianceSample, json!([7])), Value::Null);
}

#[test]
fn variance_matches_reference_values() {
    let with_null = json!([1, 2, 3, 4, null, 23, 42, 19, 32, 44, -34]);
    assert_close(fold_f64(AggregateFunction::Variance, with_null.clone()), 495.04);
    assert_close(fold_f64(AggregateFunction::VarianceSample, with_null), 550.044);

    let mixed = json!([1, 42, 23, 19.5, 4, -28]);
    assert_close(fold_f64(AggregateFunction::Variance, mixed.clone()), 473.979);
    assert_close(fold_f64(AggregateFunction::VarianceSample, mixed), 568.775);
}

// ---- scalar counterparts -----------------------------------------------

#[test]
fn scalar_sum_of_nothing_is_zero_but_aggregate_is_null() {
    assert_eq!(AggregateFunction::Sum.fold_scalar(&[]), Value::from(0));
    assert_eq!(AggregateFunction::Sum.fold_scalar(&[Value::Null]), Value::from(0));
    assert_eq!(fold(AggregateFunction::Sum, json!([])), Value::Null);
}

#[test]
fn scalar_sum_still_poisons() {
    assert_eq!(
        AggregateFunction::Sum.fold_scalar(&values(json!([1, "a"]))),
        Value::Null
    );
}

#[test]
fn state_estimate_includes_held_extreme() {
    let mut state = AggregateState::for_function(AggregateFunction::Max);
    let empty = state.estimated_bytes();
    state.update(Value::from("x".repeat(256)));

    assert!(state.estimated_bytes() > empty);
}
