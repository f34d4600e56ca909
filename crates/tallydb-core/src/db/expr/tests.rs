use crate::{
    db::{
        expr::{BinaryOp, EvalError, Evaluator, Expr, ExprEvaluator, UnaryOp},
        row::Row,
    },
    value::Value,
};
use serde_json::json;

// ---- helpers -----------------------------------------------------------

fn row() -> Row {
    Row::single(
        "i",
        Value::from_json(&json!({
            "value": 3,
            "name": "alpha",
            "tags": ["x", "y", "z"],
            "nested": {"deep": true},
            "missing": null,
        })),
    )
}

fn eval(expr: &Expr) -> Result<Value, EvalError> {
    ExprEvaluator.evaluate(expr, &row())
}

fn attr(name: &str) -> Expr {
    Expr::attribute(Expr::variable("i"), name)
}

// ---- access ------------------------------------------------------------

#[test]
fn attribute_access_reads_object_fields() {
    assert_eq!(eval(&attr("value")), Ok(Value::from(3)));
    assert_eq!(eval(&attr("unknown")), Ok(Value::Null));
    assert_eq!(
        eval(&Expr::attribute(attr("nested"), "deep")),
        Ok(Value::Bool(true))
    );
}

#[test]
fn attribute_access_on_non_object_is_null() {
    assert_eq!(eval(&Expr::attribute(attr("value"), "x")), Ok(Value::Null));
    assert_eq!(eval(&Expr::attribute(attr("missing"), "x")), Ok(Value::Null));
}

#[test]
fn index_access_supports_negative_positions() {
    let index = |n: i32| Expr::Index {
        base: Box::new(attr("tags")),
        index: Box::new(Expr::literal(n)),
    };

    assert_eq!(eval(&index(0)), Ok(Value::from("x")));
    assert_eq!(eval(&index(-1)), Ok(Value::from("z")));
    assert_eq!(eval(&index(7)), Ok(Value::Null));
}

#[test]
fn unbound_variable_is_an_error() {
    assert_eq!(
        eval(&Expr::variable("j")),
        Err(EvalError::UnboundVariable {
            name: "j".to_string()
        })
    );
}

// ---- operators ---------------------------------------------------------

#[test]
fn arithmetic_over_numbers() {
    let expr = Expr::binary(BinaryOp::Mul, attr("value"), Expr::literal(2));
    assert_eq!(eval(&expr), Ok(Value::from(6)));

    let expr = Expr::binary(BinaryOp::Mod, Expr::literal(7), Expr::literal(4));
    assert_eq!(eval(&expr), Ok(Value::from(3)));
}

#[test]
fn arithmetic_with_null_is_null() {
    let expr = Expr::binary(BinaryOp::Add, attr("missing"), Expr::literal(1));
    assert_eq!(eval(&expr), Ok(Value::Null));
}

#[test]
fn arithmetic_type_mismatch_fails() {
    let expr = Expr::binary(BinaryOp::Add, attr("name"), Expr::literal(1));
    let err = eval(&expr).expect_err("text + number must fail");

    assert_eq!(
        err,
        EvalError::TypeMismatch {
            op: "+",
            left: "string",
            right: "number",
        }
    );
}

#[test]
fn division_by_zero_fails() {
    for op in [BinaryOp::Div, BinaryOp::Mod] {
        let expr = Expr::binary(op, Expr::literal(1), Expr::literal(0));
        assert_eq!(eval(&expr), Err(EvalError::DivisionByZero));
    }
}

#[test]
fn comparisons_use_value_ordering() {
    let lt = Expr::binary(BinaryOp::Lt, Expr::literal(Value::Null), Expr::literal(false));
    assert_eq!(eval(&lt), Ok(Value::Bool(true)));

    let ge = Expr::binary(BinaryOp::Ge, Expr::literal("a"), Expr::literal(9999));
    assert_eq!(eval(&ge), Ok(Value::Bool(true)));

    let eq = Expr::binary(BinaryOp::Eq, attr("value"), Expr::literal(3));
    assert_eq!(eval(&eq), Ok(Value::Bool(true)));
}

#[test]
fn logical_operators_short_circuit() {
    // the right side would fail if evaluated
    let failing = Expr::binary(BinaryOp::Div, Expr::literal(1), Expr::literal(0));

    let and = Expr::binary(BinaryOp::And, Expr::literal(false), failing.clone());
    assert_eq!(eval(&and), Ok(Value::Bool(false)));

    let or = Expr::binary(BinaryOp::Or, attr("value"), failing);
    assert_eq!(eval(&or), Ok(Value::from(3)));
}

#[test]
fn ternary_selects_branch_on_truthiness() {
    let expr = Expr::Ternary {
        condition: Box::new(attr("missing")),
        then: Box::new(Expr::literal(1)),
        otherwise: Box::new(Expr::literal(Value::Null)),
    };

    assert_eq!(eval(&expr), Ok(Value::Null));
}

#[test]
fn unary_operators() {
    let neg = Expr::Unary {
        op: UnaryOp::Neg,
        operand: Box::new(attr("value")),
    };
    assert_eq!(eval(&neg), Ok(Value::from(-3)));

    let not = Expr::Unary {
        op: UnaryOp::Not,
        operand: Box::new(attr("missing")),
    };
    assert_eq!(eval(&not), Ok(Value::Bool(true)));
}

// ---- functions ---------------------------------------------------------

#[test]
fn unknown_function_fails() {
    let err = eval(&Expr::call("NOPE", vec![])).expect_err("unknown function must fail");

    assert_eq!(
        err,
        EvalError::UnknownFunction {
            name: "NOPE".to_string()
        }
    );
}

#[test]
fn wrong_argument_count_fails() {
    let err = eval(&Expr::call("length", vec![Expr::literal(1), Expr::literal(2)]))
        .expect_err("two arguments must fail");

    assert!(matches!(
        err,
        EvalError::InvalidArgumentCount {
            expected: 1,
            found: 2,
            ..
        }
    ));
}

#[test]
fn scalar_length_measures_its_argument() {
    let cases = [
        (json!([1, 2, 3]), 3),
        (json!("héllo"), 5),
        (json!({"a": 1, "b": 2}), 2),
        (json!(null), 0),
        (json!(true), 1),
        (json!(12345), 5),
    ];

    for (input, expected) in cases {
        let expr = Expr::call("LENGTH", vec![Expr::literal(Value::from_json(&input))]);
        assert_eq!(eval(&expr), Ok(Value::from(expected)), "LENGTH({input})");
    }
}

#[test]
fn scalar_sum_of_empty_array_is_zero() {
    let expr = Expr::call("SUM", vec![Expr::Array(vec![])]);
    assert_eq!(eval(&expr), Ok(Value::from(0)));

    let expr = Expr::call("SUM", vec![Expr::literal(Value::from_json(&json!([null])))]);
    assert_eq!(eval(&expr), Ok(Value::from(0)));
}

#[test]
fn scalar_folds_match_aggregate_semantics() {
    let list = Expr::literal(Value::from_json(&json!([19, 23, null])));

    assert_eq!(eval(&Expr::call("max", vec![list.clone()])), Ok(Value::from(23)));
    assert_eq!(eval(&Expr::call("AVG", vec![list.clone()])), Ok(Value::from(21)));
    assert_eq!(
        eval(&Expr::call("VARIANCE_SAMPLE", vec![list])),
        Ok(Value::from(8))
    );
    assert_eq!(
        eval(&Expr::call("AVERAGE", vec![Expr::Array(vec![])])),
        Ok(Value::Null)
    );
}

#[test]
fn type_predicates() {
    assert_eq!(
        eval(&Expr::call("IS_NUMBER", vec![attr("value")])),
        Ok(Value::Bool(true))
    );
    assert_eq!(
        eval(&Expr::call("is_string", vec![attr("value")])),
        Ok(Value::Bool(false))
    );
    assert_eq!(
        eval(&Expr::call("IS_OBJECT", vec![attr("nested")])),
        Ok(Value::Bool(true))
    );
}

// ---- rendering ---------------------------------------------------------

#[test]
fn display_renders_canonical_source() {
    let expr = Expr::binary(
        BinaryOp::Add,
        Expr::call("LENGTH", vec![Expr::variable("i")]),
        Expr::binary(BinaryOp::Mul, attr("value"), Expr::literal("x")),
    );

    assert_eq!(expr.to_string(), "LENGTH(i) + (i.value * \"x\")");
}

#[test]
fn variables_are_deduplicated_in_first_use_order() {
    let expr = Expr::binary(
        BinaryOp::Add,
        Expr::attribute(Expr::variable("b"), "x"),
        Expr::binary(BinaryOp::Sub, Expr::variable("a"), Expr::variable("b")),
    );

    assert_eq!(expr.variables(), vec!["b", "a"]);
}
