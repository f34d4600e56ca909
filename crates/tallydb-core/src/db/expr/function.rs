use crate::{
    db::{executor::aggregate::AggregateFunction, expr::EvalError},
    value::Value,
};

///
/// ScalarFunction
///
/// Built-in scalar functions. The aggregate-named members fold a
/// materialized array through the same reducers the grouping engine uses.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum ScalarFunction {
    Fold(AggregateFunction),
    IsArray,
    IsBool,
    IsNull,
    IsNumber,
    IsObject,
    IsString,
}

impl ScalarFunction {
    fn from_name(name: &str) -> Option<Self> {
        if let Some(function) = AggregateFunction::from_name(name) {
            return Some(Self::Fold(function));
        }

        let function = match name.to_ascii_uppercase().as_str() {
            "IS_ARRAY" | "IS_LIST" => Self::IsArray,
            "IS_BOOL" => Self::IsBool,
            "IS_NULL" => Self::IsNull,
            "IS_NUMBER" => Self::IsNumber,
            "IS_OBJECT" | "IS_DOCUMENT" => Self::IsObject,
            "IS_STRING" => Self::IsString,
            _ => return None,
        };

        Some(function)
    }
}

/// Call a built-in function by name.
pub(super) fn call(name: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    let function =
        ScalarFunction::from_name(name).ok_or_else(|| EvalError::UnknownFunction {
            name: name.to_string(),
        })?;

    let [arg] = <[Value; 1]>::try_from(args).map_err(|args| EvalError::InvalidArgumentCount {
        function: name.to_ascii_uppercase(),
        expected: 1,
        found: args.len(),
    })?;

    let result = match function {
        ScalarFunction::Fold(AggregateFunction::Length) => scalar_length(&arg),
        ScalarFunction::Fold(function) => match &arg {
            Value::List(items) => function.fold_scalar(items),
            _ => Value::Null,
        },
        ScalarFunction::IsArray => Value::Bool(matches!(arg, Value::List(_))),
        ScalarFunction::IsBool => Value::Bool(matches!(arg, Value::Bool(_))),
        ScalarFunction::IsNull => Value::Bool(arg.is_null()),
        ScalarFunction::IsNumber => Value::Bool(arg.is_numeric()),
        ScalarFunction::IsObject => Value::Bool(matches!(arg, Value::Object(_))),
        ScalarFunction::IsString => Value::Bool(matches!(arg, Value::Text(_))),
    };

    Ok(result)
}

// LENGTH outside an aggregate measures its argument
#[expect(clippy::cast_precision_loss)]
fn scalar_length(value: &Value) -> Value {
    let length = match value {
        Value::Null => 0,
        Value::Bool(b) => usize::from(*b),
        Value::Number(_) => value.to_string().chars().count(),
        Value::Text(s) => s.chars().count(),
        Value::List(items) => items.len(),
        Value::Object(entries) => entries.len(),
    };

    Value::from_f64(length as f64)
}
