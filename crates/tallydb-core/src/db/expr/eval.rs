use crate::{
    db::{
        expr::{BinaryOp, Expr, UnaryOp, function},
        row::Row,
    },
    value::{Value, canonical_cmp},
};
use std::cmp::Ordering;
use thiserror::Error as ThisError;

///
/// EvalError
///
/// Failure raised while evaluating one expression against one row.
/// The grouping engine propagates these unchanged.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum EvalError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("function '{function}' expects {expected} argument(s), got {found}")]
    InvalidArgumentCount {
        function: String,
        expected: usize,
        found: usize,
    },

    #[error("operator '{op}' cannot be applied to {left} and {right}")]
    TypeMismatch {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("variable '{name}' is not bound in the current row")]
    UnboundVariable { name: String },

    #[error("unknown function '{name}'")]
    UnknownFunction { name: String },
}

///
/// Evaluator
///
/// Expression evaluation seam consumed by the grouping engine.
///

pub trait Evaluator {
    fn evaluate(&self, expr: &Expr, row: &Row) -> Result<Value, EvalError>;
}

///
/// ExprEvaluator
///
/// Default evaluator.
///
/// - attribute access on a non-object yields null
/// - arithmetic with a null operand yields null; other non-numbers fail
/// - comparisons use the canonical value ordering
/// - `&&` and `||` short-circuit on truthiness and return an operand
///

#[derive(Clone, Copy, Debug, Default)]
pub struct ExprEvaluator;

impl Evaluator for ExprEvaluator {
    fn evaluate(&self, expr: &Expr, row: &Row) -> Result<Value, EvalError> {
        match expr {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(name) => {
                row.get(name)
                    .cloned()
                    .ok_or_else(|| EvalError::UnboundVariable {
                        name: name.clone(),
                    })
            }
            Expr::Attribute { base, name } => {
                let base = self.evaluate(base, row)?;
                Ok(base.get(name).cloned().unwrap_or_default())
            }
            Expr::Index { base, index } => {
                let base = self.evaluate(base, row)?;
                let index = self.evaluate(index, row)?;
                Ok(index_value(&base, &index))
            }
            Expr::Array(items) => Ok(Value::List(
                items
                    .iter()
                    .map(|item| self.evaluate(item, row))
                    .collect::<Result<_, _>>()?,
            )),
            Expr::Object(entries) => {
                let mut evaluated = Vec::with_capacity(entries.len());
                for (key, value) in entries {
                    evaluated.push((key.clone(), self.evaluate(value, row)?));
                }

                Ok(Value::object(evaluated))
            }
            Expr::Unary { op, operand } => {
                let operand = self.evaluate(operand, row)?;
                eval_unary(*op, operand)
            }
            Expr::Binary { op, left, right } => self.eval_binary(*op, left, right, row),
            Expr::Ternary {
                condition,
                then,
                otherwise,
            } => {
                if self.evaluate(condition, row)?.is_truthy() {
                    self.evaluate(then, row)
                } else {
                    self.evaluate(otherwise, row)
                }
            }
            Expr::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.evaluate(arg, row))
                    .collect::<Result<Vec<_>, _>>()?;

                function::call(name, args)
            }
        }
    }
}

impl ExprEvaluator {
    fn eval_binary(
        &self,
        op: BinaryOp,
        left: &Expr,
        right: &Expr,
        row: &Row,
    ) -> Result<Value, EvalError> {
        let left = self.evaluate(left, row)?;

        // logical operators short-circuit before the right side is evaluated
        match op {
            BinaryOp::And if !left.is_truthy() => return Ok(left),
            BinaryOp::Or if left.is_truthy() => return Ok(left),
            _ => {}
        }

        let ordering = |right: &Expr| -> Result<Ordering, EvalError> {
            Ok(canonical_cmp(&left, &self.evaluate(right, row)?))
        };

        match op {
            BinaryOp::And | BinaryOp::Or => self.evaluate(right, row),
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => {
                let right = self.evaluate(right, row)?;
                eval_arithmetic(op, &left, &right)
            }
            BinaryOp::Eq => Ok(Value::Bool(ordering(right)?.is_eq())),
            BinaryOp::Ne => Ok(Value::Bool(ordering(right)?.is_ne())),
            BinaryOp::Lt => Ok(Value::Bool(ordering(right)?.is_lt())),
            BinaryOp::Le => Ok(Value::Bool(ordering(right)?.is_le())),
            BinaryOp::Gt => Ok(Value::Bool(ordering(right)?.is_gt())),
            BinaryOp::Ge => Ok(Value::Bool(ordering(right)?.is_ge())),
        }
    }
}

fn eval_unary(op: UnaryOp, operand: Value) -> Result<Value, EvalError> {
    match (op, operand) {
        (UnaryOp::Not, operand) => Ok(Value::Bool(!operand.is_truthy())),
        (UnaryOp::Neg, Value::Null) => Ok(Value::Null),
        (UnaryOp::Neg, Value::Number(n)) => Ok(Value::from_f64(-n.get())),
        (UnaryOp::Neg, other) => Err(EvalError::TypeMismatch {
            op: UnaryOp::Neg.symbol(),
            left: other.type_name(),
            right: "none",
        }),
    }
}

fn eval_arithmetic(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    debug_assert!(op.is_arithmetic(), "arithmetic evaluation requires + - * / %");

    let (l, r) = match (left, right) {
        (Value::Null, _) | (_, Value::Null) => return Ok(Value::Null),
        (Value::Number(l), Value::Number(r)) => (l.get(), r.get()),
        _ => {
            return Err(EvalError::TypeMismatch {
                op: op.symbol(),
                left: left.type_name(),
                right: right.type_name(),
            });
        }
    };

    let result = match op {
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        BinaryOp::Mul => l * r,
        BinaryOp::Div | BinaryOp::Mod if r == 0.0 => return Err(EvalError::DivisionByZero),
        BinaryOp::Div => l / r,
        _ => l % r,
    };

    // overflow to infinity is not representable
    Ok(Value::from_f64(result))
}

fn index_value(base: &Value, index: &Value) -> Value {
    match (base, index) {
        (Value::List(items), Value::Number(n)) => {
            let n = n.get();
            if n.fract() != 0.0 {
                return Value::Null;
            }

            #[expect(clippy::cast_possible_truncation)]
            let n = n as i64;
            let len = i64::try_from(items.len()).unwrap_or(i64::MAX);
            let position = if n < 0 { len + n } else { n };

            usize::try_from(position)
                .ok()
                .and_then(|position| items.get(position))
                .cloned()
                .unwrap_or_default()
        }
        (Value::Object(_), Value::Text(key)) => base.get(key).cloned().unwrap_or_default(),
        _ => Value::Null,
    }
}
