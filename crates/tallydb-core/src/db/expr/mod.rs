//! Module: db::expr
//! Responsibility: the small expression language used inside COLLECT clauses.
//! Does not own: clause grammar (see `query::parse`) or aggregate folding.
//! Boundary: `Evaluator` is the seam the grouping engine evaluates through.

mod eval;
mod function;

#[cfg(test)]
mod tests;

use crate::value::Value;
use std::fmt;

// re-exports
pub use eval::{EvalError, Evaluator, ExprEvaluator};

///
/// Expr
///
/// Compiled expression tree.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Expr {
    Literal(Value),
    Variable(String),
    Attribute {
        base: Box<Self>,
        name: String,
    },
    Index {
        base: Box<Self>,
        index: Box<Self>,
    },
    Array(Vec<Self>),
    Object(Vec<(String, Self)>),
    Unary {
        op: UnaryOp,
        operand: Box<Self>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Self>,
        right: Box<Self>,
    },
    Ternary {
        condition: Box<Self>,
        then: Box<Self>,
        otherwise: Box<Self>,
    },
    Call {
        name: String,
        args: Vec<Self>,
    },
}

impl Expr {
    #[must_use]
    pub fn literal(value: impl Into<Value>) -> Self {
        Self::Literal(value.into())
    }

    #[must_use]
    pub fn variable(name: impl Into<String>) -> Self {
        Self::Variable(name.into())
    }

    #[must_use]
    pub fn attribute(base: Self, name: impl Into<String>) -> Self {
        Self::Attribute {
            base: Box::new(base),
            name: name.into(),
        }
    }

    #[must_use]
    pub fn binary(op: BinaryOp, left: Self, right: Self) -> Self {
        Self::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[must_use]
    pub fn call(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Call {
            name: name.into(),
            args,
        }
    }

    /// Variable names referenced anywhere in this expression, first use first.
    #[must_use]
    pub fn variables(&self) -> Vec<&str> {
        let mut out = Vec::new();
        self.collect_variables(&mut out);

        out
    }

    fn collect_variables<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            Self::Literal(_) => {}
            Self::Variable(name) => {
                if !out.contains(&name.as_str()) {
                    out.push(name);
                }
            }
            Self::Attribute { base, .. } => base.collect_variables(out),
            Self::Index { base, index } => {
                base.collect_variables(out);
                index.collect_variables(out);
            }
            Self::Array(items) | Self::Call { args: items, .. } => {
                for item in items {
                    item.collect_variables(out);
                }
            }
            Self::Object(entries) => {
                for (_, value) in entries {
                    value.collect_variables(out);
                }
            }
            Self::Unary { operand, .. } => operand.collect_variables(out),
            Self::Binary { left, right, .. } => {
                left.collect_variables(out);
                right.collect_variables(out);
            }
            Self::Ternary {
                condition,
                then,
                otherwise,
            } => {
                condition.collect_variables(out);
                then.collect_variables(out);
                otherwise.collect_variables(out);
            }
        }
    }

    const fn needs_parens(&self) -> bool {
        matches!(self, Self::Binary { .. } | Self::Ternary { .. })
    }
}

// operands that are themselves operators render parenthesized
struct Operand<'a>(&'a Expr);

impl fmt::Display for Operand<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.needs_parens() {
            write!(f, "({})", self.0)
        } else {
            write!(f, "{}", self.0)
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(value) => write!(f, "{value}"),
            Self::Variable(name) => write!(f, "{name}"),
            Self::Attribute { base, name } => write!(f, "{}.{name}", Operand(base)),
            Self::Index { base, index } => write!(f, "{}[{index}]", Operand(base)),
            Self::Array(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Object(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::Unary { op, operand } => write!(f, "{}{}", op.symbol(), Operand(operand)),
            Self::Binary { op, left, right } => {
                write!(f, "{} {} {}", Operand(left), op.symbol(), Operand(right))
            }
            Self::Ternary {
                condition,
                then,
                otherwise,
            } => write!(
                f,
                "{} ? {} : {}",
                Operand(condition),
                Operand(then),
                Operand(otherwise)
            ),
            Self::Call { name, args } => {
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
        }
    }
}

///
/// UnaryOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Neg => "-",
            Self::Not => "!",
        }
    }
}

///
/// BinaryOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl BinaryOp {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Mod => "%",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::And => "&&",
            Self::Or => "||",
        }
    }

    #[must_use]
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod
        )
    }
}
