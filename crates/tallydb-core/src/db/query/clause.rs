use crate::db::expr::Expr;
use std::fmt;

///
/// Assignment
///
/// One `output = expression` pair inside a clause.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Assignment {
    pub output: String,
    pub expr: Expr,
}

impl Assignment {
    #[must_use]
    pub fn new(output: impl Into<String>, expr: Expr) -> Self {
        Self {
            output: output.into(),
            expr,
        }
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.output, self.expr)
    }
}

///
/// CollectClause
///
/// Parsed but unvalidated COLLECT clause.
/// Produced by the parser or built programmatically, then handed to
/// `validate_clause` before planning.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CollectClause {
    pub groups: Vec<Assignment>,
    pub aggregates: Vec<Assignment>,
    pub count_into: Option<String>,
    pub into: Option<String>,
    pub distinct: bool,
}

impl CollectClause {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn group(mut self, output: impl Into<String>, expr: Expr) -> Self {
        self.groups.push(Assignment::new(output, expr));
        self
    }

    #[must_use]
    pub fn aggregate(mut self, output: impl Into<String>, expr: Expr) -> Self {
        self.aggregates.push(Assignment::new(output, expr));
        self
    }

    #[must_use]
    pub fn with_count_into(mut self, output: impl Into<String>) -> Self {
        self.count_into = Some(output.into());
        self
    }

    #[must_use]
    pub fn into_variable(mut self, output: impl Into<String>) -> Self {
        self.into = Some(output.into());
        self
    }

    #[must_use]
    pub const fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Every output name the clause declares, in declaration order.
    pub fn outputs(&self) -> impl Iterator<Item = &str> {
        self.groups
            .iter()
            .chain(&self.aggregates)
            .map(|a| a.output.as_str())
            .chain(self.count_into.as_deref())
            .chain(self.into.as_deref())
    }
}

impl fmt::Display for CollectClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "COLLECT")?;
        if self.distinct {
            write!(f, " DISTINCT")?;
        }
        write_assignments(f, "", &self.groups)?;
        if !self.aggregates.is_empty() {
            write_assignments(f, " AGGREGATE", &self.aggregates)?;
        }
        if let Some(name) = &self.count_into {
            write!(f, " WITH COUNT INTO {name}")?;
        }
        if let Some(name) = &self.into {
            write!(f, " INTO {name}")?;
        }

        Ok(())
    }
}

fn write_assignments(
    f: &mut fmt::Formatter<'_>,
    keyword: &str,
    assignments: &[Assignment],
) -> fmt::Result {
    write!(f, "{keyword}")?;
    for (i, assignment) in assignments.iter().enumerate() {
        let sep = if i == 0 { " " } else { ", " };
        write!(f, "{sep}{assignment}")?;
    }

    Ok(())
}
