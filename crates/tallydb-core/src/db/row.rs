//! Module: db::row
//! Responsibility: row-context model and the upstream pull contract.
//! Does not own: expression evaluation or grouping.
//! Boundary: every pipeline stage consumes and produces `Row`s through `RowSource`.

use crate::{db::executor::ExecuteError, value::Value};
use derive_more::Deref;
use std::collections::VecDeque;

///
/// Row
///
/// One row-context: variable bindings in binding order.
/// Binding a name twice replaces the earlier value in place.
///

#[derive(Clone, Debug, Default, Deref, Eq, PartialEq)]
pub struct Row {
    bindings: Vec<(String, Value)>,
}

impl Row {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            bindings: Vec::new(),
        }
    }

    /// Build a row holding one binding.
    #[must_use]
    pub fn single(name: impl Into<String>, value: Value) -> Self {
        let mut row = Self::new();
        row.bind(name, value);

        row
    }

    /// Bind `name` to `value`, replacing an existing binding of the same name.
    pub fn bind(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        if let Some(slot) = self.bindings.iter_mut().find(|(existing, _)| *existing == name) {
            slot.1 = value;
        } else {
            self.bindings.push((name, value));
        }
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.bind(name, value);
        self
    }

    /// Look up one bound variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.bindings
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    /// Iterate bound variable names in binding order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(name, _)| name.as_str())
    }

    /// Snapshot this row as an object value, one attribute per binding.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(self.bindings.clone())
    }

    /// Render this row as a JSON object.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        self.to_value().to_json()
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut row = Self::new();
        for (name, value) in iter {
            row.bind(name, value);
        }

        row
    }
}

///
/// RowSource
///
/// Lazy, finite, non-restartable row producer.
/// `Ok(None)` is the end-of-input signal; it is not an error.
///

pub trait RowSource {
    fn next_row(&mut self) -> Result<Option<Row>, ExecuteError>;
}

impl<S: RowSource + ?Sized> RowSource for Box<S> {
    fn next_row(&mut self) -> Result<Option<Row>, ExecuteError> {
        (**self).next_row()
    }
}

///
/// VecRowSource
///
/// In-memory row source over an owned row list.
///

#[derive(Clone, Debug, Default)]
pub struct VecRowSource {
    rows: VecDeque<Row>,
}

impl VecRowSource {
    #[must_use]
    pub fn new(rows: impl IntoIterator<Item = Row>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    /// Build one row per document, binding each document to `variable`.
    #[must_use]
    pub fn from_documents(variable: &str, documents: impl IntoIterator<Item = Value>) -> Self {
        Self::new(
            documents
                .into_iter()
                .map(|document| Row::single(variable, document)),
        )
    }

    /// Build one row per JSON document, binding each document to `variable`.
    #[must_use]
    pub fn from_json_documents(variable: &str, documents: &[serde_json::Value]) -> Self {
        Self::from_documents(variable, documents.iter().map(Value::from_json))
    }

    /// Rows not yet pulled.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.rows.len()
    }
}

impl RowSource for VecRowSource {
    fn next_row(&mut self) -> Result<Option<Row>, ExecuteError> {
        Ok(self.rows.pop_front())
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_replaces_in_place_and_keeps_order() {
        let row = Row::new()
            .with("a", Value::from(1))
            .with("b", Value::from(2))
            .with("a", Value::from(3));

        assert_eq!(row.names().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(row.get("a"), Some(&Value::from(3)));
        assert_eq!(row.len(), 2);
    }

    #[test]
    fn from_documents_binds_each_document() {
        let mut source = VecRowSource::from_documents("i", [Value::from(1), Value::from(2)]);

        assert_eq!(source.remaining(), 2);
        let first = source.next_row().expect("pull").expect("row");
        assert_eq!(first.get("i"), Some(&Value::from(1)));
        source.next_row().expect("pull").expect("row");
        assert!(source.next_row().expect("pull").is_none());
        assert!(source.next_row().expect("pull").is_none());
    }

    #[test]
    fn to_json_renders_bindings_as_object() {
        let row: Row = [("x", Value::from("a")), ("n", Value::Null)]
            .into_iter()
            .collect();

        assert_eq!(row.to_json(), serde_json::json!({"x": "a", "n": null}));
    }
}
