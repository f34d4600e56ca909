mod compare;
mod hash;
mod rank;
mod tag;


use crate::types::Float64;
use serde::{Deserialize, Serialize, ser::SerializeMap};
use std::{
    cmp::Ordering,
    fmt,
    hash::{Hash, Hasher},
};

// re-exports
pub use compare::canonical_cmp;
pub use hash::hash_value;
pub(crate) use hash::VALUE_HASH_SEED;
pub use tag::ValueTag;

///
/// CONSTANTS
///

/// Largest integral magnitude an f64 represents exactly.
const F64_SAFE_I64: i64 = 1i64 << 53;

///
/// Value
///
/// Dynamically-typed document value flowing through a query pipeline.
///
/// Null    → absent or explicit null.
/// Number  → finite f64; NaN and infinities are not representable.
/// Object  → attribute list in insertion order; keys are unique.
///
/// Equality, ordering, and hashing are all canonical and deep: they go through
/// `canonical_cmp` and `hash_value`, never through per-call-site comparisons.
///

#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(Float64),
    Text(String),
    List(Vec<Self>),
    Object(Vec<(String, Self)>),
}

impl Value {
    ///
    /// CONSTRUCTION
    ///

    /// Build a number value, mapping non-finite input to `Null`.
    #[must_use]
    pub fn from_f64(value: f64) -> Self {
        Float64::try_new(value).map_or(Self::Null, Self::Number)
    }

    /// Build an object from attribute pairs.
    ///
    /// A repeated key replaces the earlier value in place, so the first
    /// insertion position is kept.
    #[must_use]
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Self)>,
    {
        let mut normalized: Vec<(String, Self)> = Vec::new();
        for (key, value) in entries {
            let key = key.into();
            if let Some(slot) = normalized.iter_mut().find(|(existing, _)| *existing == key) {
                slot.1 = value;
            } else {
                normalized.push((key, value));
            }
        }

        Self::Object(normalized)
    }

    /// Convert a JSON document into a value.
    #[must_use]
    pub fn from_json(json: &serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Self::Null, Self::from_f64),
            serde_json::Value::String(s) => Self::Text(s.clone()),
            serde_json::Value::Array(items) => Self::List(items.iter().map(Self::from_json).collect()),
            serde_json::Value::Object(map) => Self::Object(
                map.iter()
                    .map(|(key, value)| (key.clone(), Self::from_json(value)))
                    .collect(),
            ),
        }
    }

    /// Render this value as a JSON document.
    ///
    /// Integral numbers inside the exact-f64 range render as JSON integers.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Null => serde_json::Value::Null,
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Number(n) => number_to_json(n.get()),
            Self::Text(s) => serde_json::Value::String(s.clone()),
            Self::List(items) => serde_json::Value::Array(items.iter().map(Self::to_json).collect()),
            Self::Object(entries) => serde_json::Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect(),
            ),
        }
    }

    ///
    /// TYPES
    ///

    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Return the canonical tag for this value.
    #[must_use]
    pub const fn canonical_tag(&self) -> ValueTag {
        tag::canonical_tag(self)
    }

    /// Return the cross-type ordering rank for this value.
    #[must_use]
    pub const fn canonical_rank(&self) -> u8 {
        rank::canonical_rank(self)
    }

    /// Stable label for diagnostics (`null`, `bool`, `number`, ...).
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        self.canonical_tag().label()
    }

    /// Truthiness used by logical operators and the ternary operator.
    #[must_use]
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => n.get() != 0.0,
            Self::Text(s) => !s.is_empty(),
            Self::List(_) | Self::Object(_) => true,
        }
    }

    ///
    /// ACCESSORS
    ///

    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(n.get()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    /// Look up one attribute of an object value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Self> {
        match self {
            Self::Object(entries) => entries
                .iter()
                .find(|(existing, _)| existing == key)
                .map(|(_, value)| value),
            _ => None,
        }
    }

    ///
    /// COMPARISON
    ///

    /// Total canonical comparator (see `compare::canonical_cmp`).
    #[must_use]
    pub fn canonical_cmp(left: &Self, right: &Self) -> Ordering {
        compare::canonical_cmp(left, right)
    }

    /// Conservative heap + inline size estimate used by grouped budgets.
    #[must_use]
    pub fn estimated_bytes(&self) -> u64 {
        let inline = size_of::<Self>() as u64;
        let heap = match self {
            Self::Null | Self::Bool(_) | Self::Number(_) => 0,
            Self::Text(s) => s.len() as u64,
            Self::List(items) => items.iter().map(Self::estimated_bytes).sum(),
            Self::Object(entries) => entries
                .iter()
                .map(|(key, value)| {
                    (size_of::<String>() as u64)
                        .saturating_add(key.len() as u64)
                        .saturating_add(value.estimated_bytes())
                })
                .sum(),
        };

        inline.saturating_add(heap)
    }
}

#[expect(clippy::cast_possible_truncation)]
#[expect(clippy::cast_precision_loss)]
fn number_to_json(n: f64) -> serde_json::Value {
    let safe = F64_SAFE_I64 as f64;
    if n.fract() == 0.0 && n.abs() <= safe {
        return serde_json::Value::from(n as i64);
    }

    serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        compare::canonical_cmp(self, other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        compare::canonical_cmp(self, other)
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(&hash::hash_value(self));
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => n.serialize(serializer),
            Self::Text(s) => serializer.serialize_str(s),
            Self::List(items) => items.serialize(serializer),
            Self::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let json = serde_json::Value::deserialize(deserializer)?;
        Ok(Self::from_json(&json))
    }
}

///
/// CONVERSIONS
///

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(Float64::from(value))
    }
}

impl From<i64> for Value {
    #[expect(clippy::cast_precision_loss)]
    fn from(value: i64) -> Self {
        Self::from_f64(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Vec<Self>> for Value {
    fn from(value: Vec<Self>) -> Self {
        Self::List(value)
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        Self::from_json(&value)
    }
}
