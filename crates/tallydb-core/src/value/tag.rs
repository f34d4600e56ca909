use crate::value::Value;

///
/// ValueTag
///
/// Stable canonical value-variant tag used by hashing and ordering surfaces.
///
/// IMPORTANT:
/// Tag order is the cross-type ordering of values and feeds stable group-key
/// hashes. Changing it reorders grouped output and invalidates hash vectors.
///
#[repr(u8)]
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ValueTag {
    Null = 1,
    Bool = 2,
    Number = 3,
    Text = 4,
    List = 5,
    Object = 6,
}

impl ValueTag {
    /// Stable wire/hash byte tag for this variant.
    #[must_use]
    pub const fn to_u8(self) -> u8 {
        self as u8
    }

    /// Stable human-readable value kind label for diagnostics.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool => "bool",
            Self::Number => "number",
            Self::Text => "string",
            Self::List => "array",
            Self::Object => "object",
        }
    }
}

/// Resolve the canonical tag for one value.
#[must_use]
pub const fn canonical_tag(value: &Value) -> ValueTag {
    match value {
        Value::Null => ValueTag::Null,
        Value::Bool(_) => ValueTag::Bool,
        Value::Number(_) => ValueTag::Number,
        Value::Text(_) => ValueTag::Text,
        Value::List(_) => ValueTag::List,
        Value::Object(_) => ValueTag::Object,
    }
}
