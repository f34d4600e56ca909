use crate::{
    db::executor::group::hash::{StableHash, stable_hash_values},
    value::Value,
};
use std::cmp::Ordering;

///
/// GroupKey
///
/// Evaluated grouping-expression tuple plus its precomputed stable hash.
/// Equality and ordering are the canonical deep value semantics; the hash only
/// selects a bucket.
///

#[derive(Clone, Debug)]
pub(in crate::db) struct GroupKey {
    values: Vec<Value>,
    hash: StableHash,
}

impl GroupKey {
    #[must_use]
    pub(in crate::db) fn new(values: Vec<Value>) -> Self {
        let hash = stable_hash_values(&values);

        Self { values, hash }
    }

    /// Key of the single group formed when a clause has no group expressions.
    #[must_use]
    pub(in crate::db) fn empty() -> Self {
        Self::new(Vec::new())
    }

    #[must_use]
    pub(in crate::db) const fn hash(&self) -> StableHash {
        self.hash
    }

    #[must_use]
    pub(in crate::db) const fn values(&self) -> &[Value] {
        self.values.as_slice()
    }

    #[must_use]
    pub(in crate::db) fn into_values(self) -> Vec<Value> {
        self.values
    }

    #[must_use]
    pub(in crate::db) fn estimated_bytes(&self) -> u64 {
        self.values.iter().map(Value::estimated_bytes).sum()
    }
}

impl PartialEq for GroupKey {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.values == other.values
    }
}

impl Eq for GroupKey {}

impl PartialOrd for GroupKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for GroupKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.values.cmp(&other.values)
    }
}
