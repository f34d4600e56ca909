//! Module: executor::group::hash
//! Responsibility: stable hash derivation for group keys.
//! Does not own: key equality checks or bucket layout.
//! Boundary: hash utilities consumed by group-key materialization.

use crate::value::{VALUE_HASH_SEED, Value, hash_value};
use xxhash_rust::xxh3::Xxh3;

///
/// StableHash
///
/// Fixed-width hash identifier used to bucket group keys.
///

pub(in crate::db) type StableHash = u64;

/// Derive one stable 64-bit hash from a canonical value digest.
#[must_use]
pub(in crate::db) const fn stable_hash_from_digest(digest: [u8; 16]) -> StableHash {
    u64::from_be_bytes([
        digest[0], digest[1], digest[2], digest[3], digest[4], digest[5], digest[6], digest[7],
    ])
}

/// Hash one key tuple; element digests are chained in declaration order.
#[must_use]
pub(in crate::db) fn stable_hash_values(values: &[Value]) -> StableHash {
    let mut h = Xxh3::with_seed(VALUE_HASH_SEED);
    h.update(&(values.len() as u64).to_be_bytes());
    for value in values {
        h.update(&hash_value(value));
    }

    stable_hash_from_digest(h.digest128().to_be_bytes())
}

///
/// TESTS
///
