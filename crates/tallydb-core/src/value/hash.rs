use crate::value::{Value, compare::sorted_entries};
use xxhash_rust::xxh3::Xxh3;

/// Value-hash format version byte used by canonical digest encoding.
pub(crate) const VALUE_HASH_VERSION: u8 = 1;

/// Stable XXH3 seed used by canonical value hashing.
pub(crate) const VALUE_HASH_SEED: u64 = 0;

fn feed_u8(h: &mut Xxh3, x: u8) {
    h.update(&[x]);
}
fn feed_u64(h: &mut Xxh3, x: u64) {
    h.update(&x.to_be_bytes());
}
fn feed_bytes(h: &mut Xxh3, b: &[u8]) {
    h.update(b);
}

// Hash object entries under canonical key order so equal objects hash equally
// even when their attributes were inserted in a different order.
fn write_object_entries_to_hasher(entries: &[(String, Value)], h: &mut Xxh3) {
    let ordered = sorted_entries(entries);

    feed_u64(h, ordered.len() as u64);
    for (key, value) in ordered {
        feed_u8(h, 0xFD);
        feed_u64(h, key.len() as u64);
        feed_bytes(h, key.as_bytes());
        feed_u8(h, 0xFE);
        write_to_hasher(value, h);
    }
}

fn write_to_hasher(value: &Value, h: &mut Xxh3) {
    feed_u8(h, value.canonical_tag().to_u8());

    match value {
        Value::Null => {}
        Value::Bool(b) => feed_u8(h, u8::from(*b)),
        Value::Number(n) => feed_bytes(h, &n.to_be_bytes()),
        Value::Text(s) => {
            feed_u64(h, s.len() as u64);
            feed_bytes(h, s.as_bytes());
        }
        Value::List(items) => {
            feed_u64(h, items.len() as u64);
            for item in items {
                feed_u8(h, 0xFF);
                write_to_hasher(item, h);
            }
        }
        Value::Object(entries) => write_object_entries_to_hasher(entries, h),
    }
}

/// Compute the canonical 128-bit digest for one value.
#[must_use]
pub fn hash_value(value: &Value) -> [u8; 16] {
    let mut h = Xxh3::with_seed(VALUE_HASH_SEED);
    feed_u8(&mut h, VALUE_HASH_VERSION);
    write_to_hasher(value, &mut h);

    h.digest128().to_be_bytes()
}
