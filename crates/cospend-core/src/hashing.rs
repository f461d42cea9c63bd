//! Hash maps keyed by address bytes.
//!
//! Addresses are already high-entropy script bytes, so a fast non-cryptographic
//! hasher is sufficient for the index.

use std::collections::{HashMap, HashSet};
use xxhash_rust::xxh3::Xxh3Builder;

/// `HashMap` using XXH3.
pub type FastHashMap<K, V> = HashMap<K, V, Xxh3Builder>;

/// `HashSet` using XXH3.
pub type FastHashSet<T> = HashSet<T, Xxh3Builder>;

/// Create an XXH3 hash map with room for `capacity` entries.
#[must_use]
pub fn fast_map_with_capacity<K, V>(capacity: usize) -> FastHashMap<K, V> {
    HashMap::with_capacity_and_hasher(capacity, Xxh3Builder::new())
}

/// Create an empty XXH3 hash set.
#[must_use]
pub fn fast_set<T>() -> FastHashSet<T> {
    HashSet::with_hasher(Xxh3Builder::new())
}
