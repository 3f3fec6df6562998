//! The single entry type shared by the map and the set.
//!
//! spec.md §9 design notes call out the original's "duplicated
//! HashItem/KeyValue/SetItem shapes across revisions" and mandate a single
//! generic entry type parameterized by `{key-only | key+value}`. Here, the
//! set is simply the degenerate case `Entry<T, ()>` with `T` doing double
//! duty as the discriminant the original calls "value" for sets and "key"
//! for maps — [`crate::set::CHashSet`] is a thin façade that always reads
//! and writes through that shape.

use std::fmt;

use crate::marked;

/// One slot's worth of data: a marked hash plus a key and a value.
///
/// `hash` is always either [`marked::EMPTY`] or a [`marked::mark`]-ed value;
/// constructing an `Entry` directly with an unmarked hash violates the
/// bucket invariants, so the only public constructor takes a raw hash and
/// marks it itself.
#[derive(Clone)]
pub struct Entry<K, V> {
    hash: u64,
    key: K,
    value: V,
}

impl<K, V> Entry<K, V> {
    /// Build an occupied entry from a raw (unmarked) hash.
    pub fn new(raw_hash: u64, key: K, value: V) -> Entry<K, V> {
        Entry {
            hash: marked::mark(raw_hash),
            key,
            value,
        }
    }

    #[inline]
    pub fn hash(&self) -> u64 {
        self.hash
    }

    #[inline]
    pub fn key(&self) -> &K {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &V {
        &self.value
    }

    #[inline]
    pub fn into_value(self) -> V {
        self.value
    }

    #[inline]
    pub fn into_key_value(self) -> (K, V) {
        (self.key, self.value)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        marked::is_empty(self.hash)
    }
}

impl<K: Default, V: Default> Entry<K, V> {
    /// The zero-initialized, vacant slot value.
    pub fn empty() -> Entry<K, V> {
        Entry {
            hash: marked::EMPTY,
            key: K::default(),
            value: V::default(),
        }
    }
}

impl<K: Default, V: Default> Default for Entry<K, V> {
    fn default() -> Self {
        Entry::empty()
    }
}

impl<K: PartialEq, V> Entry<K, V> {
    /// "Same key" per spec.md §3: equal marked hash *and* equal key.
    ///
    /// An empty slot never matches a "same key" query: its hash is
    /// [`marked::EMPTY`], which no occupied entry's hash can equal.
    #[inline]
    pub fn same_key(&self, hash: u64, key: &K) -> bool {
        self.hash == hash && self.key == *key
    }
}

impl<K: PartialEq, V: PartialEq> Entry<K, V> {
    /// Full entry equality (map: same key and same value; set: same
    /// element, since `K` plays the role of the element and `V = ()`).
    #[inline]
    pub fn full_match(&self, hash: u64, key: &K, value: &V) -> bool {
        self.hash == hash && self.key == *key && self.value == *value
    }
}

impl<K: fmt::Debug, V: fmt::Debug> fmt::Debug for Entry<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Entry::Empty")
        } else {
            write!(f, "Entry({:?} => {:?})", self.key, self.value)
        }
    }
}
