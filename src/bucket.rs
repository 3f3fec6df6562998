//! The fixed, open-addressed bucket — the innermost tier of the container.
//!
//! Grounded on `chashmap::Table`'s `scan`/`scan_mut`/`lookup_or_free`
//! family (bucket-level `parking_lot::RwLock`, linear probing with
//! wraparound, "first empty-or-matching slot wins"), generalized to the
//! marked-hash empty encoding from spec.md §4.1 (rather than chashmap's
//! three-way `Contains`/`Empty`/`Removed` enum — this container never
//! removes map entries, so there is no "tombstone" state to encode) and
//! fronted by a per-bucket [`crate::filter::Filter`] as in
//! `examples/original_source/sets/fixed.go`.

use parking_lot::RwLock;

use crate::entry::Entry;
use crate::filter::{BucketFilter, Filter, FilterKind};

/// A fixed-capacity, open-addressed slot table, guarded by a single
/// reader/writer lock, with a membership filter used to short-circuit
/// misses before taking the lock.
pub struct FixedBucket<K, V> {
    capacity: u64,
    filter: Filter,
    slots: RwLock<Vec<Entry<K, V>>>,
}

impl<K: Default + PartialEq + Clone, V: Default + Clone> FixedBucket<K, V> {
    /// Build a bucket with `capacity` slots (must be >= 2, enforced by the
    /// owning chain/container at construction).
    pub fn new(capacity: u64, filter_kind: FilterKind) -> FixedBucket<K, V> {
        debug_assert!(capacity >= 2, "fixed bucket capacity must be >= 2");
        let mut slots = Vec::with_capacity(capacity as usize);
        slots.resize_with(capacity as usize, Entry::empty);

        FixedBucket {
            capacity,
            filter: Filter::new(filter_kind, capacity),
            slots: RwLock::new(slots),
        }
    }

    #[inline]
    fn start_index(&self, hash: u64) -> usize {
        (hash % self.capacity) as usize
    }

    /// Cheap, lock-free check of whether this bucket might contain `hash`.
    /// `false` is a sound "definitely not"; `true` requires the caller to
    /// actually scan (via [`get`]/[`update`]) to be sure.
    #[inline]
    pub fn might_contain(&self, hash: u64) -> bool {
        self.filter.has(hash)
    }

    /// Look up an entry by marked hash and key.
    ///
    /// Short-circuits on the filter before acquiring the read lock.
    pub fn get(&self, hash: u64, key: &K) -> Option<Entry<K, V>> {
        if !self.filter.has(hash) {
            return None;
        }

        let slots = self.slots.read();
        let start = self.start_index(hash);
        let cap = slots.len();

        for offset in 0..cap {
            let idx = (start + offset) % cap;
            let slot = &slots[idx];
            if slot.is_empty() {
                // The cluster ends at the first empty slot: nothing further
                // in probe order can be `key`, since `set` always places at
                // the first empty-or-matching slot it finds.
                return None;
            }
            if slot.same_key(hash, key) {
                return Some(slot.clone());
            }
        }

        None
    }

    /// Place `entry` in the first empty-or-matching-key slot encountered
    /// while probing from `entry.hash() mod capacity`.
    ///
    /// Returns `true` if the entry was placed, `false` if the bucket is
    /// full and holds no slot matching `entry`'s key (the caller must
    /// append a new bucket and retry there).
    pub fn set(&self, entry: Entry<K, V>) -> bool {
        let hash = entry.hash();
        let mut slots = self.slots.write();
        let start = self.start_index(hash);
        let cap = slots.len();

        for offset in 0..cap {
            let idx = (start + offset) % cap;
            let is_target = {
                let slot = &slots[idx];
                slot.is_empty() || slot.same_key(hash, entry.key())
            };
            if is_target {
                slots[idx] = entry;
                drop(slots);
                self.filter.set(hash);
                return true;
            }
        }

        false
    }

    /// Replace the value of an existing matching-key slot. Does not insert.
    ///
    /// Short-circuits on the filter: if the filter doesn't admit `hash`, no
    /// slot can match, so no lock is taken.
    pub fn update(&self, entry: Entry<K, V>) -> bool {
        let hash = entry.hash();
        if !self.filter.has(hash) {
            return false;
        }

        let mut slots = self.slots.write();
        let start = self.start_index(hash);
        let cap = slots.len();

        for offset in 0..cap {
            let idx = (start + offset) % cap;
            let slot = &slots[idx];
            if slot.is_empty() {
                return false;
            }
            if slot.same_key(hash, entry.key()) {
                slots[idx] = entry;
                return true;
            }
        }

        false
    }

    /// Full-entry membership check: same marked hash, key, *and* value
    /// (spec.md §4.3 Equality: "A full entry match additionally requires
    /// value equality (used only for set semantics)"). Distinct from
    /// [`get`](Self::get)/[`update`](Self::update), which match on key
    /// alone — this is the path a set's membership test uses, where the
    /// stored "value" is the element itself rather than a dummy payload.
    pub fn contains_exact(&self, hash: u64, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        if !self.filter.has(hash) {
            return false;
        }

        let slots = self.slots.read();
        let start = self.start_index(hash);
        let cap = slots.len();

        for offset in 0..cap {
            let idx = (start + offset) % cap;
            let slot = &slots[idx];
            if slot.is_empty() {
                return false;
            }
            if slot.full_match(hash, key, value) {
                return true;
            }
        }

        false
    }

    /// A value-copy snapshot of every occupied slot, in storage order.
    pub fn snapshot(&self) -> Vec<Entry<K, V>> {
        let slots = self.slots.read();
        slots.iter().filter(|e| !e.is_empty()).cloned().collect()
    }

    /// Number of slots (occupied or not).
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Number of occupied slots. Linear in capacity; intended for
    /// diagnostics (see [`crate::map::CHashMap`]'s `Debug` impl), not a hot
    /// path.
    pub fn len(&self) -> usize {
        self.slots.read().iter().filter(|e| !e.is_empty()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marked;

    fn bucket() -> FixedBucket<u64, u64> {
        FixedBucket::new(4, FilterKind::Cheap)
    }

    #[test]
    fn insert_and_get() {
        let b = bucket();
        assert!(b.set(Entry::new(1, 1u64, 100u64)));
        let got = b.get(marked::mark(1), &1u64).unwrap();
        assert_eq!(*got.value(), 100u64);
    }

    #[test]
    fn miss_returns_none() {
        let b = bucket();
        assert!(b.get(marked::mark(1), &1u64).is_none());
    }

    #[test]
    fn update_replaces_value() {
        let b = bucket();
        assert!(b.set(Entry::new(1, 1u64, 100u64)));
        assert!(b.update(Entry::new(1, 1u64, 200u64)));
        assert_eq!(*b.get(marked::mark(1), &1u64).unwrap().value(), 200u64);
    }

    #[test]
    fn update_on_missing_key_fails() {
        let b = bucket();
        assert!(!b.update(Entry::new(1, 1u64, 200u64)));
    }

    #[test]
    fn capacity_two_boundary() {
        let b: FixedBucket<u64, u64> = FixedBucket::new(2, FilterKind::Cheap);
        assert!(b.set(Entry::new(0, 0u64, 0u64)));
        assert!(b.set(Entry::new(1, 1u64, 1u64)));
        // Both distinct-hash slots are now full; a third distinct key fails.
        assert!(!b.set(Entry::new(2, 2u64, 2u64)));
        // But re-setting an existing key still succeeds (it's a match, not
        // an insert).
        assert!(b.set(Entry::new(0, 0u64, 42u64)));
        assert_eq!(*b.get(marked::mark(0), &0u64).unwrap().value(), 42u64);
    }

    #[test]
    fn linear_probing_on_collision() {
        // Two distinct keys whose raw hashes collide modulo capacity.
        let b: FixedBucket<u64, u64> = FixedBucket::new(4, FilterKind::Cheap);
        assert!(b.set(Entry::new(0, 1u64, 11u64)));
        assert!(b.set(Entry::new(4, 2u64, 22u64))); // 4 % 4 == 0, collides
        assert_eq!(*b.get(marked::mark(0), &1u64).unwrap().value(), 11u64);
        assert_eq!(*b.get(marked::mark(4), &2u64).unwrap().value(), 22u64);
    }

    #[test]
    fn contains_exact_requires_value_match_too() {
        let b = bucket();
        b.set(Entry::new(1, 1u64, 100u64));
        assert!(b.contains_exact(marked::mark(1), &1u64, &100u64));
        assert!(!b.contains_exact(marked::mark(1), &1u64, &999u64));
        assert!(!b.contains_exact(marked::mark(2), &2u64, &100u64));
    }

    #[test]
    fn snapshot_skips_empty_slots() {
        let b = bucket();
        b.set(Entry::new(1, 1u64, 10u64));
        b.set(Entry::new(2, 2u64, 20u64));
        let mut snap: Vec<_> = b.snapshot().iter().map(|e| *e.value()).collect();
        snap.sort();
        assert_eq!(snap, vec![10, 20]);
    }
}
