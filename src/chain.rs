//! The growable chain — an append-only list of fixed buckets for one shard.
//!
//! Grounded on `examples/original_source/maps/growable.go` (`GrowableMap`):
//! a list-level `RwLock` over `Vec<FixedBucket>` plus a shared striped lock
//! pool for entry-level critical sections. The mandated lock order from
//! spec.md §4.4 is stripe -> list -> bucket; this type takes the stripe
//! lock in `get_or_add`/`update_or_add` and the list lock internally, and
//! never holds a bucket lock across another lock acquisition (bucket locks
//! are leaves, taken and released entirely inside [`FixedBucket`]'s own
//! methods).

use std::sync::Arc;

use parking_lot::RwLock;

use crate::bucket::FixedBucket;
use crate::entry::Entry;
use crate::filter::FilterKind;
use crate::lock_pool::StripedLockPool;

/// One shard's storage: a growable list of fixed-capacity buckets.
pub struct GrowableChain<K, V> {
    bucket_capacity: u64,
    filter_kind: FilterKind,
    lock_pool: Arc<StripedLockPool>,
    buckets: RwLock<Vec<FixedBucket<K, V>>>,
}

impl<K: Default + PartialEq + Clone, V: Default + Clone> GrowableChain<K, V> {
    pub fn new(
        bucket_capacity: u64,
        filter_kind: FilterKind,
        lock_pool: Arc<StripedLockPool>,
    ) -> GrowableChain<K, V> {
        GrowableChain {
            bucket_capacity,
            filter_kind,
            lock_pool,
            buckets: RwLock::new(Vec::new()),
        }
    }

    /// Look an entry up by marked hash and key, without taking the stripe
    /// lock (reads never need to serialize against other reads, and a
    /// racing write is resolved by the stripe lock on the writer's side).
    pub fn find(&self, hash: u64, key: &K) -> Option<Entry<K, V>> {
        let buckets = self.buckets.read();
        for bucket in buckets.iter() {
            if !bucket.might_contain(hash) {
                continue;
            }
            if let Some(entry) = bucket.get(hash, key) {
                return Some(entry);
            }
        }
        None
    }

    /// Place `entry` into the bucket list: try the most recently appended
    /// bucket first, then keep appending fresh buckets until one accepts
    /// it. Terminates because a fresh bucket always has an empty slot at
    /// `hash mod capacity`.
    fn place(&self, entry: Entry<K, V>) {
        let mut buckets = self.buckets.write();

        if let Some(last) = buckets.last() {
            if last.set(entry.clone()) {
                return;
            }
        }

        loop {
            let fresh = FixedBucket::new(self.bucket_capacity, self.filter_kind);
            let accepted = fresh.set(entry.clone());
            buckets.push(fresh);
            if accepted {
                return;
            }
        }
    }

    /// Return the existing entry for `entry`'s key if present, otherwise
    /// insert `entry` and return it. The second element of the tuple is
    /// `true` iff insertion happened.
    pub fn get_or_add(&self, entry: Entry<K, V>) -> (Entry<K, V>, bool) {
        let _stripe = self.lock_pool.lock(entry.hash());

        if let Some(existing) = self.find(entry.hash(), entry.key()) {
            return (existing, false);
        }

        self.place(entry.clone());
        (entry, true)
    }

    /// Replace the value for `entry`'s key if present, otherwise insert it.
    /// Returns `true` iff a new slot was occupied (spec.md §9 Open
    /// Question #2: `added`, never "added-or-updated").
    pub fn update_or_add(&self, entry: Entry<K, V>) -> bool {
        let _stripe = self.lock_pool.lock(entry.hash());

        if self.update_if_present(entry.clone()) {
            return false;
        }

        self.place(entry);
        true
    }

    fn update_if_present(&self, entry: Entry<K, V>) -> bool {
        let buckets = self.buckets.read();
        for bucket in buckets.iter() {
            if !bucket.might_contain(entry.hash()) {
                continue;
            }
            if bucket.update(entry.clone()) {
                return true;
            }
        }
        false
    }

    /// Full-entry ("same hash, key, *and* value") membership check across
    /// every bucket, without taking the stripe lock (a pure read, same
    /// rationale as [`find`](Self::find)). See
    /// [`FixedBucket::contains_exact`].
    pub fn contains_exact(&self, hash: u64, key: &K, value: &V) -> bool
    where
        V: PartialEq,
    {
        let buckets = self.buckets.read();
        for bucket in buckets.iter() {
            if !bucket.might_contain(hash) {
                continue;
            }
            if bucket.contains_exact(hash, key, value) {
                return true;
            }
        }
        false
    }

    /// Walk every occupied entry across every bucket, in storage order,
    /// stopping early if `yield_fn` returns `false`. Returns `false` iff it
    /// was stopped early.
    pub fn range<F: FnMut(Entry<K, V>) -> bool>(&self, mut yield_fn: F) -> bool {
        let buckets = self.buckets.read();
        for bucket in buckets.iter() {
            for entry in bucket.snapshot() {
                if !yield_fn(entry) {
                    return false;
                }
            }
        }
        true
    }

    /// Number of buckets currently in the chain.
    pub fn bucket_count(&self) -> usize {
        self.buckets.read().len()
    }

    /// Total occupied slots across all buckets (diagnostics only).
    pub fn len(&self) -> usize {
        self.buckets.read().iter().map(FixedBucket::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marked;

    fn chain() -> GrowableChain<u64, u64> {
        GrowableChain::new(2, FilterKind::Cheap, StripedLockPool::new(4))
    }

    #[test]
    fn get_or_add_inserts_once() {
        let c = chain();
        let e = Entry::new(1, 1u64, 100u64);
        let (v1, added1) = c.get_or_add(e.clone());
        assert!(added1);
        assert_eq!(*v1.value(), 100u64);

        let (v2, added2) = c.get_or_add(Entry::new(1, 1u64, 999u64));
        assert!(!added2);
        assert_eq!(*v2.value(), 100u64); // existing value wins, not 999
    }

    #[test]
    fn update_or_add_replaces_existing() {
        let c = chain();
        assert!(c.update_or_add(Entry::new(1, 1u64, 100u64)));
        assert!(!c.update_or_add(Entry::new(1, 1u64, 200u64)));
        assert_eq!(*c.find(marked::mark(1), &1u64).unwrap().value(), 200u64);
    }

    #[test]
    fn overflow_grows_bucket_list() {
        let c = chain(); // capacity 2 per bucket
        for i in 0..5u64 {
            // All hashes chosen to land at slot 0 mod 2, forcing overflow.
            assert!(c.update_or_add(Entry::new(i * 2, i, i)));
        }
        assert!(c.bucket_count() >= 3, "expected >= ceil(5/2) = 3 buckets");
        for i in 0..5u64 {
            assert_eq!(*c.find(marked::mark(i * 2), &i).unwrap().value(), i);
        }
    }

    #[test]
    fn no_new_bucket_when_slot_free_in_last() {
        let c = chain();
        assert!(c.update_or_add(Entry::new(0, 0u64, 0u64)));
        assert_eq!(c.bucket_count(), 1);
        assert!(c.update_or_add(Entry::new(1, 1u64, 1u64)));
        assert_eq!(c.bucket_count(), 1, "second slot in first bucket still free");
    }
}
