//! The public concurrent map.
//!
//! Grounded on `examples/original_source/maps/bucketted.go`'s `Bucketted[K, V]`
//! façade: `Get`/`Set`/`Append`/`AppendParralel`/`Read`/`Keys`/`Values`/
//! `KeyValues`/`Range`/`RangeParralel`/`Grow`, backed here by
//! [`ShardedContainer`] instead of a hand-rolled bucket-index-plus-slice.

use std::fmt;
use std::sync::Arc;

use crate::container::ShardedContainer;
use crate::entry::Entry;
use crate::error::ConstructionError;
use crate::hasher::{Hasher, SeaHasher};
use crate::options::ContainerOptions;

/// A concurrent, hash-sharded map from `K` to `V`.
///
/// Reads and writes to different keys proceed without blocking each other
/// (beyond the shard- and stripe-level serialization described in
/// [`crate::chain`]/[`crate::lock_pool`]); values are cloned on both
/// insertion and retrieval, so no lock is ever held by a caller holding a
/// returned value.
pub struct CHashMap<K, V> {
    container: ShardedContainer<K, V>,
    hasher: Arc<dyn Hasher<K>>,
}

impl<K, V> CHashMap<K, V>
where
    K: Default + PartialEq + Clone + std::hash::Hash + Send + Sync + 'static,
    V: Default + Clone + Send + Sync + 'static,
{
    /// Build a map sized for roughly `capacity` entries, using default
    /// options and a [`SeaHasher`].
    ///
    /// [`ContainerOptions::build`] has no silent hasher default (spec.md
    /// §6/§7: construction must fail if a hasher is absent); this
    /// explicitly-named convenience constructor is where that default
    /// lives instead. Callers who need a different hasher should go
    /// through [`try_new`](Self::try_new) with their own
    /// [`ContainerOptions::with_hasher`].
    pub fn new(capacity: u64) -> CHashMap<K, V> {
        let opts = ContainerOptions::new().with_hasher(Arc::new(SeaHasher));
        CHashMap::try_new(capacity, opts).expect("default options with an explicit hasher are valid")
    }

    /// Build a map from an explicit [`ContainerOptions`] builder.
    pub fn try_new(
        capacity: u64,
        opts: ContainerOptions<K>,
    ) -> Result<CHashMap<K, V>, ConstructionError> {
        let built = opts.build(capacity)?;
        let container = ShardedContainer::new(
            built.bucket_amount,
            built.bucket_capacity,
            built.filter_kind,
            built.lock_pool,
            built.logger,
        );

        Ok(CHashMap {
            container,
            hasher: built.hasher,
        })
    }

    /// Retrieve the value for `key`, if present.
    pub fn get(&self, key: &K) -> Option<V> {
        let h = self.hasher.hash(key);
        self.container.get(h, key).map(Entry::into_value)
    }

    /// Insert or replace the value for `key`. Returns `true` iff a new
    /// slot was occupied (i.e. `key` was not previously present).
    pub fn set(&self, key: K, value: V) -> bool {
        let h = self.hasher.hash(&key);
        self.container.update_or_add(Entry::new(h, key, value))
    }

    /// Retrieve the value for `key`, inserting `default` if absent. Returns
    /// the value that ends up stored (existing or just-inserted) and
    /// whether insertion happened.
    pub fn get_or_insert(&self, key: K, default: V) -> (V, bool) {
        let h = self.hasher.hash(&key);
        let (entry, added) = self.container.get_or_add(Entry::new(h, key, default));
        (entry.into_value(), added)
    }

    /// Sequential traversal over every entry, stopping early if `yield_fn`
    /// returns `false`.
    pub fn range<F: FnMut(K, V) -> bool>(&self, mut yield_fn: F) {
        self.container.range(|entry| {
            let (k, v) = entry.into_key_value();
            yield_fn(k, v)
        });
    }

    /// Parallel traversal, one worker per shard. See
    /// [`ShardedContainer::range_parallel`] for the cancellation contract.
    pub fn range_parallel<F: Fn(K, V) -> bool + Send + Sync>(&self, visit: F) {
        self.container.range_parallel(|entry| {
            let (k, v) = entry.into_key_value();
            visit(k, v)
        });
    }

    /// A single-pass, pull-style sequence over every currently-stored
    /// `(key, value)` pair — the operation spec.md §6 names `read() ->
    /// lazy sequence`, grounded on `maps/bucketted.go`'s `Read() iter.Seq`
    /// (with `Range`/`RangeParralel` implemented as thin wrappers over it
    /// in `pkg/iterators/range.go:15-21`, mirrored here the other way
    /// around: `range`/`range_parallel` stay the hot-path, early-terminating
    /// callback forms, and `read` walks the same shard-then-bucket order
    /// into a plain `Vec`, so the returned iterator never holds a bucket
    /// lock across a `next()` call).
    pub fn read(&self) -> std::vec::IntoIter<(K, V)> {
        let mut out = Vec::new();
        self.container.range(|entry| {
            out.push(entry.into_key_value());
            true
        });
        out.into_iter()
    }

    /// Every currently-stored key, in the same order as [`read`](Self::read).
    pub fn keys(&self) -> std::vec::IntoIter<K> {
        let items: Vec<K> = self.read().map(|(k, _)| k).collect();
        items.into_iter()
    }

    /// Every currently-stored value, in the same order as [`read`](Self::read).
    pub fn values(&self) -> std::vec::IntoIter<V> {
        let items: Vec<V> = self.read().map(|(_, v)| v).collect();
        items.into_iter()
    }

    /// Alias for [`read`](Self::read), matching `maps/bucketted.go`'s
    /// distinct `KeyValues` accessor alongside `Keys`/`Values`.
    pub fn key_values(&self) -> std::vec::IntoIter<(K, V)> {
        self.read()
    }

    /// Insert every entry produced by `other` into this map.
    pub fn append<I: IntoIterator<Item = (K, V)>>(&self, other: I) {
        for (k, v) in other {
            self.set(k, v);
        }
    }

    /// Insert every entry produced by `other` using parallel traversal of
    /// the source container. `other` must itself support parallel
    /// traversal; pass another [`CHashMap`]'s [`CHashMap::range_parallel`]
    /// or any equivalent.
    pub fn append_parallel(&self, other: &CHashMap<K, V>) {
        other.range_parallel(|k, v| {
            self.set(k, v);
            true
        });
    }

    /// Number of entries currently stored. Linear in bucket count; intended
    /// for diagnostics, not a hot path.
    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current shard count.
    pub fn capacity(&self) -> usize {
        self.container.shard_count()
    }

    /// Slots per bucket.
    pub fn buckets(&self) -> u64 {
        self.container.bucket_capacity()
    }

    /// Reshard to hold roughly `new_capacity` entries without a
    /// stop-the-world lock. See [`ShardedContainer::grow`].
    pub fn grow(&self, new_capacity: u64) {
        let new_shard_count = (new_capacity / self.container.bucket_capacity().max(1))
            .max(self.container.shard_count() as u64) as usize;
        if new_shard_count <= self.container.shard_count() {
            return;
        }
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        self.container.grow(new_shard_count, workers);
    }
}

impl<K, V> fmt::Debug for CHashMap<K, V>
where
    K: Default + PartialEq + Clone + Send + Sync + 'static,
    V: Default + Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CHashMap {{ shards: {}, bucket_capacity: {}, len: {} }}",
            self.container.shard_count(),
            self.container.bucket_capacity(),
            self.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_small_map() {
        let m: CHashMap<String, i32> = CHashMap::new(16);
        assert!(m.set("a".to_string(), 1));
        assert!(m.set("b".to_string(), 2));
        assert!(!m.set("a".to_string(), 10)); // update, not insert
        assert_eq!(m.get(&"a".to_string()), Some(10));
        assert_eq!(m.get(&"b".to_string()), Some(2));
        assert_eq!(m.get(&"c".to_string()), None);
    }

    #[test]
    fn reinsert_same_key_updates_value_not_count() {
        let m: CHashMap<u64, u64> = CHashMap::new(16);
        m.set(1, 100);
        let before = m.len();
        m.set(1, 200);
        assert_eq!(m.len(), before);
        assert_eq!(m.get(&1), Some(200));
    }

    #[test]
    fn bucket_overflow_forces_chain_growth() {
        let opts: ContainerOptions<u64> = ContainerOptions::new()
            .with_bucket_amount(1)
            .with_bucket_size(2)
            .with_hasher(Arc::new(SeaHasher));
        let m: CHashMap<u64, u64> = CHashMap::try_new(1, opts).unwrap();
        for i in 0..20u64 {
            m.set(i, i);
        }
        assert_eq!(m.len(), 20);
        for i in 0..20u64 {
            assert_eq!(m.get(&i), Some(i));
        }
    }

    #[test]
    fn parallel_insert_correctness() {
        use std::sync::Arc;
        use std::thread;

        let m = Arc::new(CHashMap::<u64, u64>::new(10_000));
        let mut handles = Vec::new();
        for t in 0..10u64 {
            let m = m.clone();
            handles.push(thread::spawn(move || {
                for i in 0..1000u64 {
                    let key = t * 1000 + i;
                    m.set(key, key * 2);
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(m.len(), 10_000);
        for key in 0..10_000u64 {
            assert_eq!(m.get(&key), Some(key * 2));
        }
    }

    #[test]
    fn grow_preserves_entries_and_keeps_map_usable() {
        let m: CHashMap<u64, u64> = CHashMap::new(100);
        for i in 0..300u64 {
            m.set(i, i);
        }
        let before = m.capacity();
        m.grow(5_000);
        assert!(m.capacity() >= before);
        assert_eq!(m.len(), 300);
        for i in 0..300u64 {
            assert_eq!(m.get(&i), Some(i));
        }
        m.set(300, 300);
        assert_eq!(m.get(&300), Some(300));
    }

    #[test]
    fn read_yields_every_entry_exactly_once() {
        let m: CHashMap<u64, u64> = CHashMap::new(16);
        for i in 0..25u64 {
            m.set(i, i * 3);
        }
        let mut pairs: Vec<(u64, u64)> = m.read().collect();
        pairs.sort();
        assert_eq!(pairs, (0..25u64).map(|i| (i, i * 3)).collect::<Vec<_>>());
    }

    #[test]
    fn keys_and_values_match_read() {
        let m: CHashMap<u64, u64> = CHashMap::new(16);
        m.set(1, 10);
        m.set(2, 20);
        let mut keys: Vec<u64> = m.keys().collect();
        keys.sort();
        assert_eq!(keys, vec![1, 2]);
        let mut values: Vec<u64> = m.values().collect();
        values.sort();
        assert_eq!(values, vec![10, 20]);
    }

    #[test]
    fn get_or_insert_only_inserts_once() {
        let m: CHashMap<u64, u64> = CHashMap::new(16);
        let (v1, added1) = m.get_or_insert(1, 10);
        assert_eq!(v1, 10);
        assert!(added1);
        let (v2, added2) = m.get_or_insert(1, 99);
        assert_eq!(v2, 10);
        assert!(!added2);
    }
}
