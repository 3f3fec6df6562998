//! The public concurrent set.
//!
//! Grounded on `examples/original_source/sets/growable.go`'s `GrowableSet[T]`
//! (`GetOrAdd`/`UpdateOrAdd`/`Find`/`Read`), with `T` doing double duty as
//! both key and value in the shared [`Entry`] shape (spec.md §9 design
//! notes: one entry type for both map and set).

use std::fmt;
use std::sync::Arc;

use crate::container::ShardedContainer;
use crate::entry::Entry;
use crate::error::ConstructionError;
use crate::hasher::{Hasher, SeaHasher};
use crate::options::ContainerOptions;

/// A concurrent, hash-sharded set of `T`.
pub struct CHashSet<T> {
    container: ShardedContainer<T, ()>,
    hasher: Arc<dyn Hasher<T>>,
}

impl<T> CHashSet<T>
where
    T: Default + PartialEq + Clone + std::hash::Hash + Send + Sync + 'static,
{
    /// Build a set sized for roughly `capacity` entries, using default
    /// options and a [`SeaHasher`]. See [`crate::map::CHashMap::new`] for
    /// why the default hasher lives here rather than in
    /// [`ContainerOptions::build`].
    pub fn new(capacity: u64) -> CHashSet<T> {
        let opts = ContainerOptions::new().with_hasher(Arc::new(SeaHasher));
        CHashSet::try_new(capacity, opts).expect("default options with an explicit hasher are valid")
    }

    pub fn try_new(
        capacity: u64,
        opts: ContainerOptions<T>,
    ) -> Result<CHashSet<T>, ConstructionError> {
        let built = opts.build(capacity)?;
        let container = ShardedContainer::new(
            built.bucket_amount,
            built.bucket_capacity,
            built.filter_kind,
            built.lock_pool,
            built.logger,
        );

        Ok(CHashSet {
            container,
            hasher: built.hasher,
        })
    }

    /// Is `item` a member? Checked via full-entry equality (spec.md §4.3:
    /// hash, key, *and* value), not just key, matching the set-specific
    /// equality contract `FixedBucket::get`'s doc comment calls out.
    pub fn contains(&self, item: &T) -> bool {
        let h = self.hasher.hash(item);
        self.container.contains_exact(h, item, &())
    }

    /// Add `item` if absent. Returns `true` iff it was newly added.
    pub fn add(&self, item: T) -> bool {
        let h = self.hasher.hash(&item);
        self.container
            .update_or_add(Entry::new(h, item, ()))
    }

    /// Return the member equal to `item` if present, otherwise insert and
    /// return `item`. Second element of the tuple is `true` iff inserted.
    pub fn get_or_add(&self, item: T) -> (T, bool) {
        let h = self.hasher.hash(&item);
        let (entry, added) = self.container.get_or_add(Entry::new(h, item, ()));
        (entry.into_key_value().0, added)
    }

    pub fn range<F: FnMut(T) -> bool>(&self, mut yield_fn: F) {
        self.container.range(|entry| yield_fn(entry.into_key_value().0));
    }

    /// A single-pass, pull-style sequence over every currently-stored
    /// member — spec.md §6's `read() -> lazy sequence`, grounded on
    /// `sets/growable.go:183`'s `Read() iter.Seq[T]`. See
    /// [`crate::map::CHashMap::read`] for why this collects into a `Vec`
    /// rather than streaming under a held lock.
    pub fn read(&self) -> std::vec::IntoIter<T> {
        let mut out = Vec::new();
        self.container.range(|entry| {
            out.push(entry.into_key_value().0);
            true
        });
        out.into_iter()
    }

    pub fn range_parallel<F: Fn(T) -> bool + Send + Sync>(&self, visit: F) {
        self.container
            .range_parallel(|entry| visit(entry.into_key_value().0));
    }

    pub fn append<I: IntoIterator<Item = T>>(&self, other: I) {
        for item in other {
            self.add(item);
        }
    }

    pub fn len(&self) -> usize {
        self.container.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.container.shard_count()
    }

    pub fn buckets(&self) -> u64 {
        self.container.bucket_capacity()
    }

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

impl<T> fmt::Debug for CHashSet<T>
where
    T: Default + PartialEq + Clone + Send + Sync + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CHashSet {{ shards: {}, bucket_capacity: {}, len: {} }}",
            self.container.shard_count(),
            self.container.bucket_capacity(),
            self.len()
        )
    }
}
