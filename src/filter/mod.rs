//! Per-bucket membership summaries.
//!
//! A filter answers "has any value with this hash been admitted to this
//! bucket?" cheaply and conservatively: it may say yes when the answer is
//! no (a false positive), but it must never say no when the answer is yes
//! (no false negatives on inserted hashes). Neither implementation supports
//! removal, since map entries are never deleted (only replaced).

mod cheap;
mod range;

pub use self::cheap::CheapFilter;
pub use self::range::RangeFilter;

/// Common contract for the two bucket filter implementations.
///
/// `has(h) == false` must imply the hash has never been admitted via
/// `update`/`set`. The converse is not required.
pub trait BucketFilter: Send + Sync {
    /// Record that `hash` has been admitted to the owning bucket.
    fn set(&self, hash: u64);

    /// Does the filter admit `hash` as possibly present?
    fn has(&self, hash: u64) -> bool;
}

/// Which filter implementation a container should build per bucket.
///
/// See spec.md §4.2 / SPEC_FULL.md Open Question #3: both are sound, the
/// difference is false-positive rate versus memory and update cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Two-bit bloom filter over a packed bit array. The default: bounded
    /// false-positive rate, good for densely populated buckets.
    Cheap,
    /// A `(min, max)` interval. Cheapest possible summary; best suited to
    /// sparsely populated buckets with well-spread hashes.
    Range,
}

impl Default for FilterKind {
    fn default() -> Self {
        FilterKind::Cheap
    }
}

/// A filter chosen at bucket-construction time, dispatched without the cost
/// of a trait object (buckets are hot-path, and the kind is fixed for the
/// lifetime of a container).
pub enum Filter {
    Cheap(CheapFilter),
    Range(RangeFilter),
}

impl Filter {
    pub fn new(kind: FilterKind, bucket_capacity: u64) -> Filter {
        match kind {
            FilterKind::Cheap => Filter::Cheap(CheapFilter::new(bucket_capacity)),
            FilterKind::Range => Filter::Range(RangeFilter::new()),
        }
    }
}

impl BucketFilter for Filter {
    #[inline]
    fn set(&self, hash: u64) {
        match self {
            Filter::Cheap(f) => f.set(hash),
            Filter::Range(f) => f.set(hash),
        }
    }

    #[inline]
    fn has(&self, hash: u64) -> bool {
        match self {
            Filter::Cheap(f) => f.has(hash),
            Filter::Range(f) => f.has(hash),
        }
    }
}
