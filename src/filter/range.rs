//! The range filter: the cheapest possible per-bucket summary.
//!
//! Grounded on `examples/original_source/pkg/hash/range.go`. Kept as a
//! `(min, max)` pair behind atomics rather than a lock, since reads vastly
//! outnumber the rare case of a `has` racing an in-flight `set` (a stale
//! read here can only ever widen the risk of a false positive, never
//! introduce a false negative, because `set` only ever grows the interval).

use std::sync::atomic::{AtomicU64, Ordering};

use super::BucketFilter;

const ORDERING: Ordering = Ordering::Relaxed;

/// Tracks the smallest and largest hash ever admitted to a bucket.
pub struct RangeFilter {
    min: AtomicU64,
    max: AtomicU64,
}

impl RangeFilter {
    /// A fresh filter that admits nothing: `min = u64::MAX`, `max = 0`, so
    /// `has` is false for any hash until the first `set`.
    pub fn new() -> RangeFilter {
        RangeFilter {
            min: AtomicU64::new(u64::MAX),
            max: AtomicU64::new(0),
        }
    }
}

impl Default for RangeFilter {
    fn default() -> Self {
        RangeFilter::new()
    }
}

impl BucketFilter for RangeFilter {
    fn set(&self, hash: u64) {
        // Widen the interval; never shrinks, so lost updates under races
        // only delay convergence, they never make `has` unsound.
        let mut min = self.min.load(ORDERING);
        while hash < min {
            match self
                .min
                .compare_exchange_weak(min, hash, ORDERING, ORDERING)
            {
                Ok(_) => break,
                Err(observed) => min = observed,
            }
        }

        let mut max = self.max.load(ORDERING);
        while hash > max {
            match self
                .max
                .compare_exchange_weak(max, hash, ORDERING, ORDERING)
            {
                Ok(_) => break,
                Err(observed) => max = observed,
            }
        }
    }

    fn has(&self, hash: u64) -> bool {
        self.min.load(ORDERING) <= hash && hash <= self.max.load(ORDERING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_rejects_everything() {
        let f = RangeFilter::new();
        assert!(!f.has(0));
        assert!(!f.has(u64::MAX));
        assert!(!f.has(42));
    }

    #[test]
    fn widens_on_set() {
        let f = RangeFilter::new();
        f.set(10);
        assert!(f.has(10));
        assert!(!f.has(9));
        assert!(!f.has(11));

        f.set(20);
        assert!(f.has(10));
        assert!(f.has(15)); // false positive, allowed
        assert!(f.has(20));
        assert!(!f.has(21));
    }
}
