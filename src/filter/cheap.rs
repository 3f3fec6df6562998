//! The cheap filter: a two-bit-per-hash Bloom filter.
//!
//! Grounded on `cbloom::Filter` (concurrent, atomic bit array) generalized
//! to the exact two-hash scheme of `examples/original_source/pkg/bloomfilters/cheap.go`:
//! exactly two bit positions are ever touched per hash — one at `h mod
//! amount`, one at `(h xor DIFFUSER) mod amount` — rather than `cbloom`'s
//! configurable number of hash rounds. This trades tunability for a fixed,
//! predictable cost per insert/query, matching the original's design.

use std::sync::atomic::{AtomicU64, Ordering};

use super::BucketFilter;

const ORDERING: Ordering = Ordering::Relaxed;

/// Bits per packed word.
const WORD_BITS: u64 = 64;

/// XORed into the hash to produce the second probed position.
const DIFFUSER: u64 = 0x47b5_481d_befa_4fa4;

/// A concurrent, fixed-size, two-hash Bloom filter sized for one fixed
/// bucket's capacity.
pub struct CheapFilter {
    /// Number of addressable bit positions (`amount` in the original).
    amount: u64,
    /// Packed bits, `ceil(amount / 64) * 2` words (the `* 2` gives the two
    /// hash functions independent headroom, matching the original's sizing).
    words: Vec<AtomicU64>,
}

impl CheapFilter {
    /// Build a filter sized for a bucket holding up to `bucket_capacity`
    /// entries.
    pub fn new(bucket_capacity: u64) -> CheapFilter {
        let amount = bucket_capacity.max(1);
        let mut word_count = (amount / WORD_BITS).max(1) * 2;
        if amount % WORD_BITS != 0 {
            word_count += 1;
        }

        CheapFilter {
            amount,
            words: (0..word_count).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn index(&self, hash: u64) -> (usize, u32) {
        let bit_index = hash % self.amount;
        let word = (bit_index / WORD_BITS) as usize;
        let bit = (bit_index % WORD_BITS) as u32;
        (word, bit)
    }

    fn set_one(&self, hash: u64) {
        let (word, bit) = self.index(hash);
        self.words[word].fetch_or(1 << bit, ORDERING);
    }

    fn has_one(&self, hash: u64) -> bool {
        let (word, bit) = self.index(hash);
        let mask = 1 << bit;
        self.words[word].load(ORDERING) & mask == mask
    }
}

impl BucketFilter for CheapFilter {
    fn set(&self, hash: u64) {
        self.set_one(hash);
        self.set_one(hash ^ DIFFUSER);
    }

    fn has(&self, hash: u64) -> bool {
        self.has_one(hash) && self.has_one(hash ^ DIFFUSER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_rejects_everything() {
        let f = CheapFilter::new(16);
        for h in 0..100 {
            assert!(!f.has(h));
        }
    }

    #[test]
    fn set_then_has() {
        let f = CheapFilter::new(16);
        f.set(3);
        f.set(5);
        f.set(7);
        assert!(f.has(3));
        assert!(f.has(5));
        assert!(f.has(7));
    }

    #[test]
    fn concurrent_inserts_are_sound() {
        use std::sync::Arc;
        use std::thread;

        let f = Arc::new(CheapFilter::new(2048));
        let mut joins = Vec::new();
        for t in 0..8u64 {
            let f = f.clone();
            joins.push(thread::spawn(move || {
                for i in t * 100..(t + 1) * 100 {
                    f.set(i);
                }
            }));
        }
        for j in joins {
            j.join().unwrap();
        }
        for i in 0..800 {
            assert!(f.has(i), "hash {i} should be admitted");
        }
    }
}
