//! Key hashing.
//!
//! Grounded on `examples/original_source/pkg/hash/hasher.go`'s
//! `Hasher[T]` interface (`Hash(item T) uint64`) and `hasher.go`'s
//! `IntegerHasher`/`StringHasher` adapters, generalized to a trait over
//! `std::hash::Hash` rather than the original's byte-serialize-then-digest
//! approach, since Rust's `Hash` trait already gives every key type a
//! structural hashing hook.

use std::hash::{BuildHasher, Hash, Hasher as StdHasherTrait};

/// Produces the 64-bit hash a [`crate::map::CHashMap`]/[`crate::set::CHashSet`]
/// uses to place a key. Implementors need not be cryptographic; they must
/// be deterministic for equal keys within one container's lifetime.
pub trait Hasher<T: ?Sized>: Send + Sync {
    fn hash(&self, item: &T) -> u64;
}

/// Adapts any `std::hash::BuildHasher` (e.g. the standard library's
/// `RandomState`, or a fixed-seed hasher) into a [`Hasher`] for any
/// `T: Hash`.
pub struct StdHasher<S> {
    build: S,
}

impl<S: BuildHasher> StdHasher<S> {
    pub fn new(build: S) -> StdHasher<S> {
        StdHasher { build }
    }
}

impl<S: BuildHasher + Send + Sync, T: Hash + ?Sized> Hasher<T> for StdHasher<S> {
    fn hash(&self, item: &T) -> u64 {
        let mut state = self.build.build_hasher();
        item.hash(&mut state);
        state.finish()
    }
}

/// Hashes `u64` keys to themselves. Useful when keys are already
/// well-distributed integers (e.g. pre-hashed IDs) and a second hashing
/// pass would be wasted work.
#[derive(Default)]
pub struct IdentityHasher;

impl Hasher<u64> for IdentityHasher {
    #[inline]
    fn hash(&self, item: &u64) -> u64 {
        *item
    }
}

/// The container's default: [`seahash`], already a direct dependency via
/// [`crate::filter::cheap::CheapFilter`]'s sibling use in the original, and
/// a fast, well-distributed non-cryptographic hash.
#[derive(Default)]
pub struct SeaHasher;

impl<T: Hash + ?Sized> Hasher<T> for SeaHasher {
    fn hash(&self, item: &T) -> u64 {
        let mut state = seahash::SeaHasher::default();
        item.hash(&mut state);
        state.finish()
    }
}
