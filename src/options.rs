//! Container configuration.
//!
//! Grounded on `examples/original_source/maps/options.go`'s `Options`
//! struct and `With*` functional options (`WithBucketSize`,
//! `WithMaxBucketSize`, `WithItemLocks`, `WithCacheTarget`,
//! `WithBucketAmount`, `WithBucketFunction`), reworked as a consuming
//! builder — idiomatic Rust for this shape of configuration, in place of
//! the original's slice-of-closures-applied-to-a-struct pattern.

use std::sync::Arc;

use slog::Logger;

use crate::error::ConstructionError;
use crate::filter::FilterKind;
use crate::hasher::Hasher;
use crate::lock_pool::StripedLockPool;

/// Target cache level to size buckets for, mirroring
/// `examples/original_source/pkg/options/cpu`'s `CacheKind` (consulted via
/// `WithCacheTarget`). A cache-line-sized bucket minimizes cache misses per
/// probe; larger targets trade that for fewer, larger buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTarget {
    L1,
    L2,
    L3,
}

/// Approximate bytes per cache level, used only to pick a bucket slot count
/// when [`ContainerOptions::with_cache_target`] is used instead of an
/// explicit [`ContainerOptions::with_bucket_size`].
impl CacheTarget {
    fn bytes(self) -> u64 {
        match self {
            CacheTarget::L1 => 64,
            CacheTarget::L2 => 256,
            CacheTarget::L3 => 2048,
        }
    }
}

/// Fallback per-entry byte estimate, used only to translate a
/// [`CacheTarget`] into a slot count (this crate has no compile-time
/// access to `Entry<K, V>`'s actual layout at the options layer). Does
/// NOT apply to [`ContainerOptions::with_bucket_size`], which is a direct
/// entry count per spec.md §6 ("bucket_size: entries per fixed bucket"),
/// matching the original's `WithBucketSize(size)` setting `bucket_size`
/// verbatim.
const ESTIMATED_ENTRY_BYTES: u64 = 16;

/// Default minimum number of shards, matching the original's
/// `max(amount, 10)` floor in `Options.BucketAmount`.
const MIN_BUCKET_AMOUNT: u64 = 10;

/// Consuming builder for a map/set container's tuning knobs.
///
/// Every `with_*` method takes and returns `Self` so calls chain:
/// `ContainerOptions::new().with_bucket_size(64).with_filter(FilterKind::Range)`.
pub struct ContainerOptions<K> {
    bucket_size: Option<u64>,
    max_bucket_size: Option<u64>,
    bucket_amount: Option<u64>,
    bucket_amount_fn: Option<Box<dyn Fn(u64) -> u64 + Send + Sync>>,
    lock_pool: Option<Arc<StripedLockPool>>,
    filter_kind: FilterKind,
    hasher: Option<Arc<dyn Hasher<K>>>,
    logger: Option<Logger>,
}

impl<K> Default for ContainerOptions<K> {
    fn default() -> Self {
        ContainerOptions {
            bucket_size: None,
            max_bucket_size: None,
            bucket_amount: None,
            bucket_amount_fn: None,
            lock_pool: None,
            filter_kind: FilterKind::default(),
            hasher: None,
            logger: None,
        }
    }
}

impl<K: std::hash::Hash + 'static> ContainerOptions<K> {
    pub fn new() -> ContainerOptions<K> {
        ContainerOptions::default()
    }

    /// Number of slots per fixed bucket, taken verbatim (spec.md §6:
    /// "entries per fixed bucket"). Unset defaults to a cache-line sized
    /// bucket (the spec.md §4.1 default), derived from bytes via
    /// [`with_cache_target`](Self::with_cache_target)'s conversion.
    pub fn with_bucket_size(mut self, size: u64) -> Self {
        self.bucket_size = Some(size);
        self
    }

    /// Clamp the bucket size to at most `size`, regardless of what
    /// [`with_bucket_size`]/[`with_cache_target`] computed.
    pub fn with_max_bucket_size(mut self, size: u64) -> Self {
        self.max_bucket_size = Some(size);
        self
    }

    /// Explicit number of shards (chains), overriding the
    /// capacity-proportional default.
    pub fn with_bucket_amount(mut self, amount: u64) -> Self {
        self.bucket_amount = Some(amount);
        self
    }

    /// Custom shard-count function of the requested capacity, taking
    /// priority over both [`with_bucket_amount`] and the default formula.
    pub fn with_bucket_function(
        mut self,
        f: impl Fn(u64) -> u64 + Send + Sync + 'static,
    ) -> Self {
        self.bucket_amount_fn = Some(Box::new(f));
        self
    }

    /// Share a striped lock pool across containers instead of each building
    /// its own, mirroring `WithItemLocks`.
    pub fn with_lock_pool(mut self, pool: Arc<StripedLockPool>) -> Self {
        self.lock_pool = Some(pool);
        self
    }

    /// Size buckets for a target cache level rather than an explicit slot
    /// count, converting the cache level's byte budget into a slot count
    /// via [`ESTIMATED_ENTRY_BYTES`].
    pub fn with_cache_target(mut self, target: CacheTarget) -> Self {
        self.bucket_size = Some((target.bytes() / ESTIMATED_ENTRY_BYTES).max(2));
        self
    }

    /// Which per-bucket membership filter to build (spec.md §4.2).
    pub fn with_filter(mut self, kind: FilterKind) -> Self {
        self.filter_kind = kind;
        self
    }

    /// Custom key hasher. A hasher is required: spec.md §6 requires
    /// `new(...)` to fail if one is absent
    /// (`examples/original_source/sets/growable.go:42-44`'s
    /// `errors.New("hasher is nil")`), so there is no silent default here —
    /// see [`crate::map::CHashMap::new`]/[`crate::set::CHashSet::new`] for
    /// the convenience constructors that supply one.
    pub fn with_hasher(mut self, hasher: Arc<dyn Hasher<K>>) -> Self {
        self.hasher = Some(hasher);
        self
    }

    /// Structured logger to instrument this container with, overriding the
    /// `slog::Discard` default.
    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Number of slots each fixed bucket should have. Mirrors the
    /// original's `optimal.SliceSize[T]()` default (a cache-line-aware
    /// slot count) when unset, or the caller's explicit
    /// [`with_bucket_size`](Self::with_bucket_size) count, clamped by
    /// [`with_max_bucket_size`](Self::with_max_bucket_size).
    fn bucket_capacity(&self) -> Result<u64, ConstructionError> {
        let mut size = self
            .bucket_size
            .unwrap_or_else(|| (CacheTarget::L1.bytes() / ESTIMATED_ENTRY_BYTES).max(2));
        if let Some(max) = self.max_bucket_size {
            size = size.min(max);
        }

        if size < 2 {
            return Err(ConstructionError::BucketSizeTooSmall(size));
        }
        Ok(size)
    }

    /// Precedence, matching `maps/bucketted.go: NewBuckettedMap` exactly
    /// (`buckets := base.bucket_amount; if buckets == 0 { buckets =
    /// base.BucketAmount(capacity) }`): an explicit
    /// [`with_bucket_amount`](Self::with_bucket_amount) always wins over
    /// [`with_bucket_function`](Self::with_bucket_function), which only
    /// applies when no fixed amount was given.
    fn bucket_amount(&self, capacity_hint: u64) -> u64 {
        if let Some(amount) = self.bucket_amount {
            return amount.max(1);
        }
        if let Some(f) = &self.bucket_amount_fn {
            return f(capacity_hint).max(1);
        }
        let bucket_size = self
            .bucket_size
            .unwrap_or_else(|| (CacheTarget::L1.bytes() / ESTIMATED_ENTRY_BYTES).max(2));
        (capacity_hint / bucket_size.max(1)).max(MIN_BUCKET_AMOUNT)
    }

    /// Finalize into the concrete values a [`crate::container::ShardedContainer`]
    /// needs, given an expected total-entry-count hint used only to size
    /// the default shard count.
    pub(crate) fn build(
        self,
        capacity_hint: u64,
    ) -> Result<BuiltOptions<K>, ConstructionError> {
        let bucket_capacity = self.bucket_capacity()?;
        let bucket_amount = self.bucket_amount(capacity_hint);
        if bucket_amount == 0 {
            return Err(ConstructionError::BucketAmountTooSmall);
        }
        let hasher = self.hasher.ok_or(ConstructionError::MissingHasher)?;

        Ok(BuiltOptions {
            bucket_capacity,
            bucket_amount: bucket_amount as usize,
            filter_kind: self.filter_kind,
            lock_pool: self
                .lock_pool
                .unwrap_or_else(StripedLockPool::with_default_size),
            hasher,
            logger: self
                .logger
                .unwrap_or_else(|| Logger::root(slog::Discard, slog::o!())),
        })
    }
}

pub(crate) struct BuiltOptions<K> {
    pub bucket_capacity: u64,
    pub bucket_amount: usize,
    pub filter_kind: FilterKind,
    pub lock_pool: Arc<StripedLockPool>,
    pub hasher: Arc<dyn Hasher<K>>,
    pub logger: Logger,
}
