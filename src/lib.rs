//! Concurrent, hash-partitioned maps and sets.
//!
//! This crate implements a three-tier concurrent container: cache-line
//! sized, open-addressed [`FixedBucket`]s at the bottom, append-only
//! [`GrowableChain`]s of those above them, and a [`ShardedContainer`]
//! fanning out across chains keyed by `hash mod shard_count` on top. Two
//! public façades sit over that storage: [`CHashMap`] and [`CHashSet`].
//!
//! Both support online resharding (see [`CHashMap::grow`]/[`CHashSet::grow`])
//! without a stop-the-world lock, and both support sequential and parallel
//! traversal with cooperative early cancellation.
//!
//! Values are cloned on insertion and on yield from traversal; no caller
//! ever holds a bucket lock while processing a returned entry.

pub mod bucket;
pub mod chain;
pub mod container;
pub mod entry;
pub mod error;
pub mod filter;
pub mod hasher;
pub mod lock_pool;
pub mod map;
pub mod marked;
pub mod options;
pub mod set;

pub use crate::entry::Entry;
pub use crate::error::ConstructionError;
pub use crate::filter::FilterKind;
pub use crate::hasher::{Hasher, IdentityHasher, SeaHasher, StdHasher};
pub use crate::lock_pool::StripedLockPool;
pub use crate::map::CHashMap;
pub use crate::options::{CacheTarget, ContainerOptions};
pub use crate::set::CHashSet;
