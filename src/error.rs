//! Construction-time errors.
//!
//! Grounded on `examples/redox-os-tfs/core/src/alloc/manager.rs` and
//! `core/src/io/disk.rs`'s `quick_error!`-built `Error` enums (each variant
//! with a `display`/`description`, converted to/from the crate's own error
//! type rather than propagating a dependency's raw error out of the public
//! API).

use quick_error::quick_error;

quick_error! {
    /// Failure building a [`crate::options::ContainerOptions`]-configured
    /// container.
    #[derive(Debug)]
    pub enum ConstructionError {
        /// A bucket capacity of less than two was requested; a
        /// single-slot bucket cannot hold both an empty sentinel and a
        /// value (spec.md §4.1).
        BucketSizeTooSmall(size: u64) {
            display("bucket size {} is too small (must be >= 2)", size)
        }
        /// A shard/bucket-amount of zero was requested.
        BucketAmountTooSmall {
            display("bucket amount must be at least 1")
        }
        /// No hasher was supplied to the builder (spec.md §6: `new(...) ->
        /// Container | error` — "fails if ... hasher is absent"), grounded
        /// on `examples/original_source/sets/growable.go:42-44`'s
        /// `errors.New("hasher is nil")` check.
        MissingHasher {
            display("no hasher was supplied")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_size_error_displays_the_offending_size() {
        let e = ConstructionError::BucketSizeTooSmall(1);
        assert_eq!(e.to_string(), "bucket size 1 is too small (must be >= 2)");
    }

    #[test]
    fn missing_hasher_error_displays() {
        let e = ConstructionError::MissingHasher;
        assert_eq!(e.to_string(), "no hasher was supplied");
    }
}
