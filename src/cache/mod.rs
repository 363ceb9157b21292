//! Fingerprint caching module for hashrecon.
//!
//! This module provides persistent storage for file digests to speed up
//! repeated reconciliations of the same trees by skipping re-hashing.
//!
//! # Architecture
//!
//! * [`store`]: the thread-safe in-memory map plus JSON load/save.
//!
//! # Cache Invalidation
//!
//! There is none. Entries are keyed by absolute path only, with no size or
//! modification-time check, so a file rewritten in place keeps its old
//! digest until the cache file is removed or `--clear-cache` is passed.
//! The cache is a pure speed-up: a run with an empty or unwritable cache
//! produces the same result.

pub mod store;

pub use store::{CacheError, CacheResult, FingerprintCache};
