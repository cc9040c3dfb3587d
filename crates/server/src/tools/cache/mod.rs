//! Cache inspection tools.
//!
//! This module provides read-only tools over the bucket storage.

pub mod buckets;
pub mod get;

pub use buckets::{CacheBucketsParams, buckets_impl};
pub use get::{CacheGetParams, get_impl};
