//! MCP tool implementations.
//!
//! This module contains all tools exposed by the shellcache server.

pub mod cache;
pub mod fetch;

pub use cache::{CacheBucketsParams, CacheGetParams};
pub use fetch::SwFetchParams;
