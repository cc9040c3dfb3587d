//! SQLite-backed storage for versioned cache buckets.
//!
//! A bucket is a named key-value store of response snapshots. Exactly one
//! bucket (the one named after the current version) is live at a time; the
//! controller deletes every other bucket on activation.
//!
//! - Keys are SHA-256 hashes of method and canonical URL
//! - Writes are UPSERTs, so the last writer for a key wins
//! - Deleting a bucket cascades to its entries
//! - WAL mode for concurrent access

pub mod buckets;
pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheEntry, EntrySummary, StoredResponse};
