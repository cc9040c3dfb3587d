//! Core types and shared functionality for shellcache.
//!
//! This crate provides:
//! - Versioned cache bucket storage with SQLite backend
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, StoredResponse};
pub use config::AppConfig;
pub use error::Error;
