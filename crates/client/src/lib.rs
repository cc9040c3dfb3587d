//! Offline cache controller for shellcache.
//!
//! This crate provides request classification, the network seam, and the
//! install/activate/fetch state machine shared by the server and CLI.

pub mod classify;
pub mod controller;
pub mod fetch;
pub mod request;
pub mod response;

pub use classify::{Category, Classifier};
pub use controller::{ActivateOutcome, CacheController, ControllerConfig, InstallOutcome, LifecycleState};
pub use fetch::{FetchClient, FetchConfig, Network, NetworkError};
pub use request::{Destination, RequestDescriptor};
pub use response::{Response, ResponseSource, ResponseView};

pub use reqwest::{Method, StatusCode, header};
