//! Offline cache controller.
//!
//! The host drives the controller through three calls:
//!
//! - [`CacheController::on_install`] seeds the bucket for the current version.
//! - [`CacheController::on_activate`] deletes every other bucket and claims pages.
//! - [`CacheController::on_fetch`] answers one intercepted request.
//!
//! ### Fetch strategies
//!
//! | Category | Primary | On network failure | Cache write |
//! |---|---|---|---|
//! | Document | network | cached fallback document, else 503 `text/html` | never |
//! | Api | network | 503 without content type | never |
//! | Asset | network | cached entry, else 503 `text/plain` | every GET response |
//!
//! `on_fetch` always produces a response. Each call is an independent future
//! and the bucket storage is the only shared state.

pub mod lifecycle;

pub use lifecycle::{ActivateOutcome, InstallOutcome, LifecycleState};

use futures_util::future::try_join_all;
use reqwest::Method;
use shellcache_core::cache::CacheEntry;
use shellcache_core::{AppConfig, CacheDb, Error};
use tokio::sync::watch;
use url::Url;

use crate::classify::{Category, Classifier};
use crate::fetch::{Network, resolve};
use crate::request::RequestDescriptor;
use crate::response::Response;

/// Resolved controller settings.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub bucket_name: String,
    pub origin: Url,
    pub seed_urls: Vec<Url>,
    pub fallback_url: Url,
    pub classifier: Classifier,
}

impl ControllerConfig {
    /// Resolve seed and fallback paths against the configured origin.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = config.origin_url().map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let resolve_path = |path: &str| resolve(&origin, path).map_err(|e| Error::InvalidUrl(format!("{path}: {e}")));

        let seed_urls = config
            .seed_urls
            .iter()
            .map(|seed| resolve_path(seed))
            .collect::<Result<Vec<_>, _>>()?;
        let fallback_url = resolve_path(&config.fallback_path)?;

        Ok(Self {
            bucket_name: config.bucket_name(),
            origin,
            seed_urls,
            fallback_url,
            classifier: Classifier::from_config(config),
        })
    }
}

pub struct CacheController<N> {
    config: ControllerConfig,
    db: CacheDb,
    network: N,
    state: watch::Sender<LifecycleState>,
}

impl<N: Network> CacheController<N> {
    pub fn new(config: ControllerConfig, db: CacheDb, network: N) -> Self {
        let (state, _) = watch::channel(LifecycleState::Parsed);
        Self { config, db, network, state }
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn db(&self) -> &CacheDb {
        &self.db
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Resolve once the controller is allowed to intercept fetches.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotReady` if the instance became redundant instead.
    pub async fn wait_ready(&self) -> Result<(), Error> {
        let mut rx = self.state.subscribe();
        let state = *rx
            .wait_for(LifecycleState::is_settled)
            .await
            .map_err(|_| Error::NotReady("closed".into()))?;
        match state {
            LifecycleState::Activated => Ok(()),
            other => Err(Error::NotReady(other.to_string())),
        }
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        tracing::debug!(from = %previous, to = %next, bucket = %self.config.bucket_name, "lifecycle transition");
    }

    /// Seed the current bucket with the shell resources.
    ///
    /// All seeds are fetched before anything is written; a single failed or
    /// non-2xx seed aborts the step and nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns `Error::InstallFailed` for seed failures and storage errors as-is.
    pub async fn on_install(&self) -> Result<InstallOutcome, Error> {
        self.transition(LifecycleState::Installing);
        tracing::info!(bucket = %self.config.bucket_name, "installing cache controller");

        match self.install().await {
            Ok(outcome) => {
                self.transition(LifecycleState::Installed);
                tracing::info!(bucket = %outcome.bucket, seeded = outcome.seeded, "cached app shell");
                Ok(outcome)
            }
            Err(e) => {
                self.transition(LifecycleState::Redundant);
                tracing::error!(bucket = %self.config.bucket_name, "install failed: {e}");
                Err(e)
            }
        }
    }

    async fn install(&self) -> Result<InstallOutcome, Error> {
        let bucket = &self.config.bucket_name;
        let entries = try_join_all(self.config.seed_urls.iter().map(|url| self.fetch_seed(url))).await?;
        let seeded = self.db.put_entries(bucket, entries).await?;

        Ok(InstallOutcome { bucket: bucket.clone(), seeded, skip_waiting: true })
    }

    async fn fetch_seed(&self, url: &Url) -> Result<CacheEntry, Error> {
        let request = RequestDescriptor::get(url.clone());
        let response = self
            .network
            .fetch(&request)
            .await
            .map_err(|e| Error::InstallFailed(format!("seed {url}: {e}")))?;

        if !response.status.is_success() {
            return Err(Error::InstallFailed(format!("seed {url} returned {}", response.status.as_u16())));
        }

        Ok(CacheEntry {
            key: request.cache_key(),
            method: request.method.to_string(),
            url: url.to_string(),
            response: response.to_stored(),
        })
    }

    /// Delete every bucket except the current one and take control of open pages.
    ///
    /// # Errors
    ///
    /// Returns `Error::ActivateFailed` if the current bucket is missing any
    /// seed or this instance already failed, and storage errors as-is.
    pub async fn on_activate(&self) -> Result<ActivateOutcome, Error> {
        if self.state() == LifecycleState::Redundant {
            return Err(Error::ActivateFailed("install did not complete".into()));
        }

        self.transition(LifecycleState::Activating);
        tracing::info!(bucket = %self.config.bucket_name, "activating cache controller");

        match self.activate().await {
            Ok(outcome) => {
                self.transition(LifecycleState::Activated);
                Ok(outcome)
            }
            Err(e) => {
                self.transition(LifecycleState::Redundant);
                tracing::error!(bucket = %self.config.bucket_name, "activate failed: {e}");
                Err(e)
            }
        }
    }

    async fn activate(&self) -> Result<ActivateOutcome, Error> {
        let current = &self.config.bucket_name;
        if !self.is_seeded().await? {
            return Err(Error::ActivateFailed(format!("bucket {current} has not been installed")));
        }

        let mut purged = Vec::new();
        for name in self.db.bucket_names().await? {
            if &name != current {
                tracing::info!(bucket = %name, "deleting old cache");
                self.db.delete_bucket(&name).await?;
                purged.push(name);
            }
        }

        Ok(ActivateOutcome { bucket: current.clone(), purged, clients_claimed: true })
    }

    /// The current bucket exists and holds every seed.
    ///
    /// Assets written through before install do not count.
    async fn is_seeded(&self) -> Result<bool, Error> {
        let bucket = &self.config.bucket_name;
        if !self.db.has_bucket(bucket).await? {
            return Ok(false);
        }
        for url in &self.config.seed_urls {
            let key = RequestDescriptor::get(url.clone()).cache_key();
            if !self.db.has_entry(bucket, &key).await? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Install unless the current bucket already holds a seeded shell, then activate.
    ///
    /// A version that was installed by an earlier process is not seeded again,
    /// so a host can restart offline.
    pub async fn start(&self) -> Result<ActivateOutcome, Error> {
        let bucket = &self.config.bucket_name;
        if self.is_seeded().await? {
            tracing::info!(bucket = %bucket, "bucket already installed, skipping install");
        } else {
            self.on_install().await?;
        }
        self.on_activate().await
    }

    /// Answer one intercepted request. Never fails.
    pub async fn on_fetch(&self, request: &RequestDescriptor) -> Response {
        let category = self.config.classifier.classify(request);
        tracing::debug!(method = %request.method, url = %request.url, ?category, "intercepted request");

        match category {
            Category::Document => self.fetch_document(request).await,
            Category::Api => self.fetch_api(request).await,
            Category::Asset => self.fetch_asset(request).await,
        }
    }

    async fn fetch_document(&self, request: &RequestDescriptor) -> Response {
        let err = match self.network.fetch(request).await {
            Ok(response) => return response,
            Err(e) => e,
        };
        tracing::warn!(url = %request.url, "document fetch failed, trying offline fallback: {err}");

        let fallback = RequestDescriptor::get(self.config.fallback_url.clone());
        self.cached(&fallback).await.unwrap_or_else(Response::offline_document)
    }

    async fn fetch_api(&self, request: &RequestDescriptor) -> Response {
        match self.network.fetch(request).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(url = %request.url, "api call failed: {e}");
                Response::network_error()
            }
        }
    }

    async fn fetch_asset(&self, request: &RequestDescriptor) -> Response {
        match self.network.fetch(request).await {
            Ok(response) => {
                if request.method == Method::GET {
                    self.store(request, &response).await;
                }
                response
            }
            Err(e) => {
                tracing::warn!(url = %request.url, "asset fetch failed, trying cache: {e}");
                match self.cached(request).await {
                    Some(response) => {
                        tracing::info!(url = %request.url, "serving from cache");
                        response
                    }
                    None => Response::offline_asset(),
                }
            }
        }
    }

    /// Write-through for a fresh asset, whatever its status. Creates the bucket
    /// if nothing has been installed yet. Failures only cost the offline copy.
    async fn store(&self, request: &RequestDescriptor, response: &Response) {
        let entry = CacheEntry {
            key: request.cache_key(),
            method: request.method.to_string(),
            url: request.url.to_string(),
            response: response.to_stored(),
        };
        if let Err(e) = self.db.put_entry(&self.config.bucket_name, &entry).await {
            tracing::warn!(url = %request.url, "failed to cache response: {e}");
        }
    }

    /// Look up the current bucket. Storage and decode errors count as a miss.
    async fn cached(&self, request: &RequestDescriptor) -> Option<Response> {
        let stored = match self.db.match_entry(&self.config.bucket_name, &request.cache_key()).await {
            Ok(stored) => stored?,
            Err(e) => {
                tracing::warn!(url = %request.url, "cache lookup failed: {e}");
                return None;
            }
        };

        match Response::from_stored(stored) {
            Ok(response) => Some(response),
            Err(e) => {
                tracing::warn!(url = %request.url, "discarding cached entry: {e}");
                None
            }
        }
    }
}
