//! Conditional Fetch Module
//!
//! Serves HTTP resources through a [`PersistentStore`], revalidating stale
//! items with their recorded validators.
//!
//! ### Per request
//! - Fresh cached item: returned as-is, no network call.
//! - Stale item: refetched with `If-None-Match` / `If-Modified-Since`; a
//!   not-modified answer keeps the cached body under the new headers.
//! - No item: plain fetch.
//! - Statuses other than 2xx and 304 fail and leave the store untouched.
//!
//! ### Freshness of what gets stored
//! The server's `max-age` caps the store default TTL; with a "never expire"
//! default the server value is used as-is.
//!
//! The read and the write are two separate lock scopes. Concurrent callers
//! racing on the same stale key may both refetch; the last write wins.

mod client;
mod policy;
mod response;

use serde::Serialize;
use tracing::{info, warn};

use crate::cache::{CacheResult, FetchCounters, FetchStats, PersistentStore};
use crate::error::{CacheError, Result};

pub use client::{HttpClient, ReqwestClient};
pub use policy::{max_age, resolve_ttl, validator_headers, IF_MODIFIED_SINCE, IF_NONE_MATCH};
pub use response::{Headers, HttpResponse};

/// Status of a not-modified response
pub const NOT_MODIFIED: u16 = 304;

/// How a single fetch was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchOutcome {
    /// Fresh cached item, no network call
    Hit,
    /// Nothing cached, fetched from the network
    Miss,
    /// Stale item confirmed by a not-modified answer
    Revalidated,
    /// Stale item replaced by a new response
    Refetched,
}

/// Store of cached HTTP responses keyed by URL.
pub type ResponseStore = PersistentStore<HttpResponse>;

// == Conditional Fetcher ==
/// Get-or-refresh of HTTP resources against a [`ResponseStore`].
#[derive(Debug)]
pub struct ConditionalFetcher<C> {
    client: C,
    counters: FetchCounters,
}

impl<C: HttpClient> ConditionalFetcher<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            counters: FetchCounters::new(),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Counts of how fetches through this fetcher were answered.
    pub fn stats(&self) -> FetchStats {
        self.counters.snapshot()
    }

    // == Fetch ==
    /// Returns a valid response for `url`, from the cache when it is fresh.
    ///
    /// # Arguments
    /// * `store` - Cache to read from and write back to
    /// * `url` - Resource to fetch; also the cache key
    /// * `headers` - Caller request headers; conditional validators derived
    ///   from the cached item override fields of the same name
    ///
    /// # Errors
    /// * [`CacheError::Transport`] when the request could not be made
    /// * [`CacheError::HttpStatus`] for any status other than 2xx or 304
    /// * Store and lock errors from either lock scope
    pub fn fetch(&self, store: &ResponseStore, url: &str, headers: &Headers) -> Result<HttpResponse> {
        self.fetch_with_outcome(store, url, headers)
            .map(|(response, _)| response)
    }

    /// Like [`Self::fetch`], also reporting how the request was answered.
    pub fn fetch_with_outcome(
        &self,
        store: &ResponseStore,
        url: &str,
        headers: &Headers,
    ) -> Result<(HttpResponse, FetchOutcome)> {
        match self.fetch_inner(store, url, headers) {
            Ok((response, outcome)) => {
                match outcome {
                    FetchOutcome::Hit => self.counters.record_hit(),
                    FetchOutcome::Miss => self.counters.record_miss(),
                    FetchOutcome::Revalidated => self.counters.record_revalidated(),
                    FetchOutcome::Refetched => self.counters.record_refetched(),
                }
                Ok((response, outcome))
            }
            Err(e) => {
                self.counters.record_failure();
                Err(e)
            }
        }
    }

    fn fetch_inner(
        &self,
        store: &ResponseStore,
        url: &str,
        headers: &Headers,
    ) -> Result<(HttpResponse, FetchOutcome)> {
        info!("Fetching item for url: {}", url);

        let cached = match store.get(url)? {
            Some(CacheResult { data, expired: false }) => {
                info!("Returning fresh item found in cache: {}", url);
                return Ok((data, FetchOutcome::Hit));
            }
            Some(CacheResult { data, expired: true }) => {
                info!("Stale item found in cache: {}", url);
                Some(data)
            }
            None => {
                info!("No item in cache for url: {}", url);
                None
            }
        };

        let mut request_headers = headers.clone();
        if let Some(cached) = &cached {
            request_headers.extend(&validator_headers(cached));
        }

        info!("Fetching from remote {}", url);
        let fetched = self.client.get(url, &request_headers)?;

        let (result, outcome) = if fetched.is_not_modified() {
            let Some(cached) = cached else {
                warn!("Not-modified response without a cached item for {}", url);
                return Err(CacheError::HttpStatus {
                    status: fetched.status,
                    url: url.to_string(),
                });
            };
            info!("Server says resource is still fresh: {}", url);
            let merged = HttpResponse {
                headers: fetched.headers,
                ..cached
            };
            (merged, FetchOutcome::Revalidated)
        } else if fetched.is_success() {
            let outcome = if cached.is_some() {
                FetchOutcome::Refetched
            } else {
                FetchOutcome::Miss
            };
            (fetched, outcome)
        } else {
            warn!("HTTP error {} for {}", fetched.status, url);
            return Err(CacheError::HttpStatus {
                status: fetched.status,
                url: url.to_string(),
            });
        };

        let server_max_age = result.headers.get("cache-control").and_then(max_age);
        let ttl = resolve_ttl(server_max_age, store.default_ttl());
        info!("Saving resource for {} with ttl: {}", url, ttl);
        store.create_or_update(url, result.clone(), None, Some(ttl))?;

        Ok((result, outcome))
    }
}
