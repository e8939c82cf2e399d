//! HTTP transport used by the fetcher.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use super::{Headers, HttpResponse};
use crate::config::Config;
use crate::error::{CacheError, Result};

// == HTTP Client Trait ==
/// Blocking `GET` against a remote resource.
///
/// Implementations fail with [`CacheError::Transport`] when no response was
/// received. Any received response, whatever its status, is returned as
/// `Ok`; classifying statuses is the caller's job.
pub trait HttpClient: Send + Sync {
    fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse>;
}

impl<C: HttpClient + ?Sized> HttpClient for Arc<C> {
    fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse> {
        (**self).get(url, headers)
    }
}

impl<C: HttpClient + ?Sized> HttpClient for &C {
    fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse> {
        (**self).get(url, headers)
    }
}

// == Reqwest Client ==
/// [`HttpClient`] backed by `reqwest`'s blocking client.
///
/// Must not be created or dropped from inside an async runtime.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    http: reqwest::blocking::Client,
}

impl ReqwestClient {
    /// Builds a client with the configured timeout and user agent.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.http_timeout))
            .build()
            .map_err(|e| CacheError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str, headers: &Headers) -> Result<HttpResponse> {
        let mut request = self.http.get(url);
        for (name, value) in headers.iter() {
            request = request.header(name, value);
        }

        let transport = |e: reqwest::Error| CacheError::Transport {
            url: url.to_string(),
            source: Box::new(e),
        };
        let response = request.send().map_err(transport)?;

        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str(), v)))
            .collect();
        let body = response.bytes().map_err(transport)?.to_vec();

        debug!("GET {} -> {} ({} bytes)", url, status, body.len());
        Ok(HttpResponse { status, headers, body })
    }
}
