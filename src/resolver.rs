//! Code resolution client.
//!
//! Maps a validated pay-code to biller metadata via the external
//! resolution service. The HTTP implementation carries a hard timeout so
//! a slow upstream becomes a retryable failure, never a hang, and keeps
//! a short-TTL cache of successful resolutions. A fixture implementation
//! backs tests and simulation mode.

use crate::config;
use crate::session::Biller;
use async_trait::async_trait;
use moka::future::Cache;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;
use tracing::{error, warn};

/// Typed failure from code resolution.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// The code is unknown or expired; user-correctable.
    #[error("code not found or expired")]
    NotFound,
    /// The call exceeded the timeout; retryable.
    #[error("resolution timed out")]
    Timeout,
    /// Auth failure talking to the service; operator-facing.
    #[error("resolution service rejected our credentials")]
    Misconfigured,
    /// Any other non-success status; retryable.
    #[error("resolution service error: HTTP {0}")]
    Upstream(u16),
    /// Connection-level failure; retryable.
    #[error("network error: {0}")]
    Transport(String),
}

impl ResolveError {
    /// Whether the user may simply retry the same code shortly.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::Upstream(_) | Self::Transport(_)
        )
    }
}

/// Resolves a canonical pay-code against a category endpoint.
#[async_trait]
pub trait CodeResolver: Send + Sync {
    /// Resolve `code` via the endpoint at `path`.
    ///
    /// # Errors
    ///
    /// Returns a [`ResolveError`] for unknown codes, timeouts, auth
    /// failures and upstream errors.
    async fn resolve(&self, code: &str, path: &str) -> Result<Biller, ResolveError>;
}

/// Wire format of a resolution response
#[derive(Debug, Deserialize)]
struct ResolveResponse {
    status: String,
    #[serde(default)]
    service_category: String,
    #[serde(default)]
    provider_name: String,
    #[serde(default)]
    biller_reference: String,
}

/// HTTP implementation against the configured resolution service
pub struct HttpCodeResolver {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    cache: Cache<String, Biller>,
}

impl HttpCodeResolver {
    /// Build a resolver for `base_url` with the configured timeout and a
    /// short-TTL resolution cache.
    #[must_use]
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let timeout = Duration::from_secs(config::get_resolve_timeout_secs());
        let client = HttpClient::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| HttpClient::new());

        let cache = Cache::builder()
            .max_capacity(config::RESOLVE_CACHE_MAX_SIZE)
            .time_to_live(Duration::from_secs(config::RESOLVE_CACHE_TTL_SECS))
            .build();

        Self {
            client,
            base_url,
            api_key,
            cache,
        }
    }

    async fn fetch(&self, code: &str, path: &str) -> Result<Biller, ResolveError> {
        let url = format!("{}{}/{}", self.base_url.trim_end_matches('/'), path, code);

        let mut request = self.client.get(&url);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Code resolution timed out for {url}");
                ResolveError::Timeout
            } else {
                ResolveError::Transport(e.to_string())
            }
        })?;

        match response.status() {
            StatusCode::UNAUTHORIZED => {
                error!("Resolution service rejected our credentials (HTTP 401); check RESOLVER_API_KEY");
                Err(ResolveError::Misconfigured)
            }
            StatusCode::NOT_FOUND => Err(ResolveError::NotFound),
            status if !status.is_success() => Err(ResolveError::Upstream(status.as_u16())),
            _ => {
                let body: ResolveResponse = response
                    .json()
                    .await
                    .map_err(|e| ResolveError::Transport(e.to_string()))?;
                if body.status != "success" {
                    return Err(ResolveError::NotFound);
                }
                Ok(Biller {
                    category: body.service_category,
                    provider: body.provider_name,
                    reference: body.biller_reference,
                })
            }
        }
    }
}

#[async_trait]
impl CodeResolver for HttpCodeResolver {
    async fn resolve(&self, code: &str, path: &str) -> Result<Biller, ResolveError> {
        let cache_key = format!("{path}:{code}");
        if let Some(hit) = self.cache.get(&cache_key).await {
            return Ok(hit);
        }

        let biller = self.fetch(code, path).await?;
        self.cache.insert(cache_key, biller.clone()).await;
        Ok(biller)
    }
}

/// Fixture resolver with a fixed code table; backs tests and simulation
/// mode when no resolution service is configured.
#[derive(Default)]
pub struct FixtureCodeResolver {
    billers: HashMap<String, Biller>,
}

impl FixtureCodeResolver {
    /// Resolver pre-loaded with the standard simulation codes.
    #[must_use]
    pub fn with_test_codes() -> Self {
        let mut billers = HashMap::new();
        billers.insert(
            "PAY100001".to_string(),
            Biller {
                category: "Municipal rates".to_string(),
                provider: "City of Harare".to_string(),
                reference: "CH-4471".to_string(),
            },
        );
        billers.insert(
            "PAY200002".to_string(),
            Biller {
                category: "School fees".to_string(),
                provider: "Greenfield Primary School".to_string(),
                reference: "GPS-2210".to_string(),
            },
        );
        billers.insert(
            "PAY300003".to_string(),
            Biller {
                category: "Internet & TV".to_string(),
                provider: "ZOL Fibre".to_string(),
                reference: "ZOL-8841".to_string(),
            },
        );
        Self { billers }
    }

    /// Add a code mapping.
    pub fn insert(&mut self, code: &str, biller: Biller) {
        self.billers.insert(code.to_string(), biller);
    }
}

#[async_trait]
impl CodeResolver for FixtureCodeResolver {
    async fn resolve(&self, code: &str, _path: &str) -> Result<Biller, ResolveError> {
        self.billers
            .get(code)
            .cloned()
            .ok_or(ResolveError::NotFound)
    }
}
