//! Outbound message delivery with automatic retry.
//!
//! Transient network failures are retried with exponential backoff and
//! jitter. Callers log and swallow final failures: a message that fails
//! to deliver never rolls back the state transition that produced it.

use crate::config;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;
use tracing::{info, warn};

/// Delivers one text message to one recipient.
#[async_trait]
pub trait MessageSender: Send + Sync {
    /// Send `body` to the user identified by `to`.
    ///
    /// # Errors
    ///
    /// Returns an error once all retries are exhausted.
    async fn send(&self, to: &str, body: &str) -> Result<()>;
}

/// Retry an outbound operation with exponential backoff.
///
/// Jitter is added to avoid thundering herd on upstream recovery.
pub async fn retry_send_operation<F, Fut, T>(operation: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T>>,
{
    let retry_strategy = ExponentialBackoff::from_millis(config::SEND_INITIAL_BACKOFF_MS)
        .max_delay(Duration::from_millis(config::SEND_MAX_BACKOFF_MS))
        .map(jitter)
        .take(config::SEND_MAX_RETRIES);

    Retry::spawn(retry_strategy, operation).await.map_err(|e| {
        warn!(
            "Outbound send failed after {} attempts: {}",
            config::SEND_MAX_RETRIES, e
        );
        e
    })
}

/// Sender against the WhatsApp-style Cloud API
pub struct CloudApiSender {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl CloudApiSender {
    /// Build a sender for the given registered phone-number id.
    #[must_use]
    pub fn new(phone_number_id: &str, token: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: format!("https://graph.facebook.com/v19.0/{phone_number_id}/messages"),
            token,
        }
    }
}

#[async_trait]
impl MessageSender for CloudApiSender {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        retry_send_operation(|| async {
            let payload = json!({
                "messaging_product": "whatsapp",
                "to": to,
                "type": "text",
                "text": { "body": body },
            });

            let response = self
                .client
                .post(&self.api_url)
                .bearer_auth(&self.token)
                .json(&payload)
                .send()
                .await
                .map_err(|e| anyhow!("Cloud API send error: {e}"))?;

            let status = response.status();
            if !status.is_success() {
                let detail = response.text().await.unwrap_or_default();
                return Err(anyhow!("Cloud API send failed: HTTP {status} {detail}"));
            }
            Ok(())
        })
        .await
    }
}

/// Sender for simulation mode: logs instead of delivering.
#[derive(Default)]
pub struct LoggingSender;

impl LoggingSender {
    /// Create a logging sender.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MessageSender for LoggingSender {
    async fn send(&self, to: &str, body: &str) -> Result<()> {
        info!(to, "Outbound (simulation): {}", body);
        Ok(())
    }
}
