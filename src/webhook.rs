//! Webhook intake: the verification handshake and the message endpoint.
//!
//! Subscription setup is gated by a challenge/response handshake against
//! the configured verify token. Inbound events always get a 200
//! acknowledgment; a payload without a text body produces no user-facing
//! message. Replies are computed first and sent afterwards, so a failed
//! send never affects session state.

use crate::engine::DialogueEngine;
use crate::outbound::MessageSender;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

/// Shared application state for the webhook handlers
pub struct AppState {
    /// The dialogue engine
    pub engine: Arc<DialogueEngine>,
    /// Outbound delivery
    pub sender: Arc<dyn MessageSender>,
    /// Shared secret for the verification handshake
    pub verify_token: String,
}

/// Build the webhook router.
#[must_use]
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/webhook", get(verify).post(receive))
        .route("/health", get(health))
        .with_state(state)
}

async fn health() -> &'static str {
    "ok"
}

/// Query parameters of the verification handshake
#[derive(Debug, Deserialize)]
pub struct VerifyParams {
    /// Subscription mode; must be `subscribe`
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    /// Token to compare against the configured secret
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    /// Challenge echoed back on success
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

async fn verify(State(state): State<Arc<AppState>>, Query(params): Query<VerifyParams>) -> Response {
    let token_matches = params.verify_token.as_deref() == Some(state.verify_token.as_str());
    if params.mode.as_deref() == Some("subscribe") && token_matches {
        info!("Webhook verification handshake accepted");
        (StatusCode::OK, params.challenge.unwrap_or_default()).into_response()
    } else {
        info!("Webhook verification handshake rejected");
        StatusCode::FORBIDDEN.into_response()
    }
}

/// Inbound event payload, matching the Cloud API envelope. Every level
/// defaults so partial payloads still acknowledge cleanly.
#[derive(Debug, Default, Deserialize)]
pub struct InboundEvent {
    /// Event entries
    #[serde(default)]
    pub entry: Vec<InboundEntry>,
}

/// One entry in an inbound event
#[derive(Debug, Default, Deserialize)]
pub struct InboundEntry {
    /// Changes within the entry
    #[serde(default)]
    pub changes: Vec<InboundChange>,
}

/// One change within an entry
#[derive(Debug, Default, Deserialize)]
pub struct InboundChange {
    /// The change payload
    #[serde(default)]
    pub value: InboundValue,
}

/// The payload of one change
#[derive(Debug, Default, Deserialize)]
pub struct InboundValue {
    /// Messages delivered in this event
    #[serde(default)]
    pub messages: Vec<InboundMessage>,
}

/// One inbound message
#[derive(Debug, Default, Deserialize)]
pub struct InboundMessage {
    /// Sender's channel identifier
    #[serde(default)]
    pub from: String,
    /// Text content, absent for media/status events
    pub text: Option<InboundText>,
}

/// Text body of an inbound message
#[derive(Debug, Default, Deserialize)]
pub struct InboundText {
    /// The message text
    #[serde(default)]
    pub body: String,
}

async fn receive(
    State(state): State<Arc<AppState>>,
    Json(event): Json<InboundEvent>,
) -> &'static str {
    for entry in &event.entry {
        for change in &entry.changes {
            for message in &change.value.messages {
                let Some(text) = &message.text else {
                    // Media/status events are acknowledged without a reply
                    debug!(from = %message.from, "Ignoring non-text inbound event");
                    continue;
                };
                if message.from.is_empty() {
                    debug!("Ignoring inbound message without a sender");
                    continue;
                }

                let replies = state.engine.handle_message(&message.from, &text.body).await;
                for reply in replies {
                    // State is already committed; delivery failures are
                    // logged and swallowed
                    if let Err(e) = state.sender.send(&message.from, &reply).await {
                        error!(to = %message.from, "Failed to deliver reply: {e:#}");
                    }
                }
            }
        }
    }

    "EVENT_RECEIVED"
}
