//! Per-user conversation sessions with expiry.
//!
//! One active session per user, holding the current flow state and the
//! fields accumulated so far. The store is an injected abstraction so the
//! in-process map can later be swapped for an external cache without
//! touching flow logic.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

/// Biller metadata returned by code resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Biller {
    /// Service category (municipal, education, ...)
    pub category: String,
    /// Display name of the provider
    pub provider: String,
    /// Reference the provider knows the code by
    pub reference: String,
}

/// Which product a session belongs to, used to pick canned messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowKey {
    /// Main menu / no product chosen yet
    Menu,
    /// Bill payment via pay-code
    Bill,
    /// Electricity token purchase
    Zesa,
    /// Airtime top-up
    Airtime,
}

/// The current step of a conversation, with the fields gathered so far.
///
/// Fields grow monotonically as the user advances; each transition
/// replaces the whole state value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlowState {
    /// Main menu shown, waiting for a product choice
    MainMenu,
    /// Bill payment: waiting for a category choice
    BillCategorySelection,
    /// Bill payment: waiting for the pay-code
    BillWaitingForCode {
        /// Chosen index into the category table
        category_index: usize,
    },
    /// Bill payment: code resolved, waiting for the amount
    BillAmountEntry {
        /// Resolved biller metadata
        biller: Biller,
    },
    /// Bill payment: amount entered, waiting for confirmation
    BillConfirmation {
        /// Resolved biller metadata
        biller: Biller,
        /// Base amount in cents
        amount_cents: u64,
        /// Fee in cents
        fee_cents: u64,
        /// Amount plus fee in cents
        total_cents: u64,
    },
    /// Electricity: waiting for the meter number
    MeterEntry,
    /// Electricity: meter verified, waiting for the amount
    ZesaAmountEntry {
        /// 11-digit meter number
        meter: String,
        /// Registered account holder
        account_name: String,
        /// Supply area
        area: String,
    },
    /// Electricity: amount entered, waiting for a wallet choice
    ZesaWalletSelection {
        /// 11-digit meter number
        meter: String,
        /// Registered account holder
        account_name: String,
        /// Base amount in cents
        amount_cents: u64,
        /// Fee in cents
        fee_cents: u64,
        /// Amount plus fee in cents
        total_cents: u64,
    },
    /// Airtime: waiting for the recipient phone number
    AirtimeRecipientEntry,
    /// Airtime: waiting for a tier choice (or custom)
    AirtimeAmountChoice {
        /// Recipient phone number
        phone: String,
        /// Detected carrier
        carrier: String,
    },
    /// Airtime: waiting for a custom amount
    AirtimeCustomAmount {
        /// Recipient phone number
        phone: String,
        /// Detected carrier
        carrier: String,
    },
    /// Airtime: amount fixed, waiting for a wallet choice
    AirtimeWalletSelection {
        /// Recipient phone number
        phone: String,
        /// Detected carrier
        carrier: String,
        /// Top-up amount in cents
        amount_cents: u64,
    },
}

impl FlowState {
    /// Which product's canned messages apply to this state.
    #[must_use]
    pub fn flow_key(&self) -> FlowKey {
        match self {
            Self::MainMenu => FlowKey::Menu,
            Self::BillCategorySelection
            | Self::BillWaitingForCode { .. }
            | Self::BillAmountEntry { .. }
            | Self::BillConfirmation { .. } => FlowKey::Bill,
            Self::MeterEntry
            | Self::ZesaAmountEntry { .. }
            | Self::ZesaWalletSelection { .. } => FlowKey::Zesa,
            Self::AirtimeRecipientEntry
            | Self::AirtimeAmountChoice { .. }
            | Self::AirtimeCustomAmount { .. }
            | Self::AirtimeWalletSelection { .. } => FlowKey::Airtime,
        }
    }

    /// Whether this step expects a menu-style numeric choice.
    #[must_use]
    pub fn expects_menu_choice(&self) -> bool {
        matches!(
            self,
            Self::MainMenu
                | Self::BillCategorySelection
                | Self::BillConfirmation { .. }
                | Self::AirtimeAmountChoice { .. }
                | Self::ZesaWalletSelection { .. }
                | Self::AirtimeWalletSelection { .. }
        )
    }

    /// Whether this step expects a free-form amount.
    #[must_use]
    pub fn expects_amount(&self) -> bool {
        matches!(
            self,
            Self::BillAmountEntry { .. }
                | Self::ZesaAmountEntry { .. }
                | Self::AirtimeCustomAmount { .. }
        )
    }

    /// Whether this step expects free text (meter, phone, pay-code).
    #[must_use]
    pub fn expects_free_text(&self) -> bool {
        matches!(
            self,
            Self::MeterEntry | Self::AirtimeRecipientEntry | Self::BillWaitingForCode { .. }
        )
    }
}

/// One user's in-progress conversation
#[derive(Debug, Clone)]
pub struct Session {
    /// Session identifier
    pub id: Uuid,
    /// Channel user identifier
    pub user_id: String,
    /// Current conversation step
    pub state: FlowState,
    /// Consecutive invalid inputs at the current step
    pub invalid_attempts: u32,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Absolute expiry (fixed TTL from creation)
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Create a session starting at `state` with the given TTL.
    #[must_use]
    pub fn new(user_id: &str, state: FlowState, now: DateTime<Utc>, ttl: Duration) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id: user_id.to_string(),
            state,
            invalid_attempts: 0,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    /// Whether the session has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// Store abstraction for conversation sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert or replace the user's session, returning its id. Any
    /// previous session for the user is invalidated by replacement.
    async fn upsert(&self, session: Session) -> Uuid;
    /// Return the user's session if one exists and has not expired.
    /// Expired entries encountered on the way are swept out.
    async fn get_active(&self, user_id: &str, now: DateTime<Utc>) -> Option<Session>;
    /// Delete the user's session unconditionally.
    async fn remove(&self, user_id: &str);
    /// Drop all expired sessions. Returns the number removed.
    async fn sweep_expired(&self, now: DateTime<Utc>) -> usize;
}

/// In-process implementation backed by a lock-guarded map
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored sessions, expired or not.
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn upsert(&self, session: Session) -> Uuid {
        let id = session.id;
        self.sessions
            .write()
            .await
            .insert(session.user_id.clone(), session);
        id
    }

    async fn get_active(&self, user_id: &str, now: DateTime<Utc>) -> Option<Session> {
        // Lazy sweep keeps lookups correct between periodic ticks
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| !s.is_expired(now));
        sessions.get(user_id).cloned()
    }

    async fn remove(&self, user_id: &str) {
        self.sessions.write().await.remove(user_id);
    }

    async fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(now));
        let removed = before - sessions.len();
        if removed > 0 {
            debug!("Swept {} expired session(s)", removed);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).expect("valid timestamp")
    }

    fn session(user: &str, created: DateTime<Utc>) -> Session {
        Session::new(user, FlowState::MainMenu, created, Duration::seconds(600))
    }

    #[tokio::test]
    async fn test_upsert_replaces_previous_session() {
        let store = InMemorySessionStore::new();

        let first = store.upsert(session("u1", at(0))).await;
        let second = store.upsert(session("u1", at(1))).await;
        assert_ne!(first, second);

        let active = store.get_active("u1", at(2)).await.expect("session");
        assert_eq!(active.id, second);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_expired_session_is_gone() {
        let store = InMemorySessionStore::new();
        store.upsert(session("u1", at(0))).await;

        assert!(store.get_active("u1", at(599)).await.is_some());
        assert!(store.get_active("u1", at(600)).await.is_none());
        // The lazy sweep removed the entry
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_double_sweep_is_noop() {
        let store = InMemorySessionStore::new();
        store.upsert(session("u1", at(0))).await;
        store.upsert(session("u2", at(100))).await;

        assert_eq!(store.sweep_expired(at(650)).await, 1);
        assert_eq!(store.sweep_expired(at(650)).await, 0);
        assert!(store.get_active("u2", at(650)).await.is_some());
    }

    #[tokio::test]
    async fn test_remove_is_unconditional() {
        let store = InMemorySessionStore::new();
        store.upsert(session("u1", at(0))).await;
        store.remove("u1").await;
        assert!(store.get_active("u1", at(1)).await.is_none());
    }

    #[test]
    fn test_step_expectations() {
        assert!(FlowState::MainMenu.expects_menu_choice());
        assert!(FlowState::MeterEntry.expects_free_text());
        let amount = FlowState::ZesaAmountEntry {
            meter: "37145678901".into(),
            account_name: "T. Moyo".into(),
            area: "Harare - Avondale".into(),
        };
        assert!(amount.expects_amount());
        assert!(!amount.expects_menu_choice());
        assert_eq!(amount.flow_key(), FlowKey::Zesa);
    }
}
