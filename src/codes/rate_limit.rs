//! Per-user code-abuse history: attempt counting, lockout, idle GC.
//!
//! A [`RateLimitRecord`] outlives any single conversation session. The
//! store is an injected abstraction so the in-process map can later be
//! swapped for an external cache without touching validation logic.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::debug;

/// One user's code-entry abuse history
#[derive(Debug, Clone)]
pub struct RateLimitRecord {
    /// Channel user identifier
    pub user_id: String,
    /// Consecutive invalid submissions within the current window
    pub attempts: u32,
    /// First attempt in the current counting window
    pub window_started_at: DateTime<Utc>,
    /// Most recent attempt or acceptance (drives window reset and GC)
    pub last_attempt_at: DateTime<Utc>,
    /// Absolute lockout expiry, if a lockout is in effect
    pub locked_until: Option<DateTime<Utc>>,
    /// Most recently accepted code, used to reject immediate replay
    pub last_accepted_code: Option<String>,
}

impl RateLimitRecord {
    /// Fresh record for a user seen for the first time.
    #[must_use]
    pub fn new(user_id: &str, now: DateTime<Utc>) -> Self {
        Self {
            user_id: user_id.to_string(),
            attempts: 0,
            window_started_at: now,
            last_attempt_at: now,
            locked_until: None,
            last_accepted_code: None,
        }
    }

    /// Whether a lockout is active at `now`.
    #[must_use]
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.locked_until.is_some_and(|until| until > now)
    }

    /// Whole minutes remaining on an active lockout, rounded up so the
    /// notice never claims "0 minutes" while still locked.
    #[must_use]
    pub fn lockout_minutes_left(&self, now: DateTime<Utc>) -> Option<i64> {
        let until = self.locked_until?;
        if until <= now {
            return None;
        }
        let secs = (until - now).num_seconds();
        Some((secs + 59) / 60)
    }

    /// Whether the record is eligible for idle collection: no active
    /// lockout and no activity within `idle_horizon`.
    #[must_use]
    pub fn is_collectable(&self, now: DateTime<Utc>, idle_horizon: Duration) -> bool {
        !self.is_locked(now) && now - self.last_attempt_at > idle_horizon
    }
}

/// Store abstraction for rate-limit records
#[async_trait]
pub trait RateLimitStore: Send + Sync {
    /// Fetch a user's record, if one exists.
    async fn get(&self, user_id: &str) -> Option<RateLimitRecord>;
    /// Insert or replace a record.
    async fn put(&self, record: RateLimitRecord);
    /// Delete a user's record unconditionally.
    async fn remove(&self, user_id: &str);
    /// Drop records idle longer than `idle_horizon` with no active
    /// lockout. Returns the number of records collected.
    async fn sweep_idle(&self, now: DateTime<Utc>, idle_horizon: Duration) -> usize;
}

/// In-process implementation backed by a lock-guarded map
#[derive(Default)]
pub struct InMemoryRateLimitStore {
    records: RwLock<HashMap<String, RateLimitRecord>>,
}

impl InMemoryRateLimitStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked users.
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// Whether the store is empty.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

#[async_trait]
impl RateLimitStore for InMemoryRateLimitStore {
    async fn get(&self, user_id: &str) -> Option<RateLimitRecord> {
        self.records.read().await.get(user_id).cloned()
    }

    async fn put(&self, record: RateLimitRecord) {
        self.records
            .write()
            .await
            .insert(record.user_id.clone(), record);
    }

    async fn remove(&self, user_id: &str) {
        self.records.write().await.remove(user_id);
    }

    async fn sweep_idle(&self, now: DateTime<Utc>, idle_horizon: Duration) -> usize {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|_, rec| !rec.is_collectable(now, idle_horizon));
        let collected = before - records.len();
        if collected > 0 {
            debug!("Collected {} idle rate-limit record(s)", collected);
        }
        collected
    }
}
