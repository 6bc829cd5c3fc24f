//! Configuration and settings management
//!
//! Loads settings from environment variables and defines the tunables for
//! sessions, rate limiting, fees and the upstream collaborators.

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Application settings loaded from environment variables
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Settings {
    /// Shared secret for the webhook verification handshake
    pub verify_token: String,

    /// Bearer token for the outbound Cloud API
    pub channel_token: Option<String>,
    /// Sender phone-number id registered with the Cloud API
    pub phone_number_id: Option<String>,

    /// Base URL of the code-resolution service
    pub resolver_base_url: Option<String>,
    /// API key for the code-resolution service
    pub resolver_api_key: Option<String>,

    /// Socket address the webhook server binds to
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Settings {
    /// Create new settings by loading from environment and files
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if loading fails.
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{run_mode}")).required(false))
            // Local overrides; not checked into git
            .add_source(File::with_name("config/local").required(false))
            .add_source(Environment::with_prefix("APP").separator("__"))
            // Environment::default() auto-converts UPPER_SNAKE_CASE to snake_case;
            // ignore_empty treats empty env vars as unset
            .add_source(Environment::default().ignore_empty(true))
            .build()?;

        s.try_deserialize()
    }
}

// Redeemable code format
/// Canonical pay-code prefix
pub const CODE_PREFIX: &str = "PAY";
/// Number of digits following the prefix
pub const CODE_DIGITS: usize = 6;
/// Total canonical length (prefix + digits)
pub const CODE_TOTAL_LEN: usize = 9;
/// URI scheme recognised when a code arrives as a deep link
pub const CODE_URI_SCHEME: &str = "paydesk";
/// Raw submissions longer than this are rejected outright
pub const MAX_RAW_CODE_LEN: usize = 100;

// Session lifecycle
/// Session time-to-live
pub const SESSION_TTL_SECS: u64 = 600; // 10 minutes
/// Interval between proactive expiry sweeps
pub const SESSION_SWEEP_INTERVAL_SECS: u64 = 60;
/// Consecutive invalid inputs before a flow escalates back to the menu
pub const MAX_FLOW_RETRIES: u32 = 3;

// Rate limiting
/// Counting window for consecutive invalid code attempts
pub const RATE_WINDOW_SECS: u64 = 300; // 5 minutes
/// Invalid attempts within the window before lockout
pub const MAX_CODE_ATTEMPTS: u32 = 3;
/// Lockout duration once the threshold is reached
pub const LOCKOUT_SECS: u64 = 900; // 15 minutes
/// Idle period after which a rate-limit record is collected
pub const RATE_IDLE_GC_SECS: u64 = 3600; // 1 hour
/// Interval between rate-limit GC sweeps
pub const RATE_SWEEP_INTERVAL_SECS: u64 = 600;

// Upstream code resolution
/// Timeout for one resolution call
pub const RESOLVE_TIMEOUT_SECS: u64 = 10;
/// TTL for cached resolutions
pub const RESOLVE_CACHE_TTL_SECS: u64 = 60;
/// Maximum cached resolutions
pub const RESOLVE_CACHE_MAX_SIZE: u64 = 1000;

// Outbound send retry
/// Initial backoff for outbound send retries
pub const SEND_INITIAL_BACKOFF_MS: u64 = 500;
/// Backoff ceiling for outbound send retries
pub const SEND_MAX_BACKOFF_MS: u64 = 4000;
/// Maximum outbound send attempts after the first
pub const SEND_MAX_RETRIES: usize = 3;

/// Get session TTL from env or default.
///
/// Environment variable: `SESSION_TTL_SECS`.
#[must_use]
pub fn get_session_ttl_secs() -> u64 {
    env_u64("SESSION_TTL_SECS", SESSION_TTL_SECS)
}

/// Get session sweep interval from env or default.
///
/// Environment variable: `SESSION_SWEEP_INTERVAL_SECS`.
#[must_use]
pub fn get_session_sweep_interval_secs() -> u64 {
    env_u64("SESSION_SWEEP_INTERVAL_SECS", SESSION_SWEEP_INTERVAL_SECS)
}

/// Get the rate-limit counting window from env or default.
///
/// Environment variable: `RATE_WINDOW_SECS`.
#[must_use]
pub fn get_rate_window_secs() -> u64 {
    env_u64("RATE_WINDOW_SECS", RATE_WINDOW_SECS)
}

/// Get the invalid-attempt threshold from env or default.
///
/// Environment variable: `MAX_CODE_ATTEMPTS`.
#[must_use]
pub fn get_max_code_attempts() -> u32 {
    std::env::var("MAX_CODE_ATTEMPTS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(MAX_CODE_ATTEMPTS)
}

/// Get the lockout duration from env or default.
///
/// Environment variable: `LOCKOUT_SECS`.
#[must_use]
pub fn get_lockout_secs() -> u64 {
    env_u64("LOCKOUT_SECS", LOCKOUT_SECS)
}

/// Get the rate-limit idle-GC horizon from env or default.
///
/// Environment variable: `RATE_IDLE_GC_SECS`.
#[must_use]
pub fn get_rate_idle_gc_secs() -> u64 {
    env_u64("RATE_IDLE_GC_SECS", RATE_IDLE_GC_SECS)
}

/// Get the rate-limit sweep interval from env or default.
///
/// Environment variable: `RATE_SWEEP_INTERVAL_SECS`.
#[must_use]
pub fn get_rate_sweep_interval_secs() -> u64 {
    env_u64("RATE_SWEEP_INTERVAL_SECS", RATE_SWEEP_INTERVAL_SECS)
}

/// Get the per-flow retry ceiling from env or default.
///
/// Environment variable: `MAX_FLOW_RETRIES`.
#[must_use]
pub fn get_max_flow_retries() -> u32 {
    std::env::var("MAX_FLOW_RETRIES")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(MAX_FLOW_RETRIES)
}

/// Get the resolution-call timeout from env or default.
///
/// Environment variable: `RESOLVE_TIMEOUT_SECS`.
#[must_use]
pub fn get_resolve_timeout_secs() -> u64 {
    env_u64("RESOLVE_TIMEOUT_SECS", RESOLVE_TIMEOUT_SECS)
}

/// Whether the reset keyword matches as a substring instead of the whole
/// trimmed message.
///
/// Environment variable: `GREETING_SUBSTRING_MATCH` (`1`/`true` to enable).
#[must_use]
pub fn get_greeting_substring_match() -> bool {
    std::env::var("GREETING_SUBSTRING_MATCH")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

fn env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_override_and_default() {
        std::env::remove_var("SESSION_TTL_SECS");
        assert_eq!(get_session_ttl_secs(), SESSION_TTL_SECS);

        std::env::set_var("SESSION_TTL_SECS", "42");
        assert_eq!(get_session_ttl_secs(), 42);
        std::env::remove_var("SESSION_TTL_SECS");
    }

    #[test]
    fn test_bad_env_value_falls_back() {
        std::env::set_var("LOCKOUT_SECS", "not-a-number");
        assert_eq!(get_lockout_secs(), LOCKOUT_SECS);
        std::env::remove_var("LOCKOUT_SECS");
    }

    #[test]
    fn test_greeting_substring_flag() {
        std::env::remove_var("GREETING_SUBSTRING_MATCH");
        assert!(!get_greeting_substring_match());

        std::env::set_var("GREETING_SUBSTRING_MATCH", "true");
        assert!(get_greeting_substring_match());
        std::env::remove_var("GREETING_SUBSTRING_MATCH");
    }
}
