//! Pay-code validation subsystem.
//!
//! Turns arbitrary user text into either a canonical pay-code or a typed
//! rejection, while tracking and enforcing per-user abuse limits. Every
//! path returns a discriminated result; no panic or raw error crosses the
//! module boundary.

pub mod patterns;
pub mod rate_limit;
pub mod validator;

pub use rate_limit::{InMemoryRateLimitStore, RateLimitRecord, RateLimitStore};
pub use validator::CodeValidator;

use thiserror::Error;

/// Typed rejection from code validation.
///
/// All variants are non-fatal and map to a user-facing corrective
/// message at the flow boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodeError {
    /// Too many invalid attempts; submissions are rejected until expiry.
    #[error("code entry locked for {minutes_left} more minute(s)")]
    RateLimited {
        /// Whole minutes until the lockout expires, rounded up.
        minutes_left: i64,
    },
    /// Input does not match the expected code shape.
    #[error("invalid code format: {0}")]
    FormatInvalid(#[from] FormatIssue),
    /// Replayed or oversized input; correctable with a fresh code.
    #[error("code rejected: {0}")]
    SecurityRejected(#[from] SecurityIssue),
}

/// The specific way an input failed the format checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormatIssue {
    /// Nothing left after cleaning.
    #[error("empty after cleaning")]
    Empty,
    /// A bare digit run with the prefix missing.
    #[error("missing prefix before digits {digits}")]
    MissingPrefix {
        /// The six digits the user sent, used to suggest the canonical form.
        digits: String,
    },
    /// Input does not start with the canonical prefix.
    #[error("wrong prefix")]
    WrongPrefix,
    /// Cleaned input is not the canonical length.
    #[error("wrong length")]
    WrongLength,
    /// The section after the prefix is not all digits.
    #[error("digit section malformed")]
    BadDigits,
    /// Digit section matches the suspicious-pattern denylist.
    #[error("suspicious digit pattern")]
    Suspicious,
}

/// The specific way an input failed the security checks.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SecurityIssue {
    /// Identical to the most recently accepted code for this user.
    #[error("code already redeemed")]
    Replay,
    /// Raw input exceeds the sanity cap.
    #[error("input too long")]
    Oversized,
}
