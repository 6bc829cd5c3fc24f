//! The validation pipeline: cleaning, shape checks, suspicious-pattern
//! pricing, replay detection and attempt accounting.

use super::patterns;
use super::rate_limit::{RateLimitRecord, RateLimitStore};
use super::{CodeError, FormatIssue, SecurityIssue};
use crate::config;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{info, warn};

/// Validates pay-codes and enforces per-user attempt limits.
pub struct CodeValidator {
    store: Arc<dyn RateLimitStore>,
    window: Duration,
    lockout: Duration,
    threshold: u32,
}

impl CodeValidator {
    /// Build a validator over the given record store using configured
    /// window/lockout/threshold tunables.
    #[must_use]
    pub fn new(store: Arc<dyn RateLimitStore>) -> Self {
        Self {
            store,
            window: Duration::seconds(config::get_rate_window_secs() as i64),
            lockout: Duration::seconds(config::get_lockout_secs() as i64),
            threshold: config::get_max_code_attempts(),
        }
    }

    /// Validate a raw submission for `user_id` at the current time.
    ///
    /// # Errors
    ///
    /// Returns a [`CodeError`] describing the rejection; see
    /// [`Self::validate_at`] for the check order.
    pub async fn validate(&self, user_id: &str, raw: &str) -> Result<String, CodeError> {
        self.validate_at(user_id, raw, Utc::now()).await
    }

    /// Validate a raw submission at an explicit instant (tests drive
    /// simulated clocks through this).
    ///
    /// Checks run in a fixed order: lockout, window reset, emptiness,
    /// prefix presence, prefix spelling, total length, digit shape,
    /// suspicious-pattern denylist (prices the attempt at 2 instead
    /// of 1), replay, raw-length cap. Every rejection except the lockout
    /// path increments the attempt counter; reaching the threshold
    /// converts the rejection into a lockout notice. Success zeroes the
    /// counter and records the code for replay detection.
    ///
    /// # Errors
    ///
    /// Returns a [`CodeError`] for any rejected submission.
    pub async fn validate_at(
        &self,
        user_id: &str,
        raw: &str,
        now: DateTime<Utc>,
    ) -> Result<String, CodeError> {
        let mut rec = self
            .store
            .get(user_id)
            .await
            .unwrap_or_else(|| RateLimitRecord::new(user_id, now));

        // Lockout short-circuits with no attempt increment
        if let Some(minutes_left) = rec.lockout_minutes_left(now) {
            return Err(CodeError::RateLimited { minutes_left });
        }
        if rec.locked_until.is_some() {
            // Lockout observed expired: counting starts fresh, but the
            // last accepted code stays until the record is collected
            rec.locked_until = None;
            rec.attempts = 0;
        }

        // Idle past the window resets the count
        if rec.attempts > 0 && now - rec.last_attempt_at > self.window {
            rec.attempts = 0;
        }

        match Self::check_format(raw, rec.last_accepted_code.as_deref()) {
            Ok(code) => {
                rec.attempts = 0;
                rec.last_attempt_at = now;
                rec.last_accepted_code = Some(code.clone());
                self.store.put(rec).await;
                Ok(code)
            }
            Err((err, penalty)) => {
                if rec.attempts == 0 {
                    rec.window_started_at = now;
                }
                rec.attempts += penalty;
                rec.last_attempt_at = now;

                if rec.attempts >= self.threshold {
                    rec.locked_until = Some(now + self.lockout);
                    let minutes_left = rec.lockout_minutes_left(now).unwrap_or(0);
                    warn!(
                        user_id = %rec.user_id,
                        attempts = rec.attempts,
                        "Code attempt threshold reached, locking out"
                    );
                    self.store.put(rec).await;
                    return Err(CodeError::RateLimited { minutes_left });
                }

                self.store.put(rec).await;
                Err(err)
            }
        }
    }

    /// Shape and security checks on one submission. Returns the canonical
    /// code, or the rejection plus its attempt price.
    fn check_format(
        raw: &str,
        last_accepted: Option<&str>,
    ) -> Result<String, (CodeError, u32)> {
        let Some(cleaned) = patterns::clean(raw) else {
            return Err((FormatIssue::Empty.into(), 1));
        };

        let all_digits = cleaned.chars().all(|c| c.is_ascii_digit());
        if all_digits && cleaned.len() == config::CODE_DIGITS {
            return Err((FormatIssue::MissingPrefix { digits: cleaned }.into(), 1));
        }

        if !cleaned.starts_with(config::CODE_PREFIX) {
            return Err((FormatIssue::WrongPrefix.into(), 1));
        }

        if cleaned.len() != config::CODE_TOTAL_LEN {
            return Err((FormatIssue::WrongLength.into(), 1));
        }

        let digits = &cleaned[config::CODE_PREFIX.len()..];
        if !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err((FormatIssue::BadDigits.into(), 1));
        }

        // A denylist hit prices the attempt at 2 but is otherwise an
        // ordinary format rejection
        if patterns::is_suspicious_digits(digits) {
            return Err((FormatIssue::Suspicious.into(), 2));
        }

        if last_accepted == Some(cleaned.as_str()) {
            return Err((SecurityIssue::Replay.into(), 1));
        }

        if raw.chars().count() > config::MAX_RAW_CODE_LEN {
            return Err((SecurityIssue::Oversized.into(), 1));
        }

        Ok(cleaned)
    }

    /// Minutes left on an active lockout for `user_id`, if any.
    pub async fn lockout_minutes_left_at(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> Option<i64> {
        self.store
            .get(user_id)
            .await
            .and_then(|rec| rec.lockout_minutes_left(now))
    }

    /// Drop the replay guard for `user_id`, allowing the last accepted
    /// code to be resubmitted. Used when resolution of a just-validated
    /// code fails with a retryable upstream outcome.
    pub async fn forget_accepted(&self, user_id: &str) {
        if let Some(mut rec) = self.store.get(user_id).await {
            if rec.last_accepted_code.take().is_some() {
                info!(user_id = %rec.user_id, "Cleared replay guard after retryable resolution failure");
                self.store.put(rec).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codes::InMemoryRateLimitStore;

    fn at(secs: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000 + secs, 0).expect("valid timestamp")
    }

    fn validator() -> CodeValidator {
        CodeValidator::new(Arc::new(InMemoryRateLimitStore::new()))
    }

    #[tokio::test]
    async fn test_decorated_raw_forms_normalize() {
        let v = validator();
        for (i, raw) in [
            "PAY135790",
            "pay 135-790",
            "Pay.135.790",
            "  pAy 135 790  ",
        ]
        .iter()
        .enumerate()
        {
            // Distinct users so the replay guard does not interfere
            let user = format!("u{i}");
            let code = v
                .validate_at(&user, raw, at(0))
                .await
                .expect("canonical form should validate");
            assert_eq!(code, "PAY135790");
        }
    }

    #[tokio::test]
    async fn test_bare_digits_get_prefix_correction() {
        let v = validator();
        let err = v.validate_at("u1", "135790", at(0)).await.unwrap_err();
        assert_eq!(
            err,
            CodeError::FormatInvalid(FormatIssue::MissingPrefix {
                digits: "135790".into()
            })
        );
    }

    #[tokio::test]
    async fn test_wrong_shapes() {
        let v = validator();
        assert_eq!(
            v.validate_at("u1", "QRS135790", at(0)).await.unwrap_err(),
            CodeError::FormatInvalid(FormatIssue::WrongPrefix)
        );
        assert_eq!(
            v.validate_at("u2", "PAY13579", at(0)).await.unwrap_err(),
            CodeError::FormatInvalid(FormatIssue::WrongLength)
        );
        assert_eq!(
            v.validate_at("u3", "PAY13579A", at(0)).await.unwrap_err(),
            CodeError::FormatInvalid(FormatIssue::BadDigits)
        );
        assert_eq!(
            v.validate_at("u4", "", at(0)).await.unwrap_err(),
            CodeError::FormatInvalid(FormatIssue::Empty)
        );
    }

    #[tokio::test]
    async fn test_replay_rejected() {
        let v = validator();
        assert!(v.validate_at("u1", "PAY135790", at(0)).await.is_ok());
        assert_eq!(
            v.validate_at("u1", "PAY135790", at(1)).await.unwrap_err(),
            CodeError::SecurityRejected(SecurityIssue::Replay)
        );
        // A different valid code is still fine
        assert!(v.validate_at("u1", "PAY246813", at(2)).await.is_ok());
    }

    #[tokio::test]
    async fn test_oversized_rejected() {
        let v = validator();
        // Cleans to a valid code, but the raw form blows the sanity cap
        let raw = format!("PAY135790{}", " ".repeat(200));
        assert_eq!(
            v.validate_at("u1", &raw, at(0)).await.unwrap_err(),
            CodeError::SecurityRejected(SecurityIssue::Oversized)
        );
    }

    #[tokio::test]
    async fn test_threshold_locks_out_and_expires() {
        let v = validator();

        for i in 0..2 {
            let err = v.validate_at("u1", "junk", at(i)).await.unwrap_err();
            assert!(matches!(err, CodeError::FormatInvalid(_)));
        }
        // Third failure reaches the threshold: the rejection becomes a
        // lockout notice with the full duration
        let err = v.validate_at("u1", "junk", at(2)).await.unwrap_err();
        assert_eq!(err, CodeError::RateLimited { minutes_left: 15 });

        // Even a valid code is rejected while locked, without increment
        let err = v.validate_at("u1", "PAY135790", at(60)).await.unwrap_err();
        assert_eq!(err, CodeError::RateLimited { minutes_left: 15 });

        // Once the lockout elapses, a valid code goes through
        let after = at(2 + 901);
        assert!(v.validate_at("u1", "PAY135790", after).await.is_ok());
    }

    #[tokio::test]
    async fn test_suspicious_code_costs_two_attempts() {
        let v = validator();

        // One suspicious (2) plus one ordinary failure (1) reaches the
        // threshold of 3
        assert_eq!(
            v.validate_at("u1", "PAY111111", at(0)).await.unwrap_err(),
            CodeError::FormatInvalid(FormatIssue::Suspicious)
        );
        let err = v.validate_at("u1", "junk", at(1)).await.unwrap_err();
        assert_eq!(err, CodeError::RateLimited { minutes_left: 15 });
    }

    #[tokio::test]
    async fn test_window_reset_clears_count() {
        let v = validator();

        assert!(v.validate_at("u1", "junk", at(0)).await.is_err());
        assert!(v.validate_at("u1", "junk", at(1)).await.is_err());

        // Idle past the 5-minute window: the count restarts, so two more
        // failures do not lock out
        assert!(matches!(
            v.validate_at("u1", "junk", at(302)).await.unwrap_err(),
            CodeError::FormatInvalid(_)
        ));
        assert!(matches!(
            v.validate_at("u1", "junk", at(303)).await.unwrap_err(),
            CodeError::FormatInvalid(_)
        ));
    }

    #[tokio::test]
    async fn test_replay_guard_survives_lockout_expiry() {
        let v = validator();

        assert!(v.validate_at("u1", "PAY135790", at(0)).await.is_ok());
        for i in 1..=3 {
            let _ = v.validate_at("u1", "junk", at(i)).await;
        }
        // Lockout expired; replaying the previously accepted code is
        // still rejected
        let err = v
            .validate_at("u1", "PAY135790", at(3 + 901))
            .await
            .unwrap_err();
        assert_eq!(err, CodeError::SecurityRejected(SecurityIssue::Replay));
    }

    #[tokio::test]
    async fn test_forget_accepted_allows_resubmission() {
        let v = validator();
        assert!(v.validate_at("u1", "PAY135790", at(0)).await.is_ok());
        v.forget_accepted("u1").await;
        assert!(v.validate_at("u1", "PAY135790", at(1)).await.is_ok());
    }
}
