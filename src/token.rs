//! Token records and the expiry policy that decides whether one may be used.
//!
//! A [`TokenRecord`] keeps its timestamps exactly as the identity service
//! issued them. Validity is never stored; it is computed on every read by
//! [`ExpiryPolicy::is_valid`] against a [`Clock`].

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

/// Default time subtracted from the nominal expiry (3 minutes).
pub const DEFAULT_SAFETY_MARGIN_SECONDS: u64 = 180;

/// Default correction applied to the service's expiry timestamp before comparison.
///
/// Timestamps are parsed timezone-aware, so no correction is needed unless the
/// service stamps local time with a UTC designator.
pub const DEFAULT_EXPIRY_OFFSET_SECONDS: i64 = 0;

/// Upper bound for the safety margin and for the magnitude of the expiry offset (one year).
pub const MAX_POLICY_SECONDS: i64 = 366 * 24 * 60 * 60;

/// Naive form used by the identity service, e.g. `2017-05-02T09:11:58.198526Z`
/// without a trailing designator.
const NAIVE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// A cached proof of authentication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    /// Bearer credential sent as `X-Auth-Token`.
    pub secret: String,
    pub issued_at: Option<String>,
    pub expires_at: Option<String>,
}

impl TokenRecord {
    pub fn new(secret: String, issued_at: Option<String>, expires_at: Option<String>) -> Self {
        Self {
            secret,
            issued_at,
            expires_at,
        }
    }

    /// Build a record from typed timestamps, formatted the way the identity service formats them.
    pub fn with_validity(secret: &str, issued_at: DateTime<Utc>, expires_at: DateTime<Utc>) -> Self {
        Self::new(
            secret.to_string(),
            Some(format_timestamp(&issued_at)),
            Some(format_timestamp(&expires_at)),
        )
    }

    /// Parsed expiry, or `None` when it is absent or malformed.
    pub fn expires_at_utc(&self) -> Option<DateTime<Utc>> {
        let raw = self.expires_at.as_deref()?;
        let parsed = parse_timestamp(raw);
        if parsed.is_none() {
            warn!("Malformed expires_at {:?}, treating token as expired", raw);
        }
        parsed
    }
}

/// Parse an identity service timestamp.
///
/// Accepts RFC 3339 (with `Z` or an explicit offset) and the naive form, which is read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw.trim_end_matches('Z'), NAIVE_TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

pub fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%dT%H:%M:%S%.6fZ").to_string()
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error("safety margin must be at most {max} seconds, got {0}", max = MAX_POLICY_SECONDS)]
    SafetyMarginOutOfRange(u64),
    #[error("expiry offset must be within +/-{max} seconds, got {0}", max = MAX_POLICY_SECONDS)]
    ExpiryOffsetOutOfRange(i64),
}

/// Decides whether a token may still be handed to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiryPolicy {
    safety_margin: Duration,
    reference_offset: Duration,
}

impl Default for ExpiryPolicy {
    fn default() -> Self {
        Self {
            safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECONDS as i64),
            reference_offset: Duration::seconds(DEFAULT_EXPIRY_OFFSET_SECONDS),
        }
    }
}

impl ExpiryPolicy {
    pub fn new(
        safety_margin_seconds: u64,
        reference_offset_seconds: i64,
    ) -> Result<Self, PolicyError> {
        let safety_margin = i64::try_from(safety_margin_seconds)
            .ok()
            .filter(|seconds| *seconds <= MAX_POLICY_SECONDS)
            .and_then(Duration::try_seconds)
            .ok_or(PolicyError::SafetyMarginOutOfRange(safety_margin_seconds))?;
        let reference_offset = Some(reference_offset_seconds)
            .filter(|seconds| seconds.unsigned_abs() <= MAX_POLICY_SECONDS as u64)
            .and_then(Duration::try_seconds)
            .ok_or(PolicyError::ExpiryOffsetOutOfRange(reference_offset_seconds))?;

        Ok(Self {
            safety_margin,
            reference_offset,
        })
    }

    pub fn from_configuration(
        configuration: &crate::configuration::Configuration,
    ) -> Result<Self, PolicyError> {
        Self::new(
            configuration.safety_margin_seconds(),
            configuration.expiry_offset_seconds(),
        )
    }

    /// The instant after which the record is no longer handed out.
    ///
    /// `None` when `expires_at` is absent, malformed, or too close to the end
    /// of the representable range to be adjusted.
    pub fn deadline(&self, record: &TokenRecord) -> Option<DateTime<Utc>> {
        let expires_at = record.expires_at_utc()?;
        let deadline = expires_at
            .checked_add_signed(self.reference_offset)
            .and_then(|adjusted| adjusted.checked_sub_signed(self.safety_margin));
        if deadline.is_none() {
            debug!("expires_at {} is out of range, treating token as expired", expires_at);
        }
        deadline
    }

    pub fn is_valid(&self, record: &TokenRecord, now: DateTime<Utc>) -> bool {
        match self.deadline(record) {
            Some(deadline) => now < deadline,
            None => false,
        }
    }
}
