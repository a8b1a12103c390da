//! Rotating approver signature codes.
//!
//! # Responsibility
//! - Derive the displayed payload `"<secret>-<epoch>"` where
//!   `epoch = floor(now_ms / 30000)`.
//! - Decide whether a scanned payload counts as an approver signature.
//!
//! # Invariants
//! - `accepts_scanned_payload` checks only the static secret prefix; a
//!   captured payload stays valid forever. `verify_payload_strict` is the
//!   epoch-checking alternative and is not used by the signing path.
//! - An empty secret accepts nothing.

use chrono::{DateTime, Utc};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Rotation period of the displayed code.
pub const SIGNATURE_PERIOD_MS: i64 = 30_000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureError {
    UnrecognizedPayload,
}

impl Display for SignatureError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnrecognizedPayload => write!(f, "scanned code is not a valid signature"),
        }
    }
}

impl Error for SignatureError {}

/// Rotation counter for `now`.
pub fn signature_epoch(now: DateTime<Utc>) -> i64 {
    now.timestamp_millis().div_euclid(SIGNATURE_PERIOD_MS)
}

/// Payload to display as the current signature code.
pub fn signature_payload(secret: &str, now: DateTime<Utc>) -> String {
    format!("{secret}-{}", signature_epoch(now))
}

/// Whole seconds until the displayed code rotates, in `1..=30`.
pub fn seconds_until_rotation(now: DateTime<Utc>) -> u32 {
    let elapsed = now.timestamp_millis().rem_euclid(SIGNATURE_PERIOD_MS);
    let remaining_ms = SIGNATURE_PERIOD_MS - elapsed;
    ((remaining_ms + 999) / 1000) as u32
}

/// Scanner-side acceptance: the payload starts with the secret.
pub fn accepts_scanned_payload(secret: &str, scanned: &str) -> bool {
    !secret.is_empty() && scanned.starts_with(secret)
}

/// Stricter check: exact `"<secret>-<epoch>"` with the epoch no more than
/// `tolerance_epochs` periods away from `now`.
pub fn verify_payload_strict(
    secret: &str,
    scanned: &str,
    now: DateTime<Utc>,
    tolerance_epochs: i64,
) -> bool {
    if secret.is_empty() {
        return false;
    }
    let Some(suffix) = scanned
        .strip_prefix(secret)
        .and_then(|rest| rest.strip_prefix('-'))
    else {
        return false;
    };
    match suffix.parse::<i64>() {
        Ok(epoch) => (signature_epoch(now) - epoch).abs() <= tolerance_epochs,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        accepts_scanned_payload, seconds_until_rotation, signature_epoch, signature_payload,
        verify_payload_strict,
    };
    use chrono::{DateTime, Duration, Utc};

    fn at_ms(ms: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(ms).expect("valid timestamp")
    }

    #[test]
    fn payload_uses_thirty_second_epoch() {
        let now = at_ms(1_700_000_015_000);
        assert_eq!(signature_epoch(now), 56_666_667);
        assert_eq!(signature_payload("SECRET", now), "SECRET-56666667");
    }

    #[test]
    fn countdown_resets_on_boundary() {
        assert_eq!(seconds_until_rotation(at_ms(30_000)), 30);
        assert_eq!(seconds_until_rotation(at_ms(59_500)), 1);
        assert_eq!(seconds_until_rotation(at_ms(45_000)), 15);
    }

    #[test]
    fn scanner_accepts_stale_codes_with_matching_prefix() {
        let old = signature_payload("SECRET", at_ms(0));
        assert!(accepts_scanned_payload("SECRET", &old));
        assert!(accepts_scanned_payload("SECRET", "SECRET-anything"));
        assert!(!accepts_scanned_payload("SECRET", "OTHER-1"));
        assert!(!accepts_scanned_payload("", "whatever"));
    }

    #[test]
    fn strict_verifier_rejects_stale_codes() {
        let issued = at_ms(1_700_000_000_000);
        let payload = signature_payload("SECRET", issued);
        assert!(verify_payload_strict("SECRET", &payload, issued, 1));
        assert!(verify_payload_strict(
            "SECRET",
            &payload,
            issued + Duration::seconds(30),
            1
        ));
        assert!(!verify_payload_strict(
            "SECRET",
            &payload,
            issued + Duration::minutes(5),
            1
        ));
        assert!(!verify_payload_strict("SECRET", "SECRET-x", issued, 1));
    }
}
