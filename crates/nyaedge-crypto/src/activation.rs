//! Activation proof sent by the control plane to a node's ping service.
//!
//! `hash = hex(SHA-256(nonce ‖ secret ‖ timestamp))`, where `timestamp` is
//! RFC 3339 UTC with second precision. The proof is never persisted; it
//! lives for the duration of one activation attempt.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::{constant_time_eq, sha256_hex};

/// Default freshness window a node applies to an incoming proof.
pub const DEFAULT_MAX_SKEW_SECS: i64 = 300;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationProof {
    pub nonce: String,
    pub timestamp: String,
    pub hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActivationProofError {
    #[error("activation hash does not match")]
    HashMismatch,

    #[error("invalid activation timestamp: {0}")]
    BadTimestamp(String),

    #[error("activation timestamp is {skew_secs}s away from local time")]
    Stale { skew_secs: i64 },
}

/// Compute the activation hash for a nonce/secret/timestamp triple.
pub fn activation_hash(nonce: &str, secret: &str, timestamp: &str) -> String {
    let mut salted = String::with_capacity(nonce.len() + secret.len() + timestamp.len());
    salted.push_str(nonce);
    salted.push_str(secret);
    salted.push_str(timestamp);
    sha256_hex(salted.as_bytes())
}

impl ActivationProof {
    /// Build a proof for `secret` stamped at `at`.
    pub fn new(nonce: String, secret: &str, at: DateTime<Utc>) -> Self {
        let timestamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);
        let hash = activation_hash(&nonce, secret, &timestamp);
        Self {
            nonce,
            timestamp,
            hash,
        }
    }

    /// Node-side check: the hash matches `secret` and the timestamp is
    /// within `max_skew` of `now`.
    pub fn verify(
        &self,
        secret: &str,
        now: DateTime<Utc>,
        max_skew: Duration,
    ) -> Result<(), ActivationProofError> {
        let expected = activation_hash(&self.nonce, secret, &self.timestamp);
        if !constant_time_eq(&expected, &self.hash) {
            return Err(ActivationProofError::HashMismatch);
        }

        let stamped = DateTime::parse_from_rfc3339(&self.timestamp)
            .map_err(|e| ActivationProofError::BadTimestamp(e.to_string()))?
            .with_timezone(&Utc);
        let skew = (now - stamped).num_seconds().abs();
        if skew > max_skew.num_seconds() {
            return Err(ActivationProofError::Stale { skew_secs: skew });
        }
        Ok(())
    }
}
