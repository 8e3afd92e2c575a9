//! Audience-scoped, time-boxed signed tokens.
//!
//! Tokens are HS256 JWTs signed under a process-wide [`SigningKey`]. The
//! payload carries `aud`, `iat`, `exp` and the typed claims under `data`.
//!
//! Verification order is fixed: algorithm, signature, expiry, audience.
//! Expiry has no leeway. A token minted for one [`Audience`] is never
//! accepted for another, even with a valid signature.

use chrono::Utc;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::digest::{hex_decode, hex_encode};

/// Lifetime of a challenge token.
pub const CHALLENGE_TTL_SECS: i64 = 300;

/// Lifetime of a session token.
pub const SESSION_TTL_SECS: i64 = 86_400;

/// Minimum accepted signing key length in bytes.
pub const MIN_KEY_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    #[error("malformed token: {0}")]
    Malformed(String),

    #[error("token signature does not match")]
    InvalidSignature,

    #[error("token expired")]
    Expired,

    #[error("token audience mismatch: expected {expected}")]
    AudienceMismatch { expected: String },

    #[error("token encoding failed: {0}")]
    Encoding(String),

    #[error("signing key too short: {0} bytes (minimum {MIN_KEY_LEN})")]
    WeakKey(usize),
}

// ── Signing key ─────────────────────────────────────────────────────

/// HMAC key shared by every token the process issues.
///
/// Constructed once at startup and handed to [`TokenIssuer::new`]; never
/// rotated while the process runs. Zeroized on drop.
pub struct SigningKey {
    bytes: Vec<u8>,
}

impl SigningKey {
    /// Fresh key from the OS CSPRNG.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = vec![0u8; MIN_KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, TokenError> {
        if bytes.len() < MIN_KEY_LEN {
            return Err(TokenError::WeakKey(bytes.len()));
        }
        Ok(Self { bytes })
    }

    pub fn from_hex(hex: &str) -> Result<Self, TokenError> {
        let bytes = hex_decode(hex)
            .ok_or_else(|| TokenError::Encoding("signing key is not valid hex".into()))?;
        Self::from_bytes(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex_encode(&self.bytes)
    }

    fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for SigningKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("len", &self.bytes.len())
            .finish_non_exhaustive()
    }
}

// ── Audience + claims ───────────────────────────────────────────────

/// Protocol purpose a token is restricted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Audience {
    /// Short-lived challenge a node signs to prove secret possession.
    NodeChallenge,
    /// Session credential authorizing node API calls.
    Node,
}

impl Audience {
    pub fn as_str(&self) -> &'static str {
        match self {
            Audience::NodeChallenge => "node-challenge",
            Audience::Node => "node",
        }
    }

    /// Lifetime used for tokens of this audience.
    pub fn ttl_secs(&self) -> i64 {
        match self {
            Audience::NodeChallenge => CHALLENGE_TTL_SECS,
            Audience::Node => SESSION_TTL_SECS,
        }
    }
}

impl std::fmt::Display for Audience {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by both challenge and session tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeClaims {
    #[serde(rename = "nodeId")]
    pub node_id: String,
}

impl NodeClaims {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
        }
    }
}

// ── Wire structures ─────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct Payload<C> {
    aud: String,
    iat: i64,
    exp: i64,
    data: C,
}

/// Result of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verified<C> {
    pub claims: C,
    pub issued_at: i64,
    pub expires_at: i64,
}

// ── Issuer ──────────────────────────────────────────────────────────

/// Mints and verifies signed tokens.
///
/// Read-only after construction, so a single instance is shared across
/// request handlers without synchronization.
#[derive(Debug)]
pub struct TokenIssuer {
    key: SigningKey,
}

impl TokenIssuer {
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// Issue a token for `audience` expiring `ttl_secs` from now.
    pub fn issue<C: Serialize>(
        &self,
        claims: &C,
        audience: Audience,
        ttl_secs: i64,
    ) -> Result<String, TokenError> {
        self.issue_at(claims, audience, ttl_secs, Utc::now().timestamp())
    }

    /// Issue with an explicit issuance time (unix seconds).
    pub fn issue_at<C: Serialize>(
        &self,
        claims: &C,
        audience: Audience,
        ttl_secs: i64,
        now: i64,
    ) -> Result<String, TokenError> {
        let payload = Payload {
            aud: audience.as_str().to_string(),
            iat: now,
            exp: now.saturating_add(ttl_secs),
            data: claims,
        };
        encode(
            &Header::new(Algorithm::HS256),
            &payload,
            &EncodingKey::from_secret(self.key.as_bytes()),
        )
        .map_err(|e| TokenError::Encoding(e.to_string()))
    }

    /// Verify `token` against `expected` audience and return its claims.
    pub fn verify<C: DeserializeOwned>(
        &self,
        token: &str,
        expected: Audience,
    ) -> Result<C, TokenError> {
        self.verify_full(token, expected).map(|v| v.claims)
    }

    /// Verify and also report the token's validity window.
    pub fn verify_full<C: DeserializeOwned>(
        &self,
        token: &str,
        expected: Audience,
    ) -> Result<Verified<C>, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_audience(&[expected.as_str()]);
        validation.set_required_spec_claims(&["exp", "aud"]);

        let data = decode::<Payload<C>>(
            token,
            &DecodingKey::from_secret(self.key.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::ExpiredSignature => TokenError::Expired,
            ErrorKind::InvalidAudience => TokenError::AudienceMismatch {
                expected: expected.as_str().to_string(),
            },
            _ => TokenError::Malformed(e.to_string()),
        })?;

        Ok(Verified {
            claims: data.claims.data,
            issued_at: data.claims.iat,
            expires_at: data.claims.exp,
        })
    }
}
