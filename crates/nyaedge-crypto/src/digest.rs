//! SHA-256 / HMAC-SHA256 digests and constant-time comparison.
//!
//! A node proves possession of its secret by returning
//! `hex(HMAC-SHA256(key = secret, message = challenge))`. Comparisons of
//! anything derived from a secret go through [`constant_time_eq`].

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    hex_encode(&Sha256::digest(data))
}

/// Lowercase hex HMAC-SHA256 of `message` under `key`.
pub fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    hex_encode(&hmac_sha256(key, message))
}

fn hmac_sha256(key: &[u8], message: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length.
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .unwrap_or_else(|_| unreachable!("HMAC-SHA256 takes keys of any length"));
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Signature a node must present for `challenge`.
pub fn challenge_signature(challenge: &str, secret: &str) -> String {
    hmac_sha256_hex(secret.as_bytes(), challenge.as_bytes())
}

/// Check a presented challenge signature in constant time.
pub fn verify_challenge_signature(challenge: &str, secret: &str, signature: &str) -> bool {
    constant_time_eq(&challenge_signature(challenge, secret), signature)
}

/// Compare two strings in constant time with respect to their contents.
///
/// Length is not secret: differing lengths return `false` immediately.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let a_bytes = a.as_bytes();
    let b_bytes = b.as_bytes();

    if a_bytes.len() != b_bytes.len() {
        return false;
    }

    a_bytes.ct_eq(b_bytes).into()
}

pub fn hex_encode(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}

/// Decode a hex string (either case). Returns `None` on odd length or a
/// non-hex character.
pub fn hex_decode(s: &str) -> Option<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(s.get(i..i + 2)?, 16).ok())
        .collect()
}
