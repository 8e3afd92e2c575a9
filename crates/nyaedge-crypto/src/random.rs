//! Random ASCII strings for node secrets and activation nonces.

use rand::rngs::OsRng;
use rand::Rng;

/// Alphabet every secret and nonce is drawn from.
pub const SECRET_ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Length of node secrets and activation nonces.
pub const SECRET_LEN: usize = 32;

/// Source of random strings over [`SECRET_ALPHABET`].
///
/// Shared by the node registry (secrets) and the activation verifier
/// (nonces) so tests can substitute a deterministic source.
pub trait RandomStringSource: Send + Sync {
    /// Return `len` characters drawn uniformly from [`SECRET_ALPHABET`].
    fn random_string(&self, len: usize) -> String;
}

/// Production source backed by the OS CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsRandomSource;

impl RandomStringSource for OsRandomSource {
    fn random_string(&self, len: usize) -> String {
        let mut rng = OsRng;
        (0..len)
            .map(|_| SECRET_ALPHABET[rng.gen_range(0..SECRET_ALPHABET.len())] as char)
            .collect()
    }
}

/// Generate a fresh node secret.
pub fn generate_secret<R: RandomStringSource + ?Sized>(source: &R) -> String {
    source.random_string(SECRET_LEN)
}

/// Generate a fresh activation nonce.
pub fn generate_nonce<R: RandomStringSource + ?Sized>(source: &R) -> String {
    source.random_string(SECRET_LEN)
}
