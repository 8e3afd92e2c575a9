//! Nyaedge Crypto: primitives behind the node trust handshakes.
//!
//! Provides the random secret/nonce source, JWT-backed audience-scoped
//! tokens, challenge signatures with constant-time comparison, and the
//! activation proof exchanged with a node's ping service.

pub mod activation;
pub mod digest;
pub mod random;
pub mod token;
