use serde::{Deserialize, Serialize};

/// Machine-readable error codes for the wire protocol.
/// Shared by all HTTP routes and the operator client.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    InvalidPayload,
    InvalidIdentifier,
    NotFound,
    InvalidChallenge,
    NodeIdMismatch,
    InvalidSignature,
    InvalidSession,
    EndpointUnreachable,
    EndpointRejected,
    StorageError,
    Internal,
}

impl ErrorCode {
    /// Suggested HTTP status code for this error.
    /// Transport-agnostic (returns u16, not an axum type).
    pub fn http_status(&self) -> u16 {
        match self {
            Self::InvalidPayload
            | Self::InvalidIdentifier
            | Self::EndpointUnreachable
            | Self::EndpointRejected => 400,
            Self::InvalidSession => 401,
            Self::InvalidChallenge | Self::NodeIdMismatch | Self::InvalidSignature => 403,
            Self::NotFound => 404,
            Self::StorageError | Self::Internal => 500,
        }
    }
}
