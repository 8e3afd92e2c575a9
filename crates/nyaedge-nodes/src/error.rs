//! Node domain error types.

use nyaedge_common::error::ErrorCode;
use nyaedge_common::id::InvalidNodeId;
use nyaedge_crypto::token::TokenError;

use crate::registry::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("invalid request: {0}")]
    Validation(String),

    #[error(transparent)]
    InvalidIdentifier(#[from] InvalidNodeId),

    #[error("node not found: {0}")]
    NotFound(String),

    #[error("invalid challenge token: {0}")]
    InvalidChallenge(TokenError),

    #[error("challenge was issued for a different node")]
    NodeIdMismatch,

    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid session token: {0}")]
    InvalidSession(String),

    #[error("token issuance failed: {0}")]
    Issuance(TokenError),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("endpoint unreachable: {0}")]
    EndpointUnreachable(String),

    #[error("endpoint rejected activation with HTTP {0}")]
    EndpointRejected(u16),

    #[error("internal error: {0}")]
    Internal(String),
}

impl From<tokio::task::JoinError> for NodeError {
    fn from(e: tokio::task::JoinError) -> Self {
        NodeError::Internal(format!("blocking task failed: {e}"))
    }
}

impl From<&NodeError> for ErrorCode {
    fn from(e: &NodeError) -> Self {
        match e {
            NodeError::Validation(_) => ErrorCode::InvalidPayload,
            NodeError::InvalidIdentifier(_) => ErrorCode::InvalidIdentifier,
            NodeError::NotFound(_) => ErrorCode::NotFound,
            NodeError::InvalidChallenge(_) => ErrorCode::InvalidChallenge,
            NodeError::NodeIdMismatch => ErrorCode::NodeIdMismatch,
            NodeError::InvalidSignature => ErrorCode::InvalidSignature,
            NodeError::InvalidSession(_) => ErrorCode::InvalidSession,
            NodeError::Issuance(_) => ErrorCode::Internal,
            NodeError::Storage(_) => ErrorCode::StorageError,
            NodeError::EndpointUnreachable(_) => ErrorCode::EndpointUnreachable,
            NodeError::EndpointRejected(_) => ErrorCode::EndpointRejected,
            NodeError::Internal(_) => ErrorCode::Internal,
        }
    }
}
