//! Node-initiated handshake: challenge issuance and exchange for a session.
//!
//! No state is held between the two steps; the challenge token carries
//! everything needed to complete the exchange.

use std::sync::Arc;

use nyaedge_common::id::NodeId;
use nyaedge_crypto::digest::verify_challenge_signature;
use nyaedge_crypto::token::{
    Audience, NodeClaims, TokenIssuer, CHALLENGE_TTL_SECS, SESSION_TTL_SECS,
};

use crate::error::NodeError;
use crate::registry::NodeRegistry;

/// Session token handed back after a successful exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionGrant {
    pub token: String,
    /// Session lifetime in milliseconds.
    pub ttl_ms: i64,
}

#[derive(Clone)]
pub struct NodeAuthenticator {
    issuer: Arc<TokenIssuer>,
    registry: NodeRegistry,
}

impl NodeAuthenticator {
    pub fn new(issuer: Arc<TokenIssuer>, registry: NodeRegistry) -> Self {
        Self { issuer, registry }
    }

    /// Issue a challenge token for `node_id`.
    ///
    /// The node is not looked up here; existence is checked during the
    /// exchange.
    pub fn issue_challenge(&self, node_id: &str) -> Result<String, NodeError> {
        if node_id.trim().is_empty() {
            return Err(NodeError::Validation("nodeId is required".into()));
        }
        self.issuer
            .issue(
                &NodeClaims::new(node_id),
                Audience::NodeChallenge,
                CHALLENGE_TTL_SECS,
            )
            .map_err(NodeError::Issuance)
    }

    /// Verify a signed challenge and mint a session token.
    ///
    /// `signature` must be the hex HMAC-SHA256 of `challenge` keyed with
    /// the node secret.
    pub fn exchange_for_session(
        &self,
        node_id: &str,
        challenge: &str,
        signature: &str,
    ) -> Result<SessionGrant, NodeError> {
        let claims: NodeClaims = self
            .issuer
            .verify(challenge, Audience::NodeChallenge)
            .map_err(NodeError::InvalidChallenge)?;

        if claims.node_id != node_id {
            return Err(NodeError::NodeIdMismatch);
        }

        let node = self.registry.load(node_id)?;

        if !verify_challenge_signature(challenge, node.secret.expose(), signature) {
            return Err(NodeError::InvalidSignature);
        }

        let token = self
            .issuer
            .issue(
                &NodeClaims::new(node.id.as_str()),
                Audience::Node,
                SESSION_TTL_SECS,
            )
            .map_err(NodeError::Issuance)?;

        Ok(SessionGrant {
            token,
            ttl_ms: SESSION_TTL_SECS * 1000,
        })
    }

    /// Check a session token presented on a node API call.
    pub fn verify_session(&self, token: &str) -> Result<NodeId, NodeError> {
        let claims: NodeClaims = self
            .issuer
            .verify(token, Audience::Node)
            .map_err(|e| NodeError::InvalidSession(e.to_string()))?;
        if claims.node_id.is_empty() {
            return Err(NodeError::InvalidSession("token carries no node id".into()));
        }
        NodeId::parse(&claims.node_id).map_err(|e| NodeError::InvalidSession(e.to_string()))
    }
}
