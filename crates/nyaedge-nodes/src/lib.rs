//! Nyaedge Nodes: node trust establishment.
//!
//! Registers edge nodes with a shared secret, runs the challenge-response
//! handshake that turns secret possession into a session token, and
//! verifies a node's claimed endpoint before trusting it. The binary crate
//! mounts [`NodesCore::routes`] under `/api`.

pub mod activation;
pub mod audit;
pub mod challenge;
pub mod error;
pub mod http;
pub mod protocol;
pub mod registry;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use nyaedge_common::id::NodeId;
use nyaedge_crypto::random::{OsRandomSource, RandomStringSource};
use nyaedge_crypto::token::TokenIssuer;

pub use activation::{HttpPinger, NodePinger, PingError};
pub use challenge::SessionGrant;
pub use error::NodeError;
pub use registry::{JsonFileStore, MemoryStore, Node, NodeStore, NodeView};

use activation::ActivationVerifier;
use audit::AuditLog;
use challenge::NodeAuthenticator;
use registry::NodeRegistry;

// ── Internal shared state ───────────────────────────────────────────

/// Shared by [`NodesCore`] and the HTTP handlers so both paths audit and
/// trace identically.
pub(crate) struct NodesState {
    registry: NodeRegistry,
    authenticator: NodeAuthenticator,
    activation: ActivationVerifier,
    audit: Option<AuditLog>,
}

impl NodesState {
    fn audit(&self, event: &str, fields: &[(&str, &str)]) {
        if let Some(log) = &self.audit {
            if let Err(e) = log.append(event, fields) {
                tracing::warn!(event, error = %e, "Failed to write audit entry");
            }
        }
    }

    pub(crate) fn create_node(&self, name: &str) -> Result<Node, NodeError> {
        let node = self.registry.create_node(name)?;
        tracing::info!(node_id = %node.id, name = %node.name, "Node created");
        self.audit(
            "node_created",
            &[("node_id", node.id.as_str()), ("name", node.name.as_str())],
        );
        Ok(node)
    }

    pub(crate) fn get_node(&self, id: &str) -> Result<NodeView, NodeError> {
        self.registry.get_node(id)
    }

    pub(crate) fn issue_challenge(&self, node_id: &str) -> Result<String, NodeError> {
        let challenge = self.authenticator.issue_challenge(node_id)?;
        tracing::debug!(node_id, "Challenge issued");
        Ok(challenge)
    }

    pub(crate) fn exchange_for_session(
        &self,
        node_id: &str,
        challenge: &str,
        signature: &str,
    ) -> Result<SessionGrant, NodeError> {
        match self
            .authenticator
            .exchange_for_session(node_id, challenge, signature)
        {
            Ok(grant) => {
                tracing::info!(node_id, "Session issued");
                self.audit("session_issued", &[("node_id", node_id)]);
                Ok(grant)
            }
            Err(e) => {
                tracing::warn!(node_id, error = %e, "Challenge exchange rejected");
                Err(e)
            }
        }
    }

    pub(crate) async fn activate_endpoint(
        &self,
        node_id: &str,
        endpoint: &str,
    ) -> Result<(), NodeError> {
        match self.activation.activate_endpoint(node_id, endpoint).await {
            Ok(()) => {
                tracing::info!(node_id, endpoint, "Endpoint activated");
                self.audit(
                    "endpoint_activated",
                    &[("node_id", node_id), ("endpoint", endpoint)],
                );
                Ok(())
            }
            Err(e) => {
                tracing::warn!(node_id, endpoint, error = %e, "Endpoint activation failed");
                Err(e)
            }
        }
    }

    pub(crate) fn verify_session(&self, token: &str) -> Result<NodeId, NodeError> {
        self.authenticator.verify_session(token)
    }
}

// ── NodesCore: domain facade ───────────────────────────────────────

/// Domain facade handed to the binary crate.
#[derive(Clone)]
pub struct NodesCore {
    state: Arc<NodesState>,
}

impl NodesCore {
    pub fn builder(
        store: Arc<dyn NodeStore>,
        issuer: Arc<TokenIssuer>,
        pinger: Arc<dyn NodePinger>,
    ) -> Builder {
        Builder {
            store,
            issuer,
            pinger,
            random: Arc::new(OsRandomSource),
            audit_path: None,
        }
    }

    /// HTTP router for this domain; the binary mounts it at `/api`.
    pub fn routes(&self) -> Router {
        http::routes(Arc::clone(&self.state))
    }

    /// Register a node. The returned record carries the only copy of its
    /// secret the control plane will ever hand out.
    pub fn create_node(&self, name: &str) -> Result<Node, NodeError> {
        self.state.create_node(name)
    }

    pub fn get_node(&self, id: &str) -> Result<NodeView, NodeError> {
        self.state.get_node(id)
    }

    pub fn issue_challenge(&self, node_id: &str) -> Result<String, NodeError> {
        self.state.issue_challenge(node_id)
    }

    pub fn exchange_for_session(
        &self,
        node_id: &str,
        challenge: &str,
        signature: &str,
    ) -> Result<SessionGrant, NodeError> {
        self.state.exchange_for_session(node_id, challenge, signature)
    }

    pub async fn activate_endpoint(&self, node_id: &str, endpoint: &str) -> Result<(), NodeError> {
        self.state.activate_endpoint(node_id, endpoint).await
    }

    /// Node id carried by a valid session token.
    pub fn verify_session(&self, token: &str) -> Result<NodeId, NodeError> {
        self.state.verify_session(token)
    }

    /// Audit log contents, or empty when auditing is disabled.
    pub fn read_audit_log(&self) -> Result<String, std::io::Error> {
        match &self.state.audit {
            Some(log) => log.read(),
            None => Ok(String::new()),
        }
    }
}

pub struct Builder {
    store: Arc<dyn NodeStore>,
    issuer: Arc<TokenIssuer>,
    pinger: Arc<dyn NodePinger>,
    random: Arc<dyn RandomStringSource>,
    audit_path: Option<PathBuf>,
}

impl Builder {
    /// Source for node secrets and activation nonces.
    pub fn random_source(mut self, random: Arc<dyn RandomStringSource>) -> Self {
        self.random = random;
        self
    }

    pub fn audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_path = Some(path.into());
        self
    }

    pub fn build(self) -> NodesCore {
        let registry = NodeRegistry::with_random(self.store, Arc::clone(&self.random));
        let authenticator = NodeAuthenticator::new(self.issuer, registry.clone());
        let activation = ActivationVerifier::with_random(registry.clone(), self.pinger, self.random);
        NodesCore {
            state: Arc::new(NodesState {
                registry,
                authenticator,
                activation,
                audit: self.audit_path.map(AuditLog::new),
            }),
        }
    }
}
