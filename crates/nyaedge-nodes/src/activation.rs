//! Operator-initiated handshake: verify a node's claimed endpoint.
//!
//! The control plane proves knowledge of the node secret by sending an
//! [`ActivationProof`] to the node's ping service. The endpoint is only
//! recorded once the node answers `200 OK`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use nyaedge_crypto::activation::ActivationProof;
use nyaedge_crypto::random::{generate_nonce, OsRandomSource, RandomStringSource};

use crate::error::NodeError;
use crate::registry::NodeRegistry;

/// Path of the ping service on a node endpoint.
pub const PING_PATH: &str = "/api/node/ping";

/// Default bound on a single ping call.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PingError {
    #[error("{0}")]
    Unreachable(String),

    #[error("ping answered HTTP {0}")]
    Rejected(u16),
}

impl From<PingError> for NodeError {
    fn from(e: PingError) -> Self {
        match e {
            PingError::Unreachable(msg) => NodeError::EndpointUnreachable(msg),
            PingError::Rejected(status) => NodeError::EndpointRejected(status),
        }
    }
}

/// Delivers an activation proof to a node endpoint.
///
/// Implementations must bound each call with a timeout.
#[async_trait]
pub trait NodePinger: Send + Sync {
    async fn ping(&self, endpoint: &str, proof: &ActivationProof) -> Result<(), PingError>;
}

/// Ping URL for `endpoint`, tolerating a trailing slash.
pub fn ping_url(endpoint: &str) -> String {
    format!("{}{PING_PATH}", endpoint.trim_end_matches('/'))
}

/// [`NodePinger`] over HTTP: `GET <endpoint>/api/node/ping` with the
/// proof as a JSON body.
#[derive(Debug, Clone)]
pub struct HttpPinger {
    client: reqwest::Client,
}

impl HttpPinger {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl NodePinger for HttpPinger {
    async fn ping(&self, endpoint: &str, proof: &ActivationProof) -> Result<(), PingError> {
        let resp = self
            .client
            .get(ping_url(endpoint))
            .json(proof)
            .send()
            .await
            .map_err(|e| PingError::Unreachable(e.to_string()))?;

        let status = resp.status();
        if status == reqwest::StatusCode::OK {
            Ok(())
        } else {
            Err(PingError::Rejected(status.as_u16()))
        }
    }
}

/// Runs the activation handshake and records the endpoint on success.
#[derive(Clone)]
pub struct ActivationVerifier {
    registry: NodeRegistry,
    pinger: Arc<dyn NodePinger>,
    random: Arc<dyn RandomStringSource>,
}

impl ActivationVerifier {
    pub fn new(registry: NodeRegistry, pinger: Arc<dyn NodePinger>) -> Self {
        Self::with_random(registry, pinger, Arc::new(OsRandomSource))
    }

    pub fn with_random(
        registry: NodeRegistry,
        pinger: Arc<dyn NodePinger>,
        random: Arc<dyn RandomStringSource>,
    ) -> Self {
        Self {
            registry,
            pinger,
            random,
        }
    }

    /// Prove the secret to `endpoint` and, if the node accepts, persist it.
    ///
    /// Nothing is written unless the ping succeeds.
    pub async fn activate_endpoint(&self, node_id: &str, endpoint: &str) -> Result<(), NodeError> {
        validate_endpoint(endpoint)?;
        let node = self.registry.load(node_id)?;

        let nonce = generate_nonce(self.random.as_ref());
        let proof = ActivationProof::new(nonce, node.secret.expose(), Utc::now());

        tracing::debug!(node_id = %node.id, endpoint, "Pinging node endpoint");
        self.pinger.ping(endpoint, &proof).await?;

        // The store write is synchronous file I/O.
        let registry = self.registry.clone();
        let (node_id, endpoint) = (node_id.to_string(), endpoint.to_string());
        tokio::task::spawn_blocking(move || registry.update_endpoint(&node_id, &endpoint))
            .await?
    }
}

fn validate_endpoint(endpoint: &str) -> Result<(), NodeError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|e| NodeError::Validation(format!("invalid endpoint: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(NodeError::Validation(format!(
            "endpoint scheme must be http or https, got {other}"
        ))),
    }
}
