//! HTTP client for operator commands against a running control plane.
//!
//! Uses blocking `ureq`; operator commands need no async runtime.

use std::time::Duration;

use nyaedge_nodes::protocol::{CreateNodeResponse, UpRequest, UpResponse};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Activation pings the node, so allow well beyond the ping timeout.
const READ_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Control plane not reachable: {0}")]
    Unreachable(String),

    #[error("{error}: {message}")]
    Api { error: String, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

pub struct NyaedgeClient {
    endpoint: String,
    agent: ureq::Agent,
}

impl NyaedgeClient {
    pub fn new(endpoint: &str) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(CONNECT_TIMEOUT)
            .timeout_read(READ_TIMEOUT)
            .build();
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            agent,
        }
    }

    pub fn health(&self) -> Result<()> {
        let url = format!("{}/healthz", self.endpoint);
        self.agent.get(&url).call().map_err(map_error)?;
        Ok(())
    }

    pub fn create_node(&self, name: &str) -> Result<CreateNodeResponse> {
        let url = format!("{}/api/admin/createnode", self.endpoint);
        let resp = self
            .agent
            .get(&url)
            .query("name", name)
            .call()
            .map_err(map_error)?;
        resp.into_json()
            .map_err(|e| ClientError::Decode(e.to_string()))
    }

    pub fn node_up(&self, node_id: &str, endpoint: &str) -> Result<UpResponse> {
        let url = format!("{}/api/node/up", self.endpoint);
        let body = UpRequest {
            node_id: node_id.to_string(),
            endpoint: endpoint.to_string(),
        };
        let resp = self.agent.post(&url).send_json(&body).map_err(map_error)?;
        resp.into_json()
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn map_error(e: ureq::Error) -> ClientError {
    match e {
        ureq::Error::Status(_status, resp) => {
            let body = resp.into_string().unwrap_or_default();
            match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(json) => ClientError::Api {
                    error: json
                        .get("error")
                        .and_then(|v| v.as_str())
                        .unwrap_or("unknown")
                        .to_string(),
                    message: json
                        .get("message")
                        .and_then(|v| v.as_str())
                        .unwrap_or(&body)
                        .to_string(),
                },
                Err(_) => ClientError::Api {
                    error: "http_error".into(),
                    message: body,
                },
            }
        }
        ureq::Error::Transport(t) => ClientError::Unreachable(t.to_string()),
    }
}
