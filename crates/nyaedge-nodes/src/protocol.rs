//! Request/response bodies of the node HTTP surface.

use nyaedge_common::error::ErrorCode;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChallengeQuery {
    #[serde(rename = "nodeId", default)]
    pub node_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChallengeResponse {
    pub challenge: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRequest {
    pub node_id: String,
    pub signature: String,
    pub challenge: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
    /// Milliseconds.
    pub ttl: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpRequest {
    pub node_id: String,
    pub endpoint: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UpResponse {
    pub message: String,
    pub node_id: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateNodeQuery {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateNodeResponse {
    pub name: String,
    pub id: String,
    #[serde(rename = "nodeSecret")]
    pub node_secret: String,
}

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: ErrorCode,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_request_uses_camel_case_node_id() {
        let req: TokenRequest = serde_json::from_str(
            r#"{"nodeId":"abc","signature":"00","challenge":"a.b.c"}"#,
        )
        .unwrap();
        assert_eq!(req.node_id, "abc");
    }

    #[test]
    fn up_request_uses_snake_case_node_id() {
        let req: UpRequest =
            serde_json::from_str(r#"{"node_id":"abc","endpoint":"http://x"}"#).unwrap();
        assert_eq!(req.node_id, "abc");
        assert!(serde_json::from_str::<UpRequest>(r#"{"nodeId":"abc","endpoint":"x"}"#).is_err());
    }

    #[test]
    fn create_node_response_exposes_node_secret_key() {
        let json = serde_json::to_value(CreateNodeResponse {
            name: "edge-1".into(),
            id: "abc".into(),
            node_secret: "s".into(),
        })
        .unwrap();
        assert_eq!(json["nodeSecret"], "s");
        assert!(json.get("node_secret").is_none());
    }

    #[test]
    fn error_body_carries_wire_code() {
        let json = serde_json::to_value(ErrorBody {
            error: ErrorCode::InvalidSession,
            message: "session expired".into(),
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({"error": "invalid_session", "message": "session expired"})
        );
    }
}
