//! Node HTTP route handlers.
//!
//! Domain-owned routes mounted by the binary crate at `/api`.
//! Handlers delegate to `NodesState` (shared with the facade).

use std::sync::Arc;

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequestParts, Query, State};
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use nyaedge_common::error::ErrorCode;
use nyaedge_common::id::NodeId;

use crate::error::NodeError;
use crate::protocol::{
    ChallengeQuery, ChallengeResponse, CreateNodeQuery, CreateNodeResponse, ErrorBody,
    TokenRequest, TokenResponse, UpRequest, UpResponse,
};
use crate::NodesState;

/// Build the node router.
pub(crate) fn routes(state: Arc<NodesState>) -> Router {
    Router::new()
        .route("/node/challenge", get(challenge_handler))
        .route("/node/token", post(token_handler))
        .route("/node/up", post(up_handler))
        .route("/node/self", get(self_handler))
        .route("/admin/createnode", get(create_node_handler))
        .with_state(state)
}

/// GET /node/challenge?nodeId=: Issue a challenge token.
async fn challenge_handler(
    State(state): State<Arc<NodesState>>,
    query: Result<Query<ChallengeQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return invalid_payload(e.body_text()),
    };
    match state.issue_challenge(&query.node_id) {
        Ok(challenge) => Json(ChallengeResponse { challenge }).into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /node/token: Exchange a signed challenge for a session token.
async fn token_handler(
    State(state): State<Arc<NodesState>>,
    body: Result<Json<TokenRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(b) => b,
        Err(e) => return invalid_payload(e.body_text()),
    };
    match state.exchange_for_session(&request.node_id, &request.challenge, &request.signature) {
        Ok(grant) => Json(TokenResponse {
            token: grant.token,
            ttl: grant.ttl_ms,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /node/up: Verify and record a node's endpoint.
async fn up_handler(
    State(state): State<Arc<NodesState>>,
    body: Result<Json<UpRequest>, JsonRejection>,
) -> Response {
    let Json(request) = match body {
        Ok(b) => b,
        Err(e) => return invalid_payload(e.body_text()),
    };
    match state
        .activate_endpoint(&request.node_id, &request.endpoint)
        .await
    {
        Ok(()) => Json(UpResponse {
            message: "node is up".to_string(),
            node_id: request.node_id,
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /node/self: The calling node's record, without its secret.
async fn self_handler(
    State(state): State<Arc<NodesState>>,
    AuthenticatedNode(node_id): AuthenticatedNode,
) -> Response {
    match state.get_node(node_id.as_str()) {
        Ok(view) => Json(view).into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET /admin/createnode?name=: Register a node and reveal its secret once.
async fn create_node_handler(
    State(state): State<Arc<NodesState>>,
    query: Result<Query<CreateNodeQuery>, QueryRejection>,
) -> Response {
    let Query(query) = match query {
        Ok(q) => q,
        Err(e) => return invalid_payload(e.body_text()),
    };
    // Creation persists the store file; keep it off the async workers.
    let created = tokio::task::spawn_blocking(move || state.create_node(&query.name))
        .await
        .map_err(NodeError::from)
        .and_then(|r| r);
    match created {
        Ok(node) => Json(CreateNodeResponse {
            name: node.name.clone(),
            id: node.id.to_string(),
            node_secret: node.secret.expose().to_string(),
        })
        .into_response(),
        Err(e) => error_response(&e),
    }
}

// ── Session extractor ───────────────────────────────────────────────

/// Node authenticated by `Authorization: Bearer <session token>`.
pub(crate) struct AuthenticatedNode(pub(crate) NodeId);

#[axum::async_trait]
impl FromRequestParts<Arc<NodesState>> for AuthenticatedNode {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<NodesState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or_else(|| {
            error_response(&NodeError::InvalidSession(
                "missing bearer token".to_string(),
            ))
        })?;
        state
            .verify_session(token)
            .map(AuthenticatedNode)
            .map_err(|e| error_response(&e))
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// ── Error mapping ───────────────────────────────────────────────────

fn invalid_payload(message: String) -> Response {
    error_response(&NodeError::Validation(message))
}

fn error_response(error: &NodeError) -> Response {
    let code = ErrorCode::from(error);
    let status =
        StatusCode::from_u16(code.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let body = ErrorBody {
        error: code,
        message: error.to_string(),
    };
    (status, Json(body)).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::{NodePinger, PingError};
    use crate::registry::MemoryStore;
    use crate::NodesCore;
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::Request;
    use nyaedge_crypto::activation::ActivationProof;
    use nyaedge_crypto::digest::challenge_signature;
    use nyaedge_crypto::token::{SigningKey, TokenIssuer};
    use tower::ServiceExt;

    struct StaticPinger(Option<PingError>);

    #[async_trait]
    impl NodePinger for StaticPinger {
        async fn ping(&self, _endpoint: &str, _proof: &ActivationProof) -> Result<(), PingError> {
            match &self.0 {
                Some(e) => Err(e.clone()),
                None => Ok(()),
            }
        }
    }

    fn core_with(pinger: StaticPinger) -> NodesCore {
        NodesCore::builder(
            Arc::new(MemoryStore::new()),
            Arc::new(TokenIssuer::new(SigningKey::generate())),
            Arc::new(pinger),
        )
        .build()
    }

    fn core() -> NodesCore {
        core_with(StaticPinger(None))
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::post(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create(core: &NodesCore, name: &str) -> serde_json::Value {
        let resp = core
            .routes()
            .oneshot(
                Request::get(format!("/admin/createnode?name={name}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        json_body(resp).await
    }

    #[tokio::test]
    async fn create_node_returns_secret_once() {
        let core = core();
        let json = create(&core, "edge-1").await;
        assert_eq!(json["name"], "edge-1");
        let id = json["id"].as_str().unwrap();
        let secret = json["nodeSecret"].as_str().unwrap();
        assert_eq!(secret.len(), 32);

        let view = core.get_node(id).unwrap();
        assert_eq!(view.name, "edge-1");
        assert!(!serde_json::to_string(&view).unwrap().contains(secret));
    }

    #[tokio::test]
    async fn create_node_without_name_is_400() {
        let resp = core()
            .routes()
            .oneshot(Request::get("/admin/createnode").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "invalid_payload");
    }

    #[tokio::test]
    async fn create_node_with_newline_in_name_is_400() {
        let resp = core()
            .routes()
            .oneshot(
                Request::get("/admin/createnode?name=edge%0Asession_issued")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "invalid_payload");
    }

    fn file_core(path: std::path::PathBuf) -> NodesCore {
        NodesCore::builder(
            Arc::new(crate::registry::JsonFileStore::open(path).unwrap()),
            Arc::new(TokenIssuer::new(SigningKey::generate())),
            Arc::new(StaticPinger(None)),
        )
        .build()
    }

    fn temp_store_path(name: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir()
            .join(format!("nyaedge-http-{name}-{nanos}"))
            .join("nodes.json")
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn file_backed_create_and_up_persist() {
        let path = temp_store_path("persist");
        let core = file_core(path.clone());
        let json = create(&core, "edge-1").await;
        let id = json["id"].as_str().unwrap().to_string();

        let resp = core
            .routes()
            .oneshot(post_json(
                "/node/up",
                serde_json::json!({"node_id": id, "endpoint": "http://10.0.0.9:9000"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let on_disk = std::fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains(&id));
        assert!(on_disk.contains("http://10.0.0.9:9000"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn create_node_storage_failure_is_500() {
        let path = temp_store_path("broken");
        let core = file_core(path.clone());
        std::fs::create_dir_all(&path).unwrap();

        let resp = core
            .routes()
            .oneshot(
                Request::get("/admin/createnode?name=edge-1")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json_body(resp).await["error"], "storage_error");
    }

    #[tokio::test]
    async fn challenge_without_node_id_is_400() {
        let resp = core()
            .routes()
            .oneshot(Request::get("/node/challenge").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn token_flow_over_http() {
        let core = core();
        let created = create(&core, "edge-1").await;
        let id = created["id"].as_str().unwrap();
        let secret = created["nodeSecret"].as_str().unwrap();

        let resp = core
            .routes()
            .oneshot(
                Request::get(format!("/node/challenge?nodeId={id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let challenge = json_body(resp).await["challenge"]
            .as_str()
            .unwrap()
            .to_string();

        let signature = challenge_signature(&challenge, secret);
        let resp = core
            .routes()
            .oneshot(post_json(
                "/node/token",
                serde_json::json!({"nodeId": id, "signature": signature, "challenge": challenge}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["ttl"], 86_400_000);
        let token = json["token"].as_str().unwrap();

        let resp = core
            .routes()
            .oneshot(
                Request::get("/node/self")
                    .header(header::AUTHORIZATION, format!("bearer {token}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["id"], id);
        assert_eq!(json["name"], "edge-1");
        assert!(json.get("secret").is_none());
    }

    #[tokio::test]
    async fn token_with_bad_signature_is_403() {
        let core = core();
        let created = create(&core, "edge-1").await;
        let id = created["id"].as_str().unwrap();
        let challenge = core.issue_challenge(id).unwrap();

        let resp = core
            .routes()
            .oneshot(post_json(
                "/node/token",
                serde_json::json!({"nodeId": id, "signature": "00", "challenge": challenge}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert_eq!(json_body(resp).await["error"], "invalid_signature");
    }

    #[tokio::test]
    async fn token_for_unknown_node_is_404() {
        let core = core();
        let ghost = NodeId::generate();
        let challenge = core.issue_challenge(ghost.as_str()).unwrap();
        let resp = core
            .routes()
            .oneshot(post_json(
                "/node/token",
                serde_json::json!({"nodeId": ghost.as_str(), "signature": "00", "challenge": challenge}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn token_requires_json_content_type() {
        let req = Request::post("/node/token")
            .header(header::CONTENT_TYPE, "text/plain")
            .body(Body::from(r#"{"nodeId":"a","signature":"b","challenge":"c"}"#))
            .unwrap();
        let resp = core().routes().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "invalid_payload");
    }

    #[tokio::test]
    async fn token_with_malformed_body_is_400() {
        let resp = core()
            .routes()
            .oneshot(post_json("/node/token", serde_json::json!({"nodeId": "a"})))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn up_records_endpoint() {
        let core = core();
        let created = create(&core, "edge-1").await;
        let id = created["id"].as_str().unwrap();

        let resp = core
            .routes()
            .oneshot(post_json(
                "/node/up",
                serde_json::json!({"node_id": id, "endpoint": "http://203.0.113.5:9000"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let json = json_body(resp).await;
        assert_eq!(json["node_id"], id);
        assert_eq!(
            core.get_node(id).unwrap().endpoint,
            "http://203.0.113.5:9000"
        );
    }

    #[tokio::test]
    async fn up_with_rejected_ping_is_400_and_not_recorded() {
        let core = core_with(StaticPinger(Some(PingError::Rejected(401))));
        let node = core.create_node("edge-1").unwrap();
        let id = node.id.as_str();

        let resp = core
            .routes()
            .oneshot(post_json(
                "/node/up",
                serde_json::json!({"node_id": id, "endpoint": "http://203.0.113.5:9000"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "endpoint_rejected");
        assert_eq!(core.get_node(id).unwrap().endpoint, "");
    }

    #[tokio::test]
    async fn up_with_malformed_id_is_400() {
        let resp = core()
            .routes()
            .oneshot(post_json(
                "/node/up",
                serde_json::json!({"node_id": "../etc", "endpoint": "http://203.0.113.5:9000"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "invalid_identifier");
    }

    #[tokio::test]
    async fn up_for_unknown_node_is_404() {
        let resp = core()
            .routes()
            .oneshot(post_json(
                "/node/up",
                serde_json::json!({"node_id": NodeId::generate().as_str(), "endpoint": "http://203.0.113.5:9000"}),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn self_without_token_is_401() {
        let resp = core()
            .routes()
            .oneshot(Request::get("/node/self").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(resp).await["error"], "invalid_session");
    }

    #[tokio::test]
    async fn self_with_challenge_token_is_401() {
        let core = core();
        let node = core.create_node("edge-1").unwrap();
        let challenge = core.issue_challenge(node.id.as_str()).unwrap();
        let resp = core
            .routes()
            .oneshot(
                Request::get("/node/self")
                    .header(header::AUTHORIZATION, format!("Bearer {challenge}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        let (parts, _) = Request::get("/")
            .header(header::AUTHORIZATION, "BeArEr abc.def.ghi")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), Some("abc.def.ghi"));

        let (parts, _) = Request::get("/")
            .header(header::AUTHORIZATION, "Basic abc")
            .body(())
            .unwrap()
            .into_parts();
        assert_eq!(bearer_token(&parts), None);
    }

    #[tokio::test]
    async fn error_response_includes_error_code() {
        let resp = error_response(&NodeError::NodeIdMismatch);
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        let json = json_body(resp).await;
        assert_eq!(json["error"], "node_id_mismatch");
        assert!(json.get("message").is_some());
    }

    #[tokio::test]
    async fn nonexistent_route_returns_404() {
        let resp = core()
            .routes()
            .oneshot(Request::get("/nonexistent").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
