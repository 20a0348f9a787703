// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Scenebridge-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Scenebridge and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! axum routes: the SSE session transport, a stateless JSON-RPC endpoint, a health
//! probe, and the rmcp streamable HTTP service mounted at `/mcp`. Every route
//! speaks MCP through the same [`SceneBridgeMcp`] handler.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive};
use axum::response::{IntoResponse, Response, Sse};
use axum::routing::{get, post};
use axum::{Json, Router};
use rmcp::model::ClientJsonRpcMessage;
use rmcp::service::serve_directly;
use rmcp::transport::{
    streamable_http_server::session::local::LocalSessionManager, OneshotTransport,
    StreamableHttpServerConfig, StreamableHttpService,
};
use rmcp::{RoleServer, ServiceExt};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_stream::{Stream, StreamExt};

use super::server::SceneBridgeMcp;
use super::session::{SessionManager, SessionTransport};
use crate::error::SessionError;
use crate::model::SessionId;

pub const DEFAULT_SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct HttpState {
    mcp: SceneBridgeMcp,
    sessions: Arc<SessionManager>,
    keep_alive: Duration,
}

impl HttpState {
    pub fn new(mcp: SceneBridgeMcp, sessions: Arc<SessionManager>) -> Self {
        Self { mcp, sessions, keep_alive: DEFAULT_SSE_KEEP_ALIVE }
    }

    pub fn with_keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = interval;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }
}

/// `/sse`, `/messages`, `/rpc` and `/health`.
pub fn routes(state: HttpState) -> Router {
    Router::new()
        .route("/sse", get(open_session))
        .route("/messages", post(post_message))
        .route("/rpc", post(post_rpc))
        .route("/health", get(health))
        .with_state(state)
}

/// [`routes`] plus the rmcp streamable HTTP service at `/mcp`.
pub fn app(state: HttpState, config: StreamableHttpServerConfig) -> Router {
    let mcp = state.mcp.clone();
    let session_manager = Arc::new(LocalSessionManager::default());
    let mcp_service = StreamableHttpService::new(move || Ok(mcp.clone()), session_manager, config);
    routes(state).nest_service("/mcp", mcp_service)
}

#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl HttpError {
    fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self { status: StatusCode::BAD_REQUEST, code, message: message.into() }
    }

    fn internal(code: &'static str, message: impl Into<String>) -> Self {
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, code, message: message.into() }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody { error: self.code.into(), message: self.message });
        (self.status, body).into_response()
    }
}

/// A message with a null `id` is refused; it is neither a request nor a
/// notification.
fn parse_message(body: &str) -> Result<ClientJsonRpcMessage, HttpError> {
    let invalid = |message: String| HttpError::bad_request("invalid_message", message);
    let raw: Value = serde_json::from_str(body).map_err(|err| invalid(format!("not JSON: {err}")))?;
    if raw.get("id").is_some_and(Value::is_null) {
        return Err(invalid("request id must be a string or a number".to_owned()));
    }
    serde_json::from_value(raw).map_err(|err| invalid(format!("not a JSON-RPC message: {err}")))
}

/// Runs the MCP handler on one session until its transport ends.
async fn run_session(mcp: SceneBridgeMcp, transport: SessionTransport) {
    let id = transport.id().clone();
    match mcp.serve(transport).await {
        Ok(service) => {
            if let Err(err) = service.waiting().await {
                tracing::warn!(session = %id, %err, "session service failed");
            }
        }
        Err(err) => tracing::debug!(session = %id, %err, "session ended before initialization"),
    }
}

async fn open_session(
    State(state): State<HttpState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let (transport, session) = state.sessions.open();
    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={}", session.id()));
    tokio::spawn(run_session(state.mcp.clone(), transport));

    let messages = session.filter_map(|message| match serde_json::to_string(&message) {
        Ok(data) => Some(Event::default().event("message").data(data)),
        Err(err) => {
            tracing::warn!(%err, "dropping unserializable reply");
            None
        }
    });
    let stream = tokio_stream::once(endpoint).chain(messages).map(Ok::<_, Infallible>);

    Sse::new(stream).keep_alive(KeepAlive::new().interval(state.keep_alive).text("keep-alive"))
}

#[derive(Debug, Default, Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

async fn post_message(
    State(state): State<HttpState>,
    Query(query): Query<MessageQuery>,
    body: String,
) -> Result<StatusCode, HttpError> {
    let raw = query
        .session_id
        .filter(|raw| !raw.is_empty())
        .ok_or_else(|| HttpError::bad_request("missing_session", "sessionId query parameter is required"))?;
    let unknown = || HttpError::bad_request("unknown_session", format!("no open session `{raw}`"));
    let id = SessionId::new(raw.as_str()).map_err(|_| unknown())?;
    if !state.sessions.contains(&id) {
        return Err(unknown());
    }

    let message = parse_message(&body)?;
    state.sessions.deliver(&id, message).await.map_err(|err| match err {
        SessionError::NotFound(_) | SessionError::Closed(_) => unknown(),
    })?;
    Ok(StatusCode::ACCEPTED)
}

/// One request in, its reply out, without a session or an initialize handshake.
async fn post_rpc(State(state): State<HttpState>, body: String) -> Result<Response, HttpError> {
    let request @ ClientJsonRpcMessage::Request(_) = parse_message(&body)? else {
        return Ok(StatusCode::ACCEPTED.into_response());
    };
    let (transport, mut replies) = OneshotTransport::<RoleServer>::new(request);
    let service = serve_directly(state.mcp.clone(), transport, None);
    tokio::spawn(async move {
        let _ = service.waiting().await;
    });

    match replies.recv().await {
        Some(reply) => Ok(Json(reply).into_response()),
        None => Err(HttpError::internal("no_reply", "the request ended without a reply")),
    }
}

async fn health(State(state): State<HttpState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "activeSessions": state.sessions.len(),
        "tools": state.mcp.registry().len(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::body::to_bytes;

    use super::*;
    use crate::host::demo_host;
    use crate::mcp::SERVER_NAME;
    use crate::sandbox::DEFAULT_TIMEOUT_MS;
    use crate::tools::{register_scene_tools, ToolRegistry};

    fn state() -> HttpState {
        let mut registry = ToolRegistry::new();
        register_scene_tools(&mut registry, Arc::new(demo_host().unwrap()), DEFAULT_TIMEOUT_MS);
        HttpState::new(SceneBridgeMcp::new(Arc::new(registry)), Arc::new(SessionManager::new()))
            .with_keep_alive(Duration::from_secs(600))
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// Reads SSE frames until one contains `needle`.
    async fn read_until(
        frames: &mut (impl Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin),
        needle: &str,
    ) -> String {
        let mut seen = String::new();
        tokio::time::timeout(Duration::from_secs(3), async {
            while !seen.contains(needle) {
                let chunk = frames.next().await.expect("stream ended").expect("frame");
                seen.push_str(std::str::from_utf8(&chunk).unwrap());
            }
        })
        .await
        .expect("timed out waiting for sse frame");
        seen
    }

    fn data_line(frame: &str, event: &str) -> String {
        let block = frame.split("\n\n").find(|block| block.contains(&format!("event: {event}")));
        block
            .and_then(|block| block.lines().find_map(|line| line.strip_prefix("data: ")))
            .expect("data line")
            .to_owned()
    }

    async fn post(state: &HttpState, raw_id: &str, message: Value) -> Result<StatusCode, HttpError> {
        post_message(
            State(state.clone()),
            Query(MessageQuery { session_id: Some(raw_id.to_owned()) }),
            message.to_string(),
        )
        .await
    }

    async fn next_reply(
        frames: &mut (impl Stream<Item = Result<axum::body::Bytes, axum::Error>> + Unpin),
    ) -> Value {
        let frame = read_until(frames, "event: message").await;
        serde_json::from_str(&data_line(&frame, "message")).unwrap()
    }

    fn initialize(id: i64) -> Value {
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": "initialize",
            "params": {
                "protocolVersion": "2025-03-26",
                "capabilities": {},
                "clientInfo": { "name": "http-tests", "version": "0.0.0" },
            },
        })
    }

    #[tokio::test]
    async fn sse_session_runs_the_mcp_handshake_and_tool_calls() {
        let state = state();
        let sse = open_session(State(state.clone())).await;
        let mut frames = sse.into_response().into_body().into_data_stream();

        let endpoint = data_line(&read_until(&mut frames, "event: endpoint").await, "endpoint");
        let raw_id = endpoint.strip_prefix("/messages?sessionId=").unwrap().to_owned();
        assert_eq!(state.sessions().len(), 1);

        assert_eq!(post(&state, &raw_id, initialize(1)).await.unwrap(), StatusCode::ACCEPTED);
        let init = next_reply(&mut frames).await;
        assert_eq!(init["id"], 1);
        assert_eq!(init["result"]["serverInfo"]["name"], SERVER_NAME);
        assert_eq!(init["result"]["protocolVersion"], "2025-03-26");

        let initialized = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
        assert_eq!(post(&state, &raw_id, initialized).await.unwrap(), StatusCode::ACCEPTED);

        let call = json!({
            "jsonrpc": "2.0",
            "id": 2,
            "method": "tools/call",
            "params": { "name": "search_nodes", "arguments": { "namePattern": "Enemy*", "limit": 2 } },
        });
        post(&state, &raw_id, call).await.unwrap();
        let reply = next_reply(&mut frames).await;
        assert_eq!(reply["id"], 2);
        assert_eq!(reply["result"]["structuredContent"]["total"], 3);

        drop(frames);
        assert!(state.sessions().is_empty());
    }

    #[tokio::test]
    async fn posts_without_an_open_session_are_client_errors() {
        let state = state();
        let missing = post_message(State(state.clone()), Query(MessageQuery::default()), String::new())
            .await
            .unwrap_err();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
        assert_eq!(missing.code(), "missing_session");

        let unknown = post(&state, "no-such-session", json!({})).await.unwrap_err();
        assert_eq!(unknown.code(), "unknown_session");

        let body = json_body(unknown.into_response()).await;
        assert_eq!(body["error"], "unknown_session");
        assert!(state.sessions().is_empty());
    }

    #[tokio::test]
    async fn closed_session_ids_are_rejected() {
        let state = state();
        let (transport, stream) = state.sessions().open();
        let id = stream.id().to_string();
        drop(stream);
        drop(transport);

        let err = post(&state, &id, json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "unknown_session");
    }

    #[tokio::test]
    async fn malformed_posts_are_rejected_without_closing_the_session() {
        let state = state();
        let (_transport, stream) = state.sessions().open();
        let id = stream.id().to_string();

        let err = post(&state, &id, json!({ "jsonrpc": "2.0", "id": null, "method": "ping" }))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_message");
        assert_eq!(state.sessions().len(), 1);
    }

    #[tokio::test]
    async fn rpc_endpoint_answers_requests_and_accepts_notifications() {
        let state = state();
        let reply = post_rpc(
            State(state.clone()),
            json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }).to_string(),
        )
        .await
        .unwrap();
        assert_eq!(reply.status(), StatusCode::OK);
        let body = json_body(reply).await;
        assert_eq!(body["id"], 1);
        assert_eq!(body["result"]["tools"].as_array().unwrap().len(), 8);

        let notification = post_rpc(
            State(state),
            json!({ "jsonrpc": "2.0", "method": "notifications/initialized" }).to_string(),
        )
        .await
        .unwrap();
        assert_eq!(notification.status(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn rpc_endpoint_reports_protocol_errors() {
        let state = state();
        let unknown_tool = json!({
            "jsonrpc": "2.0",
            "id": 3,
            "method": "tools/call",
            "params": { "name": "serch_nodes", "arguments": {} },
        });
        let reply = json_body(post_rpc(State(state.clone()), unknown_tool.to_string()).await.unwrap()).await;
        assert_eq!(reply["error"]["code"], crate::error::METHOD_NOT_FOUND);
        assert_eq!(reply["error"]["data"]["suggestions"][0], "search_nodes");

        let err = post_rpc(State(state.clone()), "{ not json".to_owned()).await.unwrap_err();
        assert_eq!(err.code(), "invalid_message");

        let null_id = json!({ "jsonrpc": "2.0", "id": null, "method": "tools/list" });
        let err = post_rpc(State(state), null_id.to_string()).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "invalid_message");
    }

    #[tokio::test]
    async fn health_counts_sessions_and_tools() {
        let state = state();
        let _first = state.sessions().open();
        let _second = state.sessions().open();
        let Json(body) = health(State(state)).await;
        assert_eq!(body, json!({ "status": "ok", "activeSessions": 2, "tools": 8 }));
    }
}
