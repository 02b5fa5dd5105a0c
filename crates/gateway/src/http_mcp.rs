//! Streamable HTTP transport: one POST per JSON-RPC call, no session
//! affinity. The simplest of the three surfaces — the handler just
//! dispatches and returns the response body directly.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;

use mcphub_transport::protocol::JsonRpcRequest;

use crate::auth::require_group_key;
use crate::mcp::{self, DEFAULT_GROUP};
use crate::state::HubState;

pub async fn handle_mcp(State(state): State<HubState>, headers: HeaderMap, Json(request): Json<JsonRpcRequest>) -> Response {
    dispatch_http(state, DEFAULT_GROUP.to_string(), None, headers, request).await
}

pub async fn handle_group_mcp(State(state): State<HubState>, Path(group_id): Path<String>, headers: HeaderMap, Json(request): Json<JsonRpcRequest>) -> Response {
    let group = group_id.clone();
    dispatch_http(state, group, Some(group_id), headers, request).await
}

async fn dispatch_http(state: HubState, group: String, gated_group: Option<String>, headers: HeaderMap, request: JsonRpcRequest) -> Response {
    if let Some(id) = &gated_group {
        if let Err(err) = require_group_key(&state, id, &headers).await {
            return (StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::FORBIDDEN), Json(mcphub_domain::Envelope::<()>::err(&err))).into_response();
        }
    }

    let client_id = headers.get("x-client-id").and_then(|v| v.to_str().ok()).map(str::to_string);
    let response = mcp::dispatch(&state.facade, &group, request, client_id.as_deref()).await;
    (StatusCode::OK, Json(response)).into_response()
}

pub async fn handle_status(State(state): State<HubState>) -> Response {
    let report = state.facade.health_report();
    (StatusCode::OK, Json(serde_json::json!({
        "score": report.score,
        "servers": {
            "connected": report.servers.connected,
            "connecting": report.servers.connecting,
            "error": report.servers.error,
            "disconnected": report.servers.disconnected,
        },
        "groups": report.group_count,
        "fallbackGroups": report.fallback_group_count,
        "computedAt": report.computed_at,
    })))
        .into_response()
}
