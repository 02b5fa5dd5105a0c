//! SSE transport surface: `GET /sse` opens a server-initiated event stream
//! whose first event is `endpoint`, carrying the POST URL the client must
//! use for subsequent messages, tagged with a fresh `sessionId`. Responses
//! to POSTed messages arrive asynchronously as `message` events on the
//! same stream, not as the POST's own HTTP response.

use std::collections::HashMap;
use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::{self, StreamExt};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use mcphub_transport::protocol::JsonRpcRequest;

use crate::auth::require_group_key;
use crate::mcp::{self, DEFAULT_GROUP};
use crate::state::HubState;

pub struct SseSessions {
    inner: Mutex<HashMap<String, mpsc::UnboundedSender<Value>>>,
}

impl SseSessions {
    pub fn new() -> Self {
        Self { inner: Mutex::new(HashMap::new()) }
    }

    fn register(&self) -> (String, mpsc::UnboundedReceiver<Value>) {
        let id = Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.lock().insert(id.clone(), tx);
        (id, rx)
    }

    fn remove(&self, id: &str) {
        self.inner.lock().remove(id);
    }

    /// Push a message destined for an open SSE stream. `Err` means the
    /// session id is unknown (never opened, or already closed).
    fn push(&self, id: &str, value: Value) -> bool {
        let inner = self.inner.lock();
        match inner.get(id) {
            Some(tx) => tx.send(value).is_ok(),
            None => false,
        }
    }

    fn known(&self, id: &str) -> bool {
        self.inner.lock().contains_key(id)
    }
}

impl Default for SseSessions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Deserialize)]
pub struct SessionQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

pub async fn handle_sse(State(state): State<HubState>) -> Response {
    sse_stream(state, None)
}

pub async fn handle_group_sse(State(state): State<HubState>, Path(group_id): Path<String>) -> Response {
    sse_stream(state, Some(group_id))
}

fn sse_stream(state: HubState, group_id: Option<String>) -> Response {
    let (session_id, rx) = state.sse_sessions.register();
    let post_path = match &group_id {
        Some(id) => format!("/{id}/messages?sessionId={session_id}"),
        None => format!("/messages?sessionId={session_id}"),
    };

    let endpoint_event = stream::once(async move { Ok::<Event, Infallible>(Event::default().event("endpoint").data(post_path)) });
    let message_stream = stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|value| (Ok::<Event, Infallible>(Event::default().event("message").data(value.to_string())), rx))
    });

    let sessions = state.sse_sessions.clone();
    let cleanup_id = session_id.clone();
    let guarded = endpoint_event.chain(message_stream).chain(stream::once(async move {
        sessions.remove(&cleanup_id);
        Ok::<Event, Infallible>(Event::default().event("close").data(""))
    }));

    Sse::new(guarded).keep_alive(KeepAlive::default()).into_response()
}

pub async fn handle_messages(State(state): State<HubState>, Query(query): Query<SessionQuery>, headers: HeaderMap, Json(request): Json<JsonRpcRequest>) -> Response {
    post_message(state, None, query, headers, request).await
}

pub async fn handle_group_messages(
    State(state): State<HubState>,
    Path(group_id): Path<String>,
    Query(query): Query<SessionQuery>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    post_message(state, Some(group_id), query, headers, request).await
}

async fn post_message(state: HubState, group_id: Option<String>, query: SessionQuery, headers: HeaderMap, request: JsonRpcRequest) -> Response {
    if !state.sse_sessions.known(&query.session_id) {
        return (StatusCode::BAD_REQUEST, "unknown sessionId").into_response();
    }

    let group = group_id.clone().unwrap_or_else(|| DEFAULT_GROUP.to_string());
    if let Some(id) = &group_id {
        if let Err(err) = require_group_key(&state, id, &headers).await {
            return (StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::FORBIDDEN), err.to_string()).into_response();
        }
    }

    let client_id = headers.get("x-client-id").and_then(|v| v.to_str().ok()).map(str::to_string);
    let response = mcp::dispatch(&state.facade, &group, request, client_id.as_deref()).await;
    state.sse_sessions.push(&query.session_id, serde_json::json!(response));

    StatusCode::ACCEPTED.into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unregistered_session_is_unknown() {
        let sessions = SseSessions::new();
        assert!(!sessions.known("nope"));
    }

    #[test]
    fn registered_session_is_known_until_removed() {
        let sessions = SseSessions::new();
        let (id, _rx) = sessions.register();
        assert!(sessions.known(&id));
        sessions.remove(&id);
        assert!(!sessions.known(&id));
    }

    #[test]
    fn push_to_unknown_session_fails() {
        let sessions = SseSessions::new();
        assert!(!sessions.push("ghost", serde_json::json!({})));
    }

    #[test]
    fn push_to_registered_session_succeeds() {
        let sessions = SseSessions::new();
        let (id, mut rx) = sessions.register();
        assert!(sessions.push(&id, serde_json::json!({"ok": true})));
        assert_eq!(rx.try_recv().unwrap()["ok"], true);
    }
}
