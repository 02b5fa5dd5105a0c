//! Route table: ungrouped `/mcp`, `/sse` + `/messages`, and their
//! `/{groupId}/...` scoped variants, plus a `/status` health endpoint.

use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower::ServiceBuilder;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::GovernorLayer;
use tower_http::trace::TraceLayer;
use mcphub_transport::MAX_MESSAGE_BYTES;

use crate::cors::build_cors_layer;
use crate::http_mcp::{handle_group_mcp, handle_mcp, handle_status};
use crate::sse::{handle_group_messages, handle_group_sse, handle_messages, handle_sse};
use crate::state::HubState;

pub fn build_router(state: HubState) -> Router {
    let cors = build_cors_layer(&state.listen.cors);

    let governor_conf = Box::new(
        GovernorConfigBuilder::default()
            .per_second(2)
            .burst_size(20)
            .finish()
            .expect("static governor config is always valid"),
    );
    let governor_layer = GovernorLayer { config: Box::leak(governor_conf) };

    Router::new()
        .route("/status", get(handle_status))
        .route("/mcp", post(handle_mcp))
        .route("/sse", get(handle_sse))
        .route("/messages", post(handle_messages))
        .route("/:group_id/mcp", post(handle_group_mcp))
        .route("/:group_id/sse", get(handle_group_sse))
        .route("/:group_id/messages", post(handle_group_messages))
        .layer(DefaultBodyLimit::max(MAX_MESSAGE_BYTES))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(governor_layer),
        )
        .with_state(state)
}

/// Bounded shutdown future: resolves on Ctrl-C or SIGTERM, whichever first.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

pub const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);
