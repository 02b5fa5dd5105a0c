//! Shared application state handed to every axum handler.

use std::sync::Arc;

use mcphub_core::HubFacade;
use mcphub_domain::config::ListenConfig;

use crate::sse::SseSessions;

#[derive(Clone)]
pub struct HubState {
    // ── core ─────────────────────────────────────────────────────
    pub facade: Arc<HubFacade>,

    // ── listener / front-end config ─────────────────────────────
    pub listen: ListenConfig,

    // ── SSE transport bookkeeping ────────────────────────────────
    pub sse_sessions: Arc<SseSessions>,
}

impl HubState {
    pub fn new(facade: Arc<HubFacade>, listen: ListenConfig) -> Self {
        Self {
            facade,
            listen,
            sse_sessions: Arc::new(SseSessions::new()),
        }
    }
}
