//! Shared error taxonomy used across all hub crates.
//!
//! Every variant corresponds to a stable error code that crosses the wire
//! in `{success:false, error:{code, message, details}}` responses. Adding a
//! variant means adding a line to [`HubError::code`] too — the two must
//! never drift.

use serde::Serialize;

#[derive(thiserror::Error, Debug)]
pub enum HubError {
    #[error("config error: {0}")]
    Config(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("server not initialized: {0}")]
    ServerNotInitialized(String),

    #[error("server not found: {0}")]
    ServerNotFound(String),

    #[error("server already connected: {0}")]
    ServerAlreadyConnected(String),

    #[error("group not found: {0}")]
    GroupNotFound(String),

    #[error("invalid group reference: {0}")]
    InvalidGroupReference(String),

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("no servers available for group: {0}")]
    NoServersAvailable(String),

    #[error("tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("tool execution cancelled: {0}")]
    ToolExecutionCancelled(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("unresolved template variable: {0}")]
    UnresolvedTemplateVariable(String),

    #[error("JSONata execution error: {0}")]
    JsonataExecutionError(String),

    #[error("rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    #[error("suspicious activity: {0}")]
    SuspiciousActivity(String),

    #[error("auth failed: {0}")]
    AuthFailed(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("server error: {0}")]
    ServerError(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HubError>;

impl HubError {
    /// Stable string code carried over the wire. Never renamed once shipped.
    pub fn code(&self) -> &'static str {
        match self {
            HubError::Config(_) => "ConfigError",
            HubError::Transport(_) => "TransportError",
            HubError::ServerNotInitialized(_) => "ServerNotInitialized",
            HubError::ServerNotFound(_) => "ServerNotFound",
            HubError::ServerAlreadyConnected(_) => "ServerAlreadyConnected",
            HubError::GroupNotFound(_) => "GroupNotFound",
            HubError::InvalidGroupReference(_) => "InvalidGroupReference",
            HubError::AccessDenied(_) => "AccessDenied",
            HubError::ToolNotFound(_) => "ToolNotFound",
            HubError::NoServersAvailable(_) => "NoServersAvailable",
            HubError::ToolExecutionFailed(_) => "ToolExecutionFailed",
            HubError::ToolExecutionCancelled(_) => "ToolExecutionCancelled",
            HubError::InvalidParams(_) => "InvalidParams",
            HubError::UnresolvedTemplateVariable(_) => "UnresolvedTemplateVariable",
            HubError::JsonataExecutionError(_) => "JSONataExecutionError",
            HubError::RateLimitExceeded(_) => "RateLimitExceeded",
            HubError::SuspiciousActivity(_) => "SuspiciousActivity",
            HubError::AuthFailed(_) => "AuthFailed",
            HubError::Forbidden(_) => "Forbidden",
            HubError::NotFound(_) => "NotFound",
            HubError::ServerError(_) => "ServerError",
            HubError::Io(_) => "IoError",
            HubError::Json(_) => "JsonError",
        }
    }

    /// HTTP status mirroring severity, per the user-visible behaviour contract.
    pub fn http_status(&self) -> u16 {
        match self {
            HubError::InvalidParams(_)
            | HubError::UnresolvedTemplateVariable(_)
            | HubError::JsonataExecutionError(_)
            | HubError::Config(_) => 400,
            HubError::AuthFailed(_) => 401,
            HubError::Forbidden(_) | HubError::AccessDenied(_) | HubError::SuspiciousActivity(_) => 403,
            HubError::NotFound(_)
            | HubError::ToolNotFound(_)
            | HubError::ServerNotFound(_)
            | HubError::GroupNotFound(_) => 404,
            HubError::ServerAlreadyConnected(_) => 409,
            HubError::RateLimitExceeded(_) => 429,
            HubError::ToolExecutionCancelled(_) => 499,
            _ => 500,
        }
    }
}

/// The envelope every external response is wrapped in.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            error: None,
            data: Some(data),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

impl Envelope<()> {
    pub fn err(e: &HubError) -> Self {
        Self {
            success: false,
            error: Some(ErrorBody {
                code: e.code().to_string(),
                message: e.to_string(),
                details: None,
            }),
            data: None,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_matches_spec_examples() {
        assert_eq!(HubError::InvalidParams("x".into()).http_status(), 400);
        assert_eq!(HubError::AuthFailed("x".into()).http_status(), 401);
        assert_eq!(HubError::Forbidden("x".into()).http_status(), 403);
        assert_eq!(HubError::ToolNotFound("x".into()).http_status(), 404);
        assert_eq!(HubError::RateLimitExceeded("x".into()).http_status(), 429);
        assert_eq!(HubError::ToolExecutionFailed("x".into()).http_status(), 500);
    }

    #[test]
    fn codes_are_stable_strings() {
        assert_eq!(HubError::ToolNotFound("t".into()).code(), "ToolNotFound");
        assert_eq!(HubError::RateLimitExceeded("t".into()).code(), "RateLimitExceeded");
    }
}
