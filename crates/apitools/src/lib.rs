//! `mcphub-apitools` — turns a declarative `ApiToolConfig` into an
//! executable MCP tool: parameter validation, template rendering, domain
//! whitelisting, rate limiting, HTTP dispatch, and response shaping.

pub mod engine;
pub mod jsonata_shim;
pub mod rate_limit;
pub mod response;
pub mod security_log;
pub mod template;
pub mod validation;
pub mod whitelist;

pub use engine::ApiToolEngine;
pub use rate_limit::{RateLimitDecision, RateLimiter, SecurityEvent, SecurityEventKind, SecurityEventSeverity};
