//! `mcphub-core` — the hub facade (C7): startup orchestration across the
//! server manager, group manager, and tool manager; the periodic health
//! loop; message tracing; and idempotent bounded shutdown.

pub mod facade;
pub mod health;
pub mod trace;

pub use facade::HubFacade;
pub use health::{HealthReport, ServerStatusCounts};
pub use trace::{MessageTrace, TraceEntry};
