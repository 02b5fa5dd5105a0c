//! `mcphub-catalogue` — aggregates tools from the server manager and the
//! API-to-MCP engine into a per-group catalogue, with caching and dispatch.

pub mod cache;
pub mod manager;

pub use cache::{CacheItem, CacheStats, CatalogueCache};
pub use manager::ToolManager;
