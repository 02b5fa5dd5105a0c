//! `mcphub-groups` — named subsets of servers and tools, with an optional
//! hashed access key gating a group's visibility.

pub mod key;
pub mod manager;

pub use manager::{GroupHealthReport, GroupManager, ToolFilter};
