//! Periodic health report: per-server status counts, per-group
//! availability, and the overall health score.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default)]
pub struct ServerStatusCounts {
    pub connected: usize,
    pub connecting: usize,
    pub error: usize,
    pub disconnected: usize,
}

impl ServerStatusCounts {
    pub fn total(&self) -> usize {
        self.connected + self.connecting + self.error + self.disconnected
    }
}

#[derive(Debug, Clone)]
pub struct HealthReport {
    pub servers: ServerStatusCounts,
    pub group_count: usize,
    pub fallback_group_count: usize,
    pub score: u8,
    pub computed_at: DateTime<Utc>,
}

/// `100 − 30·critical − 10·warning`, clamped to `[0, 100]`.
///
/// A server stuck in `ERROR` counts as critical (it answers no calls at
/// all); a group demoted to fallback counts as a warning (it is reachable
/// but currently exposes nothing).
pub fn compute_score(critical: u32, warning: u32) -> u8 {
    let raw = 100 - 30 * critical as i64 - 10 * warning as i64;
    raw.clamp(0, 100) as u8
}

impl HealthReport {
    pub fn build(servers: ServerStatusCounts, group_count: usize, fallback_group_count: usize) -> Self {
        let score = compute_score(servers.error as u32, fallback_group_count as u32);
        Self {
            servers,
            group_count,
            fallback_group_count,
            score,
            computed_at: Utc::now(),
        }
    }
}
