//! Sliding-window rate limiting per `(toolId, clientId)`, with violation
//! tracking that escalates to a suspicious-activity security event.
//!
//! Mirrors the in-memory, lock-protected tracker idiom used for daily quota
//! enforcement elsewhere in the hub: a `parking_lot::RwLock<HashMap<..>>`
//! with auto-resetting windows, no background sweeper required.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

/// Consecutive violations within the detection window before a
/// `SUSPICIOUS_ACTIVITY` event is additionally emitted.
const SUSPICIOUS_ACTIVITY_THRESHOLD: u32 = 3;
const DETECTION_WINDOW: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecurityEventSeverity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEventKind {
    RateLimitExceeded,
    SuspiciousActivity,
}

#[derive(Debug, Clone)]
pub struct SecurityEvent {
    pub kind: SecurityEventKind,
    pub severity: SecurityEventSeverity,
    pub tool_id: String,
    pub client_id: Option<String>,
}

struct Window {
    count: u32,
    window_start: Instant,
    last_request: Instant,
    violation_count: u32,
    last_violation: Option<Instant>,
}

/// Outcome of [`RateLimiter::check`].
pub enum RateLimitDecision {
    Allowed,
    /// The call must be rejected; any security events to emit are included.
    Denied(Vec<SecurityEvent>),
}

pub struct RateLimiter {
    windows: RwLock<HashMap<(String, String), Window>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Check and record one call against `(tool_id, client_id)`'s sliding
    /// window of `max_requests` per `window`. `client_id` defaults to
    /// `"anonymous"` when the caller carries no identity.
    pub fn check(
        &self,
        tool_id: &str,
        client_id: Option<&str>,
        max_requests: u32,
        window: Duration,
    ) -> RateLimitDecision {
        let key = (tool_id.to_string(), client_id.unwrap_or("anonymous").to_string());
        let now = Instant::now();

        let mut windows = self.windows.write();
        let entry = windows.entry(key).or_insert_with(|| Window {
            count: 0,
            window_start: now,
            last_request: now,
            violation_count: 0,
            last_violation: None,
        });

        if now.duration_since(entry.window_start) >= window {
            entry.window_start = now;
            entry.count = 0;
        }

        entry.last_request = now;

        if entry.count >= max_requests {
            entry.violation_count += 1;
            entry.last_violation = Some(now);

            let mut events = vec![SecurityEvent {
                kind: SecurityEventKind::RateLimitExceeded,
                severity: SecurityEventSeverity::Medium,
                tool_id: tool_id.to_string(),
                client_id: client_id.map(str::to_string),
            }];

            let within_detection_window = entry
                .last_violation
                .is_some_and(|_| now.duration_since(entry.window_start) <= DETECTION_WINDOW);
            if within_detection_window && entry.violation_count >= SUSPICIOUS_ACTIVITY_THRESHOLD {
                events.push(SecurityEvent {
                    kind: SecurityEventKind::SuspiciousActivity,
                    severity: SecurityEventSeverity::High,
                    tool_id: tool_id.to_string(),
                    client_id: client_id.map(str::to_string),
                });
            }

            return RateLimitDecision::Denied(events);
        }

        entry.count += 1;
        RateLimitDecision::Allowed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_calls_within_limit() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(matches!(
                limiter.check("weather", Some("client-a"), 5, Duration::from_secs(60)),
                RateLimitDecision::Allowed
            ));
        }
    }

    #[test]
    fn denies_once_limit_is_reached() {
        let limiter = RateLimiter::new();
        for _ in 0..3 {
            limiter.check("weather", Some("client-a"), 3, Duration::from_secs(60));
        }
        match limiter.check("weather", Some("client-a"), 3, Duration::from_secs(60)) {
            RateLimitDecision::Denied(events) => {
                assert_eq!(events[0].kind, SecurityEventKind::RateLimitExceeded);
            }
            RateLimitDecision::Allowed => panic!("expected denial"),
        }
    }

    #[test]
    fn escalates_to_suspicious_activity_after_repeated_violations() {
        let limiter = RateLimiter::new();
        limiter.check("weather", Some("client-a"), 1, Duration::from_secs(60));
        limiter.check("weather", Some("client-a"), 1, Duration::from_secs(60)); // violation 1
        limiter.check("weather", Some("client-a"), 1, Duration::from_secs(60)); // violation 2
        let decision = limiter.check("weather", Some("client-a"), 1, Duration::from_secs(60)); // violation 3
        match decision {
            RateLimitDecision::Denied(events) => {
                assert!(events.iter().any(|e| e.kind == SecurityEventKind::SuspiciousActivity));
            }
            RateLimitDecision::Allowed => panic!("expected denial"),
        }
    }

    #[test]
    fn different_clients_have_independent_windows() {
        let limiter = RateLimiter::new();
        limiter.check("weather", Some("client-a"), 1, Duration::from_secs(60));
        assert!(matches!(
            limiter.check("weather", Some("client-b"), 1, Duration::from_secs(60)),
            RateLimitDecision::Allowed
        ));
    }
}
