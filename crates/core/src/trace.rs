//! Message trace ring buffer: the last `capacity` MCP messages crossing any
//! server connection, for the observability collaborator to query.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use mcphub_apitools::security_log::redact;
use mcphub_transport::MessageDirection;
use parking_lot::Mutex;
use serde_json::Value;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct TraceEntry {
    pub id: Uuid,
    pub ts: DateTime<Utc>,
    pub server_id: String,
    pub direction: MessageDirection,
    pub method: String,
    pub payload: Value,
}

pub struct MessageTrace {
    capacity: usize,
    entries: Mutex<VecDeque<TraceEntry>>,
}

impl MessageTrace {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
        }
    }

    /// Record one message, redacting its payload the same way the API
    /// engine redacts call parameters before they reach a log line.
    pub fn record(&self, server_id: impl Into<String>, direction: MessageDirection, method: impl Into<String>, payload: &Value) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(TraceEntry {
            id: Uuid::new_v4(),
            ts: Utc::now(),
            server_id: server_id.into(),
            direction,
            method: method.into(),
            payload: redact(payload, &[]),
        });
    }

    pub fn snapshot(&self) -> Vec<TraceEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn records_and_snapshots_entries() {
        let trace = MessageTrace::new(10);
        trace.record("server-a", MessageDirection::Outbound, "tools/call", &json!({ "name": "echo" }));
        let snapshot = trace.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].method, "tools/call");
    }

    #[test]
    fn evicts_oldest_entry_past_capacity() {
        let trace = MessageTrace::new(2);
        trace.record("a", MessageDirection::Inbound, "m1", &json!({}));
        trace.record("a", MessageDirection::Inbound, "m2", &json!({}));
        trace.record("a", MessageDirection::Inbound, "m3", &json!({}));
        let snapshot = trace.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].method, "m2");
        assert_eq!(snapshot[1].method, "m3");
    }

    #[test]
    fn redacts_sensitive_payload_fields() {
        let trace = MessageTrace::new(10);
        trace.record("a", MessageDirection::Outbound, "tools/call", &json!({ "password": "hunter2" }));
        assert_eq!(trace.snapshot()[0].payload["password"], "***REDACTED***");
    }
}
