//! Append-only audit log
//!
//! Every pipeline outcome and lifecycle operation lands here as an
//! immutable event with a globally increasing sequence number. The log is
//! in-memory and bounded only by process memory; restart empties it.
//!
//! The log is a leaf resource: it never calls into other components, and
//! callers must not hold their own locks across [`AuditLog::append`].

use std::sync::RwLock;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

/// Kind of event being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Register,
    Verify,
    Revoke,
    AuthzDeny,
    RateDeny,
    Anomaly,
    Admit,
    BackendError,
    Internal,
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            EventType::Register => "REGISTER",
            EventType::Verify => "VERIFY",
            EventType::Revoke => "REVOKE",
            EventType::AuthzDeny => "AUTHZ_DENY",
            EventType::RateDeny => "RATE_DENY",
            EventType::Anomaly => "ANOMALY",
            EventType::Admit => "ADMIT",
            EventType::BackendError => "BACKEND_ERROR",
            EventType::Internal => "INTERNAL",
        };
        write!(f, "{}", s)
    }
}

/// Outcome recorded with the event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum EventStatus {
    Success,
    Failure,
}

/// One immutable audit record
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    /// Monotonically increasing sequence number, starts at 1
    pub seq: u64,

    /// Wall-clock time of the append, Unix seconds
    pub timestamp: i64,

    pub event_type: EventType,

    /// Principal the event is attributed to
    pub agent_id: String,

    /// What was attempted (route path or lifecycle action)
    pub action: String,

    pub status: EventStatus,

    /// Free-form structured detail
    pub details: Value,
}

/// Append-only, in-memory event stream
pub struct AuditLog {
    events: RwLock<Vec<AuditEvent>>,
}

impl AuditLog {
    pub fn new() -> Self {
        Self {
            events: RwLock::new(Vec::new()),
        }
    }

    /// Append an event, assigning the next sequence number and a wall-clock
    /// stamp under the writer lock. Returns the assigned sequence number.
    ///
    /// Append is infallible for this in-memory log; should a persistent
    /// backend replace it, failures must be reported out-of-band and never
    /// propagate to the request path.
    pub fn append(
        &self,
        event_type: EventType,
        agent_id: impl Into<String>,
        action: impl Into<String>,
        status: EventStatus,
        details: Value,
    ) -> u64 {
        let event = {
            let mut events = self.events.write().unwrap();
            let event = AuditEvent {
                seq: events.len() as u64 + 1,
                timestamp: chrono::Utc::now().timestamp(),
                event_type,
                agent_id: agent_id.into(),
                action: action.into(),
                status,
                details,
            };
            events.push(event.clone());
            event
        };

        info!(
            seq = event.seq,
            event_type = %event.event_type,
            agent_id = %event.agent_id,
            action = %event.action,
            status = ?event.status,
            "audit"
        );

        event.seq
    }

    /// Ordered copy of the whole stream
    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.events.read().unwrap().clone()
    }

    /// Events attributed to one principal, in append order
    pub fn filter(&self, agent_id: &str) -> Vec<AuditEvent> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter(|e| e.agent_id == agent_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.events.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_assigns_increasing_seq() {
        let log = AuditLog::new();

        let s1 = log.append(
            EventType::Register,
            "a1",
            "agent_registration",
            EventStatus::Success,
            json!({}),
        );
        let s2 = log.append(
            EventType::Admit,
            "a1",
            "/identity/list",
            EventStatus::Success,
            json!({}),
        );

        assert_eq!(s1, 1);
        assert_eq!(s2, 2);

        let events = log.snapshot();
        assert_eq!(events.len(), 2);
        assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
    }

    #[test]
    fn test_filter_by_principal() {
        let log = AuditLog::new();
        log.append(
            EventType::Register,
            "a1",
            "agent_registration",
            EventStatus::Success,
            json!({}),
        );
        log.append(
            EventType::Register,
            "a2",
            "agent_registration",
            EventStatus::Success,
            json!({}),
        );
        log.append(
            EventType::Revoke,
            "a1",
            "agent_revocation",
            EventStatus::Success,
            json!({}),
        );

        let a1 = log.filter("a1");
        assert_eq!(a1.len(), 2);
        assert_eq!(a1[0].event_type, EventType::Register);
        assert_eq!(a1[1].event_type, EventType::Revoke);

        assert!(log.filter("unknown").is_empty());
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let log = AuditLog::new();
        log.append(
            EventType::Admit,
            "a1",
            "/health",
            EventStatus::Success,
            json!({}),
        );

        let snap = log.snapshot();
        log.append(
            EventType::Admit,
            "a1",
            "/health",
            EventStatus::Success,
            json!({}),
        );

        assert_eq!(snap.len(), 1);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn test_concurrent_appends_stay_strictly_ordered() {
        use std::sync::Arc;

        let log = Arc::new(AuditLog::new());
        let mut handles = Vec::new();

        for t in 0..8 {
            let log = Arc::clone(&log);
            handles.push(std::thread::spawn(move || {
                for _ in 0..50 {
                    log.append(
                        EventType::Admit,
                        format!("agent-{}", t),
                        "/backend/execute",
                        EventStatus::Success,
                        json!({}),
                    );
                }
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        let events = log.snapshot();
        assert_eq!(events.len(), 400);
        for (i, event) in events.iter().enumerate() {
            assert_eq!(event.seq, i as u64 + 1);
        }
    }
}
