//! Behavioral anomaly detection
//!
//! Tracks a behavior profile per principal and emits anomalies when
//! thresholds are crossed: sustained request volume (`rate_spike`, medium)
//! and repeated authentication failures (`failed_auth`, high). Counters
//! are not reset on emission, so a principal past a threshold keeps
//! emitting on every further hit; the anomaly list is the raw stream.
//!
//! The detector observes; it never blocks admission. Each emission is
//! mirrored to the audit log after the detector's own lock is released.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::audit::{AuditLog, EventStatus, EventType};

/// Default request-count threshold for a rate spike
pub const RATE_SPIKE_THRESHOLD: u64 = 100;

/// Default failed-auth threshold for a brute-force signal
pub const FAILED_AUTH_THRESHOLD: u64 = 5;

/// Anomaly classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    RateSpike,
    FailedAuth,
}

impl std::fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnomalyKind::RateSpike => write!(f, "rate_spike"),
            AnomalyKind::FailedAuth => write!(f, "failed_auth"),
        }
    }
}

/// Severity attached to an anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

/// One emitted anomaly
#[derive(Debug, Clone, Serialize)]
pub struct Anomaly {
    pub anomaly_id: String,
    pub timestamp: i64,
    pub agent_id: String,
    #[serde(rename = "type")]
    pub kind: AnomalyKind,
    pub severity: Severity,
    pub description: String,
    pub details: serde_json::Value,
}

/// Per-principal behavior counters
#[derive(Debug, Clone, Default, Serialize)]
pub struct BehaviorProfile {
    pub agent_id: String,
    pub request_count: u64,
    pub failed_auth_count: u64,
    pub last_request_time: i64,
    pub last_failure_time: i64,
    pub anomaly_count: u64,
}

/// Severity histogram plus coverage counts
#[derive(Debug, Clone, Serialize)]
pub struct DetectorStats {
    pub monitored_agents: usize,
    pub total_anomalies: usize,
    pub high_severity: usize,
    pub medium_severity: usize,
    pub low_severity: usize,
}

struct DetectorState {
    behaviors: HashMap<String, BehaviorProfile>,
    anomalies: Vec<Anomaly>,
}

/// Threshold-based anomaly detector
pub struct AnomalyDetector {
    inner: RwLock<DetectorState>,
    audit: Arc<AuditLog>,
    rate_spike_threshold: u64,
    failed_auth_threshold: u64,
}

impl AnomalyDetector {
    pub fn new(audit: Arc<AuditLog>) -> Self {
        Self::with_thresholds(audit, RATE_SPIKE_THRESHOLD, FAILED_AUTH_THRESHOLD)
    }

    pub fn with_thresholds(
        audit: Arc<AuditLog>,
        rate_spike_threshold: u64,
        failed_auth_threshold: u64,
    ) -> Self {
        Self {
            inner: RwLock::new(DetectorState {
                behaviors: HashMap::new(),
                anomalies: Vec::new(),
            }),
            audit,
            rate_spike_threshold,
            failed_auth_threshold,
        }
    }

    /// Record one admitted request for `id`
    pub fn record_request(&self, id: &str) {
        let now = chrono::Utc::now().timestamp();
        let emitted = {
            let mut guard = self.inner.write().unwrap();
            let state = &mut *guard;
            let profile = profile_mut(&mut state.behaviors, id);
            profile.request_count += 1;
            profile.last_request_time = now;

            if profile.request_count > self.rate_spike_threshold {
                let anomaly = Anomaly {
                    anomaly_id: format!("anom_{}", Uuid::new_v4().simple()),
                    timestamp: now,
                    agent_id: id.to_string(),
                    kind: AnomalyKind::RateSpike,
                    severity: Severity::Medium,
                    description: format!("Agent {} exceeded request rate threshold", id),
                    details: json!({
                        "request_count": profile.request_count,
                        "threshold": self.rate_spike_threshold,
                    }),
                };
                profile.anomaly_count += 1;
                state.anomalies.push(anomaly.clone());
                Some(anomaly)
            } else {
                None
            }
        };

        if let Some(anomaly) = emitted {
            self.publish(&anomaly);
        }
    }

    /// Record one failed authentication or authorization attempt for `id`
    pub fn record_failed_auth(&self, id: &str) {
        let now = chrono::Utc::now().timestamp();
        let emitted = {
            let mut guard = self.inner.write().unwrap();
            let state = &mut *guard;
            let profile = profile_mut(&mut state.behaviors, id);
            profile.failed_auth_count += 1;
            profile.last_failure_time = now;

            if profile.failed_auth_count > self.failed_auth_threshold {
                let anomaly = Anomaly {
                    anomaly_id: format!("anom_{}", Uuid::new_v4().simple()),
                    timestamp: now,
                    agent_id: id.to_string(),
                    kind: AnomalyKind::FailedAuth,
                    severity: Severity::High,
                    description: format!("Agent {} exceeded failed authentication attempts", id),
                    details: json!({
                        "failed_attempts": profile.failed_auth_count,
                        "threshold": self.failed_auth_threshold,
                    }),
                };
                profile.anomaly_count += 1;
                state.anomalies.push(anomaly.clone());
                Some(anomaly)
            } else {
                None
            }
        };

        if let Some(anomaly) = emitted {
            self.publish(&anomaly);
        }
    }

    fn publish(&self, anomaly: &Anomaly) {
        warn!(
            agent_id = %anomaly.agent_id,
            kind = %anomaly.kind,
            severity = ?anomaly.severity,
            "Anomaly detected"
        );
        self.audit.append(
            EventType::Anomaly,
            anomaly.agent_id.clone(),
            anomaly.kind.to_string(),
            EventStatus::Failure,
            anomaly.details.clone(),
        );
    }

    /// All emitted anomalies, in emission order
    pub fn anomalies(&self) -> Vec<Anomaly> {
        self.inner.read().unwrap().anomalies.clone()
    }

    /// Anomalies attributed to one principal
    pub fn anomalies_for(&self, id: &str) -> Vec<Anomaly> {
        self.inner
            .read()
            .unwrap()
            .anomalies
            .iter()
            .filter(|a| a.agent_id == id)
            .cloned()
            .collect()
    }

    /// Behavior profile for one principal, if any activity was recorded
    pub fn behavior(&self, id: &str) -> Option<BehaviorProfile> {
        self.inner.read().unwrap().behaviors.get(id).cloned()
    }

    /// Drop the behavior profile for a principal (operator hook); emitted
    /// anomalies are kept
    pub fn reset(&self, id: &str) {
        self.inner.write().unwrap().behaviors.remove(id);
    }

    pub fn stats(&self) -> DetectorStats {
        let state = self.inner.read().unwrap();
        let mut stats = DetectorStats {
            monitored_agents: state.behaviors.len(),
            total_anomalies: state.anomalies.len(),
            high_severity: 0,
            medium_severity: 0,
            low_severity: 0,
        };
        for anomaly in &state.anomalies {
            match anomaly.severity {
                Severity::High => stats.high_severity += 1,
                Severity::Medium => stats.medium_severity += 1,
                Severity::Low => stats.low_severity += 1,
            }
        }
        stats
    }
}

fn profile_mut<'a>(
    behaviors: &'a mut HashMap<String, BehaviorProfile>,
    id: &str,
) -> &'a mut BehaviorProfile {
    behaviors
        .entry(id.to_string())
        .or_insert_with(|| BehaviorProfile {
            agent_id: id.to_string(),
            ..BehaviorProfile::default()
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector(rate: u64, auth: u64) -> (AnomalyDetector, Arc<AuditLog>) {
        let audit = Arc::new(AuditLog::new());
        (
            AnomalyDetector::with_thresholds(Arc::clone(&audit), rate, auth),
            audit,
        )
    }

    #[test]
    fn test_no_anomaly_below_threshold() {
        let (det, _) = detector(100, 5);
        for _ in 0..100 {
            det.record_request("a1");
        }
        assert!(det.anomalies().is_empty());

        let profile = det.behavior("a1").unwrap();
        assert_eq!(profile.request_count, 100);
        assert_eq!(profile.anomaly_count, 0);
    }

    #[test]
    fn test_rate_spike_emitted_past_threshold() {
        let (det, audit) = detector(100, 5);
        for _ in 0..101 {
            det.record_request("a1");
        }

        let anomalies = det.anomalies();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, AnomalyKind::RateSpike);
        assert_eq!(anomalies[0].severity, Severity::Medium);
        assert_eq!(anomalies[0].agent_id, "a1");

        // Mirrored to audit
        let audited: Vec<_> = audit
            .filter("a1")
            .into_iter()
            .filter(|e| e.event_type == EventType::Anomaly)
            .collect();
        assert_eq!(audited.len(), 1);
    }

    #[test]
    fn test_counters_not_reset_on_emission() {
        let (det, _) = detector(3, 5);
        for _ in 0..6 {
            det.record_request("a1");
        }

        // Crossings at 4, 5 and 6: one anomaly each
        assert_eq!(det.anomalies().len(), 3);
        assert_eq!(det.behavior("a1").unwrap().anomaly_count, 3);
    }

    #[test]
    fn test_failed_auth_emitted_past_threshold() {
        let (det, _) = detector(100, 5);
        for _ in 0..6 {
            det.record_failed_auth("a1");
        }

        let anomalies = det.anomalies();
        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].kind, AnomalyKind::FailedAuth);
        assert_eq!(anomalies[0].severity, Severity::High);
    }

    #[test]
    fn test_profiles_are_per_principal() {
        let (det, _) = detector(100, 5);
        det.record_request("a1");
        det.record_failed_auth("a2");

        assert_eq!(det.behavior("a1").unwrap().request_count, 1);
        assert_eq!(det.behavior("a1").unwrap().failed_auth_count, 0);
        assert_eq!(det.behavior("a2").unwrap().failed_auth_count, 1);
        assert!(det.behavior("a3").is_none());
    }

    #[test]
    fn test_anomalies_for_filters() {
        let (det, _) = detector(1, 5);
        det.record_request("a1");
        det.record_request("a1");
        det.record_request("a2");
        det.record_request("a2");

        assert_eq!(det.anomalies_for("a1").len(), 1);
        assert_eq!(det.anomalies_for("a2").len(), 1);
        assert!(det.anomalies_for("a3").is_empty());
    }

    #[test]
    fn test_stats_histogram() {
        let (det, _) = detector(1, 1);
        det.record_request("a1");
        det.record_request("a1"); // rate_spike, medium
        det.record_failed_auth("a1");
        det.record_failed_auth("a1"); // failed_auth, high

        let stats = det.stats();
        assert_eq!(stats.monitored_agents, 1);
        assert_eq!(stats.total_anomalies, 2);
        assert_eq!(stats.medium_severity, 1);
        assert_eq!(stats.high_severity, 1);
    }

    #[test]
    fn test_reset_drops_profile_keeps_anomalies() {
        let (det, _) = detector(1, 5);
        det.record_request("a1");
        det.record_request("a1");

        det.reset("a1");
        assert!(det.behavior("a1").is_none());
        assert_eq!(det.anomalies_for("a1").len(), 1);
    }
}
