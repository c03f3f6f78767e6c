//! Component Integration Tests
//!
//! These tests exercise the components below the HTTP surface and the
//! contracts between them: registry ↔ audit, verifier ↔ registry ↔ cache,
//! limiter conservation, detector thresholds, and credential expiry.

use std::sync::Arc;
use std::time::Duration;

use warden_core::crypto::{self, KeyPair};
use warden_core::{Principal, PrincipalStatus};
use warden_gateway::analytics::{AnomalyDetector, AnomalyKind, Severity};
use warden_gateway::audit::{AuditLog, EventStatus, EventType};
use warden_gateway::identity::{IdentityError, Registry};
use warden_gateway::policy::PolicyEngine;
use warden_gateway::ratelimit::RateLimiter;
use warden_gateway::verifier::Verifier;

// =============================================================================
// Test Helpers
// =============================================================================

fn registry_with_ttl(ttl: i64) -> (Arc<Registry>, Arc<AuditLog>) {
    let audit = Arc::new(AuditLog::new());
    (
        Arc::new(Registry::new(Arc::clone(&audit), ttl)),
        audit,
    )
}

fn sign_nonce(record: &Principal) -> String {
    let keypair = KeyPair::from_private_hex(record.private_key.as_ref().unwrap()).unwrap();
    crypto::to_hex(&keypair.sign(record.nonce.as_bytes()))
}

// =============================================================================
// Credential expiry (scenario: TTL of one second)
// =============================================================================

#[test]
fn test_credentials_expire_after_ttl() {
    let (registry, _audit) = registry_with_ttl(1);
    let record = registry.register("a3").unwrap();
    let signature = sign_nonce(&record);

    // Fresh credential verifies
    registry.verify("a3", &signature, &record.nonce).unwrap();

    std::thread::sleep(Duration::from_secs(2));

    // Past the TTL the proof is rejected and the principal inadmissible
    assert!(matches!(
        registry.verify("a3", &signature, &record.nonce),
        Err(IdentityError::Expired(_))
    ));

    let now = chrono::Utc::now().timestamp();
    let stored = registry.get("a3").unwrap();
    assert_eq!(stored.effective_status(now), PrincipalStatus::Expired);
    assert!(!stored.is_admissible(now));

    // Renewal revives the lapsed credential
    let renewed = registry.renew("a3").unwrap();
    assert!(renewed.is_admissible(chrono::Utc::now().timestamp()));
}

// =============================================================================
// Revocation propagation
// =============================================================================

#[test]
fn test_revocation_is_terminal_across_components() {
    let (registry, _audit) = registry_with_ttl(3600);
    let policy = PolicyEngine::new();

    let record = registry.register("a2").unwrap();
    policy.assign("a2", "user").unwrap();

    let now = chrono::Utc::now().timestamp();
    assert!(registry.get("a2").unwrap().is_admissible(now));

    registry.revoke("a2").unwrap();

    // Inadmissible for every later observer, roles notwithstanding
    assert!(!registry.get("a2").unwrap().is_admissible(now));
    assert!(policy.can("a2", "agent:read"));

    // Proofs fail, and the id can never be re-registered
    let signature = sign_nonce(&record);
    assert!(matches!(
        registry.verify("a2", &signature, &record.nonce),
        Err(IdentityError::Inactive(_))
    ));
    assert!(matches!(
        registry.register("a2"),
        Err(IdentityError::Conflict(_))
    ));
}

// =============================================================================
// Rate conservation
// =============================================================================

#[test]
fn test_admitted_count_bounded_by_burst_plus_refill() {
    let burst = 5u64;
    let rps = 2u64;
    let limiter = RateLimiter::new(rps as u32, burst as u32);

    let mut admitted = 0u64;
    for _ in 0..20 {
        if limiter.allow("a1") {
            admitted += 1;
        }
    }
    assert_eq!(admitted, burst);

    std::thread::sleep(Duration::from_millis(1100));

    for _ in 0..20 {
        if limiter.allow("a1") {
            admitted += 1;
        }
    }

    // Conservation over the ~1.1 s window: burst + ⌊t⌋·r with one second
    // of slack for a slow scheduler
    assert!(admitted >= burst + rps);
    assert!(admitted <= burst + 2 * rps);
}

// =============================================================================
// Anomaly emission (scenario: 101 requests → one rate_spike)
// =============================================================================

#[test]
fn test_sustained_volume_emits_rate_spike() {
    let audit = Arc::new(AuditLog::new());
    let detector = AnomalyDetector::new(Arc::clone(&audit));

    for _ in 0..101 {
        detector.record_request("a1");
    }

    let anomalies = detector.anomalies();
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].kind, AnomalyKind::RateSpike);
    assert_eq!(anomalies[0].severity, Severity::Medium);
    assert_eq!(anomalies[0].agent_id, "a1");

    // Mirrored into the audit trail as ANOMALY
    let mirrored = audit
        .filter("a1")
        .into_iter()
        .filter(|e| e.event_type == EventType::Anomaly)
        .count();
    assert_eq!(mirrored, 1);
}

#[test]
fn test_repeated_failures_emit_high_severity() {
    let audit = Arc::new(AuditLog::new());
    let detector = AnomalyDetector::new(audit);

    for _ in 0..6 {
        detector.record_failed_auth("intruder");
    }

    let anomalies = detector.anomalies_for("intruder");
    assert_eq!(anomalies.len(), 1);
    assert_eq!(anomalies[0].kind, AnomalyKind::FailedAuth);
    assert_eq!(anomalies[0].severity, Severity::High);
}

// =============================================================================
// Verification flow end to end
// =============================================================================

#[test]
fn test_proof_lifecycle_success_and_cache() {
    let (registry, audit) = registry_with_ttl(3600);
    let verifier = Verifier::new(Arc::clone(&registry), Duration::from_secs(300));

    let record = registry.register("a1").unwrap();
    verifier.enqueue("a1", sign_nonce(&record), record.nonce.clone());

    assert!(!verifier.is_recently_verified("a1"));
    verifier.process_due();
    assert!(verifier.is_recently_verified("a1"));

    let verify_events: Vec<_> = audit
        .filter("a1")
        .into_iter()
        .filter(|e| e.event_type == EventType::Verify)
        .collect();
    assert_eq!(verify_events.len(), 1);
    assert_eq!(verify_events[0].status, EventStatus::Success);
}

#[test]
fn test_failed_proof_audited_and_cache_stays_cold() {
    let (registry, audit) = registry_with_ttl(3600);
    let verifier = Verifier::new(Arc::clone(&registry), Duration::from_secs(300));

    let record = registry.register("a1").unwrap();
    let forged = crypto::to_hex(&KeyPair::generate().sign(record.nonce.as_bytes()));
    verifier.enqueue("a1", forged, record.nonce.clone());
    verifier.process_due();

    assert!(!verifier.is_recently_verified("a1"));

    let failures: Vec<_> = audit
        .filter("a1")
        .into_iter()
        .filter(|e| e.event_type == EventType::Verify && e.status == EventStatus::Failure)
        .collect();
    assert_eq!(failures.len(), 1);
}

#[test]
fn test_revoked_principal_cannot_warm_cache() {
    let (registry, _audit) = registry_with_ttl(3600);
    let verifier = Verifier::new(Arc::clone(&registry), Duration::from_secs(300));

    let record = registry.register("a1").unwrap();
    registry.revoke("a1").unwrap();

    verifier.enqueue("a1", sign_nonce(&record), record.nonce.clone());
    verifier.process_due();

    assert!(!verifier.is_recently_verified("a1"));
}

// =============================================================================
// Lifecycle ordering in the audit trail
// =============================================================================

#[test]
fn test_lifecycle_events_ordered_per_principal() {
    let (registry, audit) = registry_with_ttl(3600);
    let verifier = Verifier::new(Arc::clone(&registry), Duration::from_secs(300));

    let record = registry.register("a1").unwrap();
    verifier.enqueue("a1", sign_nonce(&record), record.nonce.clone());
    verifier.process_due();
    registry.revoke("a1").unwrap();

    let events = audit.filter("a1");
    let types: Vec<String> = events.iter().map(|e| e.event_type.to_string()).collect();
    assert_eq!(types, vec!["REGISTER", "VERIFY", "REVOKE"]);
    assert!(events.windows(2).all(|w| w[0].seq < w[1].seq));
}
