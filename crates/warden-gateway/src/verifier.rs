//! Asynchronous signature verification
//!
//! Cryptographic proof checking is kept off the request path: the pipeline
//! enqueues `(principal, signature, nonce)` tuples here, a single worker
//! drains the queue every 100 ms through the registry, and successful
//! proofs land in a short-lived positive cache that later requests consult
//! instead of re-verifying.
//!
//! Queue semantics: at most one entry per principal (newer submissions
//! overwrite older ones), entries older than 30 s are dropped regardless
//! of state, and a failed proof immediately purges the principal from the
//! positive cache.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use moka::sync::Cache;
use tracing::debug;

use crate::identity::Registry;

/// Worker wake cadence
pub const WORKER_TICK: Duration = Duration::from_millis(100);

/// Age past which a queue entry is dropped, whatever its state
pub const PENDING_MAX_AGE: Duration = Duration::from_secs(30);

/// Terminal state of a queued verification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationState {
    Pending,
    Verified,
    Failed(String),
}

/// One queued proof submission
#[derive(Debug, Clone)]
pub struct PendingVerification {
    pub agent_id: String,
    pub signature_hex: String,
    pub nonce_hex: String,
    pub submitted_at: Instant,
    pub state: VerificationState,
}

/// Verification queue plus the verified-recently cache
pub struct Verifier {
    registry: Arc<Registry>,
    pending: Mutex<HashMap<String, PendingVerification>>,
    verified: Cache<String, ()>,
}

impl Verifier {
    /// `cache_ttl` bounds how long a successful proof admits requests
    /// without a fresh signature
    pub fn new(registry: Arc<Registry>, cache_ttl: Duration) -> Self {
        Self {
            registry,
            pending: Mutex::new(HashMap::new()),
            verified: Cache::builder().time_to_live(cache_ttl).build(),
        }
    }

    /// Queue a proof for background verification
    ///
    /// A newer submission for the same principal replaces any earlier one,
    /// whatever state it reached.
    pub fn enqueue(
        &self,
        agent_id: impl Into<String>,
        signature_hex: impl Into<String>,
        nonce_hex: impl Into<String>,
    ) {
        let agent_id = agent_id.into();
        let entry = PendingVerification {
            agent_id: agent_id.clone(),
            signature_hex: signature_hex.into(),
            nonce_hex: nonce_hex.into(),
            submitted_at: Instant::now(),
            state: VerificationState::Pending,
        };

        let mut pending = self.pending.lock().unwrap();
        pending.insert(agent_id, entry);
    }

    /// Whether a successful proof for `id` is still within its TTL
    pub fn is_recently_verified(&self, id: &str) -> bool {
        self.verified.get(id).is_some()
    }

    /// One drain pass: age out stale entries, verify everything pending.
    /// Returns how many proofs were checked.
    ///
    /// The queue lock is never held across a registry call, so one slow or
    /// failing verification cannot stall later submissions.
    pub fn process_due(&self) -> usize {
        self.sweep_aged(PENDING_MAX_AGE);

        let due: Vec<PendingVerification> = {
            let mut pending = self.pending.lock().unwrap();
            let ids: Vec<String> = pending
                .iter()
                .filter(|(_, e)| e.state == VerificationState::Pending)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter()
                .filter_map(|id| pending.remove(&id))
                .collect()
        };

        let mut processed = 0;
        for mut entry in due {
            let result =
                self.registry
                    .verify(&entry.agent_id, &entry.signature_hex, &entry.nonce_hex);
            processed += 1;

            match result {
                Ok(()) => {
                    self.verified.insert(entry.agent_id.clone(), ());
                    entry.state = VerificationState::Verified;
                    debug!(agent_id = %entry.agent_id, "Proof verified, cache refreshed");
                }
                Err(err) => {
                    // A failed proof must not leave a stale positive entry
                    self.verified.invalidate(&entry.agent_id);
                    entry.state = VerificationState::Failed(err.to_string());
                    debug!(agent_id = %entry.agent_id, error = %err, "Proof rejected");
                }
            }

            // Keep the terminal record unless a newer submission arrived
            // while the proof was being checked
            let mut pending = self.pending.lock().unwrap();
            pending.entry(entry.agent_id.clone()).or_insert(entry);
        }

        processed
    }

    /// Drop entries older than `max_age`
    fn sweep_aged(&self, max_age: Duration) {
        let mut pending = self.pending.lock().unwrap();
        pending.retain(|_, e| e.submitted_at.elapsed() <= max_age);
    }

    /// Current state of a queued submission, if still tracked
    pub fn state_of(&self, id: &str) -> Option<VerificationState> {
        self.pending.lock().unwrap().get(id).map(|e| e.state.clone())
    }

    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }
}

/// Background worker draining the queue on a fixed cadence
pub async fn run_worker(verifier: Arc<Verifier>) {
    let mut ticker = tokio::time::interval(WORKER_TICK);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;
        verifier.process_due();
    }
}
