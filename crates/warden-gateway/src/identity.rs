//! Identity registry
//!
//! Principal records with credential lifecycle: register, lookup, list,
//! proof-of-possession verification, revocation, renewal. The registry is
//! in-memory; restart drops every record, and revoked records are never
//! evicted so an identifier can never be reused.
//!
//! Lock discipline: one reader-writer lock over the principal table. The
//! registry never holds that lock across an audit append.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;

use warden_core::crypto::{self, KeyPair, PublicKey};
use warden_core::{CryptoError, Principal, PrincipalStatus};

use crate::audit::{AuditLog, EventStatus, EventType};

/// Challenge nonce length in bytes (stored hex-encoded)
const NONCE_LEN: usize = 16;

/// Errors returned by registry operations
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Identifier already registered (including revoked records)
    #[error("Principal '{0}' is already registered")]
    Conflict(String),

    /// No record for the identifier
    #[error("Principal '{0}' not found")]
    NotFound(String),

    /// Record exists but has been revoked
    #[error("Principal '{0}' is not active")]
    Inactive(String),

    /// Credential TTL has elapsed
    #[error("Credentials for principal '{0}' have expired")]
    Expired(String),

    /// Supplied nonce does not match the stored challenge
    #[error("Nonce mismatch")]
    NonceMismatch,

    /// Signature malformed or did not verify over the stored nonce
    #[error("Signature verification failed")]
    BadSignature,

    /// Stored key material failed to parse; indicates an internal invariant
    /// violation, not caller input
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

/// Counts by effective status, for the gateway's observability surface
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStats {
    pub total: usize,
    pub active: usize,
    pub revoked: usize,
    pub expired: usize,
}

/// In-memory principal registry
pub struct Registry {
    principals: RwLock<HashMap<String, Principal>>,
    audit: Arc<AuditLog>,
    credential_ttl: i64,
}

impl Registry {
    pub fn new(audit: Arc<AuditLog>, credential_ttl: i64) -> Self {
        Self {
            principals: RwLock::new(HashMap::new()),
            audit,
            credential_ttl,
        }
    }

    /// Register a new principal, issuing a keypair and challenge nonce
    ///
    /// Fails with [`IdentityError::Conflict`] if the identifier exists in
    /// any state. The returned record carries the private key; it is the
    /// only moment the gateway emits it.
    pub fn register(&self, id: &str) -> Result<Principal, IdentityError> {
        let keypair = KeyPair::generate();
        let nonce = crypto::to_hex(&crypto::random_bytes(NONCE_LEN));
        let now = chrono::Utc::now().timestamp();

        let record = Principal {
            id: id.to_string(),
            public_key: keypair.public_key().to_hex(),
            private_key: Some(keypair.private_key_hex()),
            nonce,
            created_at: now,
            expires_at: now + self.credential_ttl,
            status: PrincipalStatus::Active,
        };

        {
            let mut principals = self.principals.write().unwrap();
            if principals.contains_key(id) {
                return Err(IdentityError::Conflict(id.to_string()));
            }
            principals.insert(id.to_string(), record.clone());
        }

        self.audit.append(
            EventType::Register,
            id,
            "agent_registration",
            EventStatus::Success,
            json!({ "expires_at": record.expires_at }),
        );
        info!(agent_id = %id, expires_at = record.expires_at, "Registered principal");

        Ok(record)
    }

    /// Fetch a principal record (private key included; callers that emit
    /// records outward must sanitize)
    pub fn get(&self, id: &str) -> Result<Principal, IdentityError> {
        let principals = self.principals.read().unwrap();
        principals
            .get(id)
            .cloned()
            .ok_or_else(|| IdentityError::NotFound(id.to_string()))
    }

    /// All records with private keys stripped
    pub fn list(&self) -> Vec<Principal> {
        let principals = self.principals.read().unwrap();
        principals.values().map(Principal::sanitized).collect()
    }

    /// Verify a proof-of-possession signature
    ///
    /// The supplied nonce must equal the stored challenge byte-for-byte,
    /// and the signature must verify over the ASCII bytes of that stored
    /// hex nonce with the principal's public key. Every outcome is audited.
    pub fn verify(
        &self,
        id: &str,
        signature_hex: &str,
        nonce_hex: &str,
    ) -> Result<(), IdentityError> {
        let result = self.check_proof(id, signature_hex, nonce_hex);

        match &result {
            Ok(()) => {
                self.audit.append(
                    EventType::Verify,
                    id,
                    "agent_verification",
                    EventStatus::Success,
                    json!({ "nonce_verified": true }),
                );
            }
            Err(err) => {
                self.audit.append(
                    EventType::Verify,
                    id,
                    "agent_verification",
                    EventStatus::Failure,
                    json!({ "reason": err.to_string() }),
                );
            }
        }

        result
    }

    fn check_proof(
        &self,
        id: &str,
        signature_hex: &str,
        nonce_hex: &str,
    ) -> Result<(), IdentityError> {
        // Read path: copy what the checks need, then release the lock so
        // the audit append never nests inside it.
        let (status, expires_at, stored_nonce, public_key_hex) = {
            let principals = self.principals.read().unwrap();
            let record = principals
                .get(id)
                .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;
            (
                record.status,
                record.expires_at,
                record.nonce.clone(),
                record.public_key.clone(),
            )
        };

        if status != PrincipalStatus::Active {
            return Err(IdentityError::Inactive(id.to_string()));
        }
        if chrono::Utc::now().timestamp() > expires_at {
            return Err(IdentityError::Expired(id.to_string()));
        }
        if nonce_hex != stored_nonce {
            return Err(IdentityError::NonceMismatch);
        }

        let signature =
            crypto::from_hex(signature_hex).map_err(|_| IdentityError::BadSignature)?;
        let public_key = PublicKey::from_hex(&public_key_hex)?;

        public_key
            .verify(stored_nonce.as_bytes(), &signature)
            .map_err(|_| IdentityError::BadSignature)
    }

    /// Revoke a principal; terminal and idempotent
    ///
    /// Returns ok for already-revoked principals without re-auditing.
    pub fn revoke(&self, id: &str) -> Result<(), IdentityError> {
        let transitioned = {
            let mut principals = self.principals.write().unwrap();
            let record = principals
                .get_mut(id)
                .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;

            if record.status == PrincipalStatus::Revoked {
                false
            } else {
                record.status = PrincipalStatus::Revoked;
                true
            }
        };

        if transitioned {
            self.audit.append(
                EventType::Revoke,
                id,
                "agent_revocation",
                EventStatus::Success,
                json!({ "revoked_at": chrono::Utc::now().timestamp() }),
            );
            info!(agent_id = %id, "Revoked principal");
        }

        Ok(())
    }

    /// Reissue the challenge nonce and extend the credential TTL
    ///
    /// Works for active principals, including those whose credential has
    /// lapsed by the clock; revoked principals stay terminal.
    pub fn renew(&self, id: &str) -> Result<Principal, IdentityError> {
        let nonce = crypto::to_hex(&crypto::random_bytes(NONCE_LEN));
        let now = chrono::Utc::now().timestamp();

        let record = {
            let mut principals = self.principals.write().unwrap();
            let record = principals
                .get_mut(id)
                .ok_or_else(|| IdentityError::NotFound(id.to_string()))?;

            if record.status == PrincipalStatus::Revoked {
                return Err(IdentityError::Inactive(id.to_string()));
            }

            record.nonce = nonce;
            record.expires_at = now + self.credential_ttl;
            record.clone()
        };

        self.audit.append(
            EventType::Register,
            id,
            "credential_renewal",
            EventStatus::Success,
            json!({ "expires_at": record.expires_at }),
        );

        Ok(record)
    }

    /// Counts by effective status at the current clock
    pub fn stats(&self) -> RegistryStats {
        let now = chrono::Utc::now().timestamp();
        let principals = self.principals.read().unwrap();

        let mut stats = RegistryStats {
            total: principals.len(),
            active: 0,
            revoked: 0,
            expired: 0,
        };
        for record in principals.values() {
            match record.effective_status(now) {
                PrincipalStatus::Active => stats.active += 1,
                PrincipalStatus::Revoked => stats.revoked += 1,
                PrincipalStatus::Expired => stats.expired += 1,
            }
        }
        stats
    }
}
