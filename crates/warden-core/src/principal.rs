//! Principal records
//!
//! A principal is a named agent identity. Its record carries the credential
//! issued at registration (Ed25519 keypair + challenge nonce) and the
//! lifecycle fields the registry decides admission from.
//!
//! Status transitions are monotone: `active → revoked` is terminal and
//! written; `active → expired` is derived from the clock, never stored.

use serde::{Deserialize, Serialize};

/// Stored lifecycle status of a principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrincipalStatus {
    Active,
    Revoked,
    Expired,
}

impl std::fmt::Display for PrincipalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrincipalStatus::Active => write!(f, "active"),
            PrincipalStatus::Revoked => write!(f, "revoked"),
            PrincipalStatus::Expired => write!(f, "expired"),
        }
    }
}

/// A registered principal with its credential
#[derive(Debug, Clone, Serialize)]
pub struct Principal {
    /// Unique, case-sensitive identifier
    pub id: String,

    /// Ed25519 public key, 64 hex chars
    pub public_key: String,

    /// Ed25519 keypair encoding, 128 hex chars; present only while the
    /// gateway holds the issued credential and stripped from every listing
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,

    /// Challenge nonce, 32 hex chars (16 random bytes)
    pub nonce: String,

    /// Registration time, Unix seconds
    pub created_at: i64,

    /// Credential expiry, Unix seconds
    pub expires_at: i64,

    /// Stored status (expiry is derived, see [`Principal::effective_status`])
    pub status: PrincipalStatus,
}

impl Principal {
    /// Whether the credential has outlived its TTL at `now`
    pub fn is_expired(&self, now: i64) -> bool {
        now > self.expires_at
    }

    /// Status as observed at `now`: revocation wins, then derived expiry
    pub fn effective_status(&self, now: i64) -> PrincipalStatus {
        match self.status {
            PrincipalStatus::Revoked => PrincipalStatus::Revoked,
            _ if self.is_expired(now) => PrincipalStatus::Expired,
            status => status,
        }
    }

    /// Whether requests from this principal may be admitted at `now`
    pub fn is_admissible(&self, now: i64) -> bool {
        self.effective_status(now) == PrincipalStatus::Active
    }

    /// Copy of the record with the private key stripped
    pub fn sanitized(&self) -> Principal {
        Principal {
            private_key: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(status: PrincipalStatus, expires_at: i64) -> Principal {
        Principal {
            id: "a1".into(),
            public_key: "ab".repeat(32),
            private_key: Some("cd".repeat(64)),
            nonce: "ef".repeat(16),
            created_at: 1_000,
            expires_at,
            status,
        }
    }

    #[test]
    fn test_active_within_ttl() {
        let p = principal(PrincipalStatus::Active, 2_000);
        assert_eq!(p.effective_status(1_500), PrincipalStatus::Active);
        assert!(p.is_admissible(1_500));
    }

    #[test]
    fn test_expiry_is_derived() {
        let p = principal(PrincipalStatus::Active, 2_000);
        assert!(!p.is_expired(2_000));
        assert!(p.is_expired(2_001));
        assert_eq!(p.effective_status(2_001), PrincipalStatus::Expired);
        assert!(!p.is_admissible(2_001));
    }

    #[test]
    fn test_revocation_wins_over_expiry() {
        let p = principal(PrincipalStatus::Revoked, 2_000);
        assert_eq!(p.effective_status(9_999), PrincipalStatus::Revoked);
        assert_eq!(p.effective_status(1_000), PrincipalStatus::Revoked);
    }

    #[test]
    fn test_sanitized_strips_private_key() {
        let p = principal(PrincipalStatus::Active, 2_000);
        let clean = p.sanitized();
        assert!(clean.private_key.is_none());
        assert_eq!(clean.id, p.id);
        assert_eq!(clean.public_key, p.public_key);
    }

    #[test]
    fn test_serialization_omits_absent_private_key() {
        let p = principal(PrincipalStatus::Active, 2_000).sanitized();
        let json = serde_json::to_value(&p).unwrap();
        assert!(json.get("private_key").is_none());
        assert_eq!(json["status"], "active");
    }
}
