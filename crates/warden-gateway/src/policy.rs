//! Role-based policy engine
//!
//! Roles map to permission sets (`resource:action` strings); principals
//! bind to roles many-to-many. Decisions are positive-only: a permission
//! is granted iff some bound role enumerates it exactly.
//!
//! The three built-in roles are seeded at construction and cannot be
//! removed.

use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use thiserror::Error;

/// Errors returned by policy operations
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Role '{0}' does not exist")]
    UnknownRole(String),

    #[error("Principal '{id}' already has role '{role}'")]
    Duplicate { id: String, role: String },

    #[error("Principal '{id}' does not have role '{role}'")]
    NotBound { id: String, role: String },
}

/// A named permission set
#[derive(Debug, Clone)]
pub struct Role {
    pub name: String,
    pub permissions: Vec<String>,
}

struct PolicyTables {
    roles: HashMap<String, Role>,
    bindings: HashMap<String, Vec<String>>,
}

/// Role and binding store with a positive-only decision function
pub struct PolicyEngine {
    inner: RwLock<PolicyTables>,
}

impl PolicyEngine {
    /// Create an engine seeded with the built-in roles
    pub fn new() -> Self {
        let mut roles = HashMap::new();

        roles.insert(
            "admin".to_string(),
            Role {
                name: "admin".into(),
                permissions: vec![
                    "agent:read".into(),
                    "agent:write".into(),
                    "agent:delete".into(),
                    "agent:verify".into(),
                    "audit:read".into(),
                ],
            },
        );
        roles.insert(
            "user".to_string(),
            Role {
                name: "user".into(),
                permissions: vec!["agent:read".into(), "agent:verify".into()],
            },
        );
        roles.insert(
            "service".to_string(),
            Role {
                name: "service".into(),
                permissions: vec!["agent:read".into()],
            },
        );

        Self {
            inner: RwLock::new(PolicyTables {
                roles,
                bindings: HashMap::new(),
            }),
        }
    }

    /// Bind a role to a principal; duplicate assignment is rejected
    pub fn assign(&self, id: &str, role: &str) -> Result<(), PolicyError> {
        let mut tables = self.inner.write().unwrap();

        if !tables.roles.contains_key(role) {
            return Err(PolicyError::UnknownRole(role.to_string()));
        }

        let bound = tables.bindings.entry(id.to_string()).or_default();
        if bound.iter().any(|r| r == role) {
            return Err(PolicyError::Duplicate {
                id: id.to_string(),
                role: role.to_string(),
            });
        }

        bound.push(role.to_string());
        Ok(())
    }

    /// Remove a role binding
    pub fn remove(&self, id: &str, role: &str) -> Result<(), PolicyError> {
        let mut tables = self.inner.write().unwrap();

        let bound = tables
            .bindings
            .get_mut(id)
            .ok_or_else(|| PolicyError::NotBound {
                id: id.to_string(),
                role: role.to_string(),
            })?;

        let before = bound.len();
        bound.retain(|r| r != role);
        if bound.len() == before {
            return Err(PolicyError::NotBound {
                id: id.to_string(),
                role: role.to_string(),
            });
        }
        Ok(())
    }

    /// Roles bound to a principal, in assignment order
    pub fn roles_of(&self, id: &str) -> Vec<String> {
        let tables = self.inner.read().unwrap();
        tables.bindings.get(id).cloned().unwrap_or_default()
    }

    /// Whether any role bound to `id` enumerates `permission`
    pub fn can(&self, id: &str, permission: &str) -> bool {
        let tables = self.inner.read().unwrap();

        let Some(bound) = tables.bindings.get(id) else {
            return false;
        };

        bound.iter().any(|role_name| {
            tables
                .roles
                .get(role_name)
                .is_some_and(|role| role.permissions.iter().any(|p| p == permission))
        })
    }

    /// All roles with their permission sets, name-ordered
    pub fn list_roles(&self) -> BTreeMap<String, Vec<String>> {
        let tables = self.inner.read().unwrap();
        tables
            .roles
            .values()
            .map(|role| (role.name.clone(), role.permissions.clone()))
            .collect()
    }
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new()
    }
}
