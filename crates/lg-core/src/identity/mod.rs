//! Identity domain models
//!
//! [`Identity`] is the authenticated-user record reported by the identity
//! provider. "No identity" is expressed as `Option::<Identity>::None` everywhere;
//! identities are never constructed from local data except in tests.
//!
//! [`CachedIdentitySnapshot`] is the persisted mirror of the last confirmed
//! identity. It is a hint for predicting the bootstrap outcome and is always
//! superseded by what the provider confirms.

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Authenticated user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: UserId,
    pub email: Option<String>,
}

impl Identity {
    pub fn new(id: impl Into<UserId>, email: Option<String>) -> Self {
        Self {
            id: id.into(),
            email,
        }
    }
}

/// Persisted snapshot of the last confirmed identity.
///
/// No TTL is enforced; `captured_at_ms` is informational.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedIdentitySnapshot {
    pub id: UserId,
    pub email: Option<String>,
    /// Epoch milliseconds at capture time.
    pub captured_at_ms: i64,
}

impl CachedIdentitySnapshot {
    pub fn capture(identity: &Identity, now_ms: i64) -> Self {
        Self {
            id: identity.id.clone(),
            email: identity.email.clone(),
            captured_at_ms: now_ms,
        }
    }

    /// Whether this snapshot describes the given identity.
    pub fn matches(&self, identity: &Identity) -> bool {
        self.id == identity.id && self.email == identity.email
    }
}
