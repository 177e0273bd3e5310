//! Session domain models.
//!
//! A session starts out [`SessionResolution::Resolving`] and moves to
//! [`SessionResolution::Resolved`] exactly once, on whichever of the first
//! notification, the first notification error, or the bootstrap deadline
//! happens first. Later notifications only replace the identity.

use serde::{Deserialize, Serialize};

use crate::identity::Identity;

/// Whether the bootstrap race has concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionResolution {
    /// No notification yet and the deadline has not elapsed.
    Resolving,
    /// The identity value is the best-known answer.
    Resolved,
}

/// What concluded the bootstrap race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionTrigger {
    Notification,
    NotificationError,
    Deadline,
}

impl ResolutionTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Notification => "notification",
            Self::NotificationError => "notification_error",
            Self::Deadline => "deadline",
        }
    }
}

/// Observable session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub resolution: SessionResolution,
    pub identity: Option<Identity>,
}

impl SessionState {
    /// State of a freshly created store.
    pub fn resolving() -> Self {
        Self {
            resolution: SessionResolution::Resolving,
            identity: None,
        }
    }

    pub fn resolved(identity: Option<Identity>) -> Self {
        Self {
            resolution: SessionResolution::Resolved,
            identity,
        }
    }

    pub fn is_resolving(&self) -> bool {
        self.resolution == SessionResolution::Resolving
    }

    /// True only once resolved with an identity present.
    pub fn is_authenticated(&self) -> bool {
        !self.is_resolving() && self.identity.is_some()
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::resolving()
    }
}
