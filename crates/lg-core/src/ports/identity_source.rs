//! Identity notification source port
//!
//! The identity provider exposes a long-lived subscription that reports the
//! current identity (present or absent) every time the authentication state
//! changes, or reports an error instead.
//!
//! Contract for implementations:
//! - events are delivered to the listener in the order the provider emits them;
//! - after [`IdentitySubscription::unsubscribe`] returns, the listener is never
//!   called again;
//! - dropping a subscription unsubscribes it.

use std::sync::Arc;

use thiserror::Error;

use crate::identity::Identity;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentitySourceError {
    #[error("identity provider error: {0}")]
    Provider(String),

    #[error("identity source closed")]
    Closed,

    #[error("no async runtime available to drive the subscription")]
    RuntimeUnavailable,
}

/// Receiver side of an identity subscription.
///
/// Callbacks must not block; they may be invoked from any thread.
pub trait IdentityListener: Send + Sync {
    fn on_identity(&self, identity: Option<Identity>);
    fn on_error(&self, error: IdentitySourceError);
}

/// Owned handle of an active subscription.
pub trait IdentitySubscription: Send {
    /// Detach the listener. Idempotent.
    fn unsubscribe(&mut self);
}

pub trait IdentitySourcePort: Send + Sync {
    fn subscribe(
        &self,
        listener: Arc<dyn IdentityListener>,
    ) -> Result<Box<dyn IdentitySubscription>, IdentitySourceError>;
}
