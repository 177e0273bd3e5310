//! Port interfaces for the application layer
//!
//! Ports define the contract between the gate logic (session store,
//! onboarding gate) and the collaborators it does not own: durable local
//! storage, the identity provider's notification stream, and wall-clock time.
//! Implementations live in `lg-infra` or are supplied by the embedding app.

mod clock;
pub mod identity_source;
pub mod key_value;

pub use clock::*;
pub use identity_source::{
    IdentityListener, IdentitySourceError, IdentitySourcePort, IdentitySubscription,
};
pub use key_value::{keys, KeyValueStoreError, KeyValueStorePort};
