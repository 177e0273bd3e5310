//! Session state store and its identity cache.

mod cache;
mod store;

pub use cache::IdentityCache;
pub use store::{SessionStore, SessionStoreError};
