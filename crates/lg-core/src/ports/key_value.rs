//! Persistent key-value store port
//!
//! Durable local storage for small independent records. Every operation is
//! asynchronous and may fail; callers in this workspace treat failures as
//! advisory and never let them block navigation.

use async_trait::async_trait;
use thiserror::Error;

/// Fixed logical keys used by the gate. Each key has exactly one writer.
pub mod keys {
    /// JSON-encoded [`crate::identity::CachedIdentitySnapshot`].
    pub const CACHED_IDENTITY: &str = "session.cached_identity";
    /// JSON boolean.
    pub const ONBOARDING_COMPLETED: &str = "onboarding.completed";
}

#[derive(Debug, Error)]
pub enum KeyValueStoreError {
    #[error("storage io failed for key `{key}`: {message}")]
    Io { key: String, message: String },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl KeyValueStoreError {
    pub fn io(key: &str, err: impl std::fmt::Display) -> Self {
        Self::Io {
            key: key.to_string(),
            message: err.to_string(),
        }
    }
}

#[async_trait]
pub trait KeyValueStorePort: Send + Sync {
    /// Read the raw value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>, KeyValueStoreError>;

    /// Store `value` under `key`, overwriting any previous value.
    async fn set(&self, key: &str, value: &str) -> Result<(), KeyValueStoreError>;

    /// Remove `key`. Removing a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<(), KeyValueStoreError>;
}
