use std::sync::Arc;

use anyhow::Context;
use lg_core::identity::{CachedIdentitySnapshot, Identity};
use lg_core::ports::{keys, ClockPort, KeyValueStorePort};

/// Typed access to the cached identity snapshot record.
///
/// The snapshot is advisory: it is written and cleared as the confirmed
/// identity changes, but nothing reads it to decide navigation.
#[derive(Clone)]
pub struct IdentityCache {
    store: Arc<dyn KeyValueStorePort>,
    clock: Arc<dyn ClockPort>,
}

impl IdentityCache {
    pub fn new(store: Arc<dyn KeyValueStorePort>, clock: Arc<dyn ClockPort>) -> Self {
        Self { store, clock }
    }

    /// Read the snapshot. A corrupt record is an error, not `None`.
    pub async fn load(&self) -> anyhow::Result<Option<CachedIdentitySnapshot>> {
        let Some(raw) = self
            .store
            .get(keys::CACHED_IDENTITY)
            .await
            .context("Failed to read cached identity")?
        else {
            return Ok(None);
        };

        let snapshot = serde_json::from_str(&raw).context("Failed to parse cached identity")?;
        Ok(Some(snapshot))
    }

    pub async fn save(&self, identity: &Identity) -> anyhow::Result<CachedIdentitySnapshot> {
        let snapshot = CachedIdentitySnapshot::capture(identity, self.clock.now_ms());
        let json =
            serde_json::to_string(&snapshot).context("Failed to serialize cached identity")?;
        self.store
            .set(keys::CACHED_IDENTITY, &json)
            .await
            .context("Failed to write cached identity")?;
        Ok(snapshot)
    }

    pub async fn clear(&self) -> anyhow::Result<()> {
        self.store
            .delete(keys::CACHED_IDENTITY)
            .await
            .context("Failed to delete cached identity")
    }
}
