//! Dependency wiring: concrete adapters in, a ready [`GateRuntime`] out.

use std::sync::Arc;

use lg_app::{GateDeps, GateRuntime};
use lg_core::ports::{ClockPort, IdentitySourcePort, KeyValueStorePort};
use lg_infra::{ChannelIdentitySource, FileKeyValueStore, IdentityFeed, SystemClock};
use tracing::info;

use super::config::GateSettings;

/// Wired runtime plus the producer side of its identity source.
pub struct Wiring {
    pub runtime: GateRuntime,
    pub feed: IdentityFeed,
}

pub fn wire_dependencies(settings: &GateSettings) -> Wiring {
    let store = FileKeyValueStore::with_defaults(&settings.data_dir);
    info!(store_dir = %store.base_dir().display(), "using file key-value store");

    let (source, feed) = ChannelIdentitySource::new();
    let identity_source: Arc<dyn IdentitySourcePort> = Arc::new(source);
    let store: Arc<dyn KeyValueStorePort> = Arc::new(store);
    let clock: Arc<dyn ClockPort> = Arc::new(SystemClock);

    let runtime = GateRuntime::new(
        GateDeps {
            identity_source,
            store,
            clock,
        },
        settings.bootstrap_deadline,
    );
    Wiring { runtime, feed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lg_core::{Identity, NavigationTarget};
    use std::time::Duration;
    use tempfile::TempDir;

    fn settings(dir: &TempDir) -> GateSettings {
        GateSettings {
            bootstrap_deadline: Duration::from_secs(5),
            data_dir: dir.path().to_path_buf(),
            log_dir: None,
        }
    }

    #[tokio::test]
    async fn test_wired_runtime_persists_onboarding_under_data_dir() {
        let dir = TempDir::new().unwrap();
        let Wiring { runtime, feed } = wire_dependencies(&settings(&dir));
        let mut watcher = runtime.navigation();
        runtime.start().await.unwrap();

        feed.push_identity(Identity::new("u1", None)).unwrap();
        assert_eq!(watcher.changed().await, Some(NavigationTarget::Onboarding));

        runtime.mark_onboarding_complete();
        runtime.shutdown().await;

        assert!(dir.path().join("kv").is_dir());
    }

    #[tokio::test]
    async fn test_onboarding_survives_restart() {
        let dir = TempDir::new().unwrap();
        {
            let wiring = wire_dependencies(&settings(&dir));
            wiring.runtime.mark_onboarding_complete();
            wiring.runtime.shutdown().await;
        }

        let wiring = wire_dependencies(&settings(&dir));
        wiring.runtime.start().await.unwrap();

        assert!(wiring.runtime.snapshot().onboarding_completed);
    }
}
