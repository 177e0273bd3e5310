//! Gate runtime
//!
//! Composes the session store, the onboarding gate and navigation watchers
//! over a single set of injected ports.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, info_span, Instrument};

use lg_core::identity::Identity;
use lg_core::navigation::{decide, NavigationTarget};
use lg_core::ports::{ClockPort, IdentitySourcePort, KeyValueStorePort};
use lg_core::session::SessionResolution;

use crate::navigation::NavigationWatcher;
use crate::onboarding::OnboardingGate;
use crate::session::{IdentityCache, SessionStore};

/// Runtime dependency grouping.
///
/// Plain parameter bundle: no defaults, no build steps.
pub struct GateDeps {
    pub identity_source: Arc<dyn IdentitySourcePort>,
    pub store: Arc<dyn KeyValueStorePort>,
    pub clock: Arc<dyn ClockPort>,
}

/// Point-in-time view of everything the gate knows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSnapshot {
    pub resolution: SessionResolution,
    pub identity: Option<Identity>,
    pub onboarding_completed: bool,
    pub target: NavigationTarget,
}

pub struct GateRuntime {
    session: SessionStore,
    onboarding: OnboardingGate,
}

impl GateRuntime {
    pub fn new(deps: GateDeps, bootstrap_deadline: Duration) -> Self {
        let GateDeps {
            identity_source,
            store,
            clock,
        } = deps;
        let cache = IdentityCache::new(Arc::clone(&store), clock);
        Self {
            session: SessionStore::new(identity_source, cache, bootstrap_deadline),
            onboarding: OnboardingGate::new(store),
        }
    }

    /// Load the onboarding flag, then start the session store.
    ///
    /// Returns once the store is started; resolution happens later.
    pub async fn start(&self) -> anyhow::Result<()> {
        let span = info_span!(
            "gate.start",
            deadline_ms = self.session.deadline().as_millis() as u64
        );
        async {
            self.onboarding.load().await;
            self.session
                .start()
                .context("Failed to start session store")?;
            info!("gate started");
            Ok(())
        }
        .instrument(span)
        .await
    }

    /// New watcher positioned at the current target.
    pub fn navigation(&self) -> NavigationWatcher {
        NavigationWatcher::new(self.session.subscribe(), self.onboarding.subscribe())
    }

    pub fn current_target(&self) -> NavigationTarget {
        decide(&self.session.state(), self.onboarding.state())
    }

    pub fn mark_onboarding_complete(&self) {
        self.onboarding.mark_complete();
    }

    pub fn snapshot(&self) -> GateSnapshot {
        let session = self.session.state();
        let onboarding = self.onboarding.state();
        GateSnapshot {
            target: decide(&session, onboarding),
            resolution: session.resolution,
            identity: session.identity,
            onboarding_completed: onboarding.has_completed,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn onboarding(&self) -> &OnboardingGate {
        &self.onboarding
    }

    /// Stop the session store and wait for a pending onboarding write.
    pub async fn shutdown(&self) {
        self.session.stop();
        self.onboarding.flush().await;
        info!("gate shut down");
    }
}
