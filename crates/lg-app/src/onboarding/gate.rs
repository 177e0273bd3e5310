use std::sync::Arc;

use anyhow::Context;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use lg_core::onboarding::OnboardingState;
use lg_core::ports::{keys, KeyValueStorePort};

/// Single writer and single reader of the onboarding flag.
///
/// The in-memory value is authoritative once set; persistence is best-effort.
pub struct OnboardingGate {
    store: Arc<dyn KeyValueStorePort>,
    state_tx: watch::Sender<OnboardingState>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl OnboardingGate {
    pub fn new(store: Arc<dyn KeyValueStorePort>) -> Self {
        let (state_tx, _) = watch::channel(OnboardingState::default());
        Self {
            store,
            state_tx,
            pending: Mutex::new(None),
        }
    }

    /// Read the persisted flag.
    ///
    /// Never fails: an unreadable or corrupt record counts as not completed.
    /// The loaded value is merged with the in-memory one, so a completion
    /// recorded before the load finished is kept.
    pub async fn load(&self) -> OnboardingState {
        let span = info_span!("onboarding.load", key = keys::ONBOARDING_COMPLETED);
        async {
            let loaded = match read_flag(self.store.as_ref()).await {
                Ok(completed) => OnboardingState {
                    has_completed: completed,
                },
                Err(e) => {
                    warn!(
                        error = %format!("{e:#}"),
                        "onboarding flag unreadable; assuming not completed"
                    );
                    OnboardingState::default()
                }
            };

            self.state_tx.send_if_modified(|state| {
                let merged = state.merge(loaded);
                let changed = merged != *state;
                *state = merged;
                changed
            });

            let state = *self.state_tx.borrow();
            info!(completed = state.has_completed, "onboarding flag loaded");
            state
        }
        .instrument(span)
        .await
    }

    /// Record completion in memory now and persist it in the background.
    ///
    /// Calling this again after completion is a no-op.
    pub fn mark_complete(&self) {
        let changed = self.state_tx.send_if_modified(|state| {
            if state.has_completed {
                return false;
            }
            *state = OnboardingState::completed();
            true
        });
        if !changed {
            debug!("onboarding already completed");
            return;
        }
        info!("onboarding completed");

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime; onboarding flag kept in memory only");
            return;
        };
        let store = Arc::clone(&self.store);
        let task = runtime.spawn(
            async move {
                match write_completed(store.as_ref()).await {
                    Ok(()) => debug!("onboarding flag persisted"),
                    Err(e) => warn!(
                        error = %format!("{e:#}"),
                        "onboarding flag not persisted; in-memory value stands"
                    ),
                }
            }
            .instrument(info_span!("onboarding.persist")),
        );
        *self.pending.lock() = Some(task);
    }

    /// Wait for an in-flight persist, if any.
    pub async fn flush(&self) {
        let task = self.pending.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "onboarding persist task did not finish");
            }
        }
    }

    pub fn state(&self) -> OnboardingState {
        *self.state_tx.borrow()
    }

    pub fn is_completed(&self) -> bool {
        self.state_tx.borrow().has_completed
    }

    pub fn subscribe(&self) -> watch::Receiver<OnboardingState> {
        self.state_tx.subscribe()
    }
}

async fn read_flag(store: &dyn KeyValueStorePort) -> anyhow::Result<bool> {
    let Some(raw) = store
        .get(keys::ONBOARDING_COMPLETED)
        .await
        .context("Failed to read onboarding flag")?
    else {
        return Ok(false);
    };
    serde_json::from_str(raw.trim()).context("Failed to parse onboarding flag")
}

async fn write_completed(store: &dyn KeyValueStorePort) -> anyhow::Result<()> {
    let json = serde_json::to_string(&true).context("Failed to serialize onboarding flag")?;
    store
        .set(keys::ONBOARDING_COMPLETED, &json)
        .await
        .context("Failed to write onboarding flag")
}
