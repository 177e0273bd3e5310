//! Session state store.
//!
//! Reconciles the identity provider's notification stream with the bootstrap
//! deadline into one observable [`SessionState`].
//!
//! Three independently scheduled triggers may conclude the bootstrap race:
//! the first notification, the first notification error, and the deadline
//! timer. Each of them goes through a single compare-and-set on `resolved`, so
//! `Resolving → Resolved` happens at most once whatever the arrival order.
//!
//! Every state mutation runs inside the watch channel's write lock and first
//! checks `stopped`. [`SessionStore::stop`] sets `stopped` under that same
//! lock, so once it returns no callback can mutate the state again.
//!
//! Lock order: state (watch) → resources.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::AbortHandle;
use tracing::{debug, info, info_span, warn, Instrument};

use lg_core::identity::Identity;
use lg_core::ports::{
    IdentityListener, IdentitySourceError, IdentitySourcePort, IdentitySubscription,
};
use lg_core::session::{ResolutionTrigger, SessionResolution, SessionState};

use super::cache::IdentityCache;

#[derive(Debug, thiserror::Error)]
pub enum SessionStoreError {
    #[error("session store requires a tokio runtime")]
    RuntimeUnavailable,
    #[error("session store has been stopped")]
    Stopped,
}

enum CacheCommand {
    Save(Identity),
    Clear,
}

/// Handles released by `stop`.
#[derive(Default)]
struct SessionResources {
    subscription: Option<Box<dyn IdentitySubscription>>,
    deadline: Option<AbortHandle>,
    cache_probe: Option<AbortHandle>,
    cache_tx: Option<mpsc::UnboundedSender<CacheCommand>>,
}

struct SessionCore {
    state_tx: watch::Sender<SessionState>,
    resolved: AtomicBool,
    stopped: AtomicBool,
    /// Set when a notification error resolves the session; later
    /// notifications are ignored. Errors after resolution leave it unset.
    source_failed: AtomicBool,
    resolutions: AtomicUsize,
    deadline: Duration,
    cache: IdentityCache,
    resources: Mutex<SessionResources>,
}

/// Owner of the identity subscription and the bootstrap deadline.
///
/// Dropping the store stops it.
pub struct SessionStore {
    core: Arc<SessionCore>,
    identity_source: Arc<dyn IdentitySourcePort>,
    started: AtomicBool,
}

impl SessionStore {
    pub fn new(
        identity_source: Arc<dyn IdentitySourcePort>,
        cache: IdentityCache,
        deadline: Duration,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::resolving());
        Self {
            core: Arc::new(SessionCore {
                state_tx,
                resolved: AtomicBool::new(false),
                stopped: AtomicBool::new(false),
                source_failed: AtomicBool::new(false),
                resolutions: AtomicUsize::new(0),
                deadline,
                cache,
                resources: Mutex::new(SessionResources::default()),
            }),
            identity_source,
            started: AtomicBool::new(false),
        }
    }

    /// Arm the deadline, probe the cache and subscribe to the identity source.
    ///
    /// Returns without waiting for any of them. Only the first call has an
    /// effect.
    pub fn start(&self) -> Result<(), SessionStoreError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| SessionStoreError::RuntimeUnavailable)?;
        if self.core.stopped.load(Ordering::Acquire) {
            return Err(SessionStoreError::Stopped);
        }
        if self.started.swap(true, Ordering::AcqRel) {
            debug!("session store already started");
            return Ok(());
        }

        let span = info_span!(
            "session.start",
            deadline_ms = self.core.deadline.as_millis() as u64
        );
        let _entered = span.enter();

        let (cache_tx, cache_rx) = mpsc::unbounded_channel();
        runtime.spawn(
            run_cache_writer(self.core.cache.clone(), cache_rx).instrument(span.clone()),
        );

        let weak_core = Arc::downgrade(&self.core);
        let deadline = self.core.deadline;
        let timer = runtime.spawn(async move {
            tokio::time::sleep(deadline).await;
            if let Some(core) = weak_core.upgrade() {
                core.on_deadline();
            }
        });

        let probe = runtime.spawn(
            probe_cached_identity(self.core.cache.clone()).instrument(span.clone()),
        );

        let adopted = self.core.adopt_tasks(SessionResources {
            subscription: None,
            deadline: Some(timer.abort_handle()),
            cache_probe: Some(probe.abort_handle()),
            cache_tx: Some(cache_tx),
        });
        if !adopted {
            return Err(SessionStoreError::Stopped);
        }

        let listener: Arc<dyn IdentityListener> = self.core.clone();
        match self.identity_source.subscribe(listener) {
            Ok(mut subscription) => {
                let mut resources = self.core.resources.lock();
                if self.core.stopped.load(Ordering::Acquire) {
                    drop(resources);
                    subscription.unsubscribe();
                } else {
                    resources.subscription = Some(subscription);
                    debug!("identity subscription active");
                }
            }
            Err(err) => {
                warn!(error = %err, "identity subscription failed");
                self.core.on_error(err);
            }
        }

        Ok(())
    }

    /// Unsubscribe and disarm the deadline. Safe to call at any time, any
    /// number of times.
    pub fn stop(&self) {
        self.core.shutdown();
    }

    /// Apply an identity notification as if the source had delivered it.
    pub fn on_notification(&self, identity: Option<Identity>) {
        self.core.on_identity(identity);
    }

    /// Apply a notification error as if the source had delivered it.
    pub fn on_notification_error(&self, error: IdentitySourceError) {
        self.core.on_error(error);
    }

    pub fn state(&self) -> SessionState {
        self.core.state_tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.core.state_tx.subscribe()
    }

    pub fn is_authenticated(&self) -> bool {
        self.core.state_tx.borrow().is_authenticated()
    }

    pub fn is_stopped(&self) -> bool {
        self.core.stopped.load(Ordering::Acquire)
    }

    /// Number of `Resolving → Resolved` transitions performed (0 or 1).
    pub fn resolution_count(&self) -> usize {
        self.core.resolutions.load(Ordering::Acquire)
    }

    pub fn deadline(&self) -> Duration {
        self.core.deadline
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}

impl SessionCore {
    fn try_resolve(&self) -> bool {
        let won = self
            .resolved
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if won {
            self.resolutions.fetch_add(1, Ordering::AcqRel);
        }
        won
    }

    fn enqueue_cache(&self, command: CacheCommand) {
        match self.resources.lock().cache_tx.as_ref() {
            Some(tx) => {
                // The writer only exits once this sender is dropped.
                tx.send(command).ok();
            }
            None => debug!("session store not started; cache mirror skipped"),
        }
    }

    fn disarm_deadline(&self) {
        if let Some(deadline) = self.resources.lock().deadline.take() {
            deadline.abort();
            debug!("bootstrap deadline disarmed");
        }
    }

    fn on_deadline(&self) {
        let mut resolved_now = false;
        self.state_tx.send_if_modified(|state| {
            if self.stopped.load(Ordering::Acquire) {
                return false;
            }
            resolved_now = self.try_resolve();
            if resolved_now {
                state.resolution = SessionResolution::Resolved;
            }
            resolved_now
        });

        if resolved_now {
            self.resources.lock().deadline = None;
            info!(
                trigger = ResolutionTrigger::Deadline.as_str(),
                deadline_ms = self.deadline.as_millis() as u64,
                "bootstrap deadline elapsed before the identity source answered"
            );
        }
    }

    /// Hand freshly spawned task handles to the store.
    ///
    /// If `stop()` got in first they are released right away and `false` is
    /// returned.
    fn adopt_tasks(&self, tasks: SessionResources) -> bool {
        let mut resources = self.resources.lock();
        if self.stopped.load(Ordering::Acquire) {
            drop(resources);
            release(tasks);
            return false;
        }
        resources.cache_tx = tasks.cache_tx;
        resources.deadline = tasks.deadline;
        resources.cache_probe = tasks.cache_probe;
        true
    }

    fn shutdown(&self) {
        let mut first = false;
        self.state_tx.send_if_modified(|_| {
            first = !self.stopped.swap(true, Ordering::AcqRel);
            false
        });

        let released = std::mem::take(&mut *self.resources.lock());
        release(released);

        if first {
            info!("session store stopped");
        }
    }
}

impl IdentityListener for SessionCore {
    fn on_identity(&self, identity: Option<Identity>) {
        let mut accepted = false;
        let mut resolved_now = false;
        self.state_tx.send_if_modified(|state| {
            if self.stopped.load(Ordering::Acquire) || self.source_failed.load(Ordering::Acquire)
            {
                return false;
            }
            accepted = true;
            resolved_now = self.try_resolve();

            let identity_changed = state.identity != identity;
            if resolved_now {
                state.resolution = SessionResolution::Resolved;
            }
            if identity_changed {
                state.identity = identity.clone();
            }
            if resolved_now || identity_changed {
                self.enqueue_cache(match &identity {
                    Some(identity) => CacheCommand::Save(identity.clone()),
                    None => CacheCommand::Clear,
                });
            }
            resolved_now || identity_changed
        });

        if !accepted {
            debug!("identity notification ignored");
            return;
        }
        if resolved_now {
            self.disarm_deadline();
            info!(
                trigger = ResolutionTrigger::Notification.as_str(),
                authenticated = identity.is_some(),
                "session resolved"
            );
        } else {
            debug!(authenticated = identity.is_some(), "identity updated");
        }
    }

    fn on_error(&self, error: IdentitySourceError) {
        let mut accepted = false;
        let mut resolved_now = false;
        self.state_tx.send_if_modified(|state| {
            if self.stopped.load(Ordering::Acquire) || self.source_failed.load(Ordering::Acquire)
            {
                return false;
            }
            accepted = true;
            resolved_now = self.try_resolve();
            if !resolved_now {
                return false;
            }
            // Only an error that resolves the session ends the stream.
            self.source_failed.store(true, Ordering::Release);
            state.resolution = SessionResolution::Resolved;
            state.identity = None;
            self.enqueue_cache(CacheCommand::Clear);
            true
        });

        if !accepted {
            debug!(error = %error, "identity source error ignored");
            return;
        }
        if resolved_now {
            self.disarm_deadline();
            warn!(
                trigger = ResolutionTrigger::NotificationError.as_str(),
                error = %error,
                "identity source failed; session resolved without identity"
            );
        } else {
            warn!(
                error = %error,
                "identity source failed after resolution; keeping current identity"
            );
        }
    }
}

fn release(resources: SessionResources) {
    if let Some(mut subscription) = resources.subscription {
        subscription.unsubscribe();
    }
    if let Some(deadline) = resources.deadline {
        deadline.abort();
    }
    if let Some(probe) = resources.cache_probe {
        probe.abort();
    }
    // Queued cache commands still drain.
    drop(resources.cache_tx);
}

async fn run_cache_writer(cache: IdentityCache, mut rx: mpsc::UnboundedReceiver<CacheCommand>) {
    while let Some(command) = rx.recv().await {
        match command {
            CacheCommand::Save(identity) => match cache.save(&identity).await {
                Ok(snapshot) => debug!(user_id = %snapshot.id, "cached identity written"),
                Err(e) => warn!(error = %format!("{e:#}"), "cached identity write failed"),
            },
            CacheCommand::Clear => match cache.clear().await {
                Ok(()) => debug!("cached identity cleared"),
                Err(e) => warn!(error = %format!("{e:#}"), "cached identity delete failed"),
            },
        }
    }
    debug!("cache writer finished");
}

/// Read the cached snapshot for telemetry only; it never resolves the session.
async fn probe_cached_identity(cache: IdentityCache) {
    match cache.load().await {
        Ok(Some(snapshot)) => info!(
            user_id = %snapshot.id,
            captured_at_ms = snapshot.captured_at_ms,
            "cached identity present"
        ),
        Ok(None) => debug!("no cached identity"),
        Err(e) => warn!(error = %format!("{e:#}"), "cached identity unreadable"),
    }
}
