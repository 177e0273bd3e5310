//! In-process identity notification source.
//!
//! [`ChannelIdentitySource`] stands in for a remote identity provider: the
//! embedding application (or a test) pushes identity changes through an
//! [`IdentityFeed`], and every live subscription receives them in order.
//!
//! Each subscription owns a pump task draining its own unbounded channel. The
//! listener sits in a slot guarded by a mutex that the pump holds while
//! delivering; unsubscribing empties the slot under the same mutex, so once
//! `unsubscribe` returns no callback is running and none will run again.
//!
//! Like most provider SDKs, a new subscriber immediately receives the most
//! recent event, if one has been pushed.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::{debug, trace};

use lg_core::identity::Identity;
use lg_core::ports::{
    IdentityListener, IdentitySourceError, IdentitySourcePort, IdentitySubscription,
};

/// Event carried from the feed to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    Identity(Option<Identity>),
    Error(IdentitySourceError),
}

type ListenerSlot = Arc<Mutex<Option<Arc<dyn IdentityListener>>>>;

struct SourceState {
    subscribers: Vec<(u64, mpsc::UnboundedSender<IdentityEvent>)>,
    last_event: Option<IdentityEvent>,
    closed: bool,
}

struct SourceShared {
    state: Mutex<SourceState>,
    next_id: AtomicU64,
}

/// Identity source driven by an in-process [`IdentityFeed`].
#[derive(Clone)]
pub struct ChannelIdentitySource {
    shared: Arc<SourceShared>,
}

/// Producer side of a [`ChannelIdentitySource`].
#[derive(Clone)]
pub struct IdentityFeed {
    shared: Arc<SourceShared>,
}

impl ChannelIdentitySource {
    pub fn new() -> (Self, IdentityFeed) {
        let shared = Arc::new(SourceShared {
            state: Mutex::new(SourceState {
                subscribers: Vec::new(),
                last_event: None,
                closed: false,
            }),
            next_id: AtomicU64::new(1),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            IdentityFeed { shared },
        )
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.state.lock().subscribers.len()
    }
}

impl IdentityFeed {
    pub fn push_identity(&self, identity: Identity) -> Result<(), IdentitySourceError> {
        self.push(IdentityEvent::Identity(Some(identity)))
    }

    pub fn push_absent(&self) -> Result<(), IdentitySourceError> {
        self.push(IdentityEvent::Identity(None))
    }

    pub fn push_error(&self, message: impl Into<String>) -> Result<(), IdentitySourceError> {
        self.push(IdentityEvent::Error(IdentitySourceError::Provider(
            message.into(),
        )))
    }

    pub fn push(&self, event: IdentityEvent) -> Result<(), IdentitySourceError> {
        let mut state = self.shared.state.lock();
        if state.closed {
            return Err(IdentitySourceError::Closed);
        }
        state
            .subscribers
            .retain(|(_, tx)| tx.send(event.clone()).is_ok());
        trace!(subscribers = state.subscribers.len(), ?event, "identity event pushed");
        state.last_event = Some(event);
        Ok(())
    }

    /// Close the source. Pending events are still delivered; new pushes and
    /// subscriptions fail with [`IdentitySourceError::Closed`].
    pub fn close(&self) {
        let mut state = self.shared.state.lock();
        state.closed = true;
        state.subscribers.clear();
    }
}

impl IdentitySourcePort for ChannelIdentitySource {
    fn subscribe(
        &self,
        listener: Arc<dyn IdentityListener>,
    ) -> Result<Box<dyn IdentitySubscription>, IdentitySourceError> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| IdentitySourceError::RuntimeUnavailable)?;

        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, mut rx) = mpsc::unbounded_channel();
        {
            let mut state = self.shared.state.lock();
            if state.closed {
                return Err(IdentitySourceError::Closed);
            }
            if let Some(last) = state.last_event.clone() {
                // rx is alive, so this cannot fail.
                tx.send(last).ok();
            }
            state.subscribers.push((id, tx));
        }

        let slot: ListenerSlot = Arc::new(Mutex::new(Some(listener)));
        let pump_slot = Arc::clone(&slot);
        let pump = runtime.spawn(async move {
            while let Some(event) = rx.recv().await {
                if !deliver(&pump_slot, event) {
                    break;
                }
            }
            debug!(subscription_id = id, "identity pump finished");
        });

        debug!(subscription_id = id, "identity subscription opened");
        Ok(Box::new(ChannelSubscription {
            id,
            shared: Arc::downgrade(&self.shared),
            slot,
            pump: Some(pump.abort_handle()),
        }))
    }
}

/// Returns `false` once the listener has been detached.
fn deliver(slot: &ListenerSlot, event: IdentityEvent) -> bool {
    let guard = slot.lock();
    let Some(listener) = guard.as_ref() else {
        return false;
    };
    match event {
        IdentityEvent::Identity(identity) => listener.on_identity(identity),
        IdentityEvent::Error(error) => listener.on_error(error),
    }
    true
}

struct ChannelSubscription {
    id: u64,
    shared: Weak<SourceShared>,
    slot: ListenerSlot,
    pump: Option<AbortHandle>,
}

impl IdentitySubscription for ChannelSubscription {
    fn unsubscribe(&mut self) {
        // Blocks until an in-flight delivery has returned.
        let detached = self.slot.lock().take().is_some();
        if let Some(shared) = self.shared.upgrade() {
            shared
                .state
                .lock()
                .subscribers
                .retain(|(id, _)| *id != self.id);
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if detached {
            debug!(subscription_id = self.id, "identity subscription closed");
        }
    }
}

impl Drop for ChannelSubscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
