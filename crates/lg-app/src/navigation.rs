//! Navigation watcher.
//!
//! Recomputes [`decide`] whenever the session state or the onboarding flag
//! changes and yields only actual target changes.

use tokio::sync::watch;
use tracing::debug;

use lg_core::navigation::{decide, NavigationTarget};
use lg_core::onboarding::OnboardingState;
use lg_core::session::SessionState;

pub struct NavigationWatcher {
    session_rx: watch::Receiver<SessionState>,
    onboarding_rx: watch::Receiver<OnboardingState>,
    last: NavigationTarget,
    onboarding_open: bool,
}

impl NavigationWatcher {
    pub fn new(
        mut session_rx: watch::Receiver<SessionState>,
        mut onboarding_rx: watch::Receiver<OnboardingState>,
    ) -> Self {
        let session = session_rx.borrow_and_update().clone();
        let onboarding = *onboarding_rx.borrow_and_update();
        Self {
            session_rx,
            onboarding_rx,
            last: decide(&session, onboarding),
            onboarding_open: true,
        }
    }

    /// Target for the inputs as they are right now.
    pub fn current(&self) -> NavigationTarget {
        let onboarding = *self.onboarding_rx.borrow();
        decide(&self.session_rx.borrow(), onboarding)
    }

    /// Last target yielded (or the initial one).
    pub fn last(&self) -> NavigationTarget {
        self.last
    }

    /// Wait for the next target change.
    ///
    /// Input changes that leave the target unchanged are swallowed. Returns
    /// `None` once the session store is gone.
    pub async fn changed(&mut self) -> Option<NavigationTarget> {
        loop {
            tokio::select! {
                res = self.session_rx.changed() => {
                    if res.is_err() {
                        return None;
                    }
                }
                res = self.onboarding_rx.changed(), if self.onboarding_open => {
                    if res.is_err() {
                        self.onboarding_open = false;
                    }
                }
            }

            let session = self.session_rx.borrow_and_update().clone();
            let onboarding = *self.onboarding_rx.borrow_and_update();
            let target = decide(&session, onboarding);
            if target != self.last {
                debug!(from = %self.last, to = %target, "navigation target changed");
                self.last = target;
                return Some(target);
            }
        }
    }
}
