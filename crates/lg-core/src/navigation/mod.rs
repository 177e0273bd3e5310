//! Navigation decision.
//!
//! Defines the pure function that picks the top-level stack from the session
//! state and the onboarding flag.

use serde::{Deserialize, Serialize};

use crate::onboarding::OnboardingState;
use crate::session::SessionState;

/// Top-level UI stack to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationTarget {
    /// Neutral progress indicator while the session is resolving.
    Loading,
    Unauthenticated,
    Onboarding,
    MainApplication,
}

impl NavigationTarget {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Unauthenticated => "unauthenticated",
            Self::Onboarding => "onboarding",
            Self::MainApplication => "main_application",
        }
    }

    /// `Loading` is a pseudo-target, not one of the rendered stacks.
    pub fn is_stack(&self) -> bool {
        !matches!(self, Self::Loading)
    }
}

impl std::fmt::Display for NavigationTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick the navigation target.
///
/// Side-effect free: the same inputs always yield the same target.
pub fn decide(session: &SessionState, onboarding: OnboardingState) -> NavigationTarget {
    if session.is_resolving() {
        return NavigationTarget::Loading;
    }
    if session.identity.is_none() {
        return NavigationTarget::Unauthenticated;
    }
    if !onboarding.has_completed {
        return NavigationTarget::Onboarding;
    }
    NavigationTarget::MainApplication
}
