//! launchgate application layer
//!
//! Session bootstrap orchestration: the session store that races the identity
//! provider against the bootstrap deadline, the onboarding gate, and the
//! navigation watcher that projects both onto a single render target.

pub mod navigation;
pub mod onboarding;
pub mod runtime;
pub mod session;

pub use navigation::NavigationWatcher;
pub use onboarding::OnboardingGate;
pub use runtime::{GateDeps, GateRuntime, GateSnapshot};
pub use session::{IdentityCache, SessionStore, SessionStoreError};
