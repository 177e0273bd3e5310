//! # lg-core
//!
//! Core domain models and ports for the launchgate session gate.
//!
//! This crate contains pure decision logic without any infrastructure dependencies.

// Public module exports
pub mod config;
pub mod identity;
pub mod ids;
pub mod navigation;
pub mod onboarding;
pub mod ports;
pub mod session;

// Re-export commonly used types at the crate root
pub use config::GateConfig;
pub use identity::{CachedIdentitySnapshot, Identity};
pub use ids::UserId;
pub use navigation::{decide, NavigationTarget};
pub use onboarding::OnboardingState;
pub use session::{ResolutionTrigger, SessionResolution, SessionState};
