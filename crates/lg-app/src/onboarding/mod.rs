//! Onboarding gate
//!
//! Holds the best-known onboarding flag. The flag is loaded once at startup
//! and afterwards only changes through an explicit completion event.

mod gate;

pub use gate::OnboardingGate;
