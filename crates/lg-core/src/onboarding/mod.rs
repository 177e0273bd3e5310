//! Onboarding domain models
//!
//! The onboarding flag records whether the one-time introductory flow has
//! been completed on this install. It is monotonic: once completed it is
//! never reset by the gate, and signing out does not clear it.

/// Onboarding flow state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub struct OnboardingState {
    /// Whether onboarding has been completed
    pub has_completed: bool,
}

impl OnboardingState {
    pub fn completed() -> Self {
        Self {
            has_completed: true,
        }
    }

    /// Merge another observation into this one without ever regressing.
    pub fn merge(self, other: OnboardingState) -> Self {
        Self {
            has_completed: self.has_completed || other.has_completed,
        }
    }
}
