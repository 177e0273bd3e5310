//! # Pure Data Module - Data Transfer Objects Only
//!
//! Configuration data structures and the TOML → DTO mapping.
//!
//! No validation and no default calculation happen here: a missing deadline
//! is `0`, a missing directory is an empty path. The bootstrap layer decides
//! what those facts mean.

use std::path::PathBuf;

/// Default bootstrap deadline applied by the bootstrap layer when the
/// configured value is `0`.
pub const DEFAULT_BOOTSTRAP_DEADLINE_MS: u64 = 5_000;

/// Gate configuration DTO (pure data, no logic)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateConfig {
    /// Bootstrap deadline in milliseconds (0 means "not configured")
    pub bootstrap_deadline_ms: u64,

    /// Directory holding the persisted key-value records (may be empty)
    pub data_dir: PathBuf,

    /// Directory for log files (empty disables file logging)
    pub log_dir: PathBuf,
}

impl GateConfig {
    /// Create GateConfig from TOML value
    ///
    /// This method must NOT contain any validation or default value logic.
    /// Negative integers map to `0`.
    pub fn from_toml(toml_value: &toml::Value) -> anyhow::Result<Self> {
        Ok(Self {
            bootstrap_deadline_ms: toml_value
                .get("session")
                .and_then(|s| s.get("bootstrap_deadline_ms"))
                .and_then(|v| v.as_integer())
                .and_then(|v| u64::try_from(v).ok())
                .unwrap_or(0),
            data_dir: PathBuf::from(
                toml_value
                    .get("storage")
                    .and_then(|s| s.get("data_dir"))
                    .and_then(|v| v.as_str())
                    .unwrap_or(""),
            ),
            log_dir: PathBuf::from(
                toml_value
                    .get("logging")
                    .and_then(|l| l.get("log_dir"))
                    .and_then(|v| v.as_str())
                    .unwrap_or(""),
            ),
        })
    }

    /// Create empty GateConfig (all empty/default values)
    pub fn empty() -> Self {
        Self {
            bootstrap_deadline_ms: 0,
            data_dir: PathBuf::new(),
            log_dir: PathBuf::new(),
        }
    }
}
