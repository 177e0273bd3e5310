//! # Configuration Loader
//!
//! Reads the TOML file into a [`GateConfig`] DTO and, separately, resolves
//! that DTO into the settings the binary runs with.
//!
//! `load_config` is pure data loading: no validation, no defaults. All
//! default decisions live in [`resolve_settings`].

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use lg_core::config::{GateConfig, DEFAULT_BOOTSTRAP_DEADLINE_MS};

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "LG_CONFIG";
/// Suffixes the data directory name, keeping profiles apart.
pub const PROFILE_ENV: &str = "LG_PROFILE";

const APP_DIR_NAME: &str = "launchgate";
const CONFIG_FILE_NAME: &str = "config.toml";

/// Settings after defaults have been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GateSettings {
    pub bootstrap_deadline: Duration,
    pub data_dir: PathBuf,
    /// `None` keeps logging on stdout only.
    pub log_dir: Option<PathBuf>,
}

/// Load configuration from a TOML file.
///
/// Empty strings and zero values are accepted as they are.
///
/// # Errors
///
/// Returns error if the file cannot be read or is not valid TOML.
pub fn load_config(config_path: PathBuf) -> anyhow::Result<GateConfig> {
    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    let toml_value: toml::Value =
        toml::from_str(&content).context("Failed to parse config as TOML")?;
    GateConfig::from_toml(&toml_value)
}

/// Load the config file if one can be found, otherwise an empty config.
///
/// Lookup order: `LG_CONFIG`, then `config.toml` in the default data
/// directory.
pub fn load_or_default() -> anyhow::Result<GateConfig> {
    match locate_config()? {
        Some(path) => load_config(path),
        None => Ok(GateConfig::empty()),
    }
}

fn locate_config() -> anyhow::Result<Option<PathBuf>> {
    if let Ok(path) = std::env::var(CONFIG_ENV) {
        if !path.is_empty() {
            return Ok(Some(PathBuf::from(path)));
        }
    }
    let candidate = default_data_dir()?.join(CONFIG_FILE_NAME);
    Ok(candidate.is_file().then_some(candidate))
}

/// Directory name under the platform data dir, with the profile suffix.
pub fn app_dir_name() -> String {
    match std::env::var(PROFILE_ENV) {
        Ok(profile) if !profile.is_empty() => format!("{APP_DIR_NAME}-{profile}"),
        _ => APP_DIR_NAME.to_string(),
    }
}

pub fn default_data_dir() -> anyhow::Result<PathBuf> {
    let base = dirs::data_local_dir().context("Failed to determine local data directory")?;
    Ok(base.join(app_dir_name()))
}

/// Apply defaults to a loaded config.
///
/// - deadline `0` → 5000 ms
/// - empty data dir → platform local data dir
/// - empty log dir → no file logging
pub fn resolve_settings(config: &GateConfig) -> anyhow::Result<GateSettings> {
    let deadline_ms = match config.bootstrap_deadline_ms {
        0 => DEFAULT_BOOTSTRAP_DEADLINE_MS,
        ms => ms,
    };
    let data_dir = if is_unset(&config.data_dir) {
        default_data_dir()?
    } else {
        config.data_dir.clone()
    };
    let log_dir = (!is_unset(&config.log_dir)).then(|| config.log_dir.clone());

    Ok(GateSettings {
        bootstrap_deadline: Duration::from_millis(deadline_ms),
        data_dir,
        log_dir,
    })
}

fn is_unset(path: &Path) -> bool {
    path.as_os_str().is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(content.as_bytes()).unwrap();
        temp_file
    }

    fn with_env<T>(key: &str, value: Option<&str>, f: impl FnOnce() -> T) -> T {
        let previous = std::env::var(key).ok();
        match value {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
        let result = f();
        match previous {
            Some(v) => std::env::set_var(key, v),
            None => std::env::remove_var(key),
        }
        result
    }

    #[test]
    fn test_load_config_reads_valid_toml() {
        let file = write_config(
            r#"
            [session]
            bootstrap_deadline_ms = 1200

            [storage]
            data_dir = "/path/to/data"

            [logging]
            log_dir = "/path/to/logs"
        "#,
        );

        let config = load_config(file.path().to_path_buf()).unwrap();

        assert_eq!(config.bootstrap_deadline_ms, 1200);
        assert_eq!(config.data_dir, PathBuf::from("/path/to/data"));
        assert_eq!(config.log_dir, PathBuf::from("/path/to/logs"));
    }

    #[test]
    fn test_load_config_returns_empty_values_when_missing() {
        let file = write_config("[session]\n");

        let config = load_config(file.path().to_path_buf()).unwrap();

        assert_eq!(config, GateConfig::empty());
    }

    #[test]
    fn test_load_config_rejects_invalid_toml() {
        let file = write_config("[session\nbootstrap_deadline_ms = ");

        let err = load_config(file.path().to_path_buf()).unwrap_err();

        assert!(err.to_string().contains("Failed to parse config as TOML"));
    }

    #[test]
    fn test_load_config_reports_missing_file() {
        let err = load_config(PathBuf::from("/nonexistent/launchgate.toml")).unwrap_err();

        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    #[serial]
    fn test_resolve_settings_applies_defaults() {
        let settings = with_env(PROFILE_ENV, None, || {
            resolve_settings(&GateConfig::empty()).unwrap()
        });

        assert_eq!(settings.bootstrap_deadline, Duration::from_millis(5_000));
        assert!(settings.data_dir.ends_with(APP_DIR_NAME));
        assert_eq!(settings.log_dir, None);
    }

    #[test]
    fn test_resolve_settings_keeps_configured_values() {
        let config = GateConfig {
            bootstrap_deadline_ms: 250,
            data_dir: PathBuf::from("/data"),
            log_dir: PathBuf::from("/logs"),
        };

        let settings = resolve_settings(&config).unwrap();

        assert_eq!(settings.bootstrap_deadline, Duration::from_millis(250));
        assert_eq!(settings.data_dir, PathBuf::from("/data"));
        assert_eq!(settings.log_dir, Some(PathBuf::from("/logs")));
    }

    #[test]
    #[serial]
    fn test_profile_suffixes_app_dir_name() {
        let name = with_env(PROFILE_ENV, Some("qa"), app_dir_name);
        assert_eq!(name, "launchgate-qa");

        let name = with_env(PROFILE_ENV, Some(""), app_dir_name);
        assert_eq!(name, "launchgate");
    }

    #[test]
    #[serial]
    fn test_load_or_default_honours_config_env() {
        let file = write_config("[session]\nbootstrap_deadline_ms = 42\n");
        let path = file.path().to_string_lossy().to_string();

        let config = with_env(CONFIG_ENV, Some(&path), || load_or_default().unwrap());

        assert_eq!(config.bootstrap_deadline_ms, 42);
    }
}
