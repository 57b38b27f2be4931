//! Host configuration for launch-control.
//!
//! Governs the transport and logging of the host process only. The tracker's
//! addressing (collector origin, tracking id) always comes from the embedding
//! script attributes, never from here.
//!
//! Resolution order: built-in defaults, then `~/.launch-control/config.json`
//! (or the file named by `LAUNCH_CONTROL_CONFIG`), then environment overrides.

use crate::error::{BeaconError, Result};
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV: &str = "LAUNCH_CONTROL_CONFIG";
pub const REQUEST_TIMEOUT_ENV: &str = "LAUNCH_CONTROL_REQUEST_TIMEOUT_MS";
pub const FLUSH_TIMEOUT_ENV: &str = "LAUNCH_CONTROL_FLUSH_TIMEOUT_MS";
pub const LOG_DIR_ENV: &str = "LAUNCH_CONTROL_LOG_DIR";

const CONFIG_DIR: &str = ".launch-control";
const CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LaunchControlConfig {
    /// Upper bound for a single beacon request, including the response.
    pub request_timeout_ms: u64,
    pub connect_timeout_ms: u64,
    /// How long the host waits for in-flight beacons before exiting.
    pub flush_timeout_ms: u64,
    /// When set, logs are also written to a daily-rolling file here.
    pub log_dir: Option<PathBuf>,
}

impl Default for LaunchControlConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 5_000,
            connect_timeout_ms: 2_000,
            flush_timeout_ms: 3_000,
            log_dir: None,
        }
    }
}

impl LaunchControlConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn flush_timeout(&self) -> Duration {
        Duration::from_millis(self.flush_timeout_ms)
    }

    /// Loads the configuration file (defaults when absent) and applies
    /// environment overrides.
    pub fn load() -> Result<Self> {
        let mut config = match config_path() {
            Some(path) => load_from_path(&path)?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(value) = env_millis(REQUEST_TIMEOUT_ENV)? {
            self.request_timeout_ms = value;
        }
        if let Some(value) = env_millis(FLUSH_TIMEOUT_ENV)? {
            self.flush_timeout_ms = value;
        }
        if let Ok(dir) = env::var(LOG_DIR_ENV) {
            if !dir.trim().is_empty() {
                self.log_dir = Some(PathBuf::from(dir));
            }
        }
        Ok(())
    }
}

/// Returns the path of the configuration file, honouring `LAUNCH_CONTROL_CONFIG`.
pub fn config_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Some(PathBuf::from(path));
    }
    dirs::home_dir().map(|home| home.join(CONFIG_DIR).join(CONFIG_FILE))
}

/// Reads a configuration file, returning defaults if it doesn't exist.
pub fn load_from_path(path: &Path) -> Result<LaunchControlConfig> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(LaunchControlConfig::default())
        }
        Err(err) => {
            return Err(BeaconError::Io {
                context: format!("reading {}", path.display()),
                source: err,
            })
        }
    };

    serde_json::from_str(&content).map_err(|err| BeaconError::ConfigMalformed {
        path: path.to_path_buf(),
        details: err.to_string(),
    })
}

fn env_millis(key: &str) -> Result<Option<u64>> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|err| BeaconError::ConfigValue {
                key: key.to_string(),
                details: err.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use tempfile::tempdir;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    struct EnvGuard {
        key: &'static str,
        prior: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prior = std::env::var(key).ok();
            std::env::set_var(key, value);
            Self { key, prior }
        }

        fn unset(key: &'static str) -> Self {
            let prior = std::env::var(key).ok();
            std::env::remove_var(key);
            Self { key, prior }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.prior {
                std::env::set_var(self.key, value);
            } else {
                std::env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        ENV_LOCK
            .get_or_init(|| Mutex::new(()))
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempdir().unwrap();
        let config = load_from_path(&temp.path().join("absent.json")).unwrap();
        assert_eq!(config, LaunchControlConfig::default());
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"flush_timeout_ms": 750}"#).unwrap();

        let config = load_from_path(&path).unwrap();
        assert_eq!(config.flush_timeout(), Duration::from_millis(750));
        assert_eq!(config.request_timeout_ms, 5_000);
    }

    #[test]
    fn malformed_file_is_an_error() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = load_from_path(&path).unwrap_err();
        assert!(matches!(err, BeaconError::ConfigMalformed { .. }));
    }

    #[test]
    fn env_overrides_file_values() {
        let _guard = env_lock();
        let temp = tempdir().unwrap();
        let path = temp.path().join("config.json");
        std::fs::write(&path, r#"{"request_timeout_ms": 100, "flush_timeout_ms": 200}"#).unwrap();

        let _config = EnvGuard::set(CONFIG_ENV, path.to_str().unwrap());
        let _request = EnvGuard::set(REQUEST_TIMEOUT_ENV, "900");
        let _flush = EnvGuard::unset(FLUSH_TIMEOUT_ENV);
        let _log = EnvGuard::set(LOG_DIR_ENV, "/var/log/launch-control");

        let config = LaunchControlConfig::load().unwrap();
        assert_eq!(config.request_timeout_ms, 900);
        assert_eq!(config.flush_timeout_ms, 200);
        assert_eq!(
            config.log_dir,
            Some(PathBuf::from("/var/log/launch-control"))
        );
    }

    #[test]
    fn non_numeric_env_override_is_rejected() {
        let _guard = env_lock();
        let temp = tempdir().unwrap();
        let _config = EnvGuard::set(
            CONFIG_ENV,
            temp.path().join("absent.json").to_str().unwrap(),
        );
        let _flush = EnvGuard::set(FLUSH_TIMEOUT_ENV, "soon");

        let err = LaunchControlConfig::load().unwrap_err();
        assert!(matches!(err, BeaconError::ConfigValue { .. }));
    }
}
