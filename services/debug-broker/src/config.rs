//! Broker process configuration loading.
//!
//! TOML is the sole config source; no environment variable overrides.
//! Default config path: `/etc/debug-broker/broker.toml`. Every field is
//! optional — an empty file loads with the defaults documented below.

use serde::Deserialize;
use std::path::Path;

/// Validated broker configuration.
#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Maximum concurrent sessions the registry admits.
    pub max_sessions: usize,
    /// Per-command timeout, milliseconds.
    pub command_timeout_ms: u64,
    /// How often the registry reaps sessions that went DISCONNECTED on
    /// their own, milliseconds.
    pub reaper_interval_ms: u64,
    /// Host allow-list for the admission policy.
    pub allowed_hosts: Vec<String>,
    pub allow_any_host: bool,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        BrokerConfig {
            max_sessions: 16,
            command_timeout_ms: 5_000,
            reaper_interval_ms: 5_000,
            allowed_hosts: vec!["localhost".to_owned(), "127.0.0.1".to_owned(), "::1".to_owned()],
            allow_any_host: false,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    sessions: Option<RawSessionsConfig>,
    admission: Option<RawAdmissionConfig>,
}

#[derive(Debug, Deserialize)]
struct RawSessionsConfig {
    max_sessions: Option<usize>,
    command_timeout_ms: Option<u64>,
    reaper_interval_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawAdmissionConfig {
    allowed_hosts: Option<Vec<String>>,
    allow_any_host: Option<bool>,
}

/// Load broker config from the default path `/etc/debug-broker/broker.toml`.
pub fn load_config() -> Result<BrokerConfig, ConfigError> {
    load_config_from_path(Path::new("/etc/debug-broker/broker.toml"))
}

pub fn load_config_from_path(path: &Path) -> Result<BrokerConfig, ConfigError> {
    let toml_str = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::Io(format!("reading config file '{}': {}", path.display(), e)))?;
    load_config_from_str(&toml_str)
}

/// Load broker config from a TOML string. The integration tests call this
/// directly instead of touching the filesystem.
pub fn load_config_from_str(toml_str: &str) -> Result<BrokerConfig, ConfigError> {
    let raw: RawConfig = toml::from_str(toml_str).map_err(|e| ConfigError::Parse(e.to_string()))?;
    let defaults = BrokerConfig::default();

    let sessions = match raw.sessions {
        Some(s) => BrokerConfig {
            max_sessions: s.max_sessions.unwrap_or(defaults.max_sessions),
            command_timeout_ms: s.command_timeout_ms.unwrap_or(defaults.command_timeout_ms),
            reaper_interval_ms: s.reaper_interval_ms.unwrap_or(defaults.reaper_interval_ms),
            ..defaults.clone()
        },
        None => defaults.clone(),
    };

    let admission = match raw.admission {
        Some(a) => {
            let allow_any_host = a.allow_any_host.unwrap_or(defaults.allow_any_host);
            let allowed_hosts = a.allowed_hosts.unwrap_or(defaults.allowed_hosts.clone());
            if allowed_hosts.is_empty() && !allow_any_host {
                return Err(ConfigError::InvalidValue(
                    "admission.allowed_hosts must not be empty unless allow_any_host is true".to_owned(),
                ));
            }
            (allowed_hosts, allow_any_host)
        }
        None => (defaults.allowed_hosts.clone(), defaults.allow_any_host),
    };

    Ok(BrokerConfig {
        max_sessions: sessions.max_sessions,
        command_timeout_ms: sessions.command_timeout_ms,
        reaper_interval_ms: sessions.reaper_interval_ms,
        allowed_hosts: admission.0,
        allow_any_host: admission.1,
    })
}

#[derive(Debug)]
pub enum ConfigError {
    Io(String),
    Parse(String),
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(s) => write!(f, "IO error: {s}"),
            ConfigError::Parse(s) => write!(f, "parse error: {s}"),
            ConfigError::InvalidValue(s) => write!(f, "invalid config value: {s}"),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_loads_defaults() {
        let cfg = load_config_from_str("").unwrap();
        assert_eq!(cfg.max_sessions, 16);
        assert_eq!(cfg.command_timeout_ms, 5_000);
        assert!(!cfg.allow_any_host);
        assert_eq!(cfg.allowed_hosts, vec!["localhost", "127.0.0.1", "::1"]);
    }

    #[test]
    fn overrides_apply_on_top_of_defaults() {
        let toml = r#"
[sessions]
max_sessions = 4

[admission]
allow_any_host = true
allowed_hosts = []
"#;
        let cfg = load_config_from_str(toml).unwrap();
        assert_eq!(cfg.max_sessions, 4);
        assert_eq!(cfg.command_timeout_ms, 5_000);
        assert!(cfg.allow_any_host);
        assert!(cfg.allowed_hosts.is_empty());
    }

    #[test]
    fn empty_allow_list_without_allow_any_host_is_rejected() {
        let toml = r#"
[admission]
allowed_hosts = []
"#;
        let err = load_config_from_str(toml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(_)));
    }
}
