//! Configuration for localswitch hosts.
//!
//! TOML device profiles, local key resolution (env + plaintext), and
//! translation to `localswitch_core::{CacheConfig, SwitchConfig}`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use localswitch_core::config::DEFAULT_SWITCH_INDEX;
use localswitch_core::{CacheConfig, RetryPolicy, SwitchConfig};

/// Attribute key value that means "not configured".
const UNSET_KEY: &str = "-1";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no local key configured for device '{device}'")]
    NoLocalKey { device: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named devices.
    #[serde(default)]
    pub devices: BTreeMap<String, DeviceProfile>,
}

/// Cache and polling tuning shared by all devices.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_stale_after_secs")]
    pub stale_after_secs: u64,

    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,

    #[serde(default = "default_attempts")]
    pub read_attempts: u32,

    #[serde(default = "default_read_retry_delay_ms")]
    pub read_retry_delay_ms: u64,

    #[serde(default = "default_attempts")]
    pub write_attempts: u32,

    #[serde(default = "default_escalate_after")]
    pub escalate_after: u32,

    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            stale_after_secs: default_stale_after_secs(),
            settle_delay_ms: default_settle_delay_ms(),
            read_attempts: default_attempts(),
            read_retry_delay_ms: default_read_retry_delay_ms(),
            write_attempts: default_attempts(),
            escalate_after: default_escalate_after(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

fn default_stale_after_secs() -> u64 {
    15
}
fn default_settle_delay_ms() -> u64 {
    500
}
fn default_attempts() -> u32 {
    5
}
fn default_read_retry_delay_ms() -> u64 {
    1000
}
fn default_escalate_after() -> u32 {
    3
}
fn default_poll_interval_secs() -> u64 {
    30
}

/// A physical device on the local network.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceProfile {
    /// IP address or hostname.
    pub host: String,

    /// Stable device identifier.
    pub device_id: String,

    /// Local key in plaintext. `local_key_env` takes precedence.
    pub local_key: Option<String>,

    /// Environment variable name containing the local key.
    pub local_key_env: Option<String>,

    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,

    /// Name of the implicit switch when `switches` is empty.
    pub friendly_name: Option<String>,

    /// Device-level attribute keys, used by the implicit switch.
    pub current: Option<String>,
    pub current_consumption: Option<String>,
    pub voltage: Option<String>,

    /// Outlets keyed by slug.
    #[serde(default)]
    pub switches: BTreeMap<String, SwitchProfile>,
}

fn default_protocol_version() -> String {
    "3.3".into()
}

/// One outlet of a device.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SwitchProfile {
    /// Data point of the on/off state.
    #[serde(default = "default_switch_id")]
    pub id: String,

    pub friendly_name: String,

    /// Deprecated, ignored.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub current: Option<String>,
    pub current_consumption: Option<String>,
    pub voltage: Option<String>,
}

fn default_switch_id() -> String {
    DEFAULT_SWITCH_INDEX.into()
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "localswitch", "localswitch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("localswitch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load the full Config from `path` + environment.
///
/// Environment variables use the `LOCALSWITCH_` prefix and `__` as the
/// nesting separator, e.g. `LOCALSWITCH_DEFAULTS__POLL_INTERVAL_SECS=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LOCALSWITCH_").split("__"));

    let config: Config = figment.extract()?;
    config.validate()?;
    debug!(path = %path.display(), devices = config.devices.len(), "config loaded");
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist or is invalid.
pub fn load_config_or_default() -> Config {
    load_config_or_default_from(&config_path())
}

/// Like [`load_config_or_default`] for an explicit path. A config that
/// fails to load or validate is logged and replaced by the defaults.
pub fn load_config_or_default_from(path: &Path) -> Config {
    load_config_from(path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "invalid config, using defaults");
        Config::default()
    })
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

/// Serialize config to TOML and write it to `path`.
pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Validation ──────────────────────────────────────────────────────

impl Config {
    /// Check every device profile and the global defaults.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.defaults.poll_interval_secs == 0 {
            return Err(ConfigError::Validation {
                field: "defaults.poll_interval_secs".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if self.defaults.read_attempts == 0 || self.defaults.write_attempts == 0 {
            return Err(ConfigError::Validation {
                field: "defaults".into(),
                reason: "read_attempts and write_attempts must be at least 1".into(),
            });
        }
        let max_escalation = self.defaults.read_attempts.min(self.defaults.write_attempts);
        if !(1..=max_escalation).contains(&self.defaults.escalate_after) {
            return Err(ConfigError::Validation {
                field: "defaults.escalate_after".into(),
                reason: format!("must be between 1 and {max_escalation}"),
            });
        }
        for (name, profile) in &self.devices {
            switch_configs(profile, name)?;
        }
        Ok(())
    }
}

// ── Translation to core types ───────────────────────────────────────

/// Build the cache tuning from the global defaults.
pub fn cache_config(defaults: &Defaults) -> CacheConfig {
    CacheConfig {
        stale_after: Duration::from_secs(defaults.stale_after_secs),
        settle_delay: Duration::from_millis(defaults.settle_delay_ms),
        read_retry: RetryPolicy {
            max_attempts: defaults.read_attempts,
            delay: Duration::from_millis(defaults.read_retry_delay_ms),
            escalate_after: defaults.escalate_after,
        },
        write_retry: RetryPolicy {
            max_attempts: defaults.write_attempts,
            delay: Duration::ZERO,
            escalate_after: defaults.escalate_after,
        },
    }
}

/// How often a host should refresh entities.
pub fn poll_interval(defaults: &Defaults) -> Duration {
    Duration::from_secs(defaults.poll_interval_secs)
}

/// Build one `SwitchConfig` per outlet of a device.
///
/// A device without a `switches` table gets a single switch on data point
/// "1", named after the device and using the device-level attribute keys.
pub fn switch_configs(
    profile: &DeviceProfile,
    device_name: &str,
) -> Result<Vec<SwitchConfig>, ConfigError> {
    if profile.host.trim().is_empty() {
        return Err(validation(device_name, "host", "must not be empty"));
    }
    if profile.device_id.trim().is_empty() {
        return Err(validation(device_name, "device_id", "must not be empty"));
    }

    let switches: Vec<SwitchConfig> = if profile.switches.is_empty() {
        let friendly_name = profile
            .friendly_name
            .clone()
            .unwrap_or_else(|| device_name.to_owned());
        vec![SwitchConfig {
            switch_index: DEFAULT_SWITCH_INDEX.into(),
            friendly_name,
            current_key: attribute_key(profile.current.as_ref()),
            consumption_key: attribute_key(profile.current_consumption.as_ref()),
            voltage_key: attribute_key(profile.voltage.as_ref()),
        }]
    } else {
        profile
            .switches
            .values()
            .map(|sw| SwitchConfig {
                switch_index: sw.id.clone(),
                friendly_name: sw.friendly_name.clone(),
                current_key: attribute_key(sw.current.as_ref()),
                consumption_key: attribute_key(sw.current_consumption.as_ref()),
                voltage_key: attribute_key(sw.voltage.as_ref()),
            })
            .collect()
    };

    for switch in &switches {
        switch
            .validate()
            .map_err(|e| validation(device_name, "switches", &e.to_string()))?;
    }
    for (i, switch) in switches.iter().enumerate() {
        if switches[..i]
            .iter()
            .any(|other| other.switch_index == switch.switch_index)
        {
            return Err(validation(
                device_name,
                "switches",
                &format!("data point {} is used by more than one switch", switch.switch_index),
            ));
        }
    }
    Ok(switches)
}

fn attribute_key(key: Option<&String>) -> Option<String> {
    key.filter(|k| k.as_str() != UNSET_KEY).cloned()
}

fn validation(device_name: &str, field: &str, reason: &str) -> ConfigError {
    ConfigError::Validation {
        field: format!("devices.{device_name}.{field}"),
        reason: reason.into(),
    }
}

// ── Local key resolution ────────────────────────────────────────────

/// Resolve a device's local key: env var named by `local_key_env`, then
/// plaintext `local_key`.
pub fn resolve_local_key(
    profile: &DeviceProfile,
    device_name: &str,
) -> Result<SecretString, ConfigError> {
    // 1. Profile's local_key_env → env var lookup
    if let Some(ref env_name) = profile.local_key_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. Plaintext in config
    if let Some(ref key) = profile.local_key {
        return Ok(SecretString::from(key.clone()));
    }

    Err(ConfigError::NoLocalKey {
        device: device_name.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_core_defaults() {
        let defaults = Defaults::default();
        assert_eq!(cache_config(&defaults), CacheConfig::default());
        assert_eq!(poll_interval(&defaults), Duration::from_secs(30));
    }

    #[test]
    fn unset_sentinel_is_dropped() {
        assert_eq!(attribute_key(Some(&"-1".to_owned())), None);
        assert_eq!(attribute_key(Some(&"18".to_owned())), Some("18".to_owned()));
        assert_eq!(attribute_key(None), None);
    }
}
