// ── Runtime configuration ──
//
// These types describe how a cache treats its device and how an entity maps
// data points. They never touch disk; `localswitch-config` builds them from
// the TOML file and hands them in.

use std::time::Duration;

use crate::error::CoreError;
use crate::retry::RetryPolicy;

/// Switch index used when a switch does not name one.
pub const DEFAULT_SWITCH_INDEX: &str = "1";

/// Tuning for one [`StatusCache`](crate::StatusCache).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum age of a memoized status before a read goes to the device.
    pub stale_after: Duration,
    /// Pause before every live fetch. The device drops requests that arrive
    /// right after a previous one.
    pub settle_delay: Duration,
    /// Retry policy for status reads.
    pub read_retry: RetryPolicy,
    /// Retry policy for status writes.
    pub write_retry: RetryPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            stale_after: Duration::from_secs(15),
            settle_delay: Duration::from_millis(500),
            read_retry: RetryPolicy::read_default(),
            write_retry: RetryPolicy::write_default(),
        }
    }
}

/// One controllable outlet on a physical device.
///
/// Attribute keys are data point indexes inside the device status report.
/// A `None` key means the attribute is not exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchConfig {
    pub switch_index: String,
    pub friendly_name: String,
    pub current_key: Option<String>,
    pub consumption_key: Option<String>,
    pub voltage_key: Option<String>,
}

impl SwitchConfig {
    /// A switch on the default data point with no measurement attributes.
    pub fn new(friendly_name: impl Into<String>) -> Self {
        Self {
            switch_index: DEFAULT_SWITCH_INDEX.into(),
            friendly_name: friendly_name.into(),
            current_key: None,
            consumption_key: None,
            voltage_key: None,
        }
    }

    pub fn with_switch_index(mut self, index: impl Into<String>) -> Self {
        self.switch_index = index.into();
        self
    }

    pub fn with_current_key(mut self, key: impl Into<String>) -> Self {
        self.current_key = Some(key.into());
        self
    }

    pub fn with_consumption_key(mut self, key: impl Into<String>) -> Self {
        self.consumption_key = Some(key.into());
        self
    }

    pub fn with_voltage_key(mut self, key: impl Into<String>) -> Self {
        self.voltage_key = Some(key.into());
        self
    }

    /// Reject blank names and indexes.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.friendly_name.trim().is_empty() {
            return Err(CoreError::Config {
                message: "friendly_name must not be empty".into(),
            });
        }
        if self.switch_index.trim().is_empty() {
            return Err(CoreError::Config {
                message: format!("switch '{}' has an empty index", self.friendly_name),
            });
        }
        for (field, key) in [
            ("current", &self.current_key),
            ("current_consumption", &self.consumption_key),
            ("voltage", &self.voltage_key),
        ] {
            if key.as_deref().is_some_and(|k| k.trim().is_empty()) {
                return Err(CoreError::Config {
                    message: format!(
                        "switch '{}' maps {field} to an empty data point",
                        self.friendly_name
                    ),
                });
            }
        }
        Ok(())
    }
}
