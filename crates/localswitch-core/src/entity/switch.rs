// ── Switch entity ──
//
// Projects one outlet's on/off data point and measurement attributes out of
// the shared device status, and forwards commands to the cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::Entity;
use crate::cache::{StatusCache, WriteOutcome};
use crate::config::SwitchConfig;
use crate::device::DeviceHandle;
use crate::error::CoreError;
use crate::model::{
    ATTR_CURRENT, ATTR_CURRENT_CONSUMPTION, ATTR_VOLTAGE, AttributeValue, Attributes, StatusBlob,
};

/// Observable state of a switch entity.
///
/// `available` starts false and turns false again on any failed refresh.
/// `is_on` keeps its last known value across failures. `last_blob` is the
/// most recent report the device returned, even one without this switch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityState {
    pub available: bool,
    pub is_on: Option<bool>,
    pub last_blob: Option<Arc<StatusBlob>>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// One outlet of a physical device.
pub struct SwitchEntity<D> {
    cache: Arc<StatusCache<D>>,
    config: SwitchConfig,
    unique_id: String,
    state: watch::Sender<EntityState>,
}

impl<D: DeviceHandle> SwitchEntity<D> {
    pub fn new(cache: Arc<StatusCache<D>>, config: SwitchConfig) -> Self {
        let unique_id = format!("local_{}_{}", cache.unique_id(), config.switch_index);
        let (state, _) = watch::channel(EntityState::default());
        debug!(entity = %unique_id, switch = %config.friendly_name, "switch entity created");

        Self {
            cache,
            config,
            unique_id,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.friendly_name
    }

    /// `local_<device id>_<switch index>`.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    pub fn switch_index(&self) -> &str {
        &self.config.switch_index
    }

    pub fn config(&self) -> &SwitchConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<StatusCache<D>> {
        &self.cache
    }

    // ── State observation ────────────────────────────────────────

    /// Consistent copy of the current state.
    pub fn snapshot(&self) -> EntityState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<EntityState> {
        self.state.subscribe()
    }

    pub fn is_available(&self) -> bool {
        self.state.borrow().available
    }

    pub fn is_on(&self) -> Option<bool> {
        self.state.borrow().is_on
    }

    // ── Refresh ──────────────────────────────────────────────────

    /// Read the shared status and update this entity's projection.
    ///
    /// On failure the entity becomes unavailable but keeps its last known
    /// on/off state. A report that arrived but lacks a usable switch data
    /// point still replaces the stored report, so attributes track it.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        let result = match self.cache.status().await {
            Ok(blob) => match blob.switch_state(&self.config.switch_index) {
                Ok(on) => Ok((blob, on)),
                Err(e) => {
                    self.state.send_modify(|s| {
                        s.last_blob = Some(blob);
                        s.last_updated = Some(Utc::now());
                    });
                    Err(e)
                }
            },
            Err(e) => Err(e),
        };

        match result {
            Ok((blob, on)) => {
                let was_available = self.is_available();
                self.state.send_modify(|s| {
                    s.available = true;
                    s.is_on = Some(on);
                    s.last_blob = Some(blob);
                    s.last_updated = Some(Utc::now());
                });
                if !was_available {
                    info!(entity = %self.unique_id, is_on = on, "switch available");
                }
                Ok(())
            }
            Err(e) => {
                let was_available = self.is_available();
                self.state.send_if_modified(|s| {
                    let changed = s.available;
                    s.available = false;
                    changed
                });
                if was_available {
                    warn!(entity = %self.unique_id, error = %e, "switch unavailable");
                } else {
                    debug!(entity = %self.unique_id, error = %e, "switch still unavailable");
                }
                Err(e)
            }
        }
    }

    // ── Commands ─────────────────────────────────────────────────

    /// Switch on. Local state only changes on the next refresh.
    pub async fn turn_on(&self) -> WriteOutcome {
        self.cache.set_status(true, &self.config.switch_index).await
    }

    /// Switch off. Local state only changes on the next refresh.
    pub async fn turn_off(&self) -> WriteOutcome {
        self.cache.set_status(false, &self.config.switch_index).await
    }

    // ── Attributes ───────────────────────────────────────────────

    /// Measurement attributes from the last known report.
    ///
    /// Empty before the first successful refresh. A configured key missing
    /// from the report is an error, not an omission.
    pub fn attributes(&self) -> Result<Attributes, CoreError> {
        let Some(blob) = self.state.borrow().last_blob.clone() else {
            return Ok(Attributes::new());
        };

        let mut attrs = Attributes::new();
        if let Some(key) = &self.config.current_key {
            let raw = read_integer(&blob, ATTR_CURRENT, key)?;
            attrs.insert(ATTR_CURRENT, AttributeValue::Integer(raw));
        }
        if let Some(key) = &self.config.consumption_key {
            let raw = read_integer(&blob, ATTR_CURRENT_CONSUMPTION, key)?;
            attrs.insert(ATTR_CURRENT_CONSUMPTION, AttributeValue::tenths(raw));
        }
        if let Some(key) = &self.config.voltage_key {
            let raw = read_integer(&blob, ATTR_VOLTAGE, key)?;
            attrs.insert(ATTR_VOLTAGE, AttributeValue::tenths(raw));
        }
        Ok(attrs)
    }
}

fn read_integer(blob: &StatusBlob, attribute: &'static str, key: &str) -> Result<i64, CoreError> {
    blob.get(key)
        .ok_or_else(|| CoreError::AttributeKeyMissing {
            attribute,
            key: key.to_owned(),
        })?
        .as_i64()
        .ok_or_else(|| CoreError::InvalidAttributeValue {
            attribute,
            key: key.to_owned(),
        })
}

impl<D: DeviceHandle> Entity for SwitchEntity<D> {
    fn name(&self) -> &str {
        SwitchEntity::name(self)
    }

    fn unique_id(&self) -> &str {
        SwitchEntity::unique_id(self)
    }

    async fn refresh(&self) -> Result<(), CoreError> {
        SwitchEntity::refresh(self).await
    }

    fn is_available(&self) -> bool {
        SwitchEntity::is_available(self)
    }

    fn is_on(&self) -> Option<bool> {
        SwitchEntity::is_on(self)
    }

    fn attributes(&self) -> Result<Attributes, CoreError> {
        SwitchEntity::attributes(self)
    }
}

impl<D> std::fmt::Debug for SwitchEntity<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchEntity")
            .field("unique_id", &self.unique_id)
            .field("config", &self.config)
            .field("state", &*self.state.borrow())
            .finish_non_exhaustive()
    }
}
