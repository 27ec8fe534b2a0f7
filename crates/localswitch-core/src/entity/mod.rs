// ── Host-facing entities ──
//
// A host scheduler only needs the `Entity` capability: refresh it, then read
// availability, state and attributes. `SwitchEntity` is the one
// implementation this crate ships.

mod switch;

use std::future::Future;
use std::sync::Arc;

pub use switch::{EntityState, SwitchEntity};

use crate::cache::StatusCache;
use crate::config::SwitchConfig;
use crate::device::DeviceHandle;
use crate::error::CoreError;
use crate::model::Attributes;

/// A poll-driven object with a name, availability, on/off state and
/// attributes.
pub trait Entity: Send + Sync {
    fn name(&self) -> &str;

    fn unique_id(&self) -> &str;

    /// Pull fresh state. Failures are reflected in [`is_available`](Self::is_available)
    /// and also returned so the caller can log them.
    fn refresh(&self) -> impl Future<Output = Result<(), CoreError>> + Send;

    fn is_available(&self) -> bool;

    fn is_on(&self) -> Option<bool>;

    fn attributes(&self) -> Result<Attributes, CoreError>;
}

/// Build one entity per switch, all sharing `cache`.
pub fn build_switches<D, I>(cache: &Arc<StatusCache<D>>, switches: I) -> Vec<Arc<SwitchEntity<D>>>
where
    D: DeviceHandle,
    I: IntoIterator<Item = SwitchConfig>,
{
    switches
        .into_iter()
        .map(|config| Arc::new(SwitchEntity::new(Arc::clone(cache), config)))
        .collect()
}
