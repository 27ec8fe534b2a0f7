//! Polling and command layer for locally controlled smart switches.
//!
//! This crate owns the part of the integration that talks to a flaky device
//! on the local network and the entities that project its state:
//!
//! - **[`StatusCache`]**: One per physical device. Memoizes the last status
//!   report for a short window, serializes every device operation behind a
//!   single async mutex, and retries failed reads and writes with a fixed
//!   [`RetryPolicy`].
//!
//! - **[`SwitchEntity`]**: One per controllable outlet. Reads its on/off
//!   data point and measurement attributes out of the shared cache, tracks
//!   availability, and forwards `turn_on` / `turn_off` to the cache's write
//!   path.
//!
//! - **[`Entity`]**: The capability trait a host scheduler polls.
//!   [`Poller`] is a ready-made tokio scheduler built on it.
//!
//! - **[`DeviceHandle`]**: The seam to the wire protocol. Implement it for
//!   whatever client actually speaks to the device.

pub mod cache;
pub mod config;
pub mod device;
pub mod entity;
pub mod error;
pub mod model;
pub mod poller;
pub mod retry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use cache::{StatusCache, WriteOutcome};
pub use config::{CacheConfig, SwitchConfig};
pub use device::DeviceHandle;
pub use entity::{Entity, EntityState, SwitchEntity, build_switches};
pub use error::{CoreError, DeviceError};
pub use model::{
    ATTR_CURRENT, ATTR_CURRENT_CONSUMPTION, ATTR_VOLTAGE, AttributeValue, Attributes, DpValue,
    StatusBlob,
};
pub use poller::Poller;
pub use retry::{RetryExhausted, RetryPolicy, Retried, retry};
