// ── Device handle seam ──
//
// The wire protocol lives outside this crate. Anything that can read a
// status report and write a switch state can sit behind a `StatusCache`.

use std::future::Future;
use std::sync::Arc;

use crate::error::DeviceError;
use crate::model::StatusBlob;

/// Network-facing client for one physical device.
///
/// Implementations should report every failure as a [`DeviceError`] and
/// leave retrying to the cache. They may assume calls never overlap: the
/// cache issues at most one operation at a time per device.
pub trait DeviceHandle: Send + Sync {
    /// Network address, used in log records and error messages.
    fn address(&self) -> &str;

    /// Stable device identifier, used to derive entity unique ids.
    fn id(&self) -> &str;

    /// Read the full status report.
    fn fetch_status(&self) -> impl Future<Output = Result<StatusBlob, DeviceError>> + Send;

    /// Set the switch at `switch_index` on or off.
    fn write_status(
        &self,
        state: bool,
        switch_index: &str,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send;
}

impl<D: DeviceHandle> DeviceHandle for Arc<D> {
    fn address(&self) -> &str {
        (**self).address()
    }

    fn id(&self) -> &str {
        (**self).id()
    }

    fn fetch_status(&self) -> impl Future<Output = Result<StatusBlob, DeviceError>> + Send {
        (**self).fetch_status()
    }

    fn write_status(
        &self,
        state: bool,
        switch_index: &str,
    ) -> impl Future<Output = Result<(), DeviceError>> + Send {
        (**self).write_status(state, switch_index)
    }
}
