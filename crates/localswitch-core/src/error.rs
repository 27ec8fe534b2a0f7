// ── Core error types ──
//
// `DeviceError` is what a device handle reports for a single failed
// operation. `CoreError` is what callers of this crate see: only failures
// that outlived the retry budget, or configuration/device mismatches.

use thiserror::Error;

/// Failure of one device operation, as reported by a [`DeviceHandle`](crate::DeviceHandle).
///
/// The cache does not distinguish between variants when retrying; any of
/// them counts as one failed attempt.
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Socket-level failure (connection refused, reset, unreachable).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The device did not answer in time.
    #[error("device did not respond within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The device answered with something that could not be decoded.
    #[error("protocol error: {message}")]
    Protocol { message: String },

    /// The device decoded the request but refused it.
    #[error("device rejected the request: {message}")]
    Rejected { message: String },
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Device I/O ───────────────────────────────────────────────────
    #[error("Failed to update status of device {device} after {attempts} attempts")]
    RefreshExhausted {
        device: String,
        attempts: u32,
        #[source]
        source: DeviceError,
    },

    #[error("Timed out after {timeout_ms}ms waiting for device status")]
    Timeout { timeout_ms: u64 },

    // ── Status projection ────────────────────────────────────────────
    #[error("Status report has no data point for switch {switch_index}")]
    SwitchStateMissing { switch_index: String },

    #[error("Data point {switch_index} is not a switch state")]
    InvalidSwitchState { switch_index: String },

    #[error("Attribute {attribute} is mapped to data point {key}, which the device did not report")]
    AttributeKeyMissing { attribute: &'static str, key: String },

    #[error("Attribute {attribute} is mapped to data point {key}, which is not an integer")]
    InvalidAttributeValue { attribute: &'static str, key: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Returns `true` if the error came from the device not answering,
    /// as opposed to a mismatch between configuration and report.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::RefreshExhausted { .. } | Self::Timeout { .. })
    }
}
