//! Short-lived, single-flight view over one device's status.
//!
//! A [`StatusCache`] is shared by every entity bound to the same physical
//! device. It keeps at most one status report, serves it while it is younger
//! than [`CacheConfig::stale_after`], and otherwise goes to the device. All
//! reads and writes run under one async mutex, so the device never sees two
//! operations at once and concurrent pollers collapse into a single fetch.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error};

use crate::config::CacheConfig;
use crate::device::DeviceHandle;
use crate::error::CoreError;
use crate::model::StatusBlob;
use crate::retry::retry;

// ── WriteOutcome ─────────────────────────────────────────────────────

/// Result of [`StatusCache::set_status`].
///
/// A write that ran out of attempts is not an error: the device may still
/// have applied it, and the next refresh is what tells. `Abandoned` lets a
/// caller notice without the write path raising.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum WriteOutcome {
    Applied { attempts: u32 },
    Abandoned { attempts: u32 },
}

impl WriteOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    pub fn attempts(&self) -> u32 {
        match *self {
            Self::Applied { attempts } | Self::Abandoned { attempts } => attempts,
        }
    }
}

// ── StatusCache ──────────────────────────────────────────────────────

#[derive(Debug)]
struct CachedStatus {
    blob: Arc<StatusBlob>,
    fetched_at: Instant,
}

/// Memoizing, retrying wrapper around a [`DeviceHandle`].
///
/// Wrap in an `Arc` and hand clones to every entity of the device.
#[derive(Debug)]
pub struct StatusCache<D> {
    device: D,
    config: CacheConfig,
    entry: Mutex<Option<CachedStatus>>,
}

impl<D: DeviceHandle> StatusCache<D> {
    pub fn new(device: D, config: CacheConfig) -> Self {
        Self {
            device,
            config,
            entry: Mutex::new(None),
        }
    }

    pub fn with_defaults(device: D) -> Self {
        Self::new(device, CacheConfig::default())
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Stable identifier of the underlying device.
    pub fn unique_id(&self) -> &str {
        self.device.id()
    }

    /// Current status, from memory if fresh enough, otherwise from the device.
    ///
    /// A live fetch waits for the settle delay first and then retries per
    /// [`CacheConfig::read_retry`]. When every attempt fails the call returns
    /// [`CoreError::RefreshExhausted`] and the cache is left empty; an expired
    /// report is never served as a fallback.
    pub async fn status(&self) -> Result<Arc<StatusBlob>, CoreError> {
        let mut entry = self.entry.lock().await;

        if let Some(cached) = entry.as_ref() {
            let age = cached.fetched_at.elapsed();
            if age <= self.config.stale_after {
                debug!(
                    device = %self.device.address(),
                    age_ms = millis(age),
                    "serving cached status"
                );
                return Ok(Arc::clone(&cached.blob));
            }
        }
        *entry = None;

        tokio::time::sleep(self.config.settle_delay).await;

        let address = self.device.address();
        let fetched = retry(self.config.read_retry, address, "fetch status", || {
            self.device.fetch_status()
        })
        .await
        .map_err(|e| CoreError::RefreshExhausted {
            device: address.to_owned(),
            attempts: e.attempts,
            source: e.last_error,
        })?;

        let blob = Arc::new(fetched.value);
        *entry = Some(CachedStatus {
            blob: Arc::clone(&blob),
            fetched_at: Instant::now(),
        });
        debug!(
            device = %address,
            attempts = fetched.attempts,
            data_points = blob.len(),
            "status refreshed"
        );
        Ok(blob)
    }

    /// Switch `switch_index` on or off and drop the memoized status.
    ///
    /// The cache is cleared before the first attempt, whatever the outcome,
    /// so the next [`status`](Self::status) call reads the device again.
    pub async fn set_status(&self, state: bool, switch_index: &str) -> WriteOutcome {
        let mut entry = self.entry.lock().await;
        *entry = None;

        let address = self.device.address();
        match retry(self.config.write_retry, address, "set status", || {
            self.device.write_status(state, switch_index)
        })
        .await
        {
            Ok(done) => {
                debug!(
                    device = %address,
                    switch_index,
                    state,
                    attempts = done.attempts,
                    "status written"
                );
                WriteOutcome::Applied {
                    attempts: done.attempts,
                }
            }
            Err(e) => {
                error!(
                    device = %address,
                    switch_index,
                    state,
                    attempts = e.attempts,
                    error = %e.last_error,
                    "Failed to set status of device, giving up"
                );
                WriteOutcome::Abandoned {
                    attempts: e.attempts,
                }
            }
        }
    }

    /// The memoized report regardless of age, without touching the device.
    ///
    /// Waits for any in-flight operation to finish first.
    pub async fn cached(&self) -> Option<Arc<StatusBlob>> {
        self.entry
            .lock()
            .await
            .as_ref()
            .map(|cached| Arc::clone(&cached.blob))
    }

    /// When the memoized report was fetched, if there is one.
    pub async fn cached_at(&self) -> Option<Instant> {
        self.entry.lock().await.as_ref().map(|cached| cached.fetched_at)
    }
}

impl<D: DeviceHandle + 'static> StatusCache<D> {
    /// Like [`status`](Self::status), but stop waiting after `timeout`.
    ///
    /// The read runs on its own task. If the deadline passes the caller gets
    /// [`CoreError::Timeout`] while the read keeps going, retries included,
    /// and still updates the cache when it completes. Later callers queue
    /// behind it as usual.
    pub async fn status_within(
        self: &Arc<Self>,
        timeout: Duration,
    ) -> Result<Arc<StatusBlob>, CoreError> {
        let cache = Arc::clone(self);
        let task = tokio::spawn(async move { cache.status().await });

        match tokio::time::timeout(timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(CoreError::Internal(format!(
                "status task did not complete: {join_err}"
            ))),
            Err(_) => Err(CoreError::Timeout {
                timeout_ms: millis(timeout),
            }),
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
