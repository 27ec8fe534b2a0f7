// ── Periodic refresh ──
//
// A minimal host scheduler: refresh every entity on a fixed interval until
// cancelled. Entities sharing a cache end up behind one fetch per tick.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::entity::Entity;
use crate::error::CoreError;

/// Drives [`Entity::refresh`] for a set of entities.
pub struct Poller;

impl Poller {
    /// Spawn the polling task.
    ///
    /// The first refresh happens immediately. A refresh that is already
    /// running when `cancel` fires is allowed to finish.
    ///
    /// Fails with [`CoreError::Config`] if `interval` is zero.
    pub fn spawn<E: Entity + 'static>(
        entities: Vec<Arc<E>>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Result<JoinHandle<()>, CoreError> {
        if interval.is_zero() {
            return Err(CoreError::Config {
                message: "poll interval must be greater than zero".into(),
            });
        }
        Ok(tokio::spawn(poll_task(entities, interval, cancel)))
    }

    /// Refresh every entity once, concurrently. Returns how many succeeded.
    pub async fn refresh_all<E: Entity>(entities: &[Arc<E>]) -> usize {
        let results = join_all(entities.iter().map(|e| e.refresh())).await;

        let mut ok = 0;
        for (entity, result) in entities.iter().zip(results) {
            match result {
                Ok(()) => ok += 1,
                Err(e) => debug!(entity = %entity.unique_id(), error = %e, "refresh failed"),
            }
        }
        ok
    }
}

async fn poll_task<E: Entity>(entities: Vec<Arc<E>>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(
        entities = entities.len(),
        interval_secs = interval.as_secs(),
        "polling started"
    );

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let ok = Poller::refresh_all(&entities).await;
        debug!(ok, total = entities.len(), "poll cycle complete");
    }

    info!("polling stopped");
}
