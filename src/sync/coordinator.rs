use crate::core::clock::Clock;
use crate::core::currency::CurrencyPair;
use crate::store::{LockError, LockStore};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

pub const DEFAULT_LOCK_TTL: Duration = Duration::from_secs(50);

/// A request to refresh every known pair, put on the queue by a trigger.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshJob {
    pub trigger: CurrencyPair,
    pub requested_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerOutcome {
    Scheduled,
    /// A refresh was already scheduled for this key within the TTL.
    LockBusy,
}

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error(transparent)]
    Lock(#[from] LockError),
    #[error("Refresh queue is closed")]
    QueueClosed,
}

/// Admits at most one batch refresh per lock key per TTL window.
///
/// The key is per pair while the job refreshes every pair, so triggers for
/// different pairs inside one window each schedule their own batch job.
#[derive(Clone)]
pub struct RefreshCoordinator {
    locks: Arc<dyn LockStore>,
    clock: Arc<dyn Clock>,
    jobs: mpsc::UnboundedSender<RefreshJob>,
    ttl: Duration,
}

impl RefreshCoordinator {
    /// Returns the coordinator and the receiving end of its job queue.
    pub fn new(
        locks: Arc<dyn LockStore>,
        clock: Arc<dyn Clock>,
        ttl: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<RefreshJob>) {
        let (jobs, receiver) = mpsc::unbounded_channel();
        (
            Self {
                locks,
                clock,
                jobs,
                ttl,
            },
            receiver,
        )
    }

    pub fn lock_key(pair: &CurrencyPair) -> String {
        format!("loading_history:{pair}")
    }

    /// Schedules a batch refresh unless one was scheduled for `pair` within
    /// the TTL. Never waits for the refresh itself.
    pub async fn trigger(&self, pair: &CurrencyPair) -> Result<TriggerOutcome, TriggerError> {
        let key = Self::lock_key(pair);
        if !self.locks.try_acquire(&key, self.ttl).await? {
            debug!(%pair, "Refresh already scheduled");
            return Ok(TriggerOutcome::LockBusy);
        }

        let job = RefreshJob {
            trigger: pair.clone(),
            requested_at: self.clock.now(),
        };
        self.jobs.send(job).map_err(|_| TriggerError::QueueClosed)?;
        info!(%pair, "Refresh scheduled");
        Ok(TriggerOutcome::Scheduled)
    }
}
