//! Batch synchronization of pair histories

pub mod cache;
pub mod coordinator;
pub mod refresh;
pub mod worker;

#[cfg(test)]
pub(crate) mod test_support;

pub use cache::SeriesCache;
pub use coordinator::{
    DEFAULT_LOCK_TTL, RefreshCoordinator, RefreshJob, TriggerError, TriggerOutcome,
};
pub use refresh::{BatchRefresh, RefreshError, RefreshReport};
pub use worker::RefreshWorker;
