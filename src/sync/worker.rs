use super::coordinator::RefreshJob;
use super::refresh::BatchRefresh;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument};

/// Consumes refresh jobs one at a time until the queue closes.
pub struct RefreshWorker {
    refresh: BatchRefresh,
}

impl RefreshWorker {
    pub fn new(refresh: BatchRefresh) -> Self {
        Self { refresh }
    }

    /// Runs the worker on its own task. The handle resolves to the number of
    /// jobs processed once every sender is dropped.
    pub fn spawn(self, jobs: mpsc::UnboundedReceiver<RefreshJob>) -> JoinHandle<usize> {
        tokio::spawn(self.run(jobs))
    }

    pub async fn run(self, mut jobs: mpsc::UnboundedReceiver<RefreshJob>) -> usize {
        let mut processed = 0;
        while let Some(job) = jobs.recv().await {
            self.process(&job).await;
            processed += 1;
        }
        info!(processed, "Refresh queue closed");
        processed
    }

    #[instrument(
        name = "RefreshJob",
        skip(self, job),
        fields(trigger = %job.trigger, requested_at = %job.requested_at)
    )]
    async fn process(&self, job: &RefreshJob) {
        match self.refresh.run().await {
            Ok(report) => info!(
                refreshed = report.pairs_refreshed,
                inserted = report.inserted,
                failed = report.failed.len(),
                "Refresh job done"
            ),
            Err(e) => error!(error = %e, "Refresh job failed"),
        }
    }
}
