use futures::future::BoxFuture;
use std::time::Duration;
use tokio::time::sleep;

/// Deferred unit of work handed to a [`Scheduler`]
pub type Job = BoxFuture<'static, ()>;

/// Fire-once deferral of background work.
///
/// Jobs are not persisted and cannot be cancelled once scheduled.
pub trait Scheduler: Send + Sync {
    fn schedule_once(&self, delay: Duration, job: Job);
}

/// Runs each job on its own tokio task after sleeping for `delay`.
///
/// Uses tokio's timer, so tests running with a paused clock can drive jobs
/// with `tokio::time::advance`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_once(&self, delay: Duration, job: Job) {
        tokio::spawn(async move {
            sleep(delay).await;
            job.await;
        });
    }
}
