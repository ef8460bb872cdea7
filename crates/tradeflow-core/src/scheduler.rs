//! Execution of per-batch resolve-and-format tasks.
//!
//! The orchestrator never spawns work itself; it hands each batch task to an
//! injected [`BatchScheduler`] and awaits the returned futures in batch order.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::resolver::EnrichedBatch;
use crate::PipelineError;

/// Unit of work for one batch.
pub type BatchTask = BoxFuture<'static, EnrichedBatch>;

/// Capability that decides where batch tasks run.
pub trait BatchScheduler: Send + Sync {
    /// Start (or prepare) `task` and return a future for its result.
    ///
    /// Dropping the returned future must abandon the task.
    fn schedule(&self, seq: u64, task: BatchTask) -> BoxFuture<'static, Result<EnrichedBatch, PipelineError>>;
}

/// Runs batch tasks on the task that polls the output stream.
///
/// In-flight batches still overlap their cache round trips, but no work
/// happens while the consumer is not pulling.
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineScheduler;

impl BatchScheduler for InlineScheduler {
    fn schedule(&self, _seq: u64, task: BatchTask) -> BoxFuture<'static, Result<EnrichedBatch, PipelineError>> {
        task.map(Ok).boxed()
    }
}

/// Spawns each batch task onto a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Scheduler bound to the runtime of the calling task.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime.
    pub fn current() -> Self {
        Self::new(Handle::current())
    }
}

impl BatchScheduler for TokioScheduler {
    fn schedule(&self, seq: u64, task: BatchTask) -> BoxFuture<'static, Result<EnrichedBatch, PipelineError>> {
        let handle = AbortOnDrop(self.handle.spawn(task));
        async move {
            handle.await.map_err(|error| PipelineError::Worker {
                seq,
                message: error.to_string(),
            })
        }
        .boxed()
    }
}

/// Join handle that aborts its task when dropped before completion.
struct AbortOnDrop<T>(JoinHandle<T>);

impl<T> Future for AbortOnDrop<T> {
    type Output = Result<T, tokio::task::JoinError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0).poll(cx)
    }
}

impl<T> Drop for AbortOnDrop<T> {
    fn drop(&mut self) {
        self.0.abort();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::resolver::LookupOutcome;

    fn finished(seq: u64) -> EnrichedBatch {
        EnrichedBatch {
            seq,
            lines: vec![format!("line-{seq}\n")],
            outcome: LookupOutcome::default(),
        }
    }

    #[tokio::test]
    async fn inline_scheduler_returns_task_result() {
        let result = InlineScheduler
            .schedule(3, async { finished(3) }.boxed())
            .await
            .expect("inline task");
        assert_eq!(result, finished(3));
    }

    #[tokio::test]
    async fn tokio_scheduler_runs_task_on_runtime() {
        let scheduler = TokioScheduler::current();
        let result = scheduler
            .schedule(1, async { finished(1) }.boxed())
            .await
            .expect("spawned task");
        assert_eq!(result.seq, 1);
    }

    #[tokio::test]
    async fn tokio_scheduler_reports_panicked_worker() {
        let scheduler = TokioScheduler::current();
        let error = scheduler
            .schedule(
                7,
                async {
                    if true {
                        panic!("boom");
                    }
                    finished(7)
                }
                .boxed(),
            )
            .await
            .expect_err("panicking task");
        assert!(matches!(error, PipelineError::Worker { seq: 7, .. }));
    }

    #[tokio::test]
    async fn dropping_scheduled_future_aborts_task() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let scheduler = TokioScheduler::current();
        let pending = scheduler.schedule(
            0,
            async move {
                tokio::time::sleep(Duration::from_secs(30)).await;
                let _ = tx.send(());
                finished(0)
            }
            .boxed(),
        );

        drop(pending);
        // The sender is dropped with the aborted task, closing the channel.
        let outcome = tokio::time::timeout(Duration::from_secs(5), rx).await;
        assert!(matches!(outcome, Ok(Err(_))));
    }
}
