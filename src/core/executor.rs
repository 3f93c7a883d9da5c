//! Tokio-backed scheduler - runs deferred jobs on the runtime's blocking pool
//!
//! Node functions are plain synchronous code, so jobs go through
//! `spawn_blocking` rather than onto the async workers.

use super::scheduler::{Job, Scheduler, SchedulerHandle};
use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::runtime::{Builder, Handle, Runtime};

/// Scheduler dispatching jobs onto a tokio runtime
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    cancelled: Arc<AtomicBool>,
}

impl TokioScheduler {
    /// Create a scheduler for the runtime behind `handle`
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create a scheduler for the runtime the caller is running on
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current()
            .map_err(|e| anyhow::anyhow!("No tokio runtime to schedule on: {}", e))?;
        Ok(Self::new(handle))
    }

    /// Build a runtime whose blocking pool fits a graph with
    /// `async_requirements` deferred leaves
    pub fn build_runtime(async_requirements: usize) -> Result<Runtime> {
        let threads = async_requirements.max(1);
        log::debug!("Building runtime with {} blocking threads", threads);
        let runtime = Builder::new_multi_thread()
            .max_blocking_threads(threads)
            .thread_name("daggr-worker")
            .enable_all()
            .build()?;
        Ok(runtime)
    }

    /// Erase into the handle `execute` expects
    pub fn into_handle(self) -> SchedulerHandle {
        Arc::new(self)
    }

    /// Cancel queued and future jobs. Jobs already running finish normally.
    pub fn cancel(&self) {
        if !self.cancelled.swap(true, Ordering::AcqRel) {
            log::info!("Tokio scheduler cancelled");
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

impl Scheduler for TokioScheduler {
    fn dispatch(&self, job: Job) {
        if self.is_cancelled() {
            job.cancel();
            return;
        }

        let cancelled = self.cancelled.clone();
        // Dropping the JoinHandle detaches the task.
        let _ = self.handle.spawn_blocking(move || {
            if cancelled.load(Ordering::Acquire) {
                log::debug!("Skipping job queued before cancellation");
                job.cancel();
            } else {
                job.run();
            }
        });
    }

    fn name(&self) -> &'static str {
        "tokio"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Terminate, Termination};
    use tokio::sync::mpsc;

    #[test]
    fn test_current_requires_runtime() {
        assert!(TokioScheduler::current().is_err());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_runs_job_on_blocking_pool() {
        let scheduler = TokioScheduler::current().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();
        scheduler.dispatch(Job::new(
            move || {
                let _ = tx.send(std::thread::current().name().map(str::to_string));
            },
            Terminate::ignore(),
        ));
        assert!(rx.recv().await.is_some());
    }

    #[tokio::test]
    async fn test_cancel_turns_jobs_into_terminations() {
        let scheduler = TokioScheduler::current().unwrap();
        scheduler.cancel();
        assert!(scheduler.is_cancelled());

        let (tx, mut rx) = mpsc::unbounded_channel();
        scheduler.dispatch(Job::new(
            || panic!("cancelled job must not run"),
            Terminate::new(move |t: Termination| {
                let _ = tx.send(t);
            }),
        ));
        assert_eq!(rx.recv().await, Some(Termination::Cancelled));
    }

    #[test]
    fn test_build_runtime() {
        let runtime = TokioScheduler::build_runtime(0).unwrap();
        let scheduler = TokioScheduler::new(runtime.handle().clone());
        assert_eq!(scheduler.name(), "tokio");
    }
}
