//! Scheduler contract - decides how and when deferred work actually runs
//!
//! Nodes never block or poll. A node that needs asynchronous scheduling
//! packages its work as a [`Job`] and hands it to the scheduler threaded
//! through `execute`. The scheduler's one obligation is that every job it
//! accepts is eventually either run or cancelled, so that exactly one of
//! the job's continuations fires.

use super::continuation::{Terminate, Termination};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle threaded through every `execute` call
pub type SchedulerHandle = Arc<dyn Scheduler>;

/// Runs or defers jobs submitted by nodes
pub trait Scheduler: Send + Sync + 'static {
    /// Accept a job. It must eventually be run or cancelled.
    fn dispatch(&self, job: Job);

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// A unit of deferred work.
///
/// Running it invokes the node's function and then one of its
/// continuations. Cancelling it reports `Termination::Cancelled` instead.
pub struct Job {
    work: Box<dyn FnOnce() + Send>,
    on_terminate: Terminate,
}

impl Job {
    pub fn new(work: impl FnOnce() + Send + 'static, on_terminate: Terminate) -> Self {
        Self {
            work: Box::new(work),
            on_terminate,
        }
    }

    pub fn run(self) {
        (self.work)()
    }

    pub fn cancel(self) {
        self.on_terminate.call(Termination::Cancelled)
    }
}

impl fmt::Debug for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Job").finish_non_exhaustive()
    }
}

/// Reference scheduler - every job runs inline on the calling thread
/// before `dispatch` returns.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
    pub fn handle() -> SchedulerHandle {
        Arc::new(Self)
    }
}

impl Scheduler for ImmediateScheduler {
    fn dispatch(&self, job: Job) {
        job.run();
    }

    fn name(&self) -> &'static str {
        "immediate"
    }
}

/// Queues jobs until the embedder drains them.
///
/// Useful inside an external event loop, and for choosing the order in
/// which deferred branches complete.
#[derive(Debug, Default)]
pub struct ManualScheduler {
    queue: Mutex<VecDeque<Job>>,
}

impl ManualScheduler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn queue(&self) -> MutexGuard<'_, VecDeque<Job>> {
        // A panicking job never holds the lock, so poisoning carries no
        // broken invariant.
        self.queue.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of queued jobs
    pub fn pending(&self) -> usize {
        self.queue().len()
    }

    pub fn is_idle(&self) -> bool {
        self.queue().is_empty()
    }

    /// Run the oldest queued job. Returns false when the queue was empty.
    pub fn run_next(&self) -> bool {
        let job = self.queue().pop_front();
        match job {
            Some(job) => {
                job.run();
                true
            }
            None => false,
        }
    }

    /// Run jobs, including ones enqueued while running, until none remain.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Take every queued job, leaving the queue empty
    pub fn drain(&self) -> Vec<Job> {
        self.queue().drain(..).collect()
    }

    /// Cancel every queued job
    pub fn cancel_all(&self) -> usize {
        let jobs = self.drain();
        let count = jobs.len();
        for job in jobs {
            job.cancel();
        }
        if count > 0 {
            log::debug!("Cancelled {} queued jobs", count);
        }
        count
    }
}

impl Scheduler for ManualScheduler {
    fn dispatch(&self, job: Job) {
        log::trace!("Queueing job on manual scheduler");
        self.queue().push_back(job);
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_job(counter: &Arc<AtomicUsize>) -> Job {
        let counter = counter.clone();
        Job::new(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            },
            Terminate::ignore(),
        )
    }

    #[test]
    fn test_immediate_runs_inline() {
        let counter = Arc::new(AtomicUsize::new(0));
        ImmediateScheduler.dispatch(counting_job(&counter));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_defers_until_drained() {
        let counter = Arc::new(AtomicUsize::new(0));
        let scheduler = ManualScheduler::new();
        scheduler.dispatch(counting_job(&counter));
        scheduler.dispatch(counting_job(&counter));

        assert_eq!(scheduler.pending(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 0);

        assert_eq!(scheduler.run_until_idle(), 2);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
        assert!(scheduler.is_idle());
        assert!(!scheduler.run_next());
    }

    #[test]
    fn test_cancel_reports_termination() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let scheduler = ManualScheduler::new();
        scheduler.dispatch(Job::new(
            || panic!("cancelled job must not run"),
            Terminate::new(move |t| sink.lock().unwrap().push(t)),
        ));

        assert_eq!(scheduler.cancel_all(), 1);
        assert_eq!(*seen.lock().unwrap(), vec![Termination::Cancelled]);
    }
}
