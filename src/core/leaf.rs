//! Leaf nodes - each wraps exactly one user function

use super::absence::Absence;
use super::continuation::{Complete, Terminate, Termination};
use super::node::Node;
use super::scheduler::{Job, SchedulerHandle};
use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// The atomic unit of work: applies its function inline and completes.
///
/// A leaf never terminates. Failure has to travel as a value, or through
/// [`Fallible`].
#[derive(Clone, Copy)]
pub struct Leaf<F> {
    func: F,
}

impl<F> Leaf<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> fmt::Debug for Leaf<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Leaf").finish_non_exhaustive()
    }
}

/// Wrap a function in a [`Leaf`]
pub fn leaf<F>(func: F) -> Leaf<F> {
    Leaf::new(func)
}

impl<I, O, F> Node<I> for Leaf<F>
where
    F: Fn(I) -> O + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn execute(
        &self,
        _scheduler: &SchedulerHandle,
        input: I,
        on_complete: Complete<O>,
        _on_terminate: Terminate,
    ) {
        on_complete.call((self.func)(input))
    }
}

/// The bootstrap node: applicable only to `Absence`, which it forwards.
///
/// Starts a chain that has no real input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Noop;

/// Ready-made [`Noop`]
pub const NOOP: Noop = Noop;

impl Node<Absence> for Noop {
    type Output = Absence;

    fn execute(
        &self,
        _scheduler: &SchedulerHandle,
        _input: Absence,
        on_complete: Complete<Absence>,
        _on_terminate: Terminate,
    ) {
        on_complete.call(Absence)
    }
}

/// A leaf whose function may fail. `Err` terminates instead of completing.
#[derive(Clone, Copy)]
pub struct Fallible<F> {
    func: F,
}

impl<F> fmt::Debug for Fallible<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallible").finish_non_exhaustive()
    }
}

/// Wrap a `Result`-returning function in a [`Fallible`] node
pub fn try_leaf<F>(func: F) -> Fallible<F> {
    Fallible { func }
}

impl<I, O, E, F> Node<I> for Fallible<F>
where
    F: Fn(I) -> Result<O, E> + Send + Sync + 'static,
    O: Send + 'static,
    E: fmt::Display,
{
    type Output = O;

    fn execute(
        &self,
        _scheduler: &SchedulerHandle,
        input: I,
        on_complete: Complete<O>,
        on_terminate: Terminate,
    ) {
        match (self.func)(input) {
            Ok(value) => on_complete.call(value),
            Err(e) => on_terminate.call(Termination::Failed(e.to_string())),
        }
    }
}

/// A leaf that requires asynchronous scheduling.
///
/// Its function runs wherever the scheduler puts the job. A panic inside
/// the function is caught and reported as `Termination::Panicked`, so the
/// caller is never left without a continuation.
pub struct Deferred<F> {
    func: Arc<F>,
}

impl<F> Clone for Deferred<F> {
    fn clone(&self) -> Self {
        Self {
            func: Arc::clone(&self.func),
        }
    }
}

impl<F> fmt::Debug for Deferred<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred").finish_non_exhaustive()
    }
}

/// Wrap a function in a [`Deferred`] node
pub fn deferred<F>(func: F) -> Deferred<F> {
    Deferred {
        func: Arc::new(func),
    }
}

impl<I, O, F> Node<I> for Deferred<F>
where
    I: Send + 'static,
    F: Fn(I) -> O + Send + Sync + 'static,
    O: Send + 'static,
{
    type Output = O;

    fn execute(
        &self,
        scheduler: &SchedulerHandle,
        input: I,
        on_complete: Complete<O>,
        on_terminate: Terminate,
    ) {
        let func = Arc::clone(&self.func);
        let report = on_terminate.clone();
        let job = Job::new(
            move || match panic::catch_unwind(AssertUnwindSafe(|| (*func)(input))) {
                Ok(value) => on_complete.call(value),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    log::error!("Deferred node panicked: {}", message);
                    report.call(Termination::Panicked(message));
                }
            },
            on_terminate,
        );
        log::trace!("Dispatching deferred node to {} scheduler", scheduler.name());
        scheduler.dispatch(job);
    }

    fn async_requirement_count(&self) -> usize {
        1
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
