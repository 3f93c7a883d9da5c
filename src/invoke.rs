//! Invocation helpers - turn the continuation protocol into a return value
//!
//! `execute` reports through callbacks. These helpers wire both callbacks
//! into a channel and wait on it in the way that fits the caller.

use crate::core::{
    Absence, Complete, ImmediateScheduler, Node, SchedulerHandle, Terminate, Termination,
};
use std::sync::mpsc;

type Outcome<T> = Result<T, Termination>;

fn continuations<T: Send + 'static>(tx: mpsc::Sender<Outcome<T>>) -> (Complete<T>, Terminate) {
    let failed = tx.clone();
    (
        Complete::new(move |value| {
            let _ = tx.send(Ok(value));
        }),
        Terminate::new(move |reason| {
            let _ = failed.send(Err(reason));
        }),
    )
}

/// Run `node` on the immediate scheduler and return its outcome.
///
/// Everything runs on the calling thread, so the outcome is known as soon as
/// `execute` returns. A node that returns without firing either continuation
/// yields `Termination::Abandoned`.
pub fn call<I, N: Node<I>>(node: &N, input: I) -> Outcome<N::Output> {
    let scheduler = ImmediateScheduler::handle();
    let (tx, rx) = mpsc::channel();
    let (on_complete, on_terminate) = continuations(tx);
    node.execute(&scheduler, input, on_complete, on_terminate);

    let outcome = match rx.try_recv() {
        Ok(outcome) => outcome,
        Err(_) => {
            log::warn!("Node returned without completing or terminating");
            return Err(Termination::Abandoned);
        }
    };
    if rx.try_recv().is_ok() {
        log::warn!("Node fired more than one continuation, keeping the first");
    }
    outcome
}

/// Run `node` on `scheduler` and block the current thread until it reports.
///
/// Must not be called from a thread the scheduler itself needs to make
/// progress, such as an async worker of the same runtime.
pub fn call_blocking<I, N: Node<I>>(
    node: &N,
    scheduler: &SchedulerHandle,
    input: I,
) -> Outcome<N::Output> {
    let (tx, rx) = mpsc::channel();
    let (on_complete, on_terminate) = continuations(tx);
    log::debug!("Running node on {} scheduler", scheduler.name());
    node.execute(scheduler, input, on_complete, on_terminate);

    // Every sender gone without a message means the work was dropped.
    rx.recv().unwrap_or(Err(Termination::Abandoned))
}

/// Run `node` on `scheduler` and await its outcome
pub async fn call_async<I, N: Node<I>>(
    node: &N,
    scheduler: &SchedulerHandle,
    input: I,
) -> Outcome<N::Output> {
    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let failed = tx.clone();
    log::debug!("Running node on {} scheduler", scheduler.name());
    node.execute(
        scheduler,
        input,
        Complete::new(move |value| {
            let _ = tx.send(Ok(value));
        }),
        Terminate::new(move |reason| {
            let _ = failed.send(Err(reason));
        }),
    );

    rx.recv().await.unwrap_or(Err(Termination::Abandoned))
}

/// Run a graph that starts from nothing
pub trait Run: Node<Absence> + Sized {
    fn run(&self) -> Outcome<Self::Output> {
        call(self, Absence)
    }
}

impl<N: Node<Absence>> Run for N {}
