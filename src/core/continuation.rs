//! Continuations - how a node reports back to whoever executed it
//!
//! Every `execute` call hands the node two continuations. Exactly one of
//! them fires, exactly once: `Complete` with the produced value, or
//! `Terminate` with the reason no value could be produced.

use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Why an execution ended without a value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Termination {
    /// A fallible node returned an error
    #[error("node failed: {0}")]
    Failed(String),

    /// A deferred node's function panicked on a worker
    #[error("node panicked: {0}")]
    Panicked(String),

    /// The scheduler cancelled the work before it ran
    #[error("execution cancelled by scheduler")]
    Cancelled,

    /// The work was dropped without reaching either continuation
    #[error("execution ended without reaching a continuation")]
    Abandoned,

    /// A node broke the continuation protocol
    #[error("continuation protocol violated: {0}")]
    Protocol(String),
}

/// Completion continuation, consumed when called
pub struct Complete<T>(Box<dyn FnOnce(T) + Send>);

impl<T: 'static> Complete<T> {
    pub fn new(f: impl FnOnce(T) + Send + 'static) -> Self {
        Self(Box::new(f))
    }

    /// A continuation that drops whatever it receives
    pub fn discard() -> Self {
        Self::new(|_| {})
    }

    /// Hand the produced value onward
    pub fn call(self, value: T) {
        (self.0)(value)
    }
}

impl<T> fmt::Debug for Complete<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Complete(..)")
    }
}

/// Termination continuation.
///
/// Cloned into every link of a chain and forwarded unchanged, so a failure
/// deep inside a graph reaches the original caller directly.
#[derive(Clone)]
pub struct Terminate(Arc<dyn Fn(Termination) + Send + Sync>);

impl Terminate {
    pub fn new(f: impl Fn(Termination) + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    /// A continuation that ignores terminations
    pub fn ignore() -> Self {
        Self::new(|_| {})
    }

    pub fn call(&self, reason: Termination) {
        (self.0)(reason)
    }
}

impl fmt::Debug for Terminate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Terminate(..)")
    }
}
