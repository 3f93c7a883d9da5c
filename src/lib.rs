//! Daggr - composable task graphs with continuation-passing execution
//!
//! Graphs are built from leaves (one function each), sequences (output of
//! one node feeds the next) and parallel groups (one input fanned out to
//! siblings, results joined in declaration order). Type compatibility is
//! checked when the graph is built; a graph that compiles is well-typed.
//!
//! ```
//! use daggr::{all, deferred, leaf, Node};
//!
//! let graph = leaf(|x: i32| x + 1)
//!     .then(all((deferred(|x: i32| x * 2), |x: i32| -x)))
//!     .then(|(double, negated): (i32, i32)| format!("{} {}", double, negated));
//!
//! assert_eq!(graph.call(2), Ok("6 -3".to_string()));
//! ```

pub mod config;
pub mod core;
pub mod invoke;

// Re-exports
pub use config::{Config, SchedulerKind};
pub use core::{
    all, all_of, deferred, is_applicable, leaf, produces_value, try_leaf, Absence, All, BoxedNode,
    Complete, Datum, Deferred, Fallible, ImmediateScheduler, IntoNode, Job, JoinPolicy, Leaf,
    ManualScheduler, Node, Noop, ResultOf, Scheduler, SchedulerHandle, Sequence, Terminate,
    Termination, TokioScheduler, NOOP,
};
pub use invoke::{call, call_async, call_blocking, Run};

/// Result type alias
pub type Result<T> = anyhow::Result<T>;
