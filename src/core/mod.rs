//! Core engine - node protocol, leaf/sequence/group nodes, scheduling

mod absence;
mod all;
mod continuation;
mod executor;
mod leaf;
mod node;
mod oracle;
mod scheduler;
mod seq;
mod slot;

pub use absence::{Absence, Datum, Flatten};
pub use all::{all, all_of, All, IntoBranches, JoinPolicy};
pub use continuation::{Complete, Terminate, Termination};
pub use executor::TokioScheduler;
pub use leaf::{deferred, leaf, try_leaf, Deferred, Fallible, Leaf, Noop, NOOP};
pub use node::{AsFn, AsNode, BoxedNode, IntoNode, Node};
pub use oracle::{is_applicable, produces_value, ResultOf};
pub use scheduler::{ImmediateScheduler, Job, ManualScheduler, Scheduler, SchedulerHandle};
pub use seq::Sequence;
