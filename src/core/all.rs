//! Parallel group - fans one input out to sibling nodes and joins their
//! results in declaration order
//!
//! Each execution allocates a join: a counter initialised to the branch
//! count, one result slot per branch, and the group's continuations. A
//! branch writes only its own slot and then decrements the counter. The
//! decrement that takes the counter to zero belongs to the unique last
//! branch, which builds the aggregate. No lock is taken on that path.

use super::absence::{Datum, Flatten};
use super::continuation::{Complete, Terminate, Termination};
use super::node::{IntoNode, Node};
use super::scheduler::SchedulerHandle;
use super::slot::Slot;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// What a group does when one of its branches terminates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JoinPolicy {
    /// The first termination is reported at once; later arrivals are ignored
    #[default]
    FailFast,
    /// Every branch is awaited, then the first recorded termination is
    /// reported (or the aggregate, if none failed)
    WaitForAll,
}

/// A group of sibling nodes sharing one input type
#[derive(Debug, Clone)]
pub struct All<B> {
    branches: B,
    policy: JoinPolicy,
}

impl<B> All<B> {
    pub fn with_policy(mut self, policy: JoinPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> JoinPolicy {
        self.policy
    }

    pub fn branches(&self) -> &B {
        &self.branches
    }
}

/// Build a group from a tuple of nodes or bare functions.
///
/// The aggregate is a flat tuple of the branches' outputs in declaration
/// order, leaving out branches that produce `Absence`.
pub fn all<I, M, T>(branches: T) -> All<T::Branches>
where
    T: IntoBranches<I, M>,
{
    All {
        branches: branches.into_branches(),
        policy: JoinPolicy::default(),
    }
}

/// Build a group from any number of nodes of one type.
///
/// The aggregate is a `Vec` in declaration order. Use
/// [`boxed`](Node::boxed) to mix different node types.
pub fn all_of<I, M, N, It>(branches: It) -> All<Vec<N::Node>>
where
    It: IntoIterator<Item = N>,
    N: IntoNode<I, M>,
{
    All {
        branches: branches.into_iter().map(|branch| branch.into_node()).collect(),
        policy: JoinPolicy::default(),
    }
}

/// A tuple whose elements can all stand in a graph position taking `I`
pub trait IntoBranches<I, Markers> {
    type Branches;

    fn into_branches(self) -> Self::Branches;
}

struct Join<S, O> {
    remaining: AtomicUsize,
    settled: AtomicBool,
    failure: OnceLock<Termination>,
    slots: S,
    assemble: fn(&S) -> Option<O>,
    on_complete: Slot<Complete<O>>,
    on_terminate: Terminate,
    policy: JoinPolicy,
}

impl<S, O> Join<S, O>
where
    S: Send + Sync + 'static,
    O: Send + 'static,
{
    fn new(
        branches: usize,
        slots: S,
        assemble: fn(&S) -> Option<O>,
        policy: JoinPolicy,
        on_complete: Complete<O>,
        on_terminate: Terminate,
    ) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(branches),
            settled: AtomicBool::new(false),
            failure: OnceLock::new(),
            slots,
            assemble,
            on_complete: Slot::filled(on_complete),
            on_terminate,
            policy,
        })
    }

    /// Continuations for one branch.
    ///
    /// Only the branch's first report counts: `store` runs at most once and
    /// the branch arrives at most once, however often it reports.
    fn branch<T: Send + 'static>(
        self: &Arc<Self>,
        store: impl FnOnce(&Self, T) + Send + 'static,
    ) -> (Complete<T>, Terminate) {
        let reported = Arc::new(AtomicBool::new(false));

        let join = Arc::clone(self);
        let completed = Arc::clone(&reported);
        let on_complete = Complete::new(move |value| {
            if completed.swap(true, Ordering::AcqRel) {
                log::warn!("Group branch completed after it already reported, ignoring");
                return;
            }
            store(&join, value);
            join.arrive();
        });

        let join = Arc::clone(self);
        let on_terminate = Terminate::new(move |reason| {
            if reported.swap(true, Ordering::AcqRel) {
                log::warn!("Group branch reported again, ignoring: {}", reason);
                return;
            }
            join.fail(reason);
        });

        (on_complete, on_terminate)
    }

    /// Record one branch as finished. Its slot must already be written.
    fn arrive(&self) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.settle();
        }
    }

    fn fail(&self, reason: Termination) {
        match self.policy {
            JoinPolicy::FailFast => {
                if !self.settled.swap(true, Ordering::AcqRel) {
                    log::debug!("Group branch terminated, failing fast: {}", reason);
                    self.on_terminate.call(reason);
                }
            }
            JoinPolicy::WaitForAll => {
                // The first recorded failure wins.
                let _ = self.failure.set(reason);
            }
        }
        self.arrive();
    }

    /// Runs once every branch has arrived
    fn settle(&self) {
        if self.settled.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(reason) = self.failure.get() {
            log::debug!("Group joined with a failed branch: {}", reason);
            self.on_terminate.call(reason.clone());
            return;
        }

        // SAFETY: winning `settled` makes this the only reader of the
        // continuation, and the AcqRel decrement chain orders every slot
        // write before this point.
        let Some(on_complete) = (unsafe { self.on_complete.take() }) else {
            return;
        };
        match (self.assemble)(&self.slots) {
            Some(aggregate) => on_complete.call(aggregate),
            None => self.on_terminate.call(Termination::Protocol(
                "a group branch arrived without storing its result".to_string(),
            )),
        }
    }
}

impl<I, N> Node<I> for All<Vec<N>>
where
    I: Clone + Send + 'static,
    N: Node<I>,
    N::Output: Datum,
{
    type Output = Vec<N::Output>;

    fn execute(
        &self,
        scheduler: &SchedulerHandle,
        input: I,
        on_complete: Complete<Vec<N::Output>>,
        on_terminate: Terminate,
    ) {
        if self.branches.is_empty() {
            on_complete.call(Vec::new());
            return;
        }

        let slots: Vec<Slot<N::Output>> = self.branches.iter().map(|_| Slot::empty()).collect();
        let join = Join::new(
            self.branches.len(),
            slots,
            |slots| {
                let mut aggregate = Vec::with_capacity(slots.len());
                for slot in slots {
                    // SAFETY: called by the last branch only.
                    let value = unsafe { slot.take() }?;
                    aggregate.extend(value.present());
                }
                Some(aggregate)
            },
            self.policy,
            on_complete,
            on_terminate,
        );

        for (index, branch) in self.branches.iter().enumerate() {
            let (on_complete, on_terminate) = join.branch(move |join, value| {
                // SAFETY: branch `index` stores once, into slot `index` only.
                unsafe { join.slots[index].put(value) }
            });
            branch.execute(scheduler, input.clone(), on_complete, on_terminate);
        }
    }

    fn async_requirement_count(&self) -> usize {
        self.branches
            .iter()
            .map(|branch| branch.async_requirement_count())
            .sum()
    }
}

macro_rules! cons_outputs {
    ($input:ident;) => { () };
    ($input:ident; $head:ident $(, $tail:ident)*) => {
        <<$head as Node<$input>>::Output as Datum>::Cons<cons_outputs!($input; $($tail),*)>
    };
}

macro_rules! cons_values {
    ($slots:ident;) => { () };
    ($slots:ident; $head:tt $(, $tail:tt)*) => {
        Datum::cons($slots.$head.take()?, cons_values!($slots; $($tail),*))
    };
}

macro_rules! tuple_group {
    ($count:expr; $($branch:ident $marker:ident $idx:tt),+) => {
        impl<I, $($branch, $marker),+> IntoBranches<I, ($($marker,)+)> for ($($branch,)+)
        where
            $($branch: IntoNode<I, $marker>),+
        {
            type Branches = ($(<$branch as IntoNode<I, $marker>>::Node,)+);

            fn into_branches(self) -> Self::Branches {
                ($(self.$idx.into_node(),)+)
            }
        }

        impl<I, $($branch),+> Node<I> for All<($($branch,)+)>
        where
            I: Clone + Send + 'static,
            $($branch: Node<I>, <$branch as Node<I>>::Output: Datum,)+
            cons_outputs!(I; $($branch),+): Flatten,
        {
            type Output = <cons_outputs!(I; $($branch),+) as Flatten>::Flat;

            fn execute(
                &self,
                scheduler: &SchedulerHandle,
                input: I,
                on_complete: Complete<Self::Output>,
                on_terminate: Terminate,
            ) {
                let join = Join::new(
                    $count,
                    ($(Slot::< <$branch as Node<I>>::Output >::empty(),)+),
                    |slots| {
                        // SAFETY: called by the last branch only.
                        let list = unsafe { cons_values!(slots; $($idx),+) };
                        Some(list.flatten())
                    },
                    self.policy,
                    on_complete,
                    on_terminate,
                );

                $(
                    let (on_complete, on_terminate) = join.branch(move |join, value| {
                        // SAFETY: this branch stores once, into its own slot only.
                        unsafe { join.slots.$idx.put(value) }
                    });
                    self.branches
                        .$idx
                        .execute(scheduler, input.clone(), on_complete, on_terminate);
                )+
            }

            fn async_requirement_count(&self) -> usize {
                0 $(+ self.branches.$idx.async_requirement_count())+
            }
        }
    };
}

tuple_group!(1; A MA 0);
tuple_group!(2; A MA 0, B MB 1);
tuple_group!(3; A MA 0, B MB 1, C MC 2);
tuple_group!(4; A MA 0, B MB 1, C MC 2, D MD 3);
tuple_group!(5; A MA 0, B MB 1, C MC 2, D MD 3, E ME 4);
tuple_group!(6; A MA 0, B MB 1, C MC 2, D MD 3, E ME 4, F MF 5);
tuple_group!(7; A MA 0, B MB 1, C MC 2, D MD 3, E ME 4, F MF 5, G MG 6);
tuple_group!(8; A MA 0, B MB 1, C MC 2, D MD 3, E ME 4, F MF 5, G MG 6, H MH 7);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::scheduler::{ImmediateScheduler, ManualScheduler};
    use crate::core::{deferred, leaf, try_leaf, Absence};
    use std::sync::Mutex;

    #[derive(Debug, PartialEq)]
    enum Outcome<T> {
        Completed(T),
        Terminated(Termination),
    }

    fn recorder<T: Send + 'static>() -> (Arc<Mutex<Vec<Outcome<T>>>>, Complete<T>, Terminate) {
        let events = Arc::new(Mutex::new(Vec::new()));
        let on_done = events.clone();
        let on_fail = events.clone();
        (
            events,
            Complete::new(move |v: T| on_done.lock().unwrap().push(Outcome::Completed(v))),
            Terminate::new(move |t: Termination| {
                on_fail.lock().unwrap().push(Outcome::Terminated(t))
            }),
        )
    }

    /// Terminates twice
    struct Stutter;

    impl Node<i32> for Stutter {
        type Output = i32;

        fn execute(&self, _: &SchedulerHandle, _: i32, _: Complete<i32>, on_terminate: Terminate) {
            on_terminate.call(Termination::Failed("first".to_string()));
            on_terminate.call(Termination::Failed("second".to_string()));
        }
    }

    /// Completes and then terminates
    struct Overeager;

    impl Node<i32> for Overeager {
        type Output = i32;

        fn execute(
            &self,
            _: &SchedulerHandle,
            input: i32,
            on_complete: Complete<i32>,
            on_terminate: Terminate,
        ) {
            on_complete.call(input);
            on_terminate.call(Termination::Failed("too late".to_string()));
        }
    }

    #[test]
    fn test_group_aggregates_in_order() {
        let group = all((|x: i32| x * 2, |x: i32| -x));
        assert_eq!(group.call(3), Ok((6, -3)));
    }

    #[test]
    fn test_group_drops_absent_branches() {
        let group = all((
            |x: i32| x + 1,
            |_: i32| Absence,
            |x: i32| x.to_string(),
            |_: i32| (),
        ));
        assert_eq!(group.call(9), Ok((10, "9".to_string())));
    }

    #[test]
    fn test_all_absent_group_yields_unit() {
        let group = all((|_: u8| Absence, |_: u8| ()));
        assert_eq!(group.call(0), Ok(()));
    }

    #[test]
    fn test_order_independent_of_completion() {
        let scheduler = ManualScheduler::new();
        let handle: SchedulerHandle = scheduler.clone();
        let group = all((deferred(|x: i32| x * 2), deferred(|x: i32| -x)));
        let (events, complete, terminate) = recorder();

        group.execute(&handle, 3, complete, terminate);
        let mut jobs = scheduler.drain();
        jobs.reverse();
        for job in jobs {
            job.run();
        }

        assert_eq!(*events.lock().unwrap(), vec![Outcome::Completed((6, -3))]);
    }

    #[test]
    fn test_fail_fast_reports_first_termination() {
        let scheduler = ManualScheduler::new();
        let handle: SchedulerHandle = scheduler.clone();
        let group = all((
            deferred(|x: i32| x),
            deferred(|x: i32| x).then(try_leaf(|_: i32| Err::<i32, _>("middle failed"))),
            deferred(|x: i32| x),
        ));
        let (events, complete, terminate) = recorder();

        group.execute(&handle, 1, complete, terminate);
        let mut jobs = scheduler.drain();
        let middle = jobs.remove(1);
        for job in jobs {
            job.run();
        }
        assert!(events.lock().unwrap().is_empty());
        middle.run();

        assert_eq!(
            *events.lock().unwrap(),
            vec![Outcome::Terminated(Termination::Failed("middle failed".to_string()))]
        );
    }

    #[test]
    fn test_fail_fast_ignores_later_arrivals() {
        let scheduler = ManualScheduler::new();
        let handle: SchedulerHandle = scheduler.clone();
        let group = all((
            try_leaf(|_: i32| Err::<i32, _>("first")),
            deferred(|x: i32| x),
        ));
        let (events, complete, terminate) = recorder();

        group.execute(&handle, 1, complete, terminate);
        assert_eq!(events.lock().unwrap().len(), 1);
        scheduler.run_until_idle();

        assert_eq!(
            *events.lock().unwrap(),
            vec![Outcome::Terminated(Termination::Failed("first".to_string()))]
        );
    }

    #[test]
    fn test_wait_for_all_reports_after_every_branch() {
        let scheduler = ManualScheduler::new();
        let handle: SchedulerHandle = scheduler.clone();
        let group = all((
            deferred(|x: i32| x).then(try_leaf(|_: i32| Err::<i32, _>("early"))),
            deferred(|x: i32| x),
            deferred(|x: i32| x).then(try_leaf(|_: i32| Err::<i32, _>("late"))),
        ))
        .with_policy(JoinPolicy::WaitForAll);
        let (events, complete, terminate) = recorder();

        group.execute(&handle, 1, complete, terminate);
        assert!(scheduler.run_next());
        assert!(events.lock().unwrap().is_empty());
        assert!(scheduler.run_next());
        assert!(events.lock().unwrap().is_empty());
        assert!(scheduler.run_next());

        assert_eq!(
            *events.lock().unwrap(),
            vec![Outcome::Terminated(Termination::Failed("early".to_string()))]
        );
    }

    #[test]
    fn test_vec_group() {
        let group = all_of(vec![
            leaf(|x: i32| x + 1).boxed(),
            leaf(|x: i32| x * 10).boxed(),
            deferred(|x: i32| x - 1).boxed(),
        ]);
        assert_eq!(group.call(4), Ok(vec![5, 40, 3]));
        assert_eq!(group.async_requirement_count(), 1);
    }

    #[test]
    fn test_empty_vec_group_completes() {
        let group = all_of(Vec::<Box<dyn Node<i32, Output = i32>>>::new());
        let (events, complete, terminate) = recorder();
        group.execute(&ImmediateScheduler::handle(), 0, complete, terminate);
        assert_eq!(*events.lock().unwrap(), vec![Outcome::Completed(Vec::new())]);
    }

    #[test]
    fn test_group_can_run_again() {
        let group = all((|x: i32| x, |x: i32| x * x));
        assert_eq!(group.call(2), Ok((2, 4)));
        assert_eq!(group.call(5), Ok((5, 25)));
    }

    #[test]
    fn test_async_requirements_sum() {
        let group = all((deferred(|x: i32| x), leaf(|x: i32| x), deferred(|x: i32| x)));
        assert_eq!(group.async_requirement_count(), 2);
    }

    #[test]
    fn test_repeated_terminations_count_once() {
        for policy in [JoinPolicy::FailFast, JoinPolicy::WaitForAll] {
            let scheduler = ManualScheduler::new();
            let handle: SchedulerHandle = scheduler.clone();
            let group = all((Stutter, deferred(|x: i32| x), deferred(|x: i32| x)))
                .with_policy(policy);
            let (events, complete, terminate) = recorder();

            group.execute(&handle, 1, complete, terminate);
            assert_eq!(scheduler.pending(), 2);
            if policy == JoinPolicy::WaitForAll {
                assert!(events.lock().unwrap().is_empty());
            }
            scheduler.run_until_idle();

            assert_eq!(
                *events.lock().unwrap(),
                vec![Outcome::Terminated(Termination::Failed("first".to_string()))]
            );
        }
    }

    #[test]
    fn test_termination_after_completion_is_ignored() {
        for policy in [JoinPolicy::FailFast, JoinPolicy::WaitForAll] {
            let scheduler = ManualScheduler::new();
            let handle: SchedulerHandle = scheduler.clone();
            let group = all((Overeager, deferred(|x: i32| x * 2))).with_policy(policy);
            let (events, complete, terminate) = recorder();

            group.execute(&handle, 4, complete, terminate);
            assert!(events.lock().unwrap().is_empty());
            assert!(scheduler.run_next());

            assert_eq!(*events.lock().unwrap(), vec![Outcome::Completed((4, 8))]);
        }
    }
}
