//! Sequential composition - a producer chained into a consumer

use super::continuation::{Complete, Terminate};
use super::node::Node;
use super::scheduler::SchedulerHandle;
use std::fmt;
use std::sync::Arc;

/// Feeds the producer's output into the consumer.
///
/// The consumer sits behind an `Arc` only so that a completion arriving
/// from a deferring scheduler can still reach it. The tree keeps a single
/// owner per node.
pub struct Sequence<P, C> {
    producer: P,
    consumer: Arc<C>,
}

impl<P, C> Sequence<P, C> {
    pub fn new(producer: P, consumer: C) -> Self {
        Self {
            producer,
            consumer: Arc::new(consumer),
        }
    }

    pub fn producer(&self) -> &P {
        &self.producer
    }

    pub fn consumer(&self) -> &C {
        &self.consumer
    }
}

/// Deep clone: the copy owns its own consumer subtree.
impl<P: Clone, C: Clone> Clone for Sequence<P, C> {
    fn clone(&self) -> Self {
        Self {
            producer: self.producer.clone(),
            consumer: Arc::new(C::clone(&self.consumer)),
        }
    }
}

impl<P: fmt::Debug, C: fmt::Debug> fmt::Debug for Sequence<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sequence")
            .field("producer", &self.producer)
            .field("consumer", &self.consumer)
            .finish()
    }
}

impl<I, P, C> Node<I> for Sequence<P, C>
where
    P: Node<I>,
    C: Node<P::Output>,
{
    type Output = C::Output;

    fn execute(
        &self,
        scheduler: &SchedulerHandle,
        input: I,
        on_complete: Complete<C::Output>,
        on_terminate: Terminate,
    ) {
        let consumer = Arc::clone(&self.consumer);
        let scheduler_for_consumer = Arc::clone(scheduler);
        let forward = on_terminate.clone();
        self.producer.execute(
            scheduler,
            input,
            Complete::new(move |intermediate| {
                consumer.execute(&scheduler_for_consumer, intermediate, on_complete, forward)
            }),
            on_terminate,
        );
    }

    fn async_requirement_count(&self) -> usize {
        self.producer.async_requirement_count() + self.consumer.async_requirement_count()
    }
}
