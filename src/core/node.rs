//! Node protocol - the capability shared by every composable unit
//!
//! Applicability is answered by the trait system: a node type `N` accepts
//! input `I` exactly when `N: Node<I>`, and produces `<N as Node<I>>::Output`.
//! Composing incompatible nodes is therefore a compile error, never a
//! runtime fault.

use super::continuation::{Complete, Terminate, Termination};
use super::leaf::Leaf;
use super::scheduler::SchedulerHandle;
use super::seq::Sequence;

/// A composable unit of computation
pub trait Node<I>: Send + Sync + 'static {
    type Output: Send + 'static;

    /// Run the node on `input`.
    ///
    /// Exactly one of `on_complete` / `on_terminate` fires, exactly once,
    /// either before this returns or later from a deferring scheduler.
    fn execute(
        &self,
        scheduler: &SchedulerHandle,
        input: I,
        on_complete: Complete<Self::Output>,
        on_terminate: Terminate,
    );

    /// How many constituent leaves need asynchronous scheduling
    fn async_requirement_count(&self) -> usize {
        0
    }

    /// Chain `next` after this node. `next` may be a node or a bare function.
    fn then<N, M>(self, next: N) -> Sequence<Self, N::Node>
    where
        Self: Sized,
        N: IntoNode<Self::Output, M>,
    {
        Sequence::new(self, next.into_node())
    }

    /// Erase the node's concrete type
    fn boxed(self) -> BoxedNode<I, Self::Output>
    where
        Self: Sized,
    {
        Box::new(self)
    }

    /// Run synchronously on the immediate scheduler
    fn call(&self, input: I) -> Result<Self::Output, Termination>
    where
        Self: Sized,
    {
        crate::invoke::call(self, input)
    }
}

/// A type-erased node
pub type BoxedNode<I, O> = Box<dyn Node<I, Output = O>>;

impl<I: 'static, O: Send + 'static> Node<I> for BoxedNode<I, O> {
    type Output = O;

    fn execute(
        &self,
        scheduler: &SchedulerHandle,
        input: I,
        on_complete: Complete<O>,
        on_terminate: Terminate,
    ) {
        (**self).execute(scheduler, input, on_complete, on_terminate)
    }

    fn async_requirement_count(&self) -> usize {
        (**self).async_requirement_count()
    }
}

/// Marker selecting the identity conversion of [`IntoNode`]
pub struct AsNode;

/// Marker selecting the function-wrapping conversion of [`IntoNode`]
pub struct AsFn;

/// Anything that can stand in a graph position taking `I`: a node, or a
/// bare function that gets wrapped in a [`Leaf`].
pub trait IntoNode<I, Marker> {
    type Node: Node<I>;

    fn into_node(self) -> Self::Node;
}

impl<I, N: Node<I>> IntoNode<I, AsNode> for N {
    type Node = N;

    fn into_node(self) -> N {
        self
    }
}

impl<I, O, F> IntoNode<I, AsFn> for F
where
    F: Fn(I) -> O + Send + Sync + 'static,
    O: Send + 'static,
{
    type Node = Leaf<F>;

    fn into_node(self) -> Leaf<F> {
        Leaf::new(self)
    }
}
