//! Write-once result slot shared between concurrently completing branches

use std::cell::UnsafeCell;

/// A cell written by exactly one party and read by exactly one party,
/// with the hand-off ordered by an external atomic (the join counter).
pub(crate) struct Slot<T>(UnsafeCell<Option<T>>);

// SAFETY: access is serialized by the join protocol. The single writer
// publishes with a Release decrement, the single reader takes after an
// Acquire observation of that decrement.
unsafe impl<T: Send> Sync for Slot<T> {}

impl<T> Slot<T> {
    pub(crate) fn empty() -> Self {
        Self(UnsafeCell::new(None))
    }

    pub(crate) fn filled(value: T) -> Self {
        Self(UnsafeCell::new(Some(value)))
    }

    /// # Safety
    /// The caller must be the slot's only writer, and no reader may run
    /// until the write has been published through the join counter.
    pub(crate) unsafe fn put(&self, value: T) {
        *self.0.get() = Some(value);
    }

    /// # Safety
    /// The caller must be the slot's only reader and must have observed
    /// every write to it through an Acquire load or read-modify-write.
    pub(crate) unsafe fn take(&self) -> Option<T> {
        (*self.0.get()).take()
    }
}
