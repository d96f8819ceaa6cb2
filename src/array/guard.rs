//! Scope guards implementing the rollback protocol for multi-step mutations.
//!
//! Each guard supervises one kind of fallible mutation. A guard that is
//! dropped without being committed restores the container to (or leaves it
//! in) the valid state observable before the mutation began.

use core::mem::{self, ManuallyDrop};
use core::ptr;

use crate::element::Element;
use crate::error::StorageError;
use crate::storage::StoragePtr;

use super::buffer::ArrayBuffer;
use super::relocate::relocate;

/// All-or-nothing population of a buffer that has not been published yet.
///
/// Used by the fill and copy constructors: elements are pushed one at a
/// time, and an early return tears down the partially built buffer.
pub(crate) struct BuildGuard<'s, T: Element> {
    buf: ArrayBuffer<T>,
    store: &'s StoragePtr,
}

impl<'s, T: Element> BuildGuard<'s, T> {
    pub fn with_capacity(capacity: usize, store: &'s StoragePtr) -> Result<Self, StorageError> {
        Ok(Self {
            buf: ArrayBuffer::try_allocate(capacity, store, false)?,
            store,
        })
    }

    /// Append one constructed element. Capacity was reserved up front.
    #[inline]
    pub fn push(&mut self, value: T) {
        unsafe { self.buf.push_unchecked(value) };
    }

    /// Publish the fully built buffer.
    pub fn finish(self) -> ArrayBuffer<T> {
        let mut me = ManuallyDrop::new(self);
        me.buf.take()
    }
}

impl<T: Element> Drop for BuildGuard<'_, T> {
    fn drop(&mut self) {
        self.buf.destroy(self.store);
    }
}

/// Detaches a container's live buffer for the duration of an assignment.
///
/// The new contents are built from scratch into the (now empty) slot. On
/// commit the detached prior buffer is destroyed; if the assignment fails
/// partway, the partial contents are discarded and the prior buffer is
/// restored, leaving the container unchanged.
pub(crate) struct ReplaceGuard<'a, T: Element> {
    slot: &'a mut ArrayBuffer<T>,
    prior: ArrayBuffer<T>,
    store: &'a StoragePtr,
}

impl<'a, T: Element> ReplaceGuard<'a, T> {
    pub fn new(slot: &'a mut ArrayBuffer<T>, store: &'a StoragePtr) -> Self {
        let prior = slot.take();
        Self { slot, prior, store }
    }

    #[inline]
    pub fn slot(&mut self) -> &mut ArrayBuffer<T> {
        self.slot
    }

    /// Keep the new contents and tear down the detached prior buffer.
    pub fn commit(self) {
        let mut me = ManuallyDrop::new(self);
        let store = me.store;
        let mut prior = me.prior.take();
        prior.destroy(store);
    }
}

impl<T: Element> Drop for ReplaceGuard<'_, T> {
    fn drop(&mut self) {
        self.slot.destroy(self.store);
        *self.slot = self.prior.take();
    }
}

/// Opens a gap of `count` uninitialized slots at `index` and supervises
/// filling it.
///
/// While the guard is live the gap is counted in the buffer length even
/// though its slots are uninitialized; this is the only place that
/// invariant is suspended. On rollback the filled prefix of the gap is
/// dropped, the shifted tail is relocated back, and the length is restored.
pub(crate) struct InsertGuard<'a, T: Element> {
    buf: &'a mut ArrayBuffer<T>,
    index: usize,
    count: usize,
    filled: usize,
    tail: usize,
}

impl<'a, T: Element> InsertGuard<'a, T> {
    /// Shift the tail `[index, length)` rightward by `count` slots.
    ///
    /// Capacity for `length + count` must already be reserved, and
    /// `index <= length`.
    pub fn open(buf: &'a mut ArrayBuffer<T>, index: usize, count: usize) -> Self {
        let length = buf.length();
        debug_assert!(index <= length);
        debug_assert!(length + count <= buf.capacity());
        let tail = length - index;
        if tail > 0 {
            unsafe {
                let head = buf.data_ptr_mut().add(index);
                relocate(head.add(count), head, tail);
            }
        }
        unsafe { buf.set_length(length + count) };
        Self {
            buf,
            index,
            count,
            filled: 0,
            tail,
        }
    }

    /// Construct the next element of the gap.
    #[inline]
    pub fn push(&mut self, value: T) {
        debug_assert!(self.filled < self.count);
        unsafe { ptr::write(self.buf.data_ptr_mut().add(self.index + self.filled), value) };
        self.filled += 1;
    }

    /// Mark the insertion complete. The gap must be fully filled.
    pub fn commit(self) {
        debug_assert_eq!(self.filled, self.count);
        mem::forget(self);
    }
}

impl<T: Element> Drop for InsertGuard<'_, T> {
    fn drop(&mut self) {
        unsafe {
            let head = self.buf.data_ptr_mut().add(self.index);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(head, self.filled));
            if self.tail > 0 {
                relocate(head, head.add(self.count), self.tail);
            }
            self.buf.set_length(self.index + self.tail);
        }
    }
}
