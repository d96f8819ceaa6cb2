//! The owned buffer descriptor backing an array.

use core::alloc::Layout;
use core::mem;
use core::ptr::{self, NonNull};
use core::slice;

use crate::error::StorageError;
use crate::storage::StoragePtr;

use super::growth::{max_capacity, MIN_CAPACITY};

#[inline]
fn array_layout<T>(count: usize) -> Result<Layout, StorageError> {
    Layout::array::<T>(count).map_err(StorageError::LayoutError)
}

/// One contiguous allocation: base pointer, live element count, slot count.
///
/// Elements at `[0, length)` are live; slots `[length, capacity)` are
/// uninitialized storage. The descriptor never owns the resource handle: the
/// handle used to allocate a buffer must be the one passed to `destroy`.
#[derive(Debug)]
pub(crate) struct ArrayBuffer<T> {
    data: NonNull<T>,
    length: usize,
    capacity: usize,
}

impl<T> ArrayBuffer<T> {
    /// An empty descriptor with no allocation.
    pub const fn new() -> Self {
        Self {
            data: NonNull::dangling(),
            length: 0,
            capacity: 0,
        }
    }

    /// Allocate a fresh buffer of at least `capacity` slots from `store`.
    ///
    /// Unless `exact` is set, the request is raised to the minimum floor to
    /// amortize repeated growth during incremental population.
    pub fn try_allocate(
        capacity: usize,
        store: &StoragePtr,
        exact: bool,
    ) -> Result<Self, StorageError> {
        if capacity == 0 {
            return Ok(Self::new());
        }
        if capacity > max_capacity::<T>() {
            return Err(StorageError::CapacityLimit);
        }
        let capacity = if exact {
            capacity
        } else {
            capacity.max(MIN_CAPACITY).min(max_capacity::<T>())
        };
        let ptr = store.try_alloc(array_layout::<T>(capacity)?)?;
        Ok(Self {
            data: ptr.cast(),
            length: 0,
            capacity,
        })
    }

    /// Tear down the buffer against `store`, resetting to the empty state.
    ///
    /// When the resource reports that teardown is unnecessary, both the
    /// element drops and the allocation release are skipped. Idempotent and
    /// never fails.
    pub fn destroy(&mut self, store: &StoragePtr) {
        if self.capacity > 0 && store.needs_release() {
            let mut idx = self.length;
            while idx > 0 {
                idx -= 1;
                unsafe { ptr::drop_in_place(self.data.as_ptr().add(idx)) };
            }
            let layout = array_layout::<T>(self.capacity).expect("error calculating layout");
            unsafe { store.release(self.data.cast(), layout) };
        }
        self.data = NonNull::dangling();
        self.length = 0;
        self.capacity = 0;
    }

    /// Detach the buffer, leaving this descriptor empty. No element touches.
    #[inline]
    pub fn take(&mut self) -> Self {
        mem::replace(self, Self::new())
    }

    /// Exchange two buffers. No element touches.
    #[inline]
    pub fn swap(&mut self, other: &mut Self) {
        mem::swap(self, other);
    }

    #[inline]
    pub fn length(&self) -> usize {
        self.length
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    pub fn data_ptr(&self) -> *const T {
        self.data.as_ptr()
    }

    #[inline]
    pub fn data_ptr_mut(&mut self) -> *mut T {
        self.data.as_ptr()
    }

    /// Set the live element count.
    ///
    /// # Safety
    /// `length` must not exceed the capacity, and elements `[0, length)`
    /// must be live once the caller's mutation completes.
    #[inline]
    pub unsafe fn set_length(&mut self, length: usize) {
        debug_assert!(length <= self.capacity);
        self.length = length;
    }

    /// Append a constructed element without checking capacity.
    ///
    /// # Safety
    /// The buffer must have a free slot.
    #[inline]
    pub unsafe fn push_unchecked(&mut self, value: T) {
        debug_assert!(self.length < self.capacity);
        ptr::write(self.data.as_ptr().add(self.length), value);
        self.length += 1;
    }

    #[inline]
    pub fn as_slice(&self) -> &[T] {
        unsafe { slice::from_raw_parts(self.data.as_ptr(), self.length) }
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        unsafe { slice::from_raw_parts_mut(self.data.as_ptr(), self.length) }
    }
}
