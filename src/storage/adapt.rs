//! Adapter for `allocator-api2` allocators.

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

use allocator_api2::alloc::Allocator;

use crate::error::StorageError;

use super::MemoryResource;

/// Adapts any [`Allocator`] into a [`MemoryResource`].
#[derive(Debug, Default, Clone, Copy)]
pub struct AllocResource<A>(pub A);

impl<A: Allocator + fmt::Debug> MemoryResource for AllocResource<A> {
    #[inline]
    fn try_alloc(&self, layout: Layout) -> Result<NonNull<[u8]>, StorageError> {
        self.0.allocate(layout).map_err(|_| StorageError::AllocError)
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        self.0.deallocate(ptr, layout)
    }
}
