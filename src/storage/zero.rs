//! Zeroizing resource wrapper.

use core::alloc::Layout;
use core::ptr::NonNull;
use core::slice;

use zeroize::Zeroize;

use crate::error::StorageError;

use super::MemoryResource;

/// A resource wrapper which wipes released memory before delegating to the
/// inner resource.
#[derive(Debug, Default, Clone, Copy)]
pub struct ZeroizingResource<R>(pub R);

impl<R: MemoryResource> MemoryResource for ZeroizingResource<R> {
    #[inline]
    fn try_alloc(&self, layout: Layout) -> Result<NonNull<[u8]>, StorageError> {
        self.0.try_alloc(layout)
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() > 0 {
            let mem = slice::from_raw_parts_mut(ptr.as_ptr(), layout.size());
            mem.zeroize();
        }
        self.0.release(ptr, layout)
    }

    // the inner resource may not need releases, but wiping does
    #[inline]
    fn needs_release(&self) -> bool {
        true
    }
}
