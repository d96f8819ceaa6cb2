//! A bump resource which releases nothing until it is dropped.

use core::alloc::Layout;
use core::cell::RefCell;
use core::ptr::NonNull;

use alloc::vec::Vec;

use crate::error::StorageError;

use super::{Global, MemoryResource};

const INITIAL_CHUNK: usize = 1024;
const MAX_CHUNK: usize = 64 * 1024;

/// A memory resource which hands out regions of larger chunks and reclaims
/// everything at once when dropped.
///
/// Individual releases are no-ops and [`needs_release`] reports `false`, so
/// containers backed by this resource skip per-element teardown entirely.
/// Intended for build-once data such as a freshly parsed document.
///
/// [`needs_release`]: MemoryResource::needs_release
#[derive(Debug, Default)]
pub struct MonotonicResource {
    state: RefCell<Bump>,
}

#[derive(Debug)]
struct Bump {
    chunks: Vec<(NonNull<u8>, Layout)>,
    head: *mut u8,
    remain: usize,
    next_size: usize,
}

impl Default for Bump {
    fn default() -> Self {
        Self {
            chunks: Vec::new(),
            head: core::ptr::null_mut(),
            remain: 0,
            next_size: INITIAL_CHUNK,
        }
    }
}

impl MonotonicResource {
    /// Create a resource with no memory reserved yet.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Bump {
    fn allocate(&mut self, layout: Layout) -> Result<NonNull<[u8]>, StorageError> {
        let offset = self.head.align_offset(layout.align());
        if offset <= self.remain && layout.size() <= self.remain - offset {
            let ptr = unsafe { self.head.add(offset) };
            self.head = unsafe { ptr.add(layout.size()) };
            self.remain -= offset + layout.size();
            let ptr = unsafe { NonNull::new_unchecked(ptr) };
            return Ok(NonNull::slice_from_raw_parts(ptr, layout.size()));
        }
        let size = self.next_size.max(layout.size());
        let chunk_layout =
            Layout::from_size_align(size, layout.align()).map_err(StorageError::LayoutError)?;
        let chunk = Global.try_alloc(chunk_layout)?;
        self.chunks.push((chunk.cast(), chunk_layout));
        self.head = unsafe { chunk.cast::<u8>().as_ptr().add(layout.size()) };
        self.remain = size - layout.size();
        self.next_size = (size * 2).min(MAX_CHUNK);
        Ok(NonNull::slice_from_raw_parts(chunk.cast(), layout.size()))
    }
}

impl MemoryResource for MonotonicResource {
    fn try_alloc(&self, layout: Layout) -> Result<NonNull<[u8]>, StorageError> {
        if layout.size() == 0 {
            return Global.try_alloc(layout);
        }
        self.state.borrow_mut().allocate(layout)
    }

    // memory is reclaimed wholesale when the resource is dropped
    #[inline]
    unsafe fn release(&self, _ptr: NonNull<u8>, _layout: Layout) {}

    #[inline]
    fn needs_release(&self) -> bool {
        false
    }
}

impl Drop for MonotonicResource {
    fn drop(&mut self) {
        for (ptr, layout) in self.state.get_mut().chunks.drain(..) {
            unsafe { Global.release(ptr, layout) };
        }
    }
}
