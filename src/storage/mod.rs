//! Memory resources and the shared storage handle.

use core::alloc::Layout;
use core::fmt;
use core::ptr::NonNull;

use alloc::alloc::{alloc as raw_alloc, dealloc as raw_dealloc};
use alloc::rc::Rc;

use const_default::ConstDefault;

use crate::error::StorageError;

#[cfg(feature = "allocator-api2")]
mod adapt;
mod monotonic;
#[cfg(feature = "zeroize")]
mod zero;

#[cfg(feature = "allocator-api2")]
pub use self::adapt::AllocResource;
pub use self::monotonic::MonotonicResource;
#[cfg(feature = "zeroize")]
pub use self::zero::ZeroizingResource;

/// A pluggable source of raw memory.
///
/// Resources are held behind a [`StoragePtr`] and compared by identity: two
/// handles are interchangeable only when they refer to the same resource
/// instance.
pub trait MemoryResource: fmt::Debug {
    /// Attempt to allocate a region of memory with the given layout.
    fn try_alloc(&self, layout: Layout) -> Result<NonNull<[u8]>, StorageError>;

    /// Release an allocation previously obtained from `try_alloc`.
    ///
    /// # Safety
    /// `ptr` must have been returned by `try_alloc` on this same resource
    /// with this same `layout`, and must not be released twice.
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout);

    /// Whether objects backed by this resource must be torn down
    /// individually.
    ///
    /// Arena-style resources which reclaim their memory wholesale may return
    /// `false`, in which case buffer teardown skips both the element drops
    /// and the allocation release. Only appropriate when the elements
    /// allocate exclusively from this resource.
    #[inline]
    fn needs_release(&self) -> bool {
        true
    }
}

/// The global allocator as a memory resource.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Global;

impl MemoryResource for Global {
    #[inline]
    fn try_alloc(&self, layout: Layout) -> Result<NonNull<[u8]>, StorageError> {
        let ptr = if layout.size() == 0 {
            // FIXME: use Layout::dangling when stabilized
            unsafe { NonNull::new_unchecked(layout.align() as *mut u8) }
        } else {
            let Some(ptr) = NonNull::new(unsafe { raw_alloc(layout) }) else {
                return Err(StorageError::AllocError);
            };
            ptr
        };
        Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
    }

    #[inline]
    unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        if layout.size() > 0 {
            raw_dealloc(ptr.as_ptr(), layout);
        }
    }
}

/// A cheaply clonable, identity-comparable handle to a memory resource.
///
/// The default handle refers to the global allocator and carries no
/// reference count. Handles created with [`StoragePtr::new`] share ownership
/// of their resource; the resource lives as long as its longest-lived
/// handle.
#[derive(Clone)]
pub struct StoragePtr(Handle);

#[derive(Clone)]
enum Handle {
    Global,
    Shared(Rc<dyn MemoryResource>),
}

impl StoragePtr {
    /// The handle for the global allocator.
    pub const fn global() -> Self {
        Self(Handle::Global)
    }

    /// Create a shared handle owning `resource`.
    pub fn new<R: MemoryResource + 'static>(resource: R) -> Self {
        Self(Handle::Shared(Rc::new(resource)))
    }

    /// Whether two handles refer to the same resource instance.
    pub fn same_resource(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Handle::Global, Handle::Global) => true,
            (Handle::Shared(a), Handle::Shared(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Attempt to allocate a region of memory with the given layout.
    #[inline]
    pub fn try_alloc(&self, layout: Layout) -> Result<NonNull<[u8]>, StorageError> {
        match &self.0 {
            Handle::Global => Global.try_alloc(layout),
            Handle::Shared(res) => res.try_alloc(layout),
        }
    }

    /// Release an allocation previously obtained from `try_alloc`.
    ///
    /// # Safety
    /// See [`MemoryResource::release`].
    #[inline]
    pub unsafe fn release(&self, ptr: NonNull<u8>, layout: Layout) {
        match &self.0 {
            Handle::Global => Global.release(ptr, layout),
            Handle::Shared(res) => res.release(ptr, layout),
        }
    }

    /// Whether objects backed by this resource require individual teardown.
    #[inline]
    pub fn needs_release(&self) -> bool {
        match &self.0 {
            Handle::Global => true,
            Handle::Shared(res) => res.needs_release(),
        }
    }
}

impl Default for StoragePtr {
    #[inline]
    fn default() -> Self {
        Self::global()
    }
}

impl ConstDefault for StoragePtr {
    const DEFAULT: Self = Self::global();
}

impl fmt::Debug for StoragePtr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Handle::Global => f.debug_tuple("StoragePtr").field(&Global).finish(),
            Handle::Shared(res) => f.debug_tuple("StoragePtr").field(res).finish(),
        }
    }
}
