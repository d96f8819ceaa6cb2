//! Range relocation between (possibly overlapping) buffer regions.

use core::ptr;

use crate::element::Element;

/// Move `count` elements from `src` into `dst`, leaving the source slots
/// logically destroyed and the destination slots constructed. The ranges may
/// overlap.
///
/// Bitwise-relocatable element types take a single bulk byte move, which
/// handles overlap natively. Other types are moved one at a time: when the
/// destination starts inside the source range the copy runs back to front so
/// that not-yet-moved elements are never overwritten, otherwise front to
/// back.
///
/// # Safety
/// `src..src+count` must contain live elements, `dst..dst+count` must be
/// valid writable slots within the same or another allocation, and the
/// source slots must not be read or dropped afterwards except where they
/// coincide with destination slots.
pub(crate) unsafe fn relocate<T: Element>(dst: *mut T, src: *mut T, count: usize) {
    if T::BITWISE_RELOCATE {
        ptr::copy(src, dst, count);
    } else if dst > src && dst < src.add(count) {
        for idx in (0..count).rev() {
            ptr::write(dst.add(idx), ptr::read(src.add(idx)));
        }
    } else {
        for idx in 0..count {
            ptr::write(dst.add(idx), ptr::read(src.add(idx)));
        }
    }
}
