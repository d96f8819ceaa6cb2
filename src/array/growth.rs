//! Capacity growth policy.

use core::mem::size_of;

/// Smallest non-zero allocation, in elements. Chosen to amortize repeated
/// growth while a sequence is populated incrementally, e.g. during parsing.
pub(crate) const MIN_CAPACITY: usize = 16;

/// The largest representable element count for `T`.
pub(crate) const fn max_capacity<T>() -> usize {
    if size_of::<T>() == 0 {
        usize::MAX
    } else {
        (isize::MAX as usize) / size_of::<T>()
    }
}

/// Compute the capacity to request when `required` elements must fit.
///
/// A fresh buffer is sized exactly to the request (the minimum floor is
/// applied at allocation time). An existing buffer prefers to double,
/// clamping to the maximum element count when doubling would exceed it.
pub(crate) fn next_capacity<T>(current: usize, required: usize) -> usize {
    if current == 0 {
        return required;
    }
    let max = max_capacity::<T>();
    match current.checked_mul(2) {
        Some(hint) if hint <= max => required.max(hint),
        _ => max,
    }
}
