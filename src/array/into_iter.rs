//! Owning iterator over an array's elements.

use core::iter::FusedIterator;
use core::ops::Range;
use core::ptr;
use core::slice;

use crate::element::Element;
use crate::storage::StoragePtr;

use super::buffer::ArrayBuffer;

/// An iterator that moves elements out of an [`Array`](crate::Array).
///
/// Remaining elements are dropped with the iterator, and the buffer is
/// released against the handle the array was built with. As with dropping
/// the array itself, both are skipped when the resource reports that
/// teardown is unnecessary.
#[derive(Debug)]
pub struct IntoIter<T: Element> {
    remain: Range<usize>,
    buf: ArrayBuffer<T>,
    store: StoragePtr,
}

impl<T: Element> IntoIter<T> {
    pub(super) fn new(mut buf: ArrayBuffer<T>, store: StoragePtr) -> Self {
        let end = buf.length();
        if end > 0 {
            // live elements are tracked by `remain` from here on
            unsafe { buf.set_length(0) };
        }
        Self {
            remain: Range { start: 0, end },
            buf,
            store,
        }
    }

    /// The remaining elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        unsafe {
            slice::from_raw_parts(self.buf.data_ptr().add(self.remain.start), self.len())
        }
    }

    /// The number of remaining elements.
    pub fn len(&self) -> usize {
        self.remain.end - self.remain.start
    }

    /// Whether any elements remain.
    pub fn is_empty(&self) -> bool {
        self.remain.is_empty()
    }

    fn clear(&mut self) {
        let remain = self.len();
        if remain > 0 {
            unsafe {
                let head = self.buf.data_ptr_mut().add(self.remain.start);
                ptr::drop_in_place(ptr::slice_from_raw_parts_mut(head, remain));
            }
            self.remain.start = self.remain.end;
        }
    }
}

impl<T: Element> AsRef<[T]> for IntoIter<T> {
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> Iterator for IntoIter<T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let index = self.remain.start;
        if index != self.remain.end {
            self.remain.start = index + 1;
            Some(unsafe { ptr::read(self.buf.data_ptr().add(index)) })
        } else {
            None
        }
    }

    #[inline]
    fn count(self) -> usize {
        self.len()
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.len();
        (len, Some(len))
    }
}

impl<T: Element> DoubleEndedIterator for IntoIter<T> {
    #[inline]
    fn next_back(&mut self) -> Option<T> {
        let mut index = self.remain.end;
        if index != self.remain.start {
            index -= 1;
            self.remain.end = index;
            Some(unsafe { ptr::read(self.buf.data_ptr().add(index)) })
        } else {
            None
        }
    }
}

impl<T: Element> ExactSizeIterator for IntoIter<T> {}

impl<T: Element> FusedIterator for IntoIter<T> {}

impl<T: Element> Drop for IntoIter<T> {
    fn drop(&mut self) {
        if self.store.needs_release() {
            self.clear();
        }
        self.buf.destroy(&self.store);
    }
}
