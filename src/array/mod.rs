//! The JSON array sequence container.

use core::borrow::{Borrow, BorrowMut};
use core::fmt;
use core::mem::ManuallyDrop;
use core::ops::{Bound, Deref, DerefMut, Range, RangeBounds};
use core::ptr;
use core::slice;

use const_default::ConstDefault;

use crate::element::Element;
use crate::error::{InsertError, StorageError};
use crate::storage::StoragePtr;

use self::buffer::ArrayBuffer;
use self::growth::{max_capacity, next_capacity, MIN_CAPACITY};
use self::guard::{BuildGuard, InsertGuard, ReplaceGuard};
use self::relocate::relocate;

pub use self::into_iter::IntoIter;

pub(crate) mod buffer;

mod growth;
mod guard;
mod into_iter;
mod relocate;

#[cold]
#[inline(never)]
fn index_panic() -> ! {
    panic!("Invalid element index");
}

#[inline]
fn bounds_to_range(range: impl RangeBounds<usize>, length: usize) -> Range<usize> {
    let start = match range.start_bound() {
        Bound::Unbounded => 0,
        Bound::Included(i) => *i,
        Bound::Excluded(i) => match i.checked_add(1) {
            Some(i) => i,
            None => index_panic(),
        },
    };
    let end = match range.end_bound() {
        Bound::Unbounded => length,
        Bound::Included(i) => match i.checked_add(1) {
            Some(i) => i,
            None => index_panic(),
        },
        Bound::Excluded(i) => *i,
    };
    Range { start, end }
}

/// A growable sequence of JSON value elements backed by a pluggable memory
/// resource.
///
/// The container owns exactly one buffer and a [`StoragePtr`] handle; the
/// handle used to allocate the buffer is the one used to tear it down.
/// Fallible operations exist as `try_xxx` returning a `Result`, each with a
/// panicking convenience wrapper, and uphold the strong guarantee: on
/// failure the observable size and contents are unchanged.
pub struct Array<T: Element> {
    buf: ArrayBuffer<T>,
    store: StoragePtr,
}

impl<T: Element> Array<T> {
    /// Constructs a new, empty array using the global resource.
    ///
    /// The array does not allocate until elements are inserted.
    pub const fn new() -> Self {
        Self {
            buf: ArrayBuffer::new(),
            store: StoragePtr::global(),
        }
    }

    /// Constructs a new, empty array using the given resource handle.
    pub const fn new_in(store: StoragePtr) -> Self {
        Self {
            buf: ArrayBuffer::new(),
            store,
        }
    }

    /// Constructs an empty array with room for `capacity` elements.
    pub fn with_capacity(capacity: usize) -> Self {
        match Self::try_with_capacity_in(capacity, StoragePtr::global()) {
            Ok(res) => res,
            Err(error) => error.panic(),
        }
    }

    /// Constructs an empty array with room for `capacity` elements,
    /// allocated from `store`.
    pub fn with_capacity_in(capacity: usize, store: StoragePtr) -> Self {
        match Self::try_with_capacity_in(capacity, store) {
            Ok(res) => res,
            Err(error) => error.panic(),
        }
    }

    /// Fallible form of [`with_capacity_in`](Self::with_capacity_in).
    pub fn try_with_capacity_in(capacity: usize, store: StoragePtr) -> Result<Self, StorageError> {
        Ok(Self {
            buf: ArrayBuffer::try_allocate(capacity, &store, false)?,
            store,
        })
    }

    /// Constructs an array of `count` copies of `value`.
    pub fn from_fill(count: usize, value: &T) -> Self {
        match Self::try_from_fill_in(count, value, StoragePtr::global()) {
            Ok(res) => res,
            Err(error) => error.panic(),
        }
    }

    /// Constructs an array of `count` copies of `value`, allocated from
    /// `store`. All-or-nothing: a failed copy tears down the partial buffer.
    pub fn try_from_fill_in(
        count: usize,
        value: &T,
        store: StoragePtr,
    ) -> Result<Self, StorageError> {
        let mut guard = BuildGuard::with_capacity(count, &store)?;
        for _ in 0..count {
            guard.push(value.try_clone_in(&store)?);
        }
        Ok(Self {
            buf: guard.finish(),
            store,
        })
    }

    /// Constructs an array by copying the elements of a slice.
    pub fn from_slice(data: &[T]) -> Self {
        match Self::try_from_slice_in(data, StoragePtr::global()) {
            Ok(res) => res,
            Err(error) => error.panic(),
        }
    }

    /// Constructs an array by copying the elements of a slice into a buffer
    /// allocated from `store`.
    pub fn try_from_slice_in(data: &[T], store: StoragePtr) -> Result<Self, StorageError> {
        let mut guard = BuildGuard::with_capacity(data.len(), &store)?;
        for item in data {
            guard.push(item.try_clone_in(&store)?);
        }
        Ok(Self {
            buf: guard.finish(),
            store,
        })
    }

    /// Copy this array into a buffer allocated from `store`.
    ///
    /// Buffers are never shared or reinterpreted across resources: the copy
    /// is element by element even when the contents are identical.
    pub fn try_clone_in(&self, store: StoragePtr) -> Result<Self, StorageError> {
        Self::try_from_slice_in(self.as_slice(), store)
    }

    /// Move `other` into an array bound to `store`.
    ///
    /// When both handles refer to the same resource this is a pointer steal;
    /// otherwise the elements are copied into a fresh buffer from `store`
    /// and the source is destroyed.
    pub fn try_move_in(mut other: Self, store: StoragePtr) -> Result<Self, StorageError> {
        if other.store.same_resource(&store) {
            other.store = store;
            return Ok(other);
        }
        Self::try_from_slice_in(other.as_slice(), store)
    }

    /// The resource handle this array allocates from.
    #[inline]
    pub fn storage(&self) -> &StoragePtr {
        &self.store
    }

    /// The number of live elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.length()
    }

    /// Whether the array holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.length() == 0
    }

    /// The number of elements the current buffer can hold.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// The live elements as a slice.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        self.buf.as_slice()
    }

    /// The live elements as a mutable slice.
    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.buf.as_mut_slice()
    }

    /// Ensures capacity for `additional` more elements, reallocating per the
    /// growth policy if needed. Panics on failure.
    #[inline]
    pub fn reserve(&mut self, additional: usize) {
        match self.try_reserve(additional) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Ensures capacity for `additional` more elements.
    ///
    /// Reallocation invalidates all element pointers. On failure the array
    /// is unchanged.
    pub fn try_reserve(&mut self, additional: usize) -> Result<(), StorageError> {
        let length = self.buf.length();
        let Some(required) = length.checked_add(additional) else {
            return Err(StorageError::CapacityLimit);
        };
        if required <= self.buf.capacity() {
            return Ok(());
        }
        if required > max_capacity::<T>() {
            return Err(StorageError::CapacityLimit);
        }
        let target = next_capacity::<T>(self.buf.capacity(), required);
        self.reallocate(target, false)
    }

    /// Replace the buffer with one of `capacity` slots, relocating the
    /// elements into it.
    fn reallocate(&mut self, capacity: usize, exact: bool) -> Result<(), StorageError> {
        let mut next = ArrayBuffer::try_allocate(capacity, &self.store, exact)?;
        let length = self.buf.length();
        unsafe {
            relocate(next.data_ptr_mut(), self.buf.data_ptr_mut(), length);
            self.buf.set_length(0);
            next.set_length(length);
        }
        // the old buffer holds no live elements now; only memory is released
        self.buf.destroy(&self.store);
        self.buf = next;
        Ok(())
    }

    /// Reallocate to an exactly-sized buffer when the spare capacity is
    /// worth reclaiming.
    ///
    /// An optimization only: allocation failure is a silent no-op and the
    /// array is left unchanged.
    pub fn shrink_to_fit(&mut self) {
        let length = self.buf.length();
        let capacity = self.buf.capacity();
        if capacity == length {
            return;
        }
        if length == 0 {
            self.buf.destroy(&self.store);
            return;
        }
        // not worth reallocating to save a slot or two on a tiny buffer
        if capacity <= MIN_CAPACITY && capacity - length < 3 {
            return;
        }
        let _ = self.reallocate(length, true);
    }

    /// Inserts `count` copies of `value` at `index`, returning the inserted
    /// range. Panics on failure.
    pub fn insert_fill(&mut self, index: usize, count: usize, value: &T) -> &mut [T] {
        match self.try_insert_fill(index, count, value) {
            Ok(res) => res,
            Err(error) => error.panic(),
        }
    }

    /// Inserts `count` copies of `value` at `index`.
    ///
    /// Strong guarantee: if reservation or any element copy fails, the
    /// previously shifted tail is relocated back and the array is unchanged.
    /// Returns the freshly inserted range.
    pub fn try_insert_fill(
        &mut self,
        index: usize,
        count: usize,
        value: &T,
    ) -> Result<&mut [T], StorageError> {
        if index > self.buf.length() {
            index_panic();
        }
        self.try_reserve(count)?;
        let Self { buf, store } = self;
        let mut guard = InsertGuard::open(buf, index, count);
        for _ in 0..count {
            guard.push(value.try_clone_in(store)?);
        }
        guard.commit();
        Ok(&mut self.as_mut_slice()[index..index + count])
    }

    /// Inserts copies of the elements of `values` at `index`, returning the
    /// inserted range. Panics on failure.
    pub fn insert_slice(&mut self, index: usize, values: &[T]) -> &mut [T] {
        match self.try_insert_slice(index, values) {
            Ok(res) => res,
            Err(error) => error.panic(),
        }
    }

    /// Inserts copies of the elements of `values` at `index`, with the same
    /// guarantee as [`try_insert_fill`](Self::try_insert_fill).
    pub fn try_insert_slice(
        &mut self,
        index: usize,
        values: &[T],
    ) -> Result<&mut [T], StorageError> {
        if index > self.buf.length() {
            index_panic();
        }
        self.try_reserve(values.len())?;
        let Self { buf, store } = self;
        let mut guard = InsertGuard::open(buf, index, values.len());
        for item in values {
            guard.push(item.try_clone_in(store)?);
        }
        guard.commit();
        Ok(&mut self.as_mut_slice()[index..index + values.len()])
    }

    /// Inserts `value` at `index`. Panics on failure.
    pub fn insert(&mut self, index: usize, value: T) {
        match self.try_insert(index, value) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Inserts `value` at `index`, handing it back if no room could be made.
    pub fn try_insert(&mut self, index: usize, value: T) -> Result<(), InsertError<T>> {
        if index > self.buf.length() {
            index_panic();
        }
        if let Err(error) = self.try_reserve(1) {
            return Err(InsertError::new(error, value));
        }
        let mut guard = InsertGuard::open(&mut self.buf, index, 1);
        guard.push(value);
        guard.commit();
        Ok(())
    }

    /// Appends `value`. Panics on failure.
    pub fn push(&mut self, value: T) {
        match self.try_push(value) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Appends `value`, handing it back if no room could be made.
    pub fn try_push(&mut self, value: T) -> Result<(), InsertError<T>> {
        if let Err(error) = self.try_reserve(1) {
            return Err(InsertError::new(error, value));
        }
        unsafe { self.buf.push_unchecked(value) };
        Ok(())
    }

    /// Removes and returns the last element. Never fails.
    pub fn pop(&mut self) -> Option<T> {
        let length = self.buf.length();
        if length == 0 {
            return None;
        }
        unsafe {
            self.buf.set_length(length - 1);
            Some(ptr::read(self.buf.data_ptr().add(length - 1)))
        }
    }

    /// Removes and returns the element at `index`, relocating the tail to
    /// close the gap. Never fails; panics if `index` is out of bounds.
    pub fn remove(&mut self, index: usize) -> T {
        let length = self.buf.length();
        if index >= length {
            index_panic();
        }
        unsafe {
            let head = self.buf.data_ptr_mut().add(index);
            let value = ptr::read(head);
            relocate(head, head.add(1), length - index - 1);
            self.buf.set_length(length - 1);
            value
        }
    }

    /// Destroys the elements in `range` and relocates the tail leftward to
    /// close the gap. Never fails; panics on an invalid range.
    pub fn erase_range<R: RangeBounds<usize>>(&mut self, range: R) {
        let length = self.buf.length();
        let Range { start, end } = bounds_to_range(range, length);
        if start > end || end > length {
            index_panic();
        }
        let remove = end - start;
        if remove == 0 {
            return;
        }
        unsafe {
            let head = self.buf.data_ptr_mut().add(start);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(head, remove));
            relocate(head, head.add(remove), length - end);
            self.buf.set_length(length - remove);
        }
    }

    /// Shortens the array to `length` elements, destroying the excess.
    /// Never fails.
    pub fn truncate(&mut self, length: usize) {
        let old_len = self.buf.length();
        if length >= old_len {
            return;
        }
        unsafe {
            self.buf.set_length(length);
            ptr::drop_in_place(ptr::slice_from_raw_parts_mut(
                self.buf.data_ptr_mut().add(length),
                old_len - length,
            ));
        }
    }

    /// Destroys all elements, keeping the buffer. Never fails.
    #[inline]
    pub fn clear(&mut self) {
        self.truncate(0);
    }

    /// Resizes to `new_len` elements, filling with the null element.
    /// Panics on failure.
    pub fn resize(&mut self, new_len: usize) {
        match self.try_resize(new_len) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Resizes to `new_len` elements, filling with the null element.
    ///
    /// Shrinking truncates and cannot fail; growing may fail on the
    /// capacity reservation, leaving the array unchanged.
    pub fn try_resize(&mut self, new_len: usize) -> Result<(), StorageError> {
        let length = self.buf.length();
        if new_len <= length {
            self.truncate(new_len);
            return Ok(());
        }
        self.try_reserve(new_len - length)?;
        let Self { buf, store } = self;
        let mut guard = InsertGuard::open(buf, length, new_len - length);
        for _ in length..new_len {
            guard.push(T::null_in(store));
        }
        guard.commit();
        Ok(())
    }

    /// Resizes to `new_len` elements, filling with copies of `value`.
    /// Panics on failure.
    pub fn resize_fill(&mut self, new_len: usize, value: &T) {
        match self.try_resize_fill(new_len, value) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Resizes to `new_len` elements, filling with copies of `value`.
    ///
    /// If a copy fails partway through the growth, the fully constructed
    /// new elements are destroyed and the prior length is restored before
    /// the error propagates.
    pub fn try_resize_fill(&mut self, new_len: usize, value: &T) -> Result<(), StorageError> {
        let length = self.buf.length();
        if new_len <= length {
            self.truncate(new_len);
            return Ok(());
        }
        self.try_reserve(new_len - length)?;
        let Self { buf, store } = self;
        let mut guard = InsertGuard::open(buf, length, new_len - length);
        for _ in length..new_len {
            guard.push(value.try_clone_in(store)?);
        }
        guard.commit();
        Ok(())
    }

    /// Replaces the contents with copies of the elements of `data`.
    ///
    /// Strong guarantee: on failure the prior contents are restored.
    pub fn try_assign_slice(&mut self, data: &[T]) -> Result<(), StorageError> {
        let Self { buf, store } = self;
        let mut guard = ReplaceGuard::new(buf, store);
        if !data.is_empty() {
            *guard.slot() = ArrayBuffer::try_allocate(data.len(), store, false)?;
            for item in data {
                let value = item.try_clone_in(store)?;
                unsafe { guard.slot().push_unchecked(value) };
            }
        }
        guard.commit();
        Ok(())
    }

    /// Replaces the contents with `count` copies of `value`, with the same
    /// guarantee as [`try_assign_slice`](Self::try_assign_slice).
    pub fn try_assign_fill(&mut self, count: usize, value: &T) -> Result<(), StorageError> {
        let Self { buf, store } = self;
        let mut guard = ReplaceGuard::new(buf, store);
        if count > 0 {
            *guard.slot() = ArrayBuffer::try_allocate(count, store, false)?;
            for _ in 0..count {
                let value = value.try_clone_in(store)?;
                unsafe { guard.slot().push_unchecked(value) };
            }
        }
        guard.commit();
        Ok(())
    }

    /// Exchanges the contents of two arrays. Panics on failure.
    pub fn swap(&mut self, other: &mut Self) {
        match self.try_swap(other) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }

    /// Exchanges the contents of two arrays.
    ///
    /// When both arrays share the same resource identity this is a buffer
    /// pointer exchange and cannot fail. Otherwise each side's contents are
    /// rebuilt in a buffer from the other's resource; both temporaries are
    /// constructed before either array is touched, so a failure leaves both
    /// unchanged. Each array stays bound to its original resource.
    pub fn try_swap(&mut self, other: &mut Self) -> Result<(), StorageError> {
        if self.store.same_resource(&other.store) {
            self.buf.swap(&mut other.buf);
            return Ok(());
        }
        let mine = Self::try_from_slice_in(other.as_slice(), self.store.clone())?;
        let theirs = Self::try_from_slice_in(self.as_slice(), other.store.clone())?;
        *self = mine;
        *other = theirs;
        Ok(())
    }

    /// Destroys all elements and the buffer, returning the resource handle.
    pub fn into_storage(self) -> StoragePtr {
        let mut me = ManuallyDrop::new(self);
        // the original handle is never dropped, so the read is not a double free
        let store = unsafe { ptr::read(&me.store) };
        me.buf.destroy(&store);
        store
    }
}

impl<T: Element> Drop for Array<T> {
    fn drop(&mut self) {
        self.buf.destroy(&self.store);
    }
}

impl<T: Element> Default for Array<T> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> ConstDefault for Array<T> {
    const DEFAULT: Self = Self::new();
}

impl<T: Element> Clone for Array<T> {
    fn clone(&self) -> Self {
        match self.try_clone_in(self.store.clone()) {
            Ok(res) => res,
            Err(error) => error.panic(),
        }
    }

    fn clone_from(&mut self, source: &Self) {
        match self.try_assign_slice(source.as_slice()) {
            Ok(_) => (),
            Err(error) => error.panic(),
        }
    }
}

impl<T: Element + fmt::Debug> fmt::Debug for Array<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.as_slice().fmt(f)
    }
}

impl<T: Element> Deref for Array<T> {
    type Target = [T];

    #[inline]
    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> DerefMut for Array<T> {
    #[inline]
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Element> AsRef<[T]> for Array<T> {
    #[inline]
    fn as_ref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> AsMut<[T]> for Array<T> {
    #[inline]
    fn as_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T: Element> Borrow<[T]> for Array<T> {
    #[inline]
    fn borrow(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Element> BorrowMut<[T]> for Array<T> {
    #[inline]
    fn borrow_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<T1, T2> PartialEq<Array<T2>> for Array<T1>
where
    T1: Element + PartialEq<T2>,
    T2: Element,
{
    #[inline]
    fn eq(&self, other: &Array<T2>) -> bool {
        self.as_slice().eq(other.as_slice())
    }
}

impl<T: Element + Eq> Eq for Array<T> {}

impl<T1, T2> PartialEq<&[T2]> for Array<T1>
where
    T1: Element + PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &&[T2]) -> bool {
        self.as_slice().eq(*other)
    }
}

impl<T1, T2> PartialEq<[T2]> for Array<T1>
where
    T1: Element + PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &[T2]) -> bool {
        self.as_slice().eq(other)
    }
}

impl<T1, T2, const N: usize> PartialEq<[T2; N]> for Array<T1>
where
    T1: Element + PartialEq<T2>,
{
    #[inline]
    fn eq(&self, other: &[T2; N]) -> bool {
        self.as_slice().eq(&other[..])
    }
}

impl<T: Element> Extend<T> for Array<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        let iter = iter.into_iter();
        let (min_cap, _) = iter.size_hint();
        self.reserve(min_cap);
        for value in iter {
            self.push(value);
        }
    }
}

impl<T: Element> FromIterator<T> for Array<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut array = Self::new();
        array.extend(iter);
        array
    }
}

impl<T: Element> IntoIterator for Array<T> {
    type Item = T;
    type IntoIter = IntoIter<T>;

    fn into_iter(self) -> IntoIter<T> {
        let me = ManuallyDrop::new(self);
        let (buf, store) = unsafe { (ptr::read(&me.buf), ptr::read(&me.store)) };
        IntoIter::new(buf, store)
    }
}

impl<'a, T: Element> IntoIterator for &'a Array<T> {
    type Item = &'a T;
    type IntoIter = slice::Iter<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<'a, T: Element> IntoIterator for &'a mut Array<T> {
    type Item = &'a mut T;
    type IntoIter = slice::IterMut<'a, T>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.as_mut_slice().iter_mut()
    }
}
