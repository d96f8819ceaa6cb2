use std::cell::Cell;
use std::rc::Rc;

use rstest::rstest;

use json_array::{
    Array, Element, Global, MemoryResource, MonotonicResource, StorageError, StoragePtr,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Num(i64);

impl Element for Num {
    fn null_in(_store: &StoragePtr) -> Self {
        Self(0)
    }

    fn try_clone_in(&self, _store: &StoragePtr) -> Result<Self, StorageError> {
        Ok(*self)
    }
}

/// Counts destructor runs through a shared cell.
#[derive(Debug)]
struct Tracked {
    value: i64,
    drops: Rc<Cell<usize>>,
}

impl Tracked {
    fn new(value: i64, drops: &Rc<Cell<usize>>) -> Self {
        Self {
            value,
            drops: drops.clone(),
        }
    }
}

impl Element for Tracked {
    fn null_in(_store: &StoragePtr) -> Self {
        panic!("not constructible as null");
    }

    fn try_clone_in(&self, _store: &StoragePtr) -> Result<Self, StorageError> {
        Ok(Self {
            value: self.value,
            drops: self.drops.clone(),
        })
    }
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.set(self.drops.get() + 1);
    }
}

/// Fails to clone once the shared budget runs out.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Flaky {
    value: i64,
    budget: Rc<Cell<usize>>,
}

impl Flaky {
    fn new(value: i64, budget: &Rc<Cell<usize>>) -> Self {
        Self {
            value,
            budget: budget.clone(),
        }
    }
}

impl Element for Flaky {
    fn null_in(_store: &StoragePtr) -> Self {
        panic!("not constructible as null");
    }

    fn try_clone_in(&self, _store: &StoragePtr) -> Result<Self, StorageError> {
        let remain = self.budget.get();
        if remain == 0 {
            return Err(StorageError::AllocError);
        }
        self.budget.set(remain - 1);
        Ok(self.clone())
    }
}

/// An element type that opts out of bulk byte relocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NoBulk(i64);

impl Element for NoBulk {
    const BITWISE_RELOCATE: bool = false;

    fn null_in(_store: &StoragePtr) -> Self {
        Self(0)
    }

    fn try_clone_in(&self, _store: &StoragePtr) -> Result<Self, StorageError> {
        Ok(*self)
    }
}

/// Delegates to the global allocator until the budget is spent.
#[derive(Debug)]
struct FailingResource {
    remaining: Cell<usize>,
}

impl FailingResource {
    fn new(remaining: usize) -> Self {
        Self {
            remaining: Cell::new(remaining),
        }
    }
}

impl MemoryResource for FailingResource {
    fn try_alloc(
        &self,
        layout: core::alloc::Layout,
    ) -> Result<core::ptr::NonNull<[u8]>, StorageError> {
        let remain = self.remaining.get();
        if remain == 0 {
            return Err(StorageError::AllocError);
        }
        self.remaining.set(remain - 1);
        Global.try_alloc(layout)
    }

    unsafe fn release(&self, ptr: core::ptr::NonNull<u8>, layout: core::alloc::Layout) {
        Global.release(ptr, layout)
    }
}

fn nums(values: &[i64]) -> Array<Num> {
    values.iter().map(|n| Num(*n)).collect()
}

#[test]
fn default_is_unallocated() {
    let arr = Array::<Num>::new();
    assert_eq!(arr.len(), 0);
    assert_eq!(arr.capacity(), 0);
    assert!(arr.is_empty());
    assert!(arr.storage().same_resource(&StoragePtr::global()));
}

#[test]
fn push_applies_capacity_floor_then_doubles() {
    let mut arr = Array::<Num>::new();
    arr.push(Num(1));
    assert_eq!(arr.capacity(), 16);
    for n in 2..=16 {
        arr.push(Num(n));
    }
    assert_eq!(arr.capacity(), 16);
    arr.push(Num(17));
    assert_eq!(arr.capacity(), 32);
    assert_eq!(arr.len(), 17);
    assert_eq!(arr[0], Num(1));
    assert_eq!(arr[16], Num(17));
}

#[test]
fn with_capacity_respects_floor() {
    let arr = Array::<Num>::with_capacity(4);
    assert_eq!(arr.capacity(), 16);
    assert_eq!(arr.len(), 0);

    let big = Array::<Num>::with_capacity(100);
    assert_eq!(big.capacity(), 100);
}

#[test]
fn from_fill_and_from_slice() {
    let arr = Array::from_fill(3, &Num(7));
    assert_eq!(arr, [Num(7), Num(7), Num(7)]);

    let arr = Array::from_slice(&[Num(1), Num(2)]);
    assert_eq!(arr, [Num(1), Num(2)]);
}

#[test]
fn insert_fill_at_front_shifts_tail() {
    let mut arr = nums(&[10, 20, 30]);
    let inserted = arr.insert_fill(0, 5, &Num(0));
    assert_eq!(inserted.len(), 5);
    assert_eq!(
        arr.as_slice(),
        &[Num(0), Num(0), Num(0), Num(0), Num(0), Num(10), Num(20), Num(30)]
    );
}

#[test]
fn insert_slice_mid() {
    let mut arr = nums(&[1, 4]);
    arr.insert_slice(1, &[Num(2), Num(3)]);
    assert_eq!(arr, [Num(1), Num(2), Num(3), Num(4)]);
}

#[rstest]
#[case(0)]
#[case(2)]
#[case(5)]
fn insert_then_erase_is_inverse(#[case] index: usize) {
    let before = nums(&[1, 2, 3, 4, 5]);
    let mut arr = before.clone();
    arr.insert_slice(index, &[Num(100), Num(101), Num(102)]);
    assert_eq!(arr.len(), 8);
    arr.erase_range(index..index + 3);
    assert_eq!(arr, before);
}

#[test]
fn erase_range_closes_gap() {
    let mut arr = nums(&[1, 2, 3, 4, 5]);
    arr.erase_range(1..3);
    assert_eq!(arr, [Num(1), Num(4), Num(5)]);

    arr.erase_range(..);
    assert!(arr.is_empty());
}

#[test]
fn erase_drops_elements() {
    let drops = Rc::new(Cell::new(0));
    let mut arr = Array::<Tracked>::new();
    for n in 0..5 {
        arr.push(Tracked::new(n, &drops));
    }
    arr.erase_range(1..4);
    assert_eq!(drops.get(), 3);
    assert_eq!(arr.len(), 2);
    assert_eq!(arr[1].value, 4);
    drop(arr);
    assert_eq!(drops.get(), 5);
}

#[test]
fn remove_returns_element() {
    let mut arr = nums(&[1, 2, 3]);
    assert_eq!(arr.remove(1), Num(2));
    assert_eq!(arr, [Num(1), Num(3)]);
}

#[test]
fn pop_until_empty() {
    let mut arr = nums(&[1, 2]);
    assert_eq!(arr.pop(), Some(Num(2)));
    assert_eq!(arr.pop(), Some(Num(1)));
    assert_eq!(arr.pop(), None);
}

#[test]
fn resize_fills_with_null_then_truncates() {
    let mut arr = nums(&[1, 2, 3]);
    arr.resize(5);
    assert_eq!(arr, [Num(1), Num(2), Num(3), Num(0), Num(0)]);
    arr.resize(1);
    assert_eq!(arr, [Num(1)]);
    assert!(arr.capacity() >= 5);
}

#[test]
fn resize_fill_copies_value() {
    let mut arr = nums(&[1]);
    arr.resize_fill(4, &Num(9));
    assert_eq!(arr, [Num(1), Num(9), Num(9), Num(9)]);
}

#[test]
fn truncate_drops_excess() {
    let drops = Rc::new(Cell::new(0));
    let mut arr = Array::<Tracked>::new();
    for n in 0..4 {
        arr.push(Tracked::new(n, &drops));
    }
    arr.truncate(1);
    assert_eq!(drops.get(), 3);
    assert_eq!(arr.len(), 1);
    arr.clear();
    assert_eq!(drops.get(), 4);
    assert!(arr.capacity() > 0);
}

#[test]
fn shrink_to_fit_reallocates_exactly() {
    let mut arr = Array::<Num>::with_capacity(64);
    arr.push(Num(1));
    arr.push(Num(2));
    arr.shrink_to_fit();
    assert_eq!(arr.capacity(), 2);
    assert_eq!(arr, [Num(1), Num(2)]);
}

#[test]
fn shrink_to_fit_skips_small_slack() {
    let mut arr = Array::<Num>::new();
    for n in 0..15 {
        arr.push(Num(n));
    }
    arr.shrink_to_fit();
    // one spare slot on a minimum-size buffer is not reclaimed
    assert_eq!(arr.capacity(), 16);
}

#[test]
fn shrink_to_fit_releases_empty_buffer() {
    let mut arr = Array::<Num>::with_capacity(32);
    arr.shrink_to_fit();
    assert_eq!(arr.capacity(), 0);
}

#[test]
fn shrink_to_fit_failure_is_silent() {
    // one allocation for the initial buffer, none for the shrink
    let store = StoragePtr::new(FailingResource::new(1));
    let mut arr = Array::<Num>::with_capacity_in(64, store);
    arr.push(Num(1));
    arr.push(Num(2));
    arr.shrink_to_fit();
    assert_eq!(arr.capacity(), 64);
    assert_eq!(arr, [Num(1), Num(2)]);
}

#[test]
fn insert_failure_rolls_back() {
    let budget = Rc::new(Cell::new(2));
    let probe = Flaky::new(0, &budget);
    let mut arr = Array::<Flaky>::new();
    for n in 1..=4 {
        arr.push(Flaky::new(n, &budget));
    }
    budget.set(2);

    let err = arr.try_insert_fill(1, 5, &probe).unwrap_err();
    assert!(matches!(err, StorageError::AllocError));
    let values: Vec<i64> = arr.iter().map(|f| f.value).collect();
    assert_eq!(values, vec![1, 2, 3, 4]);
}

#[test]
fn insert_failure_on_first_clone_keeps_tail() {
    let budget = Rc::new(Cell::new(0));
    let mut arr = Array::<Flaky>::new();
    arr.push(Flaky::new(1, &budget));

    // reservation succeeds, the first clone fails, tail must be intact
    let probe = Flaky::new(9, &budget);
    assert!(arr.try_insert_fill(0, 2, &probe).is_err());
    assert_eq!(arr.len(), 1);
    assert_eq!(arr[0].value, 1);
}

#[test]
fn insert_failure_after_reallocation_rolls_back() {
    let budget = Rc::new(Cell::new(0));
    let mut arr = Array::<Flaky>::new();
    for n in 1..=16 {
        arr.push(Flaky::new(n, &budget));
    }
    assert_eq!(arr.capacity(), 16);

    // the capacity step reallocates and relocates the whole buffer before
    // the third clone fails; the shifted tail must be relocated back
    budget.set(2);
    let probe = Flaky::new(100, &budget);
    assert!(arr.try_insert_fill(5, 4, &probe).is_err());
    assert_eq!(arr.capacity(), 32);
    let values: Vec<i64> = arr.iter().map(|f| f.value).collect();
    assert_eq!(values, (1..=16).collect::<Vec<i64>>());
}

#[test]
fn resize_fill_failure_restores_length() {
    let budget = Rc::new(Cell::new(0));
    let mut arr = Array::<Flaky>::new();
    for n in 1..=3 {
        arr.push(Flaky::new(n, &budget));
    }

    budget.set(2);
    let probe = Flaky::new(9, &budget);
    let err = arr.try_resize_fill(8, &probe).unwrap_err();
    assert!(matches!(err, StorageError::AllocError));
    let values: Vec<i64> = arr.iter().map(|f| f.value).collect();
    assert_eq!(values, vec![1, 2, 3]);

    budget.set(usize::MAX);
    arr.try_resize_fill(5, &probe).unwrap();
    assert_eq!(arr.len(), 5);
    assert_eq!(arr[4].value, 9);
}

#[test]
fn assign_failure_restores_prior_contents() {
    let budget = Rc::new(Cell::new(usize::MAX));
    let mut arr = Array::<Flaky>::new();
    for n in 1..=3 {
        arr.push(Flaky::new(n, &budget));
    }
    let source: Vec<Flaky> = (10..14).map(|n| Flaky::new(n, &budget)).collect();

    budget.set(2);
    assert!(arr.try_assign_slice(&source).is_err());
    let values: Vec<i64> = arr.iter().map(|f| f.value).collect();
    assert_eq!(values, vec![1, 2, 3]);

    budget.set(usize::MAX);
    arr.try_assign_slice(&source).unwrap();
    assert_eq!(arr.len(), 4);
    assert_eq!(arr[0].value, 10);
}

#[test]
fn reserve_failure_leaves_array_unchanged() {
    let store = StoragePtr::new(FailingResource::new(1));
    let mut arr = Array::<Num>::new_in(store);
    arr.push(Num(1));
    let err = arr.try_reserve(1000).unwrap_err();
    assert!(matches!(err, StorageError::AllocError));
    assert_eq!(arr, [Num(1)]);
    assert_eq!(arr.capacity(), 16);
}

#[test]
fn capacity_limit_is_reported() {
    let mut arr = Array::<Num>::new();
    arr.push(Num(1));
    let err = arr.try_reserve(usize::MAX).unwrap_err();
    assert!(matches!(err, StorageError::CapacityLimit));
    assert_eq!(arr, [Num(1)]);
}

#[test]
fn try_push_returns_value_on_failure() {
    let store = StoragePtr::new(FailingResource::new(0));
    let mut arr = Array::<Num>::new_in(store);
    let err = arr.try_push(Num(7)).unwrap_err();
    assert_eq!(err.into_value(), Num(7));
    assert!(arr.is_empty());
}

#[test]
#[should_panic(expected = "Invalid element index")]
fn insert_out_of_range_panics() {
    let mut arr = nums(&[1]);
    arr.insert(2, Num(9));
}

#[test]
#[should_panic(expected = "Invalid element index")]
fn erase_out_of_range_panics() {
    let mut arr = nums(&[1, 2]);
    arr.erase_range(1..5);
}

#[test]
#[should_panic(expected = "Invalid element index")]
fn erase_overflowing_bound_panics() {
    use core::ops::Bound;

    let mut arr = nums(&[1, 2]);
    arr.erase_range((Bound::Excluded(usize::MAX), Bound::Unbounded));
}

#[test]
fn swap_same_resource_exchanges_buffers() {
    let mut a = nums(&[1, 2]);
    let mut b = nums(&[3]);
    let a_ptr = a.as_slice().as_ptr();
    let b_ptr = b.as_slice().as_ptr();
    a.swap(&mut b);
    assert_eq!(a, [Num(3)]);
    assert_eq!(b, [Num(1), Num(2)]);
    assert_eq!(a.as_slice().as_ptr(), b_ptr);
    assert_eq!(b.as_slice().as_ptr(), a_ptr);
}

#[test]
fn swap_across_resources_keeps_bindings() {
    let store = StoragePtr::new(MonotonicResource::new());
    let mut a = nums(&[1, 2]);
    let mut b = Array::try_from_slice_in(&[Num(3), Num(4), Num(5)], store.clone()).unwrap();

    a.swap(&mut b);
    assert_eq!(a, [Num(3), Num(4), Num(5)]);
    assert_eq!(b, [Num(1), Num(2)]);
    assert!(a.storage().same_resource(&StoragePtr::global()));
    assert!(b.storage().same_resource(&store));
}

#[test]
fn swap_across_resources_failure_leaves_both() {
    let store = StoragePtr::new(FailingResource::new(1));
    let mut a = Array::try_from_slice_in(&[Num(1)], store).unwrap();
    let mut b = nums(&[2, 3]);
    assert!(a.try_swap(&mut b).is_err());
    assert_eq!(a, [Num(1)]);
    assert_eq!(b, [Num(2), Num(3)]);
}

#[test]
fn move_between_same_resource_steals_buffer() {
    let a = nums(&[1, 2, 3]);
    let ptr = a.as_slice().as_ptr();
    let b = Array::try_move_in(a, StoragePtr::global()).unwrap();
    assert_eq!(b.as_slice().as_ptr(), ptr);
    assert_eq!(b, [Num(1), Num(2), Num(3)]);
}

#[test]
fn move_between_resources_copies() {
    let store = StoragePtr::new(MonotonicResource::new());
    let a = nums(&[1, 2]);
    let ptr = a.as_slice().as_ptr();
    let b = Array::try_move_in(a, store.clone()).unwrap();
    assert_ne!(b.as_slice().as_ptr(), ptr);
    assert_eq!(b, [Num(1), Num(2)]);
    assert!(b.storage().same_resource(&store));
}

#[test]
fn monotonic_resource_skips_teardown() {
    let drops = Rc::new(Cell::new(0));
    let store = StoragePtr::new(MonotonicResource::new());
    let mut arr = Array::<Tracked>::new_in(store);
    for n in 0..3 {
        arr.push(Tracked::new(n, &drops));
    }
    drop(arr);
    // arena teardown reclaims memory wholesale; element drops are skipped
    assert_eq!(drops.get(), 0);
}

#[test]
fn monotonic_resource_still_drops_on_erase() {
    let drops = Rc::new(Cell::new(0));
    let store = StoragePtr::new(MonotonicResource::new());
    let mut arr = Array::<Tracked>::new_in(store);
    for n in 0..3 {
        arr.push(Tracked::new(n, &drops));
    }
    arr.truncate(1);
    assert_eq!(drops.get(), 2);
}

#[test]
fn monotonic_into_iter_skips_remainder_drops() {
    let drops = Rc::new(Cell::new(0));
    let store = StoragePtr::new(MonotonicResource::new());
    let mut arr = Array::<Tracked>::new_in(store);
    for n in 0..4 {
        arr.push(Tracked::new(n, &drops));
    }
    let mut iter = arr.into_iter();
    // moved-out elements still drop normally; the remainder does not
    drop(iter.next());
    assert_eq!(drops.get(), 1);
    drop(iter);
    assert_eq!(drops.get(), 1);
}

#[test]
fn into_storage_recovers_handle() {
    let store = StoragePtr::new(MonotonicResource::new());
    let mut arr = Array::<Num>::new_in(store.clone());
    arr.push(Num(1));
    let recovered = arr.into_storage();
    assert!(recovered.same_resource(&store));
}

#[test]
fn clone_keeps_resource() {
    let store = StoragePtr::new(MonotonicResource::new());
    let arr = Array::try_from_slice_in(&[Num(1), Num(2)], store.clone()).unwrap();
    let copy = arr.clone();
    assert_eq!(copy, arr);
    assert!(copy.storage().same_resource(&store));
}

#[test]
fn non_bitwise_elements_insert_and_erase() {
    let mut arr = Array::<NoBulk>::new();
    for n in 0..6 {
        arr.push(NoBulk(n));
    }
    arr.insert_slice(2, &[NoBulk(100), NoBulk(101)]);
    assert_eq!(arr[1], NoBulk(1));
    assert_eq!(arr[2], NoBulk(100));
    assert_eq!(arr[4], NoBulk(2));
    arr.erase_range(2..4);
    let values: Vec<i64> = arr.iter().map(|e| e.0).collect();
    assert_eq!(values, vec![0, 1, 2, 3, 4, 5]);
}

#[test]
fn into_iter_forward_and_back() {
    let arr = nums(&[1, 2, 3, 4]);
    let mut iter = arr.into_iter();
    assert_eq!(iter.len(), 4);
    assert_eq!(iter.next(), Some(Num(1)));
    assert_eq!(iter.next_back(), Some(Num(4)));
    assert_eq!(iter.as_slice(), &[Num(2), Num(3)]);
    assert_eq!(iter.next(), Some(Num(2)));
    assert_eq!(iter.next(), Some(Num(3)));
    assert_eq!(iter.next(), None);
    assert_eq!(iter.next_back(), None);
}

#[test]
fn into_iter_drops_remainder() {
    let drops = Rc::new(Cell::new(0));
    let mut arr = Array::<Tracked>::new();
    for n in 0..4 {
        arr.push(Tracked::new(n, &drops));
    }
    let mut iter = arr.into_iter();
    drop(iter.next());
    assert_eq!(drops.get(), 1);
    drop(iter);
    assert_eq!(drops.get(), 4);
}

#[test]
fn extend_and_from_iterator() {
    let mut arr: Array<Num> = (1..4).map(Num).collect();
    arr.extend((4..6).map(Num));
    assert_eq!(arr, [Num(1), Num(2), Num(3), Num(4), Num(5)]);
}

#[cfg(feature = "zeroize")]
#[test]
fn zeroizing_resource_forces_teardown() {
    use json_array::storage::ZeroizingResource;

    let drops = Rc::new(Cell::new(0));
    let store = StoragePtr::new(ZeroizingResource(MonotonicResource::new()));
    let mut arr = Array::<Tracked>::new_in(store);
    for n in 0..3 {
        arr.push(Tracked::new(n, &drops));
    }
    drop(arr);
    // wiping requires a release pass even over an arena
    assert_eq!(drops.get(), 3);
}

#[cfg(feature = "allocator-api2")]
#[test]
fn allocator_adapter_round_trip() {
    use json_array::storage::AllocResource;

    let store = StoragePtr::new(AllocResource(allocator_api2::alloc::Global));
    let mut arr = Array::<Num>::new_in(store);
    arr.push(Num(5));
    assert_eq!(arr, [Num(5)]);
}
