//! Allocator-aware sequence storage for JSON values.
//!
//! [`Array`] is the growable container backing the array variant of a JSON
//! value representation. Elements implement the [`Element`] interface and are
//! stored contiguously in a buffer obtained from a pluggable
//! [`MemoryResource`](storage::MemoryResource), shared through a
//! reference-counted [`StoragePtr`](storage::StoragePtr) handle.
//!
//! Every mutating operation that can fail does so with a strong guarantee:
//! either it completes, or the container is left observably unchanged. The
//! rollback protocol is implemented with scope guards whose destructors undo
//! partially applied mutations before the error propagates.

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

#[cfg(test)]
#[macro_use]
extern crate std;

extern crate alloc;

pub mod array;

pub(crate) mod element;

pub(crate) mod error;

pub mod storage;

pub use self::array::{Array, IntoIter};
pub use self::element::Element;
pub use self::error::{InsertError, StorageError};
pub use self::storage::{Global, MemoryResource, MonotonicResource, StoragePtr};
