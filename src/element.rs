//! The element interface consumed by [`Array`](crate::Array).

use crate::error::StorageError;
use crate::storage::StoragePtr;

/// The interface an [`Array`](crate::Array) requires from its element type.
///
/// An element is typically a polymorphic JSON value which may itself own
/// nested containers allocated from the same resource, so constructing one is
/// tied to a [`StoragePtr`] and may fail. Moves and destruction are native
/// Rust moves and `Drop`.
pub trait Element: Sized {
    /// Whether a range of elements may be relocated between buffers with a
    /// single bulk byte copy.
    ///
    /// When `false`, the container relocates elements one at a time,
    /// back-to-front or front-to-back depending on how the source and
    /// destination ranges overlap. Both strategies are sound for any `Sized`
    /// type; this only selects the bulk fast path.
    const BITWISE_RELOCATE: bool = true;

    /// Construct the null variant of this element against `store`.
    ///
    /// Null construction requires no allocation and cannot fail.
    fn null_in(store: &StoragePtr) -> Self;

    /// Copy-construct this element against `store`.
    ///
    /// The copy may need to allocate from `store` (nested containers,
    /// strings), so it can fail with a resource error.
    fn try_clone_in(&self, store: &StoragePtr) -> Result<Self, StorageError>;
}
