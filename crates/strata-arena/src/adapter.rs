//! malloc/free-shaped access to an arena.
//!
//! [`ArenaAlloc`] is the context value handed to code written against a
//! `malloc(ctx, size)` / `free(ctx, ptr, size)` interface. Freeing only
//! reclaims the most recent allocation; see [`Arena::free`].
//!
//! With the `nightly` feature, `&Arena` also implements
//! [`core::alloc::Allocator`], so std collections can live in an arena.

#![allow(unsafe_code)]

use std::ptr::NonNull;

use crate::arena::Arena;

/// Allocator handle carrying an arena as its context.
#[derive(Clone, Copy, Debug)]
pub struct ArenaAlloc<'a> {
    arena: &'a Arena,
}

impl<'a> ArenaAlloc<'a> {
    /// Wrap `arena`.
    pub fn new(arena: &'a Arena) -> Self {
        Self { arena }
    }

    /// See [`Arena::malloc`].
    #[track_caller]
    pub fn malloc(&self, size: usize) -> NonNull<u8> {
        self.arena.malloc(size)
    }

    /// See [`Arena::free`].
    ///
    /// # Safety
    ///
    /// As for [`Arena::free`].
    #[track_caller]
    pub unsafe fn free(&self, ptr: *const u8, size: usize) {
        // SAFETY: forwarded caller contract.
        unsafe { self.arena.free(ptr, size) }
    }

    /// The wrapped arena.
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }
}

impl<'a> From<&'a Arena> for ArenaAlloc<'a> {
    fn from(arena: &'a Arena) -> Self {
        Self::new(arena)
    }
}

#[cfg(feature = "nightly")]
mod allocator_api {
    use core::alloc::{AllocError, Allocator, Layout};
    use std::ptr::NonNull;

    use crate::arena::Arena;
    use crate::flags::AllocFlags;

    // SAFETY: blocks stay valid until the arena rewinds, which needs
    // `&mut Arena` and therefore outlives every `&Arena` allocator copy.
    unsafe impl Allocator for &Arena {
        fn allocate(&self, layout: Layout) -> Result<NonNull<[u8]>, AllocError> {
            let ptr = self
                .alloc_raw(
                    layout.size(),
                    layout.align(),
                    1,
                    AllocFlags::NO_INIT | AllocFlags::OOM_NULL,
                )
                .map_err(|_| AllocError)?;
            Ok(NonNull::slice_from_raw_parts(ptr, layout.size()))
        }

        unsafe fn deallocate(&self, ptr: NonNull<u8>, layout: Layout) {
            // SAFETY: the collection no longer uses the block.
            unsafe { self.free(ptr.as_ptr(), layout.size()) }
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn std_vec_in_arena() {
            let arena = Arena::with_capacity(4096);
            let mut v = Vec::new_in(&arena);
            v.extend([1u32, 2, 3]);
            assert_eq!(v, [1, 2, 3]);
            assert!(arena.used() >= 12);
        }
    }
}
