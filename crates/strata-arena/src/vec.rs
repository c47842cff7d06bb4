//! Arena-backed growable array.

#![allow(unsafe_code)]

use std::fmt;
use std::marker::PhantomData;
use std::mem;
use std::ops::{Deref, DerefMut, Range};
use std::ptr;
use std::slice;

use crate::arena::Arena;
use crate::error::ArenaError;
use crate::flags::AllocFlags;
use crate::growth::RawSeq;

/// A growable array of `Copy` elements stored in an arena.
///
/// Growing the array that sits at the arena tip extends it in place;
/// otherwise the contents move to a larger allocation and the old storage
/// is abandoned until the arena rewinds. Build one array at a time for
/// best results.
///
/// ```
/// use strata_arena::{Arena, ArenaVec};
///
/// let arena = Arena::with_capacity(4096);
/// let mut v = ArenaVec::new_in(&arena);
/// for i in 0..100u32 {
///     v.push(i);
/// }
/// assert_eq!(v.len(), 100);
/// assert_eq!(v[99], 99);
/// ```
pub struct ArenaVec<'a, T: Copy> {
    arena: &'a Arena,
    raw: RawSeq,
    _marker: PhantomData<&'a mut [T]>,
}

impl<'a, T: Copy> ArenaVec<'a, T> {
    /// Empty array; allocates on first push.
    ///
    /// # Panics
    ///
    /// Panics if `T` is zero-sized.
    pub fn new_in(arena: &'a Arena) -> Self {
        assert!(
            mem::size_of::<T>() != 0,
            "ArenaVec does not support zero-sized types"
        );
        Self {
            arena,
            raw: RawSeq::empty(mem::align_of::<T>()),
            _marker: PhantomData,
        }
    }

    /// Empty array with room for `cap` elements.
    #[track_caller]
    pub fn with_capacity_in(cap: usize, arena: &'a Arena) -> Self {
        let mut vec = Self::new_in(arena);
        if cap > 0 {
            let storage = arena.alloc_slice_uninit::<T>(cap);
            vec.raw.data = storage.as_mut_ptr().cast();
            vec.raw.cap = cap;
        }
        vec
    }

    /// Array viewing caller memory.
    ///
    /// Nothing is copied until the array is first modified, at which point
    /// the contents move into the arena.
    pub fn from_slice_in(items: &'a [T], arena: &'a Arena) -> Self {
        let mut vec = Self::new_in(arena);
        if !items.is_empty() {
            vec.raw.data = items.as_ptr().cast_mut().cast();
            vec.raw.len = items.len();
        }
        vec
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.raw.len
    }

    /// Whether the array is empty.
    pub fn is_empty(&self) -> bool {
        self.raw.len == 0
    }

    /// Elements the current storage can hold; 0 while the array still
    /// views caller memory.
    pub fn capacity(&self) -> usize {
        self.raw.cap
    }

    /// The arena this array allocates from.
    pub fn arena(&self) -> &'a Arena {
        self.arena
    }

    fn grow(&mut self, flags: AllocFlags) -> Result<(), ArenaError> {
        // SAFETY: `raw` is either empty, caller memory holding `len`
        // elements with `cap == 0`, or arena storage for `cap` elements.
        unsafe {
            self.arena
                .grow_raw(&mut self.raw, mem::size_of::<T>(), mem::align_of::<T>(), flags)
        }
    }

    #[track_caller]
    fn grow_or_escalate(&mut self) {
        self.grow(AllocFlags::NONE)
            .unwrap_or_else(|err| unreachable!("escalating growth returned {err}"));
    }

    /// Append `value`, growing if full.
    ///
    /// # Panics
    ///
    /// Panics if growth would allocate from an arena locked by a scratch
    /// scope.
    #[track_caller]
    pub fn push(&mut self, value: T) -> &mut T {
        if self.raw.len == self.raw.cap {
            self.grow_or_escalate();
        }
        self.write_next(value)
    }

    /// Like [`ArenaVec::push`], returning `Err` if the arena is exhausted.
    pub fn try_push(&mut self, value: T) -> Result<&mut T, ArenaError> {
        if self.raw.len == self.raw.cap {
            self.grow(AllocFlags::OOM_NULL)?;
        }
        Ok(self.write_next(value))
    }

    fn write_next(&mut self, value: T) -> &mut T {
        debug_assert!(self.raw.len < self.raw.cap);
        // SAFETY: `len < cap`, so the slot lies inside arena storage.
        unsafe {
            let slot = self.raw.data.cast::<T>().add(self.raw.len);
            slot.write(value);
            self.raw.len += 1;
            &mut *slot
        }
    }

    /// Ensure room for at least `additional` more elements.
    #[track_caller]
    pub fn reserve(&mut self, additional: usize) {
        while self.raw.cap.saturating_sub(self.raw.len) < additional {
            self.grow_or_escalate();
        }
    }

    /// Append every element of `items`.
    #[track_caller]
    pub fn extend_from_slice(&mut self, items: &[T]) {
        self.reserve(items.len());
        // SAFETY: `reserve` guarantees room for `items.len()` elements;
        // `items` cannot alias the unused tail of our storage.
        unsafe {
            let dst = self.raw.data.cast::<T>().add(self.raw.len);
            ptr::copy_nonoverlapping(items.as_ptr(), dst, items.len());
        }
        self.raw.len += items.len();
    }

    /// Remove and return the last element.
    pub fn pop(&mut self) -> Option<T> {
        if self.raw.len == 0 {
            return None;
        }
        self.raw.len -= 1;
        // SAFETY: the element at the old `len - 1` is initialized.
        Some(unsafe { self.raw.data.cast::<T>().add(self.raw.len).read() })
    }

    /// Drop every element, keeping the storage.
    pub fn clear(&mut self) {
        self.raw.len = 0;
    }

    /// Shorten to `len` elements; no-op if already shorter.
    pub fn truncate(&mut self, len: usize) {
        self.raw.len = self.raw.len.min(len);
    }

    /// The elements as a slice.
    pub fn as_slice(&self) -> &[T] {
        // SAFETY: `data` is aligned, non-null and holds `len` initialized
        // elements (arena storage or the caller's shared slice).
        unsafe { slice::from_raw_parts(self.raw.data.cast::<T>(), self.raw.len) }
    }

    /// The elements as a mutable slice, moving caller-viewed contents into
    /// the arena first.
    #[track_caller]
    pub fn as_mut_slice(&mut self) -> &mut [T] {
        self.own();
        // SAFETY: storage is arena-owned, exclusively ours, and holds `len`
        // initialized elements.
        unsafe { slice::from_raw_parts_mut(self.raw.data.cast::<T>(), self.raw.len) }
    }

    /// Give up growability and keep the elements for the arena's lifetime.
    #[track_caller]
    pub fn into_slice(mut self) -> &'a mut [T] {
        self.own();
        // SAFETY: as in `as_mut_slice`; `self` is consumed so nothing else
        // refers to the storage.
        unsafe { slice::from_raw_parts_mut(self.raw.data.cast::<T>(), self.raw.len) }
    }

    #[track_caller]
    fn own(&mut self) {
        if self.raw.cap == 0 && self.raw.len > 0 {
            self.grow_or_escalate();
        }
    }

    /// Copy `range` of this array into a new array in `arena`.
    ///
    /// # Panics
    ///
    /// Panics if `range` is out of bounds.
    #[track_caller]
    pub fn clone_in<'b>(&self, arena: &'b Arena, range: Range<usize>) -> ArenaVec<'b, T> {
        let items = &self.as_slice()[range];
        let mut out = ArenaVec::new_in(arena);
        if !items.is_empty() {
            let copy = arena.alloc_slice_copy(items);
            out.raw = RawSeq {
                data: copy.as_mut_ptr().cast(),
                len: copy.len(),
                cap: copy.len(),
            };
        }
        out
    }
}

impl<T: Copy> Deref for ArenaVec<'_, T> {
    type Target = [T];

    fn deref(&self) -> &[T] {
        self.as_slice()
    }
}

impl<T: Copy> DerefMut for ArenaVec<'_, T> {
    fn deref_mut(&mut self) -> &mut [T] {
        self.as_mut_slice()
    }
}

impl<'s, T: Copy> IntoIterator for &'s ArenaVec<'_, T> {
    type Item = &'s T;
    type IntoIter = slice::Iter<'s, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.as_slice().iter()
    }
}

impl<T: Copy> Extend<T> for ArenaVec<'_, T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.push(item);
        }
    }
}

impl<T: Copy + fmt::Debug> fmt::Debug for ArenaVec<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}
