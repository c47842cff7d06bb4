//! The bump allocator: aligned, overflow-safe allocation against the
//! committed window of a [`Region`](crate::region::Region).
//!
//! Every allocation advances `cursor` by `pad + size * count`, where `pad`
//! rounds the absolute tip address up to the requested alignment. When the
//! request does not fit before `limit`, the slow path commits further
//! chunks (commit-on-demand arenas only) and, once that is impossible,
//! applies the out-of-memory policy selected by [`AllocFlags`].
//!
//! Allocation works through `&Arena`, so any number of allocations may be
//! live at once; each borrows the arena. Rewinding operations take
//! `&mut Arena`, which proves no allocation outlives the rewind.

#![allow(unsafe_code)]

use std::cell::Cell;
use std::fmt;
use std::mem::{self, MaybeUninit};
use std::ptr::NonNull;
use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};

use bytemuck::Zeroable;

use crate::error::ArenaError;
use crate::flags::AllocFlags;
use crate::oom;
use crate::poison::PoisonHooks;
use crate::raw;
use crate::region::Region;

/// Alignment used by [`Arena::malloc`], matching C's `max_align_t`.
pub const MAX_ALIGN: usize = 16;

/// Process-unique arena identity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ArenaId(u64);

impl ArenaId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Who may currently move the cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Access {
    /// Allocation allowed.
    Open,
    /// A scratch scope borrowed the arena; allocate through the scope.
    Scoped,
    /// A temporary C string sits at the tip and will be rewound.
    Frozen,
}

/// Debug instrumentation counters.
///
/// Maintained unconditionally; each update is a plain non-atomic add.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Successful allocations.
    pub allocations: u64,
    /// Bytes zero-filled by allocations without [`AllocFlags::NO_INIT`].
    pub zeroed_bytes: u64,
    /// Chunks committed after construction.
    pub commits: u64,
    /// Requests that hit the out-of-memory path.
    pub oom_events: u64,
    /// Resets, checkpoint restores and tip frees.
    pub rewinds: u64,
}

/// A region-based bump allocator.
///
/// # Thread safety
///
/// An arena is single-owner: it may be moved to another thread but never
/// shared (`!Sync`). Give each worker its own arena.
///
/// # Example
///
/// ```
/// use strata_arena::Arena;
///
/// let mut arena = Arena::with_capacity(4096);
/// let xs = arena.alloc_slice::<u64>(4);
/// xs[0] = 7;
/// let copy = arena.alloc_slice_copy(&xs[..]);
/// assert_eq!(copy, &[7, 0, 0, 0]);
/// arena.reset();
/// assert_eq!(arena.used(), 0);
/// ```
pub struct Arena {
    /// Backing bytes; `begin = base + floor`.
    pub(crate) region: Region,
    /// Bump pointer, as a byte offset from the region base.
    pub(crate) cursor: Cell<usize>,
    /// Lowest offset this arena may rewind to (non-zero in scratch scopes).
    pub(crate) floor: usize,
    /// End of the committed window, as a byte offset from the region base.
    pub(crate) limit: Cell<usize>,
    /// Identity shared by an arena and its scratch scopes; keys
    /// checkpoints and recovery points.
    pub(crate) id: ArenaId,
    pub(crate) access: Cell<Access>,
    pub(crate) hooks: PoisonHooks,
    pub(crate) stats: Cell<ArenaStats>,
}

// SAFETY: an arena exclusively owns its region; nothing inside refers to
// thread-local state. Scratch children never escape their `Scratch` guard,
// which borrows the (non-`Sync`) parent and is therefore not `Send`.
unsafe impl Send for Arena {}

impl Arena {
    // ── Introspection ───────────────────────────────────────────────

    #[inline]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.region.base()
    }

    /// Address of the tip: where the next unpadded allocation starts.
    #[inline]
    pub fn tip(&self) -> *const u8 {
        self.base().as_ptr().wrapping_add(self.cursor.get())
    }

    /// Whether `[ptr, ptr + len)` ends exactly at the tip.
    #[inline]
    pub fn ends_at_tip(&self, ptr: *const u8, len: usize) -> bool {
        (ptr as usize).wrapping_add(len) == self.tip() as usize
    }

    /// Bytes in use since the beginning of this arena.
    pub fn used(&self) -> usize {
        self.cursor.get() - self.floor
    }

    /// Size of the committed window in bytes.
    pub fn capacity(&self) -> usize {
        self.limit.get() - self.floor
    }

    /// Bytes left before the next commit (or OOM for fixed arenas).
    pub fn remaining(&self) -> usize {
        self.limit.get() - self.cursor.get()
    }

    /// Snapshot of the instrumentation counters.
    pub fn stats(&self) -> ArenaStats {
        self.stats.get()
    }

    #[inline]
    pub(crate) fn bump_stats(&self, update: impl FnOnce(&mut ArenaStats)) {
        let mut stats = self.stats.get();
        update(&mut stats);
        self.stats.set(stats);
    }

    #[inline]
    #[track_caller]
    pub(crate) fn assert_open(&self) {
        if self.access.get() != Access::Open {
            locked(self.access.get());
        }
    }

    /// Byte offset of `ptr` from the region base, if it lies in
    /// `[begin, tip]`.
    pub(crate) fn offset_of(&self, ptr: *const u8) -> Option<usize> {
        let offset = (ptr as usize).checked_sub(self.base().as_ptr() as usize)?;
        (self.floor..=self.cursor.get())
            .contains(&offset)
            .then_some(offset)
    }

    /// Reborrow `len` bytes at `offset` with the provenance of the base
    /// pointer, so views spanning adjacent allocations stay valid.
    ///
    /// # Safety
    ///
    /// `[offset, offset + len)` must lie below the cursor, be initialized,
    /// and not be covered by a live `&mut` borrow.
    pub(crate) unsafe fn bytes_at(&self, offset: usize, len: usize) -> &[u8] {
        debug_assert!(offset + len <= self.cursor.get());
        // SAFETY: caller contract.
        unsafe { slice::from_raw_parts(self.base().as_ptr().add(offset), len) }
    }

    // ── Raw entrypoint ──────────────────────────────────────────────

    /// Allocate `count` elements of `size` bytes aligned to `align`.
    ///
    /// The memory is zeroed unless `flags` contains
    /// [`AllocFlags::NO_INIT`]. On exhaustion (including `size * count`
    /// overflow) the call returns `Err` if `flags` contains
    /// [`AllocFlags::OOM_NULL`]; otherwise it escalates, see
    /// [`Arena::catch_oom`].
    ///
    /// # Panics
    ///
    /// Panics if `align` is not a power of two, or if the arena is locked
    /// by a scratch scope.
    #[inline]
    #[track_caller]
    pub fn alloc_raw(
        &self,
        size: usize,
        align: usize,
        count: usize,
        flags: AllocFlags,
    ) -> Result<NonNull<u8>, ArenaError> {
        match self.allocate(size, align, count, flags) {
            Ok(ptr) => Ok(ptr),
            Err(err) if flags.contains(AllocFlags::OOM_NULL) => Err(err),
            Err(err) => oom::escalate(self, err),
        }
    }

    /// [`Arena::alloc_raw`] without zeroing, followed by a copy of
    /// `size * count` bytes from `src`.
    ///
    /// # Safety
    ///
    /// `src` must be valid for reads of `size * count` bytes.
    ///
    /// # Panics
    ///
    /// Panics if `src` is null.
    #[track_caller]
    pub unsafe fn alloc_raw_from(
        &self,
        size: usize,
        align: usize,
        count: usize,
        src: *const u8,
    ) -> NonNull<u8> {
        assert!(!src.is_null(), "copy source cannot be null");
        let dst = self.alloc_or_escalate(size, align, count, AllocFlags::NO_INIT);
        // SAFETY: the allocation succeeded, so `size * count` did not
        // overflow; `src` is readable per the caller contract.
        unsafe { raw::copy_bytes(src, dst.as_ptr(), size * count) };
        dst
    }

    #[inline]
    #[track_caller]
    pub(crate) fn alloc_or_escalate(
        &self,
        size: usize,
        align: usize,
        count: usize,
        flags: AllocFlags,
    ) -> NonNull<u8> {
        match self.allocate(size, align, count, flags) {
            Ok(ptr) => ptr,
            Err(err) => oom::escalate(self, err),
        }
    }

    /// Fast path; never escalates.
    #[inline]
    #[track_caller]
    fn allocate(
        &self,
        size: usize,
        align: usize,
        count: usize,
        flags: AllocFlags,
    ) -> Result<NonNull<u8>, ArenaError> {
        assert!(
            align.is_power_of_two(),
            "alignment must be a power of two (got {align})"
        );
        self.assert_open();

        let cursor = self.cursor.get();
        let pad = self.pad_for(cursor, align);
        if let Some(needed) = size.checked_mul(count).and_then(|t| t.checked_add(pad)) {
            if needed <= self.limit.get() - cursor {
                return Ok(self.bump(cursor, pad, needed - pad, flags));
            }
        }
        self.allocate_slow(size, align, count, flags)
    }

    #[cold]
    fn allocate_slow(
        &self,
        size: usize,
        align: usize,
        count: usize,
        flags: AllocFlags,
    ) -> Result<NonNull<u8>, ArenaError> {
        let cursor = self.cursor.get();
        let pad = self.pad_for(cursor, align);
        let Some(total) = size.checked_mul(count) else {
            return Err(self.out_of_memory(ArenaError::SizeOverflow { size, count }));
        };
        let Some(needed) = total.checked_add(pad) else {
            return Err(self.out_of_memory(ArenaError::SizeOverflow { size, count }));
        };

        // Fail fast on requests that could never fit the reservation.
        if needed > self.region.max_limit() - cursor {
            return Err(self.out_of_memory(ArenaError::OutOfMemory {
                requested: needed,
                available: self.remaining(),
            }));
        }
        while needed > self.limit.get() - cursor {
            if !self.grow_commit() {
                return Err(self.out_of_memory(ArenaError::OutOfMemory {
                    requested: needed,
                    available: self.remaining(),
                }));
            }
        }
        Ok(self.bump(cursor, pad, total, flags))
    }

    /// Padding that aligns `base + cursor` to `align`.
    #[inline]
    fn pad_for(&self, cursor: usize, align: usize) -> usize {
        let addr = (self.base().as_ptr() as usize).wrapping_add(cursor);
        addr.wrapping_neg() & (align - 1)
    }

    #[inline]
    fn bump(&self, cursor: usize, pad: usize, total: usize, flags: AllocFlags) -> NonNull<u8> {
        let start = cursor + pad;
        self.cursor.set(start + total);
        // SAFETY: `start + total <= limit`, inside the committed window.
        let ptr = unsafe { NonNull::new_unchecked(self.base().as_ptr().add(start)) };
        self.hooks.unpoison(ptr.as_ptr(), total);
        let zero = !flags.contains(AllocFlags::NO_INIT);
        if zero {
            // SAFETY: freshly handed out, writable, unreferenced.
            unsafe { raw::zero_bytes(ptr.as_ptr(), total) };
        }
        self.bump_stats(|s| {
            s.allocations += 1;
            if zero {
                s.zeroed_bytes += total as u64;
            }
        });
        ptr
    }

    fn out_of_memory(&self, err: ArenaError) -> ArenaError {
        self.bump_stats(|s| s.oom_events += 1);
        tracing::warn!(%err, used = self.used(), "arena allocation failed");
        err
    }

    // ── Typed call sites ────────────────────────────────────────────

    /// Allocate one zeroed `T`.
    #[track_caller]
    pub fn alloc<T: Zeroable>(&self) -> &mut T {
        let ptr =
            self.alloc_or_escalate(mem::size_of::<T>(), mem::align_of::<T>(), 1, AllocFlags::NONE);
        // SAFETY: aligned, in-bounds, zeroed; all-zero is a valid `T`.
        unsafe { &mut *ptr.as_ptr().cast::<T>() }
    }

    /// Like [`Arena::alloc`], returning `Err` on exhaustion.
    pub fn try_alloc<T: Zeroable>(&self) -> Result<&mut T, ArenaError> {
        let ptr = self.alloc_raw(
            mem::size_of::<T>(),
            mem::align_of::<T>(),
            1,
            AllocFlags::OOM_NULL,
        )?;
        // SAFETY: as in `alloc`.
        Ok(unsafe { &mut *ptr.as_ptr().cast::<T>() })
    }

    /// Move `value` into the arena.
    ///
    /// The arena never runs destructors; a `T` with drop glue is leaked
    /// when the arena rewinds past it.
    #[track_caller]
    pub fn alloc_value<T>(&self, value: T) -> &mut T {
        let ptr = self
            .alloc_or_escalate(mem::size_of::<T>(), mem::align_of::<T>(), 1, AllocFlags::NO_INIT)
            .cast::<T>();
        // SAFETY: aligned, in-bounds, unreferenced storage for one `T`.
        unsafe {
            ptr.as_ptr().write(value);
            &mut *ptr.as_ptr()
        }
    }

    /// Like [`Arena::alloc_value`], handing `value` back on exhaustion.
    pub fn try_alloc_value<T>(&self, value: T) -> Result<&mut T, (T, ArenaError)> {
        match self.alloc_raw(
            mem::size_of::<T>(),
            mem::align_of::<T>(),
            1,
            AllocFlags::NO_INIT | AllocFlags::OOM_NULL,
        ) {
            Ok(ptr) => {
                let ptr = ptr.cast::<T>();
                // SAFETY: as in `alloc_value`.
                unsafe {
                    ptr.as_ptr().write(value);
                    Ok(&mut *ptr.as_ptr())
                }
            }
            Err(err) => Err((value, err)),
        }
    }

    /// Allocate `count` zeroed `T`s.
    #[track_caller]
    pub fn alloc_slice<T: Zeroable>(&self, count: usize) -> &mut [T] {
        let ptr = self.alloc_or_escalate(
            mem::size_of::<T>(),
            mem::align_of::<T>(),
            count,
            AllocFlags::NONE,
        );
        // SAFETY: aligned, in-bounds, zeroed storage for `count` `T`s.
        unsafe { slice::from_raw_parts_mut(ptr.as_ptr().cast::<T>(), count) }
    }

    /// Like [`Arena::alloc_slice`], returning `Err` on exhaustion.
    pub fn try_alloc_slice<T: Zeroable>(&self, count: usize) -> Result<&mut [T], ArenaError> {
        let ptr = self.alloc_raw(
            mem::size_of::<T>(),
            mem::align_of::<T>(),
            count,
            AllocFlags::OOM_NULL,
        )?;
        // SAFETY: as in `alloc_slice`.
        Ok(unsafe { slice::from_raw_parts_mut(ptr.as_ptr().cast::<T>(), count) })
    }

    /// Allocate `count` `T`s without zeroing them.
    #[track_caller]
    pub fn alloc_slice_uninit<T>(&self, count: usize) -> &mut [MaybeUninit<T>] {
        let ptr = self.alloc_or_escalate(
            mem::size_of::<T>(),
            mem::align_of::<T>(),
            count,
            AllocFlags::NO_INIT,
        );
        // SAFETY: aligned, in-bounds; `MaybeUninit` needs no initialization.
        unsafe { slice::from_raw_parts_mut(ptr.as_ptr().cast::<MaybeUninit<T>>(), count) }
    }

    /// Like [`Arena::alloc_slice_uninit`], returning `Err` on exhaustion.
    pub fn try_alloc_slice_uninit<T>(
        &self,
        count: usize,
    ) -> Result<&mut [MaybeUninit<T>], ArenaError> {
        let ptr = self.alloc_raw(
            mem::size_of::<T>(),
            mem::align_of::<T>(),
            count,
            AllocFlags::NO_INIT | AllocFlags::OOM_NULL,
        )?;
        // SAFETY: as in `alloc_slice_uninit`.
        Ok(unsafe { slice::from_raw_parts_mut(ptr.as_ptr().cast::<MaybeUninit<T>>(), count) })
    }

    /// Copy `src` into a fresh allocation.
    #[track_caller]
    pub fn alloc_slice_copy<T: Copy>(&self, src: &[T]) -> &mut [T] {
        let ptr = self.alloc_or_escalate(
            mem::size_of::<T>(),
            mem::align_of::<T>(),
            src.len(),
            AllocFlags::NO_INIT,
        );
        self.finish_copy(ptr, src)
    }

    /// Like [`Arena::alloc_slice_copy`], returning `Err` on exhaustion.
    pub fn try_alloc_slice_copy<T: Copy>(&self, src: &[T]) -> Result<&mut [T], ArenaError> {
        let ptr = self.alloc_raw(
            mem::size_of::<T>(),
            mem::align_of::<T>(),
            src.len(),
            AllocFlags::NO_INIT | AllocFlags::OOM_NULL,
        )?;
        Ok(self.finish_copy(ptr, src))
    }

    fn finish_copy<T: Copy>(&self, ptr: NonNull<u8>, src: &[T]) -> &mut [T] {
        let dst = ptr.as_ptr().cast::<T>();
        // SAFETY: `dst` is fresh storage for `src.len()` `T`s, so the
        // ranges cannot overlap; `T: Copy` has no drop glue.
        unsafe {
            std::ptr::copy_nonoverlapping(src.as_ptr(), dst, src.len());
            slice::from_raw_parts_mut(dst, src.len())
        }
    }

    // ── malloc/free shape ───────────────────────────────────────────

    /// Allocate `size` zeroed bytes aligned to [`MAX_ALIGN`].
    ///
    /// Escalates on exhaustion.
    #[track_caller]
    pub fn malloc(&self, size: usize) -> NonNull<u8> {
        self.alloc_or_escalate(size, MAX_ALIGN, 1, AllocFlags::NONE)
    }

    /// Give back the most recent allocation.
    ///
    /// The cursor rewinds only if `ptr + size` is exactly the tip; any
    /// other pointer (and null) is ignored and its memory stays in use
    /// until the next reset or restore.
    ///
    /// # Safety
    ///
    /// If `ptr` is the tip allocation, no reference into
    /// `[ptr, ptr + size)` may be used afterwards.
    #[track_caller]
    pub unsafe fn free(&self, ptr: *const u8, size: usize) {
        if ptr.is_null() {
            return;
        }
        self.assert_open();
        let Some(offset) = self.offset_of(ptr) else {
            return;
        };
        if offset.checked_add(size) == Some(self.cursor.get()) {
            self.hooks.poison(ptr, size);
            self.cursor.set(offset);
            self.bump_stats(|s| s.rewinds += 1);
        }
    }
}

#[cold]
#[track_caller]
fn locked(access: Access) -> ! {
    match access {
        Access::Scoped => {
            panic!("arena is locked by an active scratch scope; allocate through the scope")
        }
        Access::Frozen => panic!("arena is frozen while a temporary C string is borrowed"),
        Access::Open => unreachable!("open arenas are not locked"),
    }
}

impl fmt::Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("id", &self.id.0)
            .field("base", &self.base())
            .field("used", &self.used())
            .field("capacity", &self.capacity())
            .field("reserved", &self.reserved())
            .field("fixed", &self.is_fixed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_zeroed_value() {
        let arena = Arena::with_capacity(64);
        let x: &mut u64 = arena.alloc();
        assert_eq!(*x, 0);
        *x = 5;
        assert_eq!(arena.used(), 8);
    }

    #[test]
    fn sequential_allocs_dont_overlap() {
        let arena = Arena::with_capacity(1024);
        let a = arena.alloc_slice::<u32>(5);
        a.fill(1);
        let b = arena.alloc_slice::<u32>(3);
        b.fill(2);
        assert!(a.iter().all(|&v| v == 1));
        let a_end = a.as_ptr_range().end as usize;
        assert!(b.as_ptr() as usize >= a_end);
    }

    #[test]
    fn alignment_pads_the_cursor() {
        let arena = Arena::with_capacity(256);
        arena.alloc::<u8>();
        let x: &mut u64 = arena.alloc();
        assert_eq!(x as *mut u64 as usize % mem::align_of::<u64>(), 0);
        let raw = arena.alloc_raw(1, 64, 3, AllocFlags::NONE).unwrap();
        assert_eq!(raw.as_ptr() as usize % 64, 0);
    }

    #[test]
    #[should_panic(expected = "power of two")]
    fn non_power_of_two_alignment_panics() {
        let arena = Arena::with_capacity(64);
        let _ = arena.alloc_raw(1, 3, 1, AllocFlags::OOM_NULL);
    }

    #[test]
    fn overflow_returns_error_instead_of_wrapping() {
        let arena = Arena::with_capacity(64);
        let err = arena
            .alloc_raw(usize::MAX / 2, 8, 3, AllocFlags::OOM_NULL)
            .unwrap_err();
        assert_eq!(
            err,
            ArenaError::SizeOverflow {
                size: usize::MAX / 2,
                count: 3
            }
        );
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.stats().oom_events, 1);
    }

    #[test]
    fn exhaustion_with_oom_null_leaves_cursor() {
        let arena = Arena::with_capacity(16);
        arena.alloc_slice::<u8>(10);
        let err = arena.try_alloc_slice::<u8>(7).unwrap_err();
        assert!(matches!(err, ArenaError::OutOfMemory { requested: 7, available: 6 }));
        assert_eq!(arena.used(), 10);
        assert!(arena.try_alloc_slice::<u8>(6).is_ok());
    }

    #[test]
    fn no_init_skips_zeroing() {
        let arena = Arena::with_capacity(256);
        arena.alloc_slice::<u8>(32);
        let zeroed = arena.stats().zeroed_bytes;
        assert_eq!(zeroed, 32);
        let _ = arena.alloc_slice_uninit::<u64>(8);
        let _ = arena.alloc_slice_copy(&[1u8, 2, 3]);
        assert_eq!(arena.stats().zeroed_bytes, zeroed);
        assert_eq!(arena.stats().allocations, 3);
    }

    #[test]
    fn zero_count_allocation_is_valid() {
        let arena = Arena::with_capacity(16);
        let s = arena.alloc_slice::<u64>(0);
        assert!(s.is_empty());
        assert_eq!(arena.used(), 0);
    }

    #[test]
    fn alloc_value_and_copy() {
        let arena = Arena::with_capacity(128);
        let v = arena.alloc_value((1u16, 2u32));
        assert_eq!(*v, (1, 2));
        let c = arena.alloc_slice_copy(&[3i32, 4, 5]);
        assert_eq!(c, &[3, 4, 5]);
    }

    #[test]
    fn try_alloc_value_hands_value_back() {
        let arena = Arena::with_capacity(4);
        let (value, err) = arena.try_alloc_value(String::from("kept")).unwrap_err();
        assert_eq!(value, "kept");
        assert!(err.is_oom());
    }

    #[test]
    fn alloc_raw_from_copies_bytes() {
        let arena = Arena::with_capacity(64);
        let src = [1u16, 2, 3];
        // SAFETY: `src` is readable for 6 bytes.
        let ptr = unsafe { arena.alloc_raw_from(2, 2, 3, src.as_ptr().cast()) };
        // SAFETY: three u16s were just copied there.
        let copy = unsafe { slice::from_raw_parts(ptr.as_ptr().cast::<u16>(), 3) };
        assert_eq!(copy, &src);
    }

    #[test]
    #[should_panic(expected = "cannot be null")]
    fn alloc_raw_from_null_panics() {
        let arena = Arena::with_capacity(64);
        // SAFETY: panics before reading.
        unsafe { arena.alloc_raw_from(1, 1, 1, std::ptr::null()) };
    }

    #[test]
    fn malloc_is_max_aligned_and_zeroed() {
        let arena = Arena::with_capacity(256);
        arena.alloc::<u8>();
        let p = arena.malloc(24);
        assert_eq!(p.as_ptr() as usize % MAX_ALIGN, 0);
        // SAFETY: 24 zeroed bytes were just handed out.
        let bytes = unsafe { slice::from_raw_parts(p.as_ptr(), 24) };
        assert!(bytes.iter().all(|&b| b == 0));
    }

    #[test]
    fn free_rewinds_only_at_tip() {
        let arena = Arena::with_capacity(256);
        let a = arena.malloc(16).as_ptr();
        let b = arena.malloc(16).as_ptr();
        let used = arena.used();

        // SAFETY: neither pointer is dereferenced afterwards.
        unsafe { arena.free(a, 16) };
        assert_eq!(arena.used(), used);

        // SAFETY: as above.
        unsafe { arena.free(b, 16) };
        assert_eq!(arena.used(), used - 16);
        assert_eq!(arena.tip(), b.cast_const());

        // SAFETY: null is ignored.
        unsafe { arena.free(std::ptr::null(), 16) };
        assert_eq!(arena.used(), used - 16);
    }

    #[test]
    fn ends_at_tip_tracks_last_allocation() {
        let arena = Arena::with_capacity(64);
        let a = arena.alloc_slice::<u8>(4);
        let (ptr, len) = (a.as_ptr(), a.len());
        assert!(arena.ends_at_tip(ptr, len));
        arena.alloc::<u8>();
        assert!(!arena.ends_at_tip(ptr, len));
    }

    #[test]
    fn arena_can_move_to_another_thread() {
        let arena = Arena::with_capacity(64);
        let used = std::thread::spawn(move || {
            arena.alloc_slice::<u32>(2);
            arena.used()
        })
        .join()
        .unwrap();
        assert_eq!(used, 8);
    }

    #[cfg(not(miri))]
    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn allocations_are_aligned_and_disjoint(
                reqs in proptest::collection::vec((1usize..64, 0u32..7, 0usize..8), 1..40),
            ) {
                let arena = Arena::with_capacity(64 * 1024);
                let mut ranges: Vec<(usize, usize)> = Vec::new();
                let mut last_cursor = arena.used();
                for (size, align_log, count) in reqs {
                    let align = 1usize << align_log;
                    let ptr = arena.alloc_raw(size, align, count, AllocFlags::OOM_NULL).unwrap();
                    let start = ptr.as_ptr() as usize;
                    prop_assert_eq!(start % align, 0);
                    prop_assert!(arena.used() >= last_cursor);
                    last_cursor = arena.used();
                    let end = start + size * count;
                    for &(s, e) in &ranges {
                        prop_assert!(end <= s || start >= e || start == end);
                    }
                    ranges.push((start, end));
                }
            }

            #[test]
            fn zeroed_bytes_match_requested_bytes(
                counts in proptest::collection::vec(0usize..100, 1..20),
            ) {
                let arena = Arena::with_capacity(16 * 1024);
                for &n in &counts {
                    let s = arena.alloc_slice::<u8>(n);
                    prop_assert!(s.iter().all(|&b| b == 0));
                }
                let total: usize = counts.iter().sum();
                prop_assert_eq!(arena.stats().zeroed_bytes, total as u64);
            }
        }
    }
}
