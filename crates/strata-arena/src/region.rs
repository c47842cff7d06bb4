//! Backing storage for arenas: fixed buffers and commit-on-demand ranges.
//!
//! A [`Region`] owns the raw bytes an [`Arena`] bumps through. Two kinds
//! exist:
//!
//! - **Fixed:** a heap buffer handed over at construction. The committed
//!   window is the whole buffer and never moves.
//! - **Virtual** (unix): a large address range reserved with no access
//!   rights, made usable one chunk at a time by [`Arena::grow_commit`].
//!
//! ```text
//! base                 limit                          base + reserved
//! │ committed chunks    │ reserved, not yet committed   │
//! └─────────────────────┴───────────────────────────────┘
//! ```

#![allow(unsafe_code)]

use std::alloc::{self, Layout};
use std::cell::Cell;
use std::ptr::NonNull;

use crate::arena::{Access, Arena, ArenaId, ArenaStats, MAX_ALIGN};
use crate::config::ArenaConfig;
use crate::error::ArenaError;
use crate::poison::PoisonHooks;
#[cfg(unix)]
use crate::raw::{self, os};

/// How the bytes behind a [`Region`] were obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RegionKind {
    /// A buffer of `len` bytes: a caller's `Box<[u8]>` when `boxed`,
    /// otherwise a zeroed heap block aligned to [`MAX_ALIGN`].
    Fixed { len: usize, boxed: bool },
    /// A reservation of `reserved` bytes committed `chunk` bytes at a time.
    #[cfg(unix)]
    Virtual { reserved: usize, chunk: usize },
}

/// Raw byte range owned by an arena.
///
/// Scratch scopes hold non-owning aliases of their parent's region; only
/// the owning region releases memory on drop.
pub(crate) struct Region {
    base: NonNull<u8>,
    kind: RegionKind,
    owned: bool,
}

impl Region {
    /// Take ownership of a boxed buffer.
    pub(crate) fn fixed(buf: Box<[u8]>) -> Self {
        let len = buf.len();
        let raw = Box::into_raw(buf);
        Self {
            // Box pointers are never null (empty boxes are dangling, not null).
            base: NonNull::new(raw.cast::<u8>()).unwrap_or(NonNull::dangling()),
            kind: RegionKind::Fixed { len, boxed: true },
            owned: true,
        }
    }

    /// Allocate a zeroed, [`MAX_ALIGN`]-aligned buffer of `len` bytes.
    pub(crate) fn heap(len: usize) -> Self {
        let base = if len == 0 {
            // Never dereferenced: a zero-length window hands out nothing.
            NonNull::new(std::ptr::without_provenance_mut(MAX_ALIGN)).unwrap_or(NonNull::dangling())
        } else {
            let layout = heap_layout(len);
            // SAFETY: `layout` has a non-zero size.
            let ptr = unsafe { alloc::alloc_zeroed(layout) };
            NonNull::new(ptr).unwrap_or_else(|| alloc::handle_alloc_error(layout))
        };
        Self {
            base,
            kind: RegionKind::Fixed { len, boxed: false },
            owned: true,
        }
    }

    /// Reserve the configured address range and commit its first chunk.
    #[cfg(unix)]
    pub(crate) fn reserve(config: &ArenaConfig) -> Result<Self, ArenaError> {
        let page_size = os::page_size();
        let chunk = config
            .chunk_bytes(page_size)
            .filter(|&c| c > 0)
            .ok_or(ArenaError::SizeOverflow {
                size: page_size,
                count: config.commit_page_count,
            })?;
        let reserved = config
            .reserve_bytes(page_size)
            .ok_or(ArenaError::SizeOverflow {
                size: page_size,
                count: config.reserve_page_count,
            })?
            .max(chunk);

        let base = os::reserve(reserved).ok_or_else(|| ArenaError::ReserveFailed {
            bytes: reserved,
            errno: raw::last_errno(),
        })?;
        // SAFETY: the first chunk lies inside the reservation just made.
        if !unsafe { os::commit(base, chunk) } {
            let errno = raw::last_errno();
            // SAFETY: the reservation is unused and released exactly once.
            unsafe { os::release(base, reserved) };
            return Err(ArenaError::CommitFailed {
                bytes: chunk,
                errno,
            });
        }
        tracing::debug!(reserved, chunk, "reserved commit-on-demand region");
        Ok(Self {
            base,
            kind: RegionKind::Virtual { reserved, chunk },
            owned: true,
        })
    }

    /// A non-owning copy used by scratch scopes.
    pub(crate) fn alias(&self) -> Self {
        Self {
            base: self.base,
            kind: self.kind,
            owned: false,
        }
    }

    #[inline]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    /// Bytes usable right after construction.
    pub(crate) fn initial_limit(&self) -> usize {
        match self.kind {
            RegionKind::Fixed { len, .. } => len,
            #[cfg(unix)]
            RegionKind::Virtual { chunk, .. } => chunk,
        }
    }

    /// Upper bound the committed window can ever reach.
    #[inline]
    pub(crate) fn max_limit(&self) -> usize {
        match self.kind {
            RegionKind::Fixed { len, .. } => len,
            #[cfg(unix)]
            RegionKind::Virtual { reserved, .. } => reserved,
        }
    }

    pub(crate) fn chunk_size(&self) -> Option<usize> {
        match self.kind {
            RegionKind::Fixed { .. } => None,
            #[cfg(unix)]
            RegionKind::Virtual { chunk, .. } => Some(chunk),
        }
    }

    /// Commit the chunk starting at `limit`, returning the new limit.
    ///
    /// The last chunk is clamped to the end of the reservation.
    fn commit_next(&self, limit: usize) -> Result<usize, ArenaError> {
        match self.kind {
            RegionKind::Fixed { .. } => Err(ArenaError::OutOfMemory {
                requested: 0,
                available: 0,
            }),
            #[cfg(unix)]
            RegionKind::Virtual { reserved, chunk } => {
                let len = chunk.min(reserved - limit);
                if len == 0 {
                    return Err(ArenaError::OutOfMemory {
                        requested: chunk,
                        available: 0,
                    });
                }
                // SAFETY: `limit < reserved`, so the chunk start is inside
                // the reservation and non-null.
                let start = unsafe { NonNull::new_unchecked(self.base.as_ptr().add(limit)) };
                // SAFETY: `[limit, limit + len)` lies inside the reservation.
                if unsafe { os::commit(start, len) } {
                    Ok(limit + len)
                } else {
                    Err(ArenaError::CommitFailed {
                        bytes: len,
                        errno: raw::last_errno(),
                    })
                }
            }
        }
    }

    /// Drop physical backing of `[0, limit)`; no-op for fixed buffers.
    fn decommit(&self, limit: usize) {
        match self.kind {
            RegionKind::Fixed { .. } => {}
            #[cfg(unix)]
            RegionKind::Virtual { .. } => {
                if limit != 0 {
                    // SAFETY: the committed window lies inside the
                    // reservation; the caller holds `&mut Arena`.
                    unsafe { os::decommit(self.base, limit) };
                }
            }
        }
    }
}

fn heap_layout(len: usize) -> Layout {
    match Layout::from_size_align(len, MAX_ALIGN) {
        Ok(layout) => layout,
        Err(_) => panic!("arena capacity of {len} bytes is too large"),
    }
}

impl Drop for Region {
    fn drop(&mut self) {
        if !self.owned {
            return;
        }
        match self.kind {
            RegionKind::Fixed { len, boxed: true } => {
                let slice = std::ptr::slice_from_raw_parts_mut(self.base.as_ptr(), len);
                // SAFETY: `slice` is exactly the pointer produced by
                // `Box::into_raw` in `Region::fixed`, released once.
                drop(unsafe { Box::from_raw(slice) });
            }
            RegionKind::Fixed { len: 0, boxed: false } => {}
            RegionKind::Fixed { len, boxed: false } => {
                // SAFETY: allocated in `Region::heap` with this layout.
                unsafe { alloc::dealloc(self.base.as_ptr(), heap_layout(len)) };
            }
            #[cfg(unix)]
            RegionKind::Virtual { reserved, .. } => {
                // SAFETY: owned reservation, released once, no aliases left
                // (scratch aliases borrow the owning arena).
                unsafe { os::release(self.base, reserved) };
            }
        }
    }
}

impl Arena {
    pub(crate) fn from_region(region: Region) -> Self {
        let limit = region.initial_limit();
        let arena = Self {
            cursor: Cell::new(0),
            floor: 0,
            limit: Cell::new(limit),
            id: ArenaId::next(),
            access: Cell::new(Access::Open),
            hooks: PoisonHooks::platform_default(),
            stats: Cell::new(ArenaStats::default()),
            region,
        };
        arena.hooks.poison(arena.base().as_ptr(), limit);
        arena
    }

    /// Fixed-capacity arena over a caller-supplied buffer.
    ///
    /// The arena never grows: once the buffer is exhausted every request
    /// takes the out-of-memory path. The buffer is freed when the arena is
    /// dropped, or handed back by [`Arena::into_buffer`].
    pub fn with_buffer(buf: Box<[u8]>) -> Self {
        Self::from_region(Region::fixed(buf))
    }

    /// Fixed-capacity arena over a fresh zeroed heap buffer of `bytes`,
    /// aligned to [`MAX_ALIGN`].
    ///
    /// # Panics
    ///
    /// Panics if `bytes` exceeds `isize::MAX` once rounded to
    /// [`MAX_ALIGN`].
    pub fn with_capacity(bytes: usize) -> Self {
        Self::from_region(Region::heap(bytes))
    }

    /// Commit-on-demand arena.
    ///
    /// Reserves `config.reserve_page_count` pages of address space without
    /// backing them, then commits the first `config.commit_page_count`
    /// pages. Further chunks are committed as allocations need them.
    ///
    /// # Panics
    ///
    /// Panics if the reservation or the initial commit fails; there is no
    /// arena yet to route the failure through. Use [`Arena::try_reserve`]
    /// to handle it instead.
    #[cfg(unix)]
    pub fn reserve(config: &ArenaConfig) -> Self {
        match Self::try_reserve(config) {
            Ok(arena) => arena,
            Err(err) => {
                tracing::error!(%err, "arena reservation failed");
                panic!("arena reservation failed: {err}");
            }
        }
    }

    /// Fallible form of [`Arena::reserve`].
    #[cfg(unix)]
    pub fn try_reserve(config: &ArenaConfig) -> Result<Self, ArenaError> {
        Region::reserve(config).map(Self::from_region)
    }

    /// Arena with the platform default backing.
    ///
    /// [`Arena::from_config`] with [`ArenaConfig::default`].
    pub fn new() -> Self {
        Self::from_config(&ArenaConfig::default())
    }

    /// Arena built from `config`: commit-on-demand on unix, a fixed
    /// `config.buffer_bytes` buffer elsewhere.
    pub fn from_config(config: &ArenaConfig) -> Self {
        #[cfg(unix)]
        {
            Self::reserve(config)
        }
        #[cfg(not(unix))]
        {
            Self::with_capacity(config.buffer_bytes)
        }
    }

    /// Replace the poison hooks, poisoning the currently unused window.
    pub fn with_poison_hooks(mut self, hooks: PoisonHooks) -> Self {
        self.hooks = hooks;
        let cursor = self.cursor.get();
        self.hooks.poison(self.tip(), self.limit.get() - cursor);
        self
    }

    /// Commit one more chunk of the reservation.
    ///
    /// Returns `false` for fixed arenas, when the reservation is used up,
    /// or when the OS refuses the commit. This is the only way the
    /// committed window grows after construction.
    ///
    /// # Panics
    ///
    /// Panics if a scratch scope or temporary C string currently locks
    /// the arena.
    pub fn grow_commit(&self) -> bool {
        self.assert_open();
        let limit = self.limit.get();
        match self.region.commit_next(limit) {
            Ok(new_limit) => {
                self.limit.set(new_limit);
                self.hooks.poison(
                    self.base().as_ptr().wrapping_add(limit),
                    new_limit - limit,
                );
                self.bump_stats(|s| s.commits += 1);
                tracing::debug!(committed = new_limit, "arena committed another chunk");
                true
            }
            Err(err) => {
                if !self.is_fixed() {
                    tracing::debug!(%err, "arena commit refused");
                }
                false
            }
        }
    }

    /// Release the physical pages behind the committed window.
    ///
    /// The arena stays usable; decommitted bytes read back as zero. A
    /// no-op for fixed arenas.
    pub fn decommit(&mut self) {
        self.region.decommit(self.limit.get());
        tracing::debug!(bytes = self.limit.get(), "arena decommitted");
    }

    /// Rewind the cursor to the beginning, invalidating every allocation.
    ///
    /// The committed window is kept. `[begin, limit)` is poisoned.
    pub fn reset(&mut self) {
        let begin = self.floor;
        self.hooks.poison(
            self.base().as_ptr().wrapping_add(begin),
            self.limit.get() - begin,
        );
        self.cursor.set(begin);
        self.bump_stats(|s| s.rewinds += 1);
        tracing::trace!("arena reset");
    }

    /// Whether this arena has a fixed buffer (no commit-on-demand).
    pub fn is_fixed(&self) -> bool {
        self.region.chunk_size().is_none()
    }

    /// Commit chunk size in bytes, or `None` for fixed arenas.
    pub fn chunk_size(&self) -> Option<usize> {
        self.region.chunk_size()
    }

    /// Largest committed window this arena can reach, in bytes.
    pub fn reserved(&self) -> usize {
        self.region.max_limit()
    }

    /// Hand back the buffer of a fixed arena.
    ///
    /// Returns `Err(self)` unless the arena was built by
    /// [`Arena::with_buffer`].
    pub fn into_buffer(self) -> Result<Box<[u8]>, Self> {
        let kind = self.region.kind;
        match kind {
            RegionKind::Fixed { len, boxed: true } if self.region.owned && self.floor == 0 => {
                let mut this = self;
                this.region.owned = false;
                let slice = std::ptr::slice_from_raw_parts_mut(this.region.base.as_ptr(), len);
                // SAFETY: ownership of the `Box::into_raw` pointer moves out
                // here; the region was disowned so it is not freed twice.
                Ok(unsafe { Box::from_raw(slice) })
            }
            _ => Err(self),
        }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_arena_reports_capacity() {
        let arena = Arena::with_capacity(256);
        assert!(arena.is_fixed());
        assert_eq!(arena.capacity(), 256);
        assert_eq!(arena.reserved(), 256);
        assert_eq!(arena.chunk_size(), None);
    }

    #[test]
    fn fixed_arena_never_grows() {
        let arena = Arena::with_capacity(64);
        assert!(!arena.grow_commit());
        assert_eq!(arena.capacity(), 64);
    }

    #[test]
    fn into_buffer_returns_the_same_bytes() {
        let arena = Arena::with_buffer(vec![0u8; 32].into_boxed_slice());
        arena.alloc_slice_copy(&[9u8, 8, 7]);
        let buf = arena.into_buffer().unwrap();
        assert_eq!(buf.len(), 32);
        assert_eq!(&buf[..3], &[9, 8, 7]);
    }

    #[test]
    fn with_capacity_is_max_aligned() {
        let arena = Arena::with_capacity(48);
        assert_eq!(arena.tip() as usize % MAX_ALIGN, 0);
        assert!(arena.into_buffer().is_err());
    }

    #[test]
    fn into_buffer_keeps_heap_blocks_in_the_arena() {
        let arena = Arena::with_capacity(64);
        arena.alloc_slice_copy(b"abc");
        let arena = match arena.into_buffer() {
            Ok(_) => panic!("a heap block is not a boxed buffer"),
            Err(arena) => arena,
        };
        assert_eq!(arena.used(), 3);
        let empty = Arena::with_capacity(0);
        assert!(empty.into_buffer().is_err());
        let boxed = Arena::with_buffer(Box::default());
        assert_eq!(boxed.into_buffer().map(|b| b.len()).ok(), Some(0));
    }

    #[test]
    fn empty_buffer_is_valid() {
        let arena = Arena::with_capacity(0);
        assert_eq!(arena.capacity(), 0);
        assert!(arena.try_alloc::<u8>().is_err());
    }

    #[test]
    fn reset_rewinds_without_changing_limit() {
        let mut arena = Arena::with_capacity(128);
        arena.alloc_slice::<u32>(8);
        assert_eq!(arena.used(), 32);
        arena.reset();
        assert_eq!(arena.used(), 0);
        assert_eq!(arena.capacity(), 128);
        assert_eq!(arena.stats().rewinds, 1);
    }

    #[cfg(all(unix, not(miri)))]
    mod virtual_memory {
        use super::*;

        fn small() -> Arena {
            Arena::reserve(&ArenaConfig {
                commit_page_count: 1,
                reserve_page_count: 4,
                buffer_bytes: 0,
            })
        }

        #[test]
        fn reserve_commits_one_chunk() {
            let arena = small();
            let page = os::page_size();
            assert!(!arena.is_fixed());
            assert_eq!(arena.chunk_size(), Some(page));
            assert_eq!(arena.capacity(), page);
            assert_eq!(arena.reserved(), 4 * page);
        }

        #[test]
        fn grow_commit_extends_limit_until_reservation_ends() {
            let arena = small();
            let page = os::page_size();
            assert!(arena.grow_commit());
            assert!(arena.grow_commit());
            assert!(arena.grow_commit());
            assert_eq!(arena.capacity(), 4 * page);
            assert!(!arena.grow_commit());
            assert_eq!(arena.stats().commits, 3);
        }

        #[test]
        fn decommit_keeps_arena_usable() {
            let mut arena = small();
            arena.alloc_slice_copy(&[1u8, 2, 3]);
            arena.decommit();
            arena.reset();
            let bytes = arena.alloc_slice::<u8>(16);
            assert!(bytes.iter().all(|&b| b == 0));
        }

        #[test]
        fn into_buffer_rejects_virtual_arenas() {
            assert!(small().into_buffer().is_err());
        }
    }
}
