//! Checkpoints and scratch scopes.
//!
//! A [`Checkpoint`] records the cursor; [`Arena::restore`] rewinds to it and
//! poisons everything handed out since. [`Arena::scratch`] packages the same
//! round trip as an RAII guard: allocations made through the [`Scratch`]
//! are released when it drops, on every exit path including unwinding.
//!
//! While a scope is active the parent arena is locked. Allocating through
//! the parent (directly, or by growing an `ArenaVec` that borrows it)
//! panics, because the memory would be reclaimed when the scope ends.

use std::cell::Cell;
use std::fmt;
use std::ops::Deref;

use crate::arena::{Access, Arena, ArenaId};

/// Saved allocation state of an arena.
///
/// Only meaningful for the arena it was taken from; restoring it anywhere
/// else panics.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Checkpoint {
    arena: ArenaId,
    cursor: usize,
    limit: usize,
}

impl Checkpoint {
    /// Bytes in use when the checkpoint was taken, relative to the region
    /// base.
    pub fn offset(&self) -> usize {
        self.cursor
    }

    /// Committed window when the checkpoint was taken.
    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Arena {
    /// Record the current cursor.
    pub fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            arena: self.id,
            cursor: self.cursor.get(),
            limit: self.limit.get(),
        }
    }

    /// Rewind to `cp`, poisoning `[cp, limit)`.
    ///
    /// The committed window is kept even if it grew after the checkpoint.
    ///
    /// # Panics
    ///
    /// Panics if `cp` belongs to another arena, lies beyond the current
    /// cursor, or predates the beginning of this arena.
    #[track_caller]
    pub fn restore(&mut self, cp: Checkpoint) {
        assert_eq!(cp.arena, self.id, "checkpoint belongs to a different arena");
        let cursor = self.cursor.get();
        assert!(
            cp.cursor <= cursor,
            "checkpoint at {} lies beyond the cursor at {cursor}",
            cp.cursor
        );
        assert!(
            cp.cursor >= self.floor,
            "checkpoint at {} predates this arena (begins at {})",
            cp.cursor,
            self.floor
        );
        self.hooks.poison(
            self.base().as_ptr().wrapping_add(cp.cursor),
            self.limit.get() - cp.cursor,
        );
        self.cursor.set(cp.cursor);
        self.bump_stats(|s| s.rewinds += 1);
        tracing::trace!(released = cursor - cp.cursor, "arena restored to checkpoint");
    }

    /// Open a scratch scope.
    ///
    /// The returned guard derefs to an arena that allocates after the
    /// current tip. Everything allocated through it is released, and
    /// poisoned, when the guard drops. Scopes nest.
    ///
    /// ```
    /// use strata_arena::Arena;
    ///
    /// let arena = Arena::with_capacity(1024);
    /// let kept = arena.alloc_slice_copy(b"kept");
    /// {
    ///     let scratch = arena.scratch();
    ///     let tmp = scratch.alloc_slice::<u32>(64);
    ///     tmp[0] = 1;
    /// }
    /// assert_eq!(arena.used(), 4);
    /// assert_eq!(kept, b"kept");
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if the arena is already locked by another scope or a
    /// temporary C string.
    #[track_caller]
    pub fn scratch(&self) -> Scratch<'_> {
        self.assert_open();
        let start = self.checkpoint();
        self.access.set(Access::Scoped);
        let child = Arena {
            region: self.region.alias(),
            cursor: Cell::new(start.cursor),
            floor: start.cursor,
            limit: Cell::new(start.limit),
            id: self.id,
            access: Cell::new(Access::Open),
            hooks: self.hooks,
            stats: Cell::new(self.stats.get()),
        };
        Scratch {
            parent: self,
            child,
            start,
        }
    }
}

/// RAII scratch scope; see [`Arena::scratch`].
///
/// There is no `DerefMut`: the inner arena cannot be swapped out or reset
/// past the scope's beginning. Use [`Scratch::reset`] and
/// [`Scratch::restore`] to rewind within the scope.
pub struct Scratch<'a> {
    parent: &'a Arena,
    child: Arena,
    start: Checkpoint,
}

impl Scratch<'_> {
    /// Release everything allocated in this scope so far.
    pub fn reset(&mut self) {
        self.child.reset();
    }

    /// Rewind this scope to a checkpoint taken inside it.
    #[track_caller]
    pub fn restore(&mut self, cp: Checkpoint) {
        self.child.restore(cp);
    }

    /// The checkpoint the parent is restored to on drop.
    pub fn start(&self) -> Checkpoint {
        self.start
    }
}

impl Deref for Scratch<'_> {
    type Target = Arena;

    fn deref(&self) -> &Arena {
        &self.child
    }
}

impl Drop for Scratch<'_> {
    fn drop(&mut self) {
        let child = &self.child;
        let parent = self.parent;
        let limit = child.limit.get();
        child.hooks.poison(
            child.base().as_ptr().wrapping_add(self.start.cursor),
            limit - self.start.cursor,
        );
        // Chunks committed inside the scope stay committed.
        parent.limit.set(limit);
        let mut stats = child.stats.get();
        stats.rewinds += 1;
        parent.stats.set(stats);
        debug_assert_eq!(parent.cursor.get(), self.start.cursor);
        parent.access.set(Access::Open);
        tracing::trace!(
            released = child.cursor.get() - self.start.cursor,
            "scratch scope closed"
        );
    }
}

impl fmt::Debug for Scratch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scratch")
            .field("start", &self.start.cursor)
            .field("used", &self.child.used())
            .finish()
    }
}
