//! Per-thread default arena.
//!
//! Each thread lazily gets its own [`Arena::new`] on first use. Shared
//! access goes through [`with_thread_arena`]; rewinding needs exclusive
//! access, so calling [`reset_thread_arena`] or [`restore_thread_arena`]
//! from inside a `with_thread_arena` closure panics.

use std::cell::{OnceCell, RefCell};

use crate::arena::Arena;
use crate::scratch::Checkpoint;

thread_local! {
    static THREAD_ARENA: OnceCell<RefCell<Arena>> = const { OnceCell::new() };
}

fn with_cell<R>(f: impl FnOnce(&RefCell<Arena>) -> R) -> R {
    THREAD_ARENA.with(|cell| f(cell.get_or_init(|| RefCell::new(Arena::new()))))
}

/// Run `f` with this thread's arena.
///
/// Allocations cannot leave the closure; copy out what must survive.
///
/// ```
/// let n = strata_arena::with_thread_arena(|arena| arena.alloc_slice::<u8>(16).len());
/// assert_eq!(n, 16);
/// ```
#[track_caller]
pub fn with_thread_arena<R>(f: impl FnOnce(&Arena) -> R) -> R {
    with_cell(|cell| f(&cell.borrow()))
}

/// Reset this thread's arena.
///
/// # Panics
///
/// Panics if called from inside [`with_thread_arena`].
#[track_caller]
pub fn reset_thread_arena() {
    with_cell(|cell| cell.borrow_mut().reset());
}

/// Checkpoint of this thread's arena.
pub fn thread_checkpoint() -> Checkpoint {
    with_cell(|cell| cell.borrow().checkpoint())
}

/// Restore this thread's arena to `cp`.
///
/// # Panics
///
/// Panics if called from inside [`with_thread_arena`], or if `cp` was
/// not taken on this thread (see [`Arena::restore`]).
#[track_caller]
pub fn restore_thread_arena(cp: Checkpoint) {
    with_cell(|cell| cell.borrow_mut().restore(cp));
}

#[cfg(all(test, unix, not(miri)))]
mod tests {
    use super::*;

    #[test]
    fn thread_arena_persists_between_calls() {
        reset_thread_arena();
        with_thread_arena(|a| {
            a.alloc::<u64>();
        });
        assert_eq!(with_thread_arena(Arena::used), 8);
        reset_thread_arena();
        assert_eq!(with_thread_arena(Arena::used), 0);
    }

    #[test]
    fn checkpoint_round_trip() {
        let cp = thread_checkpoint();
        with_thread_arena(|a| {
            a.alloc_slice::<u8>(100);
        });
        restore_thread_arena(cp);
        assert_eq!(thread_checkpoint(), cp);
    }

    #[test]
    fn threads_get_distinct_arenas() {
        with_thread_arena(|a| {
            a.alloc::<u32>();
        });
        let used = std::thread::spawn(|| with_thread_arena(Arena::used))
            .join()
            .unwrap();
        assert_eq!(used, 0);
    }

    #[test]
    #[should_panic(expected = "already borrowed")]
    fn reset_inside_closure_panics() {
        with_thread_arena(|_| reset_thread_arena());
    }
}
