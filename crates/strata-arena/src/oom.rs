//! Out-of-memory escalation and recovery points.
//!
//! Allocation without [`AllocFlags::OOM_NULL`](crate::AllocFlags::OOM_NULL)
//! never returns on failure. If the calling thread is inside
//! [`Arena::catch_oom`] for the same arena, the failure unwinds to that
//! frame and surfaces there as `Err`. Otherwise the process aborts after
//! logging the error. With the `oom-trap` feature every escalation aborts
//! immediately, which keeps the failing frame on the stack for a debugger.
//!
//! Recovery points live on a per-thread stack keyed by arena identity. A
//! scratch scope shares its parent's identity, so a point registered on the
//! parent covers scopes opened before or after it.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};

use crate::arena::{Arena, ArenaId};
use crate::error::ArenaError;

thread_local! {
    static RECOVERY: RefCell<Vec<ArenaId>> = const { RefCell::new(Vec::new()) };
}

/// Unwind payload carrying an arena failure to its recovery point.
struct OomUnwind {
    arena: ArenaId,
    err: ArenaError,
}

fn is_registered(id: ArenaId) -> bool {
    RECOVERY.with(|stack| stack.borrow().contains(&id))
}

/// Apply the out-of-memory policy for `arena`. Never returns.
#[cold]
#[inline(never)]
pub(crate) fn escalate(arena: &Arena, err: ArenaError) -> ! {
    if cfg!(feature = "oom-trap") || !is_registered(arena.id) {
        tracing::error!(%err, used = arena.used(), "unrecoverable arena exhaustion");
        std::process::abort();
    }
    panic::resume_unwind(Box::new(OomUnwind {
        arena: arena.id,
        err,
    }))
}

/// Pops the recovery stack back to `depth`, even when the closure unwinds.
struct DepthGuard {
    depth: usize,
}

impl DepthGuard {
    fn push(id: ArenaId) -> Self {
        let depth = RECOVERY.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(id);
            stack.len() - 1
        });
        Self { depth }
    }
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        RECOVERY.with(|stack| stack.borrow_mut().truncate(self.depth));
    }
}

impl Arena {
    /// Run `f` with a recovery point for this arena.
    ///
    /// An escalating allocation failure inside `f` (on this arena, or on a
    /// scratch scope of it) unwinds back here and is returned as `Err`.
    /// Allocations made by `f` before the failure stay in the arena; pair
    /// this with a checkpoint to discard them. Other panics propagate
    /// unchanged.
    ///
    /// ```
    /// use strata_arena::Arena;
    ///
    /// let arena = Arena::with_capacity(64);
    /// let result = arena.catch_oom(|a| a.alloc_slice::<u8>(1000).len());
    /// assert!(result.unwrap_err().is_oom());
    /// ```
    pub fn catch_oom<R>(&self, f: impl FnOnce(&Arena) -> R) -> Result<R, ArenaError> {
        let guard = DepthGuard::push(self.id);
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        drop(guard);

        match outcome {
            Ok(value) => Ok(value),
            Err(payload) => match payload.downcast::<OomUnwind>() {
                Ok(oom) if oom.arena == self.id => Err(oom.err),
                Ok(oom) => panic::resume_unwind(oom),
                Err(other) => panic::resume_unwind(other),
            },
        }
    }

    /// Whether an escalating failure on this arena would be caught on the
    /// current thread.
    pub fn has_recovery_point(&self) -> bool {
        is_registered(self.id)
    }
}


/// Fatal branch of the policy, observed from a child copy of the test
/// binary.
#[cfg(all(test, unix, not(miri)))]
mod abort_tests {
    use std::process::Command;

    use super::*;

    const CHILD_ENV: &str = "STRATA_ARENA_OOM_CHILD";

    /// Re-run `test` alone in a child process with the child flag set.
    fn run_child(test: &str) -> std::process::ExitStatus {
        let exe = std::env::current_exe().unwrap();
        Command::new(exe)
            .args([test, "--exact", "--nocapture", "--test-threads=1"])
            .env(CHILD_ENV, "1")
            .status()
            .unwrap()
    }

    fn is_child() -> bool {
        std::env::var_os(CHILD_ENV).is_some()
    }

    fn assert_aborted(status: std::process::ExitStatus) {
        use std::os::unix::process::ExitStatusExt;
        assert_eq!(status.signal(), Some(libc::SIGABRT), "child exited with {status}");
    }

    #[test]
    fn exhaustion_without_recovery_point_aborts() {
        if is_child() {
            let arena = Arena::with_capacity(8);
            arena.alloc_slice::<u8>(64);
            return;
        }
        assert_aborted(run_child(
            "oom::abort_tests::exhaustion_without_recovery_point_aborts",
        ));
    }

    #[cfg(feature = "oom-trap")]
    #[test]
    fn trap_aborts_inside_recovery_point() {
        if is_child() {
            let arena = Arena::with_capacity(8);
            let _ = arena.catch_oom(|a| a.alloc_slice::<u8>(64).len());
            return;
        }
        assert_aborted(run_child("oom::abort_tests::trap_aborts_inside_recovery_point"));
    }
}
