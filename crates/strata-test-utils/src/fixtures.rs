//! Arena fixtures shared by integration tests.

use strata_arena::{Arena, ArenaConfig};

use crate::recording_hooks;

/// Fixed arena of `bytes` with recording poison hooks.
pub fn fixed_arena(bytes: usize) -> Arena {
    Arena::with_capacity(bytes).with_poison_hooks(recording_hooks())
}

/// Config committing one page at a time out of a `pages`-page reservation.
pub fn one_page_chunks(pages: usize) -> ArenaConfig {
    ArenaConfig {
        commit_page_count: 1,
        reserve_page_count: pages,
        buffer_bytes: 4096 * pages,
    }
}

/// Small commit-on-demand arena (one-page chunks, 16 pages reserved) with
/// recording poison hooks. A fixed arena of the same size elsewhere.
pub fn small_commit_arena() -> Arena {
    Arena::from_config(&one_page_chunks(16)).with_poison_hooks(recording_hooks())
}
