//! Test utilities for strata development.
//!
//! Provides [`recording_hooks`], poison hooks that remember which address
//! ranges are currently poisoned so tests can assert on arena lifetime
//! instrumentation without AddressSanitizer, and a few arena fixtures.

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::cell::RefCell;
use std::collections::BTreeMap;

use strata_arena::PoisonHooks;

thread_local! {
    /// Poisoned ranges as `start -> end`, disjoint and non-adjacent.
    static POISONED: RefCell<BTreeMap<usize, usize>> = const { RefCell::new(BTreeMap::new()) };
}

fn poison(addr: *const u8, len: usize) {
    let (mut start, mut end) = (addr as usize, addr as usize + len);
    POISONED.with_borrow_mut(|set| {
        // Absorb every range that overlaps or touches [start, end).
        let touching: Vec<(usize, usize)> = set
            .range(..=end)
            .rev()
            .take_while(|&(_, &e)| e >= start)
            .map(|(&s, &e)| (s, e))
            .collect();
        for (s, e) in touching {
            set.remove(&s);
            start = start.min(s);
            end = end.max(e);
        }
        set.insert(start, end);
    });
}

fn unpoison(addr: *const u8, len: usize) {
    let (start, end) = (addr as usize, addr as usize + len);
    POISONED.with_borrow_mut(|set| {
        let overlapping: Vec<(usize, usize)> = set
            .range(..end)
            .rev()
            .take_while(|&(_, &e)| e > start)
            .map(|(&s, &e)| (s, e))
            .collect();
        for (s, e) in overlapping {
            set.remove(&s);
            if s < start {
                set.insert(s, start);
            }
            if e > end {
                set.insert(end, e);
            }
        }
    });
}

/// Hooks that record poisoned ranges for the current thread.
pub fn recording_hooks() -> PoisonHooks {
    PoisonHooks { poison, unpoison }
}

/// Whether every byte of `[ptr, ptr + len)` is currently poisoned.
///
/// Empty ranges are never poisoned.
pub fn is_poisoned(ptr: *const u8, len: usize) -> bool {
    if len == 0 {
        return false;
    }
    let (start, end) = (ptr as usize, ptr as usize + len);
    POISONED.with_borrow(|set| {
        set.range(..=start)
            .next_back()
            .is_some_and(|(_, &e)| e >= end)
    })
}

/// Whether any byte of `[ptr, ptr + len)` is currently poisoned.
pub fn any_poisoned(ptr: *const u8, len: usize) -> bool {
    let (start, end) = (ptr as usize, ptr as usize + len);
    POISONED.with_borrow(|set| {
        set.range(..end)
            .next_back()
            .is_some_and(|(_, &e)| e > start)
    })
}

/// Forget every recorded range on this thread.
pub fn clear() {
    POISONED.with_borrow_mut(BTreeMap::clear);
}
