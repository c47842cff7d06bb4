//! Integration test: out-of-memory policies across API layers.

#![cfg(not(feature = "oom-trap"))]

use strata_arena::{AllocFlags, Arena, ArenaError, ArenaVec, StrView};

#[test]
fn recovery_point_with_checkpoint_discards_partial_work() {
    let mut arena = Arena::with_capacity(512);
    arena.alloc_slice::<u8>(64);
    let cp = arena.checkpoint();

    let result = arena.catch_oom(|a| {
        let mut v = ArenaVec::new_in(a);
        for i in 0..10_000u32 {
            v.push(i);
        }
        v.len()
    });
    assert!(result.unwrap_err().is_oom());
    assert!(arena.stats().oom_events >= 1);

    arena.restore(cp);
    assert_eq!(arena.used(), 64);
}

#[test]
fn oom_inside_scratch_unwinds_through_scope() {
    let arena = Arena::with_capacity(256);
    let result = arena.catch_oom(|a| {
        let scratch = a.scratch();
        scratch.alloc_slice::<u8>(128);
        scratch.alloc_slice::<u8>(1024);
    });
    assert!(result.is_err());
    // The scope was closed during the unwind.
    assert_eq!(arena.used(), 0);
    arena.alloc_slice::<u8>(16);
}

#[test]
fn string_ops_escalate_like_allocations() {
    let arena = Arena::with_capacity(8);
    let long = "this does not fit";
    let err = arena
        .catch_oom(|a| a.clone_str(StrView::from(long)).len())
        .unwrap_err();
    assert_eq!(
        err,
        ArenaError::OutOfMemory {
            requested: long.len(),
            available: 8
        }
    );
}

#[test]
fn null_sentinel_never_unwinds() {
    let arena = Arena::with_capacity(16);
    let r = arena.alloc_raw(32, 8, 1, AllocFlags::OOM_NULL | AllocFlags::NO_INIT);
    assert!(r.is_err());
    let mut v = ArenaVec::<u64>::new_in(&arena);
    assert!(v.try_push(1).is_err());
}
