//! Growth of arena-backed dynamic arrays.
//!
//! A sequence whose storage ends exactly at the arena tip grows in place by
//! bumping the cursor; nothing is copied. Any other sequence is relocated.
//! This is what makes append-heavy code cheap on a bump allocator: the
//! array most recently grown keeps sitting at the tip.

#![allow(unsafe_code)]

use crate::arena::Arena;
use crate::error::ArenaError;
use crate::flags::AllocFlags;
use crate::raw;

/// Growth step, in elements per byte of element size.
///
/// A sequence of 4-byte elements grows by 40 elements at a time.
pub const GROWTH_FACTOR: usize = 10;

/// Untyped header of a dynamic array.
///
/// `cap == 0` means the storage is not arena-owned yet: `data` is either
/// dangling (empty sequence) or caller memory holding `len` elements.
#[derive(Clone, Copy, Debug)]
pub struct RawSeq {
    /// First element.
    pub data: *mut u8,
    /// Elements in use.
    pub len: usize,
    /// Elements the storage can hold, or 0 if not arena-owned.
    pub cap: usize,
}

impl RawSeq {
    /// An empty, unowned sequence aligned for `align`.
    pub fn empty(align: usize) -> Self {
        Self {
            data: std::ptr::without_provenance_mut(align),
            len: 0,
            cap: 0,
        }
    }
}

impl Arena {
    /// Grow `seq`, whose elements are `size` bytes aligned to `align`.
    ///
    /// With `inc = GROWTH_FACTOR * size` elements:
    ///
    /// - Not arena-owned (`cap == 0`): allocate room for `len + inc`
    ///   elements and copy the existing ones over.
    /// - Storage ends at the tip: extend it in place by `inc` elements.
    /// - Otherwise: allocate `cap + max(cap / 2, inc)` elements elsewhere
    ///   and copy `len` elements; the old storage is abandoned.
    ///
    /// On failure `seq` is unchanged. Whether failure returns `Err` or
    /// escalates follows `flags`, as for [`Arena::alloc_raw`].
    ///
    /// # Safety
    ///
    /// `seq.data` must be valid for reads of `seq.len * size` bytes and,
    /// when `seq.cap > 0`, must be storage previously produced by this
    /// function on this arena for `seq.cap` elements.
    ///
    /// # Panics
    ///
    /// Panics if `size` is zero.
    #[track_caller]
    pub unsafe fn grow_raw(
        &self,
        seq: &mut RawSeq,
        size: usize,
        align: usize,
        flags: AllocFlags,
    ) -> Result<(), ArenaError> {
        assert!(size > 0, "zero-sized elements never need to grow");
        let flags = flags | AllocFlags::NO_INIT;
        let overflow = || ArenaError::SizeOverflow {
            size,
            count: seq.cap,
        };
        let Some(inc) = size.checked_mul(GROWTH_FACTOR) else {
            return self.fail(overflow(), flags);
        };

        if seq.cap == 0 {
            let Some(cap) = seq.len.checked_add(inc) else {
                return self.fail(overflow(), flags);
            };
            let data = self.alloc_raw(size, align, cap, flags)?.as_ptr();
            if seq.len > 0 {
                // SAFETY: `data` is fresh storage for `cap > len` elements;
                // the source is readable per the caller contract.
                unsafe { raw::copy_bytes(seq.data, data, seq.len * size) };
            }
            *seq = RawSeq {
                data,
                len: seq.len,
                cap,
            };
            return Ok(());
        }

        let Some(bytes) = seq.cap.checked_mul(size) else {
            return self.fail(overflow(), flags);
        };
        if self.ends_at_tip(seq.data, bytes) {
            let Some(cap) = seq.cap.checked_add(inc) else {
                return self.fail(overflow(), flags);
            };
            // Alignment 1: the extension must start exactly at the tip.
            self.alloc_raw(size, 1, inc, flags)?;
            seq.cap = cap;
            return Ok(());
        }

        let Some(cap) = seq
            .cap
            .checked_add((seq.cap / 2).max(inc))
        else {
            return self.fail(overflow(), flags);
        };
        let data = self.alloc_raw(size, align, cap, flags)?.as_ptr();
        // SAFETY: fresh storage cannot overlap the old; `len <= cap`.
        unsafe { raw::copy_bytes(seq.data, data, seq.len * size) };
        seq.data = data;
        seq.cap = cap;
        Ok(())
    }

    #[track_caller]
    fn fail(&self, err: ArenaError, flags: AllocFlags) -> Result<(), ArenaError> {
        tracing::warn!(%err, "dynamic array capacity overflow");
        self.bump_stats(|s| s.oom_events += 1);
        if flags.contains(AllocFlags::OOM_NULL) {
            Err(err)
        } else {
            crate::oom::escalate(self, err)
        }
    }
}
