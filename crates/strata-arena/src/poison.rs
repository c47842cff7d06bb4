//! Memory-poisoning hooks for lifetime instrumentation.
//!
//! The arena calls [`PoisonHooks::poison`] on every range it stops handing
//! out (reset, checkpoint restore, tip free, freshly committed chunks) and
//! [`PoisonHooks::unpoison`] on every range it hands out. By default both are
//! no-ops. Instrumented builds inject their own pair, e.g. forwarding to
//! AddressSanitizer (see the `asan` feature) or recording ranges in tests.

#![allow(unsafe_code)]

/// Signature of a poison/unpoison callback: start address and byte length.
pub type PoisonFn = fn(*const u8, usize);

/// A pair of callbacks marking address ranges inaccessible/accessible.
#[derive(Clone, Copy, Debug)]
pub struct PoisonHooks {
    /// Called on ranges that become invalid to access.
    pub poison: PoisonFn,
    /// Called on ranges that become valid to access.
    pub unpoison: PoisonFn,
}

fn noop(_addr: *const u8, _len: usize) {}

impl PoisonHooks {
    /// Hooks that do nothing.
    pub const NOOP: Self = Self {
        poison: noop,
        unpoison: noop,
    };

    /// Hooks that forward to the AddressSanitizer manual poisoning API.
    ///
    /// Only link this into binaries built with `-Zsanitizer=address`.
    #[cfg(feature = "asan")]
    pub const ASAN: Self = Self {
        poison: asan::poison,
        unpoison: asan::unpoison,
    };

    /// The hooks new arenas start with.
    ///
    /// [`PoisonHooks::ASAN`] with the `asan` feature, otherwise
    /// [`PoisonHooks::NOOP`].
    pub const fn platform_default() -> Self {
        #[cfg(feature = "asan")]
        {
            Self::ASAN
        }
        #[cfg(not(feature = "asan"))]
        {
            Self::NOOP
        }
    }

    #[inline]
    pub(crate) fn poison(&self, addr: *const u8, len: usize) {
        if len != 0 {
            (self.poison)(addr, len);
        }
    }

    #[inline]
    pub(crate) fn unpoison(&self, addr: *const u8, len: usize) {
        if len != 0 {
            (self.unpoison)(addr, len);
        }
    }
}

impl Default for PoisonHooks {
    fn default() -> Self {
        Self::platform_default()
    }
}

#[cfg(feature = "asan")]
mod asan {
    extern "C" {
        fn __asan_poison_memory_region(addr: *const u8, size: usize);
        fn __asan_unpoison_memory_region(addr: *const u8, size: usize);
    }

    pub(super) fn poison(addr: *const u8, len: usize) {
        // SAFETY: the sanitizer runtime only records shadow state for the range.
        unsafe { __asan_poison_memory_region(addr, len) }
    }

    pub(super) fn unpoison(addr: *const u8, len: usize) {
        // SAFETY: as above.
        unsafe { __asan_unpoison_memory_region(addr, len) }
    }
}
