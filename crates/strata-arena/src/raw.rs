//! Low-level primitives for arena memory operations.
//!
//! Thin wrappers over the OS virtual-memory calls used by commit-on-demand
//! regions, plus the two pointer copies the growth arbiter needs. Every
//! `unsafe` block carries a `// SAFETY:` comment.

#![allow(unsafe_code)]

use std::io;
use std::ptr::{self, NonNull};

/// Copy `len` bytes from `src` to `dst`; the ranges may overlap.
///
/// # Safety
///
/// `src` must be valid for reads and `dst` valid for writes of `len` bytes.
#[inline]
pub(crate) unsafe fn copy_bytes(src: *const u8, dst: *mut u8, len: usize) {
    // SAFETY: forwarded caller contract; `copy` tolerates overlap.
    unsafe { ptr::copy(src, dst, len) }
}

/// Fill `len` bytes at `dst` with zero.
///
/// # Safety
///
/// `dst` must be valid for writes of `len` bytes.
#[inline]
pub(crate) unsafe fn zero_bytes(dst: *mut u8, len: usize) {
    // SAFETY: forwarded caller contract.
    unsafe { ptr::write_bytes(dst, 0, len) }
}

/// Last OS error number, or 0 if none was reported.
pub(crate) fn last_errno() -> i32 {
    io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

#[cfg(unix)]
pub(crate) mod os {
    use super::*;

    /// The system page size in bytes.
    pub(crate) fn page_size() -> usize {
        // SAFETY: sysconf has no memory-safety preconditions.
        let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if size < 1 {
            4096
        } else {
            size as usize
        }
    }

    /// Reserve `len` bytes of address space with no access rights.
    ///
    /// Nothing is backed by physical memory until [`commit`] is called on
    /// a sub-range.
    pub(crate) fn reserve(len: usize) -> Option<NonNull<u8>> {
        // SAFETY: anonymous private mapping at an address chosen by the
        // kernel; no existing memory is affected.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_NONE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_NORESERVE,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return None;
        }
        NonNull::new(addr.cast::<u8>())
    }

    /// Make `[addr, addr + len)` readable and writable.
    ///
    /// # Safety
    ///
    /// The range must lie inside a reservation returned by [`reserve`].
    pub(crate) unsafe fn commit(addr: NonNull<u8>, len: usize) -> bool {
        // SAFETY: the range is part of our own mapping (caller contract).
        unsafe {
            libc::mprotect(
                addr.as_ptr().cast(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
            ) == 0
        }
    }

    /// Drop the physical pages behind `[addr, addr + len)`.
    ///
    /// The range stays mapped and accessible; it reads back as zero.
    ///
    /// # Safety
    ///
    /// The range must lie inside a reservation returned by [`reserve`] and
    /// no live reference may point into it.
    pub(crate) unsafe fn decommit(addr: NonNull<u8>, len: usize) {
        // SAFETY: the range is part of our own mapping and unreferenced.
        unsafe {
            libc::madvise(addr.as_ptr().cast(), len, libc::MADV_DONTNEED);
        }
    }

    /// Unmap a reservation.
    ///
    /// # Safety
    ///
    /// `addr`/`len` must describe exactly one reservation from [`reserve`],
    /// which must not be used afterwards.
    pub(crate) unsafe fn release(addr: NonNull<u8>, len: usize) {
        // SAFETY: caller contract; the mapping is ours and dead.
        unsafe {
            libc::munmap(addr.as_ptr().cast(), len);
        }
    }
}
