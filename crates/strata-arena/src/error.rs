//! Arena-specific error types.

use std::error::Error;
use std::fmt;

/// Errors that can occur during arena operations.
///
/// Contract violations (non-power-of-two alignment, out-of-range slices,
/// null copy sources) are not represented here: they panic at the call site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// The request does not fit and the arena cannot grow any further.
    OutOfMemory {
        /// Number of bytes requested, including alignment padding.
        requested: usize,
        /// Bytes left in the committed window when the request failed.
        available: usize,
    },
    /// `size * count` (or the padded total) overflowed `usize`.
    ///
    /// Handled exactly like [`ArenaError::OutOfMemory`]; never wraps.
    SizeOverflow {
        /// Element size in bytes.
        size: usize,
        /// Requested element count.
        count: usize,
    },
    /// Reserving the address range for a commit-on-demand arena failed.
    ReserveFailed {
        /// Size of the attempted reservation in bytes.
        bytes: usize,
        /// OS error number, if one was reported.
        errno: i32,
    },
    /// Committing a chunk of the reserved range failed.
    CommitFailed {
        /// Size of the attempted commit in bytes.
        bytes: usize,
        /// OS error number, if one was reported.
        errno: i32,
    },
}

impl ArenaError {
    /// Whether this error belongs to the out-of-memory class.
    ///
    /// Size overflow counts as out-of-memory.
    pub fn is_oom(&self) -> bool {
        matches!(self, Self::OutOfMemory { .. } | Self::SizeOverflow { .. })
    }
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfMemory {
                requested,
                available,
            } => {
                write!(
                    f,
                    "arena out of memory: requested {requested} bytes, {available} bytes available"
                )
            }
            Self::SizeOverflow { size, count } => {
                write!(f, "allocation size overflow: {count} elements of {size} bytes")
            }
            Self::ReserveFailed { bytes, errno } => {
                write!(f, "failed to reserve {bytes} bytes of address space (errno {errno})")
            }
            Self::CommitFailed { bytes, errno } => {
                write!(f, "failed to commit {bytes} bytes (errno {errno})")
            }
        }
    }
}

impl Error for ArenaError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overflow_is_oom_class() {
        assert!(ArenaError::SizeOverflow { size: 2, count: usize::MAX }.is_oom());
        assert!(ArenaError::OutOfMemory { requested: 8, available: 0 }.is_oom());
        assert!(!ArenaError::ReserveFailed { bytes: 8, errno: 12 }.is_oom());
    }

    #[test]
    fn display_mentions_sizes() {
        let msg = ArenaError::OutOfMemory { requested: 64, available: 3 }.to_string();
        assert!(msg.contains("64"));
        assert!(msg.contains('3'));
    }
}
