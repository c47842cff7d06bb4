//! Arena configuration parameters.

/// Configuration for commit-on-demand arenas and the per-thread default.
///
/// Controls how much address space is reserved up front, how much of it is
/// made usable per growth step, and the size of fixed fallback buffers.
/// All values are immutable once an arena has been created from them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Number of pages committed per growth step (and at creation).
    ///
    /// Default: 1024 (4MB on 4KB-page systems).
    pub commit_page_count: usize,

    /// Number of pages of address space reserved at creation.
    ///
    /// Default: 1024 * 1024 (4GB on 4KB-page systems). Only committed
    /// chunks consume physical memory.
    pub reserve_page_count: usize,

    /// Size of a fixed arena's buffer in bytes, used when virtual memory
    /// reservation is unavailable on the platform.
    ///
    /// Default: 1MB.
    pub buffer_bytes: usize,
}

impl ArenaConfig {
    /// Default pages per commit chunk.
    pub const DEFAULT_COMMIT_PAGE_COUNT: usize = 1024;

    /// Default pages reserved per arena.
    pub const DEFAULT_RESERVE_PAGE_COUNT: usize = 1024 * Self::DEFAULT_COMMIT_PAGE_COUNT;

    /// Default fixed buffer size: 1MB.
    pub const DEFAULT_BUFFER_BYTES: usize = 1 << 20;

    /// Create a config with the given commit chunk size in pages.
    ///
    /// The reservation keeps the default 1024:1 ratio to the chunk size.
    pub fn with_commit_pages(commit_page_count: usize) -> Self {
        Self {
            commit_page_count,
            reserve_page_count: commit_page_count.saturating_mul(1024),
            buffer_bytes: Self::DEFAULT_BUFFER_BYTES,
        }
    }

    /// Size of one commit chunk in bytes for the given page size.
    ///
    /// Returns `None` if the product overflows `usize`.
    pub fn chunk_bytes(&self, page_size: usize) -> Option<usize> {
        page_size.checked_mul(self.commit_page_count)
    }

    /// Size of the whole reservation in bytes for the given page size.
    ///
    /// Returns `None` if the product overflows `usize`.
    pub fn reserve_bytes(&self, page_size: usize) -> Option<usize> {
        page_size.checked_mul(self.reserve_page_count)
    }
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self::with_commit_pages(Self::DEFAULT_COMMIT_PAGE_COUNT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_chunk_is_4mb_on_4k_pages() {
        let config = ArenaConfig::default();
        assert_eq!(config.chunk_bytes(4096), Some(4 * 1024 * 1024));
    }

    #[test]
    fn default_reservation_is_1024_chunks() {
        let config = ArenaConfig::default();
        assert_eq!(
            config.reserve_bytes(4096),
            Some(1024 * config.chunk_bytes(4096).unwrap())
        );
    }

    #[test]
    fn with_commit_pages_keeps_ratio() {
        let config = ArenaConfig::with_commit_pages(4);
        assert_eq!(config.commit_page_count, 4);
        assert_eq!(config.reserve_page_count, 4096);
        assert_eq!(config.buffer_bytes, ArenaConfig::DEFAULT_BUFFER_BYTES);
    }

    #[test]
    fn overflowing_sizes_are_reported() {
        let config = ArenaConfig::with_commit_pages(usize::MAX);
        assert_eq!(config.chunk_bytes(4096), None);
        assert_eq!(config.reserve_bytes(2), None);
    }
}
