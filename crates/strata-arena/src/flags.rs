//! Per-call allocation flags.

bitflags::bitflags! {
    /// Flags that modify a single allocation request.
    ///
    /// The empty set (the default) means: zero the returned memory, and
    /// escalate out-of-memory to the arena's recovery point.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
    pub struct AllocFlags: u8 {
        /// Do not zero the returned memory.
        const NO_INIT = 1 << 0;
        /// Return `Err` on OOM instead of escalating.
        const OOM_NULL = 1 << 1;
    }
}

impl AllocFlags {
    /// Zero-fill and escalate on OOM.
    pub const NONE: Self = Self::empty();
}
