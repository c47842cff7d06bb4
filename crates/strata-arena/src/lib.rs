//! Region-based bump allocation.
//!
//! An [`Arena`] hands out memory by advancing a cursor through one
//! contiguous byte range and reclaims it all at once: by [`Arena::reset`],
//! by restoring a [`Checkpoint`], or when a [`Scratch`] scope ends.
//!
//! # Architecture
//!
//! ```text
//! Arena
//! ├── Region            fixed buffer, or reserve-then-commit address range
//! ├── allocation core   alloc_raw / typed alloc_* / malloc + tip free
//! ├── oom               OOM_NULL → Err, else unwind to catch_oom or abort
//! ├── scratch           Checkpoint, restore, RAII Scratch scopes
//! ├── growth            RawSeq in-place / relocating growth, ArenaVec
//! └── text              StrView, clone/concat/format, splitting, FNV-1a
//! ```
//!
//! # Lifetimes
//!
//! Allocation takes `&Arena` and returns references borrowing it, so many
//! allocations can be live at once. Rewinding takes `&mut Arena`, so the
//! compiler rejects any use of an allocation after the rewind that frees
//! it. Scratch scopes lock their parent at runtime instead; allocating
//! through a locked parent panics.
//!
//! # Out of memory
//!
//! Requests with [`AllocFlags::OOM_NULL`] and the `try_*` methods return
//! [`ArenaError`]. Everything else escalates: inside
//! [`Arena::catch_oom`] the failure unwinds to that call, otherwise the
//! process aborts. The `oom-trap` feature makes every escalation abort.

#![cfg_attr(feature = "nightly", feature(allocator_api))]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(unsafe_code)]

pub mod adapter;
mod arena;
pub mod config;
pub mod error;
pub mod flags;
pub mod growth;
pub mod local;
mod oom;
pub mod poison;
mod raw;
mod region;
pub mod scratch;
pub mod text;
pub mod vec;

// Public re-exports for the primary API surface.
pub use adapter::ArenaAlloc;
pub use arena::{Arena, ArenaStats, MAX_ALIGN};
pub use config::ArenaConfig;
pub use error::ArenaError;
pub use flags::AllocFlags;
pub use growth::RawSeq;
pub use local::{reset_thread_arena, restore_thread_arena, thread_checkpoint, with_thread_arena};
pub use poison::PoisonHooks;
pub use scratch::{Checkpoint, Scratch};
pub use text::{FnvBuildHasher, StrView};
pub use vec::ArenaVec;
