//! Length-delimited byte strings built on the arena.
//!
//! [`StrView`] is a plain `&[u8]` wrapper: cheap to copy, never
//! NUL-terminated, free to alias arena or caller memory. Operations that
//! produce new bytes ([`Arena::clone_str`], [`Arena::concat`],
//! [`Arena::format`]) allocate from an arena and favour the tip, so
//! building a string piece by piece does not copy the earlier pieces.
//!
//! [`Arena::clone_str`]: crate::Arena::clone_str
//! [`Arena::concat`]: crate::Arena::concat
//! [`Arena::format`]: crate::Arena::format

mod build;
pub mod hash;
pub mod split;
mod view;

pub use hash::{fnv1a, Fnv1a, FnvBuildHasher};
pub use split::{SplitCharset, SplitLiteral};
pub use view::StrView;
