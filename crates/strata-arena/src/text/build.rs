//! Arena-allocating string operations.
//!
//! Each operation keeps its result at the arena tip when it can, so chains
//! like `concat(concat(a, b), c)` copy every byte once.

#![allow(unsafe_code)]

use std::ffi::CStr;
use std::fmt::{self, Write as _};
use std::mem::MaybeUninit;

use super::view::StrView;
use crate::arena::{Access, Arena};

impl Arena {
    fn is_tip_resident(&self, s: StrView<'_>) -> bool {
        self.offset_of(s.as_ptr())
            .is_some_and(|offset| offset + s.len() == self.cursor.get())
    }

    /// Copy `s` into the arena.
    ///
    /// Returns `s` unchanged if it is empty or already ends at the tip.
    #[track_caller]
    pub fn clone_str<'a>(&'a self, s: StrView<'a>) -> StrView<'a> {
        if s.is_empty() || self.is_tip_resident(s) {
            return s;
        }
        StrView::new(self.alloc_slice_copy(s.as_bytes()))
    }

    /// Join `head` and `tail` into one contiguous view.
    ///
    /// If `head` already ends at the tip only `tail` is copied.
    ///
    /// ```
    /// use strata_arena::{Arena, StrView};
    ///
    /// let arena = Arena::with_capacity(256);
    /// let hello = arena.clone_str("hello".into());
    /// let joined = arena.concat(hello, " world".into());
    /// assert_eq!(joined, "hello world");
    /// assert_eq!(arena.used(), 11);
    /// ```
    #[track_caller]
    pub fn concat<'a>(&'a self, head: StrView<'a>, tail: StrView<'a>) -> StrView<'a> {
        if head.is_empty() {
            return self.clone_str(tail);
        }
        let head = self.clone_str(head);
        if tail.is_empty() {
            return head;
        }
        // `head` now ends at the tip.
        let start = self.cursor.get() - head.len();
        // SAFETY: `tail` is a live view, readable for its length. Alignment
        // 1 places the copy directly after `head`.
        unsafe { self.alloc_raw_from(1, 1, tail.len(), tail.as_ptr()) };
        // SAFETY: `[start, tip)` holds `head` followed by the copy of
        // `tail`, all initialized and only shared-borrowed.
        StrView::new(unsafe { self.bytes_at(start, head.len() + tail.len()) })
    }

    /// [`Arena::concat`] with a byte slice tail.
    #[track_caller]
    pub fn cat_bytes<'a>(&'a self, head: StrView<'a>, bytes: &'a [u8]) -> StrView<'a> {
        self.concat(head, StrView::new(bytes))
    }

    /// Format `args` into the arena.
    ///
    /// The text is followed in memory by a NUL byte that is not part of the
    /// view and is not reserved: the next allocation may overwrite it. Use
    /// the [`aformat!`](crate::aformat) macro for `format!`-style calls.
    ///
    /// # Panics
    ///
    /// Panics if a `Display` implementation reports an error or writes a
    /// different amount of text when formatted twice.
    #[track_caller]
    pub fn format(&self, args: fmt::Arguments<'_>) -> StrView<'_> {
        let mut counter = Counter(0);
        if counter.write_fmt(args).is_err() {
            formatting_failed();
        }
        let n = counter.0;

        let mut writer = Filler {
            buf: self.alloc_slice_uninit::<u8>(n + 1),
            len: 0,
        };
        if writer.write_fmt(args).is_err() || writer.len != n {
            formatting_failed();
        }
        let Filler { buf, .. } = writer;
        let (text, nul) = buf.split_at_mut(n);
        nul[0].write(0);
        // SAFETY: `nul` is the last byte handed out, so this only retracts
        // the cursor by one; nothing else refers to it.
        unsafe { self.free(nul.as_ptr().cast(), 1) };
        // SAFETY: all `n` bytes were written by `Filler`.
        StrView::new(unsafe { &*(text as *const [MaybeUninit<u8>] as *const [u8]) })
    }

    /// Run `f` with a NUL-terminated copy of `s`.
    ///
    /// The terminator (and the copy, if one was needed) is placed at the tip
    /// and released when `f` returns, leaving the arena as it was. The
    /// string is truncated at its first interior NUL.
    ///
    /// ```
    /// use strata_arena::{Arena, StrView};
    ///
    /// let arena = Arena::with_capacity(64);
    /// let len = arena.with_cstr("path".into(), |c| c.to_bytes().len());
    /// assert_eq!(len, 4);
    /// assert_eq!(arena.used(), 0);
    /// ```
    ///
    /// # Panics
    ///
    /// Panics if `f` allocates from this arena.
    #[track_caller]
    pub fn with_cstr<'a, R>(&'a self, s: StrView<'a>, f: impl FnOnce(&CStr) -> R) -> R {
        self.assert_open();
        let mark = self.cursor.get();
        let joined = self.concat(s, StrView::lit("\0"));
        let guard = FreezeGuard { arena: self, mark };
        self.access.set(Access::Frozen);
        let cstr = CStr::from_bytes_until_nul(joined.as_bytes()).unwrap_or_default();
        let out = f(cstr);
        drop(guard);
        out
    }
}

#[cold]
#[track_caller]
fn formatting_failed() -> ! {
    panic!("a formatting trait implementation returned an error or changed its output")
}

/// Rewinds a frozen arena to `mark` and reopens it.
struct FreezeGuard<'a> {
    arena: &'a Arena,
    mark: usize,
}

impl Drop for FreezeGuard<'_> {
    fn drop(&mut self) {
        let arena = self.arena;
        let end = arena.cursor.get();
        arena
            .hooks
            .poison(arena.base().as_ptr().wrapping_add(self.mark), end - self.mark);
        arena.cursor.set(self.mark);
        arena.access.set(Access::Open);
        arena.bump_stats(|s| s.rewinds += 1);
    }
}

struct Counter(usize);

impl fmt::Write for Counter {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.0 += s.len();
        Ok(())
    }
}

struct Filler<'b> {
    buf: &'b mut [MaybeUninit<u8>],
    len: usize,
}

impl fmt::Write for Filler<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let end = self.len.checked_add(s.len()).ok_or(fmt::Error)?;
        // Leave the last slot for the terminator.
        if end >= self.buf.len() {
            return Err(fmt::Error);
        }
        for (dst, &b) in self.buf[self.len..end].iter_mut().zip(s.as_bytes()) {
            dst.write(b);
        }
        self.len = end;
        Ok(())
    }
}

/// Format into an arena, returning a [`StrView`](crate::StrView).
///
/// ```
/// use strata_arena::{aformat, Arena};
///
/// let arena = Arena::with_capacity(256);
/// let s = aformat!(arena, "{}-{:03}", "id", 7);
/// assert_eq!(s, "id-007");
/// ```
#[macro_export]
macro_rules! aformat {
    ($arena:expr, $($arg:tt)*) => {
        ($arena).format(::std::format_args!($($arg)*))
    };
}
