//! The byte-string view type and its pure operations.

use std::ffi::{CStr, CString};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::Utf8Error;

use super::hash::fnv1a;

/// A borrowed, length-delimited byte string.
///
/// Views never carry a NUL terminator and may alias arena memory, caller
/// memory, or static data. Comparison is bytewise.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct StrView<'a> {
    bytes: &'a [u8],
}

impl<'a> StrView<'a> {
    /// View over `bytes`.
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    /// View over a string literal.
    pub const fn lit(s: &'static str) -> StrView<'static> {
        StrView { bytes: s.as_bytes() }
    }

    /// The underlying bytes.
    pub const fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Length in bytes.
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the view is empty.
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Address of the first byte.
    pub const fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    /// The bytes as `&str`, if they are UTF-8.
    pub fn to_str(&self) -> Result<&'a str, Utf8Error> {
        std::str::from_utf8(self.bytes)
    }

    /// Heap-allocated NUL-terminated copy, truncated at the first interior
    /// NUL.
    pub fn to_cstring(&self) -> CString {
        let end = self
            .bytes
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.bytes.len());
        // No interior NUL remains after truncation.
        CString::new(&self.bytes[..end]).unwrap_or_default()
    }

    /// Whether the view begins with `prefix`.
    pub fn starts_with<'p>(&self, prefix: impl Into<StrView<'p>>) -> bool {
        self.bytes.starts_with(prefix.into().bytes)
    }

    /// Whether the view ends with `suffix`.
    pub fn ends_with<'p>(&self, suffix: impl Into<StrView<'p>>) -> bool {
        self.bytes.ends_with(suffix.into().bytes)
    }

    /// Up to `len` bytes starting at `pos`.
    ///
    /// # Panics
    ///
    /// Panics if `pos > self.len()`.
    #[track_caller]
    pub fn substr(&self, pos: usize, len: usize) -> StrView<'a> {
        assert!(
            pos <= self.bytes.len(),
            "substr start {pos} is past the end ({})",
            self.bytes.len()
        );
        let end = pos.saturating_add(len).min(self.bytes.len());
        StrView::new(&self.bytes[pos..end])
    }

    /// Bytes `[start, end)`, with `end` clamped to the length.
    ///
    /// # Panics
    ///
    /// Panics if `start > end` or `start > self.len()`.
    #[track_caller]
    pub fn slice(&self, start: usize, end: usize) -> StrView<'a> {
        assert!(start <= end, "slice start {start} is after its end {end}");
        assert!(
            start <= self.bytes.len(),
            "slice start {start} is past the end ({})",
            self.bytes.len()
        );
        StrView::new(&self.bytes[start..end.min(self.bytes.len())])
    }

    /// Strip leading bytes `<= b' '` (space and control characters).
    pub fn trim_left(&self) -> StrView<'a> {
        let start = self
            .bytes
            .iter()
            .position(|&b| b > b' ')
            .unwrap_or(self.bytes.len());
        StrView::new(&self.bytes[start..])
    }

    /// Strip trailing bytes `<= b' '`.
    pub fn trim_right(&self) -> StrView<'a> {
        let end = self
            .bytes
            .iter()
            .rposition(|&b| b > b' ')
            .map_or(0, |i| i + 1);
        StrView::new(&self.bytes[..end])
    }

    /// Strip both ends.
    pub fn trim(&self) -> StrView<'a> {
        self.trim_left().trim_right()
    }

    /// 64-bit FNV-1a hash of the bytes.
    pub fn hash(&self) -> u64 {
        fnv1a(self.bytes)
    }
}

impl Hash for StrView<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write(self.bytes);
    }
}

impl<'a> From<&'a str> for StrView<'a> {
    fn from(s: &'a str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl<'a> From<&'a [u8]> for StrView<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Self::new(bytes)
    }
}

impl<'a, const N: usize> From<&'a [u8; N]> for StrView<'a> {
    fn from(bytes: &'a [u8; N]) -> Self {
        Self::new(bytes)
    }
}

impl<'a> From<&'a CStr> for StrView<'a> {
    fn from(s: &'a CStr) -> Self {
        Self::new(s.to_bytes())
    }
}

impl PartialEq<str> for StrView<'_> {
    fn eq(&self, other: &str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<&str> for StrView<'_> {
    fn eq(&self, other: &&str) -> bool {
        self.bytes == other.as_bytes()
    }
}

impl PartialEq<[u8]> for StrView<'_> {
    fn eq(&self, other: &[u8]) -> bool {
        self.bytes == other
    }
}

impl fmt::Display for StrView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for chunk in self.bytes.utf8_chunks() {
            f.write_str(chunk.valid())?;
            if !chunk.invalid().is_empty() {
                f.write_str("\u{FFFD}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for StrView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.bytes.escape_ascii())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_bytewise() {
        assert_eq!(StrView::from("abc"), StrView::lit("abc"));
        assert_ne!(StrView::from("abc"), StrView::from("abd"));
        assert_eq!(StrView::from("abc"), "abc");
        assert_eq!(StrView::default(), "");
    }

    #[test]
    fn prefix_and_suffix() {
        let s = StrView::from("hello world");
        assert!(s.starts_with("hello"));
        assert!(s.ends_with("world"));
        assert!(!s.starts_with("world"));
        assert!(s.starts_with(""));
        assert!(!StrView::from("he").starts_with("hello"));
    }

    #[test]
    fn affixes_accept_short_lived_and_byte_inputs() {
        let s = StrView::from("key=value");
        {
            let owned = String::from("key=");
            assert!(s.starts_with(owned.as_str()));
        }
        assert!(s.ends_with(&b"value"[..]));
        assert!(s.starts_with(StrView::from("k")));
    }

    #[test]
    fn substr_clamps_length() {
        let s = StrView::from("hello");
        assert_eq!(s.substr(1, 3), "ell");
        assert_eq!(s.substr(3, 100), "lo");
        assert_eq!(s.substr(5, 1), "");
    }

    #[test]
    #[should_panic(expected = "past the end")]
    fn substr_start_out_of_bounds_panics() {
        StrView::from("abc").substr(4, 0);
    }

    #[test]
    fn slice_clamps_end() {
        let s = StrView::from("hello");
        assert_eq!(s.slice(1, 3), "el");
        assert_eq!(s.slice(2, 99), "llo");
        assert_eq!(s.slice(5, 5), "");
    }

    #[test]
    #[should_panic(expected = "after its end")]
    fn slice_reversed_bounds_panics() {
        StrView::from("hello").slice(3, 1);
    }

    #[test]
    fn trims_whitespace_and_controls() {
        let s = StrView::from(" \t\n hi there \r\n");
        assert_eq!(s.trim_left(), "hi there \r\n");
        assert_eq!(s.trim_right(), " \t\n hi there");
        assert_eq!(s.trim(), "hi there");
        assert_eq!(StrView::from("   ").trim(), "");
    }

    #[test]
    fn cstring_truncates_at_nul() {
        let s = StrView::from(&b"ab\0cd"[..]);
        assert_eq!(s.to_cstring().as_bytes(), b"ab");
        let c = CStr::from_bytes_with_nul(b"xyz\0").unwrap();
        assert_eq!(StrView::from(c), "xyz");
    }

    #[test]
    fn display_replaces_invalid_utf8() {
        let s = StrView::from(&b"ok\xffok"[..]);
        assert_eq!(s.to_string(), "ok\u{FFFD}ok");
        assert!(s.to_str().is_err());
        assert_eq!(format!("{s:?}"), "\"ok\\xffok\"");
    }

    #[test]
    fn hash_is_fnv1a() {
        assert_eq!(StrView::from("").hash(), 0xcbf2_9ce4_8422_2325);
        assert_eq!(StrView::from("a").hash(), 0xaf63_dc4c_8601_ec8c);
    }
}
