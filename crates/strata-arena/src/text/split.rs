//! Tokenizing iterators over [`StrView`].
//!
//! Two policies with different edge rules:
//!
//! | input      | [`SplitCharset`] on `","` | [`SplitLiteral`] on `","` |
//! |------------|---------------------------|---------------------------|
//! | `"a,,b"`   | `a`, `b`                  | `a`, ``, `b`              |
//! | `",a"`     | ``, `a`                   | ``, `a`                   |
//! | `"a,"`     | `a`                       | `a`                       |

use std::iter::FusedIterator;

use super::view::StrView;

/// Splits on any byte of a separator set; runs of separators collapse.
///
/// A leading separator run yields one empty token. A trailing run yields
/// nothing.
#[derive(Clone, Debug)]
pub struct SplitCharset<'a> {
    rest: &'a [u8],
    pos: usize,
    table: [bool; 256],
    started: bool,
}

impl<'a> SplitCharset<'a> {
    fn new(input: StrView<'a>, charset: StrView<'_>) -> Self {
        let mut table = [false; 256];
        for &b in charset.as_bytes() {
            table[usize::from(b)] = true;
        }
        Self {
            rest: input.as_bytes(),
            pos: 0,
            table,
            started: false,
        }
    }

    /// Offset of the unconsumed input from the start of the original view.
    pub fn position(&self) -> usize {
        self.pos
    }

    fn is_sep(&self, b: u8) -> bool {
        self.table[usize::from(b)]
    }

    fn advance(&mut self, n: usize) {
        self.rest = &self.rest[n..];
        self.pos += n;
    }
}

impl<'a> Iterator for SplitCharset<'a> {
    type Item = StrView<'a>;

    fn next(&mut self) -> Option<StrView<'a>> {
        let first = !self.started;
        self.started = true;

        let seps = self.rest.iter().take_while(|&&b| self.is_sep(b)).count();
        if seps > 0 {
            self.advance(seps);
            if first {
                return Some(StrView::default());
            }
        }
        if self.rest.is_empty() {
            return None;
        }
        let len = self
            .rest
            .iter()
            .position(|&b| self.is_sep(b))
            .unwrap_or(self.rest.len());
        let token = StrView::new(&self.rest[..len]);
        self.advance(len);
        Some(token)
    }
}

impl FusedIterator for SplitCharset<'_> {}

/// Splits on an exact separator; separators never collapse.
///
/// A separator at the start of the remaining input yields an empty token.
/// A trailing separator yields no trailing empty token. An empty separator
/// yields the whole input once.
#[derive(Clone, Debug)]
pub struct SplitLiteral<'a, 's> {
    rest: &'a [u8],
    pos: usize,
    sep: &'s [u8],
}

impl<'a, 's> SplitLiteral<'a, 's> {
    fn new(input: StrView<'a>, sep: StrView<'s>) -> Self {
        Self {
            rest: input.as_bytes(),
            pos: 0,
            sep: sep.as_bytes(),
        }
    }

    /// Offset of the unconsumed input from the start of the original view.
    pub fn position(&self) -> usize {
        self.pos
    }
}

impl<'a> Iterator for SplitLiteral<'a, '_> {
    type Item = StrView<'a>;

    fn next(&mut self) -> Option<StrView<'a>> {
        if self.rest.is_empty() {
            return None;
        }
        let rest = self.rest;
        let found = if self.sep.is_empty() {
            None
        } else {
            rest.windows(self.sep.len()).position(|w| w == self.sep)
        };
        let (token, consumed) = match found {
            Some(at) => (&rest[..at], at + self.sep.len()),
            None => (rest, rest.len()),
        };
        self.rest = &rest[consumed..];
        self.pos += consumed;
        Some(StrView::new(token))
    }
}

impl FusedIterator for SplitLiteral<'_, '_> {}

impl<'a> StrView<'a> {
    /// Split on any byte of `charset`.
    ///
    /// ```
    /// use strata_arena::StrView;
    ///
    /// let parts: Vec<_> = StrView::from("a,b||c").split_by_charset(",|".into()).collect();
    /// assert_eq!(parts, ["a", "b", "c"]);
    /// ```
    pub fn split_by_charset(self, charset: StrView<'_>) -> SplitCharset<'a> {
        SplitCharset::new(self, charset)
    }

    /// Split on each occurrence of `sep`.
    ///
    /// ```
    /// use strata_arena::StrView;
    ///
    /// let parts: Vec<_> = StrView::from("a,,b").split_by_literal(",".into()).collect();
    /// assert_eq!(parts, ["a", "", "b"]);
    /// ```
    pub fn split_by_literal<'s>(self, sep: StrView<'s>) -> SplitLiteral<'a, 's> {
        SplitLiteral::new(self, sep)
    }
}
