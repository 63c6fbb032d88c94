//! Borrowed text slices that remember where they came from.
//!
//! Every piece of a parsed diff is a [`TextRange`]: the text itself plus the
//! absolute `[a, b)` offsets it occupies in some outer buffer (a whole diff,
//! or an editor view that embeds one). Ranges are plain values; slicing or
//! shifting one produces a new range.

use std::ops::{Add, Sub};

/// Immutable `(text, a, b)` triple.
///
/// `b - a == text.len()` unless the range was built with [`TextRange::with_end`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TextRange<'a> {
    pub text: &'a str,
    pub a: usize,
    pub b: usize,
}

impl<'a> TextRange<'a> {
    /// A range starting at `a` and spanning exactly `text`.
    #[must_use]
    pub fn new(text: &'a str, a: usize) -> Self {
        Self {
            text,
            a,
            b: a + text.len(),
        }
    }

    /// A range with an explicit end offset.
    #[must_use]
    pub fn with_end(text: &'a str, a: usize, b: usize) -> Self {
        Self { text, a, b }
    }

    /// Sub-range `[i, j)` of the text, with offsets shifted accordingly.
    ///
    /// Byte indices are clamped to the text length. Returns `None` if they do
    /// not fall on character boundaries.
    #[must_use]
    pub fn slice(&self, i: usize, j: usize) -> Option<Self> {
        let j = j.min(self.text.len());
        let i = i.min(j);
        self.text.get(i..j).map(|text| Self::new(text, self.a + i))
    }

    /// Move both offsets by `delta`, saturating at zero.
    #[must_use]
    pub fn translate(&self, delta: isize) -> Self {
        let shift = |n: usize| n.saturating_add_signed(delta);
        Self {
            text: self.text,
            a: shift(self.a),
            b: shift(self.b),
        }
    }

    /// Whether `pt` lies in `[a, b)`.
    #[must_use]
    pub fn contains(&self, pt: usize) -> bool {
        self.a <= pt && pt < self.b
    }

    /// The first line, without its line ending.
    #[must_use]
    pub fn first_line(&self) -> &'a str {
        self.text.lines().next().unwrap_or("")
    }

    /// Split into lines, keeping line endings, with accumulated offsets.
    #[must_use]
    pub fn lines(&self) -> Vec<TextRange<'a>> {
        let mut start = self.a;
        self.text
            .split_inclusive('\n')
            .map(|line| {
                let range = TextRange::new(line, start);
                start = range.b;
                range
            })
            .collect()
    }
}

impl<'a> Add<usize> for TextRange<'a> {
    type Output = TextRange<'a>;

    fn add(self, n: usize) -> Self::Output {
        Self {
            text: self.text,
            a: self.a + n,
            b: self.b + n,
        }
    }
}

impl<'a> Sub<usize> for TextRange<'a> {
    type Output = TextRange<'a>;

    fn sub(self, n: usize) -> Self::Output {
        Self {
            text: self.text,
            a: self.a.saturating_sub(n),
            b: self.b.saturating_sub(n),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    #[test]
    fn new_spans_text() {
        let range = TextRange::new("hello\n", 10);
        assert_eq!(range.a, 10);
        assert_eq!(range.b, 16);
    }

    #[test]
    fn lines_accumulate_offsets() {
        let range = TextRange::new("one\ntwo\nthree", 100);
        let lines = range.lines();
        assert_eq!(
            lines,
            vec![
                TextRange::new("one\n", 100),
                TextRange::new("two\n", 104),
                TextRange::new("three", 108),
            ]
        );
        assert_eq!(lines.last().unwrap().b, range.b);
    }

    #[test]
    fn lines_of_empty_text() {
        assert!(TextRange::new("", 3).lines().is_empty());
    }

    #[test]
    fn slice_shifts_offsets() {
        let range = TextRange::new("abcdef", 20);
        assert_eq!(range.slice(2, 4).unwrap(), TextRange::new("cd", 22));
        assert_eq!(range.slice(4, 100).unwrap(), TextRange::new("ef", 24));
    }

    #[test]
    fn translation() {
        let range = TextRange::new("xy", 5);
        assert_eq!(range + 3, TextRange::new("xy", 8));
        assert_eq!(range - 5, TextRange::new("xy", 0));
        assert_eq!(range.translate(-2), TextRange::new("xy", 3));
    }

    #[test]
    fn equality_is_by_value() {
        let text = String::from("same");
        assert_eq!(TextRange::new(&text, 1), TextRange::new("same", 1));
        assert_ne!(TextRange::new("same", 1), TextRange::new("same", 2));
        assert_ne!(
            TextRange::new("same", 1),
            TextRange::with_end("same", 1, 6)
        );
    }

    #[test]
    fn contains_is_half_open() {
        let range = TextRange::new("abc", 10);
        assert!(range.contains(10));
        assert!(range.contains(12));
        assert!(!range.contains(13));
        assert!(!range.contains(9));
    }
}
