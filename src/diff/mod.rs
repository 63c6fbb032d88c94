//! Position-addressable model of unified diff text.
//!
//! [`SplittedDiff::from_string`] cuts `git diff`, `git show` or `git log -p`
//! output into commit headers, file headers and hunks. Every piece keeps its
//! absolute offsets, so callers holding the diff inside a larger buffer (an
//! editor view, say) can map points straight back to pieces.
//!
//! ```
//! use git_splice::diff::SplittedDiff;
//!
//! let text = "diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -1 +1 @@\n-old\n+new\n";
//! let diff = SplittedDiff::from_string(text, 0);
//! assert_eq!(diff.headers.len(), 1);
//! assert_eq!(diff.hunks.len(), 1);
//!
//! let hunk = diff.hunk_for_pt(50).unwrap();
//! assert_eq!(diff.head_for_hunk(&hunk).to_filename(), Some("f"));
//! ```

pub use crate::text::TextRange;

/// Declares a `Copy` newtype over [`TextRange`] that derefs to it.
macro_rules! text_range_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name<'a>(pub TextRange<'a>);

        impl<'a> std::ops::Deref for $name<'a> {
            type Target = TextRange<'a>;

            fn deref(&self) -> &Self::Target {
                &self.0
            }
        }
    };
}

pub mod header;
pub mod hunk;

pub use header::{CommitHeader, FileHeader};
pub use hunk::{
    Hunk, HunkContent, HunkHeader, HunkHeaderError, HunkLine, NO_NEWLINE_MARKER,
};

use log::trace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SectionKind {
    Commit,
    FileHeader,
    Hunk,
}

/// Offsets of every line opening a section.
///
/// Grammar: a section starts at any line beginning with `commit`, `diff` or
/// `@@` and runs up to the next such line. Hunk body lines always carry a
/// mode prefix and commit messages are indented, so neither can open one.
fn section_starts(text: &str) -> Vec<(SectionKind, usize)> {
    let mut starts = Vec::new();
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let kind = if line.starts_with("commit") {
            Some(SectionKind::Commit)
        } else if line.starts_with("diff") {
            Some(SectionKind::FileHeader)
        } else if line.starts_with("@@") {
            Some(SectionKind::Hunk)
        } else {
            None
        };
        if let Some(kind) = kind {
            starts.push((kind, offset));
        }
        offset += line.len();
    }
    starts
}

/// A diff split into its commit headers, file headers and hunks.
///
/// Each sequence is sorted by start offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SplittedDiff<'a> {
    pub commits: Vec<CommitHeader<'a>>,
    pub headers: Vec<FileHeader<'a>>,
    pub hunks: Vec<Hunk<'a>>,
}

impl<'a> SplittedDiff<'a> {
    /// Split `text`, reporting offsets shifted by `offset`.
    ///
    /// The last section ends one past the end of the text, so a point
    /// sitting at the very end of the buffer still belongs to it.
    #[must_use]
    pub fn from_string(text: &'a str, offset: usize) -> Self {
        let starts = section_starts(text);
        let ends = starts
            .iter()
            .skip(1)
            .map(|&(_, start)| start)
            .chain(std::iter::once(text.len() + 1));

        let mut diff = Self::default();
        for (&(kind, start), end) in starts.iter().zip(ends) {
            let range = TextRange::with_end(
                &text[start..end.min(text.len())],
                start + offset,
                end + offset,
            );
            trace!("{kind:?} section at {}..{}", range.a, range.b);
            match kind {
                SectionKind::Commit => diff.commits.push(CommitHeader(range)),
                SectionKind::FileHeader => diff.headers.push(FileHeader(range)),
                SectionKind::Hunk => diff.hunks.push(Hunk(range)),
            }
        }
        diff
    }

    /// The hunk whose span contains `pt`.
    #[must_use]
    pub fn hunk_for_pt(&self, pt: usize) -> Option<Hunk<'a>> {
        self.hunks.iter().find(|hunk| hunk.contains(pt)).copied()
    }

    /// The first hunk starting after `pt`.
    #[must_use]
    pub fn first_hunk_after_pt(&self, pt: usize) -> Option<Hunk<'a>> {
        self.hunks.iter().find(|hunk| hunk.a > pt).copied()
    }

    /// The last file header starting at or before `pt`.
    #[must_use]
    pub fn head_for_pt(&self, pt: usize) -> Option<FileHeader<'a>> {
        self.headers.iter().rev().find(|head| head.a <= pt).copied()
    }

    /// The hunk under `pt` together with its file header.
    #[must_use]
    pub fn head_and_hunk_for_pt(&self, pt: usize) -> Option<(FileHeader<'a>, Hunk<'a>)> {
        let hunk = self.hunk_for_pt(pt)?;
        Some((self.head_for_hunk(&hunk), hunk))
    }

    /// The file header `hunk` belongs to.
    ///
    /// # Panics
    ///
    /// If no header precedes the hunk. Git never prints such a diff.
    #[must_use]
    #[allow(clippy::panic)]
    pub fn head_for_hunk(&self, hunk: &Hunk<'_>) -> FileHeader<'a> {
        match self.headers.iter().rev().find(|head| head.a < hunk.a) {
            Some(head) => *head,
            None => panic!("hunk at offset {} has no file header", hunk.a),
        }
    }

    /// The hunks between `head` and the next file header.
    #[must_use]
    pub fn hunks_for_head(&self, head: &FileHeader<'_>) -> &[Hunk<'a>] {
        let start = self.hunks.partition_point(|hunk| hunk.a < head.a);
        let end = self
            .headers
            .iter()
            .map(|next| next.a)
            .find(|&a| a > head.a)
            .map_or(self.hunks.len(), |next_a| {
                self.hunks.partition_point(|hunk| hunk.a < next_a)
            });
        &self.hunks[start..end.max(start)]
    }

    /// The nearest commit header before `hunk`.
    #[must_use]
    pub fn commit_for_hunk(&self, hunk: &Hunk<'_>) -> Option<CommitHeader<'a>> {
        self.commits
            .iter()
            .rev()
            .find(|commit| commit.a < hunk.a)
            .copied()
    }

    /// The nearest commit header starting at or before `pt`.
    #[must_use]
    pub fn commit_before_pt(&self, pt: usize) -> Option<CommitHeader<'a>> {
        self.commits
            .iter()
            .rev()
            .find(|commit| commit.a <= pt)
            .copied()
    }

    /// Whether any file is shown as a combined (`diff --cc`) diff.
    #[must_use]
    pub fn is_combined_diff(&self) -> bool {
        self.headers.iter().any(FileHeader::is_combined)
    }
}
