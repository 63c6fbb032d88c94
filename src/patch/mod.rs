//! Patch construction for partial staging, unstaging and discarding.
//!
//! Every builder here produces text for `git apply --unidiff-zero -`. The
//! hunks in such a patch are usually a subset of some diff, so their start
//! lines have to be rewritten to account for the hunks that were left out.
//! [`rewrite_hunks`] does that for forward application (staging) and
//! [`rewrite_hunks_for_reverse_apply`] for `git apply -R` (unstaging and
//! discarding).
//!
//! Entry points by caller:
//! - a file view with a cursor on some rows: [`stage_hunks`]
//! - an inline diff view: [`line_patch`] and [`hunk_patch`]
//! - a diff view with selected lines: [`patch_for_selection`],
//!   [`patch_for_points`] and [`patch_for_files`]

mod inline;
mod selection;
mod stage;

pub use inline::{hunk_patch, line_patch};
pub use selection::{
    LineId, line_starts_for_rows, patch_for_files, patch_for_points, patch_for_selection,
    recount_lines,
};
pub use stage::{Patch, StageOutcome, stage_hunks};

use crate::diff::{Hunk, HunkHeaderError, SplittedDiff};
use error_set::error_set;
use log::debug;
use std::fmt;

error_set! {
    /// Errors from building a patch out of a diff
    PatchError := {
        /// The builder needs the diff of exactly one file
        #[display("Expected a diff of a single file, found {count} file headers")]
        NotSingleFile { count: usize },
        /// The requested hunk index is past the end of the diff
        #[display("No hunk with index {index}")]
        NoSuchHunk { index: usize },
        /// The requested line index is past the end of the hunk
        #[display("No line with index {index} in this hunk")]
        NoSuchLine { index: usize },
        HunkHeaderError(HunkHeaderError),
    }
}

/// Which side of a diff the patch will be applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Preimage is the old side, as for `git apply`.
    Forward,
    /// Preimage is the new side, as for `git apply -R`.
    Reverse,
}

/// What the caller wants to do with the selected changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum PatchAction {
    /// Copy working tree changes into the index.
    Stage,
    /// Take staged changes back out of the index.
    Unstage,
    /// Throw working tree changes away.
    Discard,
}

impl PatchAction {
    #[must_use]
    pub fn direction(self) -> Direction {
        match self {
            Self::Stage => Direction::Forward,
            Self::Unstage | Self::Discard => Direction::Reverse,
        }
    }

    /// Arguments for `git` that apply a patch built for this action from
    /// stdin.
    #[must_use]
    pub fn git_apply_args(self) -> &'static [&'static str] {
        match self {
            Self::Stage => &["apply", "--cached", "--unidiff-zero", "-"],
            Self::Unstage => &["apply", "--cached", "-R", "--unidiff-zero", "-"],
            Self::Discard => &["apply", "-R", "--unidiff-zero", "-"],
        }
    }

    /// Past-tense verb for status messages.
    #[must_use]
    pub fn past_tense(self) -> &'static str {
        match self {
            Self::Stage => "Staged",
            Self::Unstage => "Unstaged",
            Self::Discard => "Discarded",
        }
    }
}

impl fmt::Display for PatchAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Stage => "stage",
            Self::Unstage => "unstage",
            Self::Discard => "discard",
        })
    }
}

/// A hunk reduced to its header numbers and raw body.
///
/// `content` keeps the `-`/`+`/` ` prefixes and any no-newline marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PatchHunk {
    pub a_start: usize,
    pub a_length: usize,
    pub b_start: usize,
    pub b_length: usize,
    pub content: String,
}

impl PatchHunk {
    /// Flatten a parsed hunk.
    ///
    /// # Errors
    ///
    /// Whatever [`crate::diff::HunkHeader::parse`] reports for the header.
    pub fn from_hunk(hunk: &Hunk<'_>) -> Result<Self, HunkHeaderError> {
        let (a_start, a_length, b_start, b_length) = hunk.header().parse()?;
        Ok(Self {
            a_start,
            a_length,
            b_start,
            b_length,
            content: hunk.content().text.to_string(),
        })
    }

    /// Only `+` lines. Zero-context diffs are the only source of these.
    #[must_use]
    pub fn is_addition_only(&self) -> bool {
        self.a_length == 0 && self.b_length > 0
    }

    /// Only `-` lines. Zero-context diffs are the only source of these.
    #[must_use]
    pub fn is_removal_only(&self) -> bool {
        self.b_length == 0 && self.a_length > 0
    }

    #[must_use]
    pub fn has_no_newline_marker(&self) -> bool {
        self.content.contains("\n\\ ")
    }

    /// How many lines applying this hunk adds to the file.
    #[must_use]
    pub fn delta(&self) -> isize {
        self.b_length as isize - self.a_length as isize
    }

    /// The same change seen from the other side, as `git apply -R` sees it.
    #[must_use]
    pub fn reversed(&self) -> Self {
        let content = self
            .content
            .split_inclusive('\n')
            .map(|line| match line.as_bytes().first() {
                Some(b'+') => format!("-{}", &line[1..]),
                Some(b'-') => format!("+{}", &line[1..]),
                _ => line.to_string(),
            })
            .collect();
        Self {
            a_start: self.b_start,
            a_length: self.b_length,
            b_start: self.a_start,
            b_length: self.a_length,
            content,
        }
    }
}

impl fmt::Display for PatchHunk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "@@ -{},{} +{},{} @@\n{}",
            self.a_start, self.a_length, self.b_start, self.b_length, self.content
        )
    }
}

/// Running sum of `b_length - a_length` over the hunks before each one.
fn offsets(hunks: &[PatchHunk]) -> impl Iterator<Item = isize> + '_ {
    hunks.iter().scan(0isize, |offset, hunk| {
        let before = *offset;
        *offset += hunk.delta();
        Some(before)
    })
}

/// Recompute `b_start` for applying `hunks` on their old side.
///
/// `hunks` must be sorted and come from one file. Only the hunks passed in
/// count towards the offset, so leaving hunks out of a patch shifts the
/// later ones accordingly.
#[must_use]
pub fn rewrite_hunks(hunks: &[PatchHunk]) -> Vec<PatchHunk> {
    hunks
        .iter()
        .zip(offsets(hunks))
        .map(|(hunk, offset)| {
            let mut b_start = hunk.a_start.saturating_add_signed(offset);
            if hunk.is_addition_only() {
                b_start += 1;
            } else if hunk.is_removal_only() {
                b_start = b_start.saturating_sub(1);
            }
            debug!(
                "hunk -{},{} rewritten to +{},{} (offset {offset})",
                hunk.a_start, hunk.a_length, b_start, hunk.b_length
            );
            PatchHunk {
                b_start,
                ..hunk.clone()
            }
        })
        .collect()
}

/// Recompute `a_start` for applying `hunks` with `git apply -R`.
///
/// Mirror image of [`rewrite_hunks`]: the new side is the preimage and
/// stays put.
#[must_use]
pub fn rewrite_hunks_for_reverse_apply(hunks: &[PatchHunk]) -> Vec<PatchHunk> {
    hunks
        .iter()
        .zip(offsets(hunks))
        .map(|(hunk, offset)| {
            let mut a_start = hunk.b_start.saturating_add_signed(-offset);
            if hunk.is_addition_only() {
                a_start = a_start.saturating_sub(1);
            } else if hunk.is_removal_only() {
                a_start += 1;
            }
            debug!(
                "hunk +{},{} rewritten to -{},{} (offset {offset})",
                hunk.b_start, hunk.b_length, a_start, hunk.a_length
            );
            PatchHunk {
                a_start,
                ..hunk.clone()
            }
        })
        .collect()
}

/// File header followed by the rewritten hunks.
#[must_use]
pub fn format_patch(header: &str, hunks: &[PatchHunk], direction: Direction) -> String {
    let rewritten = match direction {
        Direction::Forward => rewrite_hunks(hunks),
        Direction::Reverse => rewrite_hunks_for_reverse_apply(hunks),
    };
    let mut patch = header.to_string();
    for hunk in &rewritten {
        patch.push_str(&hunk.to_string());
    }
    patch
}

/// The hunk a 1-based file row belongs to.
///
/// Removal-only hunks are two rows tall so the row on either side of the
/// removal can grab them. A trailing no-newline marker adds one more row.
/// `hunks` must be sorted.
#[must_use]
pub fn hunk_containing_row(hunks: &[PatchHunk], row: usize) -> Option<&PatchHunk> {
    for hunk in hunks {
        if row < hunk.b_start {
            break;
        }
        let mut b_end = if hunk.is_removal_only() {
            hunk.b_start + 2
        } else {
            hunk.b_start + hunk.b_length.max(1)
        };
        if hunk.has_no_newline_marker() {
            b_end += 1;
        }
        if row < b_end {
            return Some(hunk);
        }
    }
    None
}

/// Hunks hit by any of `rows`, in first-hit order and without repeats.
///
/// # Errors
///
/// Fails if any hunk header cannot be parsed, notably for combined diffs.
pub fn hunks_touching_rows(
    diff: &SplittedDiff<'_>,
    rows: &[usize],
) -> Result<Vec<PatchHunk>, HunkHeaderError> {
    let hunks = diff
        .hunks
        .iter()
        .map(PatchHunk::from_hunk)
        .collect::<Result<Vec<_>, _>>()?;

    let mut selected: Vec<PatchHunk> = Vec::new();
    for &row in rows {
        if let Some(hunk) = hunk_containing_row(&hunks, row) {
            if !selected.contains(hunk) {
                selected.push(hunk.clone());
            }
        }
    }
    debug!("rows {rows:?} touch {} of {} hunks", selected.len(), hunks.len());
    Ok(selected)
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Sorted, non-overlapping zero-context hunks with at least one
    /// untouched line between neighbours.
    fn arb_hunks() -> impl Strategy<Value = Vec<PatchHunk>> {
        prop::collection::vec((2..20usize, 0..4usize, 0..4usize), 1..8).prop_map(|specs| {
            let mut hunks = Vec::new();
            let mut a_pos = 0usize;
            let mut b_pos = 0usize;
            for (gap, removed, added) in specs {
                let (removed, added) = if removed + added == 0 { (1, 0) } else { (removed, added) };
                a_pos += gap;
                b_pos += gap;
                let a_start = if removed == 0 { a_pos - 1 } else { a_pos };
                let b_start = if added == 0 { b_pos - 1 } else { b_pos };
                let content = "-x\n".repeat(removed) + &"+y\n".repeat(added);
                hunks.push(PatchHunk {
                    a_start,
                    a_length: removed,
                    b_start,
                    b_length: added,
                    content,
                });
                a_pos += removed;
                b_pos += added;
            }
            hunks
        })
    }

    fn covered(start: usize, length: usize) -> std::ops::Range<usize> {
        if length == 0 { start + 1..start + 1 } else { start..start + length }
    }

    proptest! {
        /// Rewriting all hunks of a diff reproduces git's own numbers.
        #[test]
        fn rewriting_everything_is_identity(hunks in arb_hunks()) {
            prop_assert_eq!(&rewrite_hunks(&hunks), &hunks);
            prop_assert_eq!(&rewrite_hunks_for_reverse_apply(&hunks), &hunks);
        }

        /// Any sorted selection keeps b_start non-decreasing and the new
        /// side ranges disjoint.
        #[test]
        fn rewritten_hunks_stay_ordered(
            hunks in arb_hunks(),
            mask in prop::collection::vec(any::<bool>(), 8),
        ) {
            let selected: Vec<PatchHunk> = hunks
                .iter()
                .zip(mask)
                .filter(|(_, keep)| *keep)
                .map(|(hunk, _)| hunk.clone())
                .collect();
            let rewritten = rewrite_hunks(&selected);
            for pair in rewritten.windows(2) {
                prop_assert!(pair[0].b_start <= pair[1].b_start);
                let first = covered(pair[0].b_start, pair[0].b_length);
                let second = covered(pair[1].b_start, pair[1].b_length);
                prop_assert!(first.end <= second.start);
            }
        }
    }
}
