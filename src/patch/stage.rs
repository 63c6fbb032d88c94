use super::{PatchAction, PatchError, PatchHunk, format_patch, hunks_touching_rows};
use crate::diff::{HunkHeaderError, SplittedDiff};
use log::debug;
use std::fmt;

/// A patch ready for `git apply`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub text: String,
    /// Number of hunks in `text`.
    pub hunks: usize,
    pub action: PatchAction,
}

/// Result of asking for the hunks under some rows of a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StageOutcome {
    Patch(Patch),
    /// The diff is empty.
    Clean,
    /// None of the rows fall inside a hunk.
    NotOnAHunk,
    /// The file shows a combined diff.
    MergeConflict,
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Patch(patch) => write!(
                f,
                "{} {} {}.",
                patch.action.past_tense(),
                patch.hunks,
                if patch.hunks == 1 { "hunk" } else { "hunks" }
            ),
            Self::Clean => f.write_str("The file is clean."),
            Self::NotOnAHunk => f.write_str("Not on a hunk."),
            Self::MergeConflict => f.write_str("Files with merge conflicts are not supported."),
        }
    }
}

/// Patch for the hunks of a single-file `git diff -U0` under `rows`.
///
/// Rows are 1-based lines of the file as it is on the new side of the diff.
///
/// # Errors
///
/// [`PatchError::NotSingleFile`] if the diff covers more or fewer than one
/// file, or a [`PatchError::HunkHeaderError`] for an unreadable hunk header.
pub fn stage_hunks(
    diff_text: &str,
    rows: &[usize],
    action: PatchAction,
) -> Result<StageOutcome, PatchError> {
    if diff_text.trim().is_empty() {
        return Ok(StageOutcome::Clean);
    }

    let diff = SplittedDiff::from_string(diff_text, 0);
    let [header] = diff.headers.as_slice() else {
        return Err(PatchError::NotSingleFile {
            count: diff.headers.len(),
        });
    };

    let mut hunks: Vec<PatchHunk> = match hunks_touching_rows(&diff, rows) {
        Ok(hunks) => hunks,
        Err(HunkHeaderError::UnsupportedCombinedDiff { .. }) => {
            return Ok(StageOutcome::MergeConflict);
        }
        Err(err) => return Err(err.into()),
    };
    if hunks.is_empty() {
        return Ok(StageOutcome::NotOnAHunk);
    }
    hunks.sort_by_key(|hunk| hunk.a_start);

    debug!("{action} {} hunks of {:?}", hunks.len(), header.to_filename());
    Ok(StageOutcome::Patch(Patch {
        text: format_patch(header.text, &hunks, action.direction()),
        hunks: hunks.len(),
        action,
    }))
}
