//! Single-line and single-hunk patches for an inline diff view.
//!
//! Both work on the zero-context diff of one file (`git diff -U0 <file>`),
//! addressing hunks by their index in that diff.

use super::{Direction, PatchAction, PatchError, PatchHunk, format_patch};
use crate::diff::{FileHeader, HunkLine, SplittedDiff};
use log::debug;

fn single_header<'a>(diff: &SplittedDiff<'a>) -> Result<FileHeader<'a>, PatchError> {
    match diff.headers.as_slice() {
        [header] => Ok(*header),
        headers => Err(PatchError::NotSingleFile {
            count: headers.len(),
        }),
    }
}

fn with_line_ending(text: &str) -> String {
    if text.ends_with('\n') {
        text.to_string()
    } else {
        format!("{text}\n")
    }
}

/// Patch changing exactly one line of the file.
///
/// `line_index` counts every body line of hunk `hunk_index`, context lines
/// included, skipping only the no-newline marker. It must land on a `-` or
/// `+` line. The marker is carried along when it belongs to the chosen line.
///
/// # Errors
///
/// [`PatchError::NotSingleFile`] for anything but a one-file diff,
/// [`PatchError::NoSuchHunk`] and [`PatchError::NoSuchLine`] for indices
/// that point past the diff or at a context line, and header errors from
/// any hunk up to the chosen one.
pub fn line_patch(
    diff: &SplittedDiff<'_>,
    hunk_index: usize,
    line_index: usize,
    action: PatchAction,
) -> Result<String, PatchError> {
    let header = single_header(diff)?;
    let hunk = diff
        .hunks
        .get(hunk_index)
        .ok_or(PatchError::NoSuchHunk { index: hunk_index })?;
    let delta = diff.hunks[..hunk_index]
        .iter()
        .map(|earlier| PatchHunk::from_hunk(earlier).map(|earlier| earlier.delta()))
        .sum::<Result<isize, _>>()?;
    let (a_start, a_length, _, _) = hunk.header().parse()?;

    let lines = hunk.content().lines();
    let counted: Vec<(usize, &HunkLine<'_>)> = lines
        .iter()
        .enumerate()
        .filter(|(_, line)| !line.is_no_newline_marker())
        .collect();
    let &(position, line) = counted
        .get(line_index)
        .filter(|(_, line)| line.is_from_line() || line.is_to_line())
        .ok_or(PatchError::NoSuchLine { index: line_index })?;

    let before = &counted[..line_index];
    let minus_before = before.iter().filter(|(_, l)| l.is_from_line()).count();
    let plus_before = before.iter().filter(|(_, l)| l.is_to_line()).count();

    let range = match (action.direction(), line.is_from_line()) {
        (Direction::Forward, true) => {
            let a = a_start + minus_before;
            (a, 1, a.saturating_sub(1), 0)
        }
        (Direction::Forward, false) => {
            let after = if a_length == 0 {
                a_start
            } else {
                a_start + a_length - 1
            };
            (after, 0, after + 1, 1)
        }
        (Direction::Reverse, true) => {
            let a = a_start.saturating_add_signed(delta);
            (a, 1, a.saturating_sub(1), 0)
        }
        (Direction::Reverse, false) => {
            let b = a_start.saturating_add_signed(delta)
                + plus_before
                + usize::from(a_length == 0);
            (b.saturating_sub(1), 0, b, 1)
        }
    };

    let mut content = with_line_ending(line.text);
    if let Some(marker) = lines.get(position + 1).filter(|l| l.is_no_newline_marker()) {
        content.push_str(&with_line_ending(marker.text));
    }
    debug!(
        "{action} line {line_index} of hunk {hunk_index} as -{},{} +{},{} (delta {delta})",
        range.0, range.1, range.2, range.3
    );

    let (a_start, a_length, b_start, b_length) = range;
    let hunk = PatchHunk {
        a_start,
        a_length,
        b_start,
        b_length,
        content,
    };
    Ok(format!("{}{hunk}", header.text))
}

/// Patch for one whole hunk of the diff.
///
/// # Errors
///
/// [`PatchError::NotSingleFile`], [`PatchError::NoSuchHunk`], or the
/// hunk's header error.
pub fn hunk_patch(
    diff: &SplittedDiff<'_>,
    hunk_index: usize,
    action: PatchAction,
) -> Result<String, PatchError> {
    let header = single_header(diff)?;
    let hunk = diff
        .hunks
        .get(hunk_index)
        .ok_or(PatchError::NoSuchHunk { index: hunk_index })?;
    let hunk = PatchHunk::from_hunk(hunk)?;
    Ok(format_patch(
        header.text,
        std::slice::from_ref(&hunk),
        action.direction(),
    ))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    const HEADER: &str = "diff --git a/f b/f\nindex 1111111..2222222 100644\n--- a/f\n+++ b/f\n";

    fn diff_text(hunks: &str) -> String {
        format!("{HEADER}{hunks}")
    }

    /// Body of the patch without the file header.
    fn body(patch: &str) -> &str {
        patch.strip_prefix(HEADER).unwrap()
    }

    #[test]
    fn stage_one_removed_line() {
        let text = diff_text("@@ -3,2 +3 @@\n-b\n-c\n+C\n");
        let diff = SplittedDiff::from_string(&text, 0);
        let patch = line_patch(&diff, 0, 1, PatchAction::Stage).unwrap();
        assert_eq!(body(&patch), "@@ -4,1 +3,0 @@\n-c\n");
    }

    #[test]
    fn stage_one_added_line() {
        let text = diff_text("@@ -3,2 +3 @@\n-b\n-c\n+C\n");
        let diff = SplittedDiff::from_string(&text, 0);
        let patch = line_patch(&diff, 0, 2, PatchAction::Stage).unwrap();
        assert_eq!(body(&patch), "@@ -4,0 +5,1 @@\n+C\n");
    }

    #[test]
    fn stage_line_of_pure_addition() {
        let text = diff_text("@@ -4,0 +5,2 @@\n+x\n+y\n");
        let diff = SplittedDiff::from_string(&text, 0);
        let patch = line_patch(&diff, 0, 1, PatchAction::Stage).unwrap();
        assert_eq!(body(&patch), "@@ -4,0 +5,1 @@\n+y\n");
    }

    #[test]
    fn reverse_lines_account_for_earlier_hunks() {
        let text = diff_text("@@ -1,0 +2,2 @@\n+x\n+y\n@@ -10 +11,0 @@\n-gone\n@@ -20,0 +22,2 @@\n+p\n+q\n");
        let diff = SplittedDiff::from_string(&text, 0);

        let restore = line_patch(&diff, 1, 0, PatchAction::Unstage).unwrap();
        assert_eq!(body(&restore), "@@ -12,1 +11,0 @@\n-gone\n");

        let drop = line_patch(&diff, 2, 1, PatchAction::Discard).unwrap();
        assert_eq!(body(&drop), "@@ -22,0 +23,1 @@\n+q\n");
    }

    #[test]
    fn marker_follows_its_line() {
        let text = diff_text("@@ -5 +5 @@\n-end\n\\ No newline at end of file\n+end\n");
        let diff = SplittedDiff::from_string(&text, 0);

        let removed = line_patch(&diff, 0, 0, PatchAction::Stage).unwrap();
        assert_eq!(
            body(&removed),
            "@@ -5,1 +4,0 @@\n-end\n\\ No newline at end of file\n"
        );

        let added = line_patch(&diff, 0, 1, PatchAction::Stage).unwrap();
        assert_eq!(body(&added), "@@ -5,0 +6,1 @@\n+end\n");
    }

    #[test]
    fn bad_indices() {
        let text = diff_text("@@ -5 +5 @@\n-a\n+b\n");
        let diff = SplittedDiff::from_string(&text, 0);
        assert!(matches!(
            line_patch(&diff, 1, 0, PatchAction::Stage),
            Err(PatchError::NoSuchHunk { index: 1 })
        ));
        assert!(matches!(
            line_patch(&diff, 0, 2, PatchAction::Stage),
            Err(PatchError::NoSuchLine { index: 2 })
        ));
        assert!(matches!(
            hunk_patch(&diff, 3, PatchAction::Stage),
            Err(PatchError::NoSuchHunk { index: 3 })
        ));
    }

    #[test]
    fn context_lines_count_but_cannot_be_chosen() {
        let text = diff_text("@@ -5,3 +5,3 @@\n a\n-b\n+B\n c\n");
        let diff = SplittedDiff::from_string(&text, 0);
        assert!(matches!(
            line_patch(&diff, 0, 0, PatchAction::Stage),
            Err(PatchError::NoSuchLine { index: 0 })
        ));
        assert!(line_patch(&diff, 0, 1, PatchAction::Stage).unwrap().ends_with("-b\n"));
        assert!(line_patch(&diff, 0, 2, PatchAction::Stage).unwrap().ends_with("+B\n"));
    }

    #[test]
    fn needs_exactly_one_file() {
        let diff = SplittedDiff::from_string("", 0);
        assert!(matches!(
            hunk_patch(&diff, 0, PatchAction::Stage),
            Err(PatchError::NotSingleFile { count: 0 })
        ));
    }

    #[test]
    fn whole_hunk_in_both_directions() {
        let text = diff_text("@@ -1,0 +2,2 @@\n+x\n+y\n@@ -10 +11,0 @@\n-gone\n");
        let diff = SplittedDiff::from_string(&text, 0);
        assert_eq!(
            body(&hunk_patch(&diff, 1, PatchAction::Stage).unwrap()),
            "@@ -10,1 +9,0 @@\n-gone\n"
        );
        assert_eq!(
            body(&hunk_patch(&diff, 1, PatchAction::Unstage).unwrap()),
            "@@ -12,1 +11,0 @@\n-gone\n"
        );
    }
}
