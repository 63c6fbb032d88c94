//! Patches from a diff view, where the user selects lines of the diff text
//! itself rather than rows of the file.
//!
//! Unlike the file-view builders these work on diffs with context lines and
//! across any number of files.

use super::{Direction, PatchError, PatchHunk, format_patch};
use crate::diff::{FileHeader, Hunk, HunkHeaderError, HunkLine, SplittedDiff, TextRange};
use log::debug;
use std::collections::BTreeSet;

/// Line numbers a hunk line has, or would have, in the old (`a`) and new
/// (`b`) file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LineId {
    pub a: usize,
    pub b: usize,
}

/// Pair every body line of `hunk` with its [`LineId`].
///
/// A `-` line's `b` (and a `+` line's `a`) is the number of the next line on
/// that side. No-newline markers take the id of the following line.
///
/// # Errors
///
/// Fails on combined or malformed hunk headers.
pub fn recount_lines<'a>(
    hunk: &Hunk<'a>,
) -> Result<Vec<(HunkLine<'a>, LineId)>, HunkHeaderError> {
    let (a_start, a_length, b_start, b_length) = hunk.header().parse()?;
    // A zero-length side starts after the given line.
    let mut a = if a_length == 0 { a_start + 1 } else { a_start };
    let mut b = if b_length == 0 { b_start + 1 } else { b_start };

    Ok(hunk
        .content()
        .lines()
        .into_iter()
        .map(|line| {
            let id = LineId { a, b };
            if line.is_context() {
                a += 1;
                b += 1;
            } else if line.is_from_line() {
                a += 1;
            } else if line.is_to_line() {
                b += 1;
            }
            (line, id)
        })
        .collect())
}

/// One zero-context hunk from the selected lines of a change block.
fn form_patch(
    chunk: &[(HunkLine<'_>, LineId)],
    selected: &BTreeSet<usize>,
    direction: Direction,
) -> Option<PatchHunk> {
    let is_selected = |line: &HunkLine<'_>| selected.contains(&line.a);
    // Lines on the preimage side that get removed; unselected ones between
    // the first and last selected stay as context.
    let in_span = |line: &HunkLine<'_>| match direction {
        Direction::Forward => line.is_from_line(),
        Direction::Reverse => line.is_to_line(),
    };
    let span_first = chunk
        .iter()
        .position(|(line, _)| in_span(line) && is_selected(line));
    let span_last = chunk
        .iter()
        .rposition(|(line, _)| in_span(line) && is_selected(line));

    let mut content = String::new();
    let mut a_length = 0;
    let mut b_length = 0;
    let mut a_first: Option<usize> = None;
    let mut b_first: Option<usize> = None;
    let mut any_first: Option<LineId> = None;
    let mut kept_previous = false;

    for (index, (line, id)) in chunk.iter().enumerate() {
        if line.is_no_newline_marker() {
            if kept_previous {
                content.push_str(line.text);
            }
            continue;
        }

        let inside_span = matches!((span_first, span_last), (Some(first), Some(last)) if first <= index && index <= last);
        let emitted = if in_span(line) {
            if !inside_span {
                None
            } else if is_selected(line) {
                Some(line.text.to_string())
            } else {
                Some(format!(" {}", line.content()))
            }
        } else if is_selected(line) {
            Some(line.text.to_string())
        } else {
            None
        };

        kept_previous = emitted.is_some();
        let Some(text) = emitted else {
            continue;
        };
        let as_context = text.starts_with(' ');
        if as_context || line.is_from_line() {
            a_length += 1;
            a_first.get_or_insert(id.a);
        }
        if as_context || line.is_to_line() {
            b_length += 1;
            b_first.get_or_insert(id.b);
        }
        any_first.get_or_insert(*id);
        content.push_str(&text);
        if !text.ends_with('\n') {
            content.push('\n');
        }
    }

    let first = any_first?;
    Some(PatchHunk {
        a_start: a_first.unwrap_or(first.a.saturating_sub(1)),
        a_length,
        b_start: b_first.unwrap_or(first.b.saturating_sub(1)),
        b_length,
        content,
    })
}

/// Patch for the selected lines of a diff.
///
/// `line_starts` are offsets of the first character of each selected line.
/// Every maximal block of changed lines with a selected line in it becomes
/// one zero-context hunk, so the result has to be applied with
/// `--unidiff-zero`. Returns `None` when no selected line is a change.
///
/// # Errors
///
/// [`HunkHeaderError::UnsupportedCombinedDiff`] (wrapped) when a selected
/// hunk comes from a combined diff.
///
/// # Panics
///
/// If a selected hunk has no file header, see [`SplittedDiff::head_for_hunk`].
pub fn patch_for_selection(
    diff: &SplittedDiff<'_>,
    line_starts: &[usize],
    direction: Direction,
) -> Result<Option<String>, PatchError> {
    let selected: BTreeSet<usize> = line_starts.iter().copied().collect();
    let mut hunks: Vec<Hunk<'_>> = Vec::new();
    for &pt in &selected {
        if let Some(hunk) = diff.hunk_for_pt(pt) {
            if !hunks.contains(&hunk) {
                hunks.push(hunk);
            }
        }
    }

    let mut patches: Vec<(FileHeader<'_>, Vec<PatchHunk>)> = Vec::new();
    for hunk in &hunks {
        let header = diff.head_for_hunk(hunk);
        let lines = recount_lines(hunk)?;
        let chunks = lines
            .split(|(line, _)| line.is_context())
            .filter(|chunk| !chunk.is_empty());
        for chunk in chunks {
            let Some(patch_hunk) = form_patch(chunk, &selected, direction) else {
                continue;
            };
            match patches.iter_mut().find(|(head, _)| *head == header) {
                Some((_, file_hunks)) => file_hunks.push(patch_hunk),
                None => patches.push((header, vec![patch_hunk])),
            }
        }
    }

    if patches.is_empty() {
        return Ok(None);
    }
    debug!(
        "{} selected lines give {} hunks in {} files",
        selected.len(),
        patches.iter().map(|(_, hunks)| hunks.len()).sum::<usize>(),
        patches.len()
    );
    Ok(Some(
        patches
            .iter()
            .map(|(header, hunks)| format_patch(header.text, hunks, direction))
            .collect(),
    ))
}

fn reject_combined(diff: &SplittedDiff<'_>) -> Result<(), HunkHeaderError> {
    match diff.headers.iter().find(|head| head.is_combined()) {
        Some(head) => Err(HunkHeaderError::UnsupportedCombinedDiff {
            header: head.first_line().to_string(),
        }),
        None => Ok(()),
    }
}

fn push_unique<'a>(parts: &mut Vec<TextRange<'a>>, part: TextRange<'a>) {
    if !parts.contains(&part) {
        parts.push(part);
    }
}

/// The whole hunks under `pts`, each preceded by its file header.
///
/// Falls back to the first hunk of the diff when no point is on a hunk.
/// The hunks are copied verbatim, so context diffs apply as they are.
///
/// # Errors
///
/// Combined diffs are rejected.
pub fn patch_for_points(
    diff: &SplittedDiff<'_>,
    pts: &[usize],
) -> Result<Option<String>, PatchError> {
    reject_combined(diff)?;
    let mut parts = Vec::new();
    for (head, hunk) in pts.iter().filter_map(|&pt| diff.head_and_hunk_for_pt(pt)) {
        push_unique(&mut parts, head.0);
        push_unique(&mut parts, hunk.0);
    }
    if parts.is_empty() {
        let Some(hunk) = diff.hunks.first() else {
            return Ok(None);
        };
        parts.push(diff.head_for_hunk(hunk).0);
        parts.push(hunk.0);
    }
    Ok(Some(parts.iter().map(|part| part.text).collect()))
}

/// Every hunk of the files under `pts`, falling back to the first file.
///
/// # Errors
///
/// Combined diffs are rejected.
pub fn patch_for_files(
    diff: &SplittedDiff<'_>,
    pts: &[usize],
) -> Result<Option<String>, PatchError> {
    reject_combined(diff)?;
    let mut headers: Vec<FileHeader<'_>> = Vec::new();
    for head in pts.iter().filter_map(|&pt| diff.head_for_pt(pt)) {
        if !headers.contains(&head) {
            headers.push(head);
        }
    }
    if headers.is_empty() {
        match diff.headers.first() {
            Some(head) => headers.push(*head),
            None => return Ok(None),
        }
    }

    let mut patch = String::new();
    for head in &headers {
        patch.push_str(head.text);
        for hunk in diff.hunks_for_head(head) {
            patch.push_str(hunk.text);
        }
    }
    Ok(Some(patch))
}

/// Offsets of the starts of 1-based `rows` in `text`, sorted and unique.
///
/// Rows past the end of the text are ignored.
#[must_use]
pub fn line_starts_for_rows(text: &str, rows: &[usize]) -> Vec<usize> {
    let starts: Vec<usize> = std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .filter(|&start| start < text.len())
        .collect();
    rows.iter()
        .filter_map(|&row| row.checked_sub(1).and_then(|index| starts.get(index)))
        .copied()
        .collect::<BTreeSet<usize>>()
        .into_iter()
        .collect()
}
