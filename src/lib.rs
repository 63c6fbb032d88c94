//! Partial staging and rebase plan rewriting for git front ends.
//!
//! The [`diff`] module splits `git diff`/`git log -p` output into commit
//! headers, file headers and hunks. [`patch`] turns a selection of hunks or
//! lines into a patch for `git apply`, and [`todo`] rewrites the todo list
//! of an interactive rebase. Nothing here runs git: callers feed in diff
//! text and pipe the resulting patches to git themselves.
//!
//! # Examples
//!
//! ```
//! use git_splice::{PatchAction, StageOutcome, stage_hunks};
//!
//! let diff = "diff --git a/f b/f\n--- a/f\n+++ b/f\n@@ -2 +2 @@\n-old\n+new\n";
//! let outcome = stage_hunks(diff, &[2], PatchAction::Stage)?;
//! let StageOutcome::Patch(patch) = outcome else {
//!     panic!("row 2 is inside the hunk");
//! };
//! assert!(patch.text.ends_with("@@ -2,1 +2,1 @@\n-old\n+new\n"));
//! # Ok::<(), git_splice::PatchError>(())
//! ```

use error_set::error_set;
use log::debug;
use std::fs;
use std::io::Read;
use std::path::Path;

pub mod diff;
pub mod patch;
pub mod text;
pub mod todo;

pub use diff::SplittedDiff;
pub use patch::{
    Direction, PatchAction, PatchError, StageOutcome, hunk_patch, line_patch, patch_for_files,
    patch_for_points, patch_for_selection, stage_hunks,
};
pub use todo::{Action, Commit, Instruction};

error_set! {
    /// Errors from the file-facing operations of git-splice
    SpliceError := {
        #[display("Failed to read rebase todo list {path}: {message}")]
        TodoReadFailed { path: String, message: String },
        #[display("Failed to write rebase todo list {path}: {message}")]
        TodoWriteFailed { path: String, message: String },
        #[display("Failed to read diff: {message}")]
        ReadInputFailed { message: String },
        PatchError(PatchError),
    }
}

/// Rewrite the todo list at `path` in place.
///
/// This is what runs when git-splice acts as git's sequence editor.
///
/// # Errors
///
/// Returns `TodoReadFailed` or `TodoWriteFailed` when the file cannot be
/// read or written back.
pub fn edit_todo_file(path: &Path, instruction: &Instruction) -> Result<(), SpliceError> {
    let todo = fs::read_to_string(path).map_err(|e| SpliceError::TodoReadFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;

    let rewritten = todo::rewrite(&todo, instruction);
    debug!(
        "Rewrote {} ({} -> {} bytes)",
        path.display(),
        todo.len(),
        rewritten.len()
    );

    fs::write(path, rewritten).map_err(|e| SpliceError::TodoWriteFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Read a diff from `path`, or from stdin when no path is given.
///
/// # Errors
///
/// Returns `ReadInputFailed` if the input cannot be read as UTF-8.
pub fn read_diff(path: Option<&Path>) -> Result<String, SpliceError> {
    let read = match path {
        Some(path) => fs::read_to_string(path),
        None => {
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text).map(|_| text)
        }
    };
    read.map_err(|e| SpliceError::ReadInputFailed {
        message: e.to_string(),
    })
}

/// Shell command to hand to git as `GIT_SEQUENCE_EDITOR`.
///
/// `exe` is the path of the git-splice binary. Git appends the todo file
/// path when it runs the command.
#[must_use]
pub fn sequence_editor_command(exe: &str, instruction: &Instruction) -> String {
    let mut args = vec![exe.to_string(), "todo".to_string()];
    match instruction {
        Instruction::ChangeFirstAction { action, commit } => {
            match action {
                Action::Reword | Action::Edit | Action::Drop => {
                    args.push(action.as_str().to_string());
                }
                other => {
                    args.push("action".to_string());
                    args.push(other.as_str().to_string());
                }
            }
            args.push(commit.clone());
        }
        Instruction::Fixup { base, commits } => {
            args.extend(["fixup".to_string(), "--base".to_string(), base.clone()]);
            for commit in commits {
                args.push("--commit".to_string());
                args.push(format!("{}:{}", commit.commit_hash, commit.commit_message));
            }
        }
        Instruction::Squash { base, commits } => {
            args.extend(["squash".to_string(), "--base".to_string(), base.clone()]);
            push_commits(&mut args, commits);
        }
        Instruction::Copy {
            target_ref,
            commits,
        } => {
            args.extend(["copy".to_string(), "--ref".to_string(), target_ref.clone()]);
            push_commits(&mut args, commits);
        }
        Instruction::Extract {
            target_ref,
            commits,
        } => {
            args.extend([
                "extract".to_string(),
                "--ref".to_string(),
                target_ref.clone(),
            ]);
            push_commits(&mut args, commits);
        }
    }

    args.iter()
        .map(|arg| shell_quote(arg))
        .collect::<Vec<_>>()
        .join(" ")
}

fn push_commits(args: &mut Vec<String>, commits: &[String]) {
    for commit in commits {
        args.push("--commit".to_string());
        args.push(commit.clone());
    }
}

/// Quote `arg` for a POSIX shell, leaving plain words alone.
fn shell_quote(arg: &str) -> String {
    let plain = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+,".contains(c));
    if plain {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}
