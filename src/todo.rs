//! Rewriting of `git rebase --interactive` todo lists.
//!
//! A todo list is plain text: `#` comments, blank lines and action lines of
//! the form `<action> <hash> <subject>`. Git writes every commit as a `pick`
//! line, so the rewrites here find commits by the literal prefix
//! `pick <hash> ` and nothing else. A hash that is a prefix of another hash
//! never matches the longer one because of the trailing space.
//!
//! All rewrites drop comment lines.

use log::debug;
use std::fmt;

/// Todo list commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Action {
    Pick,
    Reword,
    Edit,
    Squash,
    Fixup,
    Exec,
    Break,
    Drop,
    Label,
    Reset,
    Merge,
    UpdateRef,
}

impl Action {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pick => "pick",
            Self::Reword => "reword",
            Self::Edit => "edit",
            Self::Squash => "squash",
            Self::Fixup => "fixup",
            Self::Exec => "exec",
            Self::Break => "break",
            Self::Drop => "drop",
            Self::Label => "label",
            Self::Reset => "reset",
            Self::Merge => "merge",
            Self::UpdateRef => "update-ref",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A commit to fold into another one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Commit {
    pub commit_hash: String,
    pub commit_message: String,
}

impl Commit {
    pub fn new(commit_hash: impl Into<String>, commit_message: impl Into<String>) -> Self {
        Self {
            commit_hash: commit_hash.into(),
            commit_message: commit_message.into(),
        }
    }

    /// First line of the message.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.commit_message.lines().next().unwrap_or("")
    }

    /// `fixup` for `fixup!` commits, `squash` for everything else.
    #[must_use]
    pub fn fold_action(&self) -> Action {
        if self.commit_message.starts_with("fixup") {
            Action::Fixup
        } else {
            Action::Squash
        }
    }
}

/// One todo list transformation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    /// Replace `pick` of `commit` with `action` (reword, edit, drop...).
    ChangeFirstAction { action: Action, commit: String },
    /// Move `commits` right behind `base` as fixup or squash lines.
    Fixup { base: String, commits: Vec<Commit> },
    /// Squash `commits` into `base`.
    Squash { base: String, commits: Vec<String> },
    /// Replay `commits` onto a new `target_ref` before the rest of the list.
    Copy {
        target_ref: String,
        commits: Vec<String>,
    },
    /// Like [`Instruction::Copy`], but drop the commits from the list.
    Extract {
        target_ref: String,
        commits: Vec<String>,
    },
}

/// Apply `instruction` to `todo`.
#[must_use]
pub fn rewrite(todo: &str, instruction: &Instruction) -> String {
    match instruction {
        Instruction::ChangeFirstAction { action, commit } => {
            change_first_action(*action, commit, todo)
        }
        Instruction::Fixup { base, commits } => fixup_commits(commits, base, todo),
        Instruction::Squash { base, commits } => squash_commits(base, commits, todo),
        Instruction::Copy {
            target_ref,
            commits,
        } => copy_commits(target_ref, commits, todo),
        Instruction::Extract {
            target_ref,
            commits,
        } => extract_commits(target_ref, commits, todo),
    }
}

/// Grammar: `pick <hash> ` at the very start of a line.
fn pick_prefix(hash: &str) -> String {
    format!("pick {hash} ")
}

/// Lines with their endings, comments removed.
fn action_lines(todo: &str) -> impl Iterator<Item = &str> {
    todo.split_inclusive('\n')
        .filter(|line| !line.starts_with('#'))
}

fn has_line_starting_with(todo: &str, prefix: &str) -> bool {
    action_lines(todo).any(|line| line.starts_with(prefix))
}

fn end_line(todo: &mut String) {
    if !todo.is_empty() && !todo.ends_with('\n') {
        todo.push('\n');
    }
}

/// Make sure the list ends with a line break, then add a blank line.
fn finish_with_blank_line(mut todo: String) -> String {
    end_line(&mut todo);
    todo.push('\n');
    todo
}

/// Replace the `pick` of `commit_hash` with `action`.
///
/// Running it twice gives the same result as running it once.
#[must_use]
pub fn change_first_action(action: Action, commit_hash: &str, todo: &str) -> String {
    let needle = pick_prefix(commit_hash);
    action_lines(todo)
        .map(|line| {
            if line.starts_with(&needle) {
                debug!("{action} {commit_hash}");
                // "pick" is four bytes long
                format!("{action}{}", &line[4..])
            } else {
                line.to_string()
            }
        })
        .collect()
}

/// Move `fixups` directly after `base_commit`, in the given order.
///
/// Each fixup's own `pick` line is removed and a `fixup` or `squash` line
/// with its subject is inserted after the base commit.
#[must_use]
pub fn fixup_commits(fixups: &[Commit], base_commit: &str, todo: &str) -> String {
    let needle = pick_prefix(base_commit);
    let fixup_prefixes: Vec<String> = fixups
        .iter()
        .map(|commit| pick_prefix(&commit.commit_hash))
        .collect();
    if !has_line_starting_with(todo, &needle) {
        debug!("no pick of {base_commit}, leaving fixups in place");
        return action_lines(todo).collect();
    }

    let mut out = String::new();
    for line in action_lines(todo) {
        if fixup_prefixes.iter().any(|prefix| line.starts_with(prefix)) {
            continue;
        }
        out.push_str(line);
        if line.starts_with(&needle) {
            end_line(&mut out);
            for commit in fixups {
                debug!("{} {} onto {base_commit}", commit.fold_action(), commit.commit_hash);
                out.push_str(&format!(
                    "{} {} {}\n",
                    commit.fold_action(),
                    commit.commit_hash,
                    commit.subject()
                ));
            }
        }
    }
    out
}

/// Squash `commits` into `base_commit`.
///
/// Git asks for the combined message itself, so the inserted lines carry
/// no subject.
#[must_use]
pub fn squash_commits(base_commit: &str, commits: &[String], todo: &str) -> String {
    let needle = pick_prefix(base_commit);
    let prefixes: Vec<String> = commits.iter().map(|hash| pick_prefix(hash)).collect();
    if !has_line_starting_with(todo, &needle) {
        debug!("no pick of {base_commit}, nothing to squash into");
        return finish_with_blank_line(action_lines(todo).collect());
    }

    let mut out = String::new();
    for line in action_lines(todo) {
        if prefixes.iter().any(|prefix| line.starts_with(prefix)) {
            continue;
        }
        out.push_str(line);
        if line.starts_with(&needle) {
            end_line(&mut out);
            for hash in commits {
                out.push_str(&format!("{} {hash}\n", Action::Squash));
            }
        }
    }
    debug!("squashed {} commits into {base_commit}", commits.len());
    finish_with_blank_line(out)
}

/// `label onto`, the picks, `u <ref>`, `reset onto` and a blank line.
fn replay_prefix(target_ref: &str, commits: &[String]) -> String {
    let mut prefix = format!("{} onto\n", Action::Label);
    for hash in commits {
        prefix.push_str(&format!("{} {hash}\n", Action::Pick));
    }
    prefix.push_str(&format!("u {target_ref}\n"));
    prefix.push_str(&format!("{} onto\n\n", Action::Reset));
    prefix
}

/// Grammar: a line that is exactly `update-ref <ref>`.
fn is_update_ref_line(line: &str, target_ref: &str) -> bool {
    line.trim_end_matches(['\n', '\r'])
        .strip_prefix("update-ref ")
        .is_some_and(|name| name == target_ref)
}

/// Put copies of `commits` on `target_ref`, keeping the originals.
///
/// An `update-ref` of the same ref later in the list is marked `--local`.
#[must_use]
pub fn copy_commits(target_ref: &str, commits: &[String], todo: &str) -> String {
    let mut out = replay_prefix(target_ref, commits);
    for line in action_lines(todo) {
        if is_update_ref_line(line, target_ref) {
            debug!("keep {target_ref} local");
            out.push_str(&format!("{} {target_ref} --local\n", Action::UpdateRef));
        } else {
            out.push_str(line);
        }
    }
    finish_with_blank_line(out)
}

/// Move `commits` onto `target_ref` and drop them from the rest of the list.
#[must_use]
pub fn extract_commits(target_ref: &str, commits: &[String], todo: &str) -> String {
    let prefixes: Vec<String> = commits.iter().map(|hash| pick_prefix(hash)).collect();
    let mut out = replay_prefix(target_ref, commits);
    for line in action_lines(todo) {
        if is_update_ref_line(line, target_ref) {
            continue;
        }
        if prefixes.iter().any(|prefix| line.starts_with(prefix)) {
            out.push_str(&format!("{}{}", Action::Drop, &line[4..]));
        } else {
            out.push_str(line);
        }
    }
    debug!("extracted {} commits to {target_ref}", commits.len());
    finish_with_blank_line(out)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use similar_asserts::assert_eq;

    fn hashes(list: &[&str]) -> Vec<String> {
        list.iter().map(|hash| hash.to_string()).collect()
    }

    #[test]
    fn fixup_goes_behind_its_base() {
        let todo = "\
pick 056c8f6d Look upwards in the graph for potential fixup commits
pick 496d0266 Remove the padding as it has no effect
pick 2ed5650d fixup! Look upwards in the graph for potential fixup commits
pick 0d721988 fixup! Look upwards in the graph for potential fixup commits
pick fc5da4c3 Simplify `gs_reset_branch`
pick 8e5e700b Fix typo in `reverse_adjust_line_according_to_hunks`
pick 6c8cb2e7 fixup! Look upwards in the graph for potential fixup commits
pick 19978225 Check `returncode` to decide if `git log` failed

# Rebase 6bd508b2..0b0409f8 onto 6bd508b2 (8 commands)
";
        let fixups = [Commit::new(
            "6c8cb2e7",
            "fixup! Look upwards in the graph for potential fixup..",
        )];
        assert_eq!(
            fixup_commits(&fixups, "056c8f6d", todo),
            "\
pick 056c8f6d Look upwards in the graph for potential fixup commits
fixup 6c8cb2e7 fixup! Look upwards in the graph for potential fixup..
pick 496d0266 Remove the padding as it has no effect
pick 2ed5650d fixup! Look upwards in the graph for potential fixup commits
pick 0d721988 fixup! Look upwards in the graph for potential fixup commits
pick fc5da4c3 Simplify `gs_reset_branch`
pick 8e5e700b Fix typo in `reverse_adjust_line_according_to_hunks`
pick 19978225 Check `returncode` to decide if `git log` failed

"
        );
    }

    #[test]
    fn fixups_keep_caller_order_and_pick_their_action() {
        let todo = "pick aaaa A\npick bbbb B\npick cccc fixup! A\npick dddd squash! A\n";
        let fixups = [
            Commit::new("dddd", "squash! A\n\nMore words"),
            Commit::new("cccc", "fixup! A"),
        ];
        assert_eq!(
            fixup_commits(&fixups, "aaaa", todo),
            "pick aaaa A\nsquash dddd squash! A\nfixup cccc fixup! A\npick bbbb B\n"
        );
    }

    #[test]
    fn fixup_onto_first_of_three() {
        let todo = "pick a1 first\npick b2 second\npick c3 fixup! first\n";
        let out = fixup_commits(&[Commit::new("c3", "fixup! first")], "a1", todo);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines, vec!["pick a1 first", "fixup c3 fixup! first", "pick b2 second"]);
    }

    #[test]
    fn quick_action_reword() {
        let todo = "\
pick 0b0409f8 Let `QuickAction` be a function `str -> str` for flexibility

# Rebase fee0447b..0b0409f8 onto fee0447b (1 command)
";
        assert_eq!(
            change_first_action(Action::Reword, "0b0409f8", todo),
            "reword 0b0409f8 Let `QuickAction` be a function `str -> str` for flexibility\n\n"
        );
    }

    #[test]
    fn quick_action_edit() {
        let todo = "\
pick 142972fd Mark first arg of continuation function \"positional only\"
pick fee0447b Simplify `ask_for_local_branch`
pick 0b0409f8 Let `QuickAction` be a function `str -> str` for flexibility

# Rebase 2bcb7211..0b0409f8 onto 2bcb7211 (3 commands)
";
        assert_eq!(
            change_first_action(Action::Edit, "142972fd", todo),
            "\
edit 142972fd Mark first arg of continuation function \"positional only\"
pick fee0447b Simplify `ask_for_local_branch`
pick 0b0409f8 Let `QuickAction` be a function `str -> str` for flexibility

"
        );
    }

    #[test]
    fn quick_action_drop_in_rebase_merges_list() {
        let todo = "\
label onto

reset onto
pick fee0447b Simplify `ask_for_local_branch`
pick 0b0409f8 Let `QuickAction` be a function `str -> str` for flexibility
";
        assert_eq!(
            change_first_action(Action::Drop, "fee0447b", todo),
            "\
label onto

reset onto
drop fee0447b Simplify `ask_for_local_branch`
pick 0b0409f8 Let `QuickAction` be a function `str -> str` for flexibility
"
        );
    }

    #[test]
    fn hash_prefixes_do_not_match_longer_hashes() {
        let todo = "pick abc1234 long\npick abc subject\n";
        assert_eq!(
            change_first_action(Action::Drop, "abc", todo),
            "pick abc1234 long\ndrop abc subject\n"
        );
    }

    #[test]
    fn unknown_hash_only_strips_comments() {
        let todo = "pick a1 one\n# comment\npick b2 two\n";
        assert_eq!(
            change_first_action(Action::Edit, "zz", todo),
            "pick a1 one\npick b2 two\n"
        );
    }

    #[test]
    fn fixup_onto_unknown_base_keeps_every_commit() {
        let todo = "pick a1 one\npick b2 two\n# comment\npick c3 fixup! one\n";
        assert_eq!(
            fixup_commits(&[Commit::new("c3", "fixup! one")], "zz", todo),
            "pick a1 one\npick b2 two\npick c3 fixup! one\n"
        );
    }

    #[test]
    fn squash_into_unknown_base_keeps_every_commit() {
        let todo = "pick a1 one\npick b2 two\npick c3 three\n";
        assert_eq!(
            squash_commits("zz", &hashes(&["b2", "c3"]), todo),
            "pick a1 one\npick b2 two\npick c3 three\n\n"
        );
    }

    #[test]
    fn squash_without_subjects() {
        let todo = "pick a1 one\npick b2 two\npick c3 three\n# help\n";
        assert_eq!(
            squash_commits("a1", &hashes(&["c3", "b2"]), todo),
            "pick a1 one\nsquash c3\nsquash b2\n\n"
        );
    }

    #[test]
    fn extract_two_of_four() {
        let todo = "pick aa1 A\npick bb2 B\npick cc3 C\npick dd4 D\n";
        let out = extract_commits("topic", &hashes(&["bb2", "cc3"]), todo);
        insta::assert_snapshot!(out, @r"
label onto
pick bb2
pick cc3
u topic
reset onto

pick aa1 A
drop bb2 B
drop cc3 C
pick dd4 D
");
        assert!(out.ends_with("pick dd4 D\n\n"));
    }

    #[test]
    fn extract_removes_the_matching_update_ref() {
        let todo = "pick aa1 A\nupdate-ref topic\nupdate-ref topic-2\npick bb2 B\n";
        assert_eq!(
            extract_commits("topic", &hashes(&["aa1"]), todo),
            "label onto\npick aa1\nu topic\nreset onto\n\ndrop aa1 A\nupdate-ref topic-2\npick bb2 B\n\n"
        );
    }

    #[test]
    fn copy_keeps_originals_and_marks_ref_local() {
        let todo = "pick aa1 A\nupdate-ref topic\npick bb2 B";
        assert_eq!(
            copy_commits("topic", &hashes(&["aa1"]), todo),
            "label onto\npick aa1\nu topic\nreset onto\n\npick aa1 A\nupdate-ref topic --local\npick bb2 B\n\n"
        );
    }

    #[test]
    fn rewrite_dispatches() {
        let todo = "pick a1 one\npick b2 two\n";
        let instruction = Instruction::ChangeFirstAction {
            action: Action::Reword,
            commit: "b2".into(),
        };
        assert_eq!(rewrite(todo, &instruction), "pick a1 one\nreword b2 two\n");

        let instruction = Instruction::Squash {
            base: "a1".into(),
            commits: hashes(&["b2"]),
        };
        assert_eq!(rewrite(todo, &instruction), "pick a1 one\nsquash b2\n\n");
    }

    #[test]
    fn subject_is_first_line() {
        let commit = Commit::new("a1", "fixup! thing\n\nbody");
        assert_eq!(commit.subject(), "fixup! thing");
        assert_eq!(commit.fold_action(), Action::Fixup);
        assert_eq!(Commit::new("a1", "").subject(), "");
    }
}
