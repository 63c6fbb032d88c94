use super::TextRange;

text_range_newtype! {
    /// A `commit <hash>` block as printed by `git log -p` or `git show`.
    CommitHeader
}

impl<'a> CommitHeader<'a> {
    /// The hash on the first line, if it is a `commit ` line.
    ///
    /// Decorations such as `(HEAD -> main)` are not part of the hash.
    #[must_use]
    pub fn commit_hash(&self) -> Option<&'a str> {
        let first_line: &'a str = self.0.text.lines().next()?;
        first_line
            .strip_prefix("commit ")?
            .split_whitespace()
            .next()
    }
}

text_range_newtype! {
    /// A `diff --git ...` block up to and including its `+++` line.
    FileHeader
}

impl<'a> FileHeader<'a> {
    /// Path from the `+++ b/<path>` line.
    #[must_use]
    pub fn to_filename(&self) -> Option<&'a str> {
        self.path_after("+++ b/")
    }

    /// Path from the `--- a/<path>` line.
    #[must_use]
    pub fn from_filename(&self) -> Option<&'a str> {
        self.path_after("--- a/")
    }

    fn path_after(&self, prefix: &str) -> Option<&'a str> {
        let text: &'a str = self.0.text;
        text.lines()
            .find_map(|line| line.strip_prefix(prefix))
            .filter(|path| !path.is_empty())
    }

    /// Whether this is a `diff --cc` (combined) header.
    #[must_use]
    pub fn is_combined(&self) -> bool {
        self.first_line().starts_with("diff --cc ")
    }
}
