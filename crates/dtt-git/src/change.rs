use serde::{Deserialize, Serialize};

/// How a file changed between the two sides of a diff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeKind::Added => write!(f, "added"),
            ChangeKind::Modified => write!(f, "modified"),
            ChangeKind::Deleted => write!(f, "deleted"),
        }
    }
}

/// The changes made to a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffChange {
    /// Repository-relative path, `/` separated
    pub path: String,
    /// Full unified diff for this file, starting at its `diff --git` header
    pub diff: String,
    pub kind: ChangeKind,
}

impl DiffChange {
    pub fn new(path: impl Into<String>, diff: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            diff: diff.into(),
            kind,
        }
    }

    /// Lines added by this change, without the leading `+`
    pub fn added_lines(&self) -> impl Iterator<Item = &str> {
        self.body_lines().filter_map(|line| line.strip_prefix('+'))
    }

    /// Lines removed by this change, without the leading `-`
    pub fn removed_lines(&self) -> impl Iterator<Item = &str> {
        self.body_lines().filter_map(|line| line.strip_prefix('-'))
    }

    pub fn insertions(&self) -> usize {
        self.added_lines().count()
    }

    pub fn deletions(&self) -> usize {
        self.removed_lines().count()
    }

    // Skips the file header so `--- a/x` and `+++ b/x` are not counted.
    fn body_lines(&self) -> impl Iterator<Item = &str> {
        self.diff
            .lines()
            .skip_while(|line| !line.starts_with("@@"))
            .filter(|line| !line.starts_with("@@"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "diff --git a/calc.py b/calc.py
index 1111111..2222222 100644
--- a/calc.py
+++ b/calc.py
@@ -1,2 +1,3 @@
 def add(a, b):
-    return a + b
+    # add two numbers
+    return b + a
";

    #[test]
    fn test_added_and_removed_lines() {
        let change = DiffChange::new("calc.py", SAMPLE, ChangeKind::Modified);

        let added: Vec<&str> = change.added_lines().collect();
        let removed: Vec<&str> = change.removed_lines().collect();

        assert_eq!(added, vec!["    # add two numbers", "    return b + a"]);
        assert_eq!(removed, vec!["    return a + b"]);
        assert_eq!(change.insertions(), 2);
        assert_eq!(change.deletions(), 1);
    }

    #[test]
    fn test_header_lines_are_not_counted() {
        let change = DiffChange::new(
            "new.py",
            "diff --git a/new.py b/new.py\nnew file mode 100644\n--- /dev/null\n+++ b/new.py\n",
            ChangeKind::Added,
        );
        assert_eq!(change.insertions(), 0);
        assert_eq!(change.deletions(), 0);
    }
}
