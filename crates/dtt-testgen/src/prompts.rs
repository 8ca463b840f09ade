use dtt_git::{ChangeKind, DiffChange};
use thiserror::Error;

use crate::NO_TEST_NEEDED;

/// Test framework the prompt asks for
pub const DEFAULT_TEST_FRAMEWORK: &str = "pytest";

/// Largest diff, in bytes, sent to the model by default
pub const DEFAULT_MAX_DIFF_BYTES: usize = 100 * 1024;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    #[error("Diff is {size} bytes, above the {limit} byte limit")]
    DiffTooLarge { size: usize, limit: usize },
}

/// Prompt templates for test generation
pub struct TestPrompts {
    framework: String,
    max_diff_bytes: usize,
}

impl Default for TestPrompts {
    fn default() -> Self {
        Self::new()
    }
}

impl TestPrompts {
    pub fn new() -> Self {
        Self {
            framework: DEFAULT_TEST_FRAMEWORK.to_string(),
            max_diff_bytes: DEFAULT_MAX_DIFF_BYTES,
        }
    }

    pub fn with_max_diff_bytes(mut self, limit: usize) -> Self {
        self.max_diff_bytes = limit;
        self
    }

    pub fn max_diff_bytes(&self) -> usize {
        self.max_diff_bytes
    }

    /// Build the generation prompt for one file's diff.
    ///
    /// Diffs above the byte limit are refused rather than truncated, so the
    /// model never sees a partial change.
    pub fn build_generation_prompt(&self, change: &DiffChange) -> Result<String, PromptError> {
        let size = change.diff.len();
        if size > self.max_diff_bytes {
            return Err(PromptError::DiffTooLarge {
                size,
                limit: self.max_diff_bytes,
            });
        }

        Ok(format!(
            r#"You are an expert Python programmer specializing in the {framework} testing framework. Your task is to write unit tests for the code changes below.

## Changed File
`{path}` ({kind_note})

## Diff
```diff
{diff}
```

## Instructions

1. Write concise, effective {framework} tests that target the behavior modified or introduced by this diff.
2. Follow {framework} conventions: plain `test_*` functions, bare `assert` statements, fixtures and `pytest.raises` where they fit.
3. Import the code under test from its module path as it appears in the repository.
4. Cover the edge cases the change introduces, both successful and failing paths.
5. Keep each test independent of the others.

If the change is not meaningfully testable (comment or formatting changes only, renames with no logic change, or deletions that leave no logic behind), respond with exactly:

{sentinel}

## Response Format

- Respond with the Python test code only, in a single ```python code block.
- Do not add explanations, introductions or summaries before or after the code.
- Put any commentary inside the code as `#` comments."#,
            framework = self.framework,
            path = change.path,
            kind_note = kind_note(change.kind),
            diff = change.diff.trim_end(),
            sentinel = NO_TEST_NEEDED,
        ))
    }
}

fn kind_note(kind: ChangeKind) -> &'static str {
    match kind {
        ChangeKind::Added => "new file",
        ChangeKind::Modified => "modified",
        ChangeKind::Deleted => "deleted; only test logic that still exists elsewhere",
    }
}
