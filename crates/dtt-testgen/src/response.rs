use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::NO_TEST_NEEDED;

const FENCE: &str = "```";

/// What the model produced for one file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TestBody {
    /// Candidate test code, not validated
    Code { code: String },
    /// The model answered with the sentinel
    NoTestNeeded,
    /// A code block with nothing in it
    Empty,
}

/// Cleaned model output for one source file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedTest {
    pub source_path: String,
    pub body: TestBody,
}

impl GeneratedTest {
    /// Clean a raw model response for `source_path`.
    ///
    /// The sentinel counts when it is the whole cleaned answer, or when it
    /// opens the raw answer and is followed by an explanation.
    pub fn from_response(source_path: impl Into<String>, raw: &str) -> Self {
        let source_path = source_path.into();
        let cleaned = clean_response(raw);

        let body = if is_sentinel(&cleaned) || opens_with_sentinel(raw) {
            TestBody::NoTestNeeded
        } else if cleaned.trim().is_empty() {
            TestBody::Empty
        } else {
            TestBody::Code { code: cleaned }
        };

        debug!(
            source = %source_path,
            raw_len = raw.len(),
            outcome = body.short_description(),
            "Parsed model response"
        );

        Self { source_path, body }
    }

    pub fn code(&self) -> Option<&str> {
        match &self.body {
            TestBody::Code { code } => Some(code),
            _ => None,
        }
    }

    pub fn is_no_test_needed(&self) -> bool {
        matches!(self.body, TestBody::NoTestNeeded)
    }
}

impl TestBody {
    pub fn short_description(&self) -> &'static str {
        match self {
            TestBody::Code { .. } => "code",
            TestBody::NoTestNeeded => "no test needed",
            TestBody::Empty => "empty",
        }
    }
}

/// Whether `text` is the sentinel, ignoring case, surrounding whitespace and
/// inline backticks
pub fn is_sentinel(text: &str) -> bool {
    text.trim()
        .trim_matches('`')
        .trim()
        .eq_ignore_ascii_case(NO_TEST_NEEDED)
}

fn opens_with_sentinel(raw: &str) -> bool {
    raw.lines()
        .find(|line| !line.trim().is_empty())
        .is_some_and(is_sentinel)
}

/// Strip code fences and the prose around them.
///
/// With a fence present, the contents of the first fenced block are kept; an
/// unterminated block runs to the end of the text. Without a fence only
/// blank lines at either end are dropped, so already clean code (trailing
/// newline and indentation included) passes through unchanged.
pub fn clean_response(raw: &str) -> String {
    let lines: Vec<&str> = raw.lines().collect();

    let Some(open) = lines.iter().position(|line| is_fence(line)) else {
        let kept = trim_blank_lines(&lines);
        if kept.is_empty() {
            return String::new();
        }
        let mut text = kept.join("\n");
        if raw.ends_with('\n') {
            text.push('\n');
        }
        return text;
    };

    let body = &lines[open + 1..];
    let close = body
        .iter()
        .position(|line| is_fence(line))
        .unwrap_or(body.len());

    trim_blank_lines(&body[..close]).join("\n")
}

fn trim_blank_lines<'a, 'b>(lines: &'b [&'a str]) -> &'b [&'a str] {
    let start = lines
        .iter()
        .position(|line| !line.trim().is_empty())
        .unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|line| !line.trim().is_empty())
        .map_or(start, |i| i + 1);
    &lines[start..end]
}

// A fence line is three backticks, optionally followed by a language tag.
fn is_fence(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_variants() {
        for raw in ["NO_TEST_NEEDED", "no_test_needed", " NO_TEST_NEEDED \n"] {
            let test = GeneratedTest::from_response("mod.py", raw);
            assert!(test.is_no_test_needed(), "not recognized: {:?}", raw);
            assert_eq!(test.code(), None);
        }
    }

    #[test]
    fn test_fenced_sentinel() {
        let test = GeneratedTest::from_response("mod.py", "```\nNO_TEST_NEEDED\n```");
        assert!(test.is_no_test_needed());
    }

    #[test]
    fn test_sentinel_inside_prose_is_code() {
        let test = GeneratedTest::from_response("mod.py", "I think NO_TEST_NEEDED here");
        assert_eq!(test.code(), Some("I think NO_TEST_NEEDED here"));
    }

    #[test]
    fn test_strips_python_fence_and_prose() {
        let raw = "Here are the tests:\n\n```python\nimport pytest\n\ndef test_add():\n    assert add(1, 2) == 3\n```\n\nThese cover the new branch.";
        assert_eq!(
            clean_response(raw),
            "import pytest\n\ndef test_add():\n    assert add(1, 2) == 3"
        );
    }

    #[test]
    fn test_strips_bare_fence() {
        let raw = "```\ndef test_x():\n    assert True\n```";
        assert_eq!(clean_response(raw), "def test_x():\n    assert True");
    }

    #[test]
    fn test_only_first_block_is_kept() {
        let raw = "```py\ndef test_a():\n    pass\n```\nand also\n```\nprint('x')\n```";
        assert_eq!(clean_response(raw), "def test_a():\n    pass");
    }

    #[test]
    fn test_unterminated_fence_runs_to_end() {
        let raw = "```python\ndef test_a():\n    assert 1";
        assert_eq!(clean_response(raw), "def test_a():\n    assert 1");
    }

    #[test]
    fn test_clean_input_is_unchanged() {
        for code in [
            "def test_add():\n    assert add(2, 2) == 4",
            "def test_add():\n    assert add(2, 2) == 4\n",
        ] {
            assert_eq!(clean_response(code), code);
            assert_eq!(clean_response(&clean_response(code)), code);
        }
    }

    #[test]
    fn test_keeps_indentation_and_drops_blank_edges() {
        let raw = "\n\n    x = 1\n    assert x\n\n\n";
        assert_eq!(clean_response(raw), "    x = 1\n    assert x\n");

        let fenced = "```python\n\n    assert True\n\n```";
        assert_eq!(clean_response(fenced), "    assert True");
    }

    #[test]
    fn test_sentinel_followed_by_explanation() {
        let raw = "NO_TEST_NEEDED\n\nThe change only edits a comment, so there is nothing to test.";
        let test = GeneratedTest::from_response("pkg/mod.py", raw);
        assert!(test.is_no_test_needed());
        assert_eq!(test.code(), None);
    }

    #[test]
    fn test_sentinel_in_backticks() {
        for raw in ["`NO_TEST_NEEDED`", "```NO_TEST_NEEDED```", "`no_test_needed`\nOnly a docstring changed."] {
            let test = GeneratedTest::from_response("mod.py", raw);
            assert!(test.is_no_test_needed(), "not recognized: {:?}", raw);
        }
    }

    #[test]
    fn test_empty_block() {
        let test = GeneratedTest::from_response("mod.py", "```python\n```");
        assert_eq!(test.body, TestBody::Empty);
    }

    #[test]
    fn test_code_body_keeps_source_path() {
        let test = GeneratedTest::from_response("pkg/mod.py", "def test_x():\n    pass\n");
        assert_eq!(test.source_path, "pkg/mod.py");
        assert_eq!(test.code(), Some("def test_x():\n    pass\n"));
    }
}
