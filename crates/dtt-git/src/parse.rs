use thiserror::Error;
use tracing::trace;

use crate::{ChangeKind, DiffChange};

const FILE_HEADER: &str = "diff --git ";
const NULL_PATH: &str = "/dev/null";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Unexpected content before the first file header: {0:?}")]
    UnexpectedPreamble(String),

    #[error("Could not determine the file path for diff segment: {0:?}")]
    MissingPath(String),
}

/// Split unified patch text into one [`DiffChange`] per file.
///
/// Each segment starts at a `diff --git` line and runs until the next one.
/// The segment text is kept verbatim, header included, so it can be handed
/// to the model exactly as `git diff` would print it.
pub fn parse_patch(patch: &str) -> Result<Vec<DiffChange>, ParseError> {
    let mut changes = Vec::new();
    let mut current: Option<String> = None;

    for line in patch.split_inclusive('\n') {
        if line.starts_with(FILE_HEADER) {
            if let Some(segment) = current.take() {
                changes.push(parse_segment(segment)?);
            }
            current = Some(line.to_string());
            continue;
        }

        match current.as_mut() {
            Some(segment) => segment.push_str(line),
            None if line.trim().is_empty() => {}
            None => return Err(ParseError::UnexpectedPreamble(line.trim_end().to_string())),
        }
    }

    if let Some(segment) = current {
        changes.push(parse_segment(segment)?);
    }

    trace!(files = changes.len(), "Parsed patch");
    Ok(changes)
}

fn parse_segment(segment: String) -> Result<DiffChange, ParseError> {
    let mut old_path: Option<String> = None;
    let mut new_path: Option<String> = None;
    let mut old_is_null = false;
    let mut new_is_null = false;
    let mut kind = ChangeKind::Modified;

    let mut lines = segment.lines();
    let header = lines.next().unwrap_or_default();

    for line in lines {
        if line.starts_with("@@") {
            break;
        }
        if line.starts_with("new file mode") {
            kind = ChangeKind::Added;
        } else if line.starts_with("deleted file mode") {
            kind = ChangeKind::Deleted;
        } else if let Some(rest) = line.strip_prefix("rename from ") {
            old_path = Some(unquote(rest).to_string());
        } else if let Some(rest) = line.strip_prefix("rename to ") {
            new_path = Some(unquote(rest).to_string());
        } else if let Some(rest) = line.strip_prefix("--- ") {
            match side_path(rest, "a/") {
                Some(path) => old_path = Some(path),
                None => old_is_null = true,
            }
        } else if let Some(rest) = line.strip_prefix("+++ ") {
            match side_path(rest, "b/") {
                Some(path) => new_path = Some(path),
                None => new_is_null = true,
            }
        }
    }

    if old_is_null {
        kind = ChangeKind::Added;
    } else if new_is_null {
        kind = ChangeKind::Deleted;
    }

    let path = new_path
        .or(old_path)
        .or_else(|| header_path(header))
        .ok_or_else(|| ParseError::MissingPath(header.to_string()))?;

    Ok(DiffChange::new(path, segment, kind))
}

/// Path from a `---`/`+++` line, or `None` for `/dev/null`
fn side_path(rest: &str, prefix: &str) -> Option<String> {
    let rest = unquote(rest.trim_end());
    if rest == NULL_PATH {
        return None;
    }
    Some(rest.strip_prefix(prefix).unwrap_or(rest).to_string())
}

/// Fallback for segments without `---`/`+++` lines (mode-only or binary changes)
fn header_path(header: &str) -> Option<String> {
    let rest = header.strip_prefix(FILE_HEADER)?.trim_end();
    let (_, new) = rest.split_once(" b/")?;
    let new = new.trim_end_matches('"');
    (!new.is_empty()).then(|| new.to_string())
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"')
        .and_then(|inner| inner.strip_suffix('"'))
        .unwrap_or(s)
}
