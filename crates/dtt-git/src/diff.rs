use git2::{Diff, DiffFormat, DiffOptions, Repository, Tree};
use std::path::{Component, Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::parse::{parse_patch, ParseError};
use crate::{DiffChange, SourceFilter};

#[derive(Error, Debug)]
pub enum GitError {
    #[error("Not a git repository: {0}")]
    NotARepo(String),

    #[error("Unknown revision '{spec}': {source}")]
    UnknownRevision {
        spec: String,
        #[source]
        source: git2::Error,
    },

    #[error("Git operation failed: {0}")]
    GitOperationFailed(#[from] git2::Error),

    #[error("Malformed diff output: {0}")]
    Parse(#[from] ParseError),
}

/// Which two sides of the repository to compare
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffRange {
    /// HEAD against the working tree and index (`git diff HEAD`)
    WorkingTree,
    /// Two revisions, older first (`git diff <from> <to>`)
    Commits { from: String, to: String },
}

impl DiffRange {
    /// Range between `from` and `to`, with `to` defaulting to HEAD
    pub fn commits(from: impl Into<String>, to: Option<String>) -> Self {
        Self::Commits {
            from: from.into(),
            to: to.unwrap_or_else(|| "HEAD".to_string()),
        }
    }
}

impl std::fmt::Display for DiffRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiffRange::WorkingTree => write!(f, "HEAD..working tree"),
            DiffRange::Commits { from, to } => write!(f, "{}..{}", from, to),
        }
    }
}

/// Collects per-file source changes from a git repository
pub struct DiffCollector {
    working_dir: PathBuf,
    filter: SourceFilter,
    /// Optional file or directory the diff is restricted to
    target: Option<String>,
    context_lines: u32,
}

impl DiffCollector {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            filter: SourceFilter::default(),
            target: None,
            context_lines: 3,
        }
    }

    pub fn with_target(mut self, target: Option<String>) -> Self {
        self.target = target
            .map(|t| t.trim().trim_end_matches('/').to_string())
            .filter(|t| !t.is_empty());
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Collect the retained source changes for `range`, in diff order
    pub fn collect(&self, range: &DiffRange) -> Result<Vec<DiffChange>, GitError> {
        let patch = self.patch_text(range)?;
        let changes = parse_patch(&patch)?;
        let total = changes.len();

        let retained: Vec<DiffChange> = changes
            .into_iter()
            .filter(|change| self.filter.accepts(&change.path))
            .collect();

        debug!(
            range = %range,
            files_in_diff = total,
            retained = retained.len(),
            "Collected source changes"
        );

        Ok(retained)
    }

    /// Render the full unified diff for `range`
    pub fn patch_text(&self, range: &DiffRange) -> Result<String, GitError> {
        let repo = Repository::discover(&self.working_dir)
            .map_err(|_| GitError::NotARepo(self.working_dir.display().to_string()))?;

        let mut opts = DiffOptions::new();
        opts.context_lines(self.context_lines);
        let pathspec = self
            .target
            .as_deref()
            .and_then(|target| repo_pathspec(&repo, &self.working_dir, target));
        if let Some(ref spec) = pathspec {
            debug!(target = ?self.target, pathspec = %spec, "Restricting diff");
            opts.pathspec(spec.as_str());
        }

        let diff = match range {
            DiffRange::WorkingTree => {
                let head_tree = head_tree(&repo)?;
                repo.diff_tree_to_workdir_with_index(head_tree.as_ref(), Some(&mut opts))?
            }
            DiffRange::Commits { from, to } => {
                let old_tree = resolve_tree(&repo, from)?;
                let new_tree = resolve_tree(&repo, to)?;
                repo.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))?
            }
        };

        render_patch(&diff)
    }
}

/// Rewrite `target`, given relative to `working_dir`, as a '/'-separated
/// path from the repository root. `None` means the whole repository.
fn repo_pathspec(repo: &Repository, working_dir: &Path, target: &str) -> Option<String> {
    let root = repo.workdir().and_then(|dir| dir.canonicalize().ok());
    let target = Path::new(target);

    let relative = match &root {
        Some(root) if target.is_absolute() => target
            .canonicalize()
            .ok()
            .and_then(|t| t.strip_prefix(root).ok().map(Path::to_path_buf))
            .unwrap_or_else(|| target.to_path_buf()),
        Some(root) => working_dir
            .canonicalize()
            .ok()
            .and_then(|dir| dir.strip_prefix(root).ok().map(Path::to_path_buf))
            .unwrap_or_default()
            .join(target),
        None => target.to_path_buf(),
    };

    let mut parts: Vec<String> = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::ParentDir => {
                parts.pop();
            }
            _ => {}
        }
    }

    if parts.is_empty() {
        None
    } else {
        Some(parts.join("/"))
    }
}

// An unborn HEAD diffs against the empty tree.
fn head_tree(repo: &Repository) -> Result<Option<Tree<'_>>, GitError> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_tree()?)),
        Err(e) if e.code() == git2::ErrorCode::UnbornBranch => Ok(None),
        Err(e) => Err(GitError::GitOperationFailed(e)),
    }
}

fn resolve_tree<'r>(repo: &'r Repository, spec: &str) -> Result<Tree<'r>, GitError> {
    repo.revparse_single(spec)
        .and_then(|object| object.peel_to_tree())
        .map_err(|source| GitError::UnknownRevision {
            spec: spec.to_string(),
            source,
        })
}

fn render_patch(diff: &Diff<'_>) -> Result<String, GitError> {
    let mut text = String::new();

    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        // File ('F') and hunk ('H') headers carry their own text
        match line.origin() {
            origin @ ('+' | '-' | ' ') => text.push(origin),
            _ => {}
        }
        text.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;

    debug!(diff_len = text.len(), "Rendered git diff");
    Ok(text)
}
