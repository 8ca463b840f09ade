//! # dtt-git
//!
//! Diff collection for dtt.
//!
//! Computes the diff between HEAD and the working tree, or between two
//! revisions, and keeps one [`DiffChange`] per changed source file.
//!
//! ## Key Types
//!
//! - [`DiffCollector`] - Computes and filters diffs for a repository
//! - [`DiffRange`] - Which two sides to compare
//! - [`DiffChange`] - One file's unified diff and change kind
//! - [`SourceFilter`] - Source/test file naming convention
//!
//! ## Usage
//!
//! ```rust,ignore
//! use dtt_git::{DiffCollector, DiffRange};
//!
//! let collector = DiffCollector::new(".");
//! for change in collector.collect(&DiffRange::commits("HEAD~1", None))? {
//!     println!("{} ({})", change.path, change.kind);
//! }
//! ```
//!
//! ## Diff Format
//!
//! Each change carries the file's segment of the unified diff, header
//! included, exactly as `git diff` prints it.

mod change;
mod diff;
mod filter;
pub mod parse;

pub use change::{ChangeKind, DiffChange};
pub use diff::{DiffCollector, DiffRange, GitError};
pub use filter::SourceFilter;
pub use parse::{parse_patch, ParseError};
