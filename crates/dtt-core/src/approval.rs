use dtt_git::DiffChange;

use crate::PipelineError;

/// Answer to "send this file to the model?"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Approval {
    Generate,
    Skip,
    /// Stop the run; remaining files are skipped
    Quit,
}

/// Gate consulted before remote calls.
///
/// Implementations may block on user input; the run is sequential, so
/// nothing else is in flight while they do.
pub trait Approver: Send + Sync {
    /// Called once when the number of files exceeds the configured limit
    fn approve_batch(&self, _files: usize, _limit: usize) -> Result<bool, PipelineError> {
        Ok(true)
    }

    /// Called before each remote call
    fn approve_file(
        &self,
        index: usize,
        total: usize,
        change: &DiffChange,
    ) -> Result<Approval, PipelineError>;
}

/// Approves everything without asking
pub struct AutoApprove;

impl Approver for AutoApprove {
    fn approve_file(
        &self,
        _index: usize,
        _total: usize,
        _change: &DiffChange,
    ) -> Result<Approval, PipelineError> {
        Ok(Approval::Generate)
    }
}
