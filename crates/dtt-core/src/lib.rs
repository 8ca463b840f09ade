//! Pipeline orchestration: collect the diff, ask the model for each file,
//! and write or print what comes back.

mod approval;
mod context;
mod error;
mod outcome;
mod output;
mod runner;

pub use approval::{Approval, Approver, AutoApprove};
pub use context::RunContext;
pub use error::PipelineError;
pub use outcome::{FileOutcome, RunReport};
pub use output::{Emitted, OutputSink};
pub use runner::PipelineRunner;
