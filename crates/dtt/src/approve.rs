//! Terminal prompts for `--interactive`.

use colored::Colorize;
use dialoguer::{Confirm, Select};

use dtt_core::{Approval, Approver, PipelineError};
use dtt_git::DiffChange;

const CHOICES: &[&str] = &["Generate tests", "Skip this file", "Quit"];

/// Asks on the terminal before each remote call
pub struct PromptApprover;

fn interaction_error(e: dialoguer::Error) -> PipelineError {
    PipelineError::Interaction(e.to_string())
}

impl Approver for PromptApprover {
    fn approve_batch(&self, files: usize, limit: usize) -> Result<bool, PipelineError> {
        Confirm::new()
            .with_prompt(format!(
                "{} source files changed (warning limit {}). Generate tests for all of them?",
                files, limit
            ))
            .default(false)
            .interact()
            .map_err(interaction_error)
    }

    fn approve_file(
        &self,
        index: usize,
        total: usize,
        change: &DiffChange,
    ) -> Result<Approval, PipelineError> {
        let prompt = format!(
            "[{}/{}] {} ({}, {} {})",
            index + 1,
            total,
            change.path.bold(),
            change.kind,
            format!("+{}", change.insertions()).green(),
            format!("-{}", change.deletions()).red()
        );

        let choice = Select::new()
            .with_prompt(prompt)
            .items(CHOICES)
            .default(0)
            .interact()
            .map_err(interaction_error)?;

        Ok(match choice {
            0 => Approval::Generate,
            1 => Approval::Skip,
            _ => Approval::Quit,
        })
    }
}
