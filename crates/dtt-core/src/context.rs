use std::time::{Duration, Instant};

use dtt_ai::AiConfig;
use dtt_git::DiffRange;

use crate::PipelineError;

/// Immutable settings for one run
#[derive(Debug, Clone)]
pub struct RunContext {
    pub range: DiffRange,
    /// Ask before processing more files than this (None = never ask)
    pub max_files: Option<usize>,
    /// The model settings, or why they are unusable. Only consulted once a
    /// file actually needs the model.
    ai_config: Result<AiConfig, String>,
    started_at: Instant,
}

impl RunContext {
    pub fn new(range: DiffRange, ai_config: AiConfig) -> Self {
        Self::with_model(range, Ok(ai_config))
    }

    /// Context whose model settings are incomplete. Runs with no changed
    /// files still succeed; anything else fails with a configuration error.
    pub fn without_model(range: DiffRange, problem: impl Into<String>) -> Self {
        Self::with_model(range, Err(problem.into()))
    }

    fn with_model(range: DiffRange, ai_config: Result<AiConfig, String>) -> Self {
        Self {
            range,
            max_files: None,
            ai_config,
            started_at: Instant::now(),
        }
    }

    pub fn with_max_files(mut self, max: usize) -> Self {
        self.max_files = Some(max);
        self
    }

    pub fn ai_config(&self) -> Result<&AiConfig, PipelineError> {
        self.ai_config
            .as_ref()
            .map_err(|problem| PipelineError::Configuration(problem.clone()))
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Whether `files` is above the warning threshold
    pub fn exceeds_max_files(&self, files: usize) -> bool {
        self.max_files.is_some_and(|max| files > max)
    }
}
