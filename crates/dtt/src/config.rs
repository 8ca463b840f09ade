//! Configuration file support for dtt.
//!
//! Settings are layered, highest first: command-line flags, environment
//! variables, `dtt.toml` in the working directory, then the global
//! `<config_dir>/dtt/config.toml`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use dtt_ai::{AiConfig, DEFAULT_MODEL};
use dtt_core::PipelineError;
use dtt_testgen::DEFAULT_MAX_DIFF_BYTES;

/// The project config file name
pub const PROJECT_CONFIG_FILE: &str = "dtt.toml";

/// Directory under the platform config dir holding the global file
pub const GLOBAL_CONFIG_DIR: &str = "dtt";

/// The global config file name
pub const GLOBAL_CONFIG_FILE: &str = "config.toml";

/// Warn above this many changed files unless configured otherwise
pub const DEFAULT_MAX_FILES: usize = 25;

pub const ENV_PROJECT: &str = "DTT_PROJECT_ID";
pub const ENV_REGION: &str = "DTT_REGION";
pub const ENV_MODEL: &str = "DTT_MODEL";

/// One configuration layer. Every field is optional so layers can be merged.
#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Cloud project id
    pub project: Option<String>,
    /// Vertex AI region, e.g. `us-central1`
    pub region: Option<String>,
    pub model: Option<String>,
    /// Write tests here instead of printing them
    pub output_dir: Option<PathBuf>,
    pub max_files: Option<usize>,
    pub max_diff_bytes: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    /// Load a config file.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let config: FileConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))?;

        Ok(Some(config))
    }

    /// Load `dtt.toml` from the working directory
    pub fn load_project(working_dir: &Path) -> Result<Option<Self>> {
        Self::load_from(&working_dir.join(PROJECT_CONFIG_FILE))
    }

    /// Load the global config, if the platform has a config directory
    pub fn load_global() -> Result<Option<Self>> {
        match Self::global_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(None),
        }
    }

    pub fn global_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(GLOBAL_CONFIG_DIR).join(GLOBAL_CONFIG_FILE))
    }

    /// Layer built from environment variables. Empty values count as unset.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            project: get(ENV_PROJECT),
            region: get(ENV_REGION),
            model: get(ENV_MODEL),
            ..Self::default()
        }
    }

    /// Fill unset fields from `lower`
    pub fn or(self, lower: FileConfig) -> FileConfig {
        FileConfig {
            project: self.project.or(lower.project),
            region: self.region.or(lower.region),
            model: self.model.or(lower.model),
            output_dir: self.output_dir.or(lower.output_dir),
            max_files: self.max_files.or(lower.max_files),
            max_diff_bytes: self.max_diff_bytes.or(lower.max_diff_bytes),
            timeout_secs: self.timeout_secs.or(lower.timeout_secs),
        }
    }
}

/// Fully resolved settings for one run
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub project: Option<String>,
    pub region: Option<String>,
    pub model: String,
    pub output_dir: Option<PathBuf>,
    pub max_files: usize,
    pub max_diff_bytes: usize,
    pub timeout: Option<Duration>,
}

impl Settings {
    /// Merge the layers, highest priority first, and apply defaults.
    ///
    /// A relative `output_dir` is taken relative to `working_dir`.
    pub fn resolve(layers: Vec<FileConfig>, working_dir: &Path) -> Self {
        let merged = layers
            .into_iter()
            .fold(FileConfig::default(), |acc, layer| acc.or(layer));

        Self {
            project: merged.project,
            region: merged.region,
            model: merged.model.unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            output_dir: merged.output_dir.map(|dir| {
                if dir.is_absolute() {
                    dir
                } else {
                    working_dir.join(dir)
                }
            }),
            max_files: merged.max_files.unwrap_or(DEFAULT_MAX_FILES),
            max_diff_bytes: merged.max_diff_bytes.unwrap_or(DEFAULT_MAX_DIFF_BYTES),
            timeout: merged.timeout_secs.map(Duration::from_secs),
        }
    }

    /// Load the files and resolve against `flags` and the process environment
    pub fn load(flags: FileConfig, working_dir: &Path) -> Result<Self> {
        let env = FileConfig::from_env(|key| std::env::var(key).ok());
        let project = FileConfig::load_project(working_dir)?.unwrap_or_default();
        let global = FileConfig::load_global()
            .context("Failed to load global configuration")?
            .unwrap_or_default();

        Ok(Self::resolve(vec![flags, env, project, global], working_dir))
    }

    /// Build the model configuration; project and region must be known
    pub fn ai_config(&self) -> Result<AiConfig, PipelineError> {
        let project = self.project.as_deref().ok_or_else(|| {
            PipelineError::Configuration(format!(
                "missing project id; pass --project or set {}",
                ENV_PROJECT
            ))
        })?;
        let region = self.region.as_deref().ok_or_else(|| {
            PipelineError::Configuration(format!(
                "missing region; pass --region or set {}",
                ENV_REGION
            ))
        })?;

        let mut config = AiConfig::new(project, region, &self.model)?;
        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }
        Ok(config)
    }
}
