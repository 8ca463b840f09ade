use std::path::PathBuf;
use thiserror::Error;

use dtt_ai::AiError;
use dtt_git::{GitError, ParseError};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Repository error: {0}")]
    Repository(GitError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Remote service error: {0}")]
    RemoteService(String),

    #[error("Malformed diff output: {0}")]
    Parse(ParseError),

    #[error("Failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Interaction failed: {0}")]
    Interaction(String),
}

impl From<GitError> for PipelineError {
    fn from(e: GitError) -> Self {
        match e {
            GitError::Parse(parse) => PipelineError::Parse(parse),
            other => PipelineError::Repository(other),
        }
    }
}

impl From<AiError> for PipelineError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Configuration(msg) => PipelineError::Configuration(msg),
            AiError::Authentication(msg) => PipelineError::Authentication(msg),
            AiError::RemoteService { message, .. } => PipelineError::RemoteService(message),
        }
    }
}

impl PipelineError {
    /// Process exit code for a run aborted by this error
    pub fn exit_code(&self) -> i32 {
        match self {
            PipelineError::Repository(_) => 2,
            PipelineError::Configuration(_) => 3,
            PipelineError::Authentication(_) => 4,
            PipelineError::RemoteService(_) => 5,
            PipelineError::Parse(_) => 6,
            PipelineError::Io { .. } | PipelineError::Interaction(_) => 7,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_errors_split_into_repository_and_parse() {
        let repo: PipelineError = GitError::NotARepo("/tmp/x".into()).into();
        assert!(matches!(repo, PipelineError::Repository(_)));
        assert_eq!(repo.exit_code(), 2);

        let parse: PipelineError = GitError::Parse(ParseError::MissingPath("diff --git".into())).into();
        assert!(matches!(parse, PipelineError::Parse(_)));
        assert_eq!(parse.exit_code(), 6);
    }

    #[test]
    fn test_ai_errors_map_onto_taxonomy() {
        let auth: PipelineError = AiError::Authentication("HTTP 403: denied".into()).into();
        assert_eq!(auth.to_string(), "Authentication error: HTTP 403: denied");
        assert_eq!(auth.exit_code(), 4);

        let config: PipelineError = AiError::Configuration("region is required".into()).into();
        assert_eq!(config.exit_code(), 3);

        let remote: PipelineError = AiError::remote(Some(500), "HTTP 500: boom").into();
        assert_eq!(remote.to_string(), "Remote service error: HTTP 500: boom");
    }
}
