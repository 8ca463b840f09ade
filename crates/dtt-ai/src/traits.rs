use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Model used when none is configured
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

/// Errors that can occur while talking to the hosted model
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Remote service error: {message}")]
    RemoteService {
        /// HTTP status, when the service answered at all
        status: Option<u16>,
        message: String,
    },
}

impl AiError {
    pub fn remote(status: Option<u16>, message: impl Into<String>) -> Self {
        Self::RemoteService {
            status,
            message: message.into(),
        }
    }

    /// Whether the failure is limited to a single request
    pub fn is_per_request(&self) -> bool {
        matches!(self, AiError::RemoteService { .. })
    }
}

/// Connection settings for the hosted model.
///
/// Built once per run. `project_id` and `region` are validated on
/// construction, so a value of this type is always usable for a call.
#[derive(Debug, Clone, PartialEq)]
pub struct AiConfig {
    project_id: String,
    region: String,
    model_name: String,
    /// Per-request timeout (None = no limit)
    pub timeout: Option<Duration>,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl AiConfig {
    pub fn new(
        project_id: impl Into<String>,
        region: impl Into<String>,
        model_name: impl Into<String>,
    ) -> Result<Self, AiError> {
        let project_id = project_id.into().trim().to_string();
        let region = region.into().trim().to_string();
        let model_name = model_name.into().trim().to_string();

        if project_id.is_empty() {
            return Err(AiError::Configuration(
                "project ID is required (use --project or DTT_PROJECT_ID)".to_string(),
            ));
        }
        if region.is_empty() {
            return Err(AiError::Configuration(
                "region is required (use --region or DTT_REGION)".to_string(),
            ));
        }

        Ok(Self {
            project_id,
            region,
            model_name: if model_name.is_empty() {
                DEFAULT_MODEL.to_string()
            } else {
                model_name
            },
            timeout: None,
            temperature: 0.2,
            max_output_tokens: 2048,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

/// A hosted generative model that turns a prompt into text
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Human-readable name of the backend (e.g., "Vertex AI")
    fn name(&self) -> &str;

    /// Send one prompt and return the raw text of the response
    async fn generate(&self, prompt: &str, config: &AiConfig) -> Result<String, AiError>;
}
