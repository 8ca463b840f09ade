//! # dtt-ai
//!
//! Hosted model access for dtt.
//!
//! ## Key Types
//!
//! - [`ModelClient`] - The seam between the pipeline and a model backend
//! - [`VertexClient`] - Gemini on Vertex AI, authenticated with ambient credentials
//! - [`AiConfig`] - Project, region and model, validated on construction
//! - [`AiError`] - Configuration, authentication and remote service failures

mod credentials;
mod traits;
pub mod vertex;

pub use credentials::{token_from_env, CredentialProvider, TOKEN_ENV_VARS};
pub use traits::{AiConfig, AiError, ModelClient, DEFAULT_MODEL};
pub use vertex::VertexClient;

/// Create the default model client
pub fn create_client() -> Result<Box<dyn ModelClient>, AiError> {
    Ok(Box::new(VertexClient::new()?))
}
