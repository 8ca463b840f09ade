//! Vertex AI `generateContent` client.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::{AiConfig, AiError, CredentialProvider, ModelClient};

const CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_ERROR_BODY_CHARS: usize = 500;

const SAFETY_CATEGORIES: &[&str] = &[
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];
const SAFETY_THRESHOLD: &str = "BLOCK_MEDIUM_AND_ABOVE";

/// Client for Gemini models hosted on Vertex AI
pub struct VertexClient {
    http: reqwest::Client,
    credentials: CredentialProvider,
}

impl VertexClient {
    pub fn new() -> Result<Self, AiError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AiError::Configuration(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            credentials: CredentialProvider::new(),
        })
    }
}

#[async_trait]
impl ModelClient for VertexClient {
    fn name(&self) -> &str {
        "Vertex AI"
    }

    async fn generate(&self, prompt: &str, config: &AiConfig) -> Result<String, AiError> {
        let token = self.credentials.access_token().await?;
        let url = endpoint_url(config);
        let body = GenerateRequest::new(prompt, config);

        debug!(
            url = %url,
            model = config.model_name(),
            prompt_len = prompt.len(),
            "Calling model"
        );
        let start = Instant::now();

        let mut request = self.http.post(&url).bearer_auth(token).json(&body);
        if let Some(timeout) = config.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(transport_error)?;

        info!(
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            response_len = text.len(),
            "Model responded"
        );

        if !(200..300).contains(&status) {
            return Err(status_error(status, &text, config));
        }

        extract_text(&text)
    }
}

/// `generateContent` URL for the configured project, region and model
pub fn endpoint_url(config: &AiConfig) -> String {
    let host = if config.region() == "global" {
        "aiplatform.googleapis.com".to_string()
    } else {
        format!("{}-aiplatform.googleapis.com", config.region())
    };

    format!(
        "https://{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
        host,
        config.project_id(),
        config.region(),
        config.model_name()
    )
}

fn transport_error(e: reqwest::Error) -> AiError {
    if e.is_timeout() {
        AiError::remote(None, format!("request timed out: {}", e))
    } else {
        AiError::remote(e.status().map(|s| s.as_u16()), e.to_string())
    }
}

/// Map a non-2xx answer onto the error taxonomy
pub fn status_error(status: u16, body: &str, config: &AiConfig) -> AiError {
    let message = error_message(body);

    match status {
        401 | 403 => AiError::Authentication(format!("HTTP {}: {}", status, message)),
        404 => AiError::Configuration(format!(
            "model '{}' is not available in region '{}' for project '{}': {}",
            config.model_name(),
            config.region(),
            config.project_id(),
            message
        )),
        _ => AiError::remote(Some(status), format!("HTTP {}: {}", status, message)),
    }
}

fn error_message(body: &str) -> String {
    if let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) {
        return envelope.error.message;
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > MAX_ERROR_BODY_CHARS {
        let cut: String = trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}...", cut)
    } else {
        trimmed.to_string()
    }
}

/// Concatenate the text parts of the first candidate
pub fn extract_text(body: &str) -> Result<String, AiError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| AiError::remote(None, format!("unreadable model response: {}", e)))?;

    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        return Err(AiError::remote(
            None,
            format!("prompt was blocked by the model ({})", reason),
        ));
    }

    let candidate = response
        .candidates
        .first()
        .ok_or_else(|| AiError::remote(None, "model returned no candidates"))?;

    let text: String = candidate
        .content
        .as_ref()
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        let reason = candidate.finish_reason.as_deref().unwrap_or("unknown");
        return Err(AiError::remote(
            None,
            format!("model returned no text (finish reason: {})", reason),
        ));
    }

    Ok(text)
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [RequestContent<'a>; 1],
    generation_config: GenerationConfig,
    safety_settings: Vec<SafetySetting>,
}

impl<'a> GenerateRequest<'a> {
    fn new(prompt: &'a str, config: &AiConfig) -> Self {
        Self {
            contents: [RequestContent {
                role: "user",
                parts: [RequestPart { text: prompt }],
            }],
            generation_config: GenerationConfig {
                temperature: config.temperature,
                max_output_tokens: config.max_output_tokens,
            },
            safety_settings: SAFETY_CATEGORIES
                .iter()
                .map(|&category| SafetySetting {
                    category,
                    threshold: SAFETY_THRESHOLD,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct RequestContent<'a> {
    role: &'static str,
    parts: [RequestPart<'a>; 1],
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
struct SafetySetting {
    category: &'static str,
    threshold: &'static str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<ResponseContent>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> AiConfig {
        AiConfig::new("my-project", "us-central1", "gemini-2.0-flash").unwrap()
    }

    #[test]
    fn test_endpoint_url_regional() {
        assert_eq!(
            endpoint_url(&config()),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/my-project/locations/us-central1/publishers/google/models/gemini-2.0-flash:generateContent"
        );
    }

    #[test]
    fn test_endpoint_url_global() {
        let config = AiConfig::new("p", "global", "gemini-2.0-flash").unwrap();
        assert!(endpoint_url(&config).starts_with("https://aiplatform.googleapis.com/v1/projects/p/locations/global/"));
    }

    #[test]
    fn test_request_body_shape() {
        let body = serde_json::to_value(GenerateRequest::new("write tests", &config())).unwrap();

        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "write tests");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 2048);
        assert_eq!(body["safetySettings"].as_array().unwrap().len(), 4);
        assert_eq!(body["safetySettings"][0]["threshold"], "BLOCK_MEDIUM_AND_ABOVE");
    }

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"def test_a():\n"},{"text":"    pass\n"}]},"finishReason":"STOP"}]}"#;
        assert_eq!(extract_text(body).unwrap(), "def test_a():\n    pass\n");
    }

    #[test]
    fn test_extract_text_without_candidates() {
        let result = extract_text(r#"{"candidates":[]}"#);
        assert!(matches!(result, Err(AiError::RemoteService { status: None, .. })));
    }

    #[test]
    fn test_extract_text_blocked_prompt() {
        let result = extract_text(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#);
        match result {
            Err(AiError::RemoteService { message, .. }) => assert!(message.contains("SAFETY")),
            other => panic!("expected RemoteService, got {:?}", other),
        }
    }

    #[test]
    fn test_extract_text_empty_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[]},"finishReason":"MAX_TOKENS"}]}"#;
        match extract_text(body) {
            Err(AiError::RemoteService { message, .. }) => assert!(message.contains("MAX_TOKENS")),
            other => panic!("expected RemoteService, got {:?}", other),
        }
    }

    #[test]
    fn test_status_error_mapping() {
        let body = r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#;
        assert_eq!(
            status_error(403, body, &config()),
            AiError::Authentication("HTTP 403: Permission denied".to_string())
        );
        assert!(matches!(
            status_error(401, "", &config()),
            AiError::Authentication(_)
        ));
        assert!(matches!(
            status_error(404, "not found", &config()),
            AiError::Configuration(_)
        ));
        assert_eq!(
            status_error(429, "quota", &config()),
            AiError::remote(Some(429), "HTTP 429: quota")
        );
    }
}
