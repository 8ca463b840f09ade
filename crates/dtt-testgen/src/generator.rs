use dtt_ai::{AiConfig, AiError, ModelClient};
use dtt_git::DiffChange;
use tracing::{debug, info};

use crate::{GeneratedTest, PromptError, TestPrompts};

/// Runs one file's diff through the model and cleans up the answer
pub struct TestGenerator<'a> {
    client: &'a dyn ModelClient,
    prompts: TestPrompts,
}

impl<'a> TestGenerator<'a> {
    pub fn new(client: &'a dyn ModelClient, prompts: TestPrompts) -> Self {
        Self { client, prompts }
    }

    pub fn client_name(&self) -> &str {
        self.client.name()
    }

    /// Build the prompt for `change`, refusing oversized diffs
    pub fn prepare(&self, change: &DiffChange) -> Result<String, PromptError> {
        let prompt = self.prompts.build_generation_prompt(change)?;
        debug!(
            path = %change.path,
            prompt_len = prompt.len(),
            "Built generation prompt"
        );
        Ok(prompt)
    }

    /// Send a prepared prompt and parse the response
    pub async fn complete(
        &self,
        change: &DiffChange,
        prompt: &str,
        config: &AiConfig,
    ) -> Result<GeneratedTest, AiError> {
        let raw = self.client.generate(prompt, config).await?;

        info!(
            path = %change.path,
            response_len = raw.len(),
            "Generation completed"
        );

        Ok(GeneratedTest::from_response(change.path.clone(), &raw))
    }

    /// Prepare and complete in one step
    pub async fn generate(
        &self,
        change: &DiffChange,
        config: &AiConfig,
    ) -> Result<GeneratedTest, GenerationError> {
        let prompt = self.prepare(change)?;
        Ok(self.complete(change, &prompt, config).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("{0}")]
    Prompt(#[from] PromptError),

    #[error("{0}")]
    Model(#[from] AiError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use dtt_git::ChangeKind;
    use std::sync::Mutex;

    use crate::TestBody;

    /// Answers every prompt with a fixed response and records the prompts.
    struct CannedClient {
        response: Result<String, AiError>,
        prompts: Mutex<Vec<String>>,
    }

    impl CannedClient {
        fn new(response: Result<String, AiError>) -> Self {
            Self {
                response,
                prompts: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ModelClient for CannedClient {
        fn name(&self) -> &str {
            "canned"
        }

        async fn generate(&self, prompt: &str, _config: &AiConfig) -> Result<String, AiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.response.clone()
        }
    }

    fn change() -> DiffChange {
        DiffChange::new(
            "pkg/mod.py",
            "diff --git a/pkg/mod.py b/pkg/mod.py\n@@ -1 +1 @@\n-x = 1\n+x = 2\n",
            ChangeKind::Modified,
        )
    }

    fn config() -> AiConfig {
        AiConfig::new("project", "us-central1", "gemini-2.0-flash").unwrap()
    }

    #[tokio::test]
    async fn test_generate_cleans_response() {
        let client = CannedClient::new(Ok("```python\ndef test_x():\n    assert x == 2\n```".into()));
        let generator = TestGenerator::new(&client, TestPrompts::new());

        let test = generator.generate(&change(), &config()).await.unwrap();

        assert_eq!(test.source_path, "pkg/mod.py");
        assert_eq!(test.code(), Some("def test_x():\n    assert x == 2"));

        let prompts = client.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("+x = 2"));
    }

    #[tokio::test]
    async fn test_generate_recognizes_sentinel() {
        let client = CannedClient::new(Ok("no_test_needed\n".into()));
        let generator = TestGenerator::new(&client, TestPrompts::new());

        let test = generator.generate(&change(), &config()).await.unwrap();
        assert_eq!(test.body, TestBody::NoTestNeeded);
    }

    #[tokio::test]
    async fn test_oversized_diff_never_reaches_model() {
        let client = CannedClient::new(Ok("unused".into()));
        let generator = TestGenerator::new(&client, TestPrompts::new().with_max_diff_bytes(8));

        let result = generator.generate(&change(), &config()).await;

        assert!(matches!(result, Err(GenerationError::Prompt(_))));
        assert!(client.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_model_error_is_propagated() {
        let client = CannedClient::new(Err(AiError::remote(Some(500), "HTTP 500: internal")));
        let generator = TestGenerator::new(&client, TestPrompts::new());

        let result = generator.generate(&change(), &config()).await;
        assert!(matches!(
            result,
            Err(GenerationError::Model(AiError::RemoteService { status: Some(500), .. }))
        ));
    }
}
