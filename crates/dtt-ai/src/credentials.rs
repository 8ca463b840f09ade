use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::AiError;

/// Environment variables checked for a ready-made access token, in order
pub const TOKEN_ENV_VARS: &[&str] = &["DTT_ACCESS_TOKEN", "GOOGLE_OAUTH_ACCESS_TOKEN"];

/// Resolves an OAuth access token from ambient credentials.
///
/// Lookup order: the variables in [`TOKEN_ENV_VARS`], then
/// `gcloud auth application-default print-access-token`. The token is
/// resolved once and reused for the rest of the run.
pub struct CredentialProvider {
    gcloud_binary: PathBuf,
    cached: OnceCell<String>,
}

impl Default for CredentialProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialProvider {
    pub fn new() -> Self {
        Self {
            gcloud_binary: PathBuf::from("gcloud"),
            cached: OnceCell::new(),
        }
    }

    /// Provider that always hands out `token`
    pub fn with_static_token(token: impl Into<String>) -> Self {
        Self {
            gcloud_binary: PathBuf::from("gcloud"),
            cached: OnceCell::new_with(Some(token.into())),
        }
    }

    pub fn with_gcloud_binary(mut self, path: PathBuf) -> Self {
        self.gcloud_binary = path;
        self
    }

    pub async fn access_token(&self) -> Result<String, AiError> {
        self.cached
            .get_or_try_init(|| self.resolve())
            .await
            .cloned()
    }

    async fn resolve(&self) -> Result<String, AiError> {
        if let Some(token) = token_from_env(|key| std::env::var(key).ok()) {
            debug!("Using access token from environment");
            return Ok(token);
        }
        self.gcloud_token().await
    }

    async fn gcloud_token(&self) -> Result<String, AiError> {
        debug!(binary = %self.gcloud_binary.display(), "Requesting access token from gcloud");

        let output = Command::new(&self.gcloud_binary)
            .args(["auth", "application-default", "print-access-token"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                AiError::Authentication(format!(
                    "no credentials found: set {} or install gcloud and run \
                     `gcloud auth application-default login` ({})",
                    TOKEN_ENV_VARS[0], e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AiError::Authentication(format!(
                "gcloud could not provide an access token: {}",
                stderr.trim()
            )));
        }

        let token = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if token.is_empty() {
            return Err(AiError::Authentication(
                "gcloud returned an empty access token".to_string(),
            ));
        }
        Ok(token)
    }
}

/// First non-empty token among [`TOKEN_ENV_VARS`]
pub fn token_from_env(lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|key| lookup(key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_env_token_precedence() {
        let env = lookup(&[
            ("DTT_ACCESS_TOKEN", "dtt-token"),
            ("GOOGLE_OAUTH_ACCESS_TOKEN", "google-token"),
        ]);
        assert_eq!(token_from_env(env), Some("dtt-token".to_string()));
    }

    #[test]
    fn test_env_token_skips_blank_values() {
        let env = lookup(&[
            ("DTT_ACCESS_TOKEN", "   "),
            ("GOOGLE_OAUTH_ACCESS_TOKEN", "google-token\n"),
        ]);
        assert_eq!(token_from_env(env), Some("google-token".to_string()));
    }

    #[test]
    fn test_env_token_absent() {
        assert_eq!(token_from_env(lookup(&[])), None);
    }

    #[tokio::test]
    async fn test_static_token() {
        let provider = CredentialProvider::with_static_token("abc");
        assert_eq!(provider.access_token().await.unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_missing_gcloud_is_authentication_error() {
        let provider = CredentialProvider::new()
            .with_gcloud_binary(PathBuf::from("/nonexistent/dtt-test-gcloud"));
        let result = provider.gcloud_token().await;
        assert!(matches!(result, Err(AiError::Authentication(_))));
    }
}
