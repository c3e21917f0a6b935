//! Model backends.
//!
//! Every analysis step and the final decision reach the model through
//! [`LlmProvider`]. Azure OpenAI, the only backend shipped, sits behind the
//! `azure-openai` feature.
//!
//! Endpoint settings and OAuth client secrets are read with
//! [`CredentialBuilder`] and stay redacted in `Debug` and `Display`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub mod credentials;
mod token;

#[cfg(feature = "azure-openai")]
mod azure_openai;

pub use credentials::{Credential, CredentialBuilder, CredentialSet, CredentialSource};
pub use token::{AccessToken, ClientCredentials};

#[cfg(feature = "azure-openai")]
pub use azure_openai::{AzureOpenAiProvider, AzureOpenAiSettings};

/// Why a model call failed.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    HttpError(String),

    #[error("Rate limit exceeded, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    ParseError(String),

    #[error("Authentication failed")]
    AuthError,

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

/// Per-request model settings, shared by every call of a run.
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Deployment name, reported in logs and usage
    pub model: String,

    /// Output token ceiling
    pub max_tokens: u32,

    /// Sampling temperature; claim runs use 0.0
    pub temperature: f32,

    /// Upper bound on one call, token exchange excluded
    pub timeout: Duration,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o".to_string(),
            max_tokens: 2000,
            temperature: 0.0,
            timeout: Duration::from_secs(60),
        }
    }
}

/// One turn of a prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// `system` or `user`
    pub role: String,

    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Text and accounting for one model call.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
    pub usage: TokenUsage,

    /// Deployment that answered
    pub model: String,

    /// `finish_reason` as reported, if any
    pub stop_reason: Option<String>,
}

/// Tokens billed for one call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl TokenUsage {
    pub fn total(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Sends a prompt to a model and returns its text.
///
/// One instance serves a whole batch behind an `Arc`, including records
/// evaluated concurrently.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError>;

    /// Short backend label for log lines.
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_message_creation() {
        let system = ChatMessage::system("You are a claim validation agent.");
        assert_eq!(system.role, "system");

        let user = ChatMessage::user("Patient record summary: ...");
        assert_eq!(user.role, "user");
    }

    #[test]
    fn test_token_usage_total() {
        let usage = TokenUsage {
            prompt_tokens: 1200,
            completion_tokens: 300,
        };
        assert_eq!(usage.total(), 1500);
    }

    #[test]
    fn test_completion_defaults_are_deterministic() {
        let config = CompletionConfig::default();
        assert_eq!(config.temperature, 0.0);
        assert_eq!(config.timeout, Duration::from_secs(60));
    }
}
