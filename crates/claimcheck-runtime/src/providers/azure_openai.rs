//! Azure OpenAI chat-completions provider.
//!
//! Authenticates with a bearer token from an OAuth2 client-credentials
//! exchange and tags every request with the deployment's project id.
//!
//! ## Settings
//!
//! | Config key | Environment | Required |
//! |------------|-------------|----------|
//! | `auth_url` | `AUTH_API_URL` | yes |
//! | `auth_scope` | `AUTH_API_SCOPE` | yes |
//! | `client_id` | `AUTH_CLIENT_ID` | yes |
//! | `client_secret` | `AUTH_CLIENT_SECRET` | yes |
//! | `endpoint` | `AZURE_OPENAI_ENDPOINT` | yes |
//! | `api_version` | `OPENAI_API_VERSION` | yes |
//! | `deployment` | `MODEL_DEPLOYMENT_NAME` | yes |
//! | `project_id` | `PROJECT_ID` | no |

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::time::Duration;

use super::{
    credentials::CredentialBuilder, AccessToken, ChatMessage, ClientCredentials, CompletionConfig,
    CompletionResponse, LlmProvider, ProviderError, TokenUsage,
};

/// Everything needed to connect to an Azure OpenAI deployment.
#[derive(Debug)]
pub struct AzureOpenAiSettings {
    pub credentials: ClientCredentials,
    pub endpoint: String,
    pub api_version: String,
    pub deployment: String,
    pub project_id: Option<String>,
}

impl AzureOpenAiSettings {
    /// Resolve settings from JSON config with environment fallback.
    pub fn from_config(config: &JsonValue) -> Result<Self, ProviderError> {
        let mut creds = CredentialBuilder::new()
            .require("auth_url", "AUTH_API_URL", "Token endpoint")
            .require("auth_scope", "AUTH_API_SCOPE", "Token scope")
            .require("client_id", "AUTH_CLIENT_ID", "OAuth client id")
            .require("client_secret", "AUTH_CLIENT_SECRET", "OAuth client secret")
            .require("endpoint", "AZURE_OPENAI_ENDPOINT", "Azure OpenAI endpoint")
            .require("api_version", "OPENAI_API_VERSION", "Azure OpenAI API version")
            .require("deployment", "MODEL_DEPLOYMENT_NAME", "Model deployment")
            .optional("project_id", "PROJECT_ID", "Project id")
            .build(config)?;

        let endpoint = creds.take("endpoint")?.expose().trim_end_matches('/').to_string();
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ProviderError::NotConfigured(
                "AZURE_OPENAI_ENDPOINT must start with http:// or https://".to_string(),
            ));
        }

        Ok(Self {
            credentials: ClientCredentials {
                token_url: creds.take("auth_url")?,
                scope: creds.take("auth_scope")?,
                client_id: creds.take("client_id")?,
                client_secret: creds.take("client_secret")?,
            },
            endpoint,
            api_version: creds.take("api_version")?.expose().to_string(),
            deployment: creds.take("deployment")?.expose().to_string(),
            project_id: creds.take_optional("project_id").map(|c| c.expose().to_string()),
        })
    }

    /// Resolve settings from the environment only.
    pub fn from_env() -> Result<Self, ProviderError> {
        Self::from_config(&JsonValue::Null)
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.deployment
        )
    }
}

/// Azure OpenAI provider holding a live access token.
pub struct AzureOpenAiProvider {
    client: reqwest::Client,
    url: String,
    api_version: String,
    deployment: String,
    project_id: Option<String>,
    token: AccessToken,
}

impl std::fmt::Debug for AzureOpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AzureOpenAiProvider")
            .field("url", &self.url)
            .field("api_version", &self.api_version)
            .field("token", &self.token)
            .finish()
    }
}

impl AzureOpenAiProvider {
    /// Obtain an access token and build the provider.
    ///
    /// Any failure here is a configuration problem and comes back as
    /// [`ProviderError::NotConfigured`].
    pub async fn connect(settings: AzureOpenAiSettings) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        let token = settings.credentials.fetch(&client).await.map_err(|e| {
            ProviderError::NotConfigured(format!("Failed to obtain access token: {}", e))
        })?;

        tracing::info!(
            endpoint = %settings.endpoint,
            deployment = %settings.deployment,
            "Connected to Azure OpenAI"
        );

        Ok(Self {
            client,
            url: settings.completions_url(),
            api_version: settings.api_version,
            deployment: settings.deployment,
            project_id: settings.project_id,
            token,
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

impl ChatResponse {
    fn into_completion(self, fallback_model: &str) -> CompletionResponse {
        let (content, stop_reason) = self
            .choices
            .into_iter()
            .next()
            .map(|choice| (choice.message.content.unwrap_or_default(), choice.finish_reason))
            .unwrap_or_default();

        CompletionResponse {
            content,
            usage: self
                .usage
                .map(|u| TokenUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                })
                .unwrap_or_default(),
            model: self.model.unwrap_or_else(|| fallback_model.to_string()),
            stop_reason,
        }
    }
}

#[async_trait]
impl LlmProvider for AzureOpenAiProvider {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        config: &CompletionConfig,
    ) -> Result<CompletionResponse, ProviderError> {
        let request = ChatRequest {
            messages: &messages,
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        let mut builder = self
            .client
            .post(&self.url)
            .query(&[("api-version", self.api_version.as_str())])
            .bearer_auth(self.token.expose())
            .timeout(config.timeout)
            .json(&request);

        if let Some(project_id) = &self.project_id {
            builder = builder.header("projectId", project_id);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                ProviderError::Timeout(config.timeout)
            } else {
                ProviderError::HttpError(e.to_string())
            }
        })?;

        let status = response.status();

        if status == 429 {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ProviderError::RateLimited { retry_after });
        }

        if status == 401 || status == 403 {
            return Err(ProviderError::AuthError);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        Ok(body.into_completion(&self.deployment))
    }

    fn name(&self) -> &str {
        "azure-openai"
    }
}
