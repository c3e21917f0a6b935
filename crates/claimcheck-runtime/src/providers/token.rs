//! OAuth2 client-credentials token exchange.
//!
//! The model endpoint takes a bearer token issued by a separate identity
//! service. The token is requested once when a provider connects.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::time::Duration;

use super::credentials::Credential;
#[cfg(feature = "azure-openai")]
use super::ProviderError;

/// Timeout for the token request.
pub const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// A bearer token. Redacted in `Debug`.
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(SecretString::from(value.into()))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// Client-credentials grant parameters.
#[derive(Debug)]
pub struct ClientCredentials {
    pub token_url: Credential,
    pub scope: Credential,
    pub client_id: Credential,
    pub client_secret: Credential,
}

impl ClientCredentials {
    /// Form body for the token request.
    #[cfg_attr(not(feature = "azure-openai"), allow(dead_code))]
    fn form(&self) -> [(&'static str, &str); 4] {
        [
            ("grant_type", "client_credentials"),
            ("scope", self.scope.expose()),
            ("client_id", self.client_id.expose()),
            ("client_secret", self.client_secret.expose()),
        ]
    }

    /// Exchange the client credentials for an access token.
    #[cfg(feature = "azure-openai")]
    pub async fn fetch(&self, client: &reqwest::Client) -> Result<AccessToken, ProviderError> {
        #[derive(serde::Deserialize)]
        struct TokenResponse {
            access_token: Option<String>,
        }

        let response = client
            .post(self.token_url.expose())
            .form(&self.form())
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(TOKEN_REQUEST_TIMEOUT)
                } else {
                    ProviderError::HttpError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ParseError(e.to_string()))?;

        match body.access_token {
            Some(token) if !token.is_empty() => Ok(AccessToken::new(token)),
            _ => Err(ProviderError::AuthError),
        }
    }
}
