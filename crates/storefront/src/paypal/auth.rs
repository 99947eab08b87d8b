//! PayPal OAuth client-credentials flow.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;

use super::PayPalError;
use crate::config::PayPalConfig;

/// Access token obtained from `/v1/oauth2/token`.
#[derive(Debug, Clone)]
pub struct AccessToken {
    /// Bearer token for API requests.
    pub access_token: SecretString,
    /// Unix timestamp when the token expires.
    pub expires_at: i64,
}

/// Response from the token endpoint.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    /// Token lifetime in seconds.
    expires_in: i64,
}

/// Request an access token with the app's client ID and secret.
///
/// # Errors
///
/// Returns `PayPalError::Upstream` if PayPal rejects the credentials, or
/// `PayPalError::Http` if the request fails.
#[instrument(skip_all, fields(api_base = %config.api_base))]
pub async fn request_token(
    client: &reqwest::Client,
    config: &PayPalConfig,
) -> Result<AccessToken, PayPalError> {
    let now = chrono::Utc::now().timestamp();

    let response = client
        .post(format!("{}/v1/oauth2/token", config.api_base))
        .basic_auth(&config.client_id, Some(config.secret.expose_secret()))
        .form(&[("grant_type", "client_credentials")])
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::warn!(status = %status, "PayPal token request rejected");
        return Err(PayPalError::Upstream {
            status: status.as_u16(),
            body,
        });
    }

    let token: TokenResponse = response.json().await?;
    tracing::debug!(expires_in = token.expires_in, "PayPal access token obtained");

    Ok(AccessToken {
        access_token: SecretString::from(token.access_token),
        expires_at: now + token.expires_in,
    })
}

impl AccessToken {
    /// Check if the access token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        let now = chrono::Utc::now().timestamp();
        // Consider expired if less than 60 seconds remaining
        now >= self.expires_at - 60
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_is_expired() {
        let now = chrono::Utc::now().timestamp();
        let token = |expires_at| AccessToken {
            access_token: SecretString::from("A21AA"),
            expires_at,
        };

        assert!(token(now - 3600).is_expired());
        assert!(!token(now + 32_400).is_expired());
        // Inside the 60 s buffer
        assert!(token(now + 30).is_expired());
    }
}
