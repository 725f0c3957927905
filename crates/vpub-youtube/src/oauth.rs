//! OAuth2 refresh-token exchange.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::error::{YoutubeError, YoutubeResult};

/// Google's OAuth2 token endpoint.
const DEFAULT_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// OAuth client configuration.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth application client ID
    pub client_id: String,
    /// OAuth application client secret
    pub client_secret: String,
    /// Token endpoint URL (overridable for tests)
    pub token_url: String,
    /// Request timeout
    pub timeout: Duration,
}

impl OAuthConfig {
    /// Create config from environment variables.
    pub fn from_env() -> YoutubeResult<Self> {
        Ok(Self {
            client_id: std::env::var("GOOGLE_CLIENT_ID")
                .map_err(|_| YoutubeError::config_error("GOOGLE_CLIENT_ID not set"))?,
            client_secret: std::env::var("GOOGLE_CLIENT_SECRET")
                .map_err(|_| YoutubeError::config_error("GOOGLE_CLIENT_SECRET not set"))?,
            token_url: DEFAULT_TOKEN_URL.to_string(),
            timeout: Duration::from_secs(30),
        })
    }
}

/// A freshly exchanged access token.
#[derive(Debug, Clone)]
pub struct RefreshedToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    3600
}

/// Client for the OAuth2 token endpoint.
pub struct OAuthClient {
    http: reqwest::Client,
    config: OAuthConfig,
}

impl OAuthClient {
    /// Create a new OAuth client.
    pub fn new(config: OAuthConfig) -> YoutubeResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(Duration::from_secs(10))
            .user_agent(concat!("vpub-youtube/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// Create from environment variables.
    pub fn from_env() -> YoutubeResult<Self> {
        Self::new(OAuthConfig::from_env()?)
    }

    /// Exchange a refresh token for a fresh access token.
    ///
    /// Exactly one attempt; no internal retry. An `invalid_grant`
    /// response means the user revoked access (or the grant rotted) and
    /// is surfaced as [`YoutubeError::AuthExpired`] so the caller can
    /// drop the stored credential.
    pub async fn refresh_access_token(&self, refresh_token: &str) -> YoutubeResult<RefreshedToken> {
        debug!("Exchanging refresh token at {}", self.config.token_url);

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();

            if body.contains("invalid_grant") {
                warn!("Refresh grant reported invalid by the token endpoint");
                return Err(YoutubeError::auth_expired(
                    "refresh grant invalid; user must re-authorize",
                ));
            }

            return Err(YoutubeError::RefreshFailed(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| YoutubeError::invalid_response(format!("token response: {}", e)))?;

        Ok(RefreshedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> OAuthConfig {
        OAuthConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            token_url: format!("{}/token", server.uri()),
            timeout: Duration::from_secs(5),
        }
    }

    #[tokio::test]
    async fn test_refresh_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("refresh_token=rt-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "at-1",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::new(test_config(&server)).unwrap();
        let token = client.refresh_access_token("rt-1").await.unwrap();

        assert_eq!(token.access_token, "at-1");
        assert!(token.expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_refresh_invalid_grant_is_auth_expired() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": "invalid_grant",
                "error_description": "Token has been expired or revoked."
            })))
            .mount(&server)
            .await;

        let client = OAuthClient::new(test_config(&server)).unwrap();
        let err = client.refresh_access_token("rt-dead").await.unwrap_err();
        assert!(err.is_auth_expired());
    }

    #[tokio::test]
    async fn test_refresh_server_error_is_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = OAuthClient::new(test_config(&server)).unwrap();
        let err = client.refresh_access_token("rt-1").await.unwrap_err();
        assert!(matches!(err, YoutubeError::RefreshFailed(_)));
        assert!(!err.is_auth_expired());
    }
}
