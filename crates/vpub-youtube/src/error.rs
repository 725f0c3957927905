//! YouTube API error types.

use thiserror::Error;

/// Result type for YouTube API operations.
pub type YoutubeResult<T> = Result<T, YoutubeError>;

/// Errors from the token endpoint and the upload API.
///
/// The variants matter to callers: an expired grant deletes the stored
/// credential, a rate limit leaves it intact, and everything else is a
/// plain upload failure.
#[derive(Debug, Error)]
pub enum YoutubeError {
    #[error("Authorization expired: {0}")]
    AuthExpired(String),

    #[error("Rate limited or quota exceeded: {0}")]
    RateLimited(String),

    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),

    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl YoutubeError {
    pub fn auth_expired(msg: impl Into<String>) -> Self {
        Self::AuthExpired(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// True if the refresh grant itself is dead and the user must
    /// re-authorize out of band.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, YoutubeError::AuthExpired(_))
    }
}
