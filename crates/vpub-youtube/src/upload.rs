//! Resumable video upload to YouTube.
//!
//! Two-step protocol: an initiation POST carrying the video metadata
//! returns a session URL in the `Location` header; the file bytes are
//! then PUT to that URL, streamed from disk.

use std::path::Path;
use std::time::Duration;

use reqwest::{Body, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio_util::io::ReaderStream;
use tracing::{debug, info};

use crate::error::{YoutubeError, YoutubeResult};

/// YouTube resumable upload endpoint.
const DEFAULT_UPLOAD_URL: &str = "https://www.googleapis.com/upload/youtube/v3/videos";

/// YouTube category "Entertainment".
const DEFAULT_CATEGORY_ID: &str = "24";

/// Default visibility of published videos.
///
/// Private by policy: a scheduled publish should not go live until the
/// owner reviews it. Overridable via configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrivacyStatus {
    #[default]
    Private,
    Unlisted,
    Public,
}

impl PrivacyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrivacyStatus::Private => "private",
            PrivacyStatus::Unlisted => "unlisted",
            PrivacyStatus::Public => "public",
        }
    }

    /// Parse from a config string, defaulting to private.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "public" => PrivacyStatus::Public,
            "unlisted" => PrivacyStatus::Unlisted,
            _ => PrivacyStatus::Private,
        }
    }
}

/// Upload client configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Upload endpoint URL (overridable for tests)
    pub upload_url: String,
    /// Timeout for the initiation request
    pub initiate_timeout: Duration,
    /// Connect timeout for all requests
    pub connect_timeout: Duration,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            upload_url: DEFAULT_UPLOAD_URL.to_string(),
            initiate_timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    id: String,
}

/// YouTube Data API upload client.
pub struct YoutubeClient {
    http: reqwest::Client,
    config: UploadConfig,
}

impl YoutubeClient {
    /// Create a new upload client.
    ///
    /// No overall request timeout is set on the client: the streamed PUT
    /// of a large file legitimately runs for minutes. Connect timeout and
    /// the initiation timeout still bound how long a dead endpoint can
    /// stall a run.
    pub fn new(config: UploadConfig) -> YoutubeResult<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .user_agent(concat!("vpub-youtube/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { http, config })
    }

    /// Upload a video file, returning the platform-assigned video ID.
    pub async fn upload_video(
        &self,
        access_token: &str,
        video_path: &Path,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> YoutubeResult<String> {
        let file_size = tokio::fs::metadata(video_path).await?.len();

        let session_url = self
            .initiate_upload(access_token, title, description, privacy, file_size)
            .await?;

        self.put_file(access_token, &session_url, video_path, file_size)
            .await
    }

    /// Start a resumable upload session.
    async fn initiate_upload(
        &self,
        access_token: &str,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
        file_size: u64,
    ) -> YoutubeResult<String> {
        let url = format!(
            "{}?uploadType=resumable&part=snippet,status",
            self.config.upload_url
        );

        let body = json!({
            "snippet": {
                "title": title,
                "description": description,
                "categoryId": DEFAULT_CATEGORY_ID,
            },
            "status": {
                "privacyStatus": privacy.as_str(),
            },
        });

        debug!(title = %title, size = file_size, "Initiating resumable upload");

        let response = self
            .http
            .post(&url)
            .bearer_auth(access_token)
            .header("X-Upload-Content-Type", "video/mp4")
            .header("X-Upload-Content-Length", file_size)
            .timeout(self.config.initiate_timeout)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::map_upload_error(status, response).await);
        }

        let session_url = response
            .headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| {
                YoutubeError::invalid_response("upload initiation returned no Location header")
            })?;

        Ok(session_url)
    }

    /// Stream the file bytes to the session URL.
    async fn put_file(
        &self,
        access_token: &str,
        session_url: &str,
        video_path: &Path,
        file_size: u64,
    ) -> YoutubeResult<String> {
        let file = tokio::fs::File::open(video_path).await?;
        let stream = ReaderStream::new(file);

        let response = self
            .http
            .put(session_url)
            .bearer_auth(access_token)
            .header(reqwest::header::CONTENT_TYPE, "video/mp4")
            .header(reqwest::header::CONTENT_LENGTH, file_size)
            .body(Body::wrap_stream(stream))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::map_upload_error(status, response).await);
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .map_err(|e| YoutubeError::invalid_response(format!("upload response: {}", e)))?;

        info!(video_id = %uploaded.id, "Upload complete");
        Ok(uploaded.id)
    }

    /// Map an error response to the structured taxonomy callers branch on.
    async fn map_upload_error(status: StatusCode, response: reqwest::Response) -> YoutubeError {
        let body = response.text().await.unwrap_or_default();

        match status {
            StatusCode::UNAUTHORIZED => {
                YoutubeError::auth_expired(format!("upload rejected with 401: {}", body))
            }
            StatusCode::TOO_MANY_REQUESTS => {
                YoutubeError::RateLimited(format!("{}: {}", status, body))
            }
            StatusCode::FORBIDDEN if body.contains("quota") || body.contains("rateLimit") => {
                YoutubeError::RateLimited(format!("{}: {}", status, body))
            }
            _ => YoutubeError::upload_failed(format!("{}: {}", status, body)),
        }
    }
}
