//! Video submission models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;
use validator::Validate;

/// Unique identifier for a video submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub String);

impl SubmissionId {
    /// Generate a new random submission ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for SubmissionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SubmissionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Submission lifecycle status.
///
/// Transitions are monotonic within one processing attempt:
/// `Queued -> Processing -> Published | Failed`. Terminal states are
/// never left by the pipeline; re-queueing is an external action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    /// Waiting to be picked up by a scheduled run
    #[default]
    Queued,
    /// Claimed by a run, pipeline in flight
    Processing,
    /// Uploaded to the platform successfully
    Published,
    /// Pipeline failed; errorMessage holds the reason
    Failed,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Queued => "queued",
            SubmissionStatus::Processing => "processing",
            SubmissionStatus::Published => "published",
            SubmissionStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more transitions expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, SubmissionStatus::Published | SubmissionStatus::Failed)
    }

    /// Parse a stored status string.
    ///
    /// Accepts the legacy "error" label as an alias for `Failed`.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(SubmissionStatus::Queued),
            "processing" => Some(SubmissionStatus::Processing),
            "published" => Some(SubmissionStatus::Published),
            "failed" | "error" => Some(SubmissionStatus::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user-submitted video waiting to be published.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VideoSubmission {
    /// Unique submission ID
    pub id: SubmissionId,

    /// Owning user ID
    pub uid: String,

    /// Source media URL (YouTube, Vimeo, direct link, ...)
    #[validate(url)]
    pub original_url: String,

    /// Title for the published video
    #[validate(length(min = 1, max = 100))]
    pub title: String,

    /// Description for the published video
    #[serde(default)]
    pub description: String,

    /// Lifecycle status
    #[serde(default)]
    pub status: SubmissionStatus,

    /// Platform-assigned video ID once published
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_video_id: Option<String>,

    /// Error message (if failed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,

    /// When the user submitted the video
    pub submitted_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: DateTime<Utc>,

    /// Publication timestamp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<DateTime<Utc>>,

    /// Revision tag of the stored document at read time.
    ///
    /// Used as the precondition for the claim write, so a concurrent run
    /// racing on the same document loses cleanly.
    #[serde(skip)]
    pub revision: Option<String>,
}

impl VideoSubmission {
    /// Create a new queued submission.
    pub fn new(
        id: SubmissionId,
        uid: impl Into<String>,
        original_url: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            uid: uid.into(),
            original_url: original_url.into(),
            title: title.into(),
            description: description.into(),
            status: SubmissionStatus::Queued,
            new_video_id: None,
            error_message: None,
            submitted_at: now,
            updated_at: now,
            published_at: None,
            revision: None,
        }
    }

    /// Mark as published with the platform-assigned ID.
    pub fn publish(mut self, video_id: impl Into<String>) -> Self {
        self.status = SubmissionStatus::Published;
        self.new_video_id = Some(video_id.into());
        self.published_at = Some(Utc::now());
        self.updated_at = Utc::now();
        self
    }

    /// Mark as failed with a human-readable message.
    pub fn fail(mut self, error: impl Into<String>) -> Self {
        self.status = SubmissionStatus::Failed;
        self.error_message = Some(error.into());
        self.updated_at = Utc::now();
        self
    }
}
