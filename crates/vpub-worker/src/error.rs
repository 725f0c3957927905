//! Worker error types.
//!
//! Two classes matter to the orchestrator: store errors escalate and
//! abort the run, because a store that cannot be read or written means
//! status transitions themselves are unreliable; everything else is a
//! per-submission failure that becomes a `failed` status write.

use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    /// Refresh grant missing or revoked; the stored credential has been
    /// deleted and the user must re-authorize.
    #[error("Authorization expired: {0}")]
    AuthExpired(String),

    /// Credential refresh failed for a reason that may clear up
    /// (network, rate limit, platform outage). The credential stays.
    #[error("Authorization temporarily unavailable: {0}")]
    AuthTransient(String),

    /// Source media could not be retrieved.
    #[error("Retrieval failed: {0}")]
    Retrieval(String),

    /// Overlay production failed. No fallback publish of the original.
    #[error("Transform failed: {0}")]
    Transform(String),

    /// The platform rejected the upload.
    #[error("Publish failed: {0}")]
    Publish(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Store error: {0}")]
    Firestore(#[from] vpub_firestore::FirestoreError),

    #[error("Media error: {0}")]
    Media(#[from] vpub_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn auth_expired(msg: impl Into<String>) -> Self {
        Self::AuthExpired(msg.into())
    }

    pub fn auth_transient(msg: impl Into<String>) -> Self {
        Self::AuthTransient(msg.into())
    }

    pub fn retrieval(msg: impl Into<String>) -> Self {
        Self::Retrieval(msg.into())
    }

    pub fn transform(msg: impl Into<String>) -> Self {
        Self::Transform(msg.into())
    }

    pub fn publish(msg: impl Into<String>) -> Self {
        Self::Publish(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True if the underlying persistence failed: the run must abort
    /// instead of pretending a compensating status write would stick.
    pub fn is_store_error(&self) -> bool {
        matches!(self, WorkerError::Firestore(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vpub_firestore::FirestoreError;

    #[test]
    fn test_store_error_classification() {
        let err = WorkerError::from(FirestoreError::Unavailable("503".into()));
        assert!(err.is_store_error());

        assert!(!WorkerError::retrieval("yt-dlp failed").is_store_error());
        assert!(!WorkerError::auth_expired("revoked").is_store_error());
        assert!(!WorkerError::publish("quota").is_store_error());
    }
}
