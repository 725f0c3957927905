//! Structured per-submission logging.

use tracing::{error, info, warn, Span};

use vpub_models::SubmissionId;

/// Logger carrying the submission context through the state machine.
#[derive(Debug, Clone)]
pub struct SubmissionLogger {
    submission_id: String,
    uid: String,
}

impl SubmissionLogger {
    pub fn new(submission_id: &SubmissionId, uid: &str) -> Self {
        Self {
            submission_id: submission_id.to_string(),
            uid: uid.to_string(),
        }
    }

    /// Log the claim of a submission.
    pub fn log_claimed(&self) {
        info!(
            submission_id = %self.submission_id,
            uid = %self.uid,
            "Submission claimed for processing"
        );
    }

    /// Log a lost claim (someone else rewrote the document first).
    pub fn log_claim_lost(&self) {
        warn!(
            submission_id = %self.submission_id,
            uid = %self.uid,
            "Submission claim lost, skipping"
        );
    }

    /// Log a successful publish.
    pub fn log_published(&self, platform_video_id: &str) {
        info!(
            submission_id = %self.submission_id,
            uid = %self.uid,
            platform_video_id = %platform_video_id,
            "Submission published"
        );
    }

    /// Log a terminal failure.
    pub fn log_failed(&self, message: &str) {
        error!(
            submission_id = %self.submission_id,
            uid = %self.uid,
            "Submission failed: {}", message
        );
    }

    /// Create a tracing span for this submission.
    pub fn create_span(&self) -> Span {
        tracing::info_span!(
            "submission",
            submission_id = %self.submission_id,
            uid = %self.uid
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logger_carries_context() {
        let logger = SubmissionLogger::new(&SubmissionId::from_string("sub-1"), "user-1");
        assert_eq!(logger.submission_id, "sub-1");
        assert_eq!(logger.uid, "user-1");
    }
}
