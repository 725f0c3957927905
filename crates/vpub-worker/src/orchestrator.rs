//! Run orchestration: window to slots to users to submissions.
//!
//! Drives the submission state machine for one scheduled invocation.
//! Pipeline failures are contained per submission; store failures abort
//! the run, since status writes themselves may not be sticking.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use futures::StreamExt;
use metrics::counter;
use tracing::{info, warn};

use vpub_models::{SubmissionStatus, VideoSubmission};

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::logging::SubmissionLogger;
use crate::pipeline::Publisher;
use crate::slots::resolve_slots;
use crate::stores::{ScheduleStore, SubmissionStore};

/// Counters for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Slots inside the run window
    pub slots: usize,
    /// Users due after the per-run cap
    pub due_users: usize,
    /// Submissions that reached `published`
    pub published: usize,
    /// Submissions that reached `failed`
    pub failed: usize,
    /// Submissions skipped (lost claim or no longer queued)
    pub skipped: usize,
}

enum Outcome {
    Published,
    Failed,
    Skipped,
}

/// Ties the stores and the pipeline together for one run.
pub struct Orchestrator {
    schedules: Arc<dyn ScheduleStore>,
    submissions: Arc<dyn SubmissionStore>,
    publisher: Arc<dyn Publisher>,
    config: WorkerConfig,
}

impl Orchestrator {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        submissions: Arc<dyn SubmissionStore>,
        publisher: Arc<dyn Publisher>,
        config: WorkerConfig,
    ) -> Self {
        Self {
            schedules,
            submissions,
            publisher,
            config,
        }
    }

    /// Execute one full run for the window ending at `now`.
    ///
    /// A run with zero due users or zero due submissions is a normal,
    /// silent no-op. Errors returned from here mean no per-submission
    /// compensation was possible and the process should exit non-zero.
    pub async fn run(&self, now: DateTime<Utc>) -> WorkerResult<RunSummary> {
        let window_start = now - Duration::minutes(self.config.window_minutes);
        let slots = resolve_slots(window_start, now);
        info!(
            window_start = %window_start,
            window_end = %now,
            slots = slots.len(),
            "Starting publish run"
        );

        let mut summary = RunSummary {
            slots: slots.len(),
            ..RunSummary::default()
        };

        let mut users = self.schedules.scheduled_users(&slots).await?;
        if users.len() > self.config.max_users_per_run {
            warn!(
                scheduled = users.len(),
                cap = self.config.max_users_per_run,
                "More users scheduled than the per-run cap, truncating"
            );
            users.truncate(self.config.max_users_per_run);
        }
        summary.due_users = users.len();

        if users.is_empty() {
            info!("No users scheduled in this window");
            return Ok(summary);
        }

        let mut due = Vec::new();
        for uid in &users {
            if let Some(submission) = self.submissions.next_queued(uid).await? {
                due.push(submission);
            }
        }

        if due.is_empty() {
            info!("No queued submissions for scheduled users");
            return Ok(summary);
        }

        // Oldest submission first across the batch
        due.sort_by_key(|s| s.submitted_at);

        info!(count = due.len(), "Processing due submissions");

        let outcomes: Vec<WorkerResult<Outcome>> = futures::stream::iter(due)
            .map(|submission| self.process_submission(submission))
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        for outcome in outcomes {
            match outcome? {
                Outcome::Published => summary.published += 1,
                Outcome::Failed => summary.failed += 1,
                Outcome::Skipped => summary.skipped += 1,
            }
        }

        counter!("vpub_submissions_published_total").increment(summary.published as u64);
        counter!("vpub_submissions_failed_total").increment(summary.failed as u64);
        counter!("vpub_runs_total").increment(1);

        info!(
            published = summary.published,
            failed = summary.failed,
            skipped = summary.skipped,
            "Publish run complete"
        );
        Ok(summary)
    }

    /// Drive one submission through the state machine.
    ///
    /// Returns `Err` only for store failures; pipeline failures become a
    /// terminal `failed` write and an `Ok(Outcome::Failed)` so siblings
    /// keep processing.
    async fn process_submission(&self, submission: VideoSubmission) -> WorkerResult<Outcome> {
        let logger = SubmissionLogger::new(&submission.id, &submission.uid);

        // Admission gate: only submissions read as queued are eligible
        if submission.status != SubmissionStatus::Queued {
            logger.log_claim_lost();
            return Ok(Outcome::Skipped);
        }

        // The claim is the first observable side effect; losing it means
        // another writer got there first and this run backs off.
        if !self.submissions.claim(&submission).await? {
            logger.log_claim_lost();
            return Ok(Outcome::Skipped);
        }
        logger.log_claimed();

        match self.publisher.publish(&submission).await {
            Ok(platform_video_id) => {
                self.submissions
                    .mark_published(&submission.id, &platform_video_id)
                    .await?;
                logger.log_published(&platform_video_id);
                Ok(Outcome::Published)
            }
            Err(e) if e.is_store_error() => Err(e),
            Err(e) => {
                let message = e.to_string();
                self.submissions.mark_failed(&submission.id, &message).await?;
                logger.log_failed(&message);
                Ok(Outcome::Failed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    use vpub_firestore::{FirestoreError, FirestoreResult};
    use vpub_models::{SlotKey, SubmissionId};

    use crate::error::WorkerError;

    struct FakeSchedules {
        users: Vec<String>,
    }

    #[async_trait]
    impl ScheduleStore for FakeSchedules {
        async fn scheduled_users(&self, _slots: &[SlotKey]) -> FirestoreResult<Vec<String>> {
            Ok(self.users.clone())
        }
    }

    #[derive(Default)]
    struct FakeSubmissions {
        queued: Mutex<HashMap<String, VideoSubmission>>,
        published: Mutex<Vec<(String, String)>>,
        failed: Mutex<Vec<(String, String)>>,
        claims: Mutex<Vec<String>>,
        reject_claims: bool,
        fail_status_writes: bool,
    }

    #[async_trait]
    impl SubmissionStore for FakeSubmissions {
        async fn next_queued(&self, uid: &str) -> FirestoreResult<Option<VideoSubmission>> {
            Ok(self.queued.lock().unwrap().get(uid).cloned())
        }

        async fn claim(&self, submission: &VideoSubmission) -> FirestoreResult<bool> {
            if self.reject_claims {
                return Ok(false);
            }
            self.claims
                .lock()
                .unwrap()
                .push(submission.id.to_string());
            Ok(true)
        }

        async fn mark_published(
            &self,
            id: &SubmissionId,
            platform_video_id: &str,
        ) -> FirestoreResult<()> {
            if self.fail_status_writes {
                return Err(FirestoreError::Unavailable("store down".into()));
            }
            self.published
                .lock()
                .unwrap()
                .push((id.to_string(), platform_video_id.to_string()));
            Ok(())
        }

        async fn mark_failed(&self, id: &SubmissionId, error: &str) -> FirestoreResult<()> {
            if self.fail_status_writes {
                return Err(FirestoreError::Unavailable("store down".into()));
            }
            self.failed
                .lock()
                .unwrap()
                .push((id.to_string(), error.to_string()));
            Ok(())
        }
    }

    /// Publisher scripted to fail for chosen submission IDs.
    struct ScriptedPublisher {
        fail_ids: Vec<String>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedPublisher {
        fn succeeding() -> Self {
            Self {
                fail_ids: Vec::new(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn failing_for(ids: &[&str]) -> Self {
            Self {
                fail_ids: ids.iter().map(|s| s.to_string()).collect(),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Publisher for ScriptedPublisher {
        async fn publish(&self, submission: &VideoSubmission) -> WorkerResult<String> {
            self.calls.lock().unwrap().push(submission.id.to_string());
            if self.fail_ids.contains(&submission.id.to_string()) {
                return Err(WorkerError::retrieval("source unreachable"));
            }
            Ok(format!("yt-{}", submission.id))
        }
    }

    fn queued_submission(id: &str, uid: &str, submitted_offset_secs: i64) -> VideoSubmission {
        let mut sub = VideoSubmission::new(
            SubmissionId::from_string(id),
            uid,
            "https://youtube.com/watch?v=abc123def45",
            "Title",
            "",
        );
        sub.submitted_at = Utc::now() - Duration::seconds(submitted_offset_secs);
        sub.revision = Some("rev-1".to_string());
        sub
    }

    fn orchestrator(
        users: Vec<&str>,
        submissions: Arc<FakeSubmissions>,
        publisher: Arc<ScriptedPublisher>,
    ) -> Orchestrator {
        Orchestrator::new(
            Arc::new(FakeSchedules {
                users: users.into_iter().map(String::from).collect(),
            }),
            submissions,
            publisher,
            WorkerConfig {
                max_concurrent: 1,
                ..WorkerConfig::default()
            },
        )
    }

    #[tokio::test]
    async fn test_no_due_users_is_silent_noop() {
        let submissions = Arc::new(FakeSubmissions::default());
        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let orch = orchestrator(vec![], submissions, publisher.clone());

        let summary = orch.run(Utc::now()).await.unwrap();
        assert_eq!(summary.due_users, 0);
        assert_eq!(summary.published, 0);
        assert!(publisher.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_single_submission_published() {
        let submissions = Arc::new(FakeSubmissions::default());
        submissions
            .queued
            .lock()
            .unwrap()
            .insert("user-1".into(), queued_submission("sub-1", "user-1", 60));

        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let orch = orchestrator(vec!["user-1"], submissions.clone(), publisher);

        let summary = orch.run(Utc::now()).await.unwrap();
        assert_eq!(summary.published, 1);
        assert_eq!(summary.failed, 0);

        let published = submissions.published.lock().unwrap();
        assert_eq!(published[0], ("sub-1".to_string(), "yt-sub-1".to_string()));
    }

    #[tokio::test]
    async fn test_partial_failure_isolation() {
        let submissions = Arc::new(FakeSubmissions::default());
        {
            let mut queued = submissions.queued.lock().unwrap();
            queued.insert("user-1".into(), queued_submission("sub-1", "user-1", 300));
            queued.insert("user-2".into(), queued_submission("sub-2", "user-2", 200));
            queued.insert("user-3".into(), queued_submission("sub-3", "user-3", 100));
        }

        let publisher = Arc::new(ScriptedPublisher::failing_for(&["sub-2"]));
        let orch = orchestrator(
            vec!["user-1", "user-2", "user-3"],
            submissions.clone(),
            publisher,
        );

        let summary = orch.run(Utc::now()).await.unwrap();
        assert_eq!(summary.published, 2);
        assert_eq!(summary.failed, 1);

        let failed = submissions.failed.lock().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].0, "sub-2");
        assert!(!failed[0].1.is_empty());

        let published = submissions.published.lock().unwrap();
        let ids: Vec<_> = published.iter().map(|(id, _)| id.as_str()).collect();
        assert!(ids.contains(&"sub-1"));
        assert!(ids.contains(&"sub-3"));
    }

    #[tokio::test]
    async fn test_oldest_submission_first() {
        let submissions = Arc::new(FakeSubmissions::default());
        {
            let mut queued = submissions.queued.lock().unwrap();
            queued.insert("user-1".into(), queued_submission("sub-new", "user-1", 10));
            queued.insert("user-2".into(), queued_submission("sub-old", "user-2", 500));
        }

        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let orch = orchestrator(vec!["user-1", "user-2"], submissions, publisher.clone());

        orch.run(Utc::now()).await.unwrap();
        let calls = publisher.calls.lock().unwrap();
        assert_eq!(*calls, vec!["sub-old".to_string(), "sub-new".to_string()]);
    }

    #[tokio::test]
    async fn test_non_queued_submission_not_touched() {
        let submissions = Arc::new(FakeSubmissions::default());
        {
            let mut sub = queued_submission("sub-1", "user-1", 60);
            sub.status = SubmissionStatus::Processing;
            submissions.queued.lock().unwrap().insert("user-1".into(), sub);
        }

        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let orch = orchestrator(vec!["user-1"], submissions.clone(), publisher.clone());

        let summary = orch.run(Utc::now()).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(publisher.calls.lock().unwrap().is_empty());
        assert!(submissions.claims.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_lost_claim_skips_pipeline() {
        let submissions = Arc::new(FakeSubmissions {
            reject_claims: true,
            ..FakeSubmissions::default()
        });
        submissions
            .queued
            .lock()
            .unwrap()
            .insert("user-1".into(), queued_submission("sub-1", "user-1", 60));

        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let orch = orchestrator(vec!["user-1"], submissions.clone(), publisher.clone());

        let summary = orch.run(Utc::now()).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(publisher.calls.lock().unwrap().is_empty());
        assert!(submissions.published.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_failure_aborts_run() {
        let submissions = Arc::new(FakeSubmissions {
            fail_status_writes: true,
            ..FakeSubmissions::default()
        });
        submissions
            .queued
            .lock()
            .unwrap()
            .insert("user-1".into(), queued_submission("sub-1", "user-1", 60));

        let publisher = Arc::new(ScriptedPublisher::succeeding());
        let orch = orchestrator(vec!["user-1"], submissions, publisher);

        let err = orch.run(Utc::now()).await.unwrap_err();
        assert!(err.is_store_error());
    }
}
