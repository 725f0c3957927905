//! The publishing pipeline: download, optional overlay, upload.
//!
//! One call per submission. Every step can fail; nothing here touches
//! the submission record. The workspace is removed before the call
//! returns or the error propagates, success or not.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use vpub_media::{OverlayConfig, Workspace};
use vpub_models::VideoSubmission;
use vpub_youtube::{PrivacyStatus, YoutubeError};

use crate::credentials::CredentialManager;
use crate::error::{WorkerError, WorkerResult};
use crate::stores::{MediaOps, SettingsStore, VideoUploader};

/// Pipeline configuration.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Base directory for per-submission workspaces
    pub work_dir: PathBuf,
    /// Optional yt-dlp cookies file for gated sources
    pub cookies_file: Option<PathBuf>,
    /// Visibility of published videos
    pub privacy: PrivacyStatus,
    /// Overlay placement and encoding
    pub overlay: OverlayConfig,
}

/// Publishes one submission, returning the platform-assigned video ID.
#[async_trait]
pub trait Publisher: Send + Sync {
    async fn publish(&self, submission: &VideoSubmission) -> WorkerResult<String>;
}

/// The real pipeline over the injected collaborators.
pub struct PublishingPipeline {
    credentials: Arc<CredentialManager>,
    settings: Arc<dyn SettingsStore>,
    media: Arc<dyn MediaOps>,
    uploader: Arc<dyn VideoUploader>,
    config: PipelineConfig,
}

impl PublishingPipeline {
    pub fn new(
        credentials: Arc<CredentialManager>,
        settings: Arc<dyn SettingsStore>,
        media: Arc<dyn MediaOps>,
        uploader: Arc<dyn VideoUploader>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            credentials,
            settings,
            media,
            uploader,
            config,
        }
    }

    async fn run_stages(
        &self,
        access_token: &str,
        submission: &VideoSubmission,
        workspace: &Workspace,
    ) -> WorkerResult<String> {
        let source_path = workspace.file("source.mp4");
        self.media
            .download_video(
                &submission.original_url,
                &source_path,
                self.config.cookies_file.as_deref(),
            )
            .await
            .map_err(|e| WorkerError::retrieval(e.to_string()))?;

        let settings = self.settings.get(&submission.uid).await?;

        let upload_path = if let Some(overlay_url) = settings
            .overlay_image_url
            .as_deref()
            .filter(|u| !u.is_empty())
        {
            let overlay_path = workspace.file("overlay.png");
            self.media
                .fetch_asset(overlay_url, &overlay_path)
                .await
                .map_err(|e| WorkerError::transform(format!("overlay fetch: {}", e)))?;

            let overlaid_path = workspace.file("overlaid.mp4");
            self.media
                .apply_overlay(
                    &source_path,
                    &overlay_path,
                    &overlaid_path,
                    &self.config.overlay,
                )
                .await
                .map_err(|e| WorkerError::transform(e.to_string()))?;

            debug!(submission_id = %submission.id, "Overlay produced");
            overlaid_path
        } else {
            source_path
        };

        let video_id = self
            .uploader
            .upload_video(
                access_token,
                &upload_path,
                &submission.title,
                &submission.description,
                self.config.privacy,
            )
            .await
            .map_err(|e| match e {
                YoutubeError::AuthExpired(msg) => WorkerError::auth_expired(msg),
                other => WorkerError::publish(other.to_string()),
            })?;

        Ok(video_id)
    }
}

#[async_trait]
impl Publisher for PublishingPipeline {
    async fn publish(&self, submission: &VideoSubmission) -> WorkerResult<String> {
        info!(
            submission_id = %submission.id,
            uid = %submission.uid,
            url = %submission.original_url,
            "Starting publish pipeline"
        );

        // Fail closed: no download without a valid credential
        let access_token = self
            .credentials
            .get_valid_credential(&submission.uid)
            .await?;

        let workspace = Workspace::create(&self.config.work_dir, submission.id.as_str()).await?;

        let result = self
            .run_stages(&access_token, submission, &workspace)
            .await;

        // Explicit close on every path so removal failures are logged;
        // drop semantics still cover panics and cancellation.
        workspace.close();

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use std::path::Path;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use vpub_firestore::FirestoreResult;
    use vpub_media::{MediaError, MediaResult};
    use vpub_models::{StoredCredential, SubmissionId, UserSettings};
    use vpub_youtube::{RefreshedToken, YoutubeResult};

    use crate::stores::{CredentialStore, TokenExchanger};

    struct FakeCredentialStore;

    #[async_trait]
    impl CredentialStore for FakeCredentialStore {
        async fn get(&self, _uid: &str) -> FirestoreResult<Option<StoredCredential>> {
            Ok(Some(StoredCredential::new("rt").with_access_token(
                "test-token",
                Utc::now() + Duration::hours(1),
            )))
        }

        async fn store_access_token(
            &self,
            _uid: &str,
            _access_token: &str,
            _expiry: chrono::DateTime<Utc>,
        ) -> FirestoreResult<()> {
            Ok(())
        }

        async fn delete(&self, _uid: &str) -> FirestoreResult<()> {
            Ok(())
        }
    }

    struct EmptyCredentialStore;

    #[async_trait]
    impl CredentialStore for EmptyCredentialStore {
        async fn get(&self, _uid: &str) -> FirestoreResult<Option<StoredCredential>> {
            Ok(None)
        }

        async fn store_access_token(
            &self,
            _uid: &str,
            _access_token: &str,
            _expiry: chrono::DateTime<Utc>,
        ) -> FirestoreResult<()> {
            Ok(())
        }

        async fn delete(&self, _uid: &str) -> FirestoreResult<()> {
            Ok(())
        }
    }

    struct NoExchanger;

    #[async_trait]
    impl TokenExchanger for NoExchanger {
        async fn refresh_access_token(&self, _refresh_token: &str) -> YoutubeResult<RefreshedToken> {
            panic!("token endpoint must not be hit in these tests");
        }
    }

    struct FakeSettings {
        overlay_url: Option<String>,
    }

    #[async_trait]
    impl SettingsStore for FakeSettings {
        async fn get(&self, _uid: &str) -> FirestoreResult<UserSettings> {
            Ok(UserSettings {
                overlay_image_url: self.overlay_url.clone(),
            })
        }
    }

    #[derive(Default)]
    struct FakeMedia {
        downloads: AtomicU32,
        fetches: AtomicU32,
        overlays: AtomicU32,
        fail_overlay: bool,
    }

    #[async_trait]
    impl MediaOps for FakeMedia {
        async fn download_video(
            &self,
            _url: &str,
            dest: &Path,
            _cookies_file: Option<&Path>,
        ) -> MediaResult<()> {
            self.downloads.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, b"video-bytes").await?;
            Ok(())
        }

        async fn fetch_asset(&self, _url: &str, dest: &Path) -> MediaResult<()> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            tokio::fs::write(dest, b"image-bytes").await?;
            Ok(())
        }

        async fn apply_overlay(
            &self,
            _video: &Path,
            _image: &Path,
            output: &Path,
            _config: &OverlayConfig,
        ) -> MediaResult<()> {
            self.overlays.fetch_add(1, Ordering::SeqCst);
            if self.fail_overlay {
                return Err(MediaError::ffmpeg_failed(
                    "Overlay compositing failed",
                    Some("filter error".into()),
                    Some(1),
                ));
            }
            tokio::fs::write(output, b"overlaid-bytes").await?;
            Ok(())
        }
    }

    struct FakeUploader {
        uploads: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl FakeUploader {
        fn ok() -> Self {
            Self {
                uploads: Mutex::new(Vec::new()),
                fail: false,
            }
        }

        fn failing() -> Self {
            Self {
                uploads: Mutex::new(Vec::new()),
                fail: true,
            }
        }
    }

    #[async_trait]
    impl VideoUploader for FakeUploader {
        async fn upload_video(
            &self,
            _access_token: &str,
            video_path: &Path,
            _title: &str,
            _description: &str,
            _privacy: PrivacyStatus,
        ) -> YoutubeResult<String> {
            self.uploads.lock().unwrap().push(video_path.to_path_buf());
            if self.fail {
                return Err(YoutubeError::upload_failed("platform said no"));
            }
            Ok("abc123".to_string())
        }
    }

    fn submission() -> VideoSubmission {
        VideoSubmission::new(
            SubmissionId::from_string("sub-1"),
            "user-1",
            "https://youtube.com/watch?v=abc123def45",
            "Test Video",
            "A description",
        )
    }

    fn pipeline(
        work_dir: &Path,
        credentials: Arc<dyn CredentialStore>,
        settings: FakeSettings,
        media: Arc<FakeMedia>,
        uploader: Arc<FakeUploader>,
    ) -> PublishingPipeline {
        PublishingPipeline::new(
            Arc::new(CredentialManager::new(credentials, Arc::new(NoExchanger))),
            Arc::new(settings),
            media,
            uploader,
            PipelineConfig {
                work_dir: work_dir.to_path_buf(),
                cookies_file: None,
                privacy: PrivacyStatus::Private,
                overlay: OverlayConfig::default(),
            },
        )
    }

    async fn workspace_count(work_dir: &Path) -> usize {
        let mut count = 0;
        if let Ok(mut entries) = tokio::fs::read_dir(work_dir).await {
            while let Ok(Some(_)) = entries.next_entry().await {
                count += 1;
            }
        }
        count
    }

    #[tokio::test]
    async fn test_publish_without_overlay() {
        let work_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(FakeMedia::default());
        let uploader = Arc::new(FakeUploader::ok());

        let p = pipeline(
            work_dir.path(),
            Arc::new(FakeCredentialStore),
            FakeSettings { overlay_url: None },
            media.clone(),
            uploader.clone(),
        );

        let id = p.publish(&submission()).await.unwrap();
        assert_eq!(id, "abc123");
        assert_eq!(media.overlays.load(Ordering::SeqCst), 0);

        // The original, not an overlaid variant, was uploaded
        let uploads = uploader.uploads.lock().unwrap();
        assert!(uploads[0].ends_with("source.mp4"));
        drop(uploads);

        assert_eq!(workspace_count(work_dir.path()).await, 0);
    }

    #[tokio::test]
    async fn test_publish_with_overlay_uploads_composite() {
        let work_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(FakeMedia::default());
        let uploader = Arc::new(FakeUploader::ok());

        let p = pipeline(
            work_dir.path(),
            Arc::new(FakeCredentialStore),
            FakeSettings {
                overlay_url: Some("https://cdn.example.com/logo.png".into()),
            },
            media.clone(),
            uploader.clone(),
        );

        p.publish(&submission()).await.unwrap();
        assert_eq!(media.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(media.overlays.load(Ordering::SeqCst), 1);

        let uploads = uploader.uploads.lock().unwrap();
        assert!(uploads[0].ends_with("overlaid.mp4"));
    }

    #[tokio::test]
    async fn test_overlay_failure_aborts_without_upload() {
        let work_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(FakeMedia {
            fail_overlay: true,
            ..FakeMedia::default()
        });
        let uploader = Arc::new(FakeUploader::ok());

        let p = pipeline(
            work_dir.path(),
            Arc::new(FakeCredentialStore),
            FakeSettings {
                overlay_url: Some("https://cdn.example.com/logo.png".into()),
            },
            media,
            uploader.clone(),
        );

        let err = p.publish(&submission()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Transform(_)));

        // No silent fallback to the un-overlaid original
        assert!(uploader.uploads.lock().unwrap().is_empty());
        assert_eq!(workspace_count(work_dir.path()).await, 0);
    }

    #[tokio::test]
    async fn test_upload_failure_cleans_workspace() {
        let work_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(FakeMedia::default());
        let uploader = Arc::new(FakeUploader::failing());

        let p = pipeline(
            work_dir.path(),
            Arc::new(FakeCredentialStore),
            FakeSettings { overlay_url: None },
            media,
            uploader,
        );

        let err = p.publish(&submission()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Publish(_)));
        assert_eq!(workspace_count(work_dir.path()).await, 0);
    }

    #[tokio::test]
    async fn test_missing_credential_fails_closed() {
        let work_dir = tempfile::tempdir().unwrap();
        let media = Arc::new(FakeMedia::default());
        let uploader = Arc::new(FakeUploader::ok());

        let p = pipeline(
            work_dir.path(),
            Arc::new(EmptyCredentialStore),
            FakeSettings { overlay_url: None },
            media.clone(),
            uploader,
        );

        let err = p.publish(&submission()).await.unwrap_err();
        assert!(matches!(err, WorkerError::AuthExpired(_)));

        // No retrieval was attempted without a credential
        assert_eq!(media.downloads.load(Ordering::SeqCst), 0);
    }
}
