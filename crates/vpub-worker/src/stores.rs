//! Trait seams over the external collaborators.
//!
//! The orchestrator and pipeline talk to these traits, not to the
//! concrete clients, so tests can substitute in-memory stores and a
//! scripted platform without touching the network.

use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use vpub_firestore::{
    CredentialRepository, FirestoreResult, ScheduleRepository, SettingsRepository,
    SubmissionRepository,
};
use vpub_media::{MediaResult, OverlayConfig};
use vpub_models::{SlotKey, StoredCredential, SubmissionId, UserSettings, VideoSubmission};
use vpub_youtube::{OAuthClient, PrivacyStatus, RefreshedToken, YoutubeClient, YoutubeResult};

/// Read access to the publication schedule.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn scheduled_users(&self, slots: &[SlotKey]) -> FirestoreResult<Vec<String>>;
}

#[async_trait]
impl ScheduleStore for ScheduleRepository {
    async fn scheduled_users(&self, slots: &[SlotKey]) -> FirestoreResult<Vec<String>> {
        ScheduleRepository::scheduled_users(self, slots).await
    }
}

/// Read and status-write access to submissions.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn next_queued(&self, uid: &str) -> FirestoreResult<Option<VideoSubmission>>;
    async fn claim(&self, submission: &VideoSubmission) -> FirestoreResult<bool>;
    async fn mark_published(
        &self,
        id: &SubmissionId,
        platform_video_id: &str,
    ) -> FirestoreResult<()>;
    async fn mark_failed(&self, id: &SubmissionId, error: &str) -> FirestoreResult<()>;
}

#[async_trait]
impl SubmissionStore for SubmissionRepository {
    async fn next_queued(&self, uid: &str) -> FirestoreResult<Option<VideoSubmission>> {
        SubmissionRepository::next_queued(self, uid).await
    }

    async fn claim(&self, submission: &VideoSubmission) -> FirestoreResult<bool> {
        SubmissionRepository::claim(self, submission).await
    }

    async fn mark_published(
        &self,
        id: &SubmissionId,
        platform_video_id: &str,
    ) -> FirestoreResult<()> {
        SubmissionRepository::mark_published(self, id, platform_video_id).await
    }

    async fn mark_failed(&self, id: &SubmissionId, error: &str) -> FirestoreResult<()> {
        SubmissionRepository::mark_failed(self, id, error).await
    }
}

/// Read access to per-user settings.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    async fn get(&self, uid: &str) -> FirestoreResult<UserSettings>;
}

#[async_trait]
impl SettingsStore for SettingsRepository {
    async fn get(&self, uid: &str) -> FirestoreResult<UserSettings> {
        SettingsRepository::get(self, uid).await
    }
}

/// Read/write access to stored OAuth credentials.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn get(&self, uid: &str) -> FirestoreResult<Option<StoredCredential>>;
    async fn store_access_token(
        &self,
        uid: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> FirestoreResult<()>;
    async fn delete(&self, uid: &str) -> FirestoreResult<()>;
}

#[async_trait]
impl CredentialStore for CredentialRepository {
    async fn get(&self, uid: &str) -> FirestoreResult<Option<StoredCredential>> {
        CredentialRepository::get(self, uid).await
    }

    async fn store_access_token(
        &self,
        uid: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> FirestoreResult<()> {
        CredentialRepository::store_access_token(self, uid, access_token, expiry).await
    }

    async fn delete(&self, uid: &str) -> FirestoreResult<()> {
        CredentialRepository::delete(self, uid).await
    }
}

/// The OAuth token endpoint.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    async fn refresh_access_token(&self, refresh_token: &str) -> YoutubeResult<RefreshedToken>;
}

#[async_trait]
impl TokenExchanger for OAuthClient {
    async fn refresh_access_token(&self, refresh_token: &str) -> YoutubeResult<RefreshedToken> {
        OAuthClient::refresh_access_token(self, refresh_token).await
    }
}

/// The platform upload API.
#[async_trait]
pub trait VideoUploader: Send + Sync {
    async fn upload_video(
        &self,
        access_token: &str,
        video_path: &Path,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> YoutubeResult<String>;
}

#[async_trait]
impl VideoUploader for YoutubeClient {
    async fn upload_video(
        &self,
        access_token: &str,
        video_path: &Path,
        title: &str,
        description: &str,
        privacy: PrivacyStatus,
    ) -> YoutubeResult<String> {
        YoutubeClient::upload_video(self, access_token, video_path, title, description, privacy)
            .await
    }
}

/// Media retrieval and transformation steps.
#[async_trait]
pub trait MediaOps: Send + Sync {
    async fn download_video(
        &self,
        url: &str,
        dest: &Path,
        cookies_file: Option<&Path>,
    ) -> MediaResult<()>;
    async fn fetch_asset(&self, url: &str, dest: &Path) -> MediaResult<()>;
    async fn apply_overlay(
        &self,
        video: &Path,
        image: &Path,
        output: &Path,
        config: &OverlayConfig,
    ) -> MediaResult<()>;
}

/// yt-dlp/FFmpeg-backed media operations.
pub struct CliMediaOps;

#[async_trait]
impl MediaOps for CliMediaOps {
    async fn download_video(
        &self,
        url: &str,
        dest: &Path,
        cookies_file: Option<&Path>,
    ) -> MediaResult<()> {
        vpub_media::download_video(url, dest, cookies_file).await
    }

    async fn fetch_asset(&self, url: &str, dest: &Path) -> MediaResult<()> {
        vpub_media::fetch_to_file(url, dest).await
    }

    async fn apply_overlay(
        &self,
        video: &Path,
        image: &Path,
        output: &Path,
        config: &OverlayConfig,
    ) -> MediaResult<()> {
        vpub_media::apply_overlay(video, image, output, config).await
    }
}
