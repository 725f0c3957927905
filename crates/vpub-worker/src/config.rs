//! Worker configuration.

use std::path::PathBuf;

use vpub_youtube::PrivacyStatus;

/// Configuration for one scheduled run.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Width of the due window ending at "now", in minutes.
    ///
    /// Wider than the 15-minute slot period so runner drift between
    /// scheduled invocations cannot skip a slot.
    pub window_minutes: i64,
    /// Maximum submissions in flight at once
    pub max_concurrent: usize,
    /// Cap on scheduled users admitted per run
    pub max_users_per_run: usize,
    /// Base directory for per-submission workspaces
    pub work_dir: String,
    /// yt-dlp cookies file for gated sources
    pub cookies_file: Option<PathBuf>,
    /// Visibility of published videos
    pub privacy: PrivacyStatus,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            window_minutes: 20,
            max_concurrent: 2,
            max_users_per_run: 30,
            work_dir: "/tmp/vpub".to_string(),
            cookies_file: Some(PathBuf::from("./cookies.txt")),
            privacy: PrivacyStatus::Private,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            window_minutes: std::env::var("PUBLISH_WINDOW_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            max_concurrent: std::env::var("PUBLISH_MAX_CONCURRENT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2),
            max_users_per_run: std::env::var("PUBLISH_MAX_USERS_PER_RUN")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            work_dir: std::env::var("PUBLISH_WORK_DIR")
                .unwrap_or_else(|_| "/tmp/vpub".to_string()),
            cookies_file: Some(PathBuf::from(
                std::env::var("PUBLISH_COOKIES_FILE")
                    .unwrap_or_else(|_| "./cookies.txt".to_string()),
            )),
            privacy: PrivacyStatus::from_str_or_default(
                &std::env::var("PUBLISH_PRIVACY_STATUS").unwrap_or_default(),
            ),
        }
    }
}
