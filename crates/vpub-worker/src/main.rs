//! Scheduled publishing worker binary.
//!
//! Runs one publish pass and exits: zero for any handled run (including
//! a no-op window), non-zero when a top-level fault prevented
//! per-submission processing.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vpub_firestore::{
    CredentialRepository, FirestoreClient, ScheduleRepository, SettingsRepository,
    SubmissionRepository,
};
use vpub_media::OverlayConfig;
use vpub_worker::pipeline::{PipelineConfig, PublishingPipeline};
use vpub_worker::stores::CliMediaOps;
use vpub_worker::{CredentialManager, Orchestrator, WorkerConfig};
use vpub_youtube::{OAuthClient, UploadConfig, YoutubeClient};

#[tokio::main]
async fn main() {
    // Install rustls crypto provider (required for TLS/HTTPS)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vpub=info".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vpub-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let firestore = match FirestoreClient::from_env().await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create Firestore client: {}", e);
            std::process::exit(1);
        }
    };

    let oauth = match OAuthClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create OAuth client: {}", e);
            std::process::exit(1);
        }
    };

    let uploader = match YoutubeClient::new(UploadConfig::default()) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create YouTube client: {}", e);
            std::process::exit(1);
        }
    };

    let credentials = Arc::new(CredentialManager::new(
        Arc::new(CredentialRepository::new(firestore.clone())),
        Arc::new(oauth),
    ));

    let pipeline = Arc::new(PublishingPipeline::new(
        credentials,
        Arc::new(SettingsRepository::new(firestore.clone())),
        Arc::new(CliMediaOps),
        Arc::new(uploader),
        PipelineConfig {
            work_dir: PathBuf::from(&config.work_dir),
            cookies_file: config.cookies_file.clone(),
            privacy: config.privacy,
            overlay: OverlayConfig::default(),
        },
    ));

    let orchestrator = Orchestrator::new(
        Arc::new(ScheduleRepository::new(firestore.clone())),
        Arc::new(SubmissionRepository::new(firestore)),
        pipeline,
        config,
    );

    match orchestrator.run(Utc::now()).await {
        Ok(summary) => {
            info!(
                published = summary.published,
                failed = summary.failed,
                skipped = summary.skipped,
                due_users = summary.due_users,
                "Run finished"
            );
        }
        Err(e) => {
            error!("Run aborted: {}", e);
            std::process::exit(1);
        }
    }
}
