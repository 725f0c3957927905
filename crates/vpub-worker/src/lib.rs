//! Scheduled publishing worker.
//!
//! This crate provides:
//! - Slot resolution for the run's time window
//! - Per-run credential management with per-user single-flight refresh
//! - The download / overlay / upload publishing pipeline
//! - The orchestrator driving the submission state machine

pub mod config;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod orchestrator;
pub mod pipeline;
pub mod slots;
pub mod stores;

pub use config::WorkerConfig;
pub use credentials::CredentialManager;
pub use error::{WorkerError, WorkerResult};
pub use logging::SubmissionLogger;
pub use orchestrator::{Orchestrator, RunSummary};
pub use pipeline::{PipelineConfig, PublishingPipeline};
pub use slots::resolve_slots;
