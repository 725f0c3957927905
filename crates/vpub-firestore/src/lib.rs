//! Firestore REST API client.
//!
//! This crate provides:
//! - A thin REST client with token caching, retry, and request metrics
//! - Typed repositories for schedules, submissions, tokens, and settings
//! - Service account authentication via gcp_auth
//! - Conditional (precondition) updates for claim semantics

pub mod client;
pub mod credential_repo;
pub mod error;
pub mod metrics;
pub mod retry;
pub mod schedule_repo;
pub mod settings_repo;
pub mod submission_repo;
pub mod token_cache;
pub mod types;

pub use client::{FirestoreClient, FirestoreConfig};
pub use credential_repo::CredentialRepository;
pub use error::{FirestoreError, FirestoreResult};
pub use schedule_repo::ScheduleRepository;
pub use settings_repo::SettingsRepository;
pub use submission_repo::SubmissionRepository;
pub use types::{Document, FromFirestoreValue, ToFirestoreValue, Value};
