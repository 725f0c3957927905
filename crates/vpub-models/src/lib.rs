//! Shared data models for the VidPublish backend.
//!
//! This crate provides Serde-serializable types for:
//! - Video submissions and their lifecycle status
//! - Schedule slots (quarter-hour publication buckets)
//! - Stored OAuth credentials
//! - Per-user publishing settings

pub mod credential;
pub mod schedule;
pub mod settings;
pub mod submission;

// Re-export common types
pub use credential::StoredCredential;
pub use schedule::{ScheduleSlot, SlotKey, SlotKeyError, ALLOWED_SLOT_MINUTES};
pub use settings::UserSettings;
pub use submission::{SubmissionId, SubmissionStatus, VideoSubmission};
