//! Schedule slot models.
//!
//! A slot is a recurring quarter-hour publication bucket identified by its
//! UTC time of day, e.g. `09_45`. Users pick slots when scheduling; each
//! run resolves which slots fall inside its window and publishes for the
//! users assigned to them.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minute offsets at which slots may exist.
pub const ALLOWED_SLOT_MINUTES: [u8; 4] = [0, 15, 30, 45];

/// Error parsing a slot key from its document ID form.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotKeyError {
    #[error("Malformed slot key: {0}")]
    Malformed(String),

    #[error("Slot minute {0} is not on a quarter-hour boundary")]
    DisallowedMinute(u8),
}

/// A quarter-hour schedule slot, keyed by UTC time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotKey {
    pub hour: u8,
    pub minute: u8,
}

impl SlotKey {
    /// Create a slot key, validating the quarter-hour invariant.
    pub fn new(hour: u8, minute: u8) -> Result<Self, SlotKeyError> {
        if hour > 23 {
            return Err(SlotKeyError::Malformed(format!("hour {} out of range", hour)));
        }
        if !ALLOWED_SLOT_MINUTES.contains(&minute) {
            return Err(SlotKeyError::DisallowedMinute(minute));
        }
        Ok(Self { hour, minute })
    }

    /// The Firestore document ID for this slot, e.g. `09_45`.
    pub fn doc_id(&self) -> String {
        format!("{:02}_{:02}", self.hour, self.minute)
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}_{:02}", self.hour, self.minute)
    }
}

impl FromStr for SlotKey {
    type Err = SlotKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (h, m) = s
            .split_once('_')
            .ok_or_else(|| SlotKeyError::Malformed(s.to_string()))?;
        let hour: u8 = h
            .parse()
            .map_err(|_| SlotKeyError::Malformed(s.to_string()))?;
        let minute: u8 = m
            .parse()
            .map_err(|_| SlotKeyError::Malformed(s.to_string()))?;
        Self::new(hour, minute)
    }
}

/// A schedule slot document: the users assigned to publish at this time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleSlot {
    /// User IDs scheduled in this slot
    #[serde(default)]
    pub users: Vec<String>,
}
