//! Slot resolution: map a time window to the schedule slots inside it.

use chrono::{DateTime, Duration, Timelike, Utc};

use vpub_models::SlotKey;

/// Seconds per quarter-hour slot period.
const SLOT_PERIOD_SECS: i64 = 15 * 60;

/// Slots per day; iteration past this can only repeat (hour, minute) keys.
const SLOTS_PER_DAY: usize = 96;

/// Resolve every quarter-hour slot whose boundary falls inside the
/// inclusive window `[window_start, window_end]`, in UTC wall-clock terms.
///
/// The result is deduplicated by (hour, minute), ordered by first
/// occurrence, and deterministic for identical inputs. An inverted window
/// yields an empty set rather than an error.
pub fn resolve_slots(window_start: DateTime<Utc>, window_end: DateTime<Utc>) -> Vec<SlotKey> {
    if window_start > window_end {
        return Vec::new();
    }

    let Some(mut boundary) = ceil_to_slot_boundary(window_start) else {
        return Vec::new();
    };

    let mut slots = Vec::new();
    while boundary <= window_end && slots.len() < SLOTS_PER_DAY {
        if let Ok(key) = SlotKey::new(boundary.hour() as u8, boundary.minute() as u8) {
            if !slots.contains(&key) {
                slots.push(key);
            }
        }
        boundary += Duration::seconds(SLOT_PERIOD_SECS);
    }

    slots
}

/// Round an instant up to the next quarter-hour boundary (identity when
/// already on one). The Unix epoch is quarter-hour aligned, so integer
/// math on the timestamp matches UTC wall-clock boundaries.
fn ceil_to_slot_boundary(t: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let secs = t.timestamp();
    let mut periods = secs.div_euclid(SLOT_PERIOD_SECS);
    if secs.rem_euclid(SLOT_PERIOD_SECS) != 0 || t.timestamp_subsec_nanos() != 0 {
        periods += 1;
    }
    DateTime::from_timestamp(periods * SLOT_PERIOD_SECS, 0)
}
