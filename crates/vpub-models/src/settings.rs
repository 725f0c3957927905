//! Per-user publishing settings.

use serde::{Deserialize, Serialize};

/// Optional per-user settings consulted by the publishing pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserSettings {
    /// URL of an image composited onto every published video.
    ///
    /// Absent means the source video is published unmodified.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overlay_image_url: Option<String>,
}

impl UserSettings {
    /// True if this user has an overlay configured.
    pub fn has_overlay(&self) -> bool {
        self.overlay_image_url
            .as_deref()
            .map(|u| !u.is_empty())
            .unwrap_or(false)
    }
}
