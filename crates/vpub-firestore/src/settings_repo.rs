//! Repository for per-user publishing settings.

use vpub_models::UserSettings;

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;

const COLLECTION: &str = "user_settings";

/// Read access to per-user settings. A missing document means defaults.
pub struct SettingsRepository {
    client: FirestoreClient,
}

impl SettingsRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Load settings for a user, defaulting when no document exists.
    pub async fn get(&self, uid: &str) -> FirestoreResult<UserSettings> {
        let doc = self
            .client
            .with_retry("get_settings", || async {
                self.client.get_document(COLLECTION, uid).await
            })
            .await?;

        Ok(doc
            .map(|d| UserSettings {
                overlay_image_url: d.get("overlayImageUrl"),
            })
            .unwrap_or_default())
    }
}
