//! Repository for schedule slot documents.

use tracing::{debug, info};

use vpub_models::{ScheduleSlot, SlotKey};

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::Document;

/// Collection holding one document per quarter-hour slot, keyed `HH_MM`.
const COLLECTION: &str = "schedules";

/// Read access to the publication schedule.
///
/// Slot documents are written by the scheduling UI; this core only reads
/// them.
pub struct ScheduleRepository {
    client: FirestoreClient,
}

impl ScheduleRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Load one slot document, if it exists.
    pub async fn get_slot(&self, key: &SlotKey) -> FirestoreResult<Option<ScheduleSlot>> {
        let doc_id = key.doc_id();
        let doc = self
            .client
            .with_retry("get_slot", || async {
                self.client.get_document(COLLECTION, &doc_id).await
            })
            .await?;

        Ok(doc.as_ref().map(document_to_slot))
    }

    /// Resolve the users scheduled in any of the given slots.
    ///
    /// The result is deduplicated and preserves slot order, then user
    /// order within each slot, so repeated runs over the same window see
    /// the same sequence.
    pub async fn scheduled_users(&self, slots: &[SlotKey]) -> FirestoreResult<Vec<String>> {
        let mut seen = std::collections::HashSet::new();
        let mut users = Vec::new();

        for key in slots {
            let Some(slot) = self.get_slot(key).await? else {
                debug!(slot = %key, "No schedule document for slot");
                continue;
            };

            for uid in slot.users {
                if seen.insert(uid.clone()) {
                    users.push(uid);
                }
            }
        }

        if !users.is_empty() {
            info!(count = users.len(), "Resolved scheduled users");
        }
        Ok(users)
    }
}

fn document_to_slot(doc: &Document) -> ScheduleSlot {
    ScheduleSlot {
        users: doc.get::<Vec<String>>("users").unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ToFirestoreValue;
    use std::collections::HashMap;

    #[test]
    fn test_document_to_slot() {
        let mut fields = HashMap::new();
        fields.insert(
            "users".to_string(),
            vec!["alice".to_string(), "bob".to_string()].to_firestore_value(),
        );
        let doc = Document::new(fields);

        let slot = document_to_slot(&doc);
        assert_eq!(slot.users, vec!["alice", "bob"]);
    }

    #[test]
    fn test_document_to_slot_missing_users_field() {
        let doc = Document::new(HashMap::new());
        assert!(document_to_slot(&doc).users.is_empty());
    }
}
