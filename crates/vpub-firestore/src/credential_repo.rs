//! Repository for stored user OAuth credentials.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use vpub_models::StoredCredential;

use crate::client::FirestoreClient;
use crate::error::FirestoreResult;
use crate::types::{Document, ToFirestoreValue};

/// One document per user, keyed by user ID.
const COLLECTION: &str = "user_tokens";

/// Read/write access to per-user OAuth material.
pub struct CredentialRepository {
    client: FirestoreClient,
}

impl CredentialRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Load the stored credential for a user.
    ///
    /// Returns `None` when the user never authorized, or when the stored
    /// document lost its refresh token (treated the same: the user must
    /// re-authorize).
    pub async fn get(&self, uid: &str) -> FirestoreResult<Option<StoredCredential>> {
        let doc = self
            .client
            .with_retry("get_credential", || async {
                self.client.get_document(COLLECTION, uid).await
            })
            .await?;

        let Some(doc) = doc else {
            return Ok(None);
        };

        match document_to_credential(&doc) {
            Some(cred) => Ok(Some(cred)),
            None => {
                warn!(uid = %uid, "Stored credential has no refresh token");
                Ok(None)
            }
        }
    }

    /// Persist a freshly refreshed access token so later calls and later
    /// runs can reuse it without hitting the token endpoint.
    pub async fn store_access_token(
        &self,
        uid: &str,
        access_token: &str,
        expiry: DateTime<Utc>,
    ) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "accessToken".to_string(),
            access_token.to_firestore_value(),
        );
        fields.insert(
            "accessTokenExpiry".to_string(),
            expiry.to_firestore_value(),
        );

        self.client
            .with_retry("store_access_token", || async {
                self.client
                    .update_document(
                        COLLECTION,
                        uid,
                        fields.clone(),
                        Some(vec![
                            "accessToken".to_string(),
                            "accessTokenExpiry".to_string(),
                        ]),
                    )
                    .await
            })
            .await?;
        Ok(())
    }

    /// Delete a user's credential record.
    ///
    /// Called when the platform reports the refresh grant itself invalid,
    /// so future runs fail fast instead of retrying a dead credential.
    pub async fn delete(&self, uid: &str) -> FirestoreResult<()> {
        self.client.delete_document(COLLECTION, uid).await?;
        info!(uid = %uid, "Deleted revoked credential record");
        Ok(())
    }
}

fn document_to_credential(doc: &Document) -> Option<StoredCredential> {
    let refresh_token: String = doc.get("refreshToken")?;
    if refresh_token.is_empty() {
        return None;
    }

    Some(StoredCredential {
        refresh_token,
        access_token: doc.get("accessToken"),
        access_token_expiry: doc.get("accessTokenExpiry"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_document_to_credential() {
        let mut fields = HashMap::new();
        fields.insert("refreshToken".to_string(), "rt-1".to_firestore_value());
        fields.insert("accessToken".to_string(), "at-1".to_firestore_value());
        fields.insert(
            "accessTokenExpiry".to_string(),
            Utc::now().to_firestore_value(),
        );
        let doc = Document::new(fields);

        let cred = document_to_credential(&doc).unwrap();
        assert_eq!(cred.refresh_token, "rt-1");
        assert_eq!(cred.access_token.as_deref(), Some("at-1"));
        assert!(cred.access_token_expiry.is_some());
    }

    #[test]
    fn test_document_without_refresh_token_is_none() {
        let doc = Document::new(HashMap::new());
        assert!(document_to_credential(&doc).is_none());

        let mut fields = HashMap::new();
        fields.insert("refreshToken".to_string(), "".to_firestore_value());
        assert!(document_to_credential(&Document::new(fields)).is_none());
    }
}
