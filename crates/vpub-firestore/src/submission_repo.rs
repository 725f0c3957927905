//! Repository for video submission documents.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{info, warn};

use vpub_models::{SubmissionId, SubmissionStatus, VideoSubmission};

use crate::client::FirestoreClient;
use crate::error::{FirestoreError, FirestoreResult};
use crate::types::{
    CollectionSelector, Document, FieldReference, Filter, Order, StructuredQuery,
    ToFirestoreValue, Value,
};

/// Root-level collection of submissions.
const COLLECTION: &str = "video_submissions";

/// Read and status-write access to video submissions.
///
/// Writes are limited to the lifecycle fields: `status`, `newVideoId`,
/// `errorMessage`, and timestamps. Everything else belongs to the intake
/// surface.
pub struct SubmissionRepository {
    client: FirestoreClient,
}

impl SubmissionRepository {
    pub fn new(client: FirestoreClient) -> Self {
        Self { client }
    }

    /// Fetch the earliest queued submission for one user, if any.
    pub async fn next_queued(&self, uid: &str) -> FirestoreResult<Option<VideoSubmission>> {
        let query = StructuredQuery {
            from: vec![CollectionSelector {
                collection_id: COLLECTION.to_string(),
                all_descendants: None,
            }],
            r#where: Some(Filter::and(vec![
                Filter::equal("status", Value::StringValue("queued".to_string())),
                Filter::equal("uid", Value::StringValue(uid.to_string())),
            ])),
            order_by: Some(vec![Order {
                field: FieldReference {
                    field_path: "submittedAt".to_string(),
                },
                direction: "ASCENDING".to_string(),
            }]),
            limit: Some(1),
        };

        let docs = self
            .client
            .with_retry("next_queued", || async {
                self.client.run_query("", query.clone()).await
            })
            .await?;

        match docs.first() {
            Some(doc) => match document_to_submission(doc) {
                Ok(sub) => Ok(Some(sub)),
                Err(e) => {
                    warn!(uid = %uid, error = %e, "Skipping malformed submission document");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    /// Claim a queued submission: the `queued -> processing` transition.
    ///
    /// The write carries the document revision captured at read time as a
    /// precondition, so if anything rewrote the document in between the
    /// claim loses and returns `Ok(false)` instead of stomping the other
    /// writer.
    pub async fn claim(&self, submission: &VideoSubmission) -> FirestoreResult<bool> {
        let revision = submission.revision.as_deref().ok_or_else(|| {
            FirestoreError::invalid_document("submission was not loaded from the store")
        })?;

        let mut fields = HashMap::new();
        fields.insert(
            "status".to_string(),
            SubmissionStatus::Processing.as_str().to_firestore_value(),
        );
        fields.insert("updatedAt".to_string(), Utc::now().to_firestore_value());

        let result = self
            .client
            .update_document_with_precondition(
                COLLECTION,
                submission.id.as_str(),
                fields,
                Some(vec!["status".to_string(), "updatedAt".to_string()]),
                revision,
            )
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) if e.is_precondition_failed() => {
                info!(
                    submission_id = %submission.id,
                    "Submission changed since read, claim lost"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    /// Record a successful publish: `processing -> published`.
    pub async fn mark_published(
        &self,
        id: &SubmissionId,
        platform_video_id: &str,
    ) -> FirestoreResult<()> {
        let now = Utc::now();
        let mut fields = HashMap::new();
        fields.insert(
            "status".to_string(),
            SubmissionStatus::Published.as_str().to_firestore_value(),
        );
        fields.insert(
            "newVideoId".to_string(),
            platform_video_id.to_firestore_value(),
        );
        fields.insert("publishedAt".to_string(), now.to_firestore_value());
        fields.insert("updatedAt".to_string(), now.to_firestore_value());

        self.client
            .with_retry("mark_published", || async {
                self.client
                    .update_document(
                        COLLECTION,
                        id.as_str(),
                        fields.clone(),
                        Some(vec![
                            "status".to_string(),
                            "newVideoId".to_string(),
                            "publishedAt".to_string(),
                            "updatedAt".to_string(),
                        ]),
                    )
                    .await
            })
            .await?;

        info!(submission_id = %id, platform_video_id = %platform_video_id, "Submission published");
        Ok(())
    }

    /// Record a failed publish attempt: `processing -> failed`.
    pub async fn mark_failed(&self, id: &SubmissionId, error: &str) -> FirestoreResult<()> {
        let mut fields = HashMap::new();
        fields.insert(
            "status".to_string(),
            SubmissionStatus::Failed.as_str().to_firestore_value(),
        );
        fields.insert("errorMessage".to_string(), error.to_firestore_value());
        fields.insert("updatedAt".to_string(), Utc::now().to_firestore_value());

        self.client
            .with_retry("mark_failed", || async {
                self.client
                    .update_document(
                        COLLECTION,
                        id.as_str(),
                        fields.clone(),
                        Some(vec![
                            "status".to_string(),
                            "errorMessage".to_string(),
                            "updatedAt".to_string(),
                        ]),
                    )
                    .await
            })
            .await?;

        warn!(submission_id = %id, error = %error, "Submission failed");
        Ok(())
    }
}

/// Map a Firestore document to a submission.
///
/// `uid`, `originalUrl`, `title`, and `status` are required; missing or
/// unparsable values make the document malformed rather than defaulting,
/// since a defaulted status could re-admit a submission.
fn document_to_submission(doc: &Document) -> FirestoreResult<VideoSubmission> {
    let id = doc
        .doc_id()
        .ok_or_else(|| FirestoreError::invalid_document("document has no name"))?;

    let required = |field: &str| -> FirestoreResult<String> {
        doc.get::<String>(field).ok_or_else(|| {
            FirestoreError::invalid_document(format!("submission {} missing field {}", id, field))
        })
    };

    let status_str = required("status")?;
    let status = SubmissionStatus::parse(&status_str).ok_or_else(|| {
        FirestoreError::invalid_document(format!(
            "submission {} has unknown status {:?}",
            id, status_str
        ))
    })?;

    let submitted_at = doc.get("submittedAt").ok_or_else(|| {
        FirestoreError::invalid_document(format!("submission {} missing submittedAt", id))
    })?;

    Ok(VideoSubmission {
        id: SubmissionId::from_string(id),
        uid: required("uid")?,
        original_url: required("originalUrl")?,
        title: required("title")?,
        description: doc.get::<String>("description").unwrap_or_default(),
        status,
        new_video_id: doc.get("newVideoId"),
        error_message: doc.get("errorMessage"),
        submitted_at,
        updated_at: doc.get("updatedAt").unwrap_or(submitted_at),
        published_at: doc.get("publishedAt"),
        revision: doc.update_time.clone(),
    })
}
