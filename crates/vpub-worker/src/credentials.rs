//! Per-run credential management.
//!
//! One refresh attempt per call, per-user single-flight, and a per-run
//! cache so a user's second submission in a lifetime of the process does
//! not hit the token endpoint again while the token is fresh.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use vpub_models::StoredCredential;

use crate::error::{WorkerError, WorkerResult};
use crate::stores::{CredentialStore, TokenExchanger};

/// Do not hand out tokens that expire within this margin.
const TOKEN_REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Clone)]
struct CachedAccess {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedAccess {
    fn is_valid(&self) -> bool {
        Utc::now() + Duration::seconds(TOKEN_REFRESH_MARGIN_SECS) < self.expires_at
    }
}

/// Per-user credential state. The mutex serializes refresh attempts for
/// one user; different users never contend on it.
#[derive(Default)]
struct UserSlot {
    cached: Option<CachedAccess>,
}

/// Produces currently-valid access tokens for the publish platform.
///
/// Errors: [`WorkerError::AuthExpired`] when the refresh grant is absent
/// or revoked (the stored record is deleted as a side effect),
/// [`WorkerError::AuthTransient`] for any other refresh failure; store
/// errors pass through untouched.
pub struct CredentialManager {
    store: Arc<dyn CredentialStore>,
    oauth: Arc<dyn TokenExchanger>,
    users: RwLock<HashMap<String, Arc<Mutex<UserSlot>>>>,
}

impl CredentialManager {
    pub fn new(store: Arc<dyn CredentialStore>, oauth: Arc<dyn TokenExchanger>) -> Self {
        Self {
            store,
            oauth,
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Get a currently-valid access token for a user.
    pub async fn get_valid_credential(&self, uid: &str) -> WorkerResult<String> {
        let slot = self.user_slot(uid).await;
        let mut slot = slot.lock().await;

        // Reuse the run-local token if another submission refreshed it
        if let Some(cached) = slot.cached.as_ref() {
            if cached.is_valid() {
                return Ok(cached.token.clone());
            }
        }

        let stored = self
            .store
            .get(uid)
            .await?
            .ok_or_else(|| WorkerError::auth_expired(format!("no credential on file for {}", uid)))?;

        // The store may hold a token fresh enough to skip the endpoint
        let margin = Duration::seconds(TOKEN_REFRESH_MARGIN_SECS);
        if let Some(token) = stored.valid_access_token(margin) {
            debug!(uid = %uid, "Reusing stored access token");
            let cached = CachedAccess {
                token: token.to_string(),
                expires_at: stored.access_token_expiry.unwrap_or_else(Utc::now),
            };
            slot.cached = Some(cached.clone());
            return Ok(cached.token);
        }

        self.refresh(uid, &stored, &mut slot).await
    }

    async fn user_slot(&self, uid: &str) -> Arc<Mutex<UserSlot>> {
        {
            let users = self.users.read().await;
            if let Some(slot) = users.get(uid) {
                return Arc::clone(slot);
            }
        }

        let mut users = self.users.write().await;
        Arc::clone(users.entry(uid.to_string()).or_default())
    }

    async fn refresh(
        &self,
        uid: &str,
        stored: &StoredCredential,
        slot: &mut UserSlot,
    ) -> WorkerResult<String> {
        info!(uid = %uid, "Refreshing access token");

        let refreshed = match self.oauth.refresh_access_token(&stored.refresh_token).await {
            Ok(token) => token,
            Err(e) if e.is_auth_expired() => {
                // Dead grant: drop the record so future runs fail fast.
                // A failed delete is logged, not propagated; it must not
                // mask the expiry itself.
                if let Err(delete_err) = self.store.delete(uid).await {
                    warn!(
                        uid = %uid,
                        error = %delete_err,
                        "Failed to delete revoked credential record"
                    );
                }
                return Err(WorkerError::auth_expired(format!(
                    "refresh grant for {} revoked; user must re-authorize",
                    uid
                )));
            }
            Err(e) => {
                // Network trouble, rate limits, endpoint outages: the
                // grant may still be fine, so the record stays.
                return Err(WorkerError::auth_transient(e.to_string()));
            }
        };

        // Persist so later calls and later runs can reuse the token. A
        // failed write costs one extra refresh next time, nothing more.
        if let Err(e) = self
            .store
            .store_access_token(uid, &refreshed.access_token, refreshed.expires_at)
            .await
        {
            warn!(uid = %uid, error = %e, "Failed to persist refreshed access token");
        }

        let cached = CachedAccess {
            token: refreshed.access_token,
            expires_at: refreshed.expires_at,
        };
        slot.cached = Some(cached.clone());
        Ok(cached.token)
    }
}
