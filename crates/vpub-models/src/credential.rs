//! Stored OAuth credential models.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Per-user OAuth material stored in Firestore.
///
/// The refresh token is long-lived and written once when the user
/// authorizes the app. The access token and its expiry are a cache of the
/// last successful refresh, rewritten by the credential manager so later
/// runs can skip the token endpoint while the grant is still fresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Long-lived refresh token
    pub refresh_token: String,

    /// Cached short-lived access token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,

    /// Expiry of the cached access token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token_expiry: Option<DateTime<Utc>>,
}

impl StoredCredential {
    /// Create a credential holding only a refresh token.
    pub fn new(refresh_token: impl Into<String>) -> Self {
        Self {
            refresh_token: refresh_token.into(),
            access_token: None,
            access_token_expiry: None,
        }
    }

    /// Return the cached access token if it is still valid with the given
    /// refresh margin, meaning it will not expire mid-request.
    pub fn valid_access_token(&self, margin: Duration) -> Option<&str> {
        let token = self.access_token.as_deref()?;
        let expiry = self.access_token_expiry?;
        if Utc::now() + margin < expiry {
            Some(token)
        } else {
            None
        }
    }

    /// Record a freshly refreshed access token.
    pub fn with_access_token(
        mut self,
        token: impl Into<String>,
        expiry: DateTime<Utc>,
    ) -> Self {
        self.access_token = Some(token.into());
        self.access_token_expiry = Some(expiry);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_cached_token() {
        let cred = StoredCredential::new("refresh");
        assert!(cred.valid_access_token(Duration::seconds(60)).is_none());
    }

    #[test]
    fn test_cached_token_within_margin() {
        let cred = StoredCredential::new("refresh")
            .with_access_token("access", Utc::now() + Duration::minutes(30));
        assert_eq!(
            cred.valid_access_token(Duration::seconds(60)),
            Some("access")
        );
    }

    #[test]
    fn test_cached_token_expiring_inside_margin_is_rejected() {
        let cred = StoredCredential::new("refresh")
            .with_access_token("access", Utc::now() + Duration::seconds(30));
        assert!(cred.valid_access_token(Duration::seconds(60)).is_none());
    }
}
