//! YouTube Data API v3 client.
//!
//! This crate provides:
//! - OAuth2 refresh-token exchange with the Google token endpoint
//! - Resumable video upload (initiate, then streamed PUT)
//! - Structured errors so callers can branch on auth-expired versus
//!   rate-limited versus other failures

pub mod error;
pub mod oauth;
pub mod upload;

pub use error::{YoutubeError, YoutubeResult};
pub use oauth::{OAuthClient, OAuthConfig, RefreshedToken};
pub use upload::{PrivacyStatus, UploadConfig, YoutubeClient};
