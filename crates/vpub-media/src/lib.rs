//! Media retrieval and transformation.
//!
//! This crate provides:
//! - Source video download via the yt-dlp CLI
//! - HTTP asset retrieval (overlay images)
//! - FFmpeg overlay compositing with the audio track untouched
//! - Scoped workspace directories that clean up on drop

pub mod download;
pub mod error;
pub mod fetch;
pub mod overlay;
pub mod workspace;

pub use download::download_video;
pub use error::{MediaError, MediaResult};
pub use fetch::fetch_to_file;
pub use overlay::{apply_overlay, OverlayConfig};
pub use workspace::Workspace;
