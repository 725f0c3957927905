//! FFmpeg overlay compositing.
//!
//! Composites a per-user image onto a video: the image is scaled to a
//! fixed fraction of the video width and pinned at a fixed corner offset.
//! The audio track is stream-copied, never re-encoded.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Configuration for overlay compositing.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Overlay width as a fraction of the video width
    pub width_fraction: f32,
    /// Horizontal offset from the top-left corner (pixels)
    pub offset_x: u32,
    /// Vertical offset from the top-left corner (pixels)
    pub offset_y: u32,
    /// Video codec for the re-encode
    pub codec: String,
    /// Encoder preset
    pub preset: String,
    /// Constant rate factor
    pub crf: u8,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            width_fraction: 0.15,
            offset_x: 20,
            offset_y: 20,
            codec: "libx264".to_string(),
            preset: "veryfast".to_string(),
            crf: 23,
        }
    }
}

impl OverlayConfig {
    /// Set the overlay width fraction (clamped to a sane range).
    pub fn with_width_fraction(mut self, fraction: f32) -> Self {
        self.width_fraction = fraction.clamp(0.01, 1.0);
        self
    }

    /// Set the corner offset.
    pub fn with_offset(mut self, x: u32, y: u32) -> Self {
        self.offset_x = x;
        self.offset_y = y;
        self
    }
}

/// Build the FFmpeg filter graph for the overlay.
///
/// scale2ref sizes the image against the video so the overlay occupies
/// the same relative area at any input resolution.
fn build_overlay_filter(config: &OverlayConfig) -> String {
    format!(
        "[1:v][0:v]scale2ref=w=main_w*{:.2}:h=ow/mdar[wm][base];[base][wm]overlay={}:{}:format=auto",
        config.width_fraction, config.offset_x, config.offset_y
    )
}

/// Composite `overlay_image` onto `video_path`, writing `output_path`.
///
/// Any FFmpeg failure aborts with the captured stderr; a partially
/// written output file is removed so it cannot be mistaken for a good
/// composite.
pub async fn apply_overlay(
    video_path: &Path,
    overlay_image: &Path,
    output_path: &Path,
    config: &OverlayConfig,
) -> MediaResult<()> {
    which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

    if !video_path.exists() {
        return Err(MediaError::FileNotFound(video_path.to_path_buf()));
    }
    if !overlay_image.exists() {
        return Err(MediaError::FileNotFound(overlay_image.to_path_buf()));
    }

    let filter_complex = build_overlay_filter(config);
    let video_str = video_path.to_string_lossy();
    let overlay_str = overlay_image.to_string_lossy();
    let output_str = output_path.to_string_lossy();

    info!(
        video = %video_str,
        overlay = %overlay_str,
        "Applying overlay"
    );
    debug!(filter = %filter_complex, "Overlay filter graph");

    let output = tokio::process::Command::new("ffmpeg")
        .args([
            "-y",
            "-hide_banner",
            "-loglevel",
            "warning",
            "-i",
            &video_str,
            "-i",
            &overlay_str,
            "-filter_complex",
            &filter_complex,
            "-c:v",
            &config.codec,
            "-preset",
            &config.preset,
            "-crf",
            &config.crf.to_string(),
            "-c:a",
            "copy",
            "-movflags",
            "+faststart",
            &output_str,
        ])
        .output()
        .await
        .map_err(|e| MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None))?;

    if !output.status.success() {
        let _ = tokio::fs::remove_file(output_path).await;

        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(MediaError::ffmpeg_failed(
            "Overlay compositing failed",
            Some(stderr.into_owned()),
            output.status.code(),
        ));
    }

    if !output_path.exists() {
        return Err(MediaError::ffmpeg_failed(
            "Overlay output not created",
            None,
            output.status.code(),
        ));
    }

    info!(output = %output_str, "Overlay applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = OverlayConfig::default();
        assert!((config.width_fraction - 0.15).abs() < 0.001);
        assert_eq!(config.offset_x, 20);
        assert_eq!(config.offset_y, 20);
    }

    #[test]
    fn test_width_fraction_clamping() {
        let config = OverlayConfig::default().with_width_fraction(2.0);
        assert!((config.width_fraction - 1.0).abs() < 0.001);

        let config = OverlayConfig::default().with_width_fraction(0.0);
        assert!((config.width_fraction - 0.01).abs() < 0.001);
    }

    #[test]
    fn test_overlay_filter_scales_against_video() {
        let filter = build_overlay_filter(&OverlayConfig::default());
        assert!(filter.contains("scale2ref=w=main_w*0.15"));
        assert!(filter.contains("overlay=20:20"));
    }

    #[test]
    fn test_overlay_filter_custom_offset() {
        let config = OverlayConfig::default().with_offset(40, 8);
        let filter = build_overlay_filter(&config);
        assert!(filter.contains("overlay=40:8"));
    }

    #[tokio::test]
    async fn test_apply_overlay_missing_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("missing.mp4");
        let image = dir.path().join("missing.png");
        let out = dir.path().join("out.mp4");

        // Only meaningful when ffmpeg is installed; the missing-file check
        // runs before any process is spawned either way.
        if which::which("ffmpeg").is_ok() {
            let err = apply_overlay(&video, &image, &out, &OverlayConfig::default())
                .await
                .unwrap_err();
            assert!(matches!(err, MediaError::FileNotFound(_)));
        }
    }
}
