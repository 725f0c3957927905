//! Source video download using yt-dlp.

use std::path::Path;
use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Socket timeout passed to yt-dlp, in seconds.
const SOCKET_TIMEOUT_SECS: &str = "60";

/// Minimum size for a plausible cookies file (bytes).
const MIN_COOKIES_FILE_SIZE: u64 = 50;

/// Validate that a cookies file appears to be in Netscape format.
///
/// Netscape cookies files either start with a cookie-file header comment
/// or contain tab-separated lines with at least six fields.
fn is_valid_netscape_cookies(content: &str) -> bool {
    if content.starts_with("# Netscape HTTP Cookie File")
        || content.starts_with("# HTTP Cookie File")
    {
        return true;
    }

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.split('\t').count() >= 6 {
            return true;
        }
    }

    false
}

/// Check whether a configured cookies file is present and usable.
///
/// Returns `None` (download proceeds without cookies) when the file is
/// missing, too small, or not in Netscape format.
async fn usable_cookies_path(cookies_file: Option<&Path>) -> Option<String> {
    let path = cookies_file?;

    let metadata = match tokio::fs::metadata(path).await {
        Ok(m) => m,
        Err(_) => {
            debug!(path = %path.display(), "Cookies file not found, skipping");
            return None;
        }
    };
    if metadata.len() < MIN_COOKIES_FILE_SIZE {
        debug!(
            path = %path.display(),
            size = metadata.len(),
            "Cookies file too small, skipping"
        );
        return None;
    }

    match tokio::fs::read_to_string(path).await {
        Ok(content) if is_valid_netscape_cookies(&content) => {
            info!(path = %path.display(), "Using cookies file for source authentication");
            Some(path.to_string_lossy().into_owned())
        }
        Ok(_) => {
            debug!(path = %path.display(), "Cookies file not in Netscape format, skipping");
            None
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read cookies file");
            None
        }
    }
}

/// Download a video from `url` into `output_path` using yt-dlp.
///
/// The best available video and audio streams are merged into an mp4.
/// A missing or empty output file is a failure even when yt-dlp exits
/// zero, so a truncated download can never be published.
pub async fn download_video(
    url: &str,
    output_path: impl AsRef<Path>,
    cookies_file: Option<&Path>,
) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    info!(url = %url, output = %output_path.display(), "Downloading source video");

    let cookies_path = usable_cookies_path(cookies_file).await;
    let output_path_str = output_path.to_string_lossy();

    let mut args = vec![
        "--quiet",
        "--no-warnings",
        "--socket-timeout",
        SOCKET_TIMEOUT_SECS,
        "-f",
        "bestvideo+bestaudio/best",
        "--merge-output-format",
        "mp4",
        "-o",
    ];
    args.push(&output_path_str);

    let cookies_ref = cookies_path.as_deref();
    if let Some(cp) = cookies_ref {
        args.push("--cookies");
        args.push(cp);
    }
    args.push(url);

    let output = Command::new("yt-dlp")
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);

        let error_msg = stderr.lines().last().unwrap_or("Unknown error");
        return Err(MediaError::download_failed(format!(
            "yt-dlp failed: {}",
            error_msg
        )));
    }

    if !output_path.exists() {
        return Err(MediaError::download_failed("Output file not created"));
    }

    let file_size = output_path.metadata()?.len();
    if file_size == 0 {
        return Err(MediaError::EmptyDownload(output_path.to_path_buf()));
    }

    info!(
        output = %output_path.display(),
        size_mb = file_size as f64 / (1024.0 * 1024.0),
        "Downloaded source video"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_netscape_cookies_header() {
        assert!(is_valid_netscape_cookies(
            "# Netscape HTTP Cookie File\n.example.com\tTRUE\t/\tFALSE\t0\tname\tvalue"
        ));
        assert!(is_valid_netscape_cookies("# HTTP Cookie File\n"));
    }

    #[test]
    fn test_netscape_cookies_tab_separated_entries() {
        assert!(is_valid_netscape_cookies(
            ".example.com\tTRUE\t/\tFALSE\t0\tname\tvalue"
        ));
    }

    #[test]
    fn test_netscape_cookies_rejects_other_content() {
        assert!(!is_valid_netscape_cookies(""));
        assert!(!is_valid_netscape_cookies("name=value; other=thing"));
        assert!(!is_valid_netscape_cookies("# just a comment\n"));
    }

    #[tokio::test]
    async fn test_usable_cookies_path_missing_file() {
        assert!(
            usable_cookies_path(Some(Path::new("/nonexistent/cookies.txt")))
                .await
                .is_none()
        );
        assert!(usable_cookies_path(None).await.is_none());
    }

    #[tokio::test]
    async fn test_usable_cookies_path_rejects_tiny_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        tokio::fs::write(&path, b"short").await.unwrap();
        assert!(usable_cookies_path(Some(&path)).await.is_none());
    }

    #[tokio::test]
    async fn test_usable_cookies_path_accepts_valid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookies.txt");
        let content = format!(
            "# Netscape HTTP Cookie File\n{}\n",
            ".example.com\tTRUE\t/\tFALSE\t0\tsession\tabcdefgh"
        );
        tokio::fs::write(&path, content).await.unwrap();
        assert!(usable_cookies_path(Some(&path)).await.is_some());
    }
}
