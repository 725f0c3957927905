//! HTTP asset retrieval.

use std::path::Path;
use std::time::Duration;

use futures::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{MediaError, MediaResult};

/// Request timeout for asset fetches.
const FETCH_TIMEOUT: Duration = Duration::from_secs(60);

/// Stream an HTTP resource to a local file.
///
/// Non-2xx responses and empty bodies are failures; an empty overlay
/// image must not silently pass through to compositing.
pub async fn fetch_to_file(url: &str, output_path: impl AsRef<Path>) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    debug!(url = %url, output = %output_path.display(), "Fetching asset");

    let client = reqwest::Client::builder()
        .timeout(FETCH_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .map_err(|e| MediaError::fetch_failed(format!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| MediaError::fetch_failed(format!("{}: {}", url, e)))?
        .error_for_status()
        .map_err(|e| MediaError::fetch_failed(format!("{}: {}", url, e)))?;

    let mut file = tokio::fs::File::create(output_path).await?;
    let mut stream = response.bytes_stream();
    let mut total_bytes: u64 = 0;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| MediaError::fetch_failed(format!("{}: {}", url, e)))?;
        total_bytes += chunk.len() as u64;
        file.write_all(&chunk).await?;
    }
    file.flush().await?;

    if total_bytes == 0 {
        return Err(MediaError::EmptyDownload(output_path.to_path_buf()));
    }

    info!(url = %url, bytes = total_bytes, "Fetched asset");
    Ok(())
}
