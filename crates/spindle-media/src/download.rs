//! Source asset download.
//!
//! Render payloads reference plain HTTPS image URLs; this module fetches
//! them to the job work directory with a hard size cap.

use std::path::Path;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::AsyncWriteExt;
use tracing::debug;

use crate::error::{MediaError, MediaResult};

/// Default per-asset size cap (32 MB). Cover scans and GIF frames are far
/// smaller; anything beyond this is a misbehaving source.
const DEFAULT_MAX_BYTES: u64 = 32 * 1024 * 1024;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// HTTP downloader for source assets.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    max_bytes: u64,
}

impl Downloader {
    /// Create a downloader with default limits.
    pub fn new() -> MediaResult<Self> {
        Self::with_limits(DEFAULT_MAX_BYTES, DEFAULT_TIMEOUT)
    }

    /// Create a downloader with explicit limits.
    pub fn with_limits(max_bytes: u64, timeout: Duration) -> MediaResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MediaError::download_failed(e.to_string()))?;
        Ok(Self { client, max_bytes })
    }

    /// Download `url` to `path`, streaming to disk.
    pub async fn fetch(&self, url: &str, path: impl AsRef<Path>) -> MediaResult<u64> {
        let path = path.as_ref();
        debug!("Downloading {} to {}", url, path.display());

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| MediaError::download_failed(format!("{url}: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MediaError::download_failed(format!(
                "{url}: HTTP {status}"
            )));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(MediaError::DownloadTooLarge {
                    limit: self.max_bytes,
                });
            }
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(path).await?;
        let mut written: u64 = 0;
        let mut stream = response.bytes_stream();

        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| MediaError::download_failed(format!("{url}: {e}")))?;
            written += chunk.len() as u64;
            if written > self.max_bytes {
                // Drop the partial file; the caller's workdir cleanup will
                // not see it as a usable asset.
                drop(file);
                tokio::fs::remove_file(path).await.ok();
                return Err(MediaError::DownloadTooLarge {
                    limit: self.max_bytes,
                });
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        debug!("Downloaded {} bytes from {}", written, url);
        Ok(written)
    }
}

/// Download a single file with default limits.
pub async fn download_file(url: &str, path: impl AsRef<Path>) -> MediaResult<u64> {
    Downloader::new()?.fetch(url, path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_fetch_writes_body_to_disk() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cover.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"jpegdata".to_vec()))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("cover.jpg");
        let written = download_file(&format!("{}/cover.jpg", server.uri()), &dest)
            .await
            .unwrap();

        assert_eq!(written, 8);
        assert_eq!(std::fs::read(&dest).unwrap(), b"jpegdata");
    }

    #[tokio::test]
    async fn test_fetch_rejects_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing.jpg"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let err = download_file(
            &format!("{}/missing.jpg", server.uri()),
            dir.path().join("missing.jpg"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, MediaError::DownloadFailed { .. }));
    }

    #[tokio::test]
    async fn test_fetch_enforces_size_cap() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge.jpg"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 64]))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("huge.jpg");
        let downloader = Downloader::with_limits(16, DEFAULT_TIMEOUT).unwrap();
        let err = downloader
            .fetch(&format!("{}/huge.jpg", server.uri()), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::DownloadTooLarge { limit: 16 }));
        assert!(!dest.exists());
    }
}
