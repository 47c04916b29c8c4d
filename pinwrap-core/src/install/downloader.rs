//! Async file downloader with redirect following, retries and progress
//! reporting.
//!
//! Redirects are followed by hand so the hop count can be capped. Transfer
//! failures (connection drops, body read errors, disk writes) delete the
//! partial file and retry the whole fetch; a non-success HTTP status is
//! reported straight away without retrying.

use futures::StreamExt;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use std::io;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ProxyConfig;
use crate::console::Console;

/// Attempts per fetch, including the first.
pub const MAX_ATTEMPTS: u32 = 3;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 10;

/// Bytes between two progress ticks.
pub const PROGRESS_CHUNK_BYTES: u64 = 100_000;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest silence tolerated while reading a response.
pub const READ_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Errors
// ============================================================================

/// A failure while moving bytes from the server to disk.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("HTTP transfer failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Write failed: {0}")]
    Io(#[from] io::Error),
}

/// Download failures.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Invalid download URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to set up the HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("No file to download from {url}. Server replied HTTP code: {status}")]
    ServerStatus { url: String, status: u16 },

    #[error("Gave up on {url} after {limit} redirects")]
    TooManyRedirects { url: String, limit: usize },

    #[error("Failed to download {url} after {attempts} attempts: {source}")]
    IoFailure {
        url: String,
        attempts: u32,
        #[source]
        source: TransferError,
    },
}

impl DownloadError {
    /// Returns false for errors the caller may log and move past.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::ServerStatus { .. })
    }
}

/// Outcome of a single attempt.
enum AttemptError {
    /// Not worth retrying.
    Final(DownloadError),
    /// Retried until attempts run out.
    Transfer(TransferError),
}

impl From<TransferError> for AttemptError {
    fn from(e: TransferError) -> Self {
        Self::Transfer(e)
    }
}

// ============================================================================
// Download Progress
// ============================================================================

/// Progress information during a download.
#[derive(Debug, Clone)]
pub struct DownloadProgress {
    /// Bytes downloaded so far.
    pub bytes_downloaded: u64,
    /// Total bytes expected (if known from Content-Length header).
    pub total_bytes: Option<u64>,
    /// Progress percentage (0.0 to 100.0), or None if total is unknown.
    pub percent: Option<f32>,
}

impl DownloadProgress {
    pub fn new(bytes_downloaded: u64, total_bytes: Option<u64>) -> Self {
        let percent = total_bytes.map(|total| {
            if total > 0 {
                (bytes_downloaded as f32 / total as f32) * 100.0
            } else {
                0.0
            }
        });

        Self {
            bytes_downloaded,
            total_bytes,
            percent,
        }
    }
}

// ============================================================================
// Downloader
// ============================================================================

/// Fetches distribution archives over HTTP.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
    console: Console,
    max_attempts: u32,
    max_redirects: usize,
}

impl Downloader {
    /// Creates a downloader, optionally routed through an HTTP proxy.
    ///
    /// Without a proxy, proxy environment variables are ignored.
    pub fn new(console: Console, proxy: Option<&ProxyConfig>) -> Result<Self, DownloadError> {
        Self::with_read_timeout(console, proxy, READ_TIMEOUT)
    }

    /// Like [`Downloader::new`], but a stalled read fails after `read_timeout`
    /// and counts as a transfer failure.
    pub fn with_read_timeout(
        console: Console,
        proxy: Option<&ProxyConfig>,
        read_timeout: Duration,
    ) -> Result<Self, DownloadError> {
        let builder = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(read_timeout)
            .user_agent(concat!("pinwrap/", env!("CARGO_PKG_VERSION")));

        let builder = match proxy {
            Some(proxy) => {
                info!("Using HTTP proxy {}", proxy.url());
                builder.proxy(reqwest::Proxy::all(proxy.url()).map_err(DownloadError::Client)?)
            }
            None => builder.no_proxy(),
        };

        let client = builder.build().map_err(DownloadError::Client)?;

        Ok(Self {
            client,
            console,
            max_attempts: MAX_ATTEMPTS,
            max_redirects: MAX_REDIRECTS,
        })
    }

    /// Downloads `url` into `dest`, returning the number of bytes written.
    ///
    /// On success `dest` holds the complete body. After a transfer failure
    /// `dest` does not exist.
    pub async fn fetch(&self, url: &str, dest: &Path) -> Result<u64, DownloadError> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.fetch_once(url, dest).await {
                Ok(bytes) => return Ok(bytes),
                Err(AttemptError::Final(e)) => return Err(e),
                Err(AttemptError::Transfer(e)) => {
                    self.console.error(format!(
                        "Failed to download file {} due to I/O issue: {}",
                        dest.display(),
                        e
                    ));
                    remove_partial(dest).await;

                    if attempt >= self.max_attempts {
                        return Err(DownloadError::IoFailure {
                            url: url.to_string(),
                            attempts: attempt,
                            source: e,
                        });
                    }
                    debug!("Retrying {} (attempt {} of {})", url, attempt + 1, self.max_attempts);
                }
            }
        }
    }

    async fn fetch_once(&self, url: &str, dest: &Path) -> Result<u64, AttemptError> {
        self.console.log(2, format!("Downloading {url}"));

        let response = self.follow_redirects(url).await?;
        let final_url = response.url().to_string();

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::Final(DownloadError::ServerStatus {
                url: final_url,
                status: status.as_u16(),
            }));
        }

        let total_bytes = response.content_length();
        debug!("Content-Type = {:?}", response.headers().get(CONTENT_TYPE));
        debug!("Content-Disposition = {:?}", response.headers().get(CONTENT_DISPOSITION));
        debug!("Content-Length = {:?}", total_bytes);

        self.console.progress_started(&final_url);
        let result = self.stream_to_file(response, dest, &final_url, total_bytes).await;
        self.console.progress_finished();

        let bytes = result?;
        self.console.log(1, format!("Downloaded {final_url}"));
        info!("Download complete: {} bytes written to {}", bytes, dest.display());
        Ok(bytes)
    }

    /// Issues GETs until a non-redirect response arrives.
    async fn follow_redirects(&self, url: &str) -> Result<reqwest::Response, AttemptError> {
        let invalid = |url: &str, reason: String| {
            AttemptError::Final(DownloadError::InvalidUrl {
                url: url.to_string(),
                reason,
            })
        };

        let mut current = Url::parse(url).map_err(|e| invalid(url, e.to_string()))?;
        let mut redirects = 0;

        loop {
            let response = self
                .client
                .get(current.clone())
                .send()
                .await
                .map_err(TransferError::from)?;

            if !response.status().is_redirection() {
                return Ok(response);
            }
            let Some(location) = response.headers().get(LOCATION).cloned() else {
                return Ok(response);
            };

            if redirects >= self.max_redirects {
                return Err(AttemptError::Final(DownloadError::TooManyRedirects {
                    url: url.to_string(),
                    limit: self.max_redirects,
                }));
            }

            let location = location
                .to_str()
                .map_err(|e| invalid(current.as_str(), e.to_string()))?;
            let next = current
                .join(location)
                .map_err(|e| invalid(location, e.to_string()))?;

            debug!("{} redirected to {}", current, next);
            current = next;
            redirects += 1;
        }
    }

    async fn stream_to_file(
        &self,
        response: reqwest::Response,
        dest: &Path,
        url: &str,
        total_bytes: Option<u64>,
    ) -> Result<u64, TransferError> {
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = File::create(dest).await?;

        let mut stream = response.bytes_stream();
        let mut bytes_downloaded: u64 = 0;
        let mut next_tick = PROGRESS_CHUNK_BYTES;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;

            bytes_downloaded += chunk.len() as u64;
            while bytes_downloaded >= next_tick {
                self.console
                    .progress(url, &DownloadProgress::new(bytes_downloaded, total_bytes));
                next_tick += PROGRESS_CHUNK_BYTES;
            }
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(bytes_downloaded)
    }
}

async fn remove_partial(dest: &Path) {
    match tokio::fs::remove_file(dest).await {
        Ok(()) => debug!("Removed partial download {}", dest.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove partial download {}: {}", dest.display(), e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::test_support::{Reply, TestServer};
    use tempfile::TempDir;

    fn downloader() -> Downloader {
        Downloader::new(Console::buffered(2).0, None).unwrap()
    }

    #[test]
    fn test_download_progress_calculation() {
        let progress = DownloadProgress::new(50, Some(100));
        assert_eq!(progress.bytes_downloaded, 50);
        assert_eq!(progress.total_bytes, Some(100));
        assert_eq!(progress.percent, Some(50.0));

        let progress_no_total = DownloadProgress::new(50, None);
        assert_eq!(progress_no_total.percent, None);

        let progress_zero_total = DownloadProgress::new(0, Some(0));
        assert_eq!(progress_zero_total.percent, Some(0.0));
    }

    #[test]
    fn test_only_server_status_is_non_fatal() {
        let status = DownloadError::ServerStatus {
            url: "http://x".to_string(),
            status: 404,
        };
        let redirects = DownloadError::TooManyRedirects {
            url: "http://x".to_string(),
            limit: MAX_REDIRECTS,
        };
        assert!(!status.is_fatal());
        assert!(redirects.is_fatal());
    }

    #[tokio::test]
    async fn test_fetch_writes_body() {
        let server = TestServer::start(vec![Reply::Body(b"archive bytes".to_vec())]).await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("nested").join("tool.zip");

        let bytes = downloader()
            .fetch(&server.url("/tool.zip"), &dest)
            .await
            .unwrap();

        assert_eq!(bytes, 13);
        assert_eq!(std::fs::read(&dest).unwrap(), b"archive bytes");
        assert_eq!(server.hits(), 1);
    }

    #[tokio::test]
    async fn test_fetch_large_body_ticks_progress() {
        let body = vec![7u8; 350_000];
        let server = TestServer::start(vec![Reply::Body(body.clone())]).await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("tool.zip");

        let bytes = downloader()
            .fetch(&server.url("/tool.zip"), &dest)
            .await
            .unwrap();

        assert_eq!(bytes, body.len() as u64);
        assert_eq!(std::fs::read(&dest).unwrap(), body);
    }

    #[tokio::test]
    async fn test_fetch_follows_absolute_redirect() {
        let target = TestServer::start(vec![Reply::Body(b"final body".to_vec())]).await;
        let origin = TestServer::start(vec![Reply::Redirect(target.url("/real/tool.zip"))]).await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("tool.zip");

        downloader()
            .fetch(&origin.url("/tool.zip"), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"final body");
        assert_eq!(origin.hits(), 1);
        assert_eq!(target.requested_paths(), vec!["/real/tool.zip".to_string()]);
    }

    #[tokio::test]
    async fn test_fetch_follows_relative_redirect() {
        let server = TestServer::start(vec![
            Reply::Redirect("/mirror/tool.zip".to_string()),
            Reply::Body(b"mirrored".to_vec()),
        ])
        .await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("tool.zip");

        downloader()
            .fetch(&server.url("/tool.zip"), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"mirrored");
        assert_eq!(
            server.requested_paths(),
            vec!["/tool.zip".to_string(), "/mirror/tool.zip".to_string()]
        );
    }

    #[tokio::test]
    async fn test_fetch_caps_redirects() {
        let server = TestServer::start(vec![Reply::Redirect("/loop.zip".to_string())]).await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("tool.zip");

        let err = downloader()
            .fetch(&server.url("/loop.zip"), &dest)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DownloadError::TooManyRedirects {
                limit: MAX_REDIRECTS,
                ..
            }
        ));
        assert_eq!(server.hits(), MAX_REDIRECTS + 1);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_server_status_is_not_retried() {
        let server = TestServer::start(vec![Reply::Status(404)]).await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("tool.zip");

        let err = downloader()
            .fetch(&server.url("/tool.zip"), &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, DownloadError::ServerStatus { status: 404, .. }));
        assert!(!err.is_fatal());
        assert_eq!(server.hits(), 1);
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_fetch_retry_exhaustion_removes_partial_file() {
        let server = TestServer::start(vec![Reply::Truncated {
            declared: 10_000,
            body: b"only a little".to_vec(),
        }])
        .await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("tool.zip");

        let err = downloader()
            .fetch(&server.url("/tool.zip"), &dest)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DownloadError::IoFailure {
                attempts: MAX_ATTEMPTS,
                ..
            }
        ));
        assert!(err.is_fatal());
        assert_eq!(server.hits(), MAX_ATTEMPTS as usize);
        assert!(!dest.exists(), "partial download must be removed");
    }

    #[tokio::test]
    async fn test_fetch_recovers_after_dropped_connections() {
        let server = TestServer::start(vec![
            Reply::HangUp,
            Reply::HangUp,
            Reply::Body(b"third time lucky".to_vec()),
        ])
        .await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("tool.zip");

        downloader()
            .fetch(&server.url("/tool.zip"), &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"third time lucky");
        assert_eq!(server.hits(), 3);
    }

    #[tokio::test]
    async fn test_fetch_rejects_invalid_url() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("tool.zip");

        let err = downloader().fetch("not-a-url", &dest).await.unwrap_err();
        assert!(matches!(err, DownloadError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_stalled_transfer_is_retried_then_fails() {
        let server = TestServer::start(vec![Reply::Stall {
            declared: 10_000,
            body: b"first bytes".to_vec(),
        }])
        .await;
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("tool.zip");

        let downloader = Downloader::with_read_timeout(
            Console::buffered(2).0,
            None,
            Duration::from_millis(200),
        )
        .unwrap();
        let err = downloader
            .fetch(&server.url("/tool.zip"), &dest)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            DownloadError::IoFailure {
                attempts: MAX_ATTEMPTS,
                ..
            }
        ));
        assert_eq!(server.hits(), MAX_ATTEMPTS as usize);
        assert!(!dest.exists());
    }
}
