//! HTTP client wrapper for downloading files.
//!
//! This module provides the `HttpClient` struct which handles streaming
//! downloads with proper timeout configuration and error handling, and the
//! header probe used to discover remote filenames.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use reqwest::header::CONTENT_DISPOSITION;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::FileFetcher;
use super::constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
use super::error::DownloadError;
use super::filename::parse_content_disposition;

/// Browser User-Agent sent with every request.
///
/// Content hosts behind the subscription platform reject non-browser agents.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36";

/// HTTP client for downloading files with streaming support.
///
/// This client is designed to be created once and reused for multiple downloads,
/// taking advantage of connection pooling.
///
/// # Example
///
/// ```no_run
/// use feed_downloader::download::HttpClient;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new()?;
/// let saved = client
///     .download_to_path("https://example.com/file.pdf", Path::new("./downloads/file.pdf"), false)
///     .await?;
/// println!("Downloaded {} bytes", saved.bytes_downloaded);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

/// Outcome of a completed download.
#[derive(Debug, Clone)]
pub struct DownloadFileResult {
    /// Final output path.
    pub path: PathBuf,
    /// Number of bytes written.
    pub bytes_downloaded: u64,
    /// Whether an existing file was replaced.
    pub replaced_existing: bool,
}

impl HttpClient {
    /// Creates a new HTTP client with default timeouts.
    ///
    /// Default configuration:
    /// - Connect timeout: 30 seconds
    /// - Read timeout: 5 minutes (for large files)
    /// - Gzip decompression: enabled
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::new_with_timeouts(CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS)
    }

    /// Creates a new HTTP client with explicit timeout values.
    ///
    /// # Errors
    ///
    /// Returns the reqwest builder error if the TLS backend cannot be initialized.
    pub fn new_with_timeouts(
        connect_timeout_secs: u64,
        read_timeout_secs: u64,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_secs))
            .timeout(Duration::from_secs(read_timeout_secs))
            .gzip(true)
            .user_agent(BROWSER_USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Wraps an already configured reqwest client (cookies, proxies, DNS overrides).
    #[must_use]
    pub fn from_client(client: Client) -> Self {
        Self { client }
    }

    /// Downloads `url` into exactly `path`.
    ///
    /// An existing non-empty file is only replaced when `overwrite` is true;
    /// an existing empty file is always replaced. The destination is not
    /// touched until the server has answered with a success status.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` if:
    /// - The URL is invalid
    /// - The destination exists, is non-empty, and `overwrite` is false
    /// - The request fails (network error, timeout)
    /// - The server returns an error status (4xx, 5xx)
    /// - Writing to disk fails
    #[instrument(skip(self), fields(url = %url, path = %path.display()))]
    pub async fn download_to_path(
        &self,
        url: &str,
        path: &Path,
        overwrite: bool,
    ) -> Result<DownloadFileResult, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let replaced_existing = check_existing_destination(path, overwrite).await?;

        let response = self.send_request(url).await?;

        let mut file = File::create(path)
            .await
            .map_err(|e| DownloadError::io(path.to_path_buf(), e))?;

        debug!("starting download");
        let stream_result = stream_to_file(&mut file, response, url, path).await;
        if stream_result.is_err() {
            debug!(path = %path.display(), "cleaning up partial file after error");
            let _ = tokio::fs::remove_file(path).await;
        }
        let bytes_written = stream_result?;

        info!(path = %path.display(), bytes = bytes_written, "download complete");

        Ok(DownloadFileResult {
            path: path.to_path_buf(),
            bytes_downloaded: bytes_written,
            replaced_existing,
        })
    }

    /// Requests `url` and returns the Content-Disposition filename, if any.
    ///
    /// Only the response headers are consulted; the body is dropped unread.
    ///
    /// # Errors
    ///
    /// Returns `DownloadError` for transport failures and non-success statuses.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn content_disposition_filename(
        &self,
        url: &str,
    ) -> Result<Option<String>, DownloadError> {
        let response = self.send_request(url).await?;
        let filename = response
            .headers()
            .get(CONTENT_DISPOSITION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_content_disposition);
        debug!(filename = ?filename, "Content-Disposition returned");
        Ok(filename)
    }

    async fn send_request(&self, url: &str) -> Result<reqwest::Response, DownloadError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                DownloadError::timeout(url)
            } else {
                DownloadError::network(url, e)
            }
        })?;

        if !response.status().is_success() {
            return Err(DownloadError::http_status(url, response.status().as_u16()));
        }

        Ok(response)
    }
}

#[async_trait]
impl FileFetcher for HttpClient {
    async fn fetch_to_path(
        &self,
        url: &str,
        path: &Path,
        overwrite: bool,
    ) -> Result<PathBuf, DownloadError> {
        let result = self.download_to_path(url, path, overwrite).await?;
        if result.replaced_existing {
            info!(
                path = %result.path.display(),
                bytes = result.bytes_downloaded,
                "existing file replaced"
            );
        }
        Ok(result.path)
    }
}

/// Applies the overwrite policy to an existing destination.
///
/// Returns whether a file will be replaced.
async fn check_existing_destination(path: &Path, overwrite: bool) -> Result<bool, DownloadError> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(DownloadError::io(path.to_path_buf(), e)),
    };

    if metadata.len() == 0 {
        info!(path = %path.display(), "file already exists but is empty, will be overwritten");
        return Ok(true);
    }
    if !overwrite {
        return Err(DownloadError::already_exists(path));
    }
    warn!(path = %path.display(), "file already exists, will be overwritten");
    Ok(true)
}

/// Streams response body to file, returning bytes written.
///
/// This is extracted to enable cleanup on error in the caller.
async fn stream_to_file(
    file: &mut File,
    response: reqwest::Response,
    url: &str,
    file_path: &Path,
) -> Result<u64, DownloadError> {
    let mut writer = BufWriter::new(file);
    let mut stream = response.bytes_stream();
    let mut bytes_written: u64 = 0;

    while let Some(chunk_result) = stream.next().await {
        let chunk = chunk_result.map_err(|e| DownloadError::network(url, e))?;

        writer
            .write_all(&chunk)
            .await
            .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

        bytes_written += chunk.len() as u64;
    }

    writer
        .flush()
        .await
        .map_err(|e| DownloadError::io(file_path.to_path_buf(), e))?;

    Ok(bytes_written)
}
