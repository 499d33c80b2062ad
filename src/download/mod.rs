//! HTTP transport and on-disk naming for downloads.
//!
//! This module provides the streaming HTTP client that writes a single URL to a
//! single destination path, the classified error type every download failure
//! maps to, and the filename helpers used by handlers.
//!
//! # Features
//!
//! - Streaming downloads (memory-efficient for large files)
//! - Filename discovery from Content-Disposition headers
//! - Configurable timeouts (30s connect, 5min read by default)
//! - Overwrite policy: non-empty files are kept unless overwriting is enabled
//!
//! # Example
//!
//! ```no_run
//! use feed_downloader::download::HttpClient;
//! use std::path::Path;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let name = client
//!     .content_disposition_filename("https://example.com/api/download")
//!     .await?;
//! println!("Remote name: {name:?}");
//! # Ok(())
//! # }
//! ```

mod client;
mod constants;
mod error;
pub mod filename;

use std::path::{Path, PathBuf};

use async_trait::async_trait;

pub use client::{BROWSER_USER_AGENT, DownloadFileResult, HttpClient};
pub use constants::{CONNECT_TIMEOUT_SECS, READ_TIMEOUT_SECS};
pub use error::DownloadError;

/// Writes the content behind a URL to a destination path.
///
/// Implemented by [`HttpClient`]; handlers depend on the trait so their naming
/// logic can be exercised without a network.
#[async_trait]
pub trait FileFetcher: Send + Sync {
    /// Downloads `url` to `path`, honoring the overwrite policy.
    async fn fetch_to_path(
        &self,
        url: &str,
        path: &Path,
        overwrite: bool,
    ) -> Result<PathBuf, DownloadError>;
}

// Note: Per project convention, we do NOT define module-local Result aliases.
// Use `Result<T, DownloadError>` explicitly in function signatures.
