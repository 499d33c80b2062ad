//! Error types for the download module.
//!
//! Every variant here is an expected, per-item failure: the orchestrator turns
//! it into a failed completion event and moves on to the next reference.

use std::path::PathBuf;

use thiserror::Error;

use crate::reference::UrlType;

/// Errors that can occur while downloading a single reference.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Network-level error (DNS resolution, connection refused, TLS errors, etc.)
    #[error("network error downloading {url}: {source}")]
    Network {
        /// The URL that failed to download.
        url: String,
        /// The underlying network error.
        #[source]
        source: reqwest::Error,
    },

    /// Request timed out before completion.
    #[error("timeout downloading {url}")]
    Timeout {
        /// The URL that timed out.
        url: String,
    },

    /// HTTP error response (4xx client errors, 5xx server errors).
    #[error("HTTP {status} downloading {url}")]
    HttpStatus {
        /// The URL that returned an error status.
        url: String,
        /// The HTTP status code.
        status: u16,
    },

    /// File system error during download (create file, write, etc.)
    #[error("IO error writing to {path}: {source}")]
    Io {
        /// The file path where the error occurred.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The provided URL is malformed or invalid.
    #[error("invalid URL: {url}")]
    InvalidUrl {
        /// The invalid URL string.
        url: String,
    },

    /// A non-empty file is already present and overwriting is disabled.
    #[error("file {path} already exists")]
    AlreadyExists {
        /// The destination that was left untouched.
        path: PathBuf,
    },

    /// Neither the crawler nor the remote server provided a filename.
    #[error("[{post_id}] unable to retrieve name for entry of type {url_type}: {url}")]
    FilenameUnresolved {
        /// Post the reference belongs to.
        post_id: u64,
        /// The reference URL.
        url: String,
        /// Where the reference was found.
        url_type: UrlType,
    },

    /// A content-host URL did not carry the per-file id needed to disambiguate it.
    #[error("[{post_id}] unable to retrieve file id for {url}")]
    FileIdUnresolved {
        /// Post the reference belongs to.
        post_id: u64,
        /// The reference URL.
        url: String,
    },

    /// A content-host URL carried more than one media id.
    #[error("[{post_id}] more than one media id found in {url}")]
    AmbiguousFileId {
        /// Post the reference belongs to.
        post_id: u64,
        /// The reference URL.
        url: String,
    },

    /// The host is recognized but no handler can fetch from it.
    #[error("[NOT SUPPORTED] {host} link: {url}")]
    UnsupportedHost {
        /// Human-readable host label (e.g. "MEGA", "YouTube").
        host: &'static str,
        /// The reference URL.
        url: String,
    },
}

impl DownloadError {
    /// Creates a network error from a reqwest error.
    pub fn network(url: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            url: url.into(),
            source,
        }
    }

    /// Creates an HTTP status error.
    pub fn http_status(url: impl Into<String>, status: u16) -> Self {
        Self::HttpStatus {
            url: url.into(),
            status,
        }
    }

    /// Creates a timeout error.
    pub fn timeout(url: impl Into<String>) -> Self {
        Self::Timeout { url: url.into() }
    }

    /// Creates an IO error.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid URL error.
    pub fn invalid_url(url: impl Into<String>) -> Self {
        Self::InvalidUrl { url: url.into() }
    }

    /// Creates an already-exists error.
    pub fn already_exists(path: impl Into<PathBuf>) -> Self {
        Self::AlreadyExists { path: path.into() }
    }

    /// Creates a filename-unresolved error.
    pub fn filename_unresolved(post_id: u64, url: impl Into<String>, url_type: UrlType) -> Self {
        Self::FilenameUnresolved {
            post_id,
            url: url.into(),
            url_type,
        }
    }

    /// Creates a file-id-unresolved error.
    pub fn file_id_unresolved(post_id: u64, url: impl Into<String>) -> Self {
        Self::FileIdUnresolved {
            post_id,
            url: url.into(),
        }
    }

    /// Creates an ambiguous-file-id error.
    pub fn ambiguous_file_id(post_id: u64, url: impl Into<String>) -> Self {
        Self::AmbiguousFileId {
            post_id,
            url: url.into(),
        }
    }

    /// Creates an unsupported-host error.
    pub fn unsupported_host(host: &'static str, url: impl Into<String>) -> Self {
        Self::UnsupportedHost {
            host,
            url: url.into(),
        }
    }
}

// No `From<reqwest::Error>` / `From<std::io::Error>`: every variant needs the
// url or path context that the source errors do not carry.
