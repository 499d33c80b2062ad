//! Google Drive handler.
//!
//! Shared files are fetched through the direct-download endpoint; folder links
//! are recognized but cannot be downloaded.

use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{debug, error, instrument};

use super::resolver::FilenameResolver;
use super::{DownloadHandler, HandlerError};
use crate::download::filename::{compose_filename, sanitize_filename};
use crate::download::{DownloadError, FileFetcher};
use crate::reference::Reference;
use crate::utils::compile_static_regex;

static DRIVE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"https://drive\.google\.com/(?:file/d/|open\?id=|drive/folders/|folderview\?id=|drive/u/[0-9]+/folders/)([A-Za-z0-9_-]+)",
    )
});

const DIRECT_DOWNLOAD_ENDPOINT: &str = "https://drive.google.com/uc?export=download&id=";

/// Extracts the Drive object id from a supported link.
fn drive_id(url: &str) -> Option<&str> {
    DRIVE_URL_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

fn is_folder_link(url: &str) -> bool {
    url.contains("/folders/") || url.contains("folderview?id=")
}

/// The five characters preceding the last character of a Drive id.
///
/// Ids shorter than six characters are used whole.
fn short_id(id: &str) -> &str {
    let len = id.len();
    if len >= 6 { &id[len - 6..len - 1] } else { id }
}

/// Specialized handler for `drive.google.com` links.
pub struct GoogleDriveHandler {
    fetcher: Arc<dyn FileFetcher>,
    resolver: Arc<dyn FilenameResolver>,
    overwrite: bool,
}

impl GoogleDriveHandler {
    /// Creates a Drive handler that writes with `fetcher` and names with `resolver`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn FileFetcher>, resolver: Arc<dyn FilenameResolver>) -> Self {
        Self {
            fetcher,
            resolver,
            overwrite: false,
        }
    }
}

impl std::fmt::Debug for GoogleDriveHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GoogleDriveHandler")
            .field("overwrite", &self.overwrite)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DownloadHandler for GoogleDriveHandler {
    fn name(&self) -> &'static str {
        "google-drive"
    }

    fn identify(&self, url: &str) -> bool {
        DRIVE_URL_RE.is_match(url)
    }

    #[instrument(skip(self, reference), fields(url = %reference.url, post_id = reference.post_id))]
    async fn fetch(
        &mut self,
        reference: &Reference,
        destination_dir: &Path,
    ) -> Result<PathBuf, HandlerError> {
        let Some(id) = drive_id(&reference.url) else {
            return Err(HandlerError::internal(
                self.name(),
                format!("dispatched a url it does not identify: {}", reference.url),
            ));
        };
        if is_folder_link(&reference.url) {
            error!(post_id = reference.post_id, url = %reference.url, "[NOT SUPPORTED] Google Drive folder link");
            return Err(DownloadError::unsupported_host("Google Drive folder", &reference.url).into());
        }

        let download_url = format!("{DIRECT_DOWNLOAD_ENDPOINT}{id}");
        let remote_name = match &reference.filename {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self
                .resolver
                .resolve(&download_url)
                .await
                .unwrap_or_else(|| id.to_string()),
        };

        let prefix = format!("{}_gd", short_id(id));
        let final_name = compose_filename(reference.post_id, &prefix, &sanitize_filename(&remote_name));
        let path = destination_dir.join(final_name);
        debug!(id, path = %path.display(), "Downloading Drive file");

        Ok(self
            .fetcher
            .fetch_to_path(&download_url, &path, self.overwrite)
            .await?)
    }

    fn extract_references(&self, _html: &str) -> Vec<String> {
        // Drive links are plain anchors; the generic handler already finds them.
        Vec::new()
    }

    fn initialize_run(&mut self, overwrite: bool) {
        self.overwrite = overwrite;
    }
}
