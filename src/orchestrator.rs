//! Sequential batch download with per-item failure isolation.
//!
//! The [`DownloadOrchestrator`] validates a batch of references, dispatches
//! each one through the [`HandlerRegistry`] and reports one
//! [`CompletionEvent`] per attempted reference, in input order.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use feed_downloader::download::HttpClient;
//! use feed_downloader::handler::{GenericHandler, HandlerRegistry, HttpFilenameResolver};
//! use feed_downloader::orchestrator::DownloadOrchestrator;
//! use feed_downloader::url_filter::UrlFilter;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let generic = GenericHandler::new(
//!     Arc::new(client.clone()),
//!     Arc::new(HttpFilenameResolver::new(client)),
//! );
//! let registry = HandlerRegistry::new(Box::new(generic));
//! let mut orchestrator =
//!     DownloadOrchestrator::new(registry, UrlFilter::default(), "./downloads", false);
//! let summary = orchestrator
//!     .run(&[], |event| println!("{} -> {}", event.url, event.success))
//!     .await?;
//! println!("Succeeded: {}, Failed: {}", summary.succeeded, summary.failed);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use crate::download::filename::sanitize_filename;
use crate::handler::{HandlerError, HandlerRegistry};
use crate::reference::Reference;
use crate::url_filter::UrlFilter;

/// Errors that stop a batch.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// A handler failed in a way that is not specific to one reference.
    #[error("fatal error while downloading {url}: {source}")]
    Fatal {
        /// Reference being processed when the batch stopped.
        url: String,
        /// The handler failure.
        #[source]
        source: HandlerError,
    },

    /// The destination directory for a reference could not be created.
    #[error("failed to create directory {path}: {source}")]
    CreateDirectory {
        /// Directory that could not be created.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of one attempted reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionEvent {
    /// The reference URL as given.
    pub url: String,
    /// Number of valid references in the batch.
    pub total_in_batch: usize,
    /// Whether the reference was written to disk.
    pub success: bool,
    /// Failure description; present exactly when `success` is false.
    pub error_message: Option<String>,
}

impl CompletionEvent {
    /// Creates a successful event.
    #[must_use]
    pub fn success(url: impl Into<String>, total_in_batch: usize) -> Self {
        Self {
            url: url.into(),
            total_in_batch,
            success: true,
            error_message: None,
        }
    }

    /// Creates a failed event carrying `message`.
    #[must_use]
    pub fn failure(url: impl Into<String>, total_in_batch: usize, message: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            total_in_batch,
            success: false,
            error_message: Some(message.into()),
        }
    }
}

/// Counters for a finished (or interrupted) batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Valid references in the batch.
    pub total: usize,
    /// References written to disk.
    pub succeeded: usize,
    /// References that failed with a per-item error.
    pub failed: usize,
    /// References rejected by validation.
    pub skipped: usize,
    /// Whether the operator stopped the batch early.
    pub interrupted: bool,
}

impl BatchSummary {
    /// Returns the number of references that produced an event.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// Returns `root/{yyyymm}/[{post_id}]{post name}` for a reference.
#[must_use]
pub fn destination_dir(root: &Path, reference: &Reference) -> PathBuf {
    let title = sanitize_filename(&reference.post_name);
    root.join(reference.date.format("%Y%m").to_string())
        .join(format!("[{}]{}", reference.post_id, title.trim_end_matches(['.', ' '])))
}

/// Drives a batch of references through the handler registry.
pub struct DownloadOrchestrator {
    registry: HandlerRegistry,
    filter: UrlFilter,
    download_root: PathBuf,
    overwrite: bool,
    interrupt: Arc<AtomicBool>,
}

impl DownloadOrchestrator {
    /// Creates an orchestrator writing below `download_root`.
    #[must_use]
    pub fn new(
        registry: HandlerRegistry,
        filter: UrlFilter,
        download_root: impl Into<PathBuf>,
        overwrite: bool,
    ) -> Self {
        Self {
            registry,
            filter,
            download_root: download_root.into(),
            overwrite,
            interrupt: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Uses `flag` as the operator interrupt signal.
    #[must_use]
    pub fn with_interrupt(mut self, flag: Arc<AtomicBool>) -> Self {
        self.interrupt = flag;
        self
    }

    /// Downloads every valid reference in order, calling `on_complete` once per attempt.
    ///
    /// Invalid references are logged and skipped without an event. A per-item
    /// failure produces a failed event and the batch continues. Setting the
    /// interrupt flag stops the batch before the next reference.
    ///
    /// # Errors
    ///
    /// Returns `OrchestratorError` when a handler fails with a non-classified
    /// error or a destination directory cannot be created. Events already
    /// delivered stay delivered.
    #[instrument(skip(self, references, on_complete), fields(count = references.len()))]
    pub async fn run<F>(
        &mut self,
        references: &[Reference],
        mut on_complete: F,
    ) -> Result<BatchSummary, OrchestratorError>
    where
        F: FnMut(CompletionEvent),
    {
        self.registry.initialize_run(self.overwrite);

        let valid: Vec<&Reference> = references
            .iter()
            .filter(|reference| match self.filter.check(&reference.url) {
                Ok(()) => true,
                Err(rejection) => {
                    warn!(post_id = reference.post_id, reason = %rejection, "Skipping invalid reference");
                    false
                }
            })
            .collect();

        let mut summary = BatchSummary {
            total: valid.len(),
            skipped: references.len() - valid.len(),
            ..BatchSummary::default()
        };
        info!(total = summary.total, skipped = summary.skipped, "Starting batch");

        for (index, reference) in valid.into_iter().enumerate() {
            if self.interrupt.load(Ordering::SeqCst) {
                warn!(
                    processed = index,
                    total = summary.total,
                    "Interrupted, stopping before next reference"
                );
                summary.interrupted = true;
                break;
            }

            debug!(index, url = %reference.url, "Processing reference");
            let dir = destination_dir(&self.download_root, reference);
            let handler =
                self.registry
                    .select(&reference.url)
                    .map_err(|source| OrchestratorError::Fatal {
                        url: reference.url.clone(),
                        source,
                    })?;
            debug!(handler = handler.name(), dir = %dir.display(), "Handler selected");

            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|source| OrchestratorError::CreateDirectory {
                    path: dir.clone(),
                    source,
                })?;

            match handler.fetch(reference, &dir).await {
                Ok(path) => {
                    info!(url = %reference.url, path = %path.display(), "Downloaded");
                    summary.succeeded += 1;
                    on_complete(CompletionEvent::success(&reference.url, summary.total));
                }
                Err(e) if e.is_classified() => {
                    error!(post_id = reference.post_id, url = %reference.url, error = %e, "Download failed");
                    summary.failed += 1;
                    on_complete(CompletionEvent::failure(
                        &reference.url,
                        summary.total,
                        e.to_string(),
                    ));
                }
                Err(source) => {
                    return Err(OrchestratorError::Fatal {
                        url: reference.url.clone(),
                        source,
                    });
                }
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            interrupted = summary.interrupted,
            "Batch finished"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for DownloadOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadOrchestrator")
            .field("registry", &self.registry)
            .field("download_root", &self.download_root)
            .field("overwrite", &self.overwrite)
            .finish_non_exhaustive()
    }
}
