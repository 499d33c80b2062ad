//! Download handlers and the capability registry that dispatches to them.
//!
//! A handler knows how to recognize, fetch and extract links for one family of
//! hosts. The registry keeps specialized handlers in registration order and
//! falls back to the generic handler for everything else.
//!
//! # Architecture
//!
//! - [`DownloadHandler`] - Async trait that individual handlers implement
//! - [`HandlerRegistry`] - Ordered handler collection with the dispatch rule
//! - [`GenericHandler`] - Fallback handler with collision-safe file naming
//! - [`GoogleDriveHandler`] - Specialized handler for Google Drive links
//! - [`MegaHandler`] - Recognizes and extracts MEGA links
//! - [`FilenameResolver`] - Remote filename discovery used by handlers
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use feed_downloader::download::HttpClient;
//! use feed_downloader::handler::{GenericHandler, HandlerRegistry, HttpFilenameResolver};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new()?;
//! let generic = GenericHandler::new(
//!     Arc::new(client.clone()),
//!     Arc::new(HttpFilenameResolver::new(client)),
//! );
//! let mut registry = HandlerRegistry::new(Box::new(generic));
//! registry.initialize_run(false);
//! let handler = registry.select("https://example.com/file.zip")?;
//! println!("Selected handler: {}", handler.name());
//! # Ok(())
//! # }
//! ```

mod generic;
mod google_drive;
mod mega;
mod plugin;
mod registry;
mod resolver;

pub use generic::GenericHandler;
pub use google_drive::GoogleDriveHandler;
pub use mega::MegaHandler;
pub use plugin::{PluginContext, PluginError, PluginKind, PluginManifest, discover_plugins};
pub use registry::HandlerRegistry;
pub use resolver::{FilenameResolver, HttpFilenameResolver};

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

use crate::download::DownloadError;
use crate::reference::Reference;

/// Errors returned by [`DownloadHandler::fetch`].
///
/// Only [`HandlerError::Download`] is an expected per-item failure; the other
/// variants abort the batch.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A classified download failure for this reference.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The handler was called with arguments it must never receive.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the rejected argument.
        message: String,
    },

    /// The handler reached a state it cannot recover from.
    #[error("internal error in handler {handler}: {message}")]
    Internal {
        /// Name of the failing handler.
        handler: &'static str,
        /// Description of the failure.
        message: String,
    },
}

impl HandlerError {
    /// Creates an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(handler: &'static str, message: impl Into<String>) -> Self {
        Self::Internal {
            handler,
            message: message.into(),
        }
    }

    /// Returns true for failures that only affect the current reference.
    #[must_use]
    pub fn is_classified(&self) -> bool {
        matches!(self, Self::Download(_))
    }
}

/// Trait that all download handlers implement.
///
/// Handlers are instantiated once per process run and own their run-scoped
/// state, so `fetch` and `initialize_run` take `&mut self`.
///
/// # Example
///
/// ```ignore
/// #[async_trait]
/// impl DownloadHandler for MyHandler {
///     fn name(&self) -> &'static str { "my-host" }
///     fn identify(&self, url: &str) -> bool { url.contains("my-host.example") }
///     async fn fetch(&mut self, reference: &Reference, dir: &Path) -> Result<PathBuf, HandlerError> {
///         // download and return the written path
///     }
///     fn extract_references(&self, _html: &str) -> Vec<String> { Vec::new() }
///     fn initialize_run(&mut self, _overwrite: bool) {}
/// }
/// ```
#[async_trait]
pub trait DownloadHandler: Send + Sync {
    /// Returns the handler name for logging and debugging.
    fn name(&self) -> &'static str;

    /// Returns true if this handler can fetch the given (non-empty) URL.
    fn identify(&self, url: &str) -> bool;

    /// Downloads the reference into `destination_dir` and returns the written path.
    ///
    /// # Errors
    ///
    /// Returns [`HandlerError::Download`] for per-item failures, and the other
    /// variants for conditions that must stop the batch.
    async fn fetch(
        &mut self,
        reference: &Reference,
        destination_dir: &Path,
    ) -> Result<PathBuf, HandlerError>;

    /// Returns the downloadable links this handler recognizes in raw HTML.
    fn extract_references(&self, html: &str) -> Vec<String>;

    /// Resets run-scoped state and records the overwrite policy.
    fn initialize_run(&mut self, overwrite: bool);
}
