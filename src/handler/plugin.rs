//! Plugin manifest discovery.
//!
//! Each `*.json` file in the plugins directory describes one specialized
//! handler. Manifests are applied in file-name order so dispatch order is
//! stable between runs.
//!
//! ```json
//! { "kind": "google-drive", "enabled": true }
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use super::google_drive::GoogleDriveHandler;
use super::mega::MegaHandler;
use super::resolver::FilenameResolver;
use super::DownloadHandler;
use crate::download::FileFetcher;

/// Handler kinds a manifest can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PluginKind {
    /// [`GoogleDriveHandler`].
    GoogleDrive,
    /// [`MegaHandler`].
    Mega,
}

/// Parsed contents of a plugin manifest file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PluginManifest {
    /// Which handler to instantiate.
    pub kind: PluginKind,
    /// Disabled manifests are skipped.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

/// Shared collaborators handed to handlers created from manifests.
#[derive(Clone)]
pub struct PluginContext {
    /// Writes downloaded content to disk.
    pub fetcher: Arc<dyn FileFetcher>,
    /// Discovers remote filenames.
    pub resolver: Arc<dyn FilenameResolver>,
}

impl std::fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginContext").finish_non_exhaustive()
    }
}

/// Errors raised while loading a single manifest.
#[derive(Debug, Error)]
pub enum PluginError {
    /// The manifest could not be read.
    #[error("failed to read plugin manifest {path}: {source}")]
    Read {
        /// Manifest path.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or names an unknown kind.
    #[error("invalid plugin manifest {path}: {source}")]
    Parse {
        /// Manifest path.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },
}

impl PluginManifest {
    /// Reads and parses a manifest file.
    ///
    /// # Errors
    ///
    /// Returns `PluginError::Read` or `PluginError::Parse`.
    pub fn load(path: &Path) -> Result<Self, PluginError> {
        let contents = std::fs::read_to_string(path).map_err(|source| PluginError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|source| PluginError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Instantiates the handler this manifest describes.
    #[must_use]
    pub fn build(&self, ctx: &PluginContext) -> Box<dyn DownloadHandler> {
        match self.kind {
            PluginKind::GoogleDrive => Box::new(GoogleDriveHandler::new(
                Arc::clone(&ctx.fetcher),
                Arc::clone(&ctx.resolver),
            )),
            PluginKind::Mega => Box::new(MegaHandler::new()),
        }
    }
}

/// Lists `*.json` files in `dir`, sorted by file name.
fn manifest_paths(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Builds the handlers described by the manifests in `dir`.
///
/// The directory is created when missing. Unreadable or invalid manifests are
/// logged and skipped; discovery itself never fails.
#[must_use]
pub fn discover_plugins(dir: &Path, ctx: &PluginContext) -> Vec<Box<dyn DownloadHandler>> {
    if !dir.exists() {
        info!(dir = %dir.display(), "Plugins directory not found, creating it");
        if let Err(e) = std::fs::create_dir_all(dir) {
            error!(dir = %dir.display(), error = %e, "Failed to create plugins directory");
            return Vec::new();
        }
    }

    let paths = match manifest_paths(dir) {
        Ok(paths) => paths,
        Err(e) => {
            error!(dir = %dir.display(), error = %e, "Failed to list plugins directory");
            return Vec::new();
        }
    };

    let mut handlers = Vec::new();
    for path in paths {
        match PluginManifest::load(&path) {
            Ok(manifest) if !manifest.enabled => {
                debug!(path = %path.display(), kind = ?manifest.kind, "Plugin disabled, skipping");
            }
            Ok(manifest) => {
                let handler = manifest.build(ctx);
                info!(path = %path.display(), name = handler.name(), "Plugin loaded");
                handlers.push(handler);
            }
            Err(e) => {
                error!(error = %e, "Failed to load plugin, skipping");
            }
        }
    }

    if handlers.is_empty() {
        warn!(dir = %dir.display(), "No plugins loaded, all links go to the generic handler");
    }
    handlers
}
