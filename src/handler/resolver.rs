//! Remote filename discovery for references the crawler could not name.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::download::HttpClient;
use crate::download::filename::{filename_from_url, repair_truncated_extension};

/// Derives a filename for a URL.
#[async_trait]
pub trait FilenameResolver: Send + Sync {
    /// Returns the remote filename, or `None` when it cannot be determined.
    async fn resolve(&self, url: &str) -> Option<String>;
}

/// Resolves names from the Content-Disposition header, then from the URL itself.
#[derive(Debug, Clone)]
pub struct HttpFilenameResolver {
    client: HttpClient,
}

impl HttpFilenameResolver {
    /// Creates a resolver that probes with the given client.
    #[must_use]
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FilenameResolver for HttpFilenameResolver {
    #[tracing::instrument(skip(self))]
    async fn resolve(&self, url: &str) -> Option<String> {
        match self.client.content_disposition_filename(url).await {
            Ok(Some(name)) => {
                let name = name.replace('"', "");
                if !name.is_empty() {
                    debug!(filename = %name, "Name taken from Content-Disposition");
                    return Some(name);
                }
            }
            Ok(None) => debug!("No Content-Disposition filename, trying url"),
            Err(e) => warn!(error = %e, "Filename probe failed, trying url"),
        }

        let name = filename_from_url(url)?;
        Some(repair_truncated_extension(url, name))
    }
}
