//! Fallback handler for any URL no specialized handler claims.
//!
//! Resolves a filename, assigns a collision-safe name within the run and
//! writes the content through the shared [`FileFetcher`].

use std::borrow::Cow;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use scraper::{Html, Selector};
use tracing::{debug, error, instrument};
use url::Url;

use super::resolver::FilenameResolver;
use super::{DownloadHandler, HandlerError};
use crate::download::filename::{
    compose_filename, content_host_file_ids, insert_disambiguator, is_content_host,
    sanitize_filename,
};
use crate::download::{DownloadError, FileFetcher};
use crate::reference::Reference;
use crate::utils::compile_static_selector;

static IMG_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("img[src]"));
static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| compile_static_selector("a[href]"));

/// Returns the label of a recognized host that cannot be downloaded from.
pub(crate) fn unsupported_host_label(url: &str) -> Option<&'static str> {
    let lower = url.to_ascii_lowercase();
    if lower.contains("mega.nz") {
        Some("MEGA")
    } else if lower.contains("youtube.com/watch?v=") || lower.contains("youtu.be/") {
        Some("YouTube")
    } else if lower.contains("imgur.com/") {
        Some("imgur")
    } else {
        None
    }
}

/// Forces Dropbox share links to serve the file instead of the preview page.
fn normalize_dropbox_url(url: &str) -> Result<Cow<'_, str>, DownloadError> {
    if !url.to_ascii_lowercase().contains("dropbox.com/") {
        return Ok(Cow::Borrowed(url));
    }

    let mut parsed = Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != "dl")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    parsed
        .query_pairs_mut()
        .clear()
        .extend_pairs(pairs)
        .append_pair("dl", "1");

    debug!(from = %url, to = %parsed, "Dropbox link normalized");
    Ok(Cow::Owned(parsed.into()))
}

/// Fallback handler with per-run collision counters.
pub struct GenericHandler {
    fetcher: Arc<dyn FileFetcher>,
    resolver: Arc<dyn FilenameResolver>,
    counters: HashMap<String, u32>,
    /// Lowercased final names handed out this run.
    assigned: HashSet<String>,
    overwrite: bool,
}

impl GenericHandler {
    /// Creates a generic handler that writes with `fetcher` and names with `resolver`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn FileFetcher>, resolver: Arc<dyn FilenameResolver>) -> Self {
        Self {
            fetcher,
            resolver,
            counters: HashMap::new(),
            assigned: HashSet::new(),
            overwrite: false,
        }
    }

    /// Picks the final on-disk name for a reference, bumping its collision counter.
    fn assign_filename(
        &mut self,
        reference: &Reference,
        filename: &str,
    ) -> Result<String, DownloadError> {
        let sanitized = sanitize_filename(filename);
        let key = format!("{}_{}", reference.post_id, sanitized).to_lowercase();
        let count = self.counters.entry(key.clone()).or_insert(0);
        *count += 1;
        let mut count = *count;

        let base = compose_filename(
            reference.post_id,
            reference.url_type.category_prefix(),
            &sanitized,
        );
        let mut name = if count == 1 {
            base.clone()
        } else {
            insert_disambiguator(&base, &collision_disambiguator(reference, &sanitized, count)?)
        };

        // Verbatim and disambiguated names can coincide within a post.
        while self.assigned.contains(&name.to_lowercase()) {
            count += 1;
            name = insert_disambiguator(&base, &count.to_string());
        }
        self.counters.insert(key, count);
        self.assigned.insert(name.to_lowercase());
        Ok(name)
    }
}

/// Content-host file id for a repeated name, or the occurrence counter elsewhere.
fn collision_disambiguator(
    reference: &Reference,
    sanitized: &str,
    count: u32,
) -> Result<String, DownloadError> {
    let disambiguator = if is_content_host(&reference.url) {
        let mut ids = content_host_file_ids(&reference.url);
        match ids.len() {
            0 => {
                return Err(DownloadError::file_id_unresolved(
                    reference.post_id,
                    &reference.url,
                ));
            }
            1 => ids.remove(0),
            _ => {
                return Err(DownloadError::ambiguous_file_id(
                    reference.post_id,
                    &reference.url,
                ));
            }
        }
    } else {
        count.to_string()
    };

    debug!(
        post_id = reference.post_id,
        filename = %sanitized,
        count,
        disambiguator = %disambiguator,
        "Filename collision, disambiguating"
    );
    Ok(disambiguator)
}

impl std::fmt::Debug for GenericHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenericHandler")
            .field("tracked_names", &self.counters.len())
            .field("assigned_names", &self.assigned.len())
            .field("overwrite", &self.overwrite)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl DownloadHandler for GenericHandler {
    fn name(&self) -> &'static str {
        "generic"
    }

    fn identify(&self, _url: &str) -> bool {
        true
    }

    #[instrument(skip(self, reference), fields(url = %reference.url, post_id = reference.post_id))]
    async fn fetch(
        &mut self,
        reference: &Reference,
        destination_dir: &Path,
    ) -> Result<PathBuf, HandlerError> {
        if let Some(host) = unsupported_host_label(&reference.url) {
            error!(post_id = reference.post_id, url = %reference.url, "[NOT SUPPORTED] {host} link");
            return Err(DownloadError::unsupported_host(host, &reference.url).into());
        }
        let url = normalize_dropbox_url(&reference.url)?;

        let filename = match &reference.filename {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.resolver.resolve(&url).await.ok_or_else(|| {
                DownloadError::filename_unresolved(
                    reference.post_id,
                    &reference.url,
                    reference.url_type,
                )
            })?,
        };

        let final_name = self.assign_filename(reference, &filename)?;
        let path = destination_dir.join(&final_name);
        debug!(path = %path.display(), "Writing reference");

        Ok(self.fetcher.fetch_to_path(&url, &path, self.overwrite).await?)
    }

    fn extract_references(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let images = document
            .select(&IMG_SELECTOR)
            .filter_map(|el| el.value().attr("src"));
        let links = document
            .select(&LINK_SELECTOR)
            .filter_map(|el| el.value().attr("href"));

        images
            .chain(links)
            .map(str::trim)
            .filter(|url| !url.is_empty() && unsupported_host_label(url).is_none())
            .map(ToString::to_string)
            .collect()
    }

    fn initialize_run(&mut self, overwrite: bool) {
        self.counters.clear();
        self.assigned.clear();
        self.overwrite = overwrite;
    }
}
