//! MEGA link recognition and extraction.
//!
//! MEGA content is end-to-end encrypted behind its own API, which this crate
//! does not implement; references are recognized so they fail with a clear
//! message instead of downloading an HTML landing page.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use scraper::Html;
use tracing::{debug, error};

use super::{DownloadHandler, HandlerError};
use crate::download::DownloadError;
use crate::reference::Reference;
use crate::utils::compile_static_regex;

/// `mega.nz/file/<id>#<key>` and `mega.nz/folder/<id>#<key>`.
static NEW_FORMAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?i:\bmega(?:\.co)?\.nz)/(?P<type>file|folder)/(?P<id>[^#\s"<]+)#(?P<key>[a-zA-Z0-9_-]+)"#,
    )
});

/// `mega.nz/#!<id>!<key>` and `mega.nz/#F!<id>!<key>`.
static OLD_FORMAT_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r#"(?i:\bmega(?:\.co)?\.nz)/#(?P<type>F?)!(?P<id>[^!\s"<]+)!(?P<key>[^$!?\s"<]+)"#,
    )
});

/// Drops trailing text captured past the link and escaped `<wbr>` artefacts.
fn clean_link(link: &str) -> String {
    link.split(' ')
        .next()
        .unwrap_or_default()
        .replace("&lt;wbr&gt;", "")
        .replace("&lt;/wbr&gt;", "")
}

/// Recognizes MEGA links; fetching them is not supported.
#[derive(Debug, Default)]
pub struct MegaHandler;

impl MegaHandler {
    /// Creates a MEGA handler.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DownloadHandler for MegaHandler {
    fn name(&self) -> &'static str {
        "mega"
    }

    fn identify(&self, url: &str) -> bool {
        NEW_FORMAT_RE.is_match(url) || OLD_FORMAT_RE.is_match(url)
    }

    async fn fetch(
        &mut self,
        reference: &Reference,
        _destination_dir: &Path,
    ) -> Result<PathBuf, HandlerError> {
        error!(post_id = reference.post_id, url = %reference.url, "[NOT SUPPORTED] MEGA link");
        Err(DownloadError::unsupported_host("MEGA", &reference.url).into())
    }

    fn extract_references(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let text: Vec<&str> = document
            .root_element()
            .text()
            .filter(|t| !t.trim().is_empty())
            .collect();
        // Text nodes catch links written out in prose, raw markup catches hrefs.
        let haystack = format!("{}{html}", text.join(" "));

        let new_format = NEW_FORMAT_RE.captures_iter(&haystack).map(|caps| {
            format!(
                "https://mega.nz/{}/{}#{}",
                caps["type"].trim(),
                caps["id"].trim(),
                caps["key"].trim()
            )
        });
        let old_format = OLD_FORMAT_RE.captures_iter(&haystack).map(|caps| {
            format!(
                "https://mega.nz/#{}!{}!{}",
                caps["type"].trim(),
                caps["id"].trim(),
                caps["key"].trim()
            )
        });

        let mut seen = HashSet::new();
        let links: Vec<String> = new_format
            .chain(old_format)
            .map(|link| clean_link(&link))
            .filter(|link| seen.insert(link.clone()))
            .collect();
        debug!(count = links.len(), "MEGA links found");
        links
    }

    fn initialize_run(&mut self, _overwrite: bool) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::reference::UrlType;

    #[test]
    fn test_identify_new_and_old_formats() {
        let handler = MegaHandler::new();
        assert!(handler.identify("https://mega.nz/file/AbCd1234#KeyKey_-09"));
        assert!(handler.identify("https://mega.nz/folder/AbCd1234#KeyKey"));
        assert!(handler.identify("https://mega.nz/#!AbCd1234!KeyKey"));
        assert!(handler.identify("https://mega.co.nz/#F!AbCd1234!KeyKey"));
        assert!(!handler.identify("https://mega.nz/"));
        assert!(!handler.identify("https://example.com/file/abc#section"));
    }

    #[test]
    fn test_extract_references_canonicalizes_and_deduplicates() {
        let handler = MegaHandler::new();
        let html = r#"<p>Download: <a href="https://mega.nz/file/AbCd1234#KeyKey">mega</a></p>
<p>Old mirror mega.nz/#F!Zz99!OldKey</p>"#;

        let links = handler.extract_references(html);
        assert_eq!(
            links,
            vec![
                "https://mega.nz/file/AbCd1234#KeyKey",
                "https://mega.nz/#F!Zz99!OldKey"
            ]
        );
    }

    #[test]
    fn test_extract_references_ignores_other_hosts() {
        let handler = MegaHandler::new();
        let html = r#"<a href="https://docs.example.com/file/intro#setup">docs</a>
<p>See https://notmega.nz/file/abc#key and https://example.com/#!Ab!Key</p>"#;

        assert!(handler.extract_references(html).is_empty());
        assert!(!handler.identify("https://docs.example.com/file/intro#setup"));
    }

    #[test]
    fn test_extract_references_none_found() {
        let handler = MegaHandler::new();
        assert!(
            handler
                .extract_references("<p>nothing to see</p>")
                .is_empty()
        );
    }

    #[test]
    fn test_clean_link_strips_artefacts() {
        assert_eq!(
            clean_link("https://mega.nz/#!Ab&lt;wbr&gt;Cd!Key more text"),
            "https://mega.nz/#!AbCd!Key"
        );
    }

    #[tokio::test]
    async fn test_fetch_is_unsupported() {
        let mut handler = MegaHandler::new();
        let reference = Reference::new(
            "https://mega.nz/file/AbCd1234#KeyKey",
            1,
            "Post",
            NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
            UrlType::ExternalUrl,
        );

        let err = handler
            .fetch(&reference, Path::new("/downloads"))
            .await
            .unwrap_err();
        assert!(err.is_classified());
        assert!(err.to_string().contains("MEGA"));
    }
}
