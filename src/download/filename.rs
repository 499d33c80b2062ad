//! Filename extraction, sanitization, and collision-safe naming for downloads.
//!
//! This module provides utilities for deriving safe filenames from URLs and
//! Content-Disposition headers, for recognizing the platform's content host,
//! and for composing the final on-disk name of a reference.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::reference::Reference;
use crate::utils::compile_static_regex;

/// Host suffix of the platform's media CDN.
pub const CONTENT_HOST_SUFFIX: &str = "patreonusercontent.com";

/// `name.ext` token at the end of a URL, optionally followed by query data.
static URL_FILENAME_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"([^/&?]+\.\w{3,4})(?:[?&].*)?$"));

/// Content-host media URL; group 5 is the stable per-file id.
static CONTENT_HOST_FILE_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    compile_static_regex(
        r"(?i)https://(.+)\.patreonusercontent\.com/(.+)/(.+)/patreon-media/p/post/([0-9]+)/([a-z0-9]+)",
    )
});

/// Parses Content-Disposition header to extract filename.
///
/// Handles both:
/// - `attachment; filename="example.pdf"`
/// - `attachment; filename=example.pdf`
/// - `attachment; filename*=UTF-8''example.pdf` (RFC 5987)
pub(crate) fn parse_content_disposition(header: &str) -> Option<String> {
    // Try filename*= first (RFC 5987 encoded)
    if let Some(pos) = header.find("filename*=") {
        let start = pos + 10;
        let value = header[start..].trim();
        // Format: charset'language'encoded_value
        if let Some(quote_pos) = value.find("''") {
            let encoded = &value[quote_pos + 2..];
            let end = encoded.find(';').unwrap_or(encoded.len());
            let encoded_name = encoded[..end].trim().trim_matches('"');
            if let Ok(decoded) = urlencoding::decode(encoded_name) {
                return Some(decoded.into_owned());
            }
        }
    }

    // Try regular filename=
    if let Some(pos) = header.find("filename=") {
        let start = pos + 9;
        let value = header[start..].trim();

        if let Some(stripped) = value.strip_prefix('"') {
            if let Some(end) = stripped.find('"') {
                let filename = &stripped[..end];
                return (!filename.is_empty()).then(|| filename.to_string());
            }
        } else {
            let end = value.find(';').unwrap_or(value.len());
            let filename = value[..end].trim().replace('"', "");
            if !filename.is_empty() {
                return Some(filename);
            }
        }
    }

    None
}

/// Sanitizes filename for filesystem safety.
///
/// Replaces characters that are invalid on common filesystems:
/// / \ : * ? " < > |
#[must_use]
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect()
}

/// Extracts a `name.ext` token from the URL path or query.
///
/// The extension must be 3 or 4 word characters; trailing query parameters are
/// tolerated. No host-specific repair is applied here.
#[must_use]
pub fn filename_from_url(url: &str) -> Option<String> {
    URL_FILENAME_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Returns true when the URL is served by the platform content host.
#[must_use]
pub fn is_content_host(url: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_ascii_lowercase))
        .is_some_and(|host| {
            host == CONTENT_HOST_SUFFIX || host.ends_with(&format!(".{CONTENT_HOST_SUFFIX}"))
        })
}

/// Restores extensions the content host truncates to three characters.
///
/// Only `.jpe` is known to be affected; other names pass through unchanged.
#[must_use]
pub fn repair_truncated_extension(url: &str, filename: String) -> String {
    if is_content_host(url) && filename.ends_with(".jpe") {
        return format!("{filename}g");
    }
    filename
}

/// Returns the per-file ids found in a content-host media URL, in match order.
#[must_use]
pub fn content_host_file_ids(url: &str) -> Vec<String> {
    CONTENT_HOST_FILE_ID_RE
        .captures_iter(url)
        .filter_map(|caps| caps.get(5).map(|m| m.as_str().to_string()))
        .collect()
}

/// Splits a filename into stem and extension (extension includes the dot).
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(pos) if pos > 0 => (&filename[..pos], &filename[pos..]),
        _ => (filename, ""),
    }
}

/// Inserts `_{disambiguator}` before the file extension.
///
/// `1.png` + `abc` becomes `1_abc.png`; names without an extension get the
/// suffix appended.
#[must_use]
pub fn insert_disambiguator(filename: &str, disambiguator: &str) -> String {
    let (stem, ext) = split_extension(filename);
    format!("{stem}_{disambiguator}{ext}")
}

/// Builds `{post_id}_{category}_{filename}`, leaving out empty parts.
///
/// A `post_id` of zero marks a non-post asset and is omitted.
#[must_use]
pub fn compose_filename(post_id: u64, category: &str, filename: &str) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(3);
    if post_id != Reference::NO_POST {
        parts.push(post_id.to_string());
    }
    if !category.is_empty() {
        parts.push(category.to_string());
    }
    parts.push(filename.to_string());
    parts.join("_")
}
