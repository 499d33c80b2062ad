//! Reference URL validation and the operator deny-list.

use thiserror::Error;
use tracing::debug;
use url::Url;

/// Why a reference URL was refused before dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UrlRejection {
    /// The URL is empty.
    #[error("url is empty")]
    Empty,

    /// The URL could not be parsed as an absolute URL.
    #[error("malformed url '{url}': {reason}")]
    Malformed {
        /// The rejected URL.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The URL scheme is not http or https.
    #[error("scheme '{scheme}' is not supported: {url}")]
    UnsupportedScheme {
        /// The rejected URL.
        url: String,
        /// The offending scheme.
        scheme: String,
    },

    /// The URL has no host.
    #[error("url has no host: {url}")]
    NoHost {
        /// The rejected URL.
        url: String,
    },

    /// The URL contains a deny-listed fragment.
    #[error("url matches blacklist entry '{entry}': {url}")]
    Blacklisted {
        /// The rejected URL.
        url: String,
        /// The matching entry as configured.
        entry: String,
    },
}

/// Accepts absolute http(s) URLs that contain none of the deny-list entries.
///
/// Deny-list matching is a case-insensitive substring test; empty entries are
/// ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlFilter {
    /// (original entry, lowercased entry)
    blacklist: Vec<(String, String)>,
}

impl UrlFilter {
    /// Creates a filter from deny-list entries.
    #[must_use]
    pub fn new<I, S>(blacklist: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let blacklist = blacklist
            .into_iter()
            .map(|entry| entry.as_ref().trim().to_string())
            .filter(|entry| !entry.is_empty())
            .map(|entry| {
                let lower = entry.to_lowercase();
                (entry, lower)
            })
            .collect();
        Self { blacklist }
    }

    /// Creates a filter from a pipe-delimited list such as `"a.com|b.net"`.
    #[must_use]
    pub fn from_delimited(list: &str) -> Self {
        Self::new(list.split('|'))
    }

    /// Validates a reference URL.
    ///
    /// # Errors
    ///
    /// Returns the [`UrlRejection`] describing the first failed check.
    pub fn check(&self, url: &str) -> Result<(), UrlRejection> {
        if url.trim().is_empty() {
            return Err(UrlRejection::Empty);
        }

        let parsed = Url::parse(url).map_err(|e| UrlRejection::Malformed {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        match parsed.scheme() {
            "http" | "https" => {}
            scheme => {
                return Err(UrlRejection::UnsupportedScheme {
                    url: url.to_string(),
                    scheme: scheme.to_string(),
                });
            }
        }

        if parsed.host().is_none() {
            return Err(UrlRejection::NoHost {
                url: url.to_string(),
            });
        }

        let lower = url.to_lowercase();
        if let Some((entry, _)) = self.blacklist.iter().find(|(_, l)| lower.contains(l.as_str())) {
            debug!(url = %url, entry = %entry, "Url is blacklisted");
            return Err(UrlRejection::Blacklisted {
                url: url.to_string(),
                entry: entry.clone(),
            });
        }

        Ok(())
    }

    /// Returns true when [`UrlFilter::check`] accepts the URL.
    #[must_use]
    pub fn is_allowed(&self, url: &str) -> bool {
        self.check(url).is_ok()
    }
}
