//! Crawled reference types: a discovered URL plus the post metadata needed to
//! place it on disk.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Where a reference was found in the creator's feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrlType {
    /// The primary file attached to a post.
    PostFile,
    /// An additional attachment of a post.
    PostAttachment,
    /// An inline image or video embedded in a post.
    PostMedia,
    /// The creator's avatar image.
    AvatarFile,
    /// The creator's cover image.
    CoverFile,
    /// A link to another host found in a post description.
    ExternalUrl,
    /// Origin could not be determined by the crawler.
    #[serde(other)]
    Unknown,
}

impl UrlType {
    /// Returns the stable string representation used in logs and input files.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PostFile => "post_file",
            Self::PostAttachment => "post_attachment",
            Self::PostMedia => "post_media",
            Self::AvatarFile => "avatar_file",
            Self::CoverFile => "cover_file",
            Self::ExternalUrl => "external_url",
            Self::Unknown => "unknown",
        }
    }

    /// Returns the filename category prefix for this type.
    ///
    /// Empty for campaign images and unknown origins.
    #[must_use]
    pub fn category_prefix(&self) -> &'static str {
        match self {
            Self::PostFile | Self::PostAttachment | Self::PostMedia => "post",
            Self::ExternalUrl => "external",
            Self::AvatarFile | Self::CoverFile | Self::Unknown => "",
        }
    }
}

impl fmt::Display for UrlType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A crawled URL awaiting download.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    /// The URL to fetch. Never empty for a valid reference.
    pub url: String,
    /// Id of the post the URL belongs to, or [`Reference::NO_POST`].
    #[serde(default)]
    pub post_id: u64,
    /// Title of the post, used for the destination directory name.
    #[serde(default)]
    pub post_name: String,
    /// Publication date of the post.
    pub date: NaiveDate,
    /// Where the URL was found.
    #[serde(default = "default_url_type")]
    pub url_type: UrlType,
    /// Filename already known to the crawler, if any.
    #[serde(default)]
    pub filename: Option<String>,
}

fn default_url_type() -> UrlType {
    UrlType::Unknown
}

impl Reference {
    /// Sentinel post id for assets that do not belong to a post (avatar, cover).
    pub const NO_POST: u64 = 0;

    /// Creates a reference with no known filename.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        post_id: u64,
        post_name: impl Into<String>,
        date: NaiveDate,
        url_type: UrlType,
    ) -> Self {
        Self {
            url: url.into(),
            post_id,
            post_name: post_name.into(),
            date,
            url_type,
            filename: None,
        }
    }

    /// Sets a filename already known to the crawler.
    #[must_use]
    pub fn with_filename(mut self, filename: impl Into<String>) -> Self {
        self.filename = Some(filename.into());
        self
    }
}
