//! Feed Downloader Library
//!
//! This library downloads the binary assets discovered while crawling a
//! creator's subscription feed, routing each reference to the handler best
//! equipped to fetch it and assigning collision-safe file names on disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`reference`] - Crawled reference types
//! - [`download`] - HTTP transport, download errors and filename helpers
//! - [`handler`] - Download handlers, plugin discovery and the dispatch registry
//! - [`url_filter`] - Reference URL validation and the deny-list
//! - [`orchestrator`] - Sequential batch processing with completion events
//! - [`config`] - Config file loading and run settings

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod handler;
pub mod orchestrator;
pub mod reference;
pub mod url_filter;
mod utils;

// Re-export commonly used types
pub use download::{DownloadError, FileFetcher, HttpClient};
pub use handler::{
    DownloadHandler, GenericHandler, HandlerError, HandlerRegistry, HttpFilenameResolver,
};
pub use orchestrator::{BatchSummary, CompletionEvent, DownloadOrchestrator, OrchestratorError};
pub use reference::{Reference, UrlType};
pub use url_filter::{UrlFilter, UrlRejection};
