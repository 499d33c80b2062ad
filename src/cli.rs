//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Download the files referenced by a creator's subscription feed.
///
/// Reads the crawler's JSON reference list, routes every link to the handler
/// that can fetch it and stores the results per post and month.
#[derive(Parser, Debug)]
#[command(name = "feed-downloader")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download every reference in a JSON reference list
    Download(DownloadArgs),
    /// Print the downloadable links found in an HTML document
    Extract(ExtractArgs),
}

/// Arguments for `feed-downloader download`.
#[derive(ClapArgs, Debug)]
pub struct DownloadArgs {
    /// JSON reference list to read ("-" or omitted reads stdin)
    #[arg(long, value_name = "FILE")]
    pub references: Option<PathBuf>,

    /// Root directory for downloaded files
    #[arg(short = 'o', long = "output-dir", value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Replace existing non-empty files
    #[arg(long)]
    pub overwrite_files: bool,

    /// Pipe-delimited list of URL fragments to skip (e.g. "a.com|b.net")
    #[arg(long, value_name = "LIST")]
    pub url_blacklist: Option<String>,

    /// Directory holding plugin manifests
    #[arg(long, value_name = "DIR")]
    pub plugins_dir: Option<PathBuf>,
}

impl DownloadArgs {
    /// Returns true when references should be read from stdin.
    #[must_use]
    pub fn reads_stdin(&self) -> bool {
        self.references
            .as_deref()
            .is_none_or(|path| path.as_os_str() == "-")
    }
}

/// Arguments for `feed-downloader extract`.
#[derive(ClapArgs, Debug)]
pub struct ExtractArgs {
    /// HTML file to scan
    #[arg(long, value_name = "FILE")]
    pub html: PathBuf,

    /// Directory holding plugin manifests
    #[arg(long, value_name = "DIR")]
    pub plugins_dir: Option<PathBuf>,
}
