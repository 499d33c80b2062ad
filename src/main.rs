//! CLI entry point for feed-downloader.

use std::io::{self, IsTerminal, Read};
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Parser;
use feed_downloader::config::{self, LoadedConfig, RunSettings};
use feed_downloader::download::HttpClient;
use feed_downloader::handler::{
    GenericHandler, HandlerRegistry, HttpFilenameResolver, PluginContext,
};
use feed_downloader::{BatchSummary, DownloadOrchestrator, Reference, UrlFilter};
use tracing::{debug, error, info, warn};

mod cli;
mod progress;

use cli::{Args, Command, DownloadArgs, ExtractArgs};
use progress::BatchProgress;

/// Process outcome mapped to an exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ProcessExit {
    Success,
    Partial,
    Failure,
}

impl From<ProcessExit> for ExitCode {
    fn from(value: ProcessExit) -> Self {
        match value {
            ProcessExit::Success => ExitCode::SUCCESS,
            ProcessExit::Failure => ExitCode::from(1),
            ProcessExit::Partial => ExitCode::from(2),
        }
    }
}

fn determine_exit_outcome(summary: &BatchSummary) -> ProcessExit {
    if summary.interrupted {
        ProcessExit::Failure
    } else if summary.failed == 0 {
        ProcessExit::Success
    } else if summary.succeeded > 0 {
        ProcessExit::Partial
    } else {
        ProcessExit::Failure
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();
    let loaded = config::load_default_file_config();

    // Priority: RUST_LOG env var > quiet flag > verbose flag > config verbosity > info
    let config_level = loaded
        .as_ref()
        .ok()
        .and_then(|l| l.config.as_ref())
        .and_then(|c| c.verbosity)
        .map_or("info", |v| v.log_level());
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => config_level,
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .init();

    debug!(?args, "CLI arguments parsed");

    let loaded = match loaded {
        Ok(loaded) => loaded,
        Err(e) => {
            error!("{e:#}");
            return ProcessExit::Failure.into();
        }
    };
    if let Some(path) = loaded.path.as_deref().filter(|_| loaded.loaded_from_file()) {
        info!(path = %path.display(), "Loaded config file");
    }

    let outcome = match args.command {
        Command::Download(ref download) => run_download(download, &loaded, args.quiet).await,
        Command::Extract(ref extract) => run_extract(extract, &loaded),
    };

    match outcome {
        Ok(exit) => exit.into(),
        Err(e) => {
            error!("{e:#}");
            ProcessExit::Failure.into()
        }
    }
}

fn merge_settings(args: &DownloadArgs, loaded: &LoadedConfig) -> RunSettings {
    let mut settings = RunSettings::from_file_config(loaded.config.as_ref());
    if let Some(dir) = &args.output_dir {
        settings.download_dir.clone_from(dir);
    }
    if args.overwrite_files {
        settings.overwrite_files = true;
    }
    if let Some(list) = &args.url_blacklist {
        settings.url_blacklist = UrlFilter::from_delimited(list);
    }
    if let Some(dir) = &args.plugins_dir {
        settings.plugins_dir.clone_from(dir);
    }
    settings
}

fn read_references(args: &DownloadArgs) -> Result<Option<Vec<Reference>>> {
    let raw = if args.reads_stdin() {
        if io::stdin().is_terminal() {
            info!("No input provided. Pipe a JSON reference list via stdin or pass --references FILE.");
            return Ok(None);
        }
        let mut buffer = String::new();
        io::stdin()
            .read_to_string(&mut buffer)
            .context("Failed to read references from stdin")?;
        buffer
    } else {
        let path = args.references.as_deref().unwrap_or(Path::new("-"));
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read reference list '{}'", path.display()))?
    };

    let references: Vec<Reference> =
        serde_json::from_str(&raw).context("Failed to parse reference list JSON")?;
    Ok(Some(references))
}

fn build_registry(client: &HttpClient, plugins_dir: &Path) -> HandlerRegistry {
    let fetcher = Arc::new(client.clone());
    let resolver = Arc::new(HttpFilenameResolver::new(client.clone()));
    let ctx = PluginContext {
        fetcher: fetcher.clone(),
        resolver: resolver.clone(),
    };

    let mut registry = HandlerRegistry::new(Box::new(GenericHandler::new(fetcher, resolver)));
    registry.discover(plugins_dir, &ctx);
    debug!(?registry, "Handler registry ready");
    registry
}

async fn run_download(args: &DownloadArgs, loaded: &LoadedConfig, quiet: bool) -> Result<ProcessExit> {
    let settings = merge_settings(args, loaded);
    debug!(?settings, "Effective settings");

    let Some(references) = read_references(args)? else {
        return Ok(ProcessExit::Success);
    };
    if references.is_empty() {
        info!("Reference list is empty, nothing to download");
        return Ok(ProcessExit::Success);
    }
    info!(count = references.len(), "References loaded");

    let client = HttpClient::new_with_timeouts(settings.connect_timeout_secs, settings.read_timeout_secs)
        .context("Failed to build HTTP client")?;
    let registry = build_registry(&client, &settings.plugins_dir);

    let interrupted = Arc::new(AtomicBool::new(false));
    let interrupted_signal = Arc::clone(&interrupted);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted_signal.store(true, Ordering::SeqCst);
        }
    });

    let mut orchestrator = DownloadOrchestrator::new(
        registry,
        settings.url_blacklist.clone(),
        &settings.download_dir,
        settings.overwrite_files,
    )
    .with_interrupt(Arc::clone(&interrupted));

    let progress = BatchProgress::new(progress::should_show_progress(
        io::stderr().is_terminal(),
        quiet,
        progress::is_dumb_terminal(),
    ));
    let result = orchestrator
        .run(&references, |event| progress.record(&event))
        .await;
    progress.finish();
    let summary = result?;

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        total = summary.total,
        "Download complete"
    );
    if summary.interrupted || interrupted.load(Ordering::SeqCst) {
        warn!(
            succeeded = summary.succeeded,
            total = summary.total,
            "Interrupted before all references were processed"
        );
    }

    Ok(determine_exit_outcome(&summary))
}

fn run_extract(args: &ExtractArgs, loaded: &LoadedConfig) -> Result<ProcessExit> {
    let html = std::fs::read_to_string(&args.html)
        .with_context(|| format!("Failed to read HTML file '{}'", args.html.display()))?;

    let settings = RunSettings::from_file_config(loaded.config.as_ref());
    let plugins_dir = args
        .plugins_dir
        .as_deref()
        .unwrap_or(settings.plugins_dir.as_path());
    let client = HttpClient::new_with_timeouts(settings.connect_timeout_secs, settings.read_timeout_secs)
        .context("Failed to build HTTP client")?;
    let registry = build_registry(&client, plugins_dir);

    let links = registry.extract_references(&html);
    info!(count = links.len(), "Links extracted");
    for link in links {
        println!("{link}");
    }
    Ok(ProcessExit::Success)
}
