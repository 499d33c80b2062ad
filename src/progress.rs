//! Progress bar for download runs, fed by completion events.

use indicatif::{ProgressBar, ProgressStyle};

use feed_downloader::CompletionEvent;

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_show_progress(stderr_is_terminal: bool, quiet: bool, dumb_terminal: bool) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

/// Renders `[done/total]` with a bar; hidden when progress is disabled.
pub(crate) struct BatchProgress {
    bar: ProgressBar,
}

impl BatchProgress {
    pub(crate) fn new(visible: bool) -> Self {
        let bar = if visible {
            ProgressBar::new(0)
        } else {
            ProgressBar::hidden()
        };
        bar.set_style(
            ProgressStyle::with_template("{bar:30} [{pos}/{len}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        Self { bar }
    }

    pub(crate) fn record(&self, event: &CompletionEvent) {
        self.bar.set_length(event.total_in_batch as u64);
        self.bar.inc(1);
        let status = if event.success { "ok" } else { "failed" };
        self.bar.set_message(format!("{status}: {}", event.url));
    }

    pub(crate) fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_hidden_when_quiet_or_dumb() {
        assert!(should_show_progress(true, false, false));
        assert!(!should_show_progress(true, true, false));
        assert!(!should_show_progress(true, false, true));
        assert!(!should_show_progress(false, false, false));
    }

    #[test]
    fn test_record_tracks_position_and_length() {
        let progress = BatchProgress::new(false);
        progress.record(&CompletionEvent::success("https://a.example/1", 2));
        progress.record(&CompletionEvent::failure("https://a.example/2", 2, "HTTP 404"));
        assert_eq!(progress.bar.position(), 2);
        assert_eq!(progress.bar.length(), Some(2));
    }
}
