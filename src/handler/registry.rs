//! Handler registry with first-match dispatch.
//!
//! The [`HandlerRegistry`] keeps specialized handlers in registration order and
//! owns the generic fallback handler.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};

use super::plugin::{PluginContext, discover_plugins};
use super::{DownloadHandler, HandlerError};

/// An ordered collection of specialized handlers plus the generic fallback.
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn DownloadHandler>>,
    generic: Box<dyn DownloadHandler>,
}

impl HandlerRegistry {
    /// Creates a registry with no specialized handlers.
    #[must_use]
    pub fn new(generic: Box<dyn DownloadHandler>) -> Self {
        Self {
            handlers: Vec::new(),
            generic,
        }
    }

    /// Registers a specialized handler after the ones already present.
    #[tracing::instrument(skip(self, handler), fields(handler_name))]
    pub fn register(&mut self, handler: Box<dyn DownloadHandler>) {
        tracing::Span::current().record("handler_name", handler.name());
        debug!(name = handler.name(), "Registering handler");
        self.handlers.push(handler);
    }

    /// Registers every handler described by the manifests in `plugins_dir`.
    ///
    /// Returns the number of handlers registered. Bad manifests are logged and
    /// skipped by discovery.
    #[tracing::instrument(skip(self, ctx), fields(dir = %plugins_dir.display()))]
    pub fn discover(&mut self, plugins_dir: &Path, ctx: &PluginContext) -> usize {
        let discovered = discover_plugins(plugins_dir, ctx);
        let count = discovered.len();
        for handler in discovered {
            self.register(handler);
        }
        info!(count, "Plugin handlers registered");
        count
    }

    /// Returns the number of specialized handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Returns the specialized handler names in dispatch order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<&'static str> {
        self.handlers.iter().map(|h| h.name()).collect()
    }

    /// Broadcasts the start of a run: specialized handlers first, generic last.
    #[tracing::instrument(skip(self))]
    pub fn initialize_run(&mut self, overwrite: bool) {
        for handler in &mut self.handlers {
            debug!(name = handler.name(), "Initializing handler");
            handler.initialize_run(overwrite);
        }
        self.generic.initialize_run(overwrite);
    }

    /// Returns the first specialized handler that identifies `url`, else the generic one.
    ///
    /// # Errors
    ///
    /// Returns `HandlerError::InvalidArgument` for an empty URL.
    #[tracing::instrument(skip(self))]
    pub fn select(&mut self, url: &str) -> Result<&mut dyn DownloadHandler, HandlerError> {
        if url.is_empty() {
            return Err(HandlerError::invalid_argument("url cannot be empty"));
        }

        match self.handlers.iter().position(|h| h.identify(url)) {
            Some(index) => {
                let handler = self.handlers[index].as_mut();
                debug!(handler = handler.name(), "Specialized handler selected");
                Ok(handler)
            }
            None => {
                debug!(handler = self.generic.name(), "Falling back to generic handler");
                Ok(self.generic.as_mut())
            }
        }
    }

    /// Collects links from every handler, specialized first, without duplicates.
    ///
    /// Links are returned in order of first discovery.
    #[must_use]
    #[tracing::instrument(skip(self, html), fields(html_len = html.len()))]
    pub fn extract_references(&self, html: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut links = Vec::new();

        let all = self
            .handlers
            .iter()
            .chain(std::iter::once(&self.generic));
        for handler in all {
            let found = handler.extract_references(html);
            debug!(handler = handler.name(), count = found.len(), "Links extracted");
            for link in found {
                if seen.insert(link.clone()) {
                    links.push(link);
                }
            }
        }

        links
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handler_count", &self.handler_count())
            .field("handlers", &self.handler_names())
            .field("generic", &self.generic.name())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;

    use super::*;
    use crate::reference::Reference;

    /// Records the calls a handler receives into a shared log.
    struct MockHandler {
        name: &'static str,
        pattern: &'static str,
        links: Vec<&'static str>,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl MockHandler {
        fn new(name: &'static str, pattern: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Self {
            Self {
                name,
                pattern,
                links: Vec::new(),
                log: Arc::clone(log),
            }
        }

        fn with_links(mut self, links: Vec<&'static str>) -> Self {
            self.links = links;
            self
        }
    }

    #[async_trait]
    impl DownloadHandler for MockHandler {
        fn name(&self) -> &'static str {
            self.name
        }

        fn identify(&self, url: &str) -> bool {
            self.log
                .lock()
                .unwrap()
                .push(format!("identify:{}:{url}", self.name));
            !self.pattern.is_empty() && url.contains(self.pattern)
        }

        async fn fetch(
            &mut self,
            reference: &Reference,
            destination_dir: &Path,
        ) -> Result<PathBuf, HandlerError> {
            Ok(destination_dir.join(format!("{}-{}", self.name, reference.post_id)))
        }

        fn extract_references(&self, _html: &str) -> Vec<String> {
            self.links.iter().map(ToString::to_string).collect()
        }

        fn initialize_run(&mut self, overwrite: bool) {
            self.log
                .lock()
                .unwrap()
                .push(format!("init:{}:{overwrite}", self.name));
        }
    }

    fn registry_with(
        log: &Arc<Mutex<Vec<String>>>,
        specialized: Vec<MockHandler>,
    ) -> HandlerRegistry {
        let mut registry = HandlerRegistry::new(Box::new(MockHandler::new("generic", "", log)));
        for handler in specialized {
            registry.register(Box::new(handler));
        }
        registry
    }

    #[test]
    fn test_select_first_identifying_handler_wins() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = registry_with(
            &log,
            vec![
                MockHandler::new("first", "drive.example", &log),
                MockHandler::new("second", "drive.example", &log),
            ],
        );

        let handler = registry.select("https://drive.example/file/1").unwrap();
        assert_eq!(handler.name(), "first");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["identify:first:https://drive.example/file/1"]
        );
    }

    #[test]
    fn test_select_falls_back_to_generic() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = registry_with(&log, vec![MockHandler::new("drive", "drive.example", &log)]);

        let handler = registry.select("https://cdn.example/a.png").unwrap();
        assert_eq!(handler.name(), "generic");
        assert_eq!(
            *log.lock().unwrap(),
            vec!["identify:drive:https://cdn.example/a.png"]
        );
    }

    #[test]
    fn test_select_rejects_empty_url_before_identify() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = registry_with(&log, vec![MockHandler::new("drive", "drive.example", &log)]);

        let result = registry.select("");
        assert!(matches!(result, Err(HandlerError::InvalidArgument { .. })));
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_initialize_run_broadcasts_generic_last() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = registry_with(
            &log,
            vec![
                MockHandler::new("a", "a.example", &log),
                MockHandler::new("b", "b.example", &log),
            ],
        );

        registry.initialize_run(true);
        assert_eq!(
            *log.lock().unwrap(),
            vec!["init:a:true", "init:b:true", "init:generic:true"]
        );
    }

    #[test]
    fn test_extract_references_deduplicates_in_discovery_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = HandlerRegistry::new(Box::new(
            MockHandler::new("generic", "", &log).with_links(vec![
                "https://x.example/2",
                "https://x.example/1",
                "https://x.example/3",
            ]),
        ));
        registry.register(Box::new(
            MockHandler::new("a", "a.example", &log)
                .with_links(vec!["https://x.example/1", "https://x.example/2"]),
        ));

        let links = registry.extract_references("<html></html>");
        assert_eq!(
            links,
            vec![
                "https://x.example/1",
                "https://x.example/2",
                "https://x.example/3"
            ]
        );
    }

    #[test]
    fn test_extract_references_is_case_sensitive() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = HandlerRegistry::new(Box::new(
            MockHandler::new("generic", "", &log)
                .with_links(vec!["https://x.example/A", "https://x.example/a"]),
        ));

        assert_eq!(registry.extract_references("").len(), 2);
    }

    #[test]
    fn test_registry_debug_lists_names() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let registry = registry_with(&log, vec![MockHandler::new("drive", "drive.example", &log)]);

        let debug = format!("{registry:?}");
        assert!(debug.contains("drive"));
        assert!(debug.contains("generic"));
        assert_eq!(registry.handler_count(), 1);
        assert_eq!(registry.handler_names(), vec!["drive"]);
    }
}
