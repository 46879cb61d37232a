// Application state module
// Read-only state shared by every connection

use std::sync::atomic::{AtomicBool, Ordering};

use super::types::Config;
use crate::render::{Renderer, TemplateEngine};
use crate::wiki::{PageStore, Result};

/// Application state
///
/// Built once at startup; handlers only read it, so it is shared through an
/// `Arc` without locks. The filesystem behind `store` is the only mutable
/// resource requests touch.
pub struct AppState {
    pub config: Config,
    pub store: PageStore,
    pub templates: Box<dyn TemplateEngine>,

    // Cached config values for fast access without locks
    pub cached_access_log: AtomicBool,
}

impl AppState {
    /// Create `AppState` with the page store and templates described by `config`
    pub fn new(config: &Config) -> Result<Self> {
        let store = PageStore::new(&config.wiki.data_dir, &config.wiki.page_extension);
        let templates = Renderer::load(config.wiki.template_dir.as_deref())?;
        Ok(Self::with_parts(config, store, Box::new(templates)))
    }

    pub fn with_parts(
        config: &Config,
        store: PageStore,
        templates: Box<dyn TemplateEngine>,
    ) -> Self {
        Self {
            config: config.clone(),
            store,
            templates,
            cached_access_log: AtomicBool::new(config.logging.access_log),
        }
    }

    pub fn access_log_enabled(&self) -> bool {
        self.cached_access_log.load(Ordering::Relaxed)
    }
}
