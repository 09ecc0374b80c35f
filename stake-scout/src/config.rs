//! Scout configuration with the built-in sources as defaults.
//!
//! [`ScoutConfig`] is passed to the aggregator at construction; nothing about
//! the source set or its timeouts lives in module-level state.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::ScoutError;
use crate::render::RendererKind;
use crate::sources::builtin;
use crate::sources::SourceDescriptor;

/// Configuration for a price lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoutConfig {
    /// Sources to query. All are queried concurrently on every lookup.
    pub sources: Vec<SourceDescriptor>,
    /// Custom User-Agent string sent by either renderer. If `None`, rotates
    /// through a built-in list of browser User-Agents.
    pub user_agent: Option<String>,
    /// Which renderer loads the quote pages.
    pub renderer: RendererKind,
    /// WebDriver endpoint for the browser renderer.
    pub webdriver_url: String,
    /// Serve pages over plain HTTP when no WebDriver session can be started.
    pub http_fallback: bool,
}

/// Default WebDriver endpoint (`chromedriver --port=4444`, `geckodriver`).
pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:4444";

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            sources: builtin::all(),
            user_agent: None,
            renderer: RendererKind::default(),
            webdriver_url: DEFAULT_WEBDRIVER_URL.to_owned(),
            http_fallback: true,
        }
    }
}

impl ScoutConfig {
    /// Validates this configuration, returning an error if any field is invalid.
    ///
    /// Checks:
    /// - at least one source is configured
    /// - source names are unique
    /// - every descriptor passes [`SourceDescriptor::validate`]
    /// - the WebDriver endpoint is an http(s) URL when the browser renderer is selected
    pub fn validate(&self) -> Result<(), ScoutError> {
        if self.renderer == RendererKind::Browser {
            match url::Url::parse(&self.webdriver_url) {
                Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
                _ => {
                    return Err(ScoutError::Config(format!(
                        "webdriver_url must be an http(s) URL, got {:?}",
                        self.webdriver_url
                    )))
                }
            }
        }

        if self.sources.is_empty() {
            return Err(ScoutError::Config(
                "at least one source must be configured".into(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            source.validate()?;
            if !seen.insert(source.name.as_str()) {
                return Err(ScoutError::Config(format!(
                    "duplicate source name: {}",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// Names of the configured sources, in configuration order.
    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name.as_str()).collect()
    }
}
