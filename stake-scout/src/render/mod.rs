//! The render capability: load a URL, wait for content, expose a queryable DOM.
//!
//! Adapters never talk to a browser or HTTP client directly. They open a
//! [`RenderSession`] through a [`Renderer`], drive it with bounded waits,
//! take an HTML snapshot with [`RenderSession::content`], and query it through
//! [`Document`]. Every session an adapter opens is closed by that adapter on
//! every exit path.
//!
//! Renderers:
//!
//! - [`BrowserRenderer`] drives a headless browser over WebDriver. Scripts
//!   run, waits observe the live DOM, and "load more" controls are clicked.
//!   This is the default.
//! - [`HttpRenderer`] fetches server-rendered HTML with `reqwest`. It cannot
//!   click, so paginated sources only see their first page.
//! - `StaticRenderer` (feature `test-util`) serves fixture HTML for tests and
//!   never touches the network.

pub mod browser;
pub mod document;
#[cfg(any(test, feature = "test-util"))]
pub mod fixture;
pub mod http;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ScoutConfig;
use crate::error::Result;

pub use browser::BrowserRenderer;
pub use document::{Document, Node};
#[cfg(any(test, feature = "test-util"))]
pub use fixture::{SessionFault, StaticRenderer};
pub use http::HttpRenderer;

/// Renderer selected by [`ScoutConfig::renderer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RendererKind {
    /// Headless browser over WebDriver, with optional HTTP fallback.
    #[default]
    Browser,
    /// Plain HTTP fetch of server-rendered HTML.
    Http,
}

/// Build the renderer `config` asks for.
pub fn from_config(config: &ScoutConfig) -> Arc<dyn Renderer> {
    match config.renderer {
        RendererKind::Browser => Arc::new(BrowserRenderer::new(config)),
        RendererKind::Http => Arc::new(HttpRenderer::new(config)),
    }
}

/// When a freshly navigated page counts as settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WaitUntil {
    /// The initial HTML has been parsed.
    #[serde(rename = "domcontentloaded")]
    DomContentLoaded,
    /// No network connections for a short quiet period.
    #[serde(rename = "networkidle0")]
    NetworkIdle0,
    /// At most two network connections for a short quiet period.
    #[default]
    #[serde(rename = "networkidle2")]
    NetworkIdle2,
}

/// Something that can open independent rendering sessions.
///
/// Implementations must support many concurrent sessions with no shared
/// page state between them.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Navigate to `url` and wait until `wait_until` holds or `timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`crate::ScoutError::Navigation`] or [`crate::ScoutError::Timeout`]
    /// if the page cannot be loaded in time. No session exists on error.
    async fn open(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<Box<dyn RenderSession>>;
}

/// One loaded page. Owned by exactly one adapter call.
#[async_trait]
pub trait RenderSession: Send {
    /// Wait until at least one element matches `selector`.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()>;

    /// Activate the first element matching `control_selector` whose text
    /// contains any of `labels` (case-insensitive).
    ///
    /// Returns `false` when no such control exists.
    async fn activate_control(
        &mut self,
        control_selector: &str,
        labels: &[String],
        timeout: Duration,
    ) -> Result<bool>;

    /// Snapshot of the current rendered HTML.
    async fn content(&mut self) -> Result<String>;

    /// Release the session. Called exactly once per opened session.
    async fn close(&mut self) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_until_uses_browser_event_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            wait: WaitUntil,
        }
        let w: Wrapper = toml::from_str(r#"wait = "networkidle0""#).expect("parse");
        assert_eq!(w.wait, WaitUntil::NetworkIdle0);
        let w: Wrapper = toml::from_str(r#"wait = "domcontentloaded""#).expect("parse");
        assert_eq!(w.wait, WaitUntil::DomContentLoaded);
    }

    #[test]
    fn wait_until_defaults_to_network_idle2() {
        assert_eq!(WaitUntil::default(), WaitUntil::NetworkIdle2);
    }

    #[test]
    fn renderers_are_object_safe_and_send_sync() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn Renderer>();
        assert_send_sync::<BrowserRenderer>();
        assert_send_sync::<HttpRenderer>();
        assert_send_sync::<StaticRenderer>();
    }

    #[test]
    fn renderer_kind_uses_lowercase_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            renderer: RendererKind,
        }
        let w: Wrapper = toml::from_str(r#"renderer = "http""#).expect("parse");
        assert_eq!(w.renderer, RendererKind::Http);
        let w: Wrapper = toml::from_str(r#"renderer = "browser""#).expect("parse");
        assert_eq!(w.renderer, RendererKind::Browser);
        assert_eq!(RendererKind::default(), RendererKind::Browser);
    }
}
