//! HTTP renderer with User-Agent rotation.
//!
//! Fetches the page once with a browser-like [`reqwest::Client`] and serves
//! every query from that snapshot. It does not run scripts, so controls cannot
//! be activated and selectors either exist in the served HTML or never appear.

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use super::document::Document;
use super::{RenderSession, Renderer, WaitUntil};
use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};

/// Realistic browser User-Agent strings, rotated per session.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:133.0) Gecko/20100101 Firefox/133.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:133.0) Gecko/20100101 Firefox/133.0",
];

/// Renderer backed by plain HTTP fetches.
///
/// Each session gets its own client and cookie jar, so concurrent sessions
/// share nothing.
#[derive(Debug, Clone, Default)]
pub struct HttpRenderer {
    user_agent: Option<String>,
}

impl HttpRenderer {
    pub fn new(config: &ScoutConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
        }
    }

    fn build_client(&self, timeout: Duration) -> Result<reqwest::Client> {
        let ua = match self.user_agent {
            Some(ref custom) => custom.clone(),
            None => random_user_agent().to_owned(),
        };

        reqwest::Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .user_agent(ua)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| ScoutError::Http(format!("failed to build HTTP client: {e}")))
    }
}

#[async_trait]
impl Renderer for HttpRenderer {
    async fn open(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<Box<dyn RenderSession>> {
        tracing::trace!(url, ?wait_until, "HTTP render");

        let client = self.build_client(timeout)?;

        let response = client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml")
            .header("Accept-Language", "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| navigation_error(url, timeout, &e))?
            .error_for_status()
            .map_err(|e| ScoutError::Navigation(format!("{url}: {e}")))?;

        let html = response
            .text()
            .await
            .map_err(|e| navigation_error(url, timeout, &e))?;

        tracing::trace!(url, bytes = html.len(), "page received");

        Ok(Box::new(HttpSession {
            url: url.to_owned(),
            html,
        }))
    }
}

fn navigation_error(url: &str, timeout: Duration, err: &reqwest::Error) -> ScoutError {
    if err.is_timeout() {
        ScoutError::Timeout(format!("{url} did not load within {}s", timeout.as_secs()))
    } else {
        ScoutError::Navigation(format!("{url}: {err}"))
    }
}

/// Select a random User-Agent string from the rotation list.
pub fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS
        .choose(&mut rng)
        .copied()
        // SAFETY: USER_AGENTS is a non-empty const array, choose only returns None on empty slices
        .unwrap_or(USER_AGENTS[0])
}

struct HttpSession {
    url: String,
    html: String,
}

fn has_match(html: &str, selector: &str) -> Result<bool> {
    Document::parse(html).contains(selector)
}

#[async_trait]
impl RenderSession for HttpSession {
    async fn wait_for_selector(&mut self, selector: &str, _timeout: Duration) -> Result<()> {
        if has_match(&self.html, selector)? {
            Ok(())
        } else {
            Err(ScoutError::Timeout(format!(
                "`{selector}` is not present in the served HTML of {}",
                self.url
            )))
        }
    }

    async fn activate_control(
        &mut self,
        control_selector: &str,
        _labels: &[String],
        _timeout: Duration,
    ) -> Result<bool> {
        tracing::trace!(
            url = %self.url,
            control_selector,
            "HTTP renderer cannot activate controls"
        );
        Ok(false)
    }

    async fn content(&mut self) -> Result<String> {
        Ok(self.html.clone())
    }

    async fn close(&mut self) -> Result<()> {
        tracing::trace!(url = %self.url, "HTTP session closed");
        Ok(())
    }
}
