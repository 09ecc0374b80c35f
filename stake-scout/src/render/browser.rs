//! Headless-browser renderer driven over WebDriver.
//!
//! Every session is its own WebDriver session (its own browser profile), so
//! concurrent adapters never share page state. Pages run their scripts,
//! selector waits poll the live DOM, and "load more" controls are clicked.
//!
//! A WebDriver server (`chromedriver`, `geckodriver`, or a Selenium grid)
//! must be reachable at [`ScoutConfig::webdriver_url`]. When it is not and
//! the HTTP fallback is enabled, sessions are served by [`HttpRenderer`]
//! instead.

use std::time::Duration;

use async_trait::async_trait;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{json, Map, Value};

use super::document::label_matches;
use super::http::{random_user_agent, HttpRenderer};
use super::{RenderSession, Renderer, WaitUntil};
use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};

/// Quiet period used to decide that the network has settled.
const IDLE_WINDOW: Duration = Duration::from_millis(500);

/// Resource entries recorded by the page so far.
const RESOURCE_COUNT_JS: &str = "return performance.getEntriesByType('resource').length;";

const CLICK_JS: &str = "arguments[0].scrollIntoView({block: 'center'}); arguments[0].click();";

/// Renderer backed by a WebDriver-controlled headless browser.
#[derive(Debug, Clone)]
pub struct BrowserRenderer {
    webdriver_url: String,
    user_agent: Option<String>,
    fallback: Option<HttpRenderer>,
}

impl BrowserRenderer {
    pub fn new(config: &ScoutConfig) -> Self {
        Self {
            webdriver_url: config.webdriver_url.clone(),
            user_agent: config.user_agent.clone(),
            fallback: config.http_fallback.then(|| HttpRenderer::new(config)),
        }
    }

    /// WebDriver capabilities for one headless session.
    ///
    /// `DomContentLoaded` maps to the `eager` page load strategy; the network
    /// idle conditions load normally and then wait for quiet.
    pub fn capabilities(&self, wait_until: WaitUntil) -> Map<String, Value> {
        let ua = match self.user_agent {
            Some(ref custom) => custom.clone(),
            None => random_user_agent().to_owned(),
        };
        let strategy = match wait_until {
            WaitUntil::DomContentLoaded => "eager",
            WaitUntil::NetworkIdle0 | WaitUntil::NetworkIdle2 => "normal",
        };

        let mut caps = Map::new();
        caps.insert("pageLoadStrategy".into(), json!(strategy));
        caps.insert(
            "goog:chromeOptions".into(),
            json!({
                "args": [
                    "--headless=new",
                    "--no-sandbox",
                    "--disable-setuid-sandbox",
                    "--disable-gpu",
                    "--window-size=1366,900",
                    format!("--user-agent={ua}"),
                ]
            }),
        );
        caps.insert(
            "moz:firefoxOptions".into(),
            json!({
                "args": ["-headless"],
                "prefs": { "general.useragent.override": ua },
            }),
        );
        caps
    }

    async fn connect(&self, wait_until: WaitUntil) -> Result<Client> {
        ClientBuilder::rustls()
            .capabilities(self.capabilities(wait_until))
            .connect(&self.webdriver_url)
            .await
            .map_err(|e| {
                ScoutError::Navigation(format!(
                    "no WebDriver session at {}: {e}",
                    self.webdriver_url
                ))
            })
    }
}

#[async_trait]
impl Renderer for BrowserRenderer {
    async fn open(
        &self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<Box<dyn RenderSession>> {
        tracing::trace!(url, ?wait_until, "browser render");

        let client = match self.connect(wait_until).await {
            Ok(client) => client,
            Err(err) => match self.fallback {
                Some(ref http) => {
                    tracing::warn!(error = %err, "browser unavailable, falling back to HTTP");
                    return http.open(url, wait_until, timeout).await;
                }
                None => return Err(err),
            },
        };

        // Navigation gets 80% of the caller's limit; the rest covers closing
        // the browser on failure.
        let budget = timeout.mul_f64(0.8);
        let navigated = match tokio::time::timeout(budget, navigate(&client, url, wait_until)).await {
            Ok(result) => result,
            Err(_) => Err(ScoutError::Timeout(format!(
                "{url} did not settle within {}ms",
                budget.as_millis()
            ))),
        };

        match navigated {
            Ok(()) => Ok(Box::new(BrowserSession {
                client: Some(client),
                url: url.to_owned(),
            })),
            Err(err) => {
                if let Err(close_err) = client.close().await {
                    tracing::warn!(url, error = %close_err, "discarding browser session failed");
                }
                Err(err)
            }
        }
    }
}

async fn navigate(client: &Client, url: &str, wait_until: WaitUntil) -> Result<()> {
    client
        .goto(url)
        .await
        .map_err(|e| ScoutError::Navigation(format!("{url}: {e}")))?;

    match wait_until {
        WaitUntil::DomContentLoaded => Ok(()),
        WaitUntil::NetworkIdle0 => wait_for_network_idle(client, 0).await,
        WaitUntil::NetworkIdle2 => wait_for_network_idle(client, 2).await,
    }
}

/// Poll the page's resource timeline until at most `max_new` requests start
/// within one [`IDLE_WINDOW`]. The caller bounds the total wait.
async fn wait_for_network_idle(client: &Client, max_new: u64) -> Result<()> {
    let mut seen = resource_count(client).await?;
    loop {
        tokio::time::sleep(IDLE_WINDOW).await;
        let now = resource_count(client).await?;
        if now.saturating_sub(seen) <= max_new {
            return Ok(());
        }
        seen = now;
    }
}

async fn resource_count(client: &Client) -> Result<u64> {
    let value = client
        .execute(RESOURCE_COUNT_JS, vec![])
        .await
        .map_err(|e| ScoutError::Navigation(format!("reading resource timeline: {e}")))?;
    Ok(value.as_u64().unwrap_or(0))
}

struct BrowserSession {
    client: Option<Client>,
    url: String,
}

impl BrowserSession {
    fn client(&self) -> Result<&Client> {
        self.client
            .as_ref()
            .ok_or_else(|| ScoutError::Navigation(format!("session for {} is closed", self.url)))
    }
}

fn command_error(what: &str, err: CmdError) -> ScoutError {
    ScoutError::Extraction(format!("{what}: {err}"))
}

#[async_trait]
impl RenderSession for BrowserSession {
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        match self
            .client()?
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(selector))
            .await
        {
            Ok(_) => Ok(()),
            Err(CmdError::WaitTimeout) => Err(ScoutError::Timeout(format!(
                "`{selector}` did not appear within {}ms",
                timeout.as_millis()
            ))),
            Err(err) => Err(command_error(&format!("waiting for `{selector}`"), err)),
        }
    }

    async fn activate_control(
        &mut self,
        control_selector: &str,
        labels: &[String],
        _timeout: Duration,
    ) -> Result<bool> {
        let client = self.client()?;
        let candidates = client
            .find_all(Locator::Css(control_selector))
            .await
            .map_err(|e| command_error("listing controls", e))?;

        for element in candidates {
            // Elements can go stale while the page re-renders; skip those.
            let Ok(text) = element.text().await else {
                continue;
            };
            if !label_matches(&text, labels) || !element.is_displayed().await.unwrap_or(false) {
                continue;
            }

            if let Err(err) = element.click().await {
                tracing::trace!(url = %self.url, error = %err, "native click refused, using script click");
                let target = serde_json::to_value(&element)
                    .map_err(|e| ScoutError::Extraction(format!("control handle: {e}")))?;
                client
                    .execute(CLICK_JS, vec![target])
                    .await
                    .map_err(|e| command_error("clicking control", e))?;
            }
            tracing::trace!(url = %self.url, label = %text.trim(), "control activated");
            return Ok(true);
        }

        Ok(false)
    }

    async fn content(&mut self) -> Result<String> {
        self.client()?
            .source()
            .await
            .map_err(|e| command_error("reading page source", e))
    }

    async fn close(&mut self) -> Result<()> {
        match self.client.take() {
            Some(client) => client
                .close()
                .await
                .map_err(|e| ScoutError::Navigation(format!("closing browser session: {e}"))),
            None => Ok(()),
        }
    }
}
