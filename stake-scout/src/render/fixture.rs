//! In-memory renderer serving fixture HTML. No browser, no network.
//!
//! Each URL maps to one or more *stages*: stage 0 is what navigation shows,
//! and every successful "load more" activation advances to the next stage.
//! Counters expose how many sessions were opened and closed so tests can
//! assert that nothing leaked and that no source ran. A [`SessionFault`]
//! makes one URL's sessions misbehave.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::document::Document;
use super::{RenderSession, Renderer, WaitUntil};
use crate::error::{Result, ScoutError};

/// Misbehaviour injected into every session opened for a URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionFault {
    /// `activate_control` never completes.
    HangOnControl,
    /// `content` panics.
    PanicOnSnapshot,
    /// `close` is counted, then never completes.
    HangOnClose,
}

/// Fake [`Renderer`] backed by static HTML per URL.
#[derive(Debug, Default)]
pub struct StaticRenderer {
    pages: HashMap<String, Vec<String>>,
    failures: HashMap<String, ScoutError>,
    delays: HashMap<String, Duration>,
    faults: HashMap<String, SessionFault>,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
}

impl StaticRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` for `url`.
    pub fn with_page(self, url: &str, html: impl Into<String>) -> Self {
        self.with_stages(url, vec![html.into()])
    }

    /// Serve successive `stages` for `url`, advanced by control activation.
    pub fn with_stages(mut self, url: &str, stages: Vec<String>) -> Self {
        self.pages.insert(url.to_owned(), stages);
        self
    }

    /// Fail navigation to `url` with `error`.
    pub fn with_failure(mut self, url: &str, error: ScoutError) -> Self {
        self.failures.insert(url.to_owned(), error);
        self
    }

    /// Delay navigation to `url`. A delay past the caller's timeout fails
    /// with [`ScoutError::Timeout`].
    pub fn with_delay(mut self, url: &str, delay: Duration) -> Self {
        self.delays.insert(url.to_owned(), delay);
        self
    }

    /// Make sessions for `url` misbehave as `fault` describes.
    pub fn with_fault(mut self, url: &str, fault: SessionFault) -> Self {
        self.faults.insert(url.to_owned(), fault);
        self
    }

    /// Number of sessions handed out.
    pub fn sessions_opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of sessions closed.
    pub fn sessions_closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for StaticRenderer {
    async fn open(
        &self,
        url: &str,
        _wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<Box<dyn RenderSession>> {
        if let Some(delay) = self.delays.get(url).copied() {
            if delay > timeout {
                tokio::time::sleep(timeout).await;
                return Err(ScoutError::Timeout(format!(
                    "{url} did not load within {}ms",
                    timeout.as_millis()
                )));
            }
            tokio::time::sleep(delay).await;
        }

        if let Some(err) = self.failures.get(url) {
            return Err(err.clone());
        }

        let stages = self
            .pages
            .get(url)
            .cloned()
            .ok_or_else(|| ScoutError::Navigation(format!("no fixture for {url}")))?;

        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StaticSession {
            stages,
            current: 0,
            fault: self.faults.get(url).copied(),
            closed: Arc::clone(&self.closed),
        }))
    }
}

struct StaticSession {
    stages: Vec<String>,
    current: usize,
    fault: Option<SessionFault>,
    closed: Arc<AtomicUsize>,
}

impl StaticSession {
    fn html(&self) -> &str {
        self.stages.get(self.current).map_or("", String::as_str)
    }
}

fn has_match(html: &str, selector: &str) -> Result<bool> {
    Document::parse(html).contains(selector)
}

fn has_control(html: &str, selector: &str, labels: &[String]) -> Result<bool> {
    Ok(Document::parse(html).find_control(selector, labels)?.is_some())
}

#[async_trait]
impl RenderSession for StaticSession {
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> Result<()> {
        if has_match(self.html(), selector)? {
            return Ok(());
        }
        tokio::time::sleep(timeout).await;
        Err(ScoutError::Timeout(format!(
            "`{selector}` did not appear within {}ms",
            timeout.as_millis()
        )))
    }

    async fn activate_control(
        &mut self,
        control_selector: &str,
        labels: &[String],
        _timeout: Duration,
    ) -> Result<bool> {
        if self.fault == Some(SessionFault::HangOnControl) {
            return std::future::pending().await;
        }
        if self.current + 1 >= self.stages.len() {
            return Ok(false);
        }
        if !has_control(self.html(), control_selector, labels)? {
            return Ok(false);
        }
        self.current += 1;
        Ok(true)
    }

    async fn content(&mut self) -> Result<String> {
        if self.fault == Some(SessionFault::PanicOnSnapshot) {
            panic!("snapshot of {} stages failed", self.stages.len());
        }
        Ok(self.html().to_owned())
    }

    async fn close(&mut self) -> Result<()> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        if self.fault == Some(SessionFault::HangOnClose) {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}
