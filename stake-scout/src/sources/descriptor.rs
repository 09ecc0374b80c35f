//! Declarative extraction contracts, one per source.
//!
//! A [`SourceDescriptor`] says where a source lives, how long to wait for it,
//! which container holds its rows, and where the name, price, link and
//! change fields sit inside a row. Adding a source means adding a descriptor.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Result, ScoutError};
use crate::render::document::compile;
use crate::render::{Node, WaitUntil};

/// Upper bound for any configured wait.
pub const MAX_TIMEOUT_SECS: u64 = 120;

/// Locates one field inside a row.
///
/// Takes the `nth` (0-based) element matching `selector` within the row and,
/// when `within` is set, the first element matching `within` inside that.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLocator {
    pub selector: String,
    #[serde(default)]
    pub nth: usize,
    #[serde(default)]
    pub within: Option<String>,
}

impl FieldLocator {
    pub fn new(selector: &str, nth: usize) -> Self {
        Self {
            selector: selector.to_owned(),
            nth,
            within: None,
        }
    }

    /// Narrow the located element to its first descendant matching `selector`.
    pub fn within(mut self, selector: &str) -> Self {
        self.within = Some(selector.to_owned());
        self
    }

    /// The located element, if the row has one.
    pub fn locate<'a>(&self, row: &Node<'a>) -> Result<Option<Node<'a>>> {
        let Some(outer) = row.find(&self.selector)?.into_iter().nth(self.nth) else {
            return Ok(None);
        };
        match self.within {
            Some(ref inner) => Ok(outer.find(inner)?.into_iter().next()),
            None => Ok(Some(outer)),
        }
    }

    /// Collapsed text of the located element.
    pub fn text_in(&self, row: &Node<'_>) -> Result<Option<String>> {
        Ok(self.locate(row)?.map(|node| node.text()))
    }

    fn validate(&self, field: &str, source: &str) -> Result<()> {
        check_selector(&self.selector, field, source)?;
        if let Some(ref inner) = self.within {
            check_selector(inner, field, source)?;
        }
        Ok(())
    }
}

/// Rows with fewer than `min_count` elements matching `selector` are skipped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRequirement {
    pub selector: String,
    pub min_count: usize,
}

/// Repeated "load more" activation before rows are read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// Candidate controls; the first whose text contains a label is activated.
    pub control_selector: String,
    pub labels: Vec<String>,
    /// Pause after each activation.
    pub settle_ms: u64,
    pub max_iterations: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            control_selector: r#"button, a, div[role="button"]"#.to_owned(),
            labels: vec!["view more".into(), "load more".into(), "show more".into()],
            settle_ms: 1200,
            max_iterations: 25,
        }
    }
}

impl Pagination {
    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

fn default_navigation_timeout_secs() -> u64 {
    60
}

fn default_container_timeout_secs() -> u64 {
    30
}

/// Everything needed to query one external source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    /// Unique source identifier, used as the key in aggregate results.
    pub name: String,
    /// Canonical page listing the source's quotes.
    pub url: String,
    #[serde(default)]
    pub wait_until: WaitUntil,
    #[serde(default = "default_navigation_timeout_secs")]
    pub navigation_timeout_secs: u64,
    /// Selector whose appearance means rows are ready.
    pub container_selector: String,
    #[serde(default = "default_container_timeout_secs")]
    pub container_timeout_secs: u64,
    /// Selector enumerating rows (or cards), evaluated on the whole document.
    pub row_selector: String,
    #[serde(default)]
    pub required_cells: Option<CellRequirement>,
    pub name_field: FieldLocator,
    pub price_field: FieldLocator,
    /// Element whose `href` deep-links to the entity.
    #[serde(default)]
    pub link_field: Option<FieldLocator>,
    #[serde(default)]
    pub change_field: Option<FieldLocator>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

impl SourceDescriptor {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_secs(self.navigation_timeout_secs)
    }

    pub fn container_timeout(&self) -> Duration {
        Duration::from_secs(self.container_timeout_secs)
    }

    /// Resolve a row link against the source page URL.
    pub fn resolve_link(&self, href: &str) -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
            return None;
        }
        Url::parse(&self.url)
            .and_then(|base| base.join(href))
            .ok()
            .map(String::from)
    }

    /// Validate this descriptor.
    ///
    /// Checks:
    /// - `name` is non-empty
    /// - `url` is an absolute http(s) URL
    /// - both timeouts are within `1..=MAX_TIMEOUT_SECS`
    /// - every selector compiles
    /// - pagination, if present, has labels and at least one iteration
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ScoutError::Config("source name must not be empty".into()));
        }
        let name = self.name.as_str();

        match Url::parse(&self.url) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            _ => {
                return Err(ScoutError::Config(format!(
                    "{name}: url must be an absolute http(s) URL"
                )));
            }
        }

        check_timeout(self.navigation_timeout_secs, "navigation_timeout_secs", name)?;
        check_timeout(self.container_timeout_secs, "container_timeout_secs", name)?;

        check_selector(&self.container_selector, "container_selector", name)?;
        check_selector(&self.row_selector, "row_selector", name)?;
        if let Some(ref cells) = self.required_cells {
            check_selector(&cells.selector, "required_cells", name)?;
        }
        self.name_field.validate("name_field", name)?;
        self.price_field.validate("price_field", name)?;
        if let Some(ref link) = self.link_field {
            link.validate("link_field", name)?;
        }
        if let Some(ref change) = self.change_field {
            change.validate("change_field", name)?;
        }

        if let Some(ref pagination) = self.pagination {
            check_selector(&pagination.control_selector, "pagination.control_selector", name)?;
            if pagination.max_iterations == 0 {
                return Err(ScoutError::Config(format!(
                    "{name}: pagination.max_iterations must be greater than 0"
                )));
            }
            if pagination.labels.iter().all(|l| l.trim().is_empty()) {
                return Err(ScoutError::Config(format!(
                    "{name}: pagination.labels must not be empty"
                )));
            }
        }
        Ok(())
    }
}

fn check_timeout(secs: u64, field: &str, source: &str) -> Result<()> {
    if secs == 0 || secs > MAX_TIMEOUT_SECS {
        return Err(ScoutError::Config(format!(
            "{source}: {field} must be between 1 and {MAX_TIMEOUT_SECS}"
        )));
    }
    Ok(())
}

fn check_selector(selector: &str, field: &str, source: &str) -> Result<()> {
    if selector.trim().is_empty() {
        return Err(ScoutError::Config(format!("{source}: {field} must not be empty")));
    }
    compile(selector)
        .map(|_| ())
        .map_err(|e| ScoutError::Config(format!("{source}: {field}: {e}")))
}
