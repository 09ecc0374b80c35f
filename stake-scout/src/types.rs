//! Core types: validated search terms, per-source quotes, and the aggregate.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};

use crate::error::{Result, ScoutError};
use crate::price;

/// A validated, non-empty search term.
///
/// Keeps the caller's text verbatim for echoing back, plus a case-folded,
/// whitespace-collapsed needle used for substring matching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerm {
    verbatim: String,
    needle: String,
}

impl SearchTerm {
    /// Validate raw input into a search term.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidInput`] if `raw` is empty after trimming.
    pub fn parse(raw: &str) -> Result<Self> {
        let needle = fold(raw);
        if needle.is_empty() {
            return Err(ScoutError::InvalidInput("search term is empty".into()));
        }
        Ok(Self {
            verbatim: raw.to_owned(),
            needle,
        })
    }

    /// The term exactly as the caller supplied it.
    pub fn as_str(&self) -> &str {
        &self.verbatim
    }

    /// The folded form used for matching.
    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// Case-insensitive substring match of this term against a source label.
    pub fn matches(&self, label: &str) -> bool {
        fold(label).contains(&self.needle)
    }
}

impl fmt::Display for SearchTerm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.verbatim)
    }
}

/// Lowercase and collapse every whitespace run (including NBSP) to one space.
fn fold(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Outcome of one source for one query.
///
/// Serializes as its [`wire_token`](Self::wire_token), so adapter errors are
/// indistinguishable from misses on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteStatus {
    /// A row matched and its price normalised successfully.
    Found,
    /// The page was searchable but no row matched the term.
    NotFound,
    /// The source could not be searched, or a matched row had an unusable price.
    AdapterError,
}

impl QuoteStatus {
    /// Token exposed to consumers. Adapter errors collapse to `NOT_FOUND`.
    pub fn wire_token(&self) -> &'static str {
        match self {
            Self::Found => "FOUND",
            Self::NotFound | Self::AdapterError => "NOT_FOUND",
        }
    }

    /// Short label used in the aggregate summary.
    pub fn summary_label(&self) -> &'static str {
        match self {
            Self::Found => "Found",
            Self::NotFound | Self::AdapterError => "Missing",
        }
    }
}

impl Serialize for QuoteStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.wire_token())
    }
}

impl fmt::Display for QuoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Found => "Found",
            Self::NotFound => "NotFound",
            Self::AdapterError => "AdapterError",
        };
        f.write_str(name)
    }
}

/// Raw fields extracted from the first matching row of a source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowMatch {
    /// Label of the matched entity as shown by the source.
    pub matched_name: String,
    /// Untouched price text.
    pub raw_price_text: String,
    /// Absolute deep link to the entity, when the row has one.
    pub detail_url: Option<String>,
    /// Price change text, for sources that show it.
    pub price_change: Option<String>,
}

/// One source's answer for one query. Immutable once built.
///
/// `numeric_price` is `Some` exactly when `status` is [`QuoteStatus::Found`].
/// The constructors are the only way to build a quote, which keeps that
/// invariant intact.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Quote {
    source_name: String,
    matched_name: Option<String>,
    raw_price_text: Option<String>,
    numeric_price: Option<Decimal>,
    source_url: String,
    detail_url: Option<String>,
    price_change: Option<String>,
    status: QuoteStatus,
    #[serde(skip)]
    diagnostic: Option<String>,
}

impl Quote {
    /// Build a quote from a matched row, normalising its price.
    ///
    /// An unparseable or negative price demotes the quote to
    /// [`QuoteStatus::AdapterError`]; the row fields are kept for diagnosis.
    pub fn from_match(source_name: &str, source_url: &str, row: RowMatch) -> Self {
        let (numeric_price, status, diagnostic) = match price::normalize(&row.raw_price_text) {
            Ok(value) if value.is_sign_negative() && !value.is_zero() => (
                None,
                QuoteStatus::AdapterError,
                Some(format!(
                    "matched {:?} but price {:?} is negative",
                    row.matched_name, row.raw_price_text
                )),
            ),
            Ok(value) => (Some(value), QuoteStatus::Found, None),
            Err(err) => (
                None,
                QuoteStatus::AdapterError,
                Some(format!("matched {:?} but {err}", row.matched_name)),
            ),
        };

        Self {
            source_name: source_name.to_owned(),
            matched_name: Some(row.matched_name),
            raw_price_text: Some(row.raw_price_text),
            numeric_price,
            source_url: source_url.to_owned(),
            detail_url: row.detail_url,
            price_change: row.price_change,
            status,
            diagnostic,
        }
    }

    /// The source was searched and holds no matching entity.
    pub fn not_found(source_name: &str, source_url: &str) -> Self {
        Self::bare(source_name, source_url, QuoteStatus::NotFound, None)
    }

    /// The source could not be searched.
    pub fn adapter_error(source_name: &str, source_url: &str, diagnostic: impl Into<String>) -> Self {
        Self::bare(
            source_name,
            source_url,
            QuoteStatus::AdapterError,
            Some(diagnostic.into()),
        )
    }

    fn bare(
        source_name: &str,
        source_url: &str,
        status: QuoteStatus,
        diagnostic: Option<String>,
    ) -> Self {
        Self {
            source_name: source_name.to_owned(),
            matched_name: None,
            raw_price_text: None,
            numeric_price: None,
            source_url: source_url.to_owned(),
            detail_url: None,
            price_change: None,
            status,
            diagnostic,
        }
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    pub fn matched_name(&self) -> Option<&str> {
        self.matched_name.as_deref()
    }

    pub fn raw_price_text(&self) -> Option<&str> {
        self.raw_price_text.as_deref()
    }

    pub fn numeric_price(&self) -> Option<Decimal> {
        self.numeric_price
    }

    /// Canonical URL of the source page.
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    pub fn detail_url(&self) -> Option<&str> {
        self.detail_url.as_deref()
    }

    pub fn price_change(&self) -> Option<&str> {
        self.price_change.as_deref()
    }

    pub fn status(&self) -> QuoteStatus {
        self.status
    }

    /// Internal failure detail. Not meant for end consumers.
    pub fn diagnostic(&self) -> Option<&str> {
        self.diagnostic.as_deref()
    }

    pub fn is_found(&self) -> bool {
        self.status == QuoteStatus::Found
    }
}

/// The combined answer across all configured sources for one query.
///
/// Built fresh per query; `best_quote` and `summary` are derived from
/// `quotes_by_source` at construction.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateResult {
    query: String,
    timestamp: DateTime<Utc>,
    quotes_by_source: BTreeMap<String, Quote>,
    best_quote: Option<Quote>,
    summary: String,
}

impl AggregateResult {
    pub(crate) fn new(
        query: &SearchTerm,
        quotes_by_source: BTreeMap<String, Quote>,
        best_quote: Option<Quote>,
        summary: String,
    ) -> Self {
        Self {
            query: query.as_str().to_owned(),
            timestamp: Utc::now(),
            quotes_by_source,
            best_quote,
            summary,
        }
    }

    /// The search term, verbatim.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// One entry per configured source, keyed by source name.
    pub fn quotes_by_source(&self) -> &BTreeMap<String, Quote> {
        &self.quotes_by_source
    }

    /// The cheapest found quote, ties broken by smallest source name.
    pub fn best_quote(&self) -> Option<&Quote> {
        self.best_quote.as_ref()
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    /// Number of sources that returned [`QuoteStatus::Found`].
    pub fn found_count(&self) -> usize {
        self.quotes_by_source.values().filter(|q| q.is_found()).count()
    }
}
