//! Aggregator: concurrent fan-out to every source, then ranking.
//!
//! Every source runs on its own task and is awaited to completion; there is
//! no global deadline, so latency is that of the slowest source, each of
//! which bounds its own waits. A source that panics is contained by its task
//! and reported as an adapter error. The result always has one entry per
//! configured source.

pub mod ranking;

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use futures::future::join_all;

use crate::config::ScoutConfig;
use crate::error::{Result, ScoutError};
use crate::render::Renderer;
use crate::sources::{QuoteSource, SourceAdapter};
use crate::types::{AggregateResult, Quote, QuoteStatus, SearchTerm};

/// Fans one query out to a fixed set of sources.
///
/// Holds no per-query state; every call re-runs every source.
pub struct Aggregator {
    sources: Vec<Arc<dyn QuoteSource>>,
}

impl Aggregator {
    /// Build one [`SourceAdapter`] per configured descriptor, all sharing
    /// `renderer` for session creation.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::Config`] if `config` fails validation.
    pub fn new(config: &ScoutConfig, renderer: Arc<dyn Renderer>) -> Result<Self> {
        config.validate()?;
        let sources = config
            .sources
            .iter()
            .map(|descriptor| {
                Arc::new(SourceAdapter::new(descriptor.clone(), Arc::clone(&renderer)))
                    as Arc<dyn QuoteSource>
            })
            .collect();
        Ok(Self { sources })
    }

    /// Aggregate over arbitrary sources.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::Config`] if `sources` is empty or two sources
    /// share a name.
    pub fn from_sources(sources: Vec<Arc<dyn QuoteSource>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(ScoutError::Config(
                "at least one source must be configured".into(),
            ));
        }
        let mut seen = HashSet::new();
        for source in &sources {
            if !seen.insert(source.name().to_owned()) {
                return Err(ScoutError::Config(format!(
                    "duplicate source name: {}",
                    source.name()
                )));
            }
        }
        Ok(Self { sources })
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }

    /// Query every source for `term` and assemble the aggregate.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidInput`] if `term` is empty after trimming.
    /// No source is called in that case. With a valid term this never fails.
    pub async fn fetch_all(&self, term: &str) -> Result<AggregateResult> {
        let term = SearchTerm::parse(term)?;
        Ok(self.fetch_term(&term).await)
    }

    /// Query every source for an already validated term.
    pub async fn fetch_term(&self, term: &SearchTerm) -> AggregateResult {
        tracing::trace!(term = %term, sources = self.sources.len(), "fan-out");

        let tasks = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let term = term.clone();
            tokio::spawn(async move { source.quote(&term).await })
        });

        let outcomes = join_all(tasks).await;

        let mut quotes_by_source = BTreeMap::new();
        for (source, outcome) in self.sources.iter().zip(outcomes) {
            let quote = match outcome {
                Ok(quote) => quote,
                Err(err) => {
                    tracing::warn!(source = source.name(), error = %err, "source task failed");
                    Quote::adapter_error(
                        source.name(),
                        source.url(),
                        format!("source task panicked: {err}"),
                    )
                }
            };
            tracing::debug!(source = source.name(), status = %quote.status(), "source settled");
            quotes_by_source.insert(source.name().to_owned(), quote);
        }

        let best = ranking::best_quote(quotes_by_source.values()).cloned();
        let summary = ranking::summarize(&quotes_by_source);

        let found = quotes_by_source
            .values()
            .filter(|q| q.status() == QuoteStatus::Found)
            .count();
        tracing::debug!(found, total = quotes_by_source.len(), "aggregation complete");

        AggregateResult::new(term, quotes_by_source, best, summary)
    }
}
