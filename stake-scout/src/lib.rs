//! # stake-scout
//!
//! Price lookup for unlisted securities across several public quote pages.
//!
//! Each source is a page listing many securities with their last traded
//! price. The crate loads every configured page concurrently, finds the first
//! row whose name contains the search term, normalises its price, and picks
//! the cheapest answer.
//!
//! ## Design
//!
//! - Sources are data: a [`SourceDescriptor`] names the selectors, waits and
//!   pagination control of one page, and one generic [`SourceAdapter`] drives
//!   them all
//! - Pages are loaded through a [`Renderer`], so a headless browser, plain
//!   HTTP, or test fixtures can sit behind the same adapter
//! - Every source answers with a [`Quote`]; failures are statuses, never errors
//! - Prices are exact decimals, never floats
//!
//! ## Security
//!
//! - No API keys or secrets
//! - No network listeners; this is a library
//! - Search terms are logged only at trace level

pub mod aggregator;
pub mod config;
pub mod error;
pub mod price;
pub mod render;
pub mod sources;
pub mod types;

pub use aggregator::Aggregator;
pub use config::ScoutConfig;
pub use error::{Result, ScoutError};
#[cfg(any(test, feature = "test-util"))]
pub use render::{SessionFault, StaticRenderer};
pub use render::{BrowserRenderer, HttpRenderer, RenderSession, Renderer, RendererKind, WaitUntil};
pub use sources::{QuoteSource, SourceAdapter, SourceDescriptor};
pub use types::{AggregateResult, Quote, QuoteStatus, SearchTerm};

/// Look up `term` at every source in `config`, rendering pages with the
/// renderer `config` selects.
///
/// # Errors
///
/// Returns [`ScoutError::Config`] if `config` is invalid, or
/// [`ScoutError::InvalidInput`] if `term` is empty after trimming. Source
/// failures are reported per source inside the result.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> stake_scout::Result<()> {
/// let config = stake_scout::ScoutConfig::default();
/// let result = stake_scout::fetch_all("NSE India", &config).await?;
/// println!("{}", result.summary());
/// if let Some(best) = result.best_quote() {
///     println!("{}: {:?}", best.source_name(), best.numeric_price());
/// }
/// # Ok(())
/// # }
/// ```
pub async fn fetch_all(term: &str, config: &ScoutConfig) -> Result<AggregateResult> {
    Aggregator::new(config, render::from_config(config))?.fetch_all(term).await
}
