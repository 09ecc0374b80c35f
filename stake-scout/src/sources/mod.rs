//! Quote sources: the uniform interface, the descriptor-driven adapter, and
//! the built-in source descriptors.

pub mod adapter;
pub mod builtin;
pub mod descriptor;

use async_trait::async_trait;

use crate::types::{Quote, SearchTerm};

pub use adapter::SourceAdapter;
pub use descriptor::{CellRequirement, FieldLocator, Pagination, SourceDescriptor};

/// One external source that can answer a price query.
///
/// [`QuoteSource::quote`] never fails: every problem is reported through the
/// returned [`Quote`]'s status and diagnostic. Input validation happens
/// before a source is called, which is why it takes a [`SearchTerm`].
#[async_trait]
pub trait QuoteSource: Send + Sync {
    /// Unique source identifier.
    fn name(&self) -> &str;

    /// Canonical URL of the source page.
    fn url(&self) -> &str;

    /// Look up `term` at this source.
    async fn quote(&self, term: &SearchTerm) -> Quote;
}
