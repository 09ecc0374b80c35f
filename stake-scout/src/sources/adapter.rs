//! Descriptor-driven source adapter.
//!
//! # Pipeline
//!
//! 1. Validate the term (before any rendering)
//! 2. Open a render session bounded by the navigation timeout
//! 3. Wait for the row container, bounded by the container timeout
//! 4. Optionally activate "load more" until it disappears or the iteration cap is hit
//! 5. Snapshot the page and scan rows in document order; first substring match wins
//! 6. Close the session, whatever happened in steps 3-5, bounded by the
//!    container timeout
//!
//! Every failure after step 1 becomes an [`QuoteStatus::AdapterError`] quote.
//! A missing container is an error, never a not-found.
//!
//! [`QuoteStatus::AdapterError`]: crate::types::QuoteStatus::AdapterError

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;

use super::descriptor::{Pagination, SourceDescriptor};
use super::QuoteSource;
use crate::error::{Result, ScoutError};
use crate::render::{Document, RenderSession, Renderer};
use crate::types::{Quote, RowMatch, SearchTerm};

/// A [`QuoteSource`] that scrapes one page described by a [`SourceDescriptor`].
pub struct SourceAdapter {
    descriptor: SourceDescriptor,
    renderer: Arc<dyn Renderer>,
}

impl SourceAdapter {
    pub fn new(descriptor: SourceDescriptor, renderer: Arc<dyn Renderer>) -> Self {
        Self {
            descriptor,
            renderer,
        }
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    /// Validate `term` and look it up at this source.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidInput`] for an empty term, without opening
    /// a render session. All other failures are reported inside the quote.
    pub async fn fetch_quote(&self, term: &str) -> Result<Quote> {
        let term = SearchTerm::parse(term)?;
        Ok(self.quote(&term).await)
    }

    async fn search(&self, term: &SearchTerm) -> Quote {
        let d = &self.descriptor;
        tracing::trace!(source = %d.name, term = %term, "source search");

        let opened = bounded(
            d.navigation_timeout(),
            "navigation",
            self.renderer
                .open(&d.url, d.wait_until, d.navigation_timeout()),
        )
        .await;

        let mut session = match opened {
            Ok(session) => session,
            Err(err) => return self.failed(&err.to_string()),
        };

        let outcome = AssertUnwindSafe(self.drive(session.as_mut(), term))
            .catch_unwind()
            .await;

        if let Err(err) = bounded(d.container_timeout(), "session close", session.close()).await {
            tracing::warn!(source = %d.name, error = %err, "render session close failed");
        }

        match outcome {
            Ok(Ok(Some(row))) => {
                let quote = Quote::from_match(&d.name, &d.url, row);
                if let Some(diagnostic) = quote.diagnostic() {
                    tracing::warn!(source = %d.name, diagnostic, "matched row rejected");
                }
                quote
            }
            Ok(Ok(None)) => Quote::not_found(&d.name, &d.url),
            Ok(Err(err)) => self.failed(&err.to_string()),
            Err(_) => self.failed("extraction panicked"),
        }
    }

    async fn drive(&self, session: &mut dyn RenderSession, term: &SearchTerm) -> Result<Option<RowMatch>> {
        let d = &self.descriptor;
        let wait = d.container_timeout();

        bounded(
            wait,
            "container wait",
            session.wait_for_selector(&d.container_selector, wait),
        )
        .await
        .map_err(|e| ScoutError::ContainerNotFound(format!("`{}` ({e})", d.container_selector)))?;

        if let Some(ref pagination) = d.pagination {
            self.paginate(session, pagination, wait).await?;
        }

        let html = bounded(wait, "snapshot", session.content()).await?;
        extract_first_match(d, &html, term)
    }

    async fn paginate(
        &self,
        session: &mut dyn RenderSession,
        pagination: &Pagination,
        limit: Duration,
    ) -> Result<()> {
        for iteration in 0..pagination.max_iterations {
            let activated = bounded(
                limit,
                "load-more activation",
                session.activate_control(&pagination.control_selector, &pagination.labels, limit),
            )
            .await?;
            if !activated {
                tracing::debug!(source = %self.descriptor.name, iteration, "no more pages");
                return Ok(());
            }
            tokio::time::sleep(pagination.settle()).await;
        }
        tracing::debug!(
            source = %self.descriptor.name,
            max = pagination.max_iterations,
            "pagination cap reached"
        );
        Ok(())
    }

    fn failed(&self, diagnostic: &str) -> Quote {
        tracing::warn!(source = %self.descriptor.name, diagnostic, "source failed");
        Quote::adapter_error(&self.descriptor.name, &self.descriptor.url, diagnostic)
    }
}

#[async_trait]
impl QuoteSource for SourceAdapter {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn url(&self) -> &str {
        &self.descriptor.url
    }

    async fn quote(&self, term: &SearchTerm) -> Quote {
        self.search(term).await
    }
}

/// Await `fut`, turning an elapsed `limit` into [`ScoutError::Timeout`].
pub async fn bounded<T>(
    limit: Duration,
    what: &str,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(ScoutError::Timeout(format!(
            "{what} exceeded {}ms",
            limit.as_millis()
        ))),
    }
}

/// Scan the rows of a rendered page and return the first row whose name
/// contains `term`.
///
/// Rows failing the descriptor's cell requirement, and rows with an empty
/// name, are skipped. A matched row with no price cell still matches; its
/// empty price text is rejected later by [`Quote::from_match`].
pub fn extract_first_match(
    descriptor: &SourceDescriptor,
    html: &str,
    term: &SearchTerm,
) -> Result<Option<RowMatch>> {
    let document = Document::parse(html);
    let rows = document.find(&descriptor.row_selector)?;
    tracing::trace!(source = %descriptor.name, rows = rows.len(), "rows found");

    for row in rows {
        if let Some(ref cells) = descriptor.required_cells {
            if row.find(&cells.selector)?.len() < cells.min_count {
                continue;
            }
        }

        let Some(label) = descriptor.name_field.text_in(&row)? else {
            continue;
        };
        if label.is_empty() || !term.matches(&label) {
            continue;
        }

        let raw_price_text = descriptor.price_field.text_in(&row)?.unwrap_or_default();

        let detail_url = match descriptor.link_field {
            Some(ref field) => field
                .locate(&row)?
                .and_then(|node| node.attribute("href"))
                .and_then(|href| descriptor.resolve_link(href)),
            None => None,
        };

        let price_change = match descriptor.change_field {
            Some(ref field) => field.text_in(&row)?.filter(|text| !text.is_empty()),
            None => None,
        };

        return Ok(Some(RowMatch {
            matched_name: label,
            raw_price_text,
            detail_url,
            price_change,
        }));
    }

    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{SessionFault, StaticRenderer};
    use crate::sources::builtin;
    use crate::types::QuoteStatus;
    use rust_decimal::Decimal;

    const WWIPL_PAGE: &str = r#"<html><body>
<table id="portfoliolist"><tbody>
  <tr><td colspan="7">Header row</td></tr>
  <tr><td>1</td><td>img</td><td><a href="/share/hdb">HDB Financial Services</a></td><td>x</td><td>x</td><td>x</td><td>1,120.00</td></tr>
  <tr><td>2</td><td>img</td><td><a href="/share/nse">NSE India Limited</a></td><td>x</td><td>x</td><td>x</td><td>1,860</td></tr>
  <tr><td>3</td><td>img</td><td><a href="/share/nse-old">NSE India (old)</a></td><td>x</td><td>x</td><td>x</td><td>999</td></tr>
</tbody></table>
</body></html>"#;

    fn term(raw: &str) -> SearchTerm {
        SearchTerm::parse(raw).unwrap()
    }

    fn fast(mut d: SourceDescriptor) -> SourceDescriptor {
        d.navigation_timeout_secs = 1;
        d.container_timeout_secs = 1;
        if let Some(ref mut p) = d.pagination {
            p.settle_ms = 0;
        }
        d
    }

    fn adapter(d: SourceDescriptor, renderer: &Arc<StaticRenderer>) -> SourceAdapter {
        let renderer: Arc<dyn Renderer> = renderer.clone();
        SourceAdapter::new(fast(d), renderer)
    }

    #[test]
    fn first_match_in_document_order_wins() {
        let row = extract_first_match(&builtin::wwipl(), WWIPL_PAGE, &term("nse india"))
            .unwrap()
            .expect("should match");
        assert_eq!(row.matched_name, "NSE India Limited");
        assert_eq!(row.raw_price_text, "1,860");
        assert_eq!(row.detail_url.as_deref(), Some("https://wwipl.com/share/nse"));
    }

    #[test]
    fn rows_with_too_few_cells_are_skipped() {
        let row = extract_first_match(&builtin::wwipl(), WWIPL_PAGE, &term("header"))
            .unwrap();
        assert!(row.is_none());
    }

    #[test]
    fn no_matching_row_is_none() {
        let row = extract_first_match(&builtin::wwipl(), WWIPL_PAGE, &term("Reliance Retail"))
            .unwrap();
        assert!(row.is_none());
    }

    #[tokio::test]
    async fn found_quote_carries_normalised_price() {
        let renderer = Arc::new(StaticRenderer::new().with_page(builtin::WWIPL_URL, WWIPL_PAGE));
        let quote = adapter(builtin::wwipl(), &renderer)
            .fetch_quote("NSE")
            .await
            .unwrap();

        assert_eq!(quote.status(), QuoteStatus::Found);
        assert_eq!(quote.numeric_price(), Some(Decimal::from(1860)));
        assert_eq!(quote.source_name(), "wwipl");
        assert_eq!(quote.source_url(), builtin::WWIPL_URL);
        assert_eq!(renderer.sessions_opened(), 1);
        assert_eq!(renderer.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn absent_entity_is_not_found() {
        let renderer = Arc::new(StaticRenderer::new().with_page(builtin::WWIPL_URL, WWIPL_PAGE));
        let quote = adapter(builtin::wwipl(), &renderer)
            .fetch_quote("Tata Capital")
            .await
            .unwrap();
        assert_eq!(quote.status(), QuoteStatus::NotFound);
        assert_eq!(renderer.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn empty_term_fails_before_rendering() {
        let renderer = Arc::new(StaticRenderer::new().with_page(builtin::WWIPL_URL, WWIPL_PAGE));
        let a = adapter(builtin::wwipl(), &renderer);
        assert!(matches!(a.fetch_quote("").await, Err(ScoutError::InvalidInput(_))));
        assert!(matches!(a.fetch_quote("  \t").await, Err(ScoutError::InvalidInput(_))));
        assert_eq!(renderer.sessions_opened(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_container_is_error_not_not_found() {
        let renderer = Arc::new(
            StaticRenderer::new().with_page(builtin::WWIPL_URL, "<html><body>maintenance</body></html>"),
        );
        let quote = adapter(builtin::wwipl(), &renderer)
            .fetch_quote("NSE")
            .await
            .unwrap();
        assert_eq!(quote.status(), QuoteStatus::AdapterError);
        assert!(quote.diagnostic().unwrap().contains("container not found"));
        assert_eq!(renderer.sessions_opened(), 1);
        assert_eq!(renderer.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn navigation_failure_is_error_and_opens_nothing() {
        let renderer = Arc::new(
            StaticRenderer::new()
                .with_failure(builtin::WWIPL_URL, ScoutError::Navigation("DNS failure".into())),
        );
        let quote = adapter(builtin::wwipl(), &renderer)
            .fetch_quote("NSE")
            .await
            .unwrap();
        assert_eq!(quote.status(), QuoteStatus::AdapterError);
        assert!(quote.diagnostic().unwrap().contains("DNS failure"));
        assert_eq!(renderer.sessions_opened(), 0);
        assert_eq!(renderer.sessions_closed(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_navigation_is_timeout_error() {
        let renderer = Arc::new(
            StaticRenderer::new()
                .with_page(builtin::WWIPL_URL, WWIPL_PAGE)
                .with_delay(builtin::WWIPL_URL, Duration::from_secs(5)),
        );
        let quote = adapter(builtin::wwipl(), &renderer)
            .fetch_quote("NSE")
            .await
            .unwrap();
        assert_eq!(quote.status(), QuoteStatus::AdapterError);
        assert!(quote.diagnostic().unwrap().contains("timed out"));
    }

    #[tokio::test]
    async fn unparseable_price_on_match_is_demoted() {
        let page = WWIPL_PAGE.replace("1,860", "Call us");
        let renderer = Arc::new(StaticRenderer::new().with_page(builtin::WWIPL_URL, page));
        let quote = adapter(builtin::wwipl(), &renderer)
            .fetch_quote("NSE India Limited")
            .await
            .unwrap();
        assert_eq!(quote.status(), QuoteStatus::AdapterError);
        assert!(quote.numeric_price().is_none());
        assert_eq!(quote.matched_name(), Some("NSE India Limited"));
    }

    #[tokio::test]
    async fn sharescart_grid_uses_second_price_cell() {
        let page = r#"<div class="container">
<div class="row m-0 w-100">
  <div class="col-sm-4"><a class="companyPDFName" href="/pdf/nse.pdf">NSE India Ltd</a></div>
  <div class="col-sm-2 vh-align"><span class="ng-binding">NSE</span></div>
  <div class="col-sm-2 vh-align"><span class="ng-binding">₹ 1,795.25</span></div>
</div>
</div>"#;
        let renderer = Arc::new(StaticRenderer::new().with_page(builtin::SHARESCART_URL, page));
        let quote = adapter(builtin::sharescart(), &renderer)
            .fetch_quote("nse india")
            .await
            .unwrap();
        assert_eq!(quote.status(), QuoteStatus::Found);
        assert_eq!(quote.numeric_price(), Some(Decimal::new(179525, 2)));
        assert_eq!(
            quote.detail_url(),
            Some("https://www.sharescart.com/pdf/nse.pdf")
        );
    }

    fn zone_card(name: &str, price: &str) -> String {
        format!(
            r#"<div class="share"><div class="card-body">
<h5 class="card-title"><a href="/shares/{slug}">{name}</a></h5>
<h5 class="card-title">{price}</h5>
<span class="change-in-price">+10 (0.5%)</span>
</div></div>"#,
            slug = name.to_lowercase().replace(' ', "-"),
        )
    }

    fn zone_page(cards: &[(&str, &str)], more: bool) -> String {
        let body: String = cards.iter().map(|(n, p)| zone_card(n, p)).collect();
        let button = if more { "<button>View More</button>" } else { "" };
        format!(r#"<div class="row share-container">{body}</div>{button}"#)
    }

    #[tokio::test]
    async fn pagination_reveals_later_cards() {
        let stages = vec![
            zone_page(&[("HDB Financial", "Rs. 1,120")], true),
            zone_page(&[("HDB Financial", "Rs. 1,120"), ("Chennai Super Kings", "Rs. 190")], true),
            zone_page(
                &[
                    ("HDB Financial", "Rs. 1,120"),
                    ("Chennai Super Kings", "Rs. 190"),
                    ("NSE India", "Rs. 1,850"),
                ],
                false,
            ),
        ];
        let renderer = Arc::new(StaticRenderer::new().with_stages(builtin::UNLISTEDZONE_URL, stages));
        let quote = adapter(builtin::unlistedzone(), &renderer)
            .fetch_quote("nse")
            .await
            .unwrap();

        assert_eq!(quote.status(), QuoteStatus::Found);
        assert_eq!(quote.numeric_price(), Some(Decimal::from(1850)));
        assert_eq!(quote.price_change(), Some("+10 (0.5%)"));
        assert_eq!(
            quote.detail_url(),
            Some("https://unlistedzone.com/shares/nse-india")
        );
        assert_eq!(renderer.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn pagination_stops_at_iteration_cap() {
        let stages = vec![
            zone_page(&[("HDB Financial", "Rs. 1,120")], true),
            zone_page(&[("HDB Financial", "Rs. 1,120")], true),
            zone_page(&[("NSE India", "Rs. 1,850")], false),
        ];
        let mut d = builtin::unlistedzone();
        if let Some(ref mut p) = d.pagination {
            p.max_iterations = 1;
        }
        let renderer = Arc::new(StaticRenderer::new().with_stages(builtin::UNLISTEDZONE_URL, stages));
        let quote = adapter(d, &renderer).fetch_quote("nse").await.unwrap();
        assert_eq!(quote.status(), QuoteStatus::NotFound);
    }

    #[tokio::test]
    async fn bounded_maps_elapsed_to_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_millis(200)).await;
            Ok::<_, ScoutError>(())
        };
        let err = bounded(Duration::from_millis(10), "snapshot", slow).await.unwrap_err();
        assert_eq!(err, ScoutError::Timeout("snapshot exceeded 10ms".into()));
    }

    #[tokio::test(start_paused = true)]
    async fn hanging_close_does_not_hold_the_quote() {
        let renderer = Arc::new(
            StaticRenderer::new()
                .with_page(builtin::WWIPL_URL, WWIPL_PAGE)
                .with_fault(builtin::WWIPL_URL, SessionFault::HangOnClose),
        );
        let a = adapter(builtin::wwipl(), &renderer);
        let quote = tokio::time::timeout(Duration::from_secs(3600), a.fetch_quote("NSE"))
            .await
            .expect("close must be bounded")
            .unwrap();

        assert_eq!(quote.status(), QuoteStatus::Found);
        assert_eq!(quote.numeric_price(), Some(Decimal::from(1860)));
        assert_eq!(renderer.sessions_opened(), 1);
        assert_eq!(renderer.sessions_closed(), 1);
    }

    #[tokio::test]
    async fn panic_during_extraction_still_closes_session() {
        let renderer = Arc::new(
            StaticRenderer::new()
                .with_page(builtin::WWIPL_URL, WWIPL_PAGE)
                .with_fault(builtin::WWIPL_URL, SessionFault::PanicOnSnapshot),
        );
        let quote = adapter(builtin::wwipl(), &renderer)
            .fetch_quote("NSE")
            .await
            .unwrap();

        assert_eq!(quote.status(), QuoteStatus::AdapterError);
        assert_eq!(quote.diagnostic(), Some("extraction panicked"));
        assert!(quote.numeric_price().is_none());
        assert_eq!(renderer.sessions_opened(), 1);
        assert_eq!(renderer.sessions_closed(), renderer.sessions_opened());
    }

    #[tokio::test(start_paused = true)]
    async fn stuck_load_more_control_is_timeout_error() {
        let stages = vec![
            zone_page(&[("NSE India", "Rs. 1,850")], true),
            zone_page(&[("NSE India", "Rs. 1,850")], false),
        ];
        let renderer = Arc::new(
            StaticRenderer::new()
                .with_stages(builtin::UNLISTEDZONE_URL, stages)
                .with_fault(builtin::UNLISTEDZONE_URL, SessionFault::HangOnControl),
        );
        let quote = adapter(builtin::unlistedzone(), &renderer)
            .fetch_quote("nse")
            .await
            .unwrap();

        assert_eq!(quote.status(), QuoteStatus::AdapterError);
        let diagnostic = quote.diagnostic().unwrap();
        assert!(diagnostic.contains("timed out"), "{diagnostic}");
        assert!(diagnostic.contains("load-more activation"), "{diagnostic}");
        assert_eq!(renderer.sessions_opened(), 1);
        assert_eq!(renderer.sessions_closed(), renderer.sessions_opened());
    }
}
