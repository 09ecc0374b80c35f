//! Best-quote selection and the one-line summary.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use crate::types::{Quote, QuoteStatus};

/// The found quote with the smallest price.
///
/// Only [`QuoteStatus::Found`] quotes with a price take part. Equal prices
/// resolve to the lexicographically smallest source name.
pub fn best_quote<'a>(quotes: impl IntoIterator<Item = &'a Quote>) -> Option<&'a Quote> {
    quotes
        .into_iter()
        .filter_map(|quote| match (quote.status(), quote.numeric_price()) {
            (QuoteStatus::Found, Some(price)) => Some((price, quote)),
            _ => None,
        })
        .min_by(|(a_price, a), (b_price, b)| compare(*a_price, a, *b_price, b))
        .map(|(_, quote)| quote)
}

fn compare(
    a_price: rust_decimal::Decimal,
    a: &Quote,
    b_price: rust_decimal::Decimal,
    b: &Quote,
) -> Ordering {
    a_price
        .cmp(&b_price)
        .then_with(|| a.source_name().cmp(b.source_name()))
}

/// `"{found} of {total} sources found (name: Found, name: Missing, ...)"`.
///
/// Adapter errors read as `Missing`, the same as the consumer-facing status.
pub fn summarize(quotes: &BTreeMap<String, Quote>) -> String {
    let found = quotes.values().filter(|q| q.is_found()).count();
    let parts = quotes
        .iter()
        .map(|(name, quote)| format!("{name}: {}", quote.status().summary_label()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("{found} of {} sources found ({parts})", quotes.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RowMatch;
    use rust_decimal::Decimal;

    fn found(source: &str, price: &str) -> Quote {
        Quote::from_match(
            source,
            "https://example.test/",
            RowMatch {
                matched_name: "NSE India".into(),
                raw_price_text: price.into(),
                detail_url: None,
                price_change: None,
            },
        )
    }

    fn map(quotes: Vec<Quote>) -> BTreeMap<String, Quote> {
        quotes
            .into_iter()
            .map(|q| (q.source_name().to_owned(), q))
            .collect()
    }

    #[test]
    fn cheapest_found_quote_wins() {
        let quotes = map(vec![
            found("sharescart", "1,860"),
            found("wwipl", "1,795.25"),
            found("unlistedzone", "1,900"),
        ]);
        let best = best_quote(quotes.values()).expect("best");
        assert_eq!(best.source_name(), "wwipl");
        assert_eq!(best.numeric_price(), Some(Decimal::new(179525, 2)));
    }

    #[test]
    fn ties_go_to_smallest_source_name() {
        let quotes = vec![found("zeta", "1,000.0"), found("alpha", "1000"), found("mid", "1,000")];
        let best = best_quote(quotes.iter()).expect("best");
        assert_eq!(best.source_name(), "alpha");
    }

    #[test]
    fn errors_and_not_found_never_win() {
        let quotes = vec![
            Quote::not_found("a", "https://a.test/"),
            Quote::adapter_error("b", "https://b.test/", "timeout"),
            found("c", "N/A"),
            found("d", "2,000"),
        ];
        let best = best_quote(quotes.iter()).expect("best");
        assert_eq!(best.source_name(), "d");
    }

    #[test]
    fn no_found_quotes_means_no_best() {
        let quotes = vec![
            Quote::not_found("a", "https://a.test/"),
            Quote::adapter_error("b", "https://b.test/", "timeout"),
        ];
        assert!(best_quote(quotes.iter()).is_none());
        assert!(best_quote(std::iter::empty()).is_none());
    }

    #[test]
    fn summary_counts_found_and_collapses_errors() {
        let quotes = map(vec![
            found("wwipl", "1,860"),
            Quote::not_found("sharescart", "https://a.test/"),
            Quote::adapter_error("unlistedzone", "https://b.test/", "boom"),
        ]);
        assert_eq!(
            summarize(&quotes),
            "1 of 3 sources found (sharescart: Missing, unlistedzone: Missing, wwipl: Found)"
        );
    }
}
