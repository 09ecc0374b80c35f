//! Descriptors for the public unlisted-share quote pages.
//!
//! Field positions are fixed per source: these pages are semi-structured
//! tables and cards with no stable API, so each locator pins a column or
//! card slot by index.

use crate::render::WaitUntil;

use super::descriptor::{CellRequirement, FieldLocator, Pagination, SourceDescriptor};

pub const SHARESCART_URL: &str =
    "https://www.sharescart.com/unlisted-shares/unlisted-shares-quotes.php";
pub const WWIPL_URL: &str = "https://wwipl.com/";
pub const UNLISTEDZONE_URL: &str = "https://unlistedzone.com/unlisted-shares-price-list-india";

/// SharesCart quote grid: one `.row.m-0.w-100` per company, price in the
/// second `.col-sm-2` cell.
pub fn sharescart() -> SourceDescriptor {
    SourceDescriptor {
        name: "sharescart".into(),
        url: SHARESCART_URL.into(),
        wait_until: WaitUntil::NetworkIdle2,
        navigation_timeout_secs: 60,
        container_selector: ".row.m-0.w-100".into(),
        container_timeout_secs: 30,
        row_selector: ".row.m-0.w-100".into(),
        required_cells: None,
        name_field: FieldLocator::new("a.companyPDFName", 0),
        price_field: FieldLocator::new(".col-sm-2.vh-align span.ng-binding", 1),
        link_field: Some(FieldLocator::new("a.companyPDFName", 0)),
        change_field: None,
        pagination: None,
    }
}

/// WWIPL portfolio table: name link in column 3, price in column 7.
pub fn wwipl() -> SourceDescriptor {
    SourceDescriptor {
        name: "wwipl".into(),
        url: WWIPL_URL.into(),
        wait_until: WaitUntil::DomContentLoaded,
        navigation_timeout_secs: 60,
        container_selector: "#portfoliolist tbody tr".into(),
        container_timeout_secs: 30,
        row_selector: "#portfoliolist tbody tr".into(),
        required_cells: Some(CellRequirement {
            selector: "td".into(),
            min_count: 7,
        }),
        name_field: FieldLocator::new("td", 2).within("a"),
        price_field: FieldLocator::new("td", 6),
        link_field: Some(FieldLocator::new("td", 2).within("a")),
        change_field: None,
        pagination: None,
    }
}

/// UnlistedZone share cards: two `h5.card-title` per card (name, then price),
/// more cards behind a "view more" control.
pub fn unlistedzone() -> SourceDescriptor {
    SourceDescriptor {
        name: "unlistedzone".into(),
        url: UNLISTEDZONE_URL.into(),
        wait_until: WaitUntil::NetworkIdle0,
        navigation_timeout_secs: 60,
        container_selector: ".row.share-container".into(),
        container_timeout_secs: 30,
        row_selector: ".row.share-container .share".into(),
        required_cells: None,
        name_field: FieldLocator::new(".card-body h5.card-title a", 0),
        price_field: FieldLocator::new(".card-body h5.card-title", 1),
        link_field: Some(FieldLocator::new(".card-body h5.card-title a", 0)),
        change_field: Some(FieldLocator::new(".change-in-price", 0)),
        pagination: Some(Pagination::default()),
    }
}

/// Every built-in source.
pub fn all() -> Vec<SourceDescriptor> {
    vec![sharescart(), wwipl(), unlistedzone()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_names_are_unique() {
        let names: HashSet<String> = all().into_iter().map(|d| d.name).collect();
        assert_eq!(names.len(), 3);
    }

    #[test]
    fn only_unlistedzone_paginates() {
        assert!(sharescart().pagination.is_none());
        assert!(wwipl().pagination.is_none());
        let p = unlistedzone().pagination.expect("pagination");
        assert_eq!(p.max_iterations, 25);
        assert_eq!(p.settle_ms, 1200);
        assert!(p.labels.iter().any(|l| l == "view more"));
    }

    #[test]
    fn timeouts_match_source_pages() {
        for d in all() {
            assert_eq!(d.navigation_timeout_secs, 60);
            assert_eq!(d.container_timeout_secs, 30);
        }
    }
}
