//! DOM query wrapper over [`scraper`].
//!
//! [`Document`] is not `Send`. Parse and query it inside synchronous code,
//! never across an `.await`.

use scraper::{ElementRef, Html, Selector};

use crate::error::{Result, ScoutError};

/// Compile a CSS selector, mapping parse failures to [`ScoutError::Extraction`].
pub fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(selector)
        .map_err(|e| ScoutError::Extraction(format!("invalid selector {selector:?}: {e:?}")))
}

/// A parsed HTML document.
pub struct Document {
    html: Html,
}

impl Document {
    pub fn parse(html: &str) -> Self {
        Self {
            html: Html::parse_document(html),
        }
    }

    /// All elements matching `selector`, in document order.
    pub fn find(&self, selector: &str) -> Result<Vec<Node<'_>>> {
        let sel = compile(selector)?;
        Ok(self.html.select(&sel).map(Node::new).collect())
    }

    /// Whether any element matches `selector`.
    pub fn contains(&self, selector: &str) -> Result<bool> {
        let sel = compile(selector)?;
        Ok(self.html.select(&sel).next().is_some())
    }

    /// First element matching `selector` whose text contains one of `labels`,
    /// compared case-insensitively.
    pub fn find_control(&self, selector: &str, labels: &[String]) -> Result<Option<Node<'_>>> {
        Ok(self
            .find(selector)?
            .into_iter()
            .find(|node| label_matches(&node.text(), labels)))
    }
}

/// Whether control text contains any of `labels`, ignoring case and
/// whitespace runs.
pub fn label_matches(text: &str, labels: &[String]) -> bool {
    let text = text
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    !text.is_empty()
        && labels.iter().any(|label| {
            let label = label.trim().to_lowercase();
            !label.is_empty() && text.contains(&label)
        })
}

/// An element inside a [`Document`].
#[derive(Clone, Copy)]
pub struct Node<'a> {
    element: ElementRef<'a>,
}

impl<'a> Node<'a> {
    fn new(element: ElementRef<'a>) -> Self {
        Self { element }
    }

    /// Text content with whitespace runs collapsed and ends trimmed.
    pub fn text(&self) -> String {
        self.element
            .text()
            .flat_map(str::split_whitespace)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn attribute(&self, name: &str) -> Option<&'a str> {
        self.element.value().attr(name)
    }

    /// Descendants matching `selector`, in document order.
    pub fn find(&self, selector: &str) -> Result<Vec<Node<'a>>> {
        let sel = compile(selector)?;
        Ok(self.element.select(&sel).map(Node::new).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><body>
<table id="list">
  <tbody>
    <tr><td>1</td><td><a href="/share/nse">  NSE
        India </a></td><td>1,860</td></tr>
    <tr><td>2</td><td><a href="/share/hdb">HDB Financial</a></td><td>1,120</td></tr>
  </tbody>
</table>
<div><button class="btn">Load   More</button><a href="/about">About</a></div>
</body></html>"#;

    #[test]
    fn find_returns_nodes_in_document_order() {
        let doc = Document::parse(PAGE);
        let rows = doc.find("#list tbody tr").unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].text().contains("NSE India"));
        assert!(rows[1].text().contains("HDB Financial"));
    }

    #[test]
    fn text_collapses_whitespace() {
        let doc = Document::parse(PAGE);
        let link = doc.find("#list a").unwrap()[0];
        assert_eq!(link.text(), "NSE India");
    }

    #[test]
    fn attribute_and_nested_find() {
        let doc = Document::parse(PAGE);
        let row = doc.find("#list tbody tr").unwrap()[1];
        let cells = row.find("td").unwrap();
        assert_eq!(cells.len(), 3);
        assert_eq!(cells[2].text(), "1,120");
        let link = cells[1].find("a").unwrap()[0];
        assert_eq!(link.attribute("href"), Some("/share/hdb"));
        assert_eq!(link.attribute("title"), None);
    }

    #[test]
    fn contains_reports_presence() {
        let doc = Document::parse(PAGE);
        assert!(doc.contains("#list").unwrap());
        assert!(!doc.contains(".share-container").unwrap());
    }

    #[test]
    fn invalid_selector_is_extraction_error() {
        let doc = Document::parse(PAGE);
        assert!(matches!(doc.find("tr[[["), Err(ScoutError::Extraction(_))));
        assert!(compile(":::").is_err());
    }

    #[test]
    fn find_control_matches_label_case_insensitively() {
        let doc = Document::parse(PAGE);
        let labels = vec!["view more".to_owned(), "load more".to_owned()];
        let control = doc.find_control("button, a", &labels).unwrap();
        assert_eq!(control.map(|n| n.text()), Some("Load More".to_owned()));

        let none = doc
            .find_control("button, a", &["show more".to_owned()])
            .unwrap();
        assert!(none.is_none());
    }

    #[test]
    fn label_matching_ignores_case_and_spacing() {
        let labels = vec!["View More".to_owned(), "  ".to_owned()];
        assert!(label_matches("  VIEW\n   more shares ", &labels));
        assert!(!label_matches("View", &labels));
        assert!(!label_matches("   ", &labels));
    }
}
