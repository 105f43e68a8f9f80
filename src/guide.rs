use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::CatalogError;
use crate::parser::tree::{collapse, ContentTree};

static LINK_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static TITLE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());

/// One guide document listed in the sidebar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub title: String,
    /// Document id, the last path segment of the link.
    pub id: String,
}

/// A guide document as plain text.
#[derive(Debug, Clone, Serialize)]
pub struct Guide {
    pub id: String,
    pub title: String,
    /// Text of the content container, one block per line.
    pub content: String,
    pub url: String,
}

/// Links under `nav_selector` that point at guide documents, in page order.
///
/// Links without text or `href`, and links outside `document_path`, are
/// skipped. A page without the sidebar is treated as not rendered.
pub fn parse_navigation(
    html: &str,
    document_id: &str,
    nav_selector: &str,
    document_path: &str,
) -> Result<Vec<NavItem>, CatalogError> {
    let doc = Html::parse_document(html);
    let selector = Selector::parse(nav_selector)
        .map_err(|e| CatalogError::unavailable(document_id, format!("invalid selector {:?}: {:?}", nav_selector, e)))?;
    let nav = doc
        .select(&selector)
        .next()
        .ok_or_else(|| CatalogError::unavailable(document_id, format!("{} not found", nav_selector)))?;

    let mut items = Vec::new();
    for (i, link) in nav.select(&LINK_SELECTOR).enumerate() {
        let title = collapse(&link.text().collect::<String>());
        if title.is_empty() {
            debug!("Navigation link {} has no title, skipping", i);
            continue;
        }
        let Some(href) = link.value().attr("href") else {
            debug!("Navigation link {:?} has no href, skipping", title);
            continue;
        };
        if !href.contains(document_path) {
            debug!("Navigation link {:?} points outside the guide: {}", title, href);
            continue;
        }
        match id_from_href(href) {
            Some(id) => items.push(NavItem { title, id }),
            None => debug!("No document id in {}", href),
        }
    }

    debug!("Navigation lists {} documents", items.len());
    Ok(items)
}

/// Last path segment, without query or fragment.
fn id_from_href(href: &str) -> Option<String> {
    let path = href.split(['?', '#']).next().unwrap_or_default();
    path.rsplit('/')
        .next()
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}

/// Title from the page's first `<h1>`, content from the container at
/// `root_selector`. Both must be present.
pub fn parse_guide(html: &str, id: &str, root_selector: &str, url: String) -> Result<Guide, CatalogError> {
    let doc = Html::parse_document(html);

    let title = doc
        .select(&TITLE_SELECTOR)
        .next()
        .map(|h| collapse(&h.text().collect::<String>()))
        .ok_or_else(|| CatalogError::unavailable(id, "page has no title"))?;

    let selector = Selector::parse(root_selector)
        .map_err(|e| CatalogError::unavailable(id, format!("invalid selector {:?}: {:?}", root_selector, e)))?;
    let Some(container) = doc.select(&selector).next() else {
        warn!("Guide {} has no {}", id, root_selector);
        return Err(CatalogError::unavailable(id, format!("{} not found", root_selector)));
    };

    let tree = ContentTree::from_element(container);
    let content = tree
        .flatten()
        .iter()
        .map(|n| n.text.as_str())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join("\n");

    debug!("Guide {} {:?}: {} chars", id, title, content.chars().count());
    Ok(Guide { id: id.to_string(), title, content, url })
}
