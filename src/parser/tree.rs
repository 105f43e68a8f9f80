use std::sync::LazyLock;

use ego_tree::NodeRef;
use regex::Regex;
use scraper::{node::Node, ElementRef, Html, Selector};
use tracing::{debug, warn};

static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());
static BODY_SELECTOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("body").unwrap());

const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// What a node is, decided once while the tree is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Heading(u8),
    Paragraph,
    Table(TableData),
    Other,
}

/// Rows of trimmed cell texts, header row included.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableData {
    pub rows: Vec<Vec<String>>,
}

#[derive(Debug, Clone)]
pub struct ContentNode {
    pub kind: NodeKind,
    /// Full text for headings, paragraphs and tables; only directly-owned
    /// text for `Other`, whose descendants carry the rest.
    pub text: String,
    pub children: Vec<ContentNode>,
    /// Pre-order position in the document.
    pub order: usize,
}

impl ContentNode {
    pub fn new(kind: NodeKind, text: impl Into<String>) -> Self {
        ContentNode {
            kind,
            text: text.into(),
            children: Vec::new(),
            order: 0,
        }
    }

    pub fn with_children(mut self, children: Vec<ContentNode>) -> Self {
        self.children = children;
        self
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self.kind {
            NodeKind::Heading(level) => Some(level),
            _ => None,
        }
    }

    /// This node and its descendants in pre-order.
    pub fn flatten(&self) -> Vec<&ContentNode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    /// Non-empty texts of this node and its descendants, space separated.
    pub fn subtree_text(&self) -> String {
        self.flatten()
            .iter()
            .map(|n| n.text.as_str())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Navigable structure of one rendered document.
#[derive(Debug, Clone)]
pub struct ContentTree {
    root: ContentNode,
}

impl ContentTree {
    /// Wrap `root`, numbering every node in pre-order.
    pub fn new(mut root: ContentNode) -> Self {
        let mut next = 0;
        number(&mut root, &mut next);
        ContentTree { root }
    }

    /// Build from rendered HTML, rooted at the first `root_selector` match
    /// or at `<body>` when the content container is missing.
    pub fn from_html(html: &str, root_selector: &str) -> Self {
        let doc = Html::parse_document(html);

        let container = match Selector::parse(root_selector) {
            Ok(sel) => doc.select(&sel).next(),
            Err(e) => {
                warn!("Invalid root selector {:?}: {:?}", root_selector, e);
                None
            }
        };
        let root_el = container.unwrap_or_else(|| {
            debug!("Content container {:?} not found, using <body>", root_selector);
            doc.select(&BODY_SELECTOR)
                .next()
                .unwrap_or_else(|| doc.root_element())
        });

        ContentTree::from_element(root_el)
    }

    /// Build from an already selected container element.
    pub fn from_element(el: ElementRef) -> Self {
        let root = convert(el).unwrap_or_else(|| ContentNode::new(NodeKind::Other, ""));
        ContentTree::new(root)
    }

    /// Every node in document order (pre-order, depth-first).
    pub fn flatten(&self) -> Vec<&ContentNode> {
        self.root.flatten()
    }
}

fn number(node: &mut ContentNode, next: &mut usize) {
    node.order = *next;
    *next += 1;
    for child in &mut node.children {
        number(child, next);
    }
}

fn convert(el: ElementRef) -> Option<ContentNode> {
    let name = el.value().name();
    if SKIPPED_TAGS.contains(&name) {
        return None;
    }

    if let Some(level) = heading_level(name) {
        return Some(ContentNode::new(NodeKind::Heading(level), collapse(&full_text(el))));
    }

    match name {
        "p" => Some(ContentNode::new(NodeKind::Paragraph, collapse(&full_text(el)))),
        "table" => {
            let data = TableData { rows: table_rows(el) };
            let text = data
                .rows
                .iter()
                .map(|row| row.join(" "))
                .collect::<Vec<_>>()
                .join("\n");
            Some(ContentNode::new(NodeKind::Table(data), text))
        }
        _ => {
            let children = el
                .children()
                .filter_map(ElementRef::wrap)
                .filter_map(convert)
                .collect();
            Some(ContentNode::new(NodeKind::Other, collapse(&own_text(*el))).with_children(children))
        }
    }
}

fn heading_level(tag: &str) -> Option<u8> {
    tag.strip_prefix('h')
        .and_then(|d| d.parse::<u8>().ok())
        .filter(|level| (1..=6).contains(level))
}

fn full_text(el: ElementRef) -> String {
    el.text().collect()
}

fn own_text(node: NodeRef<Node>) -> String {
    node.children()
        .filter_map(|c| c.value().as_text().map(|t| t.text.to_string()))
        .collect()
}

pub(crate) fn collapse(text: &str) -> String {
    WHITESPACE_RE.replace_all(text, " ").trim().to_string()
}

/// Rows of this table only; nested tables are not descended into.
fn table_rows(table: ElementRef) -> Vec<Vec<String>> {
    let mut rows = Vec::new();
    collect_rows(table, &mut rows);
    rows
}

fn collect_rows(el: ElementRef, rows: &mut Vec<Vec<String>>) {
    for child in el.children().filter_map(ElementRef::wrap) {
        match child.value().name() {
            "table" => {}
            "tr" => {
                let cells = child
                    .children()
                    .filter_map(ElementRef::wrap)
                    .filter(|c| matches!(c.value().name(), "td" | "th"))
                    .map(|c| collapse(&full_text(c)))
                    .collect();
                rows.push(cells);
            }
            _ => collect_rows(child, rows),
        }
    }
}
