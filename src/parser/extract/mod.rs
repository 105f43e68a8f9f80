pub mod params;

use chrono::{DateTime, Utc};
use tracing::debug;

use super::segments::Segment;
use super::tree::{ContentNode, NodeKind};
use crate::config::Markers;
use crate::model::{NodeRecord, ParamRecord};

/// Everything read from one segment besides its name and category.
#[derive(Debug, Default)]
pub struct Extraction {
    pub description: String,
    pub inputs: Vec<ParamRecord>,
    pub outputs: Vec<ParamRecord>,
    pub other: Vec<ParamRecord>,
    pub example: String,
    pub malformed_rows: usize,
}

/// Description, parameters and example from one segment.
///
/// Only the first table is read. The example is gathered from nodes after
/// that table, so a segment without a table never has one.
pub fn extract(segment: &Segment, markers: &Markers) -> Extraction {
    let mut out = Extraction {
        description: find_description(segment, markers),
        ..Default::default()
    };

    let Some(table_idx) = segment
        .nodes
        .iter()
        .position(|n| matches!(n.kind, NodeKind::Table(_)))
    else {
        return out;
    };

    if let NodeKind::Table(table) = &segment.nodes[table_idx].kind {
        let parsed = params::parse_table(table, markers);
        if parsed.skipped > 0 {
            debug!("{:?}: skipped {} blank or header rows", segment.name, parsed.skipped);
        }
        out.inputs = parsed.inputs;
        out.outputs = parsed.outputs;
        out.other = parsed.other;
        out.malformed_rows = parsed.malformed;
    }

    out.example = find_example(&segment.nodes[table_idx + 1..], markers);

    debug!(
        "Extracted {:?}: {} inputs, {} outputs, {} other, {} malformed rows",
        segment.name,
        out.inputs.len(),
        out.outputs.len(),
        out.other.len(),
        out.malformed_rows
    );

    out
}

/// Assemble the immutable record for one segment.
pub fn build_record(
    segment: &Segment,
    category: &str,
    markers: &Markers,
    extracted_at: DateTime<Utc>,
) -> NodeRecord {
    let e = extract(segment, markers);
    NodeRecord {
        name: segment.name.clone(),
        description: e.description,
        category: category.to_string(),
        inputs: e.inputs,
        outputs: e.outputs,
        other: e.other,
        example: e.example,
        extracted_at,
    }
}

/// First non-empty paragraph that is not one of the guide's section labels.
fn find_description(segment: &Segment, markers: &Markers) -> String {
    segment
        .nodes
        .iter()
        .filter(|n| n.kind == NodeKind::Paragraph)
        .map(|n| n.text.trim())
        .find(|t| !t.is_empty() && !contains_any(t, &markers.boilerplate))
        .unwrap_or_default()
        .to_string()
}

/// Marked nodes after the table, one per line. A container is read whole,
/// inline children included, unless it wraps a heading; its descendants are
/// then not matched again.
fn find_example(nodes: &[&ContentNode], markers: &Markers) -> String {
    let mut parts = Vec::new();
    let mut skip_until = 0;
    for node in nodes {
        if node.order < skip_until {
            continue;
        }
        let subtree = node.flatten();
        let whole = subtree[1..].iter().all(|n| n.heading_level().is_none());
        let text = if whole { node.subtree_text() } else { node.text.clone() };
        if contains_any(&text, &markers.example) {
            if whole {
                skip_until = node.order + subtree.len();
            }
            parts.push(text.trim().to_string());
        }
    }
    parts.join("\n").trim().to_string()
}

/// Substring test against a marker set; empty markers never match.
pub(crate) fn contains_any(text: &str, markers: &[String]) -> bool {
    markers
        .iter()
        .any(|m| !m.is_empty() && text.contains(m.as_str()))
}
