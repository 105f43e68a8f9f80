use tracing::debug;

use super::tree::ContentNode;

/// Heading level that opens a record.
pub const RECORD_LEVEL: u8 = 2;

/// The node run belonging to one record: its heading plus everything up to
/// the next record heading.
#[derive(Debug, Clone)]
pub struct Segment<'a> {
    pub heading: &'a ContentNode,
    /// Cleaned heading text.
    pub name: String,
    /// Nodes after the heading, in document order.
    pub nodes: Vec<&'a ContentNode>,
}

/// Split a flattened document into record segments in one linear pass.
///
/// Nodes before the first record heading belong to no segment. Headings
/// whose cleaned name is empty are dropped together with their nodes.
pub fn segment<'a>(flat: &[&'a ContentNode]) -> Vec<Segment<'a>> {
    let mut segments = Vec::new();
    let mut current: Option<Segment<'a>> = None;

    for &node in flat {
        if node.heading_level() == Some(RECORD_LEVEL) {
            if let Some(done) = current.take() {
                push_segment(&mut segments, done);
            }
            current = Some(Segment {
                heading: node,
                name: clean_node_name(&node.text),
                nodes: Vec::new(),
            });
            continue;
        }
        if let Some(open) = current.as_mut() {
            open.nodes.push(node);
        }
    }

    if let Some(done) = current {
        push_segment(&mut segments, done);
    }

    segments
}

fn push_segment<'a>(segments: &mut Vec<Segment<'a>>, segment: Segment<'a>) {
    if segment.name.is_empty() {
        debug!("Empty heading at node {}, skipping", segment.heading.order);
        return;
    }
    debug!("Segment {:?}: {} nodes", segment.name, segment.nodes.len());
    segments.push(segment);
}

/// Normalize a record heading: drop a leading ordinal ("12." plus any
/// whitespace after it), then trim.
///
/// `"12.  Query gear info"` becomes `"Query gear info"`. Text without a
/// leading ordinal is only trimmed; a run of digits without the period is
/// kept (`"3D model"` stays as is).
pub fn clean_node_name(raw: &str) -> String {
    let trimmed = raw.trim();
    let digits = trimmed
        .char_indices()
        .take_while(|(_, c)| c.is_ascii_digit())
        .count();

    let rest = if digits > 0 {
        trimmed[digits..].strip_prefix('.').map(str::trim_start)
    } else {
        None
    };

    rest.unwrap_or(trimmed).trim().to_string()
}
