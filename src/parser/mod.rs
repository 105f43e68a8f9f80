pub mod categories;
pub mod extract;
pub mod segments;
pub mod tree;

use chrono::{DateTime, Utc};

use crate::config::Markers;
use crate::model::NodeRecord;
use tree::ContentTree;

/// Three-pass pipeline: tree → flat node run → categories + segments → records.
pub fn process_document(
    tree: &ContentTree,
    markers: &Markers,
    extracted_at: DateTime<Utc>,
) -> Vec<NodeRecord> {
    let flat = tree.flatten();
    let categories = categories::map_categories(&flat);
    segments::segment(&flat)
        .iter()
        .map(|seg| {
            let category = categories::category_of(&categories, seg.heading);
            extract::build_record(seg, category, markers, extracted_at)
        })
        .collect()
}


// ── Tests ──
