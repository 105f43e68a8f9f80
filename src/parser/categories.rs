use std::collections::HashMap;

use super::segments::RECORD_LEVEL;
use super::tree::ContentNode;
use crate::model::UNCATEGORIZED;

const CATEGORY_LEVEL: u8 = 1;

/// Record heading order → text of the nearest preceding top-level heading.
pub type CategoryMap = HashMap<usize, String>;

/// One pass over the flattened document, carrying the current category.
pub fn map_categories(flat: &[&ContentNode]) -> CategoryMap {
    let mut current = UNCATEGORIZED.to_string();
    let mut categories = CategoryMap::new();

    for node in flat {
        match node.heading_level() {
            Some(CATEGORY_LEVEL) => current = node.text.trim().to_string(),
            Some(RECORD_LEVEL) => {
                categories.insert(node.order, current.clone());
            }
            _ => {}
        }
    }

    categories
}

/// Category for a record heading, falling back to the sentinel.
pub fn category_of<'m>(categories: &'m CategoryMap, heading: &ContentNode) -> &'m str {
    categories
        .get(&heading.order)
        .map(String::as_str)
        .unwrap_or(UNCATEGORIZED)
}
