use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Category given to records with no preceding top-level heading.
pub const UNCATEGORIZED: &str = "uncategorized";

/// Which side of a node a parameter sits on, read from the table's first cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Input,
    Output,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamRecord {
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    pub description: String,
    pub role: Role,
    /// The guide marks nothing optional, so this is always true.
    pub required: bool,
}

/// One documented node, built from one heading-delimited segment.
#[derive(Debug, Clone, Serialize)]
pub struct NodeRecord {
    pub name: String,
    pub description: String,
    pub category: String,
    pub inputs: Vec<ParamRecord>,
    pub outputs: Vec<ParamRecord>,
    pub other: Vec<ParamRecord>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub example: String,
    pub extracted_at: DateTime<Utc>,
}

impl NodeRecord {
    pub fn summary(&self) -> NodeSummary {
        NodeSummary {
            name: self.name.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
        }
    }
}

/// Catalog listing entry; parameter detail is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSummary {
    pub name: String,
    pub description: String,
    pub category: String,
}

/// Logical query key: (client type, node type) in the guide's terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub axis_a: String,
    pub axis_b: String,
}

impl CacheKey {
    pub fn new(axis_a: impl Into<String>, axis_b: impl Into<String>) -> Self {
        CacheKey {
            axis_a: axis_a.into(),
            axis_b: axis_b.into(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.axis_a, self.axis_b)
    }
}

/// The unit of caching: every record of one document, in document order.
#[derive(Debug, Clone)]
pub struct PageResult {
    pub key: CacheKey,
    pub records: Vec<NodeRecord>,
    pub extracted_at: DateTime<Utc>,
}

impl PageResult {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// First record whose name matches exactly, in document order.
    pub fn find(&self, name: &str) -> Option<&NodeRecord> {
        self.records.iter().find(|r| r.name == name)
    }

    pub fn summaries(&self) -> Vec<NodeSummary> {
        self.records.iter().map(NodeRecord::summary).collect()
    }
}
