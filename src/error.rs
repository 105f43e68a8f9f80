use thiserror::Error;

/// Errors surfaced to callers of the catalog.
///
/// Malformed table rows and empty extractions are not represented here:
/// the first is skipped during extraction, the second is a valid (empty)
/// catalog that simply is not cached.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The (axis A, axis B) pair has no registered document.
    #[error(
        "unsupported query ({axis_a}, {axis_b}); valid values for {axis_a}: [{}]",
        .valid.join(", ")
    )]
    UnsupportedQuery {
        axis_a: String,
        axis_b: String,
        /// Every axis B value registered for `axis_a`, sorted. Empty when
        /// `axis_a` itself is unknown.
        valid: Vec<String>,
    },

    /// Fetching or rendering the document failed.
    #[error("document {document_id} unavailable: {reason}")]
    DocumentUnavailable { document_id: String, reason: String },

    /// The catalog was fetched but holds no record with this name.
    #[error("node not found: {name}")]
    NotFound { name: String },
}

impl CatalogError {
    pub fn unavailable(document_id: &str, reason: impl ToString) -> Self {
        CatalogError::DocumentUnavailable {
            document_id: document_id.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Only fetch failures are worth re-issuing; nothing retries on its own.
    pub fn is_retryable(&self) -> bool {
        matches!(self, CatalogError::DocumentUnavailable { .. })
    }
}
