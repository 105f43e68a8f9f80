use crate::config::RouteTable;
use crate::error::CatalogError;

/// Maps an (axis A, axis B) query onto a document id. Exact matches only.
#[derive(Debug, Clone, Copy)]
pub struct QueryRouter<'a> {
    routes: &'a RouteTable,
}

impl<'a> QueryRouter<'a> {
    pub fn new(routes: &'a RouteTable) -> Self {
        QueryRouter { routes }
    }

    pub fn resolve(&self, axis_a: &str, axis_b: &str) -> Result<&'a str, CatalogError> {
        let by_b = self.routes.get(axis_a);
        if let Some(id) = by_b.and_then(|m| m.get(axis_b)) {
            return Ok(id.as_str());
        }

        Err(CatalogError::UnsupportedQuery {
            axis_a: axis_a.to_string(),
            axis_b: axis_b.to_string(),
            valid: by_b.map(|m| m.keys().cloned().collect()).unwrap_or_default(),
        })
    }

    /// Every registered (axis A, [axis B]) pair, for discovery.
    pub fn axes(&self) -> impl Iterator<Item = (&'a str, Vec<&'a str>)> {
        self.routes
            .iter()
            .map(|(a, m)| (a.as_str(), m.keys().map(String::as_str).collect()))
    }
}
