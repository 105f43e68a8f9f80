use std::sync::Arc;

use crate::cache::{Clock, PageCache, SystemClock};
use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::fetcher::DocumentFetcher;
use crate::guide::{self, Guide, NavItem};
use crate::model::{CacheKey, NodeRecord, NodeSummary};
use crate::router::QueryRouter;

/// The query surface: catalog listings and single-record lookups over one
/// shared cache.
pub struct CatalogService<F> {
    cache: PageCache<F>,
}

impl<F: DocumentFetcher> CatalogService<F> {
    pub fn new(config: Arc<CatalogConfig>, fetcher: F) -> Self {
        Self::with_clock(config, fetcher, Arc::new(SystemClock))
    }

    pub fn with_clock(config: Arc<CatalogConfig>, fetcher: F, clock: Arc<dyn Clock>) -> Self {
        CatalogService {
            cache: PageCache::new(config, fetcher, clock),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        self.cache.config()
    }

    pub fn cache(&self) -> &PageCache<F> {
        &self.cache
    }

    /// Every record of the query's document, summarized, in document order.
    /// An empty list is a valid answer.
    pub async fn list_catalog(&self, axis_a: &str, axis_b: &str) -> Result<Vec<NodeSummary>, CatalogError> {
        let page = self.cache.get_or_fetch(&CacheKey::new(axis_a, axis_b)).await?;
        Ok(page.summaries())
    }

    pub async fn get_record(&self, axis_a: &str, axis_b: &str, name: &str) -> Result<NodeRecord, CatalogError> {
        self.cache.find_by_name(&CacheKey::new(axis_a, axis_b), name).await
    }

    /// Guide documents listed in the sidebar of the navigation page. Not
    /// cached.
    pub async fn navigation(&self) -> Result<Vec<NavItem>, CatalogError> {
        let config = self.config();
        let html = self.cache.fetcher().fetch_html(&config.navigation_document).await?;
        guide::parse_navigation(
            &html,
            &config.navigation_document,
            &config.navigation_selector,
            &config.document_path,
        )
    }

    /// One guide document by id, as title and plain text. Not cached.
    pub async fn guide(&self, id: &str) -> Result<Guide, CatalogError> {
        let config = self.config();
        let html = self.cache.fetcher().fetch_html(id).await?;
        guide::parse_guide(&html, id, &config.root_selector, config.document_url(id))
    }

    /// (axis A, [axis B]) pairs the router accepts.
    pub fn routes(&self) -> Vec<(String, Vec<String>)> {
        QueryRouter::new(&self.config().routes)
            .axes()
            .map(|(a, bs)| (a.to_string(), bs.into_iter().map(str::to_string).collect()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashSet};

    use super::*;
    use crate::fetcher::FileFetcher;

    fn service_over(dir: &std::path::Path) -> CatalogService<FileFetcher> {
        let mut by_b = BTreeMap::new();
        by_b.insert("查询节点".to_string(), "server_query_nodes".to_string());
        by_b.insert("运算节点".to_string(), "missing_page".to_string());
        let mut routes = BTreeMap::new();
        routes.insert("服务器节点".to_string(), by_b);

        let config = CatalogConfig {
            routes,
            navigation_document: "server_query_nodes".into(),
            ..Default::default()
        };
        CatalogService::new(Arc::new(config), FileFetcher::new(dir))
    }

    #[tokio::test]
    async fn lists_fixture_in_document_order() {
        let service = service_over(std::path::Path::new("tests/fixtures"));
        let items = service.list_catalog("服务器节点", "查询节点").await.unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[0].name, "查询对局游玩方式及人数");
        assert_eq!(items[2].category, "变量查询 - 查询节点");
        assert_eq!(service.cache().len(), 1);
    }

    #[tokio::test]
    async fn get_record_distinguishes_not_found() {
        let service = service_over(std::path::Path::new("tests/fixtures"));
        let record = service
            .get_record("服务器节点", "查询节点", "查询实体是否在场")
            .await
            .unwrap();
        assert_eq!(record.inputs[0].name, "目标实体");

        let missing = service.get_record("服务器节点", "查询节点", "不存在的节点").await;
        assert!(matches!(missing, Err(CatalogError::NotFound { .. })));

        let unsupported = service.get_record("服务器节点", "bogus", "查询实体是否在场").await;
        assert!(matches!(unsupported, Err(CatalogError::UnsupportedQuery { .. })));
    }

    #[tokio::test]
    async fn unsupported_listing_enumerates_axis_b() {
        let service = service_over(std::path::Path::new("tests/fixtures"));
        match service.list_catalog("服务器节点", "bogus").await {
            Err(CatalogError::UnsupportedQuery { valid, .. }) => {
                let got: HashSet<_> = valid.into_iter().collect();
                let want: HashSet<_> = ["查询节点", "运算节点"].iter().map(|s| s.to_string()).collect();
                assert_eq!(got, want);
            }
            other => panic!("expected UnsupportedQuery, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn missing_document_is_unavailable() {
        let service = service_over(std::path::Path::new("tests/fixtures"));
        let err = service.list_catalog("服务器节点", "运算节点").await.unwrap_err();
        assert!(matches!(err, CatalogError::DocumentUnavailable { .. }));
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn navigation_lists_guide_documents() {
        let service = service_over(std::path::Path::new("tests/fixtures"));
        let items = service.navigation().await.unwrap();
        let ids: Vec<&str> = items.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["mh29wpicgvh0", "mhwbqlrw655q", "mhnd4l069tk0"]);
        assert_eq!(items[1].title, "服务器查询节点");
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn guide_by_id() {
        let service = service_over(std::path::Path::new("tests/fixtures"));
        let guide = service.guide("server_query_nodes").await.unwrap();
        assert_eq!(guide.title, "通用查询 - 查询节点");
        assert!(guide.content.contains("获取局部变量"));
        assert_eq!(
            guide.url,
            "https://act.mihoyo.com/ys/ugc/tutorial/detail/server_query_nodes"
        );

        let err = service.guide("missing_page").await.unwrap_err();
        assert!(matches!(err, CatalogError::DocumentUnavailable { .. }));
    }

    #[test]
    fn routes_are_listed() {
        let service = service_over(std::path::Path::new("tests/fixtures"));
        assert_eq!(
            service.routes(),
            vec![(
                "服务器节点".to_string(),
                vec!["查询节点".to_string(), "运算节点".to_string()]
            )]
        );
    }
}
