use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::fetcher::DocumentFetcher;
use crate::model::{CacheKey, NodeRecord, PageResult};
use crate::parser;
use crate::router::QueryRouter;

/// Source of extraction timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Extracted catalogs keyed by query. Entries never expire and are only
/// replaced wholesale; empty catalogs are never stored.
///
/// The lock is released before fetching, so two misses on the same key can
/// both fetch. The later store wins.
pub struct PageCache<F> {
    config: Arc<CatalogConfig>,
    fetcher: F,
    clock: Arc<dyn Clock>,
    entries: Mutex<HashMap<CacheKey, Arc<PageResult>>>,
}

impl<F: DocumentFetcher> PageCache<F> {
    pub fn new(config: Arc<CatalogConfig>, fetcher: F, clock: Arc<dyn Clock>) -> Self {
        PageCache {
            config,
            fetcher,
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub async fn get_or_fetch(&self, key: &CacheKey) -> Result<Arc<PageResult>, CatalogError> {
        let cached = self.lock().get(key).cloned();
        if let Some(hit) = cached {
            debug!("Cache hit for {}", key);
            return Ok(hit);
        }
        debug!("Cache miss for {}", key);

        let document_id = QueryRouter::new(&self.config.routes).resolve(&key.axis_a, &key.axis_b)?;
        let tree = self.fetcher.fetch(document_id, &self.config.root_selector).await?;

        let extracted_at = self.clock.now();
        let records = parser::process_document(&tree, &self.config.markers, extracted_at);
        let page = Arc::new(PageResult {
            key: key.clone(),
            records,
            extracted_at,
        });

        if page.is_empty() {
            debug!("No records extracted for {}, not caching", key);
        } else {
            info!("Cached {} records for {}", page.records.len(), key);
            self.lock().insert(key.clone(), Arc::clone(&page));
        }

        Ok(page)
    }

    /// Exact name match over the catalog for `key`, fetching it if needed.
    pub async fn find_by_name(&self, key: &CacheKey, name: &str) -> Result<NodeRecord, CatalogError> {
        let page = self.get_or_fetch(key).await?;
        page.find(name).cloned().ok_or_else(|| CatalogError::NotFound {
            name: name.to_string(),
        })
    }

    /// Drop one entry so the next query refetches. Returns whether it existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.lock().remove(key).is_some()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<CacheKey, Arc<PageResult>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::TimeZone;

    use super::*;
    use crate::parser::test_support::english_markers;

    const ALPHA_BETA: &str = "<div class='doc-view'><h1>X</h1>\
        <h2>1. Alpha</h2><p>does alpha</p>\
        <table><tr><th>kind</th><th>name</th><th>type</th><th>notes</th></tr>\
        <tr><td>in</td><td>id</td><td>string</td><td>the id</td></tr></table>\
        <h2>Beta</h2><p>does beta</p></div>";

    struct CountingFetcher {
        html: String,
        calls: Arc<AtomicUsize>,
    }

    impl DocumentFetcher for CountingFetcher {
        async fn fetch_html(&self, document_id: &str) -> Result<String, CatalogError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if document_id == "doc-down" {
                return Err(CatalogError::unavailable(document_id, "timeout"));
            }
            Ok(self.html.clone())
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap()
    }

    fn cache_with(html: &str) -> (PageCache<CountingFetcher>, Arc<AtomicUsize>) {
        let mut by_b = BTreeMap::new();
        by_b.insert("p".to_string(), "doc-p".to_string());
        by_b.insert("q".to_string(), "doc-q".to_string());
        by_b.insert("r".to_string(), "doc-r".to_string());
        by_b.insert("down".to_string(), "doc-down".to_string());
        let mut routes = BTreeMap::new();
        routes.insert("A".to_string(), by_b);

        let config = CatalogConfig {
            routes,
            markers: english_markers(),
            ..Default::default()
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let fetcher = CountingFetcher {
            html: html.to_string(),
            calls: Arc::clone(&calls),
        };
        let cache = PageCache::new(Arc::new(config), fetcher, Arc::new(FixedClock(fixed_time())));
        (cache, calls)
    }

    #[tokio::test]
    async fn second_query_is_served_from_cache() {
        let (cache, calls) = cache_with(ALPHA_BETA);
        let key = CacheKey::new("A", "p");

        let first = cache.get_or_fetch(&key).await.unwrap();
        let second = cache.get_or_fetch(&key).await.unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(first.records.len(), 2);
        assert_eq!(first.extracted_at, fixed_time());
        assert_eq!(first.records[0].extracted_at, fixed_time());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn empty_result_is_refetched() {
        let (cache, calls) = cache_with("<div class='doc-view'><p>nothing here</p></div>");
        let key = CacheKey::new("A", "p");

        assert!(cache.get_or_fetch(&key).await.unwrap().is_empty());
        assert!(cache.get_or_fetch(&key).await.unwrap().is_empty());

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn unsupported_query_never_fetches() {
        let (cache, calls) = cache_with(ALPHA_BETA);
        match cache.get_or_fetch(&CacheKey::new("A", "bogus")).await {
            Err(CatalogError::UnsupportedQuery { valid, .. }) => {
                assert_eq!(valid, vec!["down", "p", "q", "r"]);
            }
            other => panic!("expected UnsupportedQuery, got {:?}", other.map(|_| ())),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_is_not_cached() {
        let (cache, calls) = cache_with(ALPHA_BETA);
        let key = CacheKey::new("A", "down");

        for _ in 0..2 {
            let err = cache.get_or_fetch(&key).await.map(|_| ()).unwrap_err();
            assert!(err.is_retryable());
        }
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn keys_are_cached_independently() {
        let (cache, calls) = cache_with(ALPHA_BETA);
        cache.get_or_fetch(&CacheKey::new("A", "p")).await.unwrap();
        cache.get_or_fetch(&CacheKey::new("A", "q")).await.unwrap();
        cache.get_or_fetch(&CacheKey::new("A", "p")).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test]
    async fn find_by_name_goes_through_cache() {
        let (cache, calls) = cache_with(ALPHA_BETA);
        let key = CacheKey::new("A", "p");

        let alpha = cache.find_by_name(&key, "Alpha").await.unwrap();
        assert_eq!(alpha.inputs[0].name, "id");

        match cache.find_by_name(&key, "Gamma").await {
            Err(CatalogError::NotFound { name }) => assert_eq!(name, "Gamma"),
            other => panic!("expected NotFound, got {:?}", other.map(|r| r.name)),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn invalidate_forces_refetch() {
        let (cache, calls) = cache_with(ALPHA_BETA);
        let key = CacheKey::new("A", "p");

        cache.get_or_fetch(&key).await.unwrap();
        assert!(cache.invalidate(&key));
        assert!(!cache.invalidate(&key));
        cache.get_or_fetch(&key).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
