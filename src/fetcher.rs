use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context, Result};
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::error::CdpError;
use chromiumoxide::Page;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CatalogConfig;
use crate::error::CatalogError;
use crate::parser::tree::ContentTree;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Turns a document id into page markup. The only step of a query that
/// waits on anything.
pub trait DocumentFetcher: Send + Sync {
    fn fetch_html(&self, document_id: &str) -> impl Future<Output = Result<String, CatalogError>> + Send;

    /// Fetch and build the content tree rooted at `root_selector`.
    fn fetch(
        &self,
        document_id: &str,
        root_selector: &str,
    ) -> impl Future<Output = Result<ContentTree, CatalogError>> + Send {
        async move {
            let html = self.fetch_html(document_id).await?;
            Ok(ContentTree::from_html(&html, root_selector))
        }
    }
}

/// Loads each document in headless Chrome and waits for the content
/// container to render before reading the DOM.
pub struct BrowserFetcher {
    browser: Browser,
    handler: JoinHandle<()>,
    config: Arc<CatalogConfig>,
}

impl BrowserFetcher {
    pub async fn launch(config: Arc<CatalogConfig>) -> Result<Self> {
        let mut builder = BrowserConfig::builder()
            .request_timeout(config.fetch_timeout())
            .arg(format!("--user-agent={}", config.user_agent))
            .arg("--no-sandbox")
            .arg("--disable-gpu");
        if let Some(path) = &config.browser_executable {
            builder = builder.chrome_executable(path);
        }
        let browser_config = builder
            .build()
            .map_err(|e| anyhow!("Failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .context("Failed to launch browser")?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    debug!("Browser handler error: {}", e);
                }
            }
        });

        info!("Browser launched");
        Ok(BrowserFetcher { browser, handler, config })
    }

    /// Wait for the load event, then poll for the content container until
    /// the fetch timeout. A page without the container is still returned.
    async fn read_rendered(&self, page: &Page, url: &str) -> Result<String, CdpError> {
        page.wait_for_navigation().await?;

        let started = Instant::now();
        let timeout = self.config.fetch_timeout();
        while page.find_element(self.config.root_selector.as_str()).await.is_err() {
            if started.elapsed() >= timeout {
                warn!(
                    "{} not rendered on {} after {}s, reading page as is",
                    self.config.root_selector,
                    url,
                    timeout.as_secs()
                );
                break;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }

        page.content().await
    }
}

impl DocumentFetcher for BrowserFetcher {
    async fn fetch_html(&self, document_id: &str) -> Result<String, CatalogError> {
        let url = self.config.document_url(document_id);
        info!("Rendering document {}", url);

        let page = self.browser.new_page(url.as_str()).await.map_err(|e| {
            warn!("Opening {} failed: {}", url, e);
            CatalogError::unavailable(document_id, e)
        })?;

        let html = self.read_rendered(&page, &url).await;
        if let Err(e) = page.close().await {
            debug!("Closing page {} failed: {}", url, e);
        }

        html.map_err(|e| {
            warn!("Rendering {} failed: {}", url, e);
            CatalogError::unavailable(document_id, e)
        })
    }
}

impl Drop for BrowserFetcher {
    fn drop(&mut self) {
        self.handler.abort();
    }
}

/// Fetches the guide over plain HTTP. Serves the markup as delivered, so
/// pages that render client-side come back without their content.
pub struct HttpFetcher {
    client: reqwest::Client,
    config: Arc<CatalogConfig>,
}

impl HttpFetcher {
    pub fn new(config: Arc<CatalogConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.fetch_timeout())
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(HttpFetcher { client, config })
    }
}

impl DocumentFetcher for HttpFetcher {
    async fn fetch_html(&self, document_id: &str) -> Result<String, CatalogError> {
        let url = self.config.document_url(document_id);
        info!("Fetching document {}", url);

        let response = self.client.get(&url).send().await.map_err(|e| {
            warn!("Fetch failed for {}: {}", url, e);
            CatalogError::unavailable(document_id, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            warn!("Fetch for {} returned {}", url, status);
            return Err(CatalogError::unavailable(document_id, format!("HTTP {}", status)));
        }

        response.text().await.map_err(|e| {
            warn!("Reading body of {} failed: {}", url, e);
            CatalogError::unavailable(document_id, e)
        })
    }
}

/// Reads saved pages from `<dir>/<document_id>.html`.
pub struct FileFetcher {
    dir: PathBuf,
}

impl FileFetcher {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileFetcher { dir: dir.into() }
    }
}

impl DocumentFetcher for FileFetcher {
    async fn fetch_html(&self, document_id: &str) -> Result<String, CatalogError> {
        let path = self.dir.join(format!("{}.html", document_id));
        info!("Reading document {}", path.display());

        tokio::fs::read_to_string(&path).await.map_err(|e| {
            warn!("Cannot read {}: {}", path.display(), e);
            CatalogError::unavailable(document_id, format!("{}: {}", path.display(), e))
        })
    }
}

/// Whichever source the command line selected.
pub enum AnyFetcher {
    Browser(BrowserFetcher),
    Http(HttpFetcher),
    File(FileFetcher),
}

impl DocumentFetcher for AnyFetcher {
    async fn fetch_html(&self, document_id: &str) -> Result<String, CatalogError> {
        match self {
            AnyFetcher::Browser(f) => f.fetch_html(document_id).await,
            AnyFetcher::Http(f) => f.fetch_html(document_id).await,
            AnyFetcher::File(f) => f.fetch_html(document_id).await,
        }
    }
}
