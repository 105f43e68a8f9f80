use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer};

const DEFAULT_BASE_URL: &str = "https://act.mihoyo.com/ys/ugc/tutorial/detail/";
const DEFAULT_ROOT_SELECTOR: &str = "div.doc-view";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_NAVIGATION_DOCUMENT: &str = "mh29wpicgvh0";
const DEFAULT_NAVIGATION_SELECTOR: &str = ".tw-scrollbar";
const DEFAULT_DOCUMENT_PATH: &str = "/ys/ugc/tutorial/detail/";
const ENV_PREFIX: &str = "NODECAT";

/// axis A → axis B → document id.
pub type RouteTable = BTreeMap<String, BTreeMap<String, String>>;

/// One route as written in a config file. Routes are a list rather than a
/// nested table because the `config` crate lowercases table keys; values
/// keep their case.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteEntry {
    pub axis_a: String,
    pub axis_b: String,
    pub document: String,
}

/// Immutable configuration, built once and shared by reference.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub base_url: String,
    pub root_selector: String,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    /// Chrome/Chromium binary for the rendering fetcher; found on the system
    /// when unset.
    pub browser_executable: Option<PathBuf>,
    /// Page whose sidebar lists every guide document.
    pub navigation_document: String,
    pub navigation_selector: String,
    /// Path fragment every guide document link contains.
    pub document_path: String,
    #[serde(deserialize_with = "routes_from_entries")]
    pub routes: RouteTable,
    pub markers: Markers,
}

/// Phrases the extractor matches against document text. Defaults are the
/// guide's own wording.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Markers {
    /// Paragraphs containing any of these are never a description.
    pub boilerplate: Vec<String>,
    /// Exact role cell for inputs.
    pub input: String,
    /// Exact role cell for outputs.
    pub output: String,
    /// Nodes after the table containing any of these form the example.
    pub example: Vec<String>,
    /// A role cell containing this marks a repeated header row.
    pub header_role: String,
    /// A name cell containing this marks a repeated header row.
    pub header_name: String,
}

impl Default for Markers {
    fn default() -> Self {
        Markers {
            boilerplate: vec!["节点功能".into(), "节点参数".into(), "参数类型".into()],
            input: "入参".into(),
            output: "出参".into(),
            example: vec!["示例".into(), "用法".into()],
            header_role: "参数类型".into(),
            header_name: "参数名".into(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        CatalogConfig {
            base_url: DEFAULT_BASE_URL.into(),
            root_selector: DEFAULT_ROOT_SELECTOR.into(),
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT_SECS,
            user_agent: concat!("nodegraph_catalog/", env!("CARGO_PKG_VERSION")).into(),
            browser_executable: None,
            navigation_document: DEFAULT_NAVIGATION_DOCUMENT.into(),
            navigation_selector: DEFAULT_NAVIGATION_SELECTOR.into(),
            document_path: DEFAULT_DOCUMENT_PATH.into(),
            routes: default_routes(),
            markers: Markers::default(),
        }
    }
}

fn default_routes() -> RouteTable {
    let server = [
        ("执行节点", "mhw66orrrfkm"),
        ("事件节点", "mhn7ko01v3yw"),
        ("流程控制节点", "mhe8yn9bysd6"),
        ("查询节点", "mhwbqlrw655q"),
        ("运算节点", "mhnd4l069tk0"),
    ];
    let client = [
        ("查询节点", "mholjx05ji8w"),
        ("运算节点", "mhfmxw9fn6n6"),
        ("执行节点", "mh6obvipqv1g"),
        ("流程控制节点", "mhxppurzujfq"),
        ("其它节点", "mhor3u09y7u0"),
    ];

    let to_map = |pairs: &[(&str, &str)]| {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<BTreeMap<_, _>>()
    };

    let mut routes = RouteTable::new();
    routes.insert("服务器节点".into(), to_map(&server));
    routes.insert("客户端节点".into(), to_map(&client));
    routes
}

fn routes_from_entries<'de, D: Deserializer<'de>>(deserializer: D) -> Result<RouteTable, D::Error> {
    let entries = Vec::<RouteEntry>::deserialize(deserializer)?;
    let mut routes = RouteTable::new();
    for e in entries {
        routes.entry(e.axis_a).or_default().insert(e.axis_b, e.document);
    }
    Ok(routes)
}

impl CatalogConfig {
    /// Layer built-in defaults, an optional config file and `NODECAT_*`
    /// environment variables (`__` separates nested keys).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }
        let settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read catalog configuration")?;

        settings
            .try_deserialize::<CatalogConfig>()
            .context("Invalid catalog configuration")
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    pub fn document_url(&self, document_id: &str) -> String {
        format!("{}{}", self.base_url, document_id)
    }
}
