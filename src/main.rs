mod cache;
mod config;
mod error;
mod fetcher;
mod guide;
mod model;
mod parser;
mod render;
mod router;
mod service;

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

use config::CatalogConfig;
use error::CatalogError;
use fetcher::{AnyFetcher, BrowserFetcher, DocumentFetcher, FileFetcher, HttpFetcher};
use model::CacheKey;
use service::CatalogService;

#[derive(Parser)]
#[command(name = "nodegraph_catalog", about = "Node catalog extracted from the node graph guide")]
struct Cli {
    /// Config file layered over the built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Read saved pages from <DIR>/<document_id>.html instead of fetching
    #[arg(long, global = true, value_name = "DIR")]
    html_dir: Option<PathBuf>,
    /// Fetch pages over plain HTTP instead of rendering them in headless Chrome
    #[arg(long, global = true, conflicts_with = "html_dir")]
    static_http: bool,
    /// Print JSON instead of markdown
    #[arg(long, global = true)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List every client type and the node types it supports
    Routes,
    /// Nodes documented for a client type and node type
    List { axis_a: String, axis_b: String },
    /// Full record for one node
    Show {
        axis_a: String,
        axis_b: String,
        name: String,
    },
    /// Guide documents listed in the navigation sidebar
    Nav,
    /// Title and text of one guide document
    Guide { id: String },
    /// Answer `list A B` / `show A B NAME` / `nav` / `guide ID` /
    /// `refresh [A B]` lines from stdin through one cache
    Batch,
}

#[derive(Debug, PartialEq)]
enum Query {
    List { axis_a: String, axis_b: String },
    Show { axis_a: String, axis_b: String, name: String },
    Nav,
    Guide { id: String },
    Refresh { axis_a: String, axis_b: String },
    RefreshAll,
}

impl FromStr for Query {
    type Err = anyhow::Error;

    fn from_str(line: &str) -> anyhow::Result<Self> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        match tokens.as_slice() {
            ["list", a, b] => Ok(Query::List {
                axis_a: a.to_string(),
                axis_b: b.to_string(),
            }),
            ["show", a, b, name @ ..] if !name.is_empty() => Ok(Query::Show {
                axis_a: a.to_string(),
                axis_b: b.to_string(),
                name: name.join(" "),
            }),
            ["nav"] => Ok(Query::Nav),
            ["guide", id] => Ok(Query::Guide { id: id.to_string() }),
            ["refresh"] => Ok(Query::RefreshAll),
            ["refresh", a, b] => Ok(Query::Refresh {
                axis_a: a.to_string(),
                axis_b: b.to_string(),
            }),
            _ => bail!(
                "expected `list A B`, `show A B NAME`, `nav`, `guide ID` or `refresh [A B]`, got {:?}",
                line.trim()
            ),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();

    let config = Arc::new(CatalogConfig::load(cli.config.as_deref())?);
    // `routes` is answered from configuration, so it never starts a browser.
    let offline = matches!(cli.command, Commands::Routes);
    let fetcher = match &cli.html_dir {
        Some(dir) => AnyFetcher::File(FileFetcher::new(dir)),
        None if cli.static_http || offline => {
            AnyFetcher::Http(HttpFetcher::new(Arc::clone(&config)).context("Failed to build HTTP client")?)
        }
        None => AnyFetcher::Browser(
            BrowserFetcher::launch(Arc::clone(&config))
                .await
                .context("No usable Chrome; set browser_executable, or use --static-http or --html-dir")?,
        ),
    };
    let service = CatalogService::new(config, fetcher);

    match cli.command {
        Commands::Routes => print!("{}", routes_output(&service, cli.json)?),
        Commands::List { axis_a, axis_b } => {
            print!("{}", answer(&service, &Query::List { axis_a, axis_b }, cli.json).await?);
        }
        Commands::Show { axis_a, axis_b, name } => {
            let query = Query::Show { axis_a, axis_b, name };
            print!("{}", answer(&service, &query, cli.json).await?);
        }
        Commands::Nav => print!("{}", answer(&service, &Query::Nav, cli.json).await?),
        Commands::Guide { id } => print!("{}", answer(&service, &Query::Guide { id }, cli.json).await?),
        Commands::Batch => {
            let (answered, failed) = run_batch(&service, cli.json).await?;
            eprintln!("{} queries answered, {} failed", answered, failed);
            if !service.cache().is_empty() {
                eprintln!("{} catalogs cached", service.cache().len());
            }
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {}", format_duration(elapsed));
    }

    Ok(())
}

/// Resolve one query and render it. A spinner covers the fetch.
async fn answer<F: DocumentFetcher>(
    service: &CatalogService<F>,
    query: &Query,
    json: bool,
) -> anyhow::Result<String> {
    let out = match query {
        Query::List { axis_a, axis_b } => {
            let spinner = spinner(format!("Loading {} / {}", axis_a, axis_b))?;
            let items = service.list_catalog(axis_a, axis_b).await;
            spinner.finish_and_clear();
            let items = items?;
            if json {
                serde_json::to_string_pretty(&items)? + "\n"
            } else {
                render::catalog_markdown(axis_a, axis_b, &items)
            }
        }
        Query::Show { axis_a, axis_b, name } => {
            let spinner = spinner(format!("Loading {} / {} / {}", axis_a, axis_b, name))?;
            let record = service.get_record(axis_a, axis_b, name).await;
            spinner.finish_and_clear();
            let record = record?;
            if json {
                serde_json::to_string_pretty(&record)? + "\n"
            } else {
                render::record_markdown(&record, &service.config().markers)
            }
        }
        Query::Nav => {
            let spinner = spinner("Loading navigation".to_string())?;
            let items = service.navigation().await;
            spinner.finish_and_clear();
            let items = items?;
            if json {
                serde_json::to_string_pretty(&items)? + "\n"
            } else {
                render::navigation_markdown(&items)
            }
        }
        Query::Guide { id } => {
            let spinner = spinner(format!("Loading guide {}", id))?;
            let guide = service.guide(id).await;
            spinner.finish_and_clear();
            let guide = guide?;
            if json {
                serde_json::to_string_pretty(&guide)? + "\n"
            } else {
                render::guide_markdown(&guide)
            }
        }
        Query::Refresh { axis_a, axis_b } => {
            let dropped = service.cache().invalidate(&CacheKey::new(axis_a.as_str(), axis_b.as_str()));
            if json {
                serde_json::json!({ "refreshed": dropped }).to_string() + "\n"
            } else if dropped {
                format!("Dropped cached catalog {} / {}\n\n", axis_a, axis_b)
            } else {
                format!("Nothing cached for {} / {}\n\n", axis_a, axis_b)
            }
        }
        Query::RefreshAll => {
            let dropped = service.cache().len();
            service.cache().clear();
            if json {
                serde_json::json!({ "refreshed": dropped }).to_string() + "\n"
            } else {
                format!("Dropped {} cached catalogs\n\n", dropped)
            }
        }
    };

    Ok(out)
}

fn spinner(message: String) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(message);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn routes_output<F: DocumentFetcher>(service: &CatalogService<F>, json: bool) -> anyhow::Result<String> {
    let routes = service.routes();
    if json {
        let map: BTreeMap<_, _> = routes.into_iter().collect();
        Ok(serde_json::to_string_pretty(&map)? + "\n")
    } else {
        Ok(render::routes_text(&routes))
    }
}

/// Answers stdin queries in order. A failed query prints its error in place
/// and does not stop the batch.
async fn run_batch<F: DocumentFetcher>(service: &CatalogService<F>, json: bool) -> anyhow::Result<(usize, usize)> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let (mut answered, mut failed) = (0, 0);

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let result = match line.parse::<Query>() {
            Ok(query) => answer(service, &query, json).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(out) => {
                answered += 1;
                print!("{}", out);
            }
            Err(e) => {
                failed += 1;
                let retryable = e
                    .downcast_ref::<CatalogError>()
                    .is_some_and(CatalogError::is_retryable);
                warn!("Query {:?} failed (retryable: {}): {:#}", line, retryable, e);
                println!("error: {:#}\n", e);
            }
        }
    }

    Ok((answered, failed))
}

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else {
        format!("{}m {}s", secs / 60, secs % 60)
    }
}
