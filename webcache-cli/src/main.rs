//! WEBCACHE CLI
//!
//! Command-line front end for the cache-aside page fetcher.

mod config;

use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use webcache_core::constants::DEMO_URL;
use webcache_core::keys::KeySpace;
use webcache_core::traits::KeyValueStore;
use webcache_core::types::FetchResult;
use webcache_fetch::{describe_failure, CachedFetcher, FetcherExt};
use webcache_http::HttpFetcher;

use crate::config::AppConfig;

const PREVIEW_CHARS: usize = 120;

/// WEBCACHE - cached page fetches with per-URL access counts
#[derive(Parser, Debug)]
#[command(name = "webcache")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Redis URL (defaults to REDIS_URL, in-memory store when unset)
    #[arg(long, global = true)]
    redis_url: Option<String>,

    /// Cached result lifetime in seconds
    #[arg(long, global = true)]
    ttl: Option<u64>,

    /// Prefix for every store key
    #[arg(long, global = true)]
    namespace: Option<String>,

    /// HTTP request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a page through the cache
    Get {
        /// Page URL
        url: String,
        /// Print the whole body instead of a preview
        #[arg(long)]
        full: bool,
    },

    /// Show how many times a URL has been requested
    Count {
        /// Page URL
        url: String,
    },

    /// Fetch twice, wait out the TTL, then fetch again
    Demo {
        /// Page URL
        #[arg(default_value = DEMO_URL)]
        url: String,
        /// Seconds to wait before the third call (defaults to TTL + 1)
        #[arg(long)]
        wait: Option<u64>,
    },
}

impl Cli {
    /// Layers explicit flags over the env configuration.
    fn apply_overrides(&self, mut config: AppConfig) -> AppConfig {
        if let Some(url) = &self.redis_url {
            config.redis_url = Some(url.clone());
        }
        if let Some(ttl) = self.ttl {
            config.ttl_seconds = ttl;
        }
        if let Some(ns) = &self.namespace {
            config.namespace = Some(ns.clone());
        }
        if let Some(timeout) = self.timeout {
            config.http_timeout_seconds = timeout;
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "webcache=debug,webcache_fetch=debug,webcache_store=debug,webcache_http=debug,info"
    } else {
        "webcache=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = cli.apply_overrides(AppConfig::from_env()?);

    match cli.command {
        Commands::Get { ref url, full } => cmd_get(&config, url, full).await,
        Commands::Count { ref url } => cmd_count(&config, url).await,
        Commands::Demo { ref url, wait } => cmd_demo(&config, url, wait).await,
    }
}

async fn build_fetcher(config: &AppConfig) -> Result<CachedFetcher<HttpFetcher>> {
    let http = HttpFetcher::with_config(config.http_config())
        .context("Failed to create HTTP client")?;
    let store = config.connect_store().await?;
    let page = http
        .cached_with(store, config.fetcher_config())
        .context("Invalid cache configuration")?;
    Ok(page)
}

/// Fetch one page through the cache
async fn cmd_get(config: &AppConfig, url: &str, full: bool) -> Result<()> {
    let page = build_fetcher(config).await?;

    let start = Instant::now();
    match page.invoke_detailed(url).await {
        Ok(result) => {
            print_result(&result, start.elapsed());
            println!();
            if full {
                println!("{}", result.body);
            } else {
                println!("{}", preview(&result.body, PREVIEW_CHARS).dimmed());
            }
        }
        Err(e) => println!("{}", describe_failure(url, &e).red()),
    }

    let count = page.access_count(url).await?;
    println!("   Access count: {}", count.to_string().bold());
    Ok(())
}

/// Print the access count for a URL
async fn cmd_count(config: &AppConfig, url: &str) -> Result<()> {
    if config.redis_url.is_none() {
        println!(
            "{}",
            "⚠ No Redis configured: counts from other processes are not visible".yellow()
        );
    }

    let fetcher_config = config.fetcher_config();
    fetcher_config.validate()?;
    let store = config.connect_store().await?;
    let (count, cached) = read_count(store.as_ref(), &fetcher_config.keys, url).await?;

    println!("{}", url.cyan().bold());
    println!("   Access count: {}", count.to_string().bold());
    println!(
        "   Cached:       {}",
        if cached { "yes".green() } else { "no".normal() }
    );
    Ok(())
}

/// Reads the access counter and cache state for `url` straight from the store.
async fn read_count(
    store: &dyn KeyValueStore,
    keys: &KeySpace,
    url: &str,
) -> Result<(u64, bool)> {
    let count = match store.get(&keys.count_key(url)).await? {
        None => 0,
        Some(raw) => raw
            .parse()
            .with_context(|| format!("Counter for {} is not a number: {}", url, raw))?,
    };
    let cached = store.exists(&keys.result_key(url)).await?;
    Ok((count, cached))
}

/// Walk through a store, a hit and an expiry
async fn cmd_demo(config: &AppConfig, url: &str, wait: Option<u64>) -> Result<()> {
    println!("{}", "🌐 WEBCACHE demo".cyan().bold());
    println!("   URL: {}", url);
    println!("   TTL: {}s", config.ttl_seconds);
    println!();

    let page = build_fetcher(config).await?;

    demo_call(&page, url, "1. First call").await;
    demo_call(&page, url, "2. Second call").await;

    let wait = wait.unwrap_or(config.ttl_seconds + 1);
    let pb = ProgressBar::new(wait);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len}s waiting for expiry")?
            .progress_chars("#>-"),
    );
    for _ in 0..wait {
        tokio::time::sleep(Duration::from_secs(1)).await;
        pb.inc(1);
    }
    pb.finish_and_clear();

    demo_call(&page, url, "3. Third call").await;

    println!();
    let count = page.access_count(url).await?;
    println!("{}", "✅ Demo complete".green().bold());
    println!("   Access count: {}", count.to_string().bold());
    Ok(())
}

async fn demo_call(page: &CachedFetcher<HttpFetcher>, url: &str, label: &str) {
    println!("{}", label.bold());
    let start = Instant::now();
    match page.invoke_detailed(url).await {
        Ok(result) => {
            print_result(&result, start.elapsed());
            println!("   {}", preview(&result.body, PREVIEW_CHARS).dimmed());
        }
        Err(e) => println!("   {}", describe_failure(url, &e).red()),
    }
}

fn print_result(result: &FetchResult, elapsed: Duration) {
    let source = if result.from_cache {
        "cache hit".green()
    } else {
        "fetched".yellow()
    };
    println!(
        "   {} ({} bytes in {:.1?})",
        source,
        result.body.len(),
        elapsed
    );
}

/// First `limit` characters of `body` on one line.
fn preview(body: &str, limit: usize) -> String {
    let flat: String = body.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= limit {
        return flat;
    }
    let cut: String = flat.chars().take(limit).collect();
    format!("{}...", cut)
}
