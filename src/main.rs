//! csearch CLI - browser-driven meta search from the command line.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use csearch::{
    engines::EngineRegistry, BrowserPool, BrowserPoolConfig, CachePolicy, CoordinatorConfig,
    EngineStatus, ExecutionMode, FileCache, Pagination, PagingConfig, Search, SearchError,
    SearchQuery, SearchResponse,
};

/// csearch - search several engines at once through a headless browser
#[derive(Parser)]
#[command(name = "csearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the selected engines and print merged results
    Search(SearchArgs),

    /// List available search engines
    Engines,

    /// Manage the result cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

#[derive(Subcommand)]
enum CacheCommand {
    /// Remove every cached result
    Clear {
        /// Cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },
}

#[derive(Args)]
struct SearchArgs {
    /// Search query
    query: String,

    /// Engines to use (comma-separated, default: all)
    #[arg(short, long, value_delimiter = ',')]
    engines: Option<Vec<String>>,

    /// Maximum number of results per engine and in the merged list
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Locale for regional results, e.g. en-GB or ja-JP
    #[arg(short = 'L', long)]
    locale: Option<String>,

    /// Run engines one at a time instead of in parallel
    #[arg(long)]
    sequential: bool,

    /// Per-engine timeout in seconds
    #[arg(short, long, default_value = "30")]
    timeout: u64,

    /// Whole-query timeout in seconds
    #[arg(long, default_value = "60")]
    query_timeout: u64,

    /// Maximum result pages per engine
    #[arg(long, default_value = "5")]
    max_pages: u32,

    /// Skip cached results and fetch fresh ones (the fresh results are still cached)
    #[arg(long, visible_alias = "refresh", conflicts_with = "cache_only")]
    no_cache: bool,

    /// Only serve cached results; fail on a miss
    #[arg(long)]
    cache_only: bool,

    /// Cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Path to the Chrome/Chromium executable
    #[arg(long)]
    chrome: Option<PathBuf>,

    /// Proxy URL for the browser (e.g. socks5://127.0.0.1:1080)
    #[arg(short, long)]
    proxy: Option<String>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Print per-engine status to stderr
    #[arg(long)]
    debug: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    match cli.command {
        Commands::Search(args) => run_search(args).await,
        Commands::Engines => list_engines(),
        Commands::Cache {
            command: CacheCommand::Clear { cache_dir },
        } => clear_cache(cache_dir).await,
    }
}

fn init_logging(verbose: bool) -> Result<()> {
    if verbose {
        let subscriber = FmtSubscriber::builder()
            .with_max_level(Level::DEBUG)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    }
    Ok(())
}

fn list_engines() -> Result<()> {
    println!("Available search engines:\n");
    for descriptor in EngineRegistry::builtin().resolve(&[])? {
        let paging = match &descriptor.pagination {
            Pagination::UrlParam { param, .. } => format!("pages via '{}'", param),
            Pagination::Scroll => "infinite scroll".to_string(),
            Pagination::None => "single page".to_string(),
        };
        println!("    {:<8} - {} ({})", descriptor.name, descriptor.url_template, paging);
    }
    println!();
    println!("Usage: csearch search \"query\" -e google,bing");
    Ok(())
}

async fn clear_cache(cache_dir: Option<PathBuf>) -> Result<()> {
    let cache = FileCache::new(cache_dir.unwrap_or_else(FileCache::default_dir));
    let removed = cache.clear().await?;
    println!(
        "Removed {} cached searches from {}",
        removed,
        cache.dir().display()
    );
    Ok(())
}

async fn run_search(args: SearchArgs) -> Result<()> {
    let pool = Arc::new(BrowserPool::new(BrowserPoolConfig {
        headless: !args.headful,
        chrome_path: args.chrome.clone(),
        proxy_url: args.proxy.clone(),
        accept_language: args.locale.as_deref().map(accept_language),
        ..Default::default()
    }));

    let mut search = Search::new(pool.clone());
    search.set_config(CoordinatorConfig {
        engine_timeout: Duration::from_secs(args.timeout),
        query_timeout: Duration::from_secs(args.query_timeout),
        paging: PagingConfig {
            max_pages: args.max_pages,
            ..Default::default()
        },
    });

    let dir = args.cache_dir.clone().unwrap_or_else(FileCache::default_dir);
    search.set_cache(Arc::new(FileCache::new(dir)));
    search.set_cache_policy(cache_policy(&args));

    let mut query = SearchQuery::new(&args.query)
        .with_limit(args.limit)
        .with_mode(if args.sequential {
            ExecutionMode::Sequential
        } else {
            ExecutionMode::Parallel
        });
    if let Some(engines) = &args.engines {
        query = query.with_engines(engines.iter().map(|e| e.trim()));
    }
    if let Some(locale) = &args.locale {
        query = query.with_locale(locale.as_str());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Interrupted, stopping engines...");
            on_interrupt.cancel();
        }
    });

    let outcome = search.search(query, &cancel).await;
    pool.shutdown().await;

    let response = match outcome {
        Ok(response) => response,
        Err(SearchError::AllEnginesFailed(statuses)) => {
            print_statuses(&statuses);
            anyhow::bail!("Every engine failed; nothing to show");
        }
        Err(SearchError::CacheMiss(key)) => {
            anyhow::bail!("No cached results for this search (key {})", key);
        }
        Err(e) => return Err(e.into()),
    };

    if args.debug {
        print_statuses(&response.report.engines);
    }
    print_response(&response, args.format)
}

fn cache_policy(args: &SearchArgs) -> CachePolicy {
    if args.cache_only {
        CachePolicy::ReadOnly
    } else if args.no_cache {
        CachePolicy::ForceRefresh
    } else {
        CachePolicy::Default
    }
}

fn print_response(response: &SearchResponse, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let source = if response.is_cached() { "cached" } else { "fresh" };
            println!(
                "\nSearch results for \"{}\" ({} results, {} in {}ms):\n",
                response.query,
                response.items().len(),
                source,
                response.duration_ms
            );

            for (i, result) in response.items().iter().enumerate() {
                println!("{}. {}", i + 1, result.title);
                println!("   URL: {}", result.original_url);
                if !result.description.is_empty() {
                    println!("   {}", truncate(&result.description, 150));
                }
                let engines: Vec<&str> = result.engines.iter().map(String::as_str).collect();
                println!(
                    "   Engines: {} | Score: {} | Best position: {}",
                    engines.join(", "),
                    result.score,
                    result.best_position
                );
                println!();
            }
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?);
        }
        OutputFormat::Compact => {
            for result in response.items() {
                println!("{}\t{}\t{}", result.score, result.title, result.original_url);
            }
        }
    }
    Ok(())
}

fn print_statuses(statuses: &[EngineStatus]) {
    eprintln!("Engine status:");
    for status in statuses {
        let state = serde_json::to_value(status.state)
            .ok()
            .and_then(|v| v.as_str().map(str::to_string))
            .unwrap_or_default();
        let error = status
            .error
            .as_ref()
            .map(|e| format!("  {}", e))
            .unwrap_or_default();
        eprintln!(
            "  {:<8} {:<10} {:>3} results {:>6}ms{}",
            status.engine, state, status.count, status.elapsed_ms, error
        );
    }
}

/// "de-DE" -> "de-DE,de;q=0.9"
fn accept_language(locale: &str) -> String {
    let locale = locale.trim().replace('_', "-");
    match locale.split_once('-') {
        Some((lang, _)) => format!("{},{};q=0.9", locale, lang),
        None => locale,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
