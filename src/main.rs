//! multisearch CLI - multi-query web search over a headless browser.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use futures::future::join_all;
use tracing::{warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use multisearch::{
    search_with_fallback, ChromeConfig, ChromeLauncher, EngineRegistry, PagePool, PoolConfig,
    PoolMode, QueryResults, Search, SearchBackend, SearchRequest,
};

/// multisearch - search several engines for several queries at once
#[derive(Parser)]
#[command(name = "multisearch")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    pool: PoolArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct PoolArgs {
    /// Page pool mode: shared, pool or per-search
    #[arg(long, global = true, default_value = "shared")]
    mode: PoolMode,

    /// Maximum open tabs in pool mode
    #[arg(long, global = true, default_value = "4")]
    capacity: usize,

    /// Navigation timeout in seconds
    #[arg(long, global = true, default_value = "30")]
    nav_timeout: u64,

    /// Show the browser window
    #[arg(long, global = true)]
    headful: bool,

    /// Path to the Chrome/Chromium executable
    #[arg(long, global = true)]
    chrome_path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Search one or more queries across engines
    Search(SearchArgs),

    /// List available search engines
    Engines,

    /// Check whether engines are reachable
    Health {
        /// Engines to check (comma-separated, default: all)
        #[arg(short, long, value_delimiter = ',')]
        engines: Option<Vec<String>>,
    },
}

#[derive(Parser)]
struct SearchArgs {
    /// Search queries
    #[arg(required = true)]
    queries: Vec<String>,

    /// Search engines to use (comma-separated, default: all)
    /// Available: bing, duckduckgo, brave, baidu
    #[arg(short, long, value_delimiter = ',')]
    engines: Option<Vec<String>>,

    /// Maximum number of results per query
    #[arg(short, long, default_value = "10")]
    limit: usize,

    /// Try engines one at a time instead of merging them
    #[arg(long)]
    fallback: bool,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,
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

    let builder = FmtSubscriber::builder().with_writer(std::io::stderr);
    if cli.verbose {
        tracing::subscriber::set_global_default(builder.with_max_level(Level::DEBUG).finish())?;
    } else {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        tracing::subscriber::set_global_default(builder.with_env_filter(filter).finish())?;
    }

    let config = PoolConfig::new(cli.pool.mode)
        .with_capacity(cli.pool.capacity)
        .with_navigation_timeout(Duration::from_secs(cli.pool.nav_timeout))
        .with_headless(!cli.pool.headful);
    let launcher = ChromeLauncher::new(ChromeConfig {
        chrome_path: cli.pool.chrome_path.clone(),
        ..Default::default()
    });
    let pool = PagePool::new(config, Arc::new(launcher))?;
    let registry = Arc::new(EngineRegistry::with_defaults(&pool)?);

    let outcome = match cli.command {
        Commands::Search(args) => run_search(args, registry).await,
        Commands::Engines => list_engines(&registry),
        Commands::Health { engines } => run_health(&registry, engines).await,
    };

    pool.shutdown().await;
    outcome
}

fn list_engines(registry: &EngineRegistry) -> Result<()> {
    println!("Available search engines:\n");
    for id in registry.ids() {
        let backend = registry.resolve(id)?;
        println!("  {:<12} {}", id, backend.name());
    }
    println!();
    println!("Usage: multisearch search \"query one\" \"query two\" -e bing,duckduckgo");
    Ok(())
}

async fn run_health(registry: &EngineRegistry, engines: Option<Vec<String>>) -> Result<()> {
    let ids = engines.unwrap_or_else(|| registry.ids().to_vec());
    let checks = ids.iter().map(|id| async move {
        match registry.get(id) {
            Some(backend) => Some(backend.health_check().await),
            None => None,
        }
    });
    let statuses = join_all(checks).await;

    for (id, status) in ids.iter().zip(statuses) {
        let label = match status {
            Some(true) => "ok",
            Some(false) => "unreachable",
            None => "unknown engine",
        };
        println!("{:<12} {}", id, label);
    }
    Ok(())
}

async fn run_search(args: SearchArgs, registry: Arc<EngineRegistry>) -> Result<()> {
    let backends = args
        .engines
        .unwrap_or_else(|| registry.ids().to_vec());
    let request = SearchRequest::new(args.queries, args.limit, backends);
    request.validate()?;

    let batches = if args.fallback {
        run_fallback(&request, &registry).await
    } else {
        Search::new(registry).run(&request).await?
    };

    match args.format {
        OutputFormat::Text => print_text(&batches),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&batches)?),
        OutputFormat::Compact => {
            for batch in &batches {
                for result in &batch.results {
                    println!("{}\t{}\t{}", batch.query, result.title, result.url);
                }
            }
        }
    }

    Ok(())
}

async fn run_fallback(request: &SearchRequest, registry: &EngineRegistry) -> Vec<QueryResults> {
    let chain: Vec<Arc<dyn SearchBackend>> = request
        .backends
        .iter()
        .filter_map(|id| match registry.resolve(id) {
            Ok(backend) => Some(backend),
            Err(e) => {
                warn!(error = %e, "Left out of fallback chain");
                None
            }
        })
        .collect();

    let mut batches = Vec::with_capacity(request.queries.len());
    for query in &request.queries {
        let query = query.trim();
        let results = match search_with_fallback(&chain, query, request.limit).await {
            Ok(results) => results,
            Err(e) => {
                eprintln!("All engines failed for \"{}\": {}", query, e);
                Vec::new()
            }
        };
        batches.push(QueryResults::new(query, request.backends.clone(), results));
    }
    batches
}

fn print_text(batches: &[QueryResults]) {
    for batch in batches {
        println!(
            "\nResults for \"{}\" ({} results from {}):\n",
            batch.query,
            batch.total_results,
            batch.backends.join(", ")
        );

        for (i, result) in batch.results.iter().enumerate() {
            println!("{}. {}", i + 1, result.title);
            println!("   URL: {}", result.url);
            if !result.description.is_empty() {
                let description = if result.description.chars().count() > 150 {
                    let cut: String = result.description.chars().take(150).collect();
                    format!("{}...", cut)
                } else {
                    result.description.clone()
                };
                println!("   {}", description);
            }
            println!("   Engine: {} | Source: {}", result.engine, result.source);
            println!();
        }
    }
}
