//! # SpeedScale CLI (`speedscale`)
//!
//! Terminal front end for the SpeedScale client. Every command loads the
//! config, opens the settings database, rehydrates the session, and drives
//! the orchestrator or poller once.
//!
//! ## Usage
//!
//! ```bash
//! speedscale --config ./config/speedscale.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `speedscale search "<query>"` | Search the catalog and show the serving tier |
//! | `speedscale product <id>` | Show one product and its similar items |
//! | `speedscale health` | Run one health check |
//! | `speedscale trending` | Fetch trending search terms |
//! | `speedscale watch` | Poll health and trending until interrupted |
//! | `speedscale history` | Show the request ledger |
//! | `speedscale history-clear` | Empty the request ledger |
//! | `speedscale stats` | Dashboard summary of the ledger |
//! | `speedscale endpoint` | Show the current endpoint |
//! | `speedscale endpoint-set <url>` | Change the endpoint |
//!
//! ## Examples
//!
//! ```bash
//! # Point the client at a gateway
//! speedscale endpoint-set http://gateway.local:8000
//!
//! # Search, falling back to simulated data if the backend is down
//! speedscale search "lamp" --fallback-demo
//!
//! # Work fully offline
//! speedscale --demo search "desk"
//! ```

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use speedscale::app::App;
use speedscale::config;
use speedscale::orchestrator::ViewModel;
use speedscale::stats;
use speedscale::telemetry;
use speedscale_core::models::{HealthStatus, Product};

/// SpeedScale: search a catalog and see whether the cache or the database
/// answered.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/speedscale.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "speedscale",
    about = "SpeedScale: catalog search client with cache/storage tier attribution",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/speedscale.toml`. A missing file means all
    /// defaults.
    #[arg(long, global = true, default_value = "./config/speedscale.toml")]
    config: PathBuf,

    /// Serve simulated data instead of calling the backend.
    #[arg(long, global = true)]
    demo: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search the catalog.
    Search {
        /// The search query string.
        query: String,

        /// On failure, switch to demo mode and rerun the query.
        #[arg(long)]
        fallback_demo: bool,
    },

    /// Show a product with its similar items.
    Product {
        /// Product identifier.
        id: String,
    },

    /// Run one health check against the current endpoint.
    Health,

    /// Fetch trending search terms.
    Trending,

    /// Poll health and trending until Ctrl-C or SIGTERM.
    Watch,

    /// Show the request ledger, newest first.
    History {
        /// Maximum number of entries to show.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Empty the request ledger.
    HistoryClear,

    /// Dashboard summary of the request ledger.
    Stats,

    /// Show the current endpoint and any sanitizer warning.
    Endpoint,

    /// Change the endpoint. Unsafe input falls back to the default.
    EndpointSet {
        /// New endpoint: an http(s) URL or a root-relative path.
        url: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(&cli.config)?;
    telemetry::init_tracing(&cfg.logging);

    let app = App::open(&cfg, cli.demo).await?;
    if let Some(reason) = app.session.endpoint_warning() {
        eprintln!("warning: {}", reason.warning());
    }

    match cli.command {
        Commands::Search {
            query,
            fallback_demo,
        } => {
            let orch = &app.orchestrator;
            orch.search(&query).await;
            if fallback_demo && orch.snapshot().error.is_some() && !app.session.demo_mode() {
                warn!(query = %query, "search failed; retrying in demo mode");
                orch.retry_in_demo_mode().await;
            }
            print_results(&orch.snapshot(), app.session.demo_mode())?;
        }
        Commands::Product { id } => {
            app.orchestrator.view_product(&id).await;
            print_product(&app.orchestrator.snapshot())?;
        }
        Commands::Health => {
            app.poller.check_health(false).await;
            print_health(app.poller.health().as_ref());
        }
        Commands::Trending => {
            app.poller.refresh_trending().await;
            print_trending(&app.poller.trending());
        }
        Commands::Watch => {
            run_watch(&app).await;
        }
        Commands::History { limit } => {
            let entries = app.session.history();
            if entries.is_empty() {
                println!("No requests recorded.");
            }
            for e in entries.iter().take(limit.unwrap_or(entries.len())) {
                println!(
                    "{}  {:<5} {:>6}ms  {:<36} {}",
                    stats::format_ts(&e.timestamp),
                    if e.is_cache { "CACHE" } else { "DISK" },
                    e.latency_ms,
                    e.action,
                    e.source
                );
            }
        }
        Commands::HistoryClear => {
            app.session.clear_history().await?;
            println!("History cleared.");
        }
        Commands::Stats => {
            stats::print_stats(&app.session);
        }
        Commands::Endpoint => {
            let endpoint = app.session.endpoint();
            println!("{}", endpoint);
            if endpoint.starts_with('/') {
                println!("(resolves to {})", app.session.base_url()?);
            }
            if app.session.endpoint() != app.session.default_endpoint() {
                println!("(default: {})", app.session.default_endpoint());
            }
        }
        Commands::EndpointSet { url } => {
            let sanitized = app.session.set_endpoint(&url).await;
            if let Some(reason) = sanitized.reason {
                eprintln!("warning: {}", reason.warning());
            }
            println!("Endpoint set to {}", sanitized.value);
        }
    }

    Ok(())
}

async fn run_watch(app: &App) {
    let token = CancellationToken::new();
    let handle = app.poller.clone().start(token.clone());
    let mut health = app.poller.subscribe_health();
    let mut trending = app.poller.subscribe_trending();

    let shutdown = wait_for_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            changed = health.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = health.borrow_and_update().clone();
                print_health(snapshot.as_ref());
            }
            changed = trending.changed() => {
                if changed.is_err() {
                    break;
                }
                let terms = trending.borrow_and_update().clone();
                print_trending(&terms);
            }
        }
    }

    handle.shutdown().await;
}

/// Resolve on SIGINT or (on unix) SIGTERM.
async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received Ctrl+C"),
        _ = terminate => info!("received SIGTERM"),
    }
}

fn print_results(vm: &ViewModel, demo: bool) -> anyhow::Result<()> {
    if let Some(err) = &vm.error {
        anyhow::bail!("{}", err);
    }
    let Some(result) = &vm.result else {
        println!("No results.");
        return Ok(());
    };

    println!(
        "{} result(s) from {} in {}{}  [{}]",
        result.count,
        result.source,
        result.time,
        if demo { " (demo)" } else { "" },
        vm.network_path
    );
    println!();
    for (i, p) in result.data.iter().enumerate() {
        println!("{}. {}", i + 1, format_product_line(p));
        println!("   id: {}", p.id);
    }
    Ok(())
}

fn print_product(vm: &ViewModel) -> anyhow::Result<()> {
    if let Some(err) = &vm.error {
        anyhow::bail!("{}", err);
    }
    let Some(envelope) = &vm.product else {
        println!("No product loaded.");
        return Ok(());
    };
    let p = &envelope.data;

    println!("{}", p.name);
    println!("{}", "=".repeat(p.name.chars().count()));
    println!();
    println!("  id:        {}", p.id);
    println!("  price:     ${:.2}", p.price);
    println!("  rating:    {:.1}", p.rating);
    println!("  category:  {}", p.category);
    println!("  brand:     {}", p.brand);
    println!("  in stock:  {}", if p.in_stock { "yes" } else { "no" });
    println!(
        "  served by: {} in {}  [{}]",
        envelope.source, envelope.time, vm.network_path
    );
    if !p.description.is_empty() {
        println!();
        println!("{}", p.description);
    }

    if !vm.similar.is_empty() {
        println!();
        println!("Similar items:");
        for s in &vm.similar {
            println!("  - {}", format_product_line(s));
        }
    }
    Ok(())
}

fn format_product_line(p: &Product) -> String {
    format!(
        "{}  ${:.2}  ★{:.1}{}",
        p.name,
        p.price,
        p.rating,
        if p.in_stock { "" } else { "  (out of stock)" }
    )
}

fn print_health(health: Option<&HealthStatus>) {
    let Some(h) = health else {
        println!("health: unreachable");
        return;
    };
    println!("health: {} ({})", h.status, h.timestamp);
    for (name, up) in &h.connections {
        let label = h.servers.get(name).map(String::as_str).unwrap_or("");
        println!(
            "  {:<10} {:<5} {}",
            name,
            if *up { "up" } else { "down" },
            label
        );
    }
    if let Some(this) = h.servers.get("this_server") {
        println!("  server:    {}", this);
    }
}

fn print_trending(terms: &[String]) {
    if terms.is_empty() {
        println!("trending: (none)");
    } else {
        println!("trending: {}", terms.join(", "));
    }
}
