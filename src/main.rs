//! LAY-odds scanner entry point.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use time::OffsetDateTime;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer};

use lay_arb::api::{create_router, AppState};
use lay_arb::config::Config;
use lay_arb::error::ConfigError;
use lay_arb::feeds::{fetcher_from_url, FileFeedFetcher};
use lay_arb::metrics;
use lay_arb::notify::{format_alert, notifier_from_config, LogNotifier};
use lay_arb::scan::{run_scheduler, CycleOutcome, ScanStats, Scanner, ScannerSettings};
use lay_arb::utils::{shutdown_channel, shutdown_signal};

/// LAY-odds scanner.
#[derive(Parser, Debug)]
#[command(name = "lay-arb")]
#[command(about = "Scans a betting exchange against a bookmaker and alerts on LAY price edges")]
#[command(version)]
struct Args {
    /// Enable verbose logging.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    /// HTTP server port for health/metrics.
    #[arg(short, long)]
    port: Option<u16>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the scheduler and the status server (default).
    Run {
        /// HTTP server port for health/metrics.
        #[arg(short, long)]
        port: Option<u16>,

        /// Seconds between scan cycles.
        #[arg(long)]
        interval: Option<u64>,
    },

    /// Check configuration validity.
    CheckConfig,

    /// Run a single cycle over two snapshot files and log the alerts.
    ScanOnce {
        /// Reference (LAY) snapshot file.
        #[arg(long)]
        reference: PathBuf,

        /// Comparator snapshot file.
        #[arg(long)]
        comparator: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Configuration also decides the log format, so load it first and report
    // failures once logging is up.
    let config = Config::load();
    let (log_level, log_json, config_verbose) = match &config {
        Ok(c) => (c.rust_log.clone(), c.log_json, c.verbose),
        Err(_) => ("info".to_string(), false, false),
    };

    // Initialize logging
    let filter = if args.verbose || config_verbose {
        EnvFilter::new("lay_arb=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_level))
    };
    let fmt_layer = if log_json {
        fmt::layer().json().boxed()
    } else {
        fmt::layer().boxed()
    };

    tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .init();

    match args.command {
        Some(Command::CheckConfig) => cmd_check_config(config),
        Some(Command::ScanOnce {
            reference,
            comparator,
        }) => cmd_scan_once(config?, reference, comparator).await,
        Some(Command::Run { port, interval }) => cmd_run(config?, port, interval).await,
        None => cmd_run(config?, args.port, None).await,
    }
}

/// Check configuration validity.
fn cmd_check_config(config: Result<Config, envy::Error>) -> anyhow::Result<()> {
    println!("======================================================================");
    println!("LAY-ARB - CONFIGURATION CHECK");
    println!("======================================================================");

    // Load configuration
    print!("Loading configuration... ");
    let config = match config {
        Ok(c) => {
            println!("OK");
            c
        }
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration load failed"));
        }
    };

    // Validate configuration
    print!("Validating configuration... ");
    match config.validate() {
        Ok(()) => println!("OK"),
        Err(e) => {
            println!("FAILED");
            println!("  Error: {}", e);
            return Err(anyhow::anyhow!("Configuration validation failed"));
        }
    }

    // Check feeds
    print!("Checking feeds... ");
    let timeout = std::time::Duration::from_secs(config.fetch_timeout_seconds);
    let feeds = [
        ("REFERENCE_FEED_URL", &config.reference_site, &config.reference_feed_url),
        ("COMPARATOR_FEED_URL", &config.comparator_site, &config.comparator_feed_url),
    ];
    let mut feed_errors = Vec::new();
    for (var, site, url) in feeds {
        match url {
            Some(url) => {
                if let Err(e) = fetcher_from_url(site, url, timeout) {
                    feed_errors.push(e);
                }
            }
            None => feed_errors.push(ConfigError::MissingFeed(var)),
        }
    }
    if feed_errors.is_empty() {
        println!("OK");
    } else {
        println!("FAILED");
        for e in &feed_errors {
            println!("  Error: {}", e);
        }
        return Err(anyhow::anyhow!("Feed configuration invalid"));
    }

    // Show configuration summary
    println!("----------------------------------------------------------------------");
    println!("Configuration Summary:");
    println!("  Reference: {} ({})", config.reference_site, config.reference_feed_url.as_deref().unwrap_or("-"));
    println!("  Comparator: {} ({})", config.comparator_site, config.comparator_feed_url.as_deref().unwrap_or("-"));
    println!("  Threshold: [{}%, {}%]", config.min_diff_pct, config.max_diff_pct);
    println!("  Interval: {}s", config.scan_interval_seconds);
    println!("  Fetch Timeout: {}s", config.fetch_timeout_seconds);
    println!("  Dedupe Window: {}m", config.alert_dedupe_minutes);
    println!("  Alert Mode: {}", config.alert_mode);
    println!("  Telegram: {}", if config.telegram_enabled() { "Enabled" } else { "Disabled (log only)" });
    if config.telegram_enabled() {
        println!("  Subscribers File: {}", config.subscribers_file);
        if let Some(chat_id) = config.telegram_chat_id {
            println!("  Seed Chat: {}", chat_id);
        }
    }
    println!("======================================================================");
    println!("CONFIGURATION CHECK PASSED");
    println!("======================================================================");

    Ok(())
}

/// Run one cycle over two files.
async fn cmd_scan_once(
    config: Config,
    reference: PathBuf,
    comparator: PathBuf,
) -> anyhow::Result<()> {
    config.validate()?;

    let scanner = Scanner::new(
        Arc::new(FileFeedFetcher::new(&config.reference_site, reference)),
        Arc::new(FileFeedFetcher::new(&config.comparator_site, comparator)),
        Arc::new(LogNotifier::new(config.alert_offset())),
        ScannerSettings::from_config(&config),
    );

    let report = scanner.run_cycle(OffsetDateTime::now_utc()).await;

    println!("======================================================================");
    println!("LAY-ARB - SINGLE SCAN");
    println!("======================================================================");
    println!("  Outcome: {}", report.outcome);
    for e in &report.fetch_errors {
        println!("  Fetch Error: {}", e);
    }
    println!("  Reference Quotes: {}", report.reference_quotes);
    println!("  Comparator Quotes: {}", report.comparator_quotes);
    println!("  Rejected Records: {}", report.rejected);
    println!("  Opportunities: {}", report.detected);
    println!("----------------------------------------------------------------------");
    for opportunity in &report.alerted {
        println!("{}", format_alert(opportunity, config.alert_offset()));
        println!("----------------------------------------------------------------------");
    }

    if report.outcome == CycleOutcome::Skipped {
        return Err(anyhow::anyhow!("Scan skipped: a snapshot could not be read"));
    }
    Ok(())
}

/// Run the scheduler and the status server until a shutdown signal.
async fn cmd_run(
    mut config: Config,
    port_override: Option<u16>,
    interval_override: Option<u64>,
) -> anyhow::Result<()> {
    // Override with CLI args if provided
    if let Some(port) = port_override {
        config.port = port;
    }
    if let Some(interval) = interval_override {
        config.scan_interval_seconds = interval;
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Invalid configuration: {}", e);
        return Err(anyhow::anyhow!("Configuration validation failed: {}", e));
    }

    let timeout = std::time::Duration::from_secs(config.fetch_timeout_seconds);
    let reference_url = config
        .reference_feed_url
        .as_deref()
        .ok_or(ConfigError::MissingFeed("REFERENCE_FEED_URL"))?;
    let comparator_url = config
        .comparator_feed_url
        .as_deref()
        .ok_or(ConfigError::MissingFeed("COMPARATOR_FEED_URL"))?;
    let reference = fetcher_from_url(&config.reference_site, reference_url, timeout)?;
    let comparator = fetcher_from_url(&config.comparator_site, comparator_url, timeout)?;

    info!("Configuration loaded successfully");
    info!(
        reference = %config.reference_site,
        comparator = %config.comparator_site,
        min_pct = %config.min_diff_pct,
        max_pct = %config.max_diff_pct,
        interval_secs = config.scan_interval_seconds,
        alert_mode = %config.alert_mode,
        "Scanner configured"
    );

    // Metrics and shared state
    let stats = Arc::new(ScanStats::new());
    let mut app_state =
        AppState::new(stats.clone()).with_sites(&config.reference_site, &config.comparator_site);
    match metrics::install_prometheus() {
        Ok(handle) => app_state = app_state.with_prometheus(handle),
        Err(e) => warn!(error = %e, "Prometheus recorder unavailable, /metrics will be empty"),
    }

    // Shutdown fan-out
    let (trigger, shutdown) = shutdown_channel();
    let server_shutdown = trigger.subscribe();
    let notifier = notifier_from_config(&config, trigger.subscribe()).await?;
    tokio::spawn(async move {
        shutdown_signal().await;
        trigger.trigger();
    });

    // Start HTTP server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    let router = create_router(app_state);
    let server_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { server_shutdown.requested().await })
            .await
    });

    let scanner = Scanner::new(reference, comparator, notifier, ScannerSettings::from_config(&config))
        .with_stats(stats.clone())
        .with_shutdown(shutdown.clone());

    info!("========================================");
    info!("LAY-ODDS SCANNER STARTED");
    info!("========================================");

    let cycles = run_scheduler(&scanner, config.scan_interval(), shutdown).await;

    match server_handle.await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => warn!(error = %e, "HTTP server stopped with error"),
        Err(e) => warn!(error = %e, "HTTP server task failed"),
    }

    let snapshot = stats.snapshot().await;
    info!("========================================");
    info!("SCANNER STOPPED - FINAL SUMMARY");
    info!("========================================");
    info!("Cycles run: {}", cycles);
    info!("Cycles completed: {}", snapshot.cycles_completed);
    info!("Cycles skipped: {}", snapshot.cycles_skipped);
    info!("Opportunities detected: {}", snapshot.opportunities_detected);
    info!("Alerts sent: {}", snapshot.alerts_sent);
    info!("Notify failures: {}", snapshot.notify_failures);
    info!("========================================");

    Ok(())
}
