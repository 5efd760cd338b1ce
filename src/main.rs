//! HeroStats - Hero FFA statistics and leaderboard service
//!
//! Aggregates the paginated Hero FFA leaderboard from the HGLabor stats API,
//! re-pages it, and serves it as a JSON API or prints it to the terminal.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, upstream unreachable, bind failure, etc.)

mod cli;
mod config;
mod leaderboard;
mod models;
mod report;
mod server;
mod upstream;

use anyhow::{Context, Result};
use chrono::Utc;
use cli::{Args, Command, LeaderboardArgs, OutputFormat, PlayerArgs};
use config::{Config, CONFIG_FILE_NAME};
use indicatif::{ProgressBar, ProgressStyle};
use leaderboard::{compute_output_page, Aggregator, AggregatorConfig};
use models::{LeaderboardReport, PlayerCard, ReportMetadata};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use upstream::{ProfileClient, ProfileSource, StatsClient, StatsSource};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args)?;

    info!("HeroStats v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args).await {
        error!("Failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .herostats.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize upstream URLs, page size, limits, and more.");
    Ok(())
}

/// Initialize logging. `RUST_LOG` wins over the verbosity flags.
fn init_logging(args: &Args) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::default().add_directive(args.log_level().into()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

async fn run(args: Args) -> Result<()> {
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    config.validate()?;

    let http = upstream::build_http_client(&config.upstream)?;
    let stats: Arc<dyn StatsSource> = Arc::new(StatsClient::new(http.clone(), &config.upstream));
    let profiles: Arc<dyn ProfileSource> = Arc::new(ProfileClient::new(http, &config.upstream));

    match args.command() {
        Command::Serve { .. } => {
            info!("Stats API: {}", config.upstream.stats_url);
            let state = server::AppState::new(stats, profiles, &config);
            server::WebRouter::serve(state, &config.server).await
        }
        Command::Leaderboard(lb) => {
            run_leaderboard(&config, stats.as_ref(), profiles.as_ref(), lb, args.quiet).await
        }
        Command::Player(player) => run_player(stats.as_ref(), profiles.as_ref(), player).await,
    }
}

/// Fetch, page and print the leaderboard.
async fn run_leaderboard(
    config: &Config,
    stats: &dyn StatsSource,
    profiles: &dyn ProfileSource,
    args: LeaderboardArgs,
    quiet: bool,
) -> Result<()> {
    let start_time = Instant::now();
    let sort = args.sort.unwrap_or(config.leaderboard.default_sort);
    let page_size = config.leaderboard.page_size;

    let mut aggregator = Aggregator::new(stats, AggregatorConfig::from(&config.leaderboard));
    let spinner = (!quiet).then(new_spinner);
    if let Some(ref pb) = spinner {
        pb.set_message(format!("Fetching leaderboard sorted by {}...", sort));
        aggregator = aggregator.with_progress(pb.clone());
    }

    let aggregated = aggregator
        .fetch_all_upstream_pages(sort)
        .await
        .context("Failed to fetch leaderboard")?;

    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    if !aggregated.is_complete() {
        warn!(
            "Leaderboard is incomplete: {} ({} players collected)",
            aggregated.stop_reason,
            aggregated.total_players()
        );
    }

    let mut page = compute_output_page(&aggregated.entries, args.page, page_size);
    page.complete = aggregated.is_complete();

    let names = if args.names {
        let ids: Vec<String> = page.leaderboard.iter().map(|e| e.player_id.clone()).collect();
        upstream::resolve_names(profiles, &ids, config.general.name_concurrency).await
    } else {
        Vec::new()
    };

    let metadata = ReportMetadata {
        sort,
        generated_at: Utc::now(),
        upstream_pages: aggregated.upstream_pages,
        stop_reason: aggregated.stop_reason,
        duration_seconds: start_time.elapsed().as_secs_f64(),
    };
    let report = LeaderboardReport::new(metadata, &page, names);

    let output = match args.format {
        OutputFormat::Json => report::generate_json(&report)?,
        OutputFormat::Markdown => report::generate_markdown_leaderboard(&report),
    };
    report::emit(&output, args.output.as_deref())?;

    if let Some(ref path) = args.output {
        println!("✅ Leaderboard page saved to: {}", path.display());
    }

    Ok(())
}

/// Fetch and print a single player, given a UUID or a username.
async fn run_player(
    stats: &dyn StatsSource,
    profiles: &dyn ProfileSource,
    args: PlayerArgs,
) -> Result<()> {
    let player_id = upstream::resolve_player_id(profiles, &args.id)
        .await
        .with_context(|| format!("Player not found: {}", args.id.trim()))?;
    debug!("Player {} has id {}", args.id.trim(), player_id);

    let player = stats
        .fetch_player(&player_id)
        .await
        .context("Failed to fetch player details")?;

    let name = upstream::player_name(profiles, &player).await;

    let card = PlayerCard::new(&player, name);
    let output = match args.format {
        OutputFormat::Json => report::generate_json(&card)?,
        OutputFormat::Markdown => report::generate_markdown_player(&card),
    };
    report::emit(&output, args.output.as_deref())?;

    if let Some(ref path) = args.output {
        println!("✅ Player card saved to: {}", path.display());
    }

    Ok(())
}

fn new_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default() {
        Ok(Some(config)) => {
            info!("Loaded default config from {}", CONFIG_FILE_NAME);
            Ok(config)
        }
        Ok(None) => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
        Err(e) => {
            warn!("Failed to load config: {}", e);
            Ok(Config::default())
        }
    }
}
