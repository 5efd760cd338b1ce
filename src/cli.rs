//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::models::SortKey;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// HeroStats - Hero FFA statistics and leaderboard service
///
/// Serves the Hero FFA leaderboard and player stats as a JSON API, or
/// prints them to the terminal as Markdown or JSON.
///
/// Examples:
///   herostats serve --port 3000
///   herostats leaderboard --sort xp --page 2 --names
///   herostats player 069a79f4-44e9-4726-a5be-fca90e38aaf5
///   herostats player Notch
///   herostats --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .herostats.toml in the current directory
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Hero FFA stats API base URL
    #[arg(long, value_name = "URL", env = "HEROSTATS_STATS_URL", global = true)]
    pub stats_url: Option<String>,

    /// Upstream request timeout in seconds
    #[arg(long, value_name = "SECS", global = true)]
    pub timeout: Option<u64>,

    /// Generate a default .herostats.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the JSON HTTP API (default when no command is given)
    Serve {
        /// Address to bind to
        #[arg(long, value_name = "ADDR")]
        bind: Option<String>,

        /// Port to listen on
        #[arg(short, long, env = "HEROSTATS_PORT")]
        port: Option<u16>,
    },

    /// Print one page of the leaderboard
    Leaderboard(LeaderboardArgs),

    /// Print a single player's stats
    Player(PlayerArgs),
}

#[derive(clap::Args, Debug, Clone)]
pub struct LeaderboardArgs {
    /// Sort key: kills, deaths or xp (default: from config)
    #[arg(short, long, value_name = "KEY")]
    pub sort: Option<SortKey>,

    /// Page to show (1-based, clamped to the last page)
    #[arg(long, default_value = "1", value_parser = clap::value_parser!(u32).range(1..))]
    pub page: u32,

    /// Resolve player names (one extra request per entry)
    #[arg(short, long)]
    pub names: bool,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(clap::Args, Debug, Clone)]
pub struct PlayerArgs {
    /// Player UUID or Minecraft username
    #[arg(value_name = "PLAYER")]
    pub id: String,

    /// Output format (markdown, json)
    #[arg(long, default_value = "markdown", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Output format for rendered pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Markdown format (default)
    #[default]
    Markdown,
    /// JSON format
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if let Some(ref url) = self.stats_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Stats URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(timeout) = self.timeout {
            if timeout == 0 {
                return Err("Timeout must be at least 1 second".to_string());
            }
        }

        if let Some(Command::Player(ref player)) = self.command {
            if player.id.trim().is_empty() {
                return Err("Player UUID or username must not be empty".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// The command to run; `serve` when none was given.
    pub fn command(&self) -> Command {
        self.command.clone().unwrap_or(Command::Serve {
            bind: None,
            port: None,
        })
    }
}
