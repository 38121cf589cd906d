//! bibweld - consolidate scholarly publication records
//!
//! Harvests bibliographic records from an open archive and from PubMed,
//! deduplicates them into one publication database, and optionally
//! mirrors the result to SQLite.

use anyhow::Result;
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "bibweld")]
#[command(about = "Deduplicating harvester for scholarly publication records")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: ./bibweld.toml or ~/.config/bibweld/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Harvest publications for one or more authors
    Fetch(cmd::fetch::FetchArgs),
    /// Print the publications stored in a mirror
    Show(cmd::show::ShowArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    match cli.command {
        Command::Fetch(args) => cmd::fetch::run(args, &config),
        Command::Show(args) => cmd::show::run(args, &config),
        Command::Config => {
            println!("Cache:");
            println!("  Path: {}", config.cache.path.display());
            println!("  Freshness window: {} days", config.cache.max_age_days);
            println!("  Retries: {}", config.cache.max_retries);
            println!();
            println!("Mirror:");
            println!("  Path: {}", config.mirror.path.display());
            Ok(())
        }
    }
}
