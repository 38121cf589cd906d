//! `bibweld fetch`: harvest, deduplicate, optionally mirror.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use bibweld_core::{ingest, Author, IngestStats, PubDb};
use bibweld_store::{HttpCache, Mirror};

use crate::config::Config;

#[derive(Args)]
pub struct FetchArgs {
    /// Author name(s) to harvest, e.g. "Jan Van Der Berg"
    #[arg(short, long, required = true)]
    author: Vec<String>,

    /// Which sources to query
    #[arg(long, value_enum, default_value = "all")]
    source: Source,

    /// Save the result as a relational mirror at this path
    #[arg(long)]
    mirror: Option<PathBuf>,

    /// Override the HTTP cache location
    #[arg(long)]
    cache: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Source {
    Hal,
    Pubmed,
    All,
}

pub fn run(args: FetchArgs, config: &Config) -> Result<()> {
    let cache_path = args.cache.unwrap_or_else(|| config.cache.path.clone());
    if let Some(parent) = cache_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut cache = HttpCache::open(&cache_path)
        .with_context(|| format!("opening cache {}", cache_path.display()))?
        .with_max_age(config.cache.max_age_days)
        .with_retries(config.cache.max_retries);

    let mut db = PubDb::new();
    let mut total = IngestStats::default();

    for name in &args.author {
        let author = Author::parse(name);
        log::info!("harvesting publications for {author}");

        if matches!(args.source, Source::Hal | Source::All) {
            let spinner = spinner(format!("{author}: querying open archive..."));
            let records = bibweld_hal::author_search(&mut cache, &author)?;
            spinner.finish_and_clear();
            let stats = ingest(&mut db, records);
            println!("{author} (hal): {stats}");
            accumulate(&mut total, stats);
        }

        if matches!(args.source, Source::Pubmed | Source::All) {
            let spinner = spinner(format!("{author}: querying PubMed..."));
            let records = bibweld_pubmed::author_search(&mut cache, &author)?;
            spinner.finish_and_clear();
            let stats = ingest(&mut db, records);
            println!("{author} (pubmed): {stats}");
            accumulate(&mut total, stats);
        }
    }

    println!();
    println!("total: {total}, {} publications", db.len());
    super::print_publications(&db);

    if let Some(path) = args.mirror {
        let mut mirror =
            Mirror::open(&path).with_context(|| format!("opening mirror {}", path.display()))?;
        mirror.save(&db)?;
        log::info!("mirror saved to {}", path.display());
    }

    Ok(())
}

fn accumulate(total: &mut IngestStats, stats: IngestStats) {
    total.received += stats.received;
    total.created += stats.created;
    total.merged += stats.merged;
    total.dropped += stats.dropped;
}

fn spinner(message: String) -> ProgressBar {
    let bar = ProgressBar::new_spinner().with_message(message);
    bar.set_style(ProgressStyle::default_spinner());
    bar.enable_steady_tick(Duration::from_millis(120));
    bar
}
