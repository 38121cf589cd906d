//! `bibweld show`: print the contents of a saved mirror.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use bibweld_store::Mirror;

use crate::config::Config;

#[derive(Args)]
pub struct ShowArgs {
    /// Mirror to read (default: the configured mirror path)
    #[arg(long)]
    mirror: Option<PathBuf>,
}

pub fn run(args: ShowArgs, config: &Config) -> Result<()> {
    let path = args.mirror.unwrap_or_else(|| config.mirror.path.clone());
    let mirror =
        Mirror::open(&path).with_context(|| format!("opening mirror {}", path.display()))?;
    let db = mirror.load()?;
    println!("{} publications in {}", db.len(), path.display());
    super::print_publications(&db);
    Ok(())
}
