use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mtgq", about = "Search locally cached Magic: The Gathering card data")]
pub struct Cli {
    /// Directory holding the card database and bulk data cache.
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Search cards with Scryfall-style query syntax.
    Search {
        query: String,
        #[arg(long, default_value_t = 20)]
        limit: usize,
        #[arg(long, default_value_t = 0)]
        offset: usize,
        /// Emit full card JSON instead of one-line summaries.
        #[arg(long)]
        json: bool,
    },
    /// Look up a single card by name (or by Scryfall id with --id).
    Card {
        name: Option<String>,
        #[arg(long, conflicts_with = "name")]
        id: Option<String>,
    },
    /// Show a random card, optionally restricted by a query.
    Random { query: Option<String> },
    /// Count all cards matching a query.
    Count { query: String },
    /// Download bulk data (when stale) and rebuild the card database.
    Refresh {
        /// Re-download even when the cache looks fresh.
        #[arg(long)]
        force: bool,
    },
    /// Show the state of the local data cache.
    Status,
}
