mod cli;

use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use card_data::{import::import_cards, DataManager, DEFAULT_DATA_TYPE};
use card_store::{Card, CardStore};
use clap::Parser;
use scry_syntax::{parse_query, ParsedQuery, QueryError};
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let data_dir = cli.data_dir.unwrap_or_else(default_data_dir);

    match cli.command {
        Command::Search {
            query,
            limit,
            offset,
            json,
        } => {
            let store = open_store(&data_dir)?;
            let parsed = parse_or_report(&query, json)?;
            let cards = store.execute_query(&parsed, limit, offset)?;
            let total = store.count_matches(&parsed)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cards)?);
            } else {
                for card in &cards {
                    println!("{}", summary_line(card));
                }
                eprintln!("{} of {total} matches", cards.len());
            }
        }
        Command::Card { name, id } => {
            let store = open_store(&data_dir)?;
            let card = match (&name, &id) {
                (_, Some(id)) => store.get_card_by_id(id)?,
                (Some(name), _) => {
                    let exact = store.get_card_by_name(name)?;
                    if exact.is_none() {
                        let suggestions = store.search_by_partial_name(name, 5)?;
                        if !suggestions.is_empty() {
                            eprintln!("No exact match. Did you mean:");
                            for s in &suggestions {
                                eprintln!("  {}", s.name);
                            }
                        }
                    }
                    exact
                }
                (None, None) => return Err(anyhow!("pass a card name or --id")),
            };
            match card {
                Some(card) => println!("{}", serde_json::to_string_pretty(&card)?),
                None => return Err(anyhow!("card not found")),
            }
        }
        Command::Random { query } => {
            let store = open_store(&data_dir)?;
            let parsed = match &query {
                Some(q) => Some(parse_or_report(q, false)?),
                None => None,
            };
            match store.random_card(parsed.as_ref())? {
                Some(card) => println!("{}", serde_json::to_string_pretty(&card)?),
                None => return Err(anyhow!("no cards match the query")),
            }
        }
        Command::Count { query } => {
            let store = open_store(&data_dir)?;
            let parsed = parse_or_report(&query, false)?;
            println!("{}", store.count_matches(&parsed)?);
        }
        Command::Refresh { force } => refresh(&data_dir, force)?,
        Command::Status => {
            let manager = DataManager::new(&data_dir)?;
            let mut status = manager.status();
            if let Ok(store) = open_store(&data_dir) {
                status.card_count = store.card_count()?;
            }
            println!("{}", serde_json::to_string_pretty(&status)?);
        }
    }
    Ok(())
}

fn default_data_dir() -> PathBuf {
    match std::env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join(".mtgq"),
        None => PathBuf::from(".mtgq"),
    }
}

fn open_store(data_dir: &PathBuf) -> Result<CardStore> {
    std::fs::create_dir_all(data_dir)
        .with_context(|| format!("create data directory {}", data_dir.display()))?;
    CardStore::open(&data_dir.join("cards.db"))
}

/// Parses the query, rendering a query error as the structured body
/// (`error`, `hint`, `supported_syntax`) before exiting.
fn parse_or_report(query: &str, json: bool) -> Result<ParsedQuery> {
    match parse_query(query) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            report_query_error(&err, json);
            std::process::exit(2);
        }
    }
}

fn report_query_error(err: &QueryError, json: bool) {
    if json {
        let body = serde_json::json!({
            "error": err.to_string(),
            "hint": err.hint(),
            "supported_syntax": err.supported_syntax(),
        });
        eprintln!("{}", serde_json::to_string_pretty(&body).expect("static shape"));
    } else {
        eprintln!("Error: {err}");
        eprintln!("Hint: {}", err.hint());
        eprintln!("Supported syntax:");
        for line in err.supported_syntax() {
            eprintln!("  {line}");
        }
    }
}

fn summary_line(card: &Card) -> String {
    let mut line = card.name.clone();
    if let Some(cost) = card.search_mana_cost() {
        line.push_str(&format!("  {cost}"));
    }
    if let Some(type_line) = card.search_type_line() {
        line.push_str(&format!("  — {type_line}"));
    }
    if let (Some(set), Some(rarity)) = (&card.set_code, &card.rarity) {
        line.push_str(&format!("  [{} {}]", set, rarity));
    }
    line
}

/// Downloads fresh bulk data when needed and rebuilds the card table.
fn refresh(data_dir: &PathBuf, force: bool) -> Result<()> {
    let manager = DataManager::new(data_dir)?;
    if !force && !manager.is_cache_stale() {
        let status = manager.status();
        println!("Data is already up to date.");
        println!("  last updated: {}", status.last_updated.as_deref().unwrap_or("never"));
        println!("  cards: {}", status.card_count);
        println!("  use --force to re-download anyway");
        return Ok(());
    }

    println!("Downloading bulk data...");
    let path = manager.download_bulk_data(DEFAULT_DATA_TYPE)?;

    println!("Importing cards...");
    let mut store = open_store(data_dir)?;
    let file = File::open(&path).with_context(|| format!("open {}", path.display()))?;
    let count = import_cards(
        BufReader::new(file),
        card_data::import::DEFAULT_BATCH_SIZE,
        |batch| store.insert_cards(batch),
    )?;
    manager.update_card_count(count)?;
    println!("Imported {count} cards.");
    Ok(())
}
