//! The SQLite card store: schema, FTS5 index, inserts and query execution.

use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::{params_from_iter, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::card::Card;
use crate::compile::{compile, SqlParam};
use scry_syntax::ParsedQuery;

/// Columns added after the first release, backfilled from the raw JSON
/// column when an older database is opened.
const MIGRATION_COLUMNS: &[(&str, &str)] = &[
    ("keywords", "$.keywords"),
    ("artist", "$.artist"),
    ("released_at", "$.released_at"),
    ("loyalty", "$.loyalty"),
    ("flavor_text", "$.flavor_text"),
    ("collector_number", "$.collector_number"),
    ("watermark", "$.watermark"),
    ("produced_mana", "$.produced_mana"),
    ("layout", "$.layout"),
];

const CREATE_SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS cards (
    id TEXT PRIMARY KEY,
    oracle_id TEXT,
    name TEXT NOT NULL,
    mana_cost TEXT,
    cmc REAL,
    type_line TEXT,
    oracle_text TEXT,
    power TEXT,
    toughness TEXT,
    colors TEXT,           -- JSON array
    color_identity TEXT,   -- JSON array
    keywords TEXT,         -- JSON array of keyword abilities
    set_code TEXT,
    set_name TEXT,
    rarity TEXT,
    artist TEXT,
    released_at TEXT,      -- date string like 2024-08-02
    loyalty TEXT,          -- can be 'X' or a number
    flavor_text TEXT,
    collector_number TEXT,
    watermark TEXT,
    layout TEXT,
    produced_mana TEXT,    -- JSON array of produced mana symbols
    image_uris TEXT,       -- JSON object
    legalities TEXT,       -- JSON object
    prices TEXT,           -- JSON object
    raw_data TEXT          -- full card JSON
);

CREATE INDEX IF NOT EXISTS idx_name ON cards(name);
CREATE INDEX IF NOT EXISTS idx_name_lower ON cards(LOWER(name));
CREATE INDEX IF NOT EXISTS idx_cmc ON cards(cmc);
CREATE INDEX IF NOT EXISTS idx_set ON cards(set_code);
CREATE INDEX IF NOT EXISTS idx_rarity ON cards(rarity);
CREATE INDEX IF NOT EXISTS idx_artist ON cards(artist);
CREATE INDEX IF NOT EXISTS idx_released_at ON cards(released_at);
CREATE INDEX IF NOT EXISTS idx_oracle_id ON cards(oracle_id);
CREATE INDEX IF NOT EXISTS idx_colors ON cards(colors);
CREATE INDEX IF NOT EXISTS idx_color_identity ON cards(color_identity);

CREATE VIRTUAL TABLE IF NOT EXISTS cards_fts USING fts5(
    id,
    name,
    oracle_text,
    type_line,
    content='cards',
    content_rowid='rowid'
);

CREATE TRIGGER IF NOT EXISTS cards_ai AFTER INSERT ON cards BEGIN
    INSERT INTO cards_fts(rowid, id, name, oracle_text, type_line)
    VALUES (NEW.rowid, NEW.id, NEW.name, NEW.oracle_text, NEW.type_line);
END;

CREATE TRIGGER IF NOT EXISTS cards_ad AFTER DELETE ON cards BEGIN
    INSERT INTO cards_fts(cards_fts, rowid, id, name, oracle_text, type_line)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.name, OLD.oracle_text, OLD.type_line);
END;

CREATE TRIGGER IF NOT EXISTS cards_au AFTER UPDATE ON cards BEGIN
    INSERT INTO cards_fts(cards_fts, rowid, id, name, oracle_text, type_line)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.name, OLD.oracle_text, OLD.type_line);
    INSERT INTO cards_fts(rowid, id, name, oracle_text, type_line)
    VALUES (NEW.rowid, NEW.id, NEW.name, NEW.oracle_text, NEW.type_line);
END;
";

const INSERT_SQL: &str = "
INSERT OR REPLACE INTO cards (
    id, oracle_id, name, mana_cost, cmc, type_line, oracle_text,
    power, toughness, colors, color_identity, keywords, set_code, set_name,
    rarity, artist, released_at, loyalty, flavor_text, collector_number,
    watermark, layout, produced_mana, image_uris, legalities, prices, raw_data
) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
";

/// SQLite-backed card storage with an FTS5 text index.
///
/// One `CardStore` owns one connection. The parse→compile path never
/// touches it; only execution does, so a data refresh can swap the store
/// wholesale without the compiler knowing.
pub struct CardStore {
    conn: Connection,
}

impl CardStore {
    pub fn open(db_path: &Path) -> Result<CardStore> {
        let conn = Connection::open(db_path)
            .with_context(|| format!("open card database at {}", db_path.display()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<CardStore> {
        Self::init(Connection::open_in_memory().context("open in-memory card database")?)
    }

    fn init(conn: Connection) -> Result<CardStore> {
        // WAL keeps reads fast while a refresh rewrites the table.
        conn.query_row("PRAGMA journal_mode=WAL", [], |_| Ok(()))
            .context("enable WAL journal mode")?;
        Self::migrate(&conn).context("migrate card table")?;
        let had_fts = table_exists(&conn, "cards_fts")?;
        conn.execute_batch(CREATE_SCHEMA)
            .context("create card tables")?;
        if !had_fts {
            // Rows that predate the FTS table are invisible to the sync
            // triggers; rebuild indexes whatever the table already holds.
            conn.execute("INSERT INTO cards_fts(cards_fts) VALUES ('rebuild')", [])
                .context("rebuild card text index")?;
        }
        Ok(CardStore { conn })
    }

    /// Adds columns that did not exist in earlier schema versions,
    /// backfilling each from the stored raw JSON. Column names come from
    /// a fixed list, never from input.
    fn migrate(conn: &Connection) -> Result<()> {
        if !table_exists(conn, "cards")? {
            return Ok(());
        }
        let mut stmt = conn.prepare("PRAGMA table_info(cards)")?;
        let columns: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(1))?
            .collect::<rusqlite::Result<_>>()?;
        for (column, json_path) in MIGRATION_COLUMNS {
            if !columns.iter().any(|c| c == column) {
                debug!(column, "adding missing card column");
                conn.execute_batch(&format!(
                    "ALTER TABLE cards ADD COLUMN {column} TEXT;
                     UPDATE cards SET {column} = json_extract(raw_data, '{json_path}')
                     WHERE {column} IS NULL;"
                ))?;
            }
        }
        Ok(())
    }

    pub fn card_count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM cards", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn card_params(card: &Card) -> Result<Vec<SqlParam>> {
        let json = |value: &serde_json::Value| -> Result<String> {
            serde_json::to_string(value).context("serialize card JSON column")
        };
        let colors = serde_json::to_string(&card.search_colors())?;
        let identity = serde_json::to_string(&card.color_identity)?;
        let keywords = serde_json::to_string(&card.keywords)?;
        let produced = serde_json::to_string(&card.produced_mana)?;
        let image_uris = card.image_uris.as_ref().map(json).transpose()?;
        let legalities = card.legalities.as_ref().map(json).transpose()?;
        let prices = card.prices.as_ref().map(json).transpose()?;
        let raw = serde_json::to_string(card).context("serialize raw card JSON")?;

        Ok(vec![
            SqlParam::Text(card.id.clone()),
            opt_text(&card.oracle_id),
            SqlParam::Text(card.name.clone()),
            opt_text(&card.search_mana_cost()),
            card.cmc.map(SqlParam::Real).unwrap_or(SqlParam::Null),
            opt_text(&card.search_type_line()),
            opt_text(&card.search_oracle_text()),
            opt_text(&card.search_power()),
            opt_text(&card.search_toughness()),
            SqlParam::Text(colors),
            SqlParam::Text(identity),
            SqlParam::Text(keywords),
            opt_text(&card.set_code),
            opt_text(&card.set_name),
            opt_text(&card.rarity),
            opt_text(&card.artist),
            opt_text(&card.released_at),
            opt_text(&card.search_loyalty()),
            opt_text(&card.search_flavor_text()),
            opt_text(&card.collector_number),
            opt_text(&card.watermark),
            opt_text(&card.layout),
            SqlParam::Text(produced),
            opt_text(&image_uris),
            opt_text(&legalities),
            opt_text(&prices),
            SqlParam::Text(raw),
        ])
    }

    pub fn insert_card(&mut self, card: &Card) -> Result<()> {
        let params = Self::card_params(card)?;
        self.conn
            .execute(INSERT_SQL, params_from_iter(params))
            .with_context(|| format!("insert card {}", card.id))?;
        Ok(())
    }

    /// All-or-nothing batch insert: one failing card rolls back the batch.
    pub fn insert_cards(&mut self, cards: &[Card]) -> Result<()> {
        let tx = self.conn.transaction().context("begin insert transaction")?;
        {
            let mut stmt = tx.prepare_cached(INSERT_SQL)?;
            for card in cards {
                let params = Self::card_params(card)?;
                stmt.execute(params_from_iter(params))
                    .with_context(|| format!("insert card {}", card.id))?;
            }
        }
        tx.commit().context("commit insert transaction")?;
        Ok(())
    }

    pub fn get_card_by_id(&self, card_id: &str) -> Result<Option<Card>> {
        self.conn
            .query_row("SELECT * FROM cards WHERE id = ?", [card_id], card_from_row)
            .optional()
            .with_context(|| format!("look up card id {card_id}"))
    }

    pub fn get_card_by_name(&self, name: &str) -> Result<Option<Card>> {
        self.conn
            .query_row(
                "SELECT * FROM cards WHERE LOWER(name) = ?",
                [name.to_lowercase()],
                card_from_row,
            )
            .optional()
            .with_context(|| format!("look up card name {name:?}"))
    }

    pub fn search_by_partial_name(&self, partial: &str, limit: usize) -> Result<Vec<Card>> {
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM cards WHERE LOWER(name) LIKE ? LIMIT ?")?;
        let rows = stmt.query_map(
            params_from_iter([
                SqlParam::Text(format!("%{}%", partial.to_lowercase())),
                SqlParam::Int(limit as i64),
            ]),
            card_from_row,
        )?;
        rows.collect::<rusqlite::Result<_>>()
            .context("search by partial name")
    }

    /// Executes a parsed query with pagination.
    pub fn execute_query(
        &self,
        parsed: &ParsedQuery,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Card>> {
        let compiled = compile(parsed);
        let sql = match &compiled.where_sql {
            Some(clause) => format!("SELECT * FROM cards WHERE {clause} LIMIT ? OFFSET ?"),
            None => "SELECT * FROM cards LIMIT ? OFFSET ?".to_string(),
        };
        debug!(%sql, params = compiled.params.len(), "executing card query");
        let mut params = compiled.params;
        params.push(SqlParam::Int(limit as i64));
        params.push(SqlParam::Int(offset as i64));
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(params_from_iter(params), card_from_row)?;
        rows.collect::<rusqlite::Result<_>>()
            .context("execute card query")
    }

    /// Counts all matches, ignoring pagination.
    pub fn count_matches(&self, parsed: &ParsedQuery) -> Result<u64> {
        let compiled = compile(parsed);
        let sql = match &compiled.where_sql {
            Some(clause) => format!("SELECT COUNT(*) FROM cards WHERE {clause}"),
            None => "SELECT COUNT(*) FROM cards".to_string(),
        };
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(compiled.params), |row| row.get(0))
            .context("count query matches")?;
        Ok(count as u64)
    }

    /// Returns one random card among the matches (or among all cards when
    /// no query is given).
    pub fn random_card(&self, parsed: Option<&ParsedQuery>) -> Result<Option<Card>> {
        let compiled = match parsed {
            Some(parsed) => compile(parsed),
            None => compile(&ParsedQuery::default()),
        };
        let sql = match &compiled.where_sql {
            Some(clause) => {
                format!("SELECT * FROM cards WHERE {clause} ORDER BY RANDOM() LIMIT 1")
            }
            None => "SELECT * FROM cards ORDER BY RANDOM() LIMIT 1".to_string(),
        };
        self.conn
            .query_row(&sql, params_from_iter(compiled.params), card_from_row)
            .optional()
            .context("pick random card")
    }

    /// Phrase search over the FTS5 index, falling back to substring LIKE
    /// when FTS matches nothing (or rejects the phrase): FTS is tokenized,
    /// so mid-word fragments only ever match via the fallback.
    pub fn search_text(&self, text: &str, limit: usize) -> Result<Vec<Card>> {
        let phrase = format!("\"{}\"", text.replace('"', "\"\""));
        let fts = self.conn.prepare(
            "SELECT cards.* FROM cards JOIN cards_fts ON cards.id = cards_fts.id
             WHERE cards_fts MATCH ? LIMIT ?",
        );
        match fts {
            Ok(mut stmt) => {
                let result: rusqlite::Result<Vec<Card>> = stmt
                    .query_map(
                        params_from_iter([
                            SqlParam::Text(phrase),
                            SqlParam::Int(limit as i64),
                        ]),
                        card_from_row,
                    )
                    .and_then(|rows| rows.collect());
                match result {
                    Ok(cards) if !cards.is_empty() => return Ok(cards),
                    Ok(_) => {}
                    Err(err) => debug!(%err, "FTS search failed, falling back to LIKE"),
                }
            }
            Err(err) => debug!(%err, "FTS unavailable, falling back to LIKE"),
        }
        let mut stmt = self
            .conn
            .prepare("SELECT * FROM cards WHERE LOWER(oracle_text) LIKE ? LIMIT ?")?;
        let rows = stmt.query_map(
            params_from_iter([
                SqlParam::Text(format!("%{}%", text.to_lowercase())),
                SqlParam::Int(limit as i64),
            ]),
            card_from_row,
        )?;
        rows.collect::<rusqlite::Result<_>>().context("text search")
    }
}

fn table_exists(conn: &Connection, name: &str) -> Result<bool> {
    Ok(conn
        .query_row(
            "SELECT name FROM sqlite_master WHERE type='table' AND name = ?",
            [name],
            |_| Ok(()),
        )
        .optional()?
        .is_some())
}

fn opt_text(value: &Option<String>) -> SqlParam {
    match value {
        Some(v) => SqlParam::Text(v.clone()),
        None => SqlParam::Null,
    }
}

/// Reconstructs a card from a stored row. JSON columns parse leniently:
/// a malformed column yields the empty default rather than failing the
/// whole row.
fn card_from_row(row: &Row<'_>) -> rusqlite::Result<Card> {
    let json_vec = |value: Option<String>| -> Vec<String> {
        value
            .and_then(|v| serde_json::from_str(&v).ok())
            .unwrap_or_default()
    };
    let json_value = |value: Option<String>| -> Option<serde_json::Value> {
        value.and_then(|v| serde_json::from_str(&v).ok())
    };
    Ok(Card {
        id: row.get("id")?,
        oracle_id: row.get("oracle_id")?,
        name: row.get("name")?,
        mana_cost: row.get("mana_cost")?,
        cmc: row.get("cmc")?,
        type_line: row.get("type_line")?,
        oracle_text: row.get("oracle_text")?,
        power: row.get("power")?,
        toughness: row.get("toughness")?,
        colors: row
            .get::<_, Option<String>>("colors")?
            .and_then(|v| serde_json::from_str(&v).ok()),
        color_identity: json_vec(row.get("color_identity")?),
        keywords: json_vec(row.get("keywords")?),
        set_code: row.get("set_code")?,
        set_name: row.get("set_name")?,
        rarity: row.get("rarity")?,
        artist: row.get("artist")?,
        released_at: row.get("released_at")?,
        loyalty: row.get("loyalty")?,
        flavor_text: row.get("flavor_text")?,
        collector_number: row.get("collector_number")?,
        watermark: row.get("watermark")?,
        layout: row.get("layout")?,
        produced_mana: json_vec(row.get("produced_mana")?),
        image_uris: json_value(row.get("image_uris")?),
        legalities: json_value(row.get("legalities")?),
        prices: json_value(row.get("prices")?),
        card_faces: Vec::new(),
    })
}
