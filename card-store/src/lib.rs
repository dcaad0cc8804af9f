//! SQLite-backed card storage and query compilation.
//!
//! Two halves, split the same way the parser crate hands its AST to a
//! consumer:
//!
//! - [`compile`] walks a [`scry_syntax::ParsedQuery`] and emits a boolean
//!   SQL condition plus an ordered list of bound parameters. User-supplied
//!   values travel exclusively as parameters; the only text spliced into
//!   the SQL itself comes from closed enumerations (color letters, format
//!   and currency codes).
//! - [`CardStore`] owns the SQLite connection: schema, FTS5 index with
//!   sync triggers, inserts, and the query-execution surface.
//!
//! ```no_run
//! use card_store::CardStore;
//!
//! let store = CardStore::open("cards.db".as_ref())?;
//! let parsed = scry_syntax::parse_query("c:blue t:instant cmc<=2")?;
//! let cards = store.execute_query(&parsed, 20, 0)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

mod card;
mod compile;
mod store;

pub use card::{Card, CardFace};
pub use compile::{compile, CompiledQuery, SqlParam};
pub use store::CardStore;
