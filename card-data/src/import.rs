//! Streaming import of the bulk card file.
//!
//! The bulk file is one JSON array weighing hundreds of megabytes. A
//! seeded sequence visitor hands cards to the sink in fixed-size batches,
//! so memory stays flat no matter how large the download is.

use std::fmt;
use std::io::Read;

use anyhow::{Context, Result};
use card_store::Card;
use serde::de::{DeserializeSeed, SeqAccess, Visitor};
use serde::Deserializer;
use tracing::debug;

/// Default cards per batch handed to the sink.
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Reads a JSON array of cards from `reader`, calling `sink` once per
/// full batch (and once for the remainder). Returns the total card count.
///
/// The sink owns persistence (typically `CardStore::insert_cards`), so
/// the caller controls transactions and connection lifetime.
pub fn import_cards<R, F>(reader: R, batch_size: usize, sink: F) -> Result<u64>
where
    R: Read,
    F: FnMut(&[Card]) -> Result<()>,
{
    let mut deserializer = serde_json::Deserializer::from_reader(reader);
    let seed = CardBatches {
        batch_size: batch_size.max(1),
        sink,
    };
    let count = seed
        .deserialize(&mut deserializer)
        .context("parse bulk card array")?;
    Ok(count)
}

struct CardBatches<F> {
    batch_size: usize,
    sink: F,
}

impl<'de, F> DeserializeSeed<'de> for CardBatches<F>
where
    F: FnMut(&[Card]) -> Result<()>,
{
    type Value = u64;

    fn deserialize<D>(self, deserializer: D) -> Result<Self::Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_seq(self)
    }
}

impl<'de, F> Visitor<'de> for CardBatches<F>
where
    F: FnMut(&[Card]) -> Result<()>,
{
    type Value = u64;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON array of card objects")
    }

    fn visit_seq<A>(mut self, mut seq: A) -> Result<Self::Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut count = 0u64;
        while let Some(card) = seq.next_element::<Card>()? {
            batch.push(card);
            if batch.len() >= self.batch_size {
                (self.sink)(&batch).map_err(serde::de::Error::custom)?;
                count += batch.len() as u64;
                debug!(count, "imported batch");
                batch.clear();
            }
        }
        if !batch.is_empty() {
            (self.sink)(&batch).map_err(serde::de::Error::custom)?;
            count += batch.len() as u64;
        }
        Ok(count)
    }
}
