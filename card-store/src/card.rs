//! The card model: the subset of the Scryfall card object this system
//! stores and searches, plus face extraction for double-faced layouts.

use serde::{Deserialize, Serialize};

/// Layouts that keep their searchable fields inside `card_faces` instead
/// of at the top level.
const DOUBLE_FACED_LAYOUTS: &[&str] = &[
    "transform",
    "modal_dfc",
    "split",
    "adventure",
    "meld",
    "flip",
    "reversible_card",
];

/// Canonical WUBRG position for sorting color arrays.
fn color_order(symbol: &str) -> usize {
    match symbol {
        "W" => 0,
        "U" => 1,
        "B" => 2,
        "R" => 3,
        "G" => 4,
        _ => 5,
    }
}

/// One face of a multi-faced card.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CardFace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mana_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_line: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oracle_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toughness: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loyalty: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flavor_text: Option<String>,
}

/// A card as deserialized from Scryfall bulk data (unknown fields are
/// dropped) and as returned from the store.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Card {
    pub id: String,
    #[serde(default)]
    pub oracle_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub mana_cost: Option<String>,
    #[serde(default)]
    pub cmc: Option<f64>,
    #[serde(default)]
    pub type_line: Option<String>,
    #[serde(default)]
    pub oracle_text: Option<String>,
    #[serde(default)]
    pub power: Option<String>,
    #[serde(default)]
    pub toughness: Option<String>,
    #[serde(default)]
    pub colors: Option<Vec<String>>,
    #[serde(default)]
    pub color_identity: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Scryfall calls this field `set`; the store column is `set_code`.
    #[serde(default, rename = "set")]
    pub set_code: Option<String>,
    #[serde(default)]
    pub set_name: Option<String>,
    #[serde(default)]
    pub rarity: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub released_at: Option<String>,
    #[serde(default)]
    pub loyalty: Option<String>,
    #[serde(default)]
    pub flavor_text: Option<String>,
    #[serde(default)]
    pub collector_number: Option<String>,
    #[serde(default)]
    pub watermark: Option<String>,
    #[serde(default)]
    pub layout: Option<String>,
    #[serde(default)]
    pub produced_mana: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_uris: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legalities: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prices: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub card_faces: Vec<CardFace>,
}

impl Card {
    fn uses_face_fields(&self) -> bool {
        !self.card_faces.is_empty()
            && self
                .layout
                .as_deref()
                .is_some_and(|l| DOUBLE_FACED_LAYOUTS.contains(&l))
    }

    /// Joins one text field across faces with `" // "`.
    fn joined_faces<F>(&self, pick: F) -> Option<String>
    where
        F: Fn(&CardFace) -> Option<&str>,
    {
        if !self.uses_face_fields() {
            return None;
        }
        let parts: Vec<&str> = self.card_faces.iter().filter_map(|f| pick(f)).collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" // "))
        }
    }

    /// First face carrying the field (creature stats live on one face).
    fn first_face<F>(&self, pick: F) -> Option<String>
    where
        F: Fn(&CardFace) -> Option<&str>,
    {
        if !self.uses_face_fields() {
            return None;
        }
        self.card_faces
            .iter()
            .find_map(|f| pick(f))
            .map(str::to_string)
    }

    pub fn search_oracle_text(&self) -> Option<String> {
        self.oracle_text
            .clone()
            .or_else(|| self.joined_faces(|f| f.oracle_text.as_deref()))
    }

    pub fn search_mana_cost(&self) -> Option<String> {
        self.mana_cost
            .clone()
            .or_else(|| self.joined_faces(|f| f.mana_cost.as_deref()))
    }

    pub fn search_type_line(&self) -> Option<String> {
        self.type_line
            .clone()
            .or_else(|| self.joined_faces(|f| f.type_line.as_deref()))
    }

    pub fn search_flavor_text(&self) -> Option<String> {
        self.flavor_text
            .clone()
            .or_else(|| self.joined_faces(|f| f.flavor_text.as_deref()))
    }

    pub fn search_power(&self) -> Option<String> {
        self.power
            .clone()
            .or_else(|| self.first_face(|f| f.power.as_deref()))
    }

    pub fn search_toughness(&self) -> Option<String> {
        self.toughness
            .clone()
            .or_else(|| self.first_face(|f| f.toughness.as_deref()))
    }

    pub fn search_loyalty(&self) -> Option<String> {
        self.loyalty
            .clone()
            .or_else(|| self.first_face(|f| f.loyalty.as_deref()))
    }

    /// Top-level colors when present and non-empty, otherwise the union of
    /// the face colors in WUBRG order.
    pub fn search_colors(&self) -> Vec<String> {
        if let Some(colors) = &self.colors {
            if !colors.is_empty() {
                return colors.clone();
            }
        }
        if !self.uses_face_fields() {
            return self.colors.clone().unwrap_or_default();
        }
        let mut union: Vec<String> = Vec::new();
        for face in &self.card_faces {
            if let Some(colors) = &face.colors {
                for c in colors {
                    if !union.contains(c) {
                        union.push(c.clone());
                    }
                }
            }
        }
        union.sort_by_key(|c| color_order(c));
        union
    }
}
