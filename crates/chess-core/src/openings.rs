//! Static catalog of named opening positions.
//!
//! Entries are addressed by `"<category id>:<index>"`, the key a position
//! selector uses.

use std::collections::HashMap;
use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::move_sequence::normalize_move_tokens;

const CATALOG_JSON: &str = include_str!("../data/openings.json");

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opening {
    pub eco: String,
    pub name: String,
    /// Position after `moves` have been played.
    pub fen: String,
    pub moves: Vec<String>,
}

impl Opening {
    /// Move tokens ready for the applier.
    pub fn tokens(&self) -> Vec<String> {
        normalize_move_tokens(&self.moves)
    }

    /// Selector label, e.g. "C50 - Italian Game".
    pub fn label(&self) -> String {
        format!("{} - {}", self.eco, self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpeningCategory {
    pub id: String,
    pub category: String,
    pub items: Vec<Opening>,
}

/// The catalog, parsed at first access.
pub static CATALOG: LazyLock<Vec<OpeningCategory>> = LazyLock::new(|| {
    match serde_json::from_str::<Vec<OpeningCategory>>(CATALOG_JSON) {
        Ok(categories) => {
            let total: usize = categories.iter().map(|c| c.items.len()).sum();
            tracing::debug!("Loaded opening catalog: {} categories, {} positions", categories.len(), total);
            categories
        }
        Err(e) => {
            tracing::warn!("Failed to parse opening catalog: {}", e);
            Vec::new()
        }
    }
});

/// First key for each FEN, for mapping a live position back to the selector.
static FEN_INDEX: LazyLock<HashMap<String, String>> = LazyLock::new(|| {
    let mut index = HashMap::new();
    for (key, opening) in entries() {
        index.entry(opening.fen.clone()).or_insert(key);
    }
    index
});

pub fn opening_key(category_id: &str, index: usize) -> String {
    format!("{category_id}:{index}")
}

/// Every catalog entry with its key, in catalog order.
pub fn entries() -> impl Iterator<Item = (String, &'static Opening)> {
    CATALOG.iter().flat_map(|category| {
        category
            .items
            .iter()
            .enumerate()
            .map(move |(i, opening)| (opening_key(&category.id, i), opening))
    })
}

pub fn find(key: &str) -> Option<&'static Opening> {
    let (category_id, index) = key.split_once(':')?;
    let index: usize = index.parse().ok()?;
    CATALOG
        .iter()
        .find(|c| c.id == category_id)?
        .items
        .get(index)
}

pub fn key_for_fen(fen: &str) -> Option<&'static str> {
    FEN_INDEX.get(fen).map(String::as_str)
}
