//! Session persistence: one JSON snapshot per board id in a string
//! key-value store.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use chess_core::AppliedMove;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::host::Shape;

/// What a board remembers between renders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_move_idx: Option<isize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub moves: Option<Vec<AppliedMove>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shapes: Option<Vec<Shape>>,
    /// Game record up to the cursor.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pgn: Option<String>,
}

pub trait SessionStore {
    /// Stored snapshot for `id`; unreadable entries count as absent.
    fn load(&self, id: &str) -> Option<SessionSnapshot>;

    /// Overwrite the snapshot for `id`.
    fn save(&mut self, id: &str, snapshot: &SessionSnapshot) -> Result<(), StoreError>;
}

/// String-valued key-value storage.
pub trait KeyValue {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;
}

pub fn session_key(id: &str) -> String {
    format!("chess-notes-{id}")
}

/// [`SessionStore`] that keeps snapshots as JSON text in a [`KeyValue`].
#[derive(Debug, Clone, Default)]
pub struct JsonStore<K> {
    kv: K,
}

impl<K: KeyValue> JsonStore<K> {
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    pub fn kv(&self) -> &K {
        &self.kv
    }
}

impl<K: KeyValue> SessionStore for JsonStore<K> {
    fn load(&self, id: &str) -> Option<SessionSnapshot> {
        let raw = self.kv.get(&session_key(id))?;
        match serde_json::from_str(&raw) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                tracing::warn!(id = %id, "Discarding unreadable board session: {}", e);
                None
            }
        }
    }

    fn save(&mut self, id: &str, snapshot: &SessionSnapshot) -> Result<(), StoreError> {
        let raw = serde_json::to_string(snapshot)?;
        self.kv.set(&session_key(id), raw)
    }
}

/// In-memory key-value map. Clones share the same map, so several boards
/// (or a test) can see one storage area.
#[derive(Debug, Clone, Default)]
pub struct MemoryKv {
    entries: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KeyValue for MemoryKv {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.borrow().get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.borrow_mut().insert(key.to_string(), value);
        Ok(())
    }
}

pub type MemoryStore = JsonStore<MemoryKv>;

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Square;

    #[test]
    fn test_round_trip_and_shared_handle() {
        let kv = MemoryKv::new();
        let mut store = JsonStore::new(kv.clone());
        let snapshot = SessionSnapshot {
            current_move_idx: Some(0),
            moves: Some(vec![AppliedMove::new(Square::E2, Square::E4, "e4")]),
            shapes: None,
            pgn: Some("1. e4".to_string()),
        };
        store.save("b1", &snapshot).unwrap();

        let other = JsonStore::new(kv.clone());
        assert_eq!(other.load("b1"), Some(snapshot));
        assert_eq!(other.load("b2"), None);
        assert_eq!(kv.len(), 1);
    }

    #[test]
    fn test_wire_format() {
        let kv = MemoryKv::new();
        let mut store = JsonStore::new(kv.clone());
        let snapshot = SessionSnapshot {
            current_move_idx: Some(-1),
            ..SessionSnapshot::default()
        };
        store.save("b1", &snapshot).unwrap();
        assert_eq!(kv.get("chess-notes-b1").as_deref(), Some(r#"{"currentMoveIdx":-1}"#));
    }

    #[test]
    fn test_corrupt_entry_is_absent() {
        let mut kv = MemoryKv::new();
        kv.set(&session_key("b1"), "{oops".to_string()).unwrap();
        let store = JsonStore::new(kv);
        assert_eq!(store.load("b1"), None);
    }
}
