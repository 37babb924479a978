//! Board configuration: plugin-wide settings, the embedded block, and the
//! layered merge that produces what a board actually renders with.

use chess_core::{AppliedMove, Side};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::ConfigError;
use crate::host::Shape;
use crate::store::SessionSnapshot;

pub const PIECE_STYLES: &[&str] = &[
    "alpha",
    "california",
    "cardinal",
    "cburnett",
    "chess7",
    "chessnut",
    "companion",
    "dubrovny",
    "fantasy",
    "fresca",
    "gioco",
    "governor",
    "horsey",
    "icpieces",
    "kosal",
    "leipzig",
    "letter",
    "libra",
    "maestro",
    "merida",
    "pirouetti",
    "pixel",
    "reillycraig",
    "riohacha",
    "shapes",
    "spatial",
    "staunty",
    "tatiana",
];

pub const BOARD_STYLES: &[&str] = &["blue", "brown", "green", "ic", "purple"];

/// A piece set name from [`PIECE_STYLES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PieceStyle(String);

impl PieceStyle {
    pub fn parse(name: &str) -> Option<Self> {
        PIECE_STYLES.contains(&name).then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PieceStyle {
    fn default() -> Self {
        Self("cburnett".to_string())
    }
}

impl TryFrom<String> for PieceStyle {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::parse(&name).ok_or_else(|| format!("unknown piece style '{name}'"))
    }
}

impl From<PieceStyle> for String {
    fn from(style: PieceStyle) -> Self {
        style.0
    }
}

/// A board colour scheme from [`BOARD_STYLES`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BoardStyle(String);

impl BoardStyle {
    pub fn parse(name: &str) -> Option<Self> {
        BOARD_STYLES.contains(&name).then(|| Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BoardStyle {
    fn default() -> Self {
        Self("brown".to_string())
    }
}

impl TryFrom<String> for BoardStyle {
    type Error = String;

    fn try_from(name: String) -> Result<Self, Self::Error> {
        Self::parse(&name).ok_or_else(|| format!("unknown board style '{name}'"))
    }
}

impl From<BoardStyle> for String {
    fn from(style: BoardStyle) -> Self {
        style.0
    }
}

/// Plugin-wide display defaults.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub orientation: Side,
    pub view_only: bool,
    pub drawable: bool,
    pub free: bool,
    pub piece_style: PieceStyle,
    pub board_style: BoardStyle,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            orientation: Side::White,
            view_only: false,
            drawable: true,
            free: false,
            piece_style: PieceStyle::default(),
            board_style: BoardStyle::default(),
        }
    }
}

impl Settings {
    /// Saved settings over the defaults. Missing fields keep their default;
    /// unreadable settings fall back to the defaults entirely.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str(text) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to parse saved settings, using defaults: {}", e);
                Self::default()
            }
        }
    }

    /// Container classes selecting the piece set and board colours.
    pub fn style_classes(&self) -> Vec<String> {
        vec![
            self.piece_style.as_str().to_string(),
            format!("{}-board", self.board_style.as_str()),
            "chess-notes-container".to_string(),
        ]
    }
}

/// Fields recognised in an embedded board block. Every field is optional
/// and a field with the wrong shape is dropped on its own.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockConfig {
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub fen: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub pgn: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub orientation: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub view_only: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub drawable: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub free: Option<bool>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub piece_style: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub board_style: Option<String>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub current_move_idx: Option<isize>,
    #[serde(default, deserialize_with = "move_entries", skip_serializing_if = "Option::is_none")]
    pub moves: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient", skip_serializing_if = "Option::is_none")]
    pub shapes: Option<Vec<Shape>>,
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if value.is_null() {
        return Ok(None);
    }
    match T::deserialize(value) {
        Ok(parsed) => Ok(Some(parsed)),
        Err(e) => {
            warn!("Ignoring malformed config field: {}", e);
            Ok(None)
        }
    }
}

/// `moves` may be one string ("e4 e5 Nf3") or a list of strings.
fn move_entries<'de, D>(deserializer: D) -> Result<Option<Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = match Value::deserialize(deserializer)? {
        Value::String(entry) => Some(vec![entry]),
        Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|item| match item {
                    Value::String(entry) => Some(entry),
                    other => {
                        warn!("Ignoring non-string move entry: {}", other);
                        None
                    }
                })
                .collect(),
        ),
        Value::Null => None,
        other => {
            warn!("Ignoring malformed moves field: {}", other);
            None
        }
    };
    Ok(entries)
}

/// Parse the text of an embedded block. The block is YAML (so JSON works
/// too); blank text is an empty block.
pub fn parse_block(text: &str) -> Result<BlockConfig, ConfigError> {
    if text.trim().is_empty() {
        return Ok(BlockConfig::default());
    }
    let value: Value = serde_yaml::from_str(text)?;
    if !value.is_object() {
        return Err(ConfigError::NotAnObject);
    }
    Ok(serde_json::from_value(value)?)
}

/// Apply `patch` to the text of a block and return the new block text.
/// Fields the patch does not set, including ones this crate does not know,
/// are kept. Unreadable text is replaced by the patch alone.
pub fn merge_block(text: &str, patch: &BlockConfig) -> Result<String, ConfigError> {
    let mut block = match serde_yaml::from_str::<serde_yaml::Value>(text) {
        Ok(serde_yaml::Value::Mapping(fields)) => fields,
        Ok(_) => serde_yaml::Mapping::new(),
        Err(e) => {
            warn!("Replacing unreadable board block: {}", e);
            serde_yaml::Mapping::new()
        }
    };
    if let serde_yaml::Value::Mapping(fields) = serde_yaml::to_value(patch)? {
        for (key, value) in fields {
            block.insert(key, value);
        }
    }
    Ok(serde_yaml::to_string(&block)?)
}

/// Where the initial move list comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveSource {
    /// Untrusted notation from the block.
    Tokens(Vec<String>),
    /// Moves validated in an earlier session.
    Applied(Vec<AppliedMove>),
}

/// The merged configuration a board is built from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EffectiveConfig {
    pub id: Option<String>,
    pub fen: Option<String>,
    pub pgn: Option<String>,
    pub settings: Settings,
    pub current_move_idx: Option<isize>,
    pub moves: Option<MoveSource>,
    pub shapes: Vec<Shape>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Merge defaults, the block and the saved session; later layers win field
/// by field. Enum fields outside their closed set keep the lower layer's
/// value. Never fails.
pub fn resolve(
    defaults: &Settings,
    block: Option<&BlockConfig>,
    session: Option<&SessionSnapshot>,
) -> EffectiveConfig {
    let mut config = EffectiveConfig {
        settings: defaults.clone(),
        ..EffectiveConfig::default()
    };

    if let Some(block) = block {
        config.id = non_blank(&block.id);
        config.fen = non_blank(&block.fen);
        config.pgn = non_blank(&block.pgn);

        let settings = &mut config.settings;
        if let Some(name) = &block.orientation {
            match name.parse::<Side>() {
                Ok(side) => settings.orientation = side,
                Err(()) => warn!(orientation = %name, "Unknown orientation, keeping default"),
            }
        }
        if let Some(name) = &block.piece_style {
            match PieceStyle::parse(name) {
                Some(style) => settings.piece_style = style,
                None => warn!(piece_style = %name, "Unknown piece style, keeping default"),
            }
        }
        if let Some(name) = &block.board_style {
            match BoardStyle::parse(name) {
                Some(style) => settings.board_style = style,
                None => warn!(board_style = %name, "Unknown board style, keeping default"),
            }
        }
        settings.view_only = block.view_only.unwrap_or(settings.view_only);
        settings.drawable = block.drawable.unwrap_or(settings.drawable);
        settings.free = block.free.unwrap_or(settings.free);

        config.current_move_idx = block.current_move_idx;
        config.moves = block.moves.clone().map(MoveSource::Tokens);
        if let Some(shapes) = &block.shapes {
            config.shapes = shapes.clone();
        }
    }

    if let Some(session) = session {
        if let Some(pgn) = non_blank(&session.pgn) {
            config.pgn = Some(pgn);
        }
        if let Some(idx) = session.current_move_idx {
            config.current_move_idx = Some(idx);
        }
        if let Some(moves) = &session.moves {
            config.moves = Some(MoveSource::Applied(moves.clone()));
        }
        if let Some(shapes) = &session.shapes {
            config.shapes = shapes.clone();
        }
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess_core::Square;

    #[test]
    fn test_parse_block_full() {
        let block = parse_block(
            r#"{
                "id": "abc123",
                "fen": "8/8/8/8/8/8/8/K6k w - - 0 1",
                "orientation": "black",
                "viewOnly": true,
                "pieceStyle": "merida",
                "currentMoveIdx": 2,
                "moves": ["e4 e5", "Nf3"],
                "somethingElse": 42
            }"#,
        )
        .unwrap();
        assert_eq!(block.id.as_deref(), Some("abc123"));
        assert_eq!(block.orientation.as_deref(), Some("black"));
        assert_eq!(block.view_only, Some(true));
        assert_eq!(block.current_move_idx, Some(2));
        assert_eq!(block.moves, Some(vec!["e4 e5".to_string(), "Nf3".to_string()]));
    }

    #[test]
    fn test_parse_block_drops_bad_fields_only() {
        let block = parse_block(r#"{"id": 7, "viewOnly": "yes", "moves": "d4 d5", "free": true}"#).unwrap();
        assert_eq!(block.id, None);
        assert_eq!(block.view_only, None);
        assert_eq!(block.moves, Some(vec!["d4 d5".to_string()]));
        assert_eq!(block.free, Some(true));
    }

    #[test]
    fn test_parse_block_failures() {
        assert!(matches!(parse_block("[1, 2]"), Err(ConfigError::NotAnObject)));
        assert!(matches!(parse_block("{not json"), Err(ConfigError::Yaml(_))));
        assert!(matches!(parse_block("just words"), Err(ConfigError::NotAnObject)));
        assert_eq!(parse_block("  \n").unwrap(), BlockConfig::default());
    }

    #[test]
    fn test_parse_yaml_block() {
        let block = parse_block(
            "id: b1\norientation: black\nviewOnly: yes\ncurrentMoveIdx: 0\nmoves:\n  - e4 e5\n  - Nf3\n",
        )
        .unwrap();
        assert_eq!(block.id.as_deref(), Some("b1"));
        assert_eq!(block.orientation.as_deref(), Some("black"));
        // YAML 1.2: "yes" is a string, not a bool.
        assert_eq!(block.view_only, None);
        assert_eq!(block.current_move_idx, Some(0));
        assert_eq!(block.moves, Some(vec!["e4 e5".to_string(), "Nf3".to_string()]));

        let block = parse_block("moves: e4 e5 Nf3\nshapes:\n  - orig: e2\n    dest: e4\n    brush: green\n").unwrap();
        assert_eq!(block.moves, Some(vec!["e4 e5 Nf3".to_string()]));
        assert_eq!(block.shapes, Some(vec![Shape::arrow("e2", "e4", "green")]));
    }

    #[test]
    fn test_merge_block_keeps_other_fields() {
        let patch = BlockConfig {
            id: Some("x1".to_string()),
            ..BlockConfig::default()
        };
        let text = merge_block("fen: 8/8/8/8/8/8/8/K6k w - - 0 1\ncolor: red\n", &patch).unwrap();
        let merged = parse_block(&text).unwrap();
        assert_eq!(merged.id.as_deref(), Some("x1"));
        assert_eq!(merged.fen.as_deref(), Some("8/8/8/8/8/8/8/K6k w - - 0 1"));
        assert!(text.contains("color: red"));
        assert!(text.starts_with("fen:"));

        let text = merge_block("{broken", &patch).unwrap();
        assert_eq!(text.trim(), "id: x1");
    }

    #[test]
    fn test_block_patch_serializes_only_set_fields() {
        let patch = BlockConfig {
            id: Some("x1".to_string()),
            ..BlockConfig::default()
        };
        assert_eq!(serde_json::to_string(&patch).unwrap(), r#"{"id":"x1"}"#);
    }

    #[test]
    fn test_settings_from_json() {
        let settings = Settings::from_json(r#"{"orientation": "black", "boardStyle": "green"}"#);
        assert_eq!(settings.orientation, Side::Black);
        assert_eq!(settings.board_style.as_str(), "green");
        assert!(settings.drawable);

        assert_eq!(Settings::from_json(r#"{"pieceStyle": "comic-sans"}"#), Settings::default());
        assert_eq!(Settings::from_json("nonsense"), Settings::default());
    }

    #[test]
    fn test_style_classes() {
        assert_eq!(
            Settings::default().style_classes(),
            vec!["cburnett", "brown-board", "chess-notes-container"]
        );
    }

    #[test]
    fn test_resolve_without_block_is_defaults() {
        let defaults = Settings {
            orientation: Side::Black,
            ..Settings::default()
        };
        let config = resolve(&defaults, None, None);
        assert_eq!(config.settings, defaults);
        assert_eq!(config.id, None);
        assert_eq!(config.moves, None);
    }

    #[test]
    fn test_resolve_validates_enums() {
        let block = BlockConfig {
            orientation: Some("sideways".to_string()),
            piece_style: Some("pixel".to_string()),
            board_style: Some("plaid".to_string()),
            fen: Some("   ".to_string()),
            ..BlockConfig::default()
        };
        let config = resolve(&Settings::default(), Some(&block), None);
        assert_eq!(config.settings.orientation, Side::White);
        assert_eq!(config.settings.piece_style.as_str(), "pixel");
        assert_eq!(config.settings.board_style.as_str(), "brown");
        assert_eq!(config.fen, None);
    }

    #[test]
    fn test_resolve_session_overrides_block() {
        let block = BlockConfig {
            pgn: Some("1. e4 *".to_string()),
            current_move_idx: Some(0),
            moves: Some(vec!["e4".to_string()]),
            drawable: Some(false),
            ..BlockConfig::default()
        };
        let saved = vec![
            AppliedMove::new(Square::D2, Square::D4, "d4"),
            AppliedMove::new(Square::D7, Square::D5, "d5"),
        ];
        let session = SessionSnapshot {
            current_move_idx: Some(-1),
            moves: Some(saved.clone()),
            shapes: None,
            pgn: Some("".to_string()),
        };
        let config = resolve(&Settings::default(), Some(&block), Some(&session));
        assert_eq!(config.current_move_idx, Some(-1));
        assert_eq!(config.moves, Some(MoveSource::Applied(saved)));
        // Blank saved record does not erase the block's.
        assert_eq!(config.pgn.as_deref(), Some("1. e4 *"));
        assert!(!config.settings.drawable);
    }
}
