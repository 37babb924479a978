//! Contracts with the collaborators a board lives inside: the document host
//! and the board widget.

use std::time::Duration;

use chess_core::{Dests, Side, Square};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::BlockConfig;
use crate::error::HostError;

/// A drawn annotation (arrow or circle). Opaque to the session; fields the
/// widget adds are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub orig: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dest: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brush: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Shape {
    pub fn arrow(orig: &str, dest: &str, brush: &str) -> Self {
        Self {
            orig: orig.to_string(),
            dest: Some(dest.to_string()),
            brush: Some(brush.to_string()),
            extra: Map::new(),
        }
    }
}

/// The document host a board is embedded in.
pub trait Host {
    /// Merge `patch` into the block this board was rendered from.
    fn write_block_config(&mut self, patch: &BlockConfig) -> Result<(), HostError>;

    /// Show a short message to the user.
    fn notice(&mut self, message: &str);

    /// Ask to have `BoardSession::run_deferred` called once the host is
    /// ready, no sooner than `after`.
    fn request_deferred(&mut self, after: Duration);
}

/// Who may move pieces on the widget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovableColor {
    Side(Side),
    Both,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Movable {
    pub free: bool,
    pub color: MovableColor,
    /// `None` when any move is allowed.
    pub dests: Option<Dests>,
}

/// Initial widget state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSetup {
    pub fen: String,
    pub last_move: Option<(Square, Square)>,
    pub orientation: Side,
    pub view_only: bool,
    pub drawable: bool,
    pub classes: Vec<String>,
}

/// Partial widget update; `None` fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardUpdate {
    pub fen: Option<String>,
    /// `Some(None)` clears the highlight.
    pub last_move: Option<Option<(Square, Square)>>,
    pub orientation: Option<Side>,
    pub check: Option<bool>,
    pub turn_color: Option<Side>,
    pub movable: Option<Movable>,
}

/// The interactive board. It reports moves and shape edits back through
/// `BoardSession::on_move` and `BoardSession::on_shapes_changed`.
pub trait BoardWidget {
    fn create(&mut self, setup: &BoardSetup) -> Result<(), HostError>;

    fn update(&mut self, update: &BoardUpdate);

    fn set_shapes(&mut self, shapes: &[Shape]);
}
