//! Chess rules boundary and move-list utilities shared by the board
//! session layer.

pub mod error;
pub mod game_data;
pub mod move_sequence;
pub mod openings;
pub mod oracle;
pub mod pgn;

pub use error::RulesError;
pub use game_data::{AppliedMove, Side};
pub use move_sequence::{apply_move_tokens, normalize_move_tokens};
pub use oracle::{Dests, RulesOracle, ShakmatyOracle};

pub use shakmaty::Square;
