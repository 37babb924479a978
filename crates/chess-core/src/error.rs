//! Rules engine error types

use thiserror::Error;

/// Why the rules engine refused an operation. A refused operation never
/// changes the position.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    #[error("Unparseable move '{0}'")]
    UnparseableMove(String),

    #[error("Illegal move '{0}'")]
    IllegalMove(String),

    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Invalid PGN: {0}")]
    InvalidPgn(String),

    #[error("PGN contains no game")]
    EmptyGameRecord,

    #[error("Nothing to undo")]
    NothingToUndo,
}
