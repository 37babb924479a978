//! Turning untrusted move text into a trusted move list.

use crate::error::RulesError;
use crate::game_data::AppliedMove;
use crate::oracle::RulesOracle;

/// Split every entry on whitespace and flatten, dropping empty pieces.
/// `["e4 e5", " Nc3"]` becomes `["e4", "e5", "Nc3"]`.
pub fn normalize_move_tokens<S: AsRef<str>>(moves: &[S]) -> Vec<String> {
    moves
        .iter()
        .flat_map(|entry| entry.as_ref().split_whitespace())
        .map(str::to_string)
        .collect()
}

/// Play `tokens` in order on the oracle's current position.
///
/// A rejected token leaves the position as it was, is passed to `on_error`
/// and the fold moves on to the next token. Returns only the moves that
/// were played.
pub fn apply_move_tokens<O, F>(oracle: &mut O, tokens: &[String], mut on_error: F) -> Vec<AppliedMove>
where
    O: RulesOracle + ?Sized,
    F: FnMut(&str, &RulesError),
{
    let mut applied = Vec::with_capacity(tokens.len());
    for token in tokens {
        match oracle.apply_san(token) {
            Ok(mv) => applied.push(mv),
            Err(e) => on_error(token, &e),
        }
    }
    applied
}
