//! Navigable move history over a live rules-engine position.
//!
//! The cursor is the index of the last played move, `-1` for the starting
//! position. After every public call the oracle's position is exactly the
//! start position with `moves[0..=cursor]` played.

use chess_core::{apply_move_tokens, AppliedMove, RulesError, RulesOracle, Square};

use crate::error::ReplayDivergence;

pub struct ReplayCursor<O> {
    oracle: O,
    moves: Vec<AppliedMove>,
    /// Number of moves currently played; the cursor is `played - 1`.
    played: usize,
}

impl<O: RulesOracle> ReplayCursor<O> {
    /// Empty history over the oracle's current position.
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            moves: Vec::new(),
            played: 0,
        }
    }

    /// Start from `start_fen` (or the standard position) and play `tokens`.
    pub fn from_tokens<F>(
        oracle: O,
        start_fen: Option<&str>,
        tokens: &[String],
        on_error: F,
    ) -> Result<Self, RulesError>
    where
        F: FnMut(&str, &RulesError),
    {
        let mut cursor = Self::new(oracle);
        cursor.load_from_tokens(start_fen, tokens, on_error)?;
        Ok(cursor)
    }

    /// Resume a trusted move list. The oracle must be on the position the
    /// moves start from. The cursor defaults to the last move and is clamped
    /// into range; a divergence stops the walk early and is returned.
    pub fn resume(
        oracle: O,
        moves: Vec<AppliedMove>,
        cursor: Option<isize>,
    ) -> (Self, Option<ReplayDivergence>) {
        let last = moves.len() as isize - 1;
        let target = cursor.unwrap_or(last).clamp(-1, last);
        let mut this = Self {
            oracle,
            moves,
            played: 0,
        };
        let divergence = this.jump_to(target).err();
        (this, divergence)
    }

    /// Replace the whole history. A bad `start_fen` leaves everything as it
    /// was; rejected tokens go to `on_error` and are skipped.
    pub fn load_from_tokens<F>(
        &mut self,
        start_fen: Option<&str>,
        tokens: &[String],
        on_error: F,
    ) -> Result<(), RulesError>
    where
        F: FnMut(&str, &RulesError),
    {
        match start_fen {
            Some(fen) => self.oracle.load_fen(fen)?,
            None => self.oracle.reset(),
        }
        self.moves = apply_move_tokens(&mut self.oracle, tokens, on_error);
        self.played = self.moves.len();
        Ok(())
    }

    /// Walk to `target`. Out-of-range targets are ignored. Returns the
    /// number of plies walked.
    pub fn jump_to(&mut self, target: isize) -> Result<usize, ReplayDivergence> {
        if target < -1 || target >= self.moves.len() as isize {
            return Ok(0);
        }
        let target_played = (target + 1) as usize;
        let mut steps = 0;

        while self.played > target_played {
            if let Err(source) = self.oracle.undo() {
                let index = self.played - 1;
                return Err(ReplayDivergence {
                    index,
                    san: self.moves[index].san.clone(),
                    steps,
                    source,
                });
            }
            self.played -= 1;
            steps += 1;
        }

        while self.played < target_played {
            let mv = &self.moves[self.played];
            if let Err(source) = self.oracle.replay(mv) {
                return Err(ReplayDivergence {
                    index: self.played,
                    san: mv.san.clone(),
                    steps,
                    source,
                });
            }
            self.played += 1;
            steps += 1;
        }

        Ok(steps)
    }

    pub fn undo(&mut self) -> Result<usize, ReplayDivergence> {
        self.jump_to(self.cursor() - 1)
    }

    pub fn redo(&mut self) -> Result<usize, ReplayDivergence> {
        self.jump_to(self.cursor() + 1)
    }

    /// Play a new move at the cursor. Any moves after the cursor are
    /// discarded.
    pub fn make_move(&mut self, from: Square, to: Square) -> Result<AppliedMove, RulesError> {
        let mv = self.oracle.apply_squares(from, to)?;
        self.moves.truncate(self.played);
        self.moves.push(mv.clone());
        self.played += 1;
        Ok(mv)
    }

    pub fn cursor(&self) -> isize {
        self.played as isize - 1
    }

    pub fn moves(&self) -> &[AppliedMove] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }

    /// The move that led to the current position.
    pub fn last_move(&self) -> Option<&AppliedMove> {
        self.played.checked_sub(1).map(|i| &self.moves[i])
    }

    pub fn oracle(&self) -> &O {
        &self.oracle
    }
}
