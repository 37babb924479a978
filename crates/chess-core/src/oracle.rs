//! The rules engine boundary.
//!
//! Everything above this module treats chess rules as a black box: moves
//! go in as SAN tokens or square pairs and come back as [`AppliedMove`]s
//! or a [`RulesError`]. A rejected operation never mutates the position.

use std::collections::BTreeMap;

use shakmaty::{san::San, san::SanPlus, Chess, File, Move, Position, Role, Square};

use crate::error::RulesError;
use crate::game_data::{AppliedMove, Side};
use crate::pgn;

/// Legal destinations keyed by origin square.
pub type Dests = BTreeMap<Square, Vec<Square>>;

pub trait RulesOracle {
    /// Return to the standard starting position with no history.
    fn reset(&mut self);

    /// Replace the game with a position and no history.
    fn load_fen(&mut self, fen: &str) -> Result<(), RulesError>;

    /// Replace the game with a PGN record; its moves become the history.
    fn load_pgn(&mut self, pgn: &str) -> Result<(), RulesError>;

    /// Parse a SAN token and play it.
    fn apply_san(&mut self, token: &str) -> Result<AppliedMove, RulesError>;

    /// Play the legal move between two squares.
    fn apply_squares(&mut self, from: Square, to: Square) -> Result<AppliedMove, RulesError>;

    /// Take back the last ply.
    fn undo(&mut self) -> Result<AppliedMove, RulesError>;

    fn turn(&self) -> Side;

    fn in_check(&self) -> bool;

    fn legal_destinations(&self) -> Dests;

    fn fen(&self) -> String;

    /// Plies played since the last reset/load, oldest first.
    fn history(&self) -> Vec<AppliedMove>;

    fn ply_count(&self) -> usize;

    /// The game so far as PGN.
    fn pgn(&self) -> String;

    /// Play a move that was accepted earlier. The replayed ply must land on
    /// the same squares, otherwise it is taken back and rejected.
    fn replay(&mut self, mv: &AppliedMove) -> Result<AppliedMove, RulesError> {
        let replayed = self.apply_san(&mv.san)?;
        if replayed.squares() != mv.squares() {
            self.undo()?;
            return Err(RulesError::IllegalMove(mv.san.clone()));
        }
        Ok(replayed)
    }

    /// Take back every ply, landing on the position the game started from.
    fn rewind(&mut self) {
        while self.undo().is_ok() {}
    }
}

struct Ply {
    before: Chess,
    applied: AppliedMove,
}

/// [`RulesOracle`] backed by shakmaty. Keeps the position before every
/// ply so undo is a pop.
#[derive(Default)]
pub struct ShakmatyOracle {
    start: Chess,
    position: Chess,
    plies: Vec<Ply>,
}

impl ShakmatyOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_fen(fen: &str) -> Result<Self, RulesError> {
        let mut oracle = Self::new();
        oracle.load_fen(fen)?;
        Ok(oracle)
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    fn play(&mut self, mv: &Move) -> AppliedMove {
        let san = San::from_move(&self.position, mv.clone());
        let before = self.position.clone();
        self.position.play_unchecked(mv.clone());

        let suffix = if self.position.is_checkmate() {
            "#"
        } else if self.position.is_check() {
            "+"
        } else {
            ""
        };
        let (from, to) = move_squares(mv);
        let applied = AppliedMove::new(from, to, format!("{san}{suffix}"));
        self.plies.push(Ply {
            before,
            applied: applied.clone(),
        });
        applied
    }

    fn restart_from(&mut self, start: Chess) {
        self.position = start.clone();
        self.start = start;
        self.plies.clear();
    }
}

impl RulesOracle for ShakmatyOracle {
    fn reset(&mut self) {
        self.restart_from(Chess::default());
    }

    fn load_fen(&mut self, fen: &str) -> Result<(), RulesError> {
        let pos = pgn::parse_fen(fen)?;
        self.restart_from(pos);
        Ok(())
    }

    fn load_pgn(&mut self, pgn_text: &str) -> Result<(), RulesError> {
        let record = pgn::read_game_record(pgn_text)?;
        self.restart_from(record.start);
        for mv in &record.moves {
            self.play(mv);
        }
        Ok(())
    }

    fn apply_san(&mut self, token: &str) -> Result<AppliedMove, RulesError> {
        // Annotation glyphs are not part of SAN.
        let cleaned = token.trim().trim_end_matches(['!', '?']);
        let san_plus: SanPlus = cleaned
            .parse()
            .map_err(|_| RulesError::UnparseableMove(token.to_string()))?;
        let mv = san_plus
            .san
            .to_move(&self.position)
            .map_err(|_| RulesError::IllegalMove(token.to_string()))?;
        Ok(self.play(&mv))
    }

    fn apply_squares(&mut self, from: Square, to: Square) -> Result<AppliedMove, RulesError> {
        let legals = self.position.legal_moves();
        let candidates: Vec<&Move> = legals
            .iter()
            .filter(|m| m.from() == Some(from) && (m.to() == to || move_squares(m).1 == to))
            .collect();

        // A bare square pair promotes to a queen.
        let chosen = candidates
            .iter()
            .find(|m| matches!(m.promotion(), None | Some(Role::Queen)))
            .or_else(|| candidates.first())
            .map(|m| (*m).clone())
            .ok_or_else(|| RulesError::IllegalMove(format!("{from}{to}")))?;

        Ok(self.play(&chosen))
    }

    fn undo(&mut self) -> Result<AppliedMove, RulesError> {
        let ply = self.plies.pop().ok_or(RulesError::NothingToUndo)?;
        self.position = ply.before;
        Ok(ply.applied)
    }

    fn turn(&self) -> Side {
        self.position.turn().into()
    }

    fn in_check(&self) -> bool {
        self.position.is_check()
    }

    fn legal_destinations(&self) -> Dests {
        let mut dests = Dests::new();
        for mv in self.position.legal_moves().iter() {
            let (from, to) = move_squares(mv);
            let targets = dests.entry(from).or_default();
            // Promotions repeat the same destination once per role.
            if !targets.contains(&to) {
                targets.push(to);
            }
        }
        dests
    }

    fn fen(&self) -> String {
        pgn::to_fen(&self.position)
    }

    fn history(&self) -> Vec<AppliedMove> {
        self.plies.iter().map(|ply| ply.applied.clone()).collect()
    }

    fn ply_count(&self) -> usize {
        self.plies.len()
    }

    fn pgn(&self) -> String {
        pgn::write_pgn(&self.start, &self.history())
    }
}

/// Origin and destination as a board widget shows them. Castling is
/// reported as the king's two-square step rather than king-takes-rook.
pub fn move_squares(mv: &Move) -> (Square, Square) {
    match mv {
        Move::Normal { from, to, .. } => (*from, *to),
        Move::EnPassant { from, to } => (*from, *to),
        Move::Castle { king, rook } => {
            let file = if rook.file() > king.file() { File::G } else { File::C };
            (*king, Square::from_coords(file, king.rank()))
        }
        Move::Put { to, .. } => (*to, *to),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_san_and_undo() {
        let mut oracle = ShakmatyOracle::new();
        let mv = oracle.apply_san("e4").unwrap();
        assert_eq!(mv, AppliedMove::new(Square::E2, Square::E4, "e4"));
        assert_eq!(oracle.turn(), Side::Black);
        assert_eq!(oracle.ply_count(), 1);

        let undone = oracle.undo().unwrap();
        assert_eq!(undone.san, "e4");
        assert_eq!(oracle.fen(), pgn::STANDARD_START_FEN);
        assert_eq!(oracle.undo(), Err(RulesError::NothingToUndo));
    }

    #[test]
    fn test_rejected_move_leaves_position() {
        let mut oracle = ShakmatyOracle::new();
        let before = oracle.fen();
        assert!(matches!(
            oracle.apply_san("bad"),
            Err(RulesError::UnparseableMove(_))
        ));
        assert!(matches!(oracle.apply_san("e5"), Err(RulesError::IllegalMove(_))));
        assert!(oracle.apply_squares(Square::E2, Square::E5).is_err());
        assert_eq!(oracle.fen(), before);
        assert_eq!(oracle.ply_count(), 0);
    }

    #[test]
    fn test_check_suffix_and_in_check() {
        let mut oracle = ShakmatyOracle::new();
        for token in ["e4", "f5", "Qh5+"] {
            oracle.apply_san(token).unwrap();
        }
        assert!(oracle.in_check());
        assert_eq!(oracle.history().last().unwrap().san, "Qh5+");
    }

    #[test]
    fn test_mate_suffix() {
        let mut oracle = ShakmatyOracle::new();
        let mut last = None;
        for token in ["f3", "e5", "g4", "Qh4"] {
            last = Some(oracle.apply_san(token).unwrap());
        }
        assert_eq!(last.unwrap().san, "Qh4#");
        assert!(oracle.legal_destinations().is_empty());
    }

    #[test]
    fn test_castling_squares() {
        let mut oracle =
            ShakmatyOracle::from_fen("r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1").unwrap();
        let dests = oracle.legal_destinations();
        let king = &dests[&Square::E1];
        assert!(king.contains(&Square::G1));
        assert!(king.contains(&Square::C1));

        let mv = oracle.apply_squares(Square::E1, Square::G1).unwrap();
        assert_eq!(mv.san, "O-O");
        assert_eq!(mv.squares(), (Square::E1, Square::G1));
    }

    #[test]
    fn test_bare_promotion_picks_queen() {
        let mut oracle = ShakmatyOracle::from_fen("8/4P3/8/8/8/8/k7/4K3 w - - 0 1").unwrap();
        let dests = oracle.legal_destinations();
        assert_eq!(dests[&Square::E7], vec![Square::E8]);

        let mv = oracle.apply_squares(Square::E7, Square::E8).unwrap();
        assert_eq!(mv.san, "e8=Q");
    }

    #[test]
    fn test_load_pgn_then_rewind() {
        let mut oracle = ShakmatyOracle::new();
        oracle.load_pgn("1. d4 d5 2. c4 *").unwrap();
        assert_eq!(oracle.ply_count(), 3);
        assert_eq!(oracle.pgn(), "1. d4 d5 2. c4 *");

        oracle.rewind();
        assert_eq!(oracle.ply_count(), 0);
        assert_eq!(oracle.fen(), pgn::STANDARD_START_FEN);
    }

    #[test]
    fn test_failed_load_keeps_game() {
        let mut oracle = ShakmatyOracle::new();
        oracle.apply_san("e4").unwrap();
        assert!(oracle.load_fen("garbage").is_err());
        assert!(oracle.load_pgn("1. e4 e5 2. Qxf7 *").is_err());
        assert_eq!(oracle.ply_count(), 1);
    }

    #[test]
    fn test_replay_checks_squares() {
        let mut oracle = ShakmatyOracle::new();
        let forged = AppliedMove::new(Square::D2, Square::D4, "e4");
        assert!(oracle.replay(&forged).is_err());
        assert_eq!(oracle.ply_count(), 0);

        let genuine = AppliedMove::new(Square::E2, Square::E4, "e4");
        assert_eq!(oracle.replay(&genuine).unwrap(), genuine);
    }

    #[test]
    fn test_annotation_glyphs_ignored() {
        let mut oracle = ShakmatyOracle::new();
        assert_eq!(oracle.apply_san("e4!?").unwrap().san, "e4");
    }
}
