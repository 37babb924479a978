//! PGN game records: read with pgn-reader, written back as SAN movetext.

use std::io::Cursor;
use std::ops::ControlFlow;

use pgn_reader::{RawTag, Reader, SanPlus, Skip, Visitor};
use shakmaty::{fen::Fen, CastlingMode, Chess, Color, EnPassantMode, Move, Position};

use crate::error::RulesError;
use crate::game_data::AppliedMove;

pub const STANDARD_START_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// A parsed and validated game: where it starts and the mainline moves.
#[derive(Debug, Clone)]
pub struct GameRecord {
    pub start: Chess,
    pub moves: Vec<Move>,
}

/// Raw mainline collected while reading movetext.
struct Mainline {
    fen: Option<String>,
    sans: Vec<SanPlus>,
}

/// Visitor that keeps the FEN tag and mainline SAN, skipping variations.
struct MainlineCollector;

impl Visitor for MainlineCollector {
    type Tags = Option<String>;
    type Movetext = Mainline;
    type Output = Mainline;

    fn begin_tags(&mut self) -> ControlFlow<Mainline, Option<String>> {
        ControlFlow::Continue(None)
    }

    fn tag(&mut self, fen: &mut Option<String>, name: &[u8], value: RawTag<'_>) -> ControlFlow<Mainline> {
        if name == b"FEN" {
            *fen = Some(value.decode_utf8_lossy().into_owned());
        }
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, fen: Option<String>) -> ControlFlow<Mainline, Mainline> {
        ControlFlow::Continue(Mainline {
            fen,
            sans: Vec::new(),
        })
    }

    fn san(&mut self, mainline: &mut Mainline, san_plus: SanPlus) -> ControlFlow<Mainline> {
        mainline.sans.push(san_plus);
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, _mainline: &mut Mainline) -> ControlFlow<Mainline, Skip> {
        ControlFlow::Continue(Skip(true))
    }

    fn end_game(&mut self, mainline: Mainline) -> Mainline {
        mainline
    }
}

/// Parse a position from FEN text.
pub fn parse_fen(fen: &str) -> Result<Chess, RulesError> {
    let invalid = |reason: String| RulesError::InvalidFen {
        fen: fen.to_string(),
        reason,
    };
    let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
    parsed
        .into_position::<Chess>(CastlingMode::Standard)
        .map_err(|e| invalid(format!("{e}")))
}

/// Serialize a position as FEN.
pub fn to_fen(pos: &Chess) -> String {
    Fen::from_position(pos, EnPassantMode::Legal).to_string()
}

/// Read the first game of a PGN document and validate its mainline.
/// Any unplayable move rejects the whole record.
pub fn read_game_record(pgn: &str) -> Result<GameRecord, RulesError> {
    let mut reader = Reader::new(Cursor::new(pgn.as_bytes()));
    let mainline = reader
        .read_game(&mut MainlineCollector)
        .map_err(|e| RulesError::InvalidPgn(e.to_string()))?
        .ok_or(RulesError::EmptyGameRecord)?;

    let start = match mainline.fen.as_deref() {
        Some(fen) => parse_fen(fen).map_err(|e| RulesError::InvalidPgn(e.to_string()))?,
        None => Chess::default(),
    };

    let mut pos = start.clone();
    let mut moves = Vec::with_capacity(mainline.sans.len());
    for (ply, san_plus) in mainline.sans.iter().enumerate() {
        let mv = san_plus.san.to_move(&pos).map_err(|_| {
            RulesError::InvalidPgn(format!("illegal move '{}' at ply {}", san_plus, ply + 1))
        })?;
        pos.play_unchecked(mv.clone());
        moves.push(mv);
    }

    Ok(GameRecord { start, moves })
}

/// Write moves played from `start` as PGN. Non-standard starts get
/// `SetUp`/`FEN` headers so the record can be read back. The movetext
/// always ends with the `*` result, so even an empty game is a record.
pub fn write_pgn(start: &Chess, moves: &[AppliedMove]) -> String {
    let mut out = String::new();
    let start_fen = to_fen(start);
    if start_fen != STANDARD_START_FEN {
        out.push_str("[SetUp \"1\"]\n");
        out.push_str(&format!("[FEN \"{start_fen}\"]\n\n"));
    }

    let mut number = start.fullmoves().get();
    let mut turn = start.turn();
    let mut tokens: Vec<String> = Vec::with_capacity(moves.len() + moves.len() / 2 + 1);
    for (i, mv) in moves.iter().enumerate() {
        match turn {
            Color::White => tokens.push(format!("{number}.")),
            Color::Black if i == 0 => tokens.push(format!("{number}...")),
            Color::Black => {}
        }
        tokens.push(mv.san.clone());
        if turn == Color::Black {
            number += 1;
        }
        turn = !turn;
    }
    tokens.push("*".to_string());

    out.push_str(&tokens.join(" "));
    out
}
