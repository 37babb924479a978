//! One rendered board: config in, widget updates and session writes out.
//!
//! Every public operation runs to completion and never returns an error.
//! Failures are logged and shown to the user as a notice; the board stays
//! usable.

use std::time::Duration;

use chess_core::{
    apply_move_tokens, normalize_move_tokens, openings, pgn, AppliedMove, Dests, RulesOracle,
    ShakmatyOracle, Side, Square,
};
use tracing::{debug, error, info, warn};

use crate::config::{self, BlockConfig, EffectiveConfig, MoveSource, Settings};
use crate::error::ReplayDivergence;
use crate::history::ReplayCursor;
use crate::host::{BoardSetup, BoardUpdate, BoardWidget, Host, Movable, MovableColor, Shape};
use crate::notice::{Messages, NoticeKey};
use crate::store::{SessionSnapshot, SessionStore};

/// Selector value for the standard starting position.
pub const STARTING_POSITION: &str = "starting-position";
/// Selector value for a position that is not in the catalog.
pub const CUSTOM_POSITION: &str = "custom";

const WRITE_ID_DELAY: Duration = Duration::ZERO;
const APPLY_SHAPES_DELAY: Duration = Duration::from_millis(100);

/// Work that has to wait until the host has finished its own setup.
#[derive(Debug, Clone, PartialEq)]
pub enum DeferredTask {
    /// Write the generated id back into the block.
    WriteId,
    /// Redraw annotations saved by an earlier session.
    ApplyShapes(Vec<Shape>),
}

/// The collaborators a board is wired to.
pub struct Collaborators {
    pub store: Box<dyn SessionStore>,
    pub widget: Box<dyn BoardWidget>,
    pub host: Box<dyn Host>,
    pub messages: Messages,
}

impl Collaborators {
    pub fn new(
        store: Box<dyn SessionStore>,
        widget: Box<dyn BoardWidget>,
        host: Box<dyn Host>,
    ) -> Self {
        Self {
            store,
            widget,
            host,
            messages: Messages::default(),
        }
    }

    pub fn with_messages(mut self, messages: Messages) -> Self {
        self.messages = messages;
        self
    }

    fn notify(&mut self, key: NoticeKey, vars: &[(&str, &str)]) {
        let text = self.messages.text(key, vars);
        self.host.notice(&text);
    }
}

/// One entry of the move list shown next to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveListEntry {
    pub index: usize,
    pub notation: String,
    pub active: bool,
}

pub struct BoardSession<O: RulesOracle = ShakmatyOracle> {
    id: String,
    settings: Settings,
    orientation: Side,
    free: bool,
    rendered: bool,
    cursor: ReplayCursor<O>,
    pending: Vec<DeferredTask>,
    parts: Collaborators,
}

/// A short random id for a block that has none.
pub fn generate_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

impl<O: RulesOracle> BoardSession<O> {
    /// Build a board from the text of its embedded block.
    pub fn render(source: &str, defaults: &Settings, oracle: O, mut parts: Collaborators) -> Self {
        let block = match config::parse_block(source) {
            Ok(block) => Some(block),
            Err(e) => {
                warn!("Malformed board config, using defaults: {}", e);
                parts.notify(NoticeKey::InvalidConfig, &[]);
                None
            }
        };

        let block_id = block
            .as_ref()
            .and_then(|b| b.id.clone())
            .filter(|id| !id.trim().is_empty());
        let id_generated = block_id.is_none();
        let id = block_id.unwrap_or_else(generate_id);

        let saved = parts.store.load(&id);
        let mut config = config::resolve(defaults, block.as_ref(), saved.as_ref());
        debug!(id = %id, resumed = saved.is_some(), "Rendering board");

        let cursor = Self::build_cursor(oracle, &mut config, &mut parts);

        let mut session = Self {
            id,
            orientation: config.settings.orientation,
            free: config.settings.free,
            settings: config.settings.clone(),
            rendered: false,
            cursor,
            pending: Vec::new(),
            parts,
        };

        let setup = BoardSetup {
            fen: session.cursor.oracle().fen(),
            last_move: session.cursor.last_move().map(AppliedMove::squares),
            orientation: session.orientation,
            view_only: session.settings.view_only,
            drawable: session.settings.drawable,
            classes: session.settings.style_classes(),
        };
        match session.parts.widget.create(&setup) {
            Ok(()) => session.rendered = true,
            Err(e) => {
                error!(id = %session.id, "Failed to create board widget: {}", e);
                session.parts.notify(NoticeKey::RenderFailed, &[]);
            }
        }
        session.sync_movable();

        if id_generated {
            session.defer(DeferredTask::WriteId, WRITE_ID_DELAY);
        }
        if !config.shapes.is_empty() {
            let shapes = std::mem::take(&mut config.shapes);
            session.defer(DeferredTask::ApplyShapes(shapes), APPLY_SHAPES_DELAY);
        }

        session
    }

    /// Load the configured position into the oracle, pick the move list and
    /// walk to the configured cursor.
    fn build_cursor(
        mut oracle: O,
        config: &mut EffectiveConfig,
        parts: &mut Collaborators,
    ) -> ReplayCursor<O> {
        oracle.reset();
        let mut loaded = false;
        if let Some(record) = config.pgn.as_deref() {
            debug!("Loading from pgn");
            match oracle.load_pgn(record) {
                Ok(()) => loaded = true,
                Err(e) => {
                    warn!("Rejected pgn: {}", e);
                    parts.notify(NoticeKey::InvalidPgn, &[]);
                }
            }
        }
        if !loaded {
            if let Some(fen) = config.fen.as_deref() {
                debug!(fen = %fen, "Loading from fen");
                if let Err(e) = oracle.load_fen(fen) {
                    warn!("Rejected fen: {}", e);
                    parts.notify(NoticeKey::InvalidFen, &[]);
                    oracle.reset();
                }
            }
        }

        let recorded = oracle.history();
        oracle.rewind();

        let moves = match config.moves.take() {
            Some(MoveSource::Applied(moves)) => moves,
            Some(MoveSource::Tokens(entries)) => {
                let tokens = normalize_move_tokens(&entries);
                let mut rejected = 0;
                let moves = apply_move_tokens(&mut oracle, &tokens, |token, e| {
                    warn!(token = %token, "Skipping invalid move in block: {}", e);
                    rejected += 1;
                });
                oracle.rewind();
                if rejected > 0 {
                    parts.notify(NoticeKey::OpeningMoveFailed, &[]);
                }
                moves
            }
            None => recorded,
        };

        let (cursor, divergence) = ReplayCursor::resume(oracle, moves, config.current_move_idx);
        if let Some(divergence) = divergence {
            report_divergence(parts, &divergence);
        }
        cursor
    }

    fn defer(&mut self, task: DeferredTask, after: Duration) {
        self.pending.push(task);
        self.parts.host.request_deferred(after);
    }

    /// Run work queued until the host was ready. Safe to call repeatedly.
    pub fn run_deferred(&mut self) {
        for task in std::mem::take(&mut self.pending) {
            match task {
                DeferredTask::WriteId => {
                    let patch = BlockConfig {
                        id: Some(self.id.clone()),
                        ..BlockConfig::default()
                    };
                    match self.parts.host.write_block_config(&patch) {
                        Ok(()) => debug!(id = %self.id, "Wrote board id into block"),
                        Err(e) => {
                            error!(id = %self.id, "Failed to write board id: {}", e);
                            self.parts.notify(NoticeKey::UpdateFailed, &[]);
                        }
                    }
                }
                DeferredTask::ApplyShapes(shapes) => {
                    self.sync_movable();
                    if self.rendered {
                        self.parts.widget.set_shapes(&shapes);
                    }
                }
            }
        }
    }

    /// The host is tearing the board down. Queued work is dropped and the
    /// widget is no longer touched.
    pub fn detach(&mut self) {
        debug!(id = %self.id, dropped = self.pending.len(), "Detaching board");
        self.pending.clear();
        self.rendered = false;
    }

    pub fn pending(&self) -> &[DeferredTask] {
        &self.pending
    }

    // Navigation

    pub fn jump_to(&mut self, index: isize) {
        let result = self.cursor.jump_to(index);
        let steps = match &result {
            Ok(steps) => *steps,
            Err(divergence) => {
                report_divergence(&mut self.parts, divergence);
                divergence.steps
            }
        };
        if steps > 0 {
            self.sync_position();
            self.save_progress();
        }
    }

    pub fn undo(&mut self) {
        self.jump_to(self.cursor.cursor() - 1);
    }

    pub fn redo(&mut self) {
        self.jump_to(self.cursor.cursor() + 1);
    }

    pub fn reset_to_start(&mut self) {
        self.jump_to(-1);
    }

    pub fn go_to_end(&mut self) {
        self.jump_to(self.cursor.len() as isize - 1);
    }

    // Widget events

    /// A piece was dropped from `from` to `to`.
    pub fn on_move(&mut self, from: Square, to: Square) {
        if self.settings.view_only {
            debug!(id = %self.id, "Ignoring move on view-only board");
            return;
        }
        if self.free {
            self.save_progress();
            return;
        }
        match self.cursor.make_move(from, to) {
            Ok(mv) => {
                debug!(id = %self.id, san = %mv.san, "Move played");
                self.sync_position();
                self.save_progress();
            }
            Err(e) => {
                debug!(id = %self.id, "Rejected move {}{}: {}", from, to, e);
                self.parts.notify(NoticeKey::IllegalMove, &[]);
                // Put the dragged piece back.
                self.sync_position();
            }
        }
    }

    /// Annotations were edited on the widget.
    pub fn on_shapes_changed(&mut self, shapes: Vec<Shape>) {
        let mut snapshot = self.parts.store.load(&self.id).unwrap_or_default();
        snapshot.shapes = Some(shapes);
        self.write_snapshot(&snapshot);
    }

    // Menu

    /// Apply a position selector value: [`STARTING_POSITION`],
    /// [`CUSTOM_POSITION`] or an opening catalog key.
    pub fn select_position(&mut self, choice: &str) {
        match choice {
            STARTING_POSITION => self.load_tokens(None, &[]),
            CUSTOM_POSITION => {}
            key => match openings::find(key) {
                Some(opening) => {
                    info!(id = %self.id, opening = %opening.name, "Loading opening");
                    if opening.moves.is_empty() {
                        self.load_tokens(Some(&opening.fen), &[]);
                    } else {
                        self.load_tokens(None, &opening.tokens());
                    }
                }
                None => warn!(key = %key, "Unknown opening key"),
            },
        }
    }

    /// Replace the game with `tokens` played from `start_fen`.
    pub fn load_tokens(&mut self, start_fen: Option<&str>, tokens: &[String]) {
        let mut rejected = 0;
        let result = self.cursor.load_from_tokens(start_fen, tokens, |token, e| {
            warn!(token = %token, "Skipping invalid opening move: {}", e);
            rejected += 1;
        });
        if let Err(e) = result {
            warn!("Rejected start position: {}", e);
            self.parts.notify(NoticeKey::InvalidFen, &[]);
            return;
        }
        if rejected > 0 {
            self.parts.notify(NoticeKey::OpeningMoveFailed, &[]);
        }
        self.sync_position();
        self.save_progress();
    }

    /// Toggle rules checking off (any piece may go anywhere) or back on.
    pub fn set_free_move(&mut self, enabled: bool) {
        self.free = enabled;
        self.sync_movable();
    }

    pub fn flip_board(&mut self) {
        self.orientation = self.orientation.opposite();
        self.push_update(BoardUpdate {
            orientation: Some(self.orientation),
            ..BoardUpdate::default()
        });
    }

    /// Selector value matching the live position.
    pub fn position_choice(&self) -> &'static str {
        let fen = self.fen();
        if fen == pgn::STANDARD_START_FEN {
            STARTING_POSITION
        } else {
            openings::key_for_fen(&fen).unwrap_or(CUSTOM_POSITION)
        }
    }

    pub fn move_list(&self) -> Vec<MoveListEntry> {
        let current = self.cursor.cursor();
        self.cursor
            .moves()
            .iter()
            .enumerate()
            .map(|(index, mv)| MoveListEntry {
                index,
                notation: mv.san.clone(),
                active: index as isize == current,
            })
            .collect()
    }

    pub fn turn_label(&self) -> &'static str {
        match self.turn() {
            Side::White => "White's turn",
            Side::Black => "Black's turn",
        }
    }

    // Queries

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn orientation(&self) -> Side {
        self.orientation
    }

    pub fn is_free(&self) -> bool {
        self.free
    }

    pub fn is_rendered(&self) -> bool {
        self.rendered
    }

    pub fn fen(&self) -> String {
        self.cursor.oracle().fen()
    }

    pub fn turn(&self) -> Side {
        self.cursor.oracle().turn()
    }

    pub fn in_check(&self) -> bool {
        self.cursor.oracle().in_check()
    }

    pub fn legal_destinations(&self) -> Dests {
        self.cursor.oracle().legal_destinations()
    }

    pub fn history(&self) -> &[AppliedMove] {
        self.cursor.moves()
    }

    pub fn current_index(&self) -> isize {
        self.cursor.cursor()
    }

    pub fn cursor(&self) -> &ReplayCursor<O> {
        &self.cursor
    }

    pub fn store(&self) -> &dyn SessionStore {
        self.parts.store.as_ref()
    }

    // Widget sync and persistence

    fn push_update(&mut self, update: BoardUpdate) {
        if self.rendered {
            self.parts.widget.update(&update);
        }
    }

    fn movable_update(&self) -> BoardUpdate {
        if self.free {
            return BoardUpdate {
                movable: Some(Movable {
                    free: true,
                    color: MovableColor::Both,
                    dests: None,
                }),
                ..BoardUpdate::default()
            };
        }
        let turn = self.turn();
        BoardUpdate {
            check: Some(self.in_check()),
            turn_color: Some(turn),
            movable: Some(Movable {
                free: false,
                color: MovableColor::Side(turn),
                dests: Some(self.legal_destinations()),
            }),
            ..BoardUpdate::default()
        }
    }

    fn sync_movable(&mut self) {
        let update = self.movable_update();
        self.push_update(update);
    }

    fn sync_position(&mut self) {
        let update = BoardUpdate {
            fen: Some(self.fen()),
            last_move: Some(self.cursor.last_move().map(AppliedMove::squares)),
            ..self.movable_update()
        };
        self.push_update(update);
    }

    /// Store cursor, moves and game record, keeping whatever else the
    /// snapshot holds.
    fn save_progress(&mut self) {
        let mut snapshot = self.parts.store.load(&self.id).unwrap_or_default();
        snapshot.current_move_idx = Some(self.cursor.cursor());
        snapshot.moves = Some(self.cursor.moves().to_vec());
        snapshot.pgn = Some(self.cursor.oracle().pgn());
        self.write_snapshot(&snapshot);
    }

    fn write_snapshot(&mut self, snapshot: &SessionSnapshot) {
        if let Err(e) = self.parts.store.save(&self.id, snapshot) {
            warn!(id = %self.id, "Failed to persist board session: {}", e);
        }
    }
}

fn report_divergence(parts: &mut Collaborators, divergence: &ReplayDivergence) {
    error!(
        index = divergence.index,
        san = %divergence.san,
        "Replay diverged from the stored move list: {}",
        divergence.source
    );
    parts.notify(NoticeKey::ReplayFailed, &[("move", &divergence.san)]);
}
