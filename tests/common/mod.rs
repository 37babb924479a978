#![allow(dead_code)]

use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;

use chess_core::{RulesOracle, ShakmatyOracle, Square};
use rand::rngs::StdRng;
use rand::seq::IndexedRandom;
use rand::SeedableRng;
use chess_notes::{
    BlockConfig, BoardSession, BoardSetup, BoardUpdate, BoardWidget, Collaborators, Host,
    HostError, MemoryKv, MemoryStore, Settings, Shape,
};

/// Everything the fakes saw, shared between the widget and host handles.
#[derive(Debug, Default)]
pub struct Recording {
    pub created: Vec<BoardSetup>,
    pub updates: Vec<BoardUpdate>,
    pub shapes: Vec<Vec<Shape>>,
    pub notices: Vec<String>,
    pub patches: Vec<BlockConfig>,
    pub delays: Vec<Duration>,
    pub fail_create: bool,
    pub fail_writes: bool,
}

#[derive(Clone, Default)]
pub struct RecordingWidget(pub Rc<RefCell<Recording>>);

impl BoardWidget for RecordingWidget {
    fn create(&mut self, setup: &BoardSetup) -> Result<(), HostError> {
        let mut log = self.0.borrow_mut();
        if log.fail_create {
            return Err(HostError::Render("no container".to_string()));
        }
        log.created.push(setup.clone());
        Ok(())
    }

    fn update(&mut self, update: &BoardUpdate) {
        self.0.borrow_mut().updates.push(update.clone());
    }

    fn set_shapes(&mut self, shapes: &[Shape]) {
        self.0.borrow_mut().shapes.push(shapes.to_vec());
    }
}

#[derive(Clone, Default)]
pub struct RecordingHost(pub Rc<RefCell<Recording>>);

impl Host for RecordingHost {
    fn write_block_config(&mut self, patch: &BlockConfig) -> Result<(), HostError> {
        let mut log = self.0.borrow_mut();
        if log.fail_writes {
            return Err(HostError::ViewUnavailable("note closed".to_string()));
        }
        log.patches.push(patch.clone());
        Ok(())
    }

    fn notice(&mut self, message: &str) {
        self.0.borrow_mut().notices.push(message.to_string());
    }

    fn request_deferred(&mut self, after: Duration) {
        self.0.borrow_mut().delays.push(after);
    }
}

/// Render a board against fakes that share one recording.
pub fn render_with(
    source: &str,
    kv: &MemoryKv,
    recording: Recording,
) -> (BoardSession, Rc<RefCell<Recording>>) {
    let log = Rc::new(RefCell::new(recording));
    let parts = Collaborators::new(
        Box::new(MemoryStore::new(kv.clone())),
        Box::new(RecordingWidget(log.clone())),
        Box::new(RecordingHost(log.clone())),
    );
    let board = BoardSession::render(source, &Settings::default(), ShakmatyOracle::new(), parts);
    (board, log)
}

pub fn render(source: &str, kv: &MemoryKv) -> (BoardSession, Rc<RefCell<Recording>>) {
    render_with(source, kv, Recording::default())
}

/// Seeded generator so a failing sequence can be replayed.
pub fn seeded(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// A random legal (from, to) pair in the oracle's position, if any.
pub fn random_legal_move<O: RulesOracle>(oracle: &O, rng: &mut StdRng) -> Option<(Square, Square)> {
    let dests: Vec<(Square, Vec<Square>)> = oracle.legal_destinations().into_iter().collect();
    let (from, tos) = dests.choose(rng)?;
    Some((*from, *tos.choose(rng)?))
}
