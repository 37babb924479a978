//! Headless board host: renders one block file, runs navigation commands
//! against it and keeps sessions as JSON files.
//!
//! Usage: chess-notes-replay <block.yaml> [command ...]
//!
//! Commands: undo, redo, start, end, jump:N, move:e2e4, open:KEY,
//! free:on, free:off, flip, shapes:e2e4,d7d5

use std::env;
use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Context};
use chess_core::{ShakmatyOracle, Square};
use chess_notes::config;
use chess_notes::error::StoreError;
use chess_notes::{
    BlockConfig, BoardSession, BoardSetup, BoardUpdate, BoardWidget, Collaborators, Host,
    HostError, JsonStore, KeyValue, Settings, Shape,
};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct ReplayConfig {
    store_dir: PathBuf,
    settings_path: Option<PathBuf>,
}

impl ReplayConfig {
    fn from_env() -> Self {
        Self {
            store_dir: env::var("NOTES_STORE_DIR")
                .unwrap_or_else(|_| ".chess-notes".to_string())
                .into(),
            settings_path: env::var("NOTES_SETTINGS").ok().map(PathBuf::from),
        }
    }

    fn settings(&self) -> anyhow::Result<Settings> {
        match &self.settings_path {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .with_context(|| format!("reading settings {}", path.display()))?;
                Ok(Settings::from_json(&text))
            }
            None => Ok(Settings::default()),
        }
    }
}

/// One file per key under a directory.
struct DirKv {
    dir: PathBuf,
}

impl DirKv {
    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl KeyValue for DirKv {
    fn get(&self, key: &str) -> Option<String> {
        fs::read_to_string(self.path(key)).ok()
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.path(key), value)?;
        Ok(())
    }
}

/// Treats the block file as the note's embedded block.
struct FileHost {
    block_path: PathBuf,
}

impl Host for FileHost {
    fn write_block_config(&mut self, patch: &BlockConfig) -> Result<(), HostError> {
        let text = fs::read_to_string(&self.block_path).unwrap_or_default();
        let merged = config::merge_block(&text, patch)
            .map_err(|e| HostError::WriteFailed(e.to_string()))?;
        fs::write(&self.block_path, merged).map_err(|e| HostError::WriteFailed(e.to_string()))
    }

    fn notice(&mut self, message: &str) {
        eprintln!("{message}");
    }

    fn request_deferred(&mut self, after: Duration) {
        debug!(?after, "Deferred work requested");
    }
}

struct TerminalWidget;

impl BoardWidget for TerminalWidget {
    fn create(&mut self, setup: &BoardSetup) -> Result<(), HostError> {
        info!(fen = %setup.fen, orientation = %setup.orientation, "Board created");
        Ok(())
    }

    fn update(&mut self, update: &BoardUpdate) {
        debug!(?update, "Board updated");
    }

    fn set_shapes(&mut self, shapes: &[Shape]) {
        info!(count = shapes.len(), "Annotations drawn");
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Undo,
    Redo,
    Start,
    End,
    Jump(isize),
    Move(Square, Square),
    Open(String),
    Free(bool),
    Flip,
    Shapes(Vec<Shape>),
}

fn parse_squares(text: &str) -> anyhow::Result<(Square, Square)> {
    if text.len() != 4 || !text.is_ascii() {
        bail!("expected two squares like e2e4, got '{text}'");
    }
    let from = Square::from_ascii(text[..2].as_bytes())
        .map_err(|_| anyhow!("bad square in '{text}'"))?;
    let to = Square::from_ascii(text[2..].as_bytes())
        .map_err(|_| anyhow!("bad square in '{text}'"))?;
    Ok((from, to))
}

impl FromStr for Command {
    type Err = anyhow::Error;

    fn from_str(arg: &str) -> anyhow::Result<Self> {
        let (name, value) = arg.split_once(':').unwrap_or((arg, ""));
        let command = match (name, value) {
            ("undo", "") => Command::Undo,
            ("redo", "") => Command::Redo,
            ("start", "") => Command::Start,
            ("end", "") => Command::End,
            ("flip", "") => Command::Flip,
            ("jump", n) => Command::Jump(n.parse().with_context(|| format!("bad index '{n}'"))?),
            ("move", squares) => {
                let (from, to) = parse_squares(squares)?;
                Command::Move(from, to)
            }
            ("open", key) if !key.is_empty() => Command::Open(key.to_string()),
            ("free", "on") => Command::Free(true),
            ("free", "off") => Command::Free(false),
            ("shapes", list) => {
                let shapes = list
                    .split(',')
                    .filter(|s| !s.is_empty())
                    .map(|pair| {
                        let (from, to) = parse_squares(pair)?;
                        Ok(Shape::arrow(&from.to_string(), &to.to_string(), "green"))
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Command::Shapes(shapes)
            }
            _ => bail!("unknown command '{arg}'"),
        };
        Ok(command)
    }
}

fn run(board: &mut BoardSession, command: Command) {
    match command {
        Command::Undo => board.undo(),
        Command::Redo => board.redo(),
        Command::Start => board.reset_to_start(),
        Command::End => board.go_to_end(),
        Command::Jump(index) => board.jump_to(index),
        Command::Move(from, to) => board.on_move(from, to),
        Command::Open(key) => board.select_position(&key),
        Command::Free(enabled) => board.set_free_move(enabled),
        Command::Flip => board.flip_board(),
        Command::Shapes(shapes) => board.on_shapes_changed(shapes),
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();

    let mut args = env::args().skip(1);
    let block_path = PathBuf::from(
        args.next()
            .context("usage: chess-notes-replay <block.yaml> [command ...]")?,
    );
    let commands = args
        .map(|arg| arg.parse::<Command>())
        .collect::<anyhow::Result<Vec<_>>>()?;

    let config = ReplayConfig::from_env();
    let settings = config.settings()?;
    let source = fs::read_to_string(&block_path)
        .with_context(|| format!("reading block {}", block_path.display()))?;

    let parts = Collaborators::new(
        Box::new(JsonStore::new(DirKv {
            dir: config.store_dir.clone(),
        })),
        Box::new(TerminalWidget),
        Box::new(FileHost {
            block_path: block_path.clone(),
        }),
    );
    let mut board = BoardSession::render(&source, &settings, ShakmatyOracle::new(), parts);
    board.run_deferred();

    for command in commands {
        debug!(?command, "Running command");
        run(&mut board, command);
    }

    println!("id:   {}", board.id());
    println!("fen:  {}", board.fen());
    println!("turn: {}", board.turn_label());
    println!("position: {}", board.position_choice());
    for entry in board.move_list() {
        let marker = if entry.active { ">" } else { " " };
        println!("{marker} {:>3}. {}", entry.index + 1, entry.notation);
    }

    Ok(())
}
