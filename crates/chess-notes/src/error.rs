//! Board session error types

use chess_core::RulesError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Board config must be a JSON object")]
    NotAnObject,

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum HostError {
    #[error("Source view not found: {0}")]
    ViewUnavailable(String),

    #[error("Failed to write config: {0}")]
    WriteFailed(String),

    #[error("Board widget failed to render: {0}")]
    Render(String),
}

/// A redo walk hit a move the rules engine no longer accepts. The cursor
/// stays on the last position it reached.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Replay stopped at move {index} ({san}) after {steps} step(s): {source}")]
pub struct ReplayDivergence {
    /// Index of the move that was rejected.
    pub index: usize,
    pub san: String,
    /// Plies walked before the rejection.
    pub steps: usize,
    pub source: RulesError,
}
