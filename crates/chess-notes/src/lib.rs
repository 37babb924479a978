//! Board sessions for chess diagrams embedded in notes: configuration,
//! replay cursor, session persistence and the collaborator interfaces a
//! host implements.

pub mod board;
pub mod config;
pub mod error;
pub mod history;
pub mod host;
pub mod notice;
pub mod store;

pub use board::{BoardSession, Collaborators, DeferredTask, MoveListEntry};
pub use config::{BlockConfig, EffectiveConfig, Settings};
pub use error::{ConfigError, HostError, ReplayDivergence, StoreError};
pub use history::ReplayCursor;
pub use host::{BoardSetup, BoardUpdate, BoardWidget, Host, Movable, MovableColor, Shape};
pub use notice::{Messages, NoticeKey};
pub use store::{JsonStore, KeyValue, MemoryKv, MemoryStore, SessionSnapshot, SessionStore};
