//! User-facing notice texts, overridable at runtime.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeKey {
    InvalidConfig,
    InvalidPgn,
    InvalidFen,
    RenderFailed,
    UpdateFailed,
    ReplayFailed,
    IllegalMove,
    OpeningMoveFailed,
}

impl NoticeKey {
    pub fn code(self) -> &'static str {
        match self {
            NoticeKey::InvalidConfig => "error.invalid_config",
            NoticeKey::InvalidPgn => "error.invalid_pgn",
            NoticeKey::InvalidFen => "error.invalid_fen",
            NoticeKey::RenderFailed => "error.render_failed",
            NoticeKey::UpdateFailed => "error.update_failed",
            NoticeKey::ReplayFailed => "error.replay_failed",
            NoticeKey::IllegalMove => "error.illegal_move",
            NoticeKey::OpeningMoveFailed => "error.opening_move_failed",
        }
    }

    fn default_text(self) -> &'static str {
        match self {
            NoticeKey::InvalidConfig => "Chess Notes could not read the block settings. Using defaults.",
            NoticeKey::InvalidPgn => "Chess Notes could not read the PGN. Please check the formatting.",
            NoticeKey::InvalidFen => "Chess Notes could not read the FEN. Please check the string.",
            NoticeKey::RenderFailed => "Chess Notes could not render this board. Please check the block settings.",
            NoticeKey::UpdateFailed => "Chess Notes could not update the code block. Open the note and try again.",
            NoticeKey::ReplayFailed => "Chess Notes could not replay move {move} in this sequence.",
            NoticeKey::IllegalMove => "That move is not legal in this position.",
            NoticeKey::OpeningMoveFailed => "Chess Notes could not load one of the opening moves.",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Messages {
    overrides: HashMap<NoticeKey, String>,
}

impl Messages {
    /// Replace texts for the given keys; later calls win.
    pub fn set_messages<I>(&mut self, overrides: I)
    where
        I: IntoIterator<Item = (NoticeKey, String)>,
    {
        self.overrides.extend(overrides);
    }

    /// Render `key`, substituting `{name}` placeholders from `vars`.
    /// Placeholders without a value are left as written.
    pub fn text(&self, key: NoticeKey, vars: &[(&str, &str)]) -> String {
        let template = self
            .overrides
            .get(&key)
            .map(String::as_str)
            .unwrap_or_else(|| key.default_text());
        render_template(template, vars)
    }
}

/// `{name}` placeholders; names are word characters.
static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is valid"));

fn render_template(template: &str, vars: &[(&str, &str)]) -> String {
    PLACEHOLDER
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            match vars.iter().find(|(k, _)| *k == name) {
                Some((_, value)) => value.to_string(),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}
