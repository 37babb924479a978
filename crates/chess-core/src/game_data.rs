use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use shakmaty::{Color, Square};

/// Side to move, or the side a board is viewed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn opposite(self) -> Self {
        match self {
            Side::White => Side::Black,
            Side::Black => Side::White,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::White => "white",
            Side::Black => "black",
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "white" | "w" => Ok(Side::White),
            "black" | "b" => Ok(Side::Black),
            _ => Err(()),
        }
    }
}

/// A move the rules engine accepted. Serialized as `{"from", "to", "san"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedMove {
    #[serde(with = "square_key")]
    pub from: Square,
    #[serde(with = "square_key")]
    pub to: Square,
    pub san: String, // SAN with check suffix
}

impl AppliedMove {
    pub fn new(from: Square, to: Square, san: impl Into<String>) -> Self {
        Self {
            from,
            to,
            san: san.into(),
        }
    }

    /// The `(from, to)` pair a board widget highlights as the last move.
    pub fn squares(&self) -> (Square, Square) {
        (self.from, self.to)
    }
}

/// Squares travel as their algebraic key ("e4").
mod square_key {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use shakmaty::Square;

    pub fn serialize<S: Serializer>(square: &Square, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(square)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Square, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse()
            .map_err(|_| de::Error::custom(format!("invalid square '{key}'")))
    }
}
