use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::game::GAME_NAME;

/// Stable identity of a player, issued by the (external) auth layer.
pub type PlayerId = Uuid;

/// Identity of one session (authoritative game instance).
pub type SessionId = Uuid;

/// Transient handle of one client connection to a session.
pub type ConnId = Uuid;

/// The symbol a player places on the board. First admitted player gets X.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    pub fn other(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

/// Terminal result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    X,
    O,
    #[serde(rename = "draw")]
    Draw,
}

impl From<Mark> for Outcome {
    fn from(mark: Mark) -> Self {
        match mark {
            Mark::X => Outcome::X,
            Mark::O => Outcome::O,
        }
    }
}

/// Game mode, fixed at session creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameMode {
    Classic,
    Timed,
}

impl GameMode {
    pub fn as_str(self) -> &'static str {
        match self {
            GameMode::Classic => "classic",
            GameMode::Timed => "timed",
        }
    }
}

impl std::fmt::Display for GameMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Discovery label of sessions running the given mode.
pub fn session_label(mode: GameMode) -> String {
    format!("{}:{}", GAME_NAME, mode)
}
