use std::collections::HashMap;

use actix::prelude::*;
use serde::{Deserialize, Serialize};

use crate::game::state::{AdmissionError, MatchState};
use crate::game::types::{ConnId, GameMode, Mark, Outcome, PlayerId};

/// Per-player info carried in state broadcasts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerEntry {
    pub name: String,
}

/// Full encoded match state, broadcast to clients under the "state" tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatePayload {
    pub board: Vec<Option<Mark>>,
    pub next: Option<Mark>,
    pub winner: Option<Outcome>,
    pub players: HashMap<PlayerId, Mark>,
    pub player_info: HashMap<PlayerId, PlayerEntry>,
    pub mode: GameMode,
    pub turn_deadline: Option<u64>,
    pub started: bool,
}

impl StatePayload {
    pub fn from_state(state: &MatchState) -> Self {
        Self {
            board: state.board.to_vec(),
            next: state.next,
            winner: state.winner,
            players: state
                .players
                .iter()
                .map(|p| (p.identity, p.mark))
                .collect(),
            player_info: state
                .players
                .iter()
                .map(|p| (p.identity, PlayerEntry {
                    name: p.name.clone(),
                }))
                .collect(),
            mode: state.mode,
            turn_deadline: state.turn_deadline,
            started: state.started,
        }
    }

    /// Initial empty state, used by clients to reset their local view
    /// before a join resolves.
    pub fn empty(mode: GameMode) -> Self {
        Self {
            board: vec![None; 9],
            next: None,
            winner: None,
            players: HashMap::new(),
            player_info: HashMap::new(),
            mode,
            turn_deadline: None,
            started: false,
        }
    }
}

/// Message server -> client.
#[derive(Message, Debug, Clone, Serialize, Deserialize)]
#[rtype(result = "()")]
#[serde(tag = "op", content = "data", rename_all = "snake_case")]
pub enum ServerMessage {
    State(StatePayload),
    /// Targeted at a single connection, never broadcast.
    Error { error: String },
}

/// Message client -> session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    Move { cell: i64 },
}

/// Reference to one live connection: transient handle, owning identity,
/// and the mailbox broadcasts are delivered to.
#[derive(Clone)]
pub struct ConnRef {
    pub conn_id: ConnId,
    pub identity: PlayerId,
    pub addr: Recipient<ServerMessage>,
}

/// Pre-admission check: rejects with `match_full` when two distinct
/// identities are already recorded. Never mutates state.
#[derive(Message)]
#[rtype(result = "Result<(), AdmissionError>")]
pub struct JoinAttempt {
    pub identity: PlayerId,
}

/// Admission of a batch of connections.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Join {
    pub conns: Vec<ConnRef>,
}

/// Departure of a batch of connections.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Leave {
    pub conn_ids: Vec<ConnId>,
}

/// Raw move submission from a connection. Buffered by the session and
/// processed in arrival order on the next tick.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SubmitMove {
    pub conn_id: ConnId,
    pub payload: String,
}

/// Periodic tick. Driven by the session's own interval timer; exposed as a
/// message so tests can drive time deterministically. `now` overrides the
/// wall clock when set.
#[derive(Message, Default)]
#[rtype(result = "()")]
pub struct Tick {
    pub now: Option<u64>,
}

/// Snapshot of the encoded state, for HTTP handlers and tests.
#[derive(Message)]
#[rtype(result = "StatePayload")]
pub struct GetState;
