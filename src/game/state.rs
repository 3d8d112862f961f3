use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::game::TURN_TIME_LIMIT_MS;
use crate::game::board::{Board, check_outcome};
use crate::game::types::{GameMode, Mark, Outcome, PlayerId};

/// Current time as epoch milliseconds, the unit of `turn_deadline`.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Rejection of an admission attempt, surfaced to the joiner only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionError {
    MatchFull,
}

impl AdmissionError {
    pub fn as_code(self) -> &'static str {
        match self {
            AdmissionError::MatchFull => "match_full",
        }
    }
}

/// Rejection of a move, surfaced privately to the submitting connection.
/// Never mutates state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    NotInMatch,
    NotYourTurn,
    BadPayload,
    InvalidMove,
}

impl MoveError {
    pub fn as_code(self) -> &'static str {
        match self {
            MoveError::NotInMatch => "not_in_match",
            MoveError::NotYourTurn => "not_your_turn",
            MoveError::BadPayload => "bad_payload",
            MoveError::InvalidMove => "invalid_move",
        }
    }
}

/// Effect of a legal move on the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOutcome {
    /// Decisive win for the mark that just moved.
    Won(Mark),
    Draw,
    /// Game continues, turn passed to the other mark.
    Continue,
}

/// One admitted player: stable identity, assigned mark, display name.
#[derive(Debug, Clone)]
pub struct PlayerSlot {
    pub identity: PlayerId,
    pub mark: Mark,
    pub name: String,
}

/// Canonical state of one match, owned exclusively by its session actor.
///
/// Players are stored in arrival order; when several identities arrive in
/// one admission batch, batch order is the tie-break for mark assignment.
#[derive(Debug, Clone)]
pub struct MatchState {
    pub board: Board,
    pub players: Vec<PlayerSlot>,
    pub next: Option<Mark>,
    pub winner: Option<Outcome>,
    pub started: bool,
    pub mode: GameMode,
    pub turn_deadline: Option<u64>,
}

impl MatchState {
    pub fn new(mode: GameMode) -> Self {
        Self {
            board: [None; 9],
            players: Vec::new(),
            next: None,
            winner: None,
            started: false,
            mode,
            turn_deadline: None,
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn mark_of(&self, identity: &PlayerId) -> Option<Mark> {
        self.players
            .iter()
            .find(|p| &p.identity == identity)
            .map(|p| p.mark)
    }

    pub fn slot_for_mark(&self, mark: Mark) -> Option<&PlayerSlot> {
        self.players.iter().find(|p| p.mark == mark)
    }

    /// Pre-admission check. Runs before `admit` and never mutates state.
    pub fn join_attempt(&self) -> Result<(), AdmissionError> {
        if self.players.len() >= 2 {
            return Err(AdmissionError::MatchFull);
        }
        Ok(())
    }

    /// Returns the board, turn and winner fields to their initial values,
    /// keeping admitted players. Run when a new admission arrives after a
    /// winner was recorded, which is what enables rematch-in-place.
    pub fn reset_for_rematch(&mut self) {
        self.board = [None; 9];
        self.next = Some(Mark::X);
        self.winner = None;
        self.started = false;
        self.turn_deadline = None;
    }

    /// Admit a new identity, assigning the next unused mark (first admitted
    /// gets X). Returns `None` if the identity is already admitted or the
    /// match is full.
    pub fn admit(&mut self, identity: PlayerId, name: String) -> Option<Mark> {
        if self.players.len() >= 2 || self.mark_of(&identity).is_some() {
            return None;
        }
        let mark = if self.slot_for_mark(Mark::X).is_none() {
            Mark::X
        } else {
            Mark::O
        };
        self.players.push(PlayerSlot {
            identity,
            mark,
            name,
        });
        Some(mark)
    }

    /// Start the game once both players are admitted. Returns true exactly
    /// when the game transitions to started.
    pub fn try_start(&mut self, now: u64) -> bool {
        if self.players.len() != 2 || self.started {
            return false;
        }
        self.started = true;
        self.next = Some(Mark::X);
        if self.mode == GameMode::Timed {
            self.turn_deadline = Some(now + TURN_TIME_LIMIT_MS);
        }
        true
    }

    /// Remove an identity whose last connection is gone. Returns true if it
    /// was present.
    pub fn remove_identity(&mut self, identity: &PlayerId) -> bool {
        let before = self.players.len();
        self.players.retain(|p| &p.identity != identity);
        self.players.len() != before
    }

    /// Forfeit: the single remaining player wins if no winner is recorded
    /// yet. Idempotent; returns the winning mark when it fires.
    pub fn forfeit_to_remaining(&mut self) -> Option<Mark> {
        if self.players.len() != 1 || self.winner.is_some() {
            return None;
        }
        let mark = self.players[0].mark;
        self.winner = Some(mark.into());
        self.next = None;
        self.turn_deadline = None;
        Some(mark)
    }

    /// True when the timed-mode turn clock has run out.
    pub fn timeout_expired(&self, now: u64) -> bool {
        self.mode == GameMode::Timed
            && self.winner.is_none()
            && self.turn_deadline.is_some_and(|deadline| now > deadline)
    }

    /// Resolve an expired turn: the player holding `next` failed to move in
    /// time, so the other mark wins. Returns the winning mark.
    pub fn expire_turn(&mut self) -> Option<Mark> {
        let mark = self.next?.other();
        self.winner = Some(mark.into());
        self.next = None;
        self.turn_deadline = None;
        Some(mark)
    }

    /// Apply a move for `identity`, validating membership, turn order,
    /// payload shape and cell legality, in that order. The caller passes the
    /// payload parse result so a malformed payload is rejected after the
    /// membership and turn checks. Rejections leave the state untouched.
    pub fn apply_move(
        &mut self,
        identity: &PlayerId,
        cell: Result<i64, MoveError>,
        now: u64,
    ) -> Result<MoveOutcome, MoveError> {
        let mark = self.mark_of(identity).ok_or(MoveError::NotInMatch)?;
        if self.next != Some(mark) {
            return Err(MoveError::NotYourTurn);
        }
        let cell = cell?;
        let index = usize::try_from(cell).map_err(|_| MoveError::InvalidMove)?;
        if index >= self.board.len() || self.board[index].is_some() {
            return Err(MoveError::InvalidMove);
        }

        self.board[index] = Some(mark);

        match check_outcome(&self.board) {
            Some(Outcome::Draw) => {
                self.winner = Some(Outcome::Draw);
                self.next = None;
                self.turn_deadline = None;
                Ok(MoveOutcome::Draw)
            }
            Some(outcome) => {
                self.winner = Some(outcome);
                self.next = None;
                self.turn_deadline = None;
                Ok(MoveOutcome::Won(mark))
            }
            None => {
                self.next = Some(mark.other());
                if self.mode == GameMode::Timed {
                    self.turn_deadline = Some(now + TURN_TIME_LIMIT_MS);
                }
                Ok(MoveOutcome::Continue)
            }
        }
    }
}
