/// Match session actor.
///
/// One actor per session, exclusive owner of the canonical `MatchState`.
/// Handles admission, buffered move processing, turn-timeout forfeits and
/// rematch resets. All handlers run on the actor's context, so no two
/// handlers for the same session ever run concurrently.
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use actix::prelude::*;
use log::{debug, info, warn};

use crate::config::game::{TICK_INTERVAL_SECS, WINS_BOARD};
use crate::game::state::{AdmissionError, MatchState, MoveError, MoveOutcome, now_millis};
use crate::game::types::{ConnId, GameMode, Mark, SessionId, session_label};
use crate::server::directory::messages::{SessionClosed, SetSessionOpen};
use crate::server::directory::server::SessionDirectory;
use crate::server::session::messages::{
    ClientMessage, ConnRef, GetState, Join, JoinAttempt, Leave, ServerMessage, StatePayload,
    SubmitMove, Tick,
};
use crate::services::accounts::{NameLookup, UNKNOWN_NAME};
use crate::services::scores::ScoreStore;

pub struct MatchSession {
    session_id: SessionId,
    state: MatchState,
    conns: HashMap<ConnId, ConnRef>,
    /// Moves received since the last tick, in arrival order.
    pending_moves: Vec<SubmitMove>,
    directory: Addr<SessionDirectory>,
    accounts: Arc<dyn NameLookup>,
    scores: Arc<dyn ScoreStore>,
}

impl MatchSession {
    pub fn new(
        session_id: SessionId,
        mode: GameMode,
        directory: Addr<SessionDirectory>,
        accounts: Arc<dyn NameLookup>,
        scores: Arc<dyn ScoreStore>,
    ) -> Self {
        Self {
            session_id,
            state: MatchState::new(mode),
            conns: HashMap::new(),
            pending_moves: Vec::new(),
            directory,
            accounts,
            scores,
        }
    }

    fn broadcast_all(&self) {
        let msg = ServerMessage::State(StatePayload::from_state(&self.state));
        for conn in self.conns.values() {
            conn.addr.do_send(msg.clone());
        }
    }

    fn broadcast_to(&self, conn_ids: &[ConnId]) {
        let msg = ServerMessage::State(StatePayload::from_state(&self.state));
        for conn_id in conn_ids {
            if let Some(conn) = self.conns.get(conn_id) {
                conn.addr.do_send(msg.clone());
            }
        }
    }

    fn send_error(&self, conn_id: ConnId, code: &str) {
        if let Some(conn) = self.conns.get(&conn_id) {
            conn.addr.do_send(ServerMessage::Error {
                error: code.to_string(),
            });
        }
    }

    /// Best-effort win counter increment: read current score (default 0),
    /// write current+1. Failures are logged and swallowed, never surfaced
    /// to players.
    fn record_win(&self, mark: Mark) {
        let Some(slot) = self.state.slot_for_mark(mark) else {
            return;
        };
        let current = match self.scores.read_score(WINS_BOARD, &slot.identity) {
            Ok(score) => score.unwrap_or(0),
            Err(e) => {
                warn!(
                    "[MatchSession] score read failed for {}: {}",
                    slot.identity, e
                );
                0
            }
        };
        if let Err(e) = self
            .scores
            .write_score(WINS_BOARD, &slot.identity, &slot.name, current + 1)
        {
            warn!(
                "[MatchSession] score write failed for {}: {}",
                slot.identity, e
            );
        }
    }

    /// One tick: timeout check first, then the buffered moves in arrival
    /// order. A move arriving in the same tick as an expired deadline is
    /// evaluated against the already-cleared turn and rejected. `now` comes
    /// from the interval timer; tests pass it explicitly.
    fn tick(&mut self, now: u64) {
        if self.state.timeout_expired(now) {
            if let Some(mark) = self.state.expire_turn() {
                info!(
                    "[MatchSession] turn timed out, {:?} wins by forfeit, session_id={}",
                    mark, self.session_id
                );
                self.broadcast_all();
            }
        }

        let moves: Vec<SubmitMove> = self.pending_moves.drain(..).collect();
        for mv in moves {
            // Connection may have left since submitting; nowhere to reply.
            let Some(conn) = self.conns.get(&mv.conn_id) else {
                continue;
            };
            let identity = conn.identity;

            let cell = serde_json::from_str::<ClientMessage>(&mv.payload)
                .map(|msg| match msg {
                    ClientMessage::Move { cell } => cell,
                })
                .map_err(|_| MoveError::BadPayload);

            match self.state.apply_move(&identity, cell, now) {
                Ok(outcome) => {
                    if let MoveOutcome::Won(mark) = outcome {
                        info!(
                            "[MatchSession] {:?} wins, session_id={}",
                            mark, self.session_id
                        );
                        self.record_win(mark);
                    }
                    self.broadcast_all();
                }
                Err(err) => {
                    debug!(
                        "[MatchSession] rejected move from {}: {}",
                        identity,
                        err.as_code()
                    );
                    self.send_error(mv.conn_id, err.as_code());
                }
            }
        }
    }
}

impl Actor for MatchSession {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(
            "[MatchSession] session started, session_id={} label={}",
            self.session_id,
            session_label(self.state.mode)
        );
        ctx.run_interval(Duration::from_secs(TICK_INTERVAL_SECS), |act, _ctx| {
            act.tick(now_millis());
        });
    }
}

impl Handler<JoinAttempt> for MatchSession {
    type Result = Result<(), AdmissionError>;

    fn handle(&mut self, msg: JoinAttempt, _: &mut Context<Self>) -> Self::Result {
        let result = self.state.join_attempt();
        if result.is_err() {
            debug!(
                "[MatchSession] rejected join attempt from {}: match full, session_id={}",
                msg.identity, self.session_id
            );
        }
        result
    }
}

impl Handler<Join> for MatchSession {
    type Result = ();

    fn handle(&mut self, msg: Join, _: &mut Context<Self>) -> Self::Result {
        let new_conn_ids: Vec<ConnId> = msg.conns.iter().map(|c| c.conn_id).collect();

        // A recorded winner means the previous round is over: reset the
        // board before processing the new admission (rematch-in-place).
        if self.state.winner.is_some() {
            info!(
                "[MatchSession] reset for new round, session_id={}",
                self.session_id
            );
            self.state.reset_for_rematch();
        }

        for conn in msg.conns {
            let identity = conn.identity;
            self.conns.insert(conn.conn_id, conn);

            if self.state.mark_of(&identity).is_none() && self.state.player_count() < 2 {
                let name = self
                    .accounts
                    .display_name(&identity)
                    .unwrap_or_else(|| UNKNOWN_NAME.to_string());
                if let Some(mark) = self.state.admit(identity, name) {
                    info!(
                        "[MatchSession] player joined, identity={} mark={:?} session_id={}",
                        identity, mark, self.session_id
                    );
                }
            }
        }

        if self.state.try_start(now_millis()) {
            info!(
                "[MatchSession] game started, session_id={}",
                self.session_id
            );
            self.directory.do_send(SetSessionOpen {
                session_id: self.session_id,
                open: false,
            });
            self.broadcast_all();
        } else {
            // Do not spam an already-playing opponent on every admission
            // check: only the new connections get the state.
            self.broadcast_to(&new_conn_ids);
        }
    }
}

impl Handler<Leave> for MatchSession {
    type Result = ();

    fn handle(&mut self, msg: Leave, ctx: &mut Context<Self>) -> Self::Result {
        for conn_id in msg.conn_ids {
            if let Some(conn) = self.conns.remove(&conn_id) {
                let identity = conn.identity;
                let has_other_conn = self.conns.values().any(|c| c.identity == identity);
                if !has_other_conn && self.state.remove_identity(&identity) {
                    info!(
                        "[MatchSession] player left, identity={} session_id={}",
                        identity, self.session_id
                    );
                }
            }
        }

        if self.state.player_count() == 0 {
            info!(
                "[MatchSession] no players left, terminating session_id={}",
                self.session_id
            );
            self.directory.do_send(SessionClosed {
                session_id: self.session_id,
            });
            ctx.stop();
            return;
        }

        if let Some(mark) = self.state.forfeit_to_remaining() {
            info!(
                "[MatchSession] {:?} wins by forfeit, session_id={}",
                mark, self.session_id
            );
            self.broadcast_all();
        }

        if self.state.player_count() < 2 {
            self.directory.do_send(SetSessionOpen {
                session_id: self.session_id,
                open: true,
            });
        }
    }
}

impl Handler<SubmitMove> for MatchSession {
    type Result = ();

    fn handle(&mut self, msg: SubmitMove, _: &mut Context<Self>) -> Self::Result {
        self.pending_moves.push(msg);
    }
}

impl Handler<Tick> for MatchSession {
    type Result = ();

    fn handle(&mut self, msg: Tick, _: &mut Context<Self>) -> Self::Result {
        self.tick(msg.now.unwrap_or_else(now_millis));
    }
}

impl Handler<GetState> for MatchSession {
    type Result = MessageResult<GetState>;

    fn handle(&mut self, _: GetState, _: &mut Context<Self>) -> Self::Result {
        MessageResult(StatePayload::from_state(&self.state))
    }
}
