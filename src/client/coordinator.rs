/// Session-acquisition coordinator.
///
/// Places one client into a session despite a directory that may show stale
/// or duplicate entries. Two paths run for each attempt: a bilateral
/// matchmaking negotiation bounded by a timer, and a tiered fallback
/// (lookup, jitter, lookup again, find-or-create with bounded retries).
/// The first path to yield a joined session wins; a single-use matched flag
/// keeps a late negotiation result from producing a second join. One
/// cancellation token is shared across all tiers.
use std::sync::{Arc, Mutex};
use std::time::Duration;

use actix::prelude::*;
use log::{debug, info};
use rand::Rng;
use tokio::sync::{oneshot, watch};
use tokio::time::sleep;
use uuid::Uuid;

use crate::client::conn::{ClientConn, ClientView, SharedView};
use crate::config::matchmaking::{
    CREATE_RETRY_ATTEMPTS, CREATE_RETRY_DELAY_MS, DIRECTORY_LIST_LIMIT, LOOKUP_JITTER_MS,
    NEGOTIATION_TIMEOUT_MS, POST_NEGOTIATION_JITTER_MS,
};
use crate::game::types::{GameMode, PlayerId, SessionId, session_label};
use crate::server::directory::messages::{CreateOrGetSession, ListSessions, ResolveSession};
use crate::server::directory::server::SessionDirectory;
use crate::server::matchmaking::Matchmaker;
use crate::server::matchmaking::messages::{AddTicket, RemoveTicket};
use crate::server::session::MatchSession;
use crate::server::session::messages::{
    ClientMessage, ConnRef, Join, JoinAttempt, Leave, StatePayload, SubmitMove,
};

/// Timing parameters of one acquisition attempt. Defaults come from the
/// matchmaking configuration; tests shrink them.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    pub negotiation_timeout: Duration,
    pub post_negotiation_jitter_ms: (u64, u64),
    pub lookup_jitter_ms: (u64, u64),
    pub create_retry_attempts: u32,
    pub create_retry_delay: Duration,
    pub list_limit: usize,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            negotiation_timeout: Duration::from_millis(NEGOTIATION_TIMEOUT_MS),
            post_negotiation_jitter_ms: POST_NEGOTIATION_JITTER_MS,
            lookup_jitter_ms: LOOKUP_JITTER_MS,
            create_retry_attempts: CREATE_RETRY_ATTEMPTS,
            create_retry_delay: Duration::from_millis(CREATE_RETRY_DELAY_MS),
            list_limit: DIRECTORY_LIST_LIMIT,
        }
    }
}

/// Terminal failure of an acquisition attempt.
#[derive(Debug)]
pub enum AcquireError {
    /// User-initiated cancel; the outstanding ticket was deregistered.
    Cancelled,
    /// Every tier failed; the caller returns to the entry state.
    Exhausted,
    /// An infrastructure actor is gone; not retryable.
    Unavailable(String),
}

impl std::fmt::Display for AcquireError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AcquireError::Cancelled => write!(f, "acquisition cancelled"),
            AcquireError::Exhausted => write!(f, "failed to join a session after all attempts"),
            AcquireError::Unavailable(what) => write!(f, "service unavailable: {}", what),
        }
    }
}

/// Why one join attempt against one session failed. Both variants are
/// retryable by the fallback tiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JoinError {
    /// Unknown, stale or terminated session.
    InvalidSession,
    MatchFull,
}

/// Cancellation token shared across all tiers of one coordinator.
#[derive(Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        // send_replace updates the value even with no live subscribers.
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Sender kept alive by self; unreachable.
                return;
            }
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

/// A session this client has joined: handles for submitting moves and
/// leaving.
pub struct JoinedMatch {
    pub session_id: SessionId,
    session: Addr<MatchSession>,
    conn_id: Uuid,
}

impl JoinedMatch {
    pub fn submit_move(&self, cell: i64) {
        let payload = serde_json::to_string(&ClientMessage::Move { cell })
            .unwrap_or_else(|_| String::new());
        self.session.do_send(SubmitMove {
            conn_id: self.conn_id,
            payload,
        });
    }

    pub fn leave(&self) {
        self.session.do_send(Leave {
            conn_ids: vec![self.conn_id],
        });
    }

    pub fn session(&self) -> Addr<MatchSession> {
        self.session.clone()
    }
}

pub struct Coordinator {
    directory: Addr<SessionDirectory>,
    matchmaker: Addr<Matchmaker>,
    identity: PlayerId,
    config: AcquireConfig,
    cancel: CancelToken,
    view: SharedView,
}

impl Coordinator {
    pub fn new(
        directory: Addr<SessionDirectory>,
        matchmaker: Addr<Matchmaker>,
        identity: PlayerId,
    ) -> Self {
        Self {
            directory,
            matchmaker,
            identity,
            config: AcquireConfig::default(),
            cancel: CancelToken::new(),
            view: Arc::new(Mutex::new(ClientView::default())),
        }
    }

    pub fn with_config(mut self, config: AcquireConfig) -> Self {
        self.config = config;
        self
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn view(&self) -> SharedView {
        self.view.clone()
    }

    /// Reset the local view to the initial empty state so a stale prior
    /// board never flashes before the authoritative broadcast overwrites it.
    fn reset_view(&self, mode: GameMode) {
        if let Ok(mut view) = self.view.lock() {
            view.state = Some(StatePayload::empty(mode));
            view.last_error = None;
        }
    }

    /// Acquire a session for `mode`, excluding `exclude` (a just-finished
    /// session the caller must not rejoin).
    pub async fn acquire(
        &self,
        mode: GameMode,
        exclude: Option<SessionId>,
    ) -> Result<JoinedMatch, AcquireError> {
        if self.cancel.is_cancelled() {
            return Err(AcquireError::Cancelled);
        }
        self.reset_view(mode);

        let (reply, mut rx) = oneshot::channel();
        let ticket = self
            .matchmaker
            .send(AddTicket {
                identity: self.identity,
                mode,
                reply,
            })
            .await
            .map_err(|e| AcquireError::Unavailable(format!("matchmaker: {}", e)))?;

        // Single-use guard: the first successful path consumes the match.
        let mut matched = false;

        tokio::select! {
            _ = self.cancel.cancelled() => {
                self.matchmaker.do_send(RemoveTicket { ticket });
                info!("[Coordinator] acquisition cancelled, identity={}", self.identity);
                Err(AcquireError::Cancelled)
            }
            res = &mut rx => {
                match res {
                    Ok(session_id) => {
                        matched = true;
                        debug!(
                            "[Coordinator] negotiation matched session {}, identity={}",
                            session_id, self.identity
                        );
                        match self.try_join(session_id).await {
                            Ok(joined) => Ok(joined),
                            // The negotiated session was stale or filled up
                            // first; the tiered fallback takes over.
                            Err(_) => self.fallback(mode, exclude, &mut rx, &mut matched).await,
                        }
                    }
                    Err(_) => self.fallback(mode, exclude, &mut rx, &mut matched).await,
                }
            }
            _ = sleep(self.config.negotiation_timeout) => {
                self.matchmaker.do_send(RemoveTicket { ticket });
                debug!(
                    "[Coordinator] negotiation timed out, identity={}",
                    self.identity
                );
                self.jittered_wait(self.config.post_negotiation_jitter_ms).await?;
                self.fallback(mode, exclude, &mut rx, &mut matched).await
            }
        }
    }

    /// Tiered fallback: lookup, jitter, lookup again, find-or-create with
    /// bounded retries. Before each tier the negotiation channel is polled,
    /// since a pairing already in flight can complete after the ticket was
    /// removed.
    async fn fallback(
        &self,
        mode: GameMode,
        exclude: Option<SessionId>,
        rx: &mut oneshot::Receiver<SessionId>,
        matched: &mut bool,
    ) -> Result<JoinedMatch, AcquireError> {
        let label = session_label(mode);

        if let Some(joined) = self.poll_negotiated(rx, matched).await {
            return Ok(joined);
        }
        if let Some(joined) = self.lookup_and_join(&label, exclude).await {
            return Ok(joined);
        }

        // De-correlate simultaneous callers before looking again.
        self.jittered_wait(self.config.lookup_jitter_ms).await?;

        if let Some(joined) = self.poll_negotiated(rx, matched).await {
            return Ok(joined);
        }
        if let Some(joined) = self.lookup_and_join(&label, exclude).await {
            return Ok(joined);
        }

        for attempt in 0..self.config.create_retry_attempts {
            if self.cancel.is_cancelled() {
                return Err(AcquireError::Cancelled);
            }
            if attempt > 0 {
                self.delay(self.config.create_retry_delay).await?;
            }
            let session_id = self
                .directory
                .send(CreateOrGetSession { mode })
                .await
                .map_err(|e| AcquireError::Unavailable(format!("directory: {}", e)))?;
            if Some(session_id) == exclude {
                debug!(
                    "[Coordinator] find-or-create returned excluded session {}, retrying",
                    session_id
                );
                continue;
            }
            match self.try_join(session_id).await {
                Ok(joined) => return Ok(joined),
                Err(err) => {
                    debug!(
                        "[Coordinator] join failed ({:?}) on attempt {}, session {}",
                        err,
                        attempt + 1,
                        session_id
                    );
                    continue;
                }
            }
        }

        info!(
            "[Coordinator] all tiers exhausted, identity={}",
            self.identity
        );
        Err(AcquireError::Exhausted)
    }

    /// First lookup hit not matching the exclusion, joined directly.
    async fn lookup_and_join(
        &self,
        label: &str,
        exclude: Option<SessionId>,
    ) -> Option<JoinedMatch> {
        let ids = self
            .directory
            .send(ListSessions {
                label: label.to_string(),
                limit: self.config.list_limit,
            })
            .await
            .ok()?;
        let candidate = ids.into_iter().find(|id| Some(*id) != exclude)?;
        self.try_join(candidate).await.ok()
    }

    /// A late negotiation result, honored at most once.
    async fn poll_negotiated(
        &self,
        rx: &mut oneshot::Receiver<SessionId>,
        matched: &mut bool,
    ) -> Option<JoinedMatch> {
        if *matched {
            return None;
        }
        let session_id = rx.try_recv().ok()?;
        *matched = true;
        debug!(
            "[Coordinator] late negotiation result for session {}, identity={}",
            session_id, self.identity
        );
        self.try_join(session_id).await.ok()
    }

    /// Resolve, run the admission check, then join with a fresh connection.
    async fn try_join(&self, session_id: SessionId) -> Result<JoinedMatch, JoinError> {
        let session = self
            .directory
            .send(ResolveSession { session_id })
            .await
            .ok()
            .flatten()
            .ok_or(JoinError::InvalidSession)?;

        session
            .send(JoinAttempt {
                identity: self.identity,
            })
            .await
            .map_err(|_| JoinError::InvalidSession)?
            .map_err(|_| JoinError::MatchFull)?;

        let conn_id = Uuid::new_v4();
        let conn = ClientConn {
            conn_id,
            identity: self.identity,
            view: self.view.clone(),
        }
        .start();

        session
            .send(Join {
                conns: vec![ConnRef {
                    conn_id,
                    identity: self.identity,
                    addr: conn.recipient(),
                }],
            })
            .await
            .map_err(|_| JoinError::InvalidSession)?;

        info!(
            "[Coordinator] joined session {}, identity={}",
            session_id, self.identity
        );
        Ok(JoinedMatch {
            session_id,
            session,
            conn_id,
        })
    }

    async fn jittered_wait(&self, (min, max): (u64, u64)) -> Result<(), AcquireError> {
        let ms = rand::rng().random_range(min..=max);
        self.delay(Duration::from_millis(ms)).await
    }

    /// Sleep that loses to cancellation.
    async fn delay(&self, duration: Duration) -> Result<(), AcquireError> {
        tokio::select! {
            _ = self.cancel.cancelled() => Err(AcquireError::Cancelled),
            _ = sleep(duration) => Ok(()),
        }
    }
}
