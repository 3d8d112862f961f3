/// Session directory actor.
///
/// Owns the mapping from session id to session actor and label, and serves
/// the two discovery primitives: list-by-label and create-or-get. Occupancy
/// flags arrive as asynchronous notifications from the sessions themselves,
/// so listings can be momentarily stale; the client-side coordinator's
/// retry policy exists to absorb exactly that.
use std::collections::HashMap;
use std::sync::Arc;

use actix::prelude::*;
use log::{debug, info};
use uuid::Uuid;

use crate::game::types::{SessionId, session_label};
use crate::server::directory::messages::{
    CreateOrGetSession, ListSessions, ResolveSession, SessionClosed, SetSessionOpen,
};
use crate::server::session::MatchSession;
use crate::services::accounts::NameLookup;
use crate::services::scores::ScoreStore;

struct DirectoryEntry {
    label: String,
    addr: Addr<MatchSession>,
    open: bool,
}

pub struct SessionDirectory {
    sessions: HashMap<SessionId, DirectoryEntry>,
    accounts: Arc<dyn NameLookup>,
    scores: Arc<dyn ScoreStore>,
}

impl SessionDirectory {
    pub fn new(accounts: Arc<dyn NameLookup>, scores: Arc<dyn ScoreStore>) -> Self {
        Self {
            sessions: HashMap::new(),
            accounts,
            scores,
        }
    }
}

impl Actor for SessionDirectory {
    type Context = Context<Self>;
}

impl Handler<ListSessions> for SessionDirectory {
    type Result = MessageResult<ListSessions>;

    fn handle(&mut self, msg: ListSessions, _: &mut Context<Self>) -> Self::Result {
        let ids: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|(_, entry)| entry.open && entry.label == msg.label)
            .map(|(id, _)| *id)
            .take(msg.limit)
            .collect();
        debug!(
            "[SessionDirectory] list label={} -> {} session(s)",
            msg.label,
            ids.len()
        );
        MessageResult(ids)
    }
}

impl Handler<CreateOrGetSession> for SessionDirectory {
    type Result = MessageResult<CreateOrGetSession>;

    fn handle(&mut self, msg: CreateOrGetSession, ctx: &mut Context<Self>) -> Self::Result {
        let label = session_label(msg.mode);

        if let Some((id, _)) = self
            .sessions
            .iter()
            .find(|(_, entry)| entry.open && entry.label == label)
        {
            debug!(
                "[SessionDirectory] create-or-get label={} -> existing {}",
                label, id
            );
            return MessageResult(*id);
        }

        let session_id = Uuid::new_v4();
        let addr = MatchSession::new(
            session_id,
            msg.mode,
            ctx.address(),
            self.accounts.clone(),
            self.scores.clone(),
        )
        .start();
        self.sessions.insert(
            session_id,
            DirectoryEntry {
                label: label.clone(),
                addr,
                open: true,
            },
        );
        info!(
            "[SessionDirectory] created session {} label={}",
            session_id, label
        );
        MessageResult(session_id)
    }
}

impl Handler<ResolveSession> for SessionDirectory {
    type Result = MessageResult<ResolveSession>;

    fn handle(&mut self, msg: ResolveSession, _: &mut Context<Self>) -> Self::Result {
        MessageResult(
            self.sessions
                .get(&msg.session_id)
                .map(|entry| entry.addr.clone()),
        )
    }
}

impl Handler<SetSessionOpen> for SessionDirectory {
    type Result = ();

    fn handle(&mut self, msg: SetSessionOpen, _: &mut Context<Self>) -> Self::Result {
        if let Some(entry) = self.sessions.get_mut(&msg.session_id) {
            entry.open = msg.open;
        }
    }
}

impl Handler<SessionClosed> for SessionDirectory {
    type Result = ();

    fn handle(&mut self, msg: SessionClosed, _: &mut Context<Self>) -> Self::Result {
        if self.sessions.remove(&msg.session_id).is_some() {
            info!("[SessionDirectory] session {} closed", msg.session_id);
        }
    }
}
