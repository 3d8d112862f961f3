use actix::prelude::*;

use crate::game::types::{GameMode, SessionId};
use crate::server::session::MatchSession;

/// List joinable sessions carrying the given label, newest entries in no
/// particular order, at most `limit` of them.
#[derive(Message)]
#[rtype(result = "Vec<SessionId>")]
pub struct ListSessions {
    pub label: String,
    pub limit: usize,
}

/// Return an existing joinable session for the mode, or create one.
/// Atomic from the caller's perspective: the directory actor serializes
/// concurrent find-or-create requests.
#[derive(Message)]
#[rtype(result = "SessionId")]
pub struct CreateOrGetSession {
    pub mode: GameMode,
}

/// Resolve a session id to its actor address. `None` for unknown ids.
#[derive(Message)]
#[rtype(result = "Option<Addr<MatchSession>>")]
pub struct ResolveSession {
    pub session_id: SessionId,
}

/// Occupancy notification from a session: a full session is not listed by
/// lookups until a seat frees up again.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SetSessionOpen {
    pub session_id: SessionId,
    pub open: bool,
}

/// A session terminated (zero remaining players); drop its entry.
#[derive(Message)]
#[rtype(result = "()")]
pub struct SessionClosed {
    pub session_id: SessionId,
}
