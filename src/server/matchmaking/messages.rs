use actix::prelude::*;
use tokio::sync::oneshot;

use crate::game::types::{GameMode, PlayerId, SessionId};

use super::types::TicketId;

/// Register a matchmaking ticket. The reply channel resolves with the
/// agreed session id if a pairing happens before the ticket is removed.
#[derive(Message)]
#[rtype(result = "TicketId")]
pub struct AddTicket {
    pub identity: PlayerId,
    pub mode: GameMode,
    pub reply: oneshot::Sender<SessionId>,
}

/// Deregister an outstanding ticket (cancellation or negotiation timeout).
/// A no-op for tickets already consumed by a pairing.
#[derive(Message)]
#[rtype(result = "()")]
pub struct RemoveTicket {
    pub ticket: TicketId,
}

/// Number of tickets currently queued for a mode.
#[derive(Message)]
#[rtype(result = "usize")]
pub struct PendingCount {
    pub mode: GameMode,
}
