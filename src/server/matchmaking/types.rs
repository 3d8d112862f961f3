use tokio::sync::oneshot;
use uuid::Uuid;

use crate::game::types::{PlayerId, SessionId};

/// Handle for one outstanding matchmaking request. Invalidated on match,
/// cancellation, or the coordinator's negotiation timeout.
pub type TicketId = Uuid;

/// One queued request, waiting to be paired with a distinct identity.
pub struct PendingTicket {
    pub ticket: TicketId,
    pub identity: PlayerId,
    pub reply: oneshot::Sender<SessionId>,
}
