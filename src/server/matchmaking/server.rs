/// Matchmaking server actor.
///
/// Keeps one ticket queue per game mode. As soon as two tickets from
/// distinct identities are queued for the same mode, they are paired: the
/// directory's find-or-create resolves the common session and both reply
/// channels receive its id. Time-bounding of the negotiation is the
/// coordinator's job; the queue itself only pairs and removes.
use std::collections::HashMap;

use actix::prelude::*;
use log::{debug, info, warn};
use uuid::Uuid;

use crate::game::types::GameMode;
use crate::server::directory::messages::CreateOrGetSession;
use crate::server::directory::server::SessionDirectory;
use crate::server::matchmaking::messages::{AddTicket, PendingCount, RemoveTicket};
use crate::server::matchmaking::types::PendingTicket;

pub struct Matchmaker {
    directory: Addr<SessionDirectory>,
    queues: HashMap<GameMode, Vec<PendingTicket>>,
}

impl Matchmaker {
    pub fn new(directory: Addr<SessionDirectory>) -> Self {
        Self {
            directory,
            queues: HashMap::new(),
        }
    }
}

impl Actor for Matchmaker {
    type Context = Context<Self>;
}

impl Handler<AddTicket> for Matchmaker {
    type Result = MessageResult<AddTicket>;

    fn handle(&mut self, msg: AddTicket, ctx: &mut Context<Self>) -> Self::Result {
        let ticket = Uuid::new_v4();
        let queue = self.queues.entry(msg.mode).or_default();

        // Pair with the first queued ticket from a different identity; a
        // player queued twice never matches themselves.
        if let Some(pos) = queue.iter().position(|t| t.identity != msg.identity) {
            let peer = queue.remove(pos);
            info!(
                "[Matchmaker] paired {} with {} mode={}",
                msg.identity, peer.identity, msg.mode
            );
            let directory = self.directory.clone();
            let mode = msg.mode;
            let reply = msg.reply;
            let fut = async move {
                match directory.send(CreateOrGetSession { mode }).await {
                    Ok(session_id) => {
                        // Receivers may be gone (cancelled); nothing to do.
                        let _ = peer.reply.send(session_id);
                        let _ = reply.send(session_id);
                    }
                    Err(e) => {
                        warn!("[Matchmaker] directory unavailable, pairing dropped: {}", e);
                    }
                }
            };
            ctx.spawn(fut.into_actor(self));
        } else {
            debug!(
                "[Matchmaker] queued ticket {} for {} mode={}",
                ticket, msg.identity, msg.mode
            );
            queue.push(PendingTicket {
                ticket,
                identity: msg.identity,
                reply: msg.reply,
            });
        }

        MessageResult(ticket)
    }
}

impl Handler<RemoveTicket> for Matchmaker {
    type Result = ();

    fn handle(&mut self, msg: RemoveTicket, _: &mut Context<Self>) -> Self::Result {
        for queue in self.queues.values_mut() {
            let before = queue.len();
            queue.retain(|t| t.ticket != msg.ticket);
            if queue.len() != before {
                debug!("[Matchmaker] removed ticket {}", msg.ticket);
                return;
            }
        }
    }
}

impl Handler<PendingCount> for Matchmaker {
    type Result = usize;

    fn handle(&mut self, msg: PendingCount, _: &mut Context<Self>) -> Self::Result {
        self.queues.get(&msg.mode).map_or(0, |q| q.len())
    }
}
