use std::sync::{Arc, Mutex};

use actix::prelude::*;
use log::debug;

use crate::game::types::{ConnId, PlayerId};
use crate::server::session::messages::{ServerMessage, StatePayload};

/// Last decoded broadcast and last private error for one client.
#[derive(Default)]
pub struct ClientView {
    pub state: Option<StatePayload>,
    pub last_error: Option<String>,
}

pub type SharedView = Arc<Mutex<ClientView>>;

/// In-process client connection: receives broadcasts from the session actor
/// and mirrors them into the shared view.
pub struct ClientConn {
    pub conn_id: ConnId,
    pub identity: PlayerId,
    pub view: SharedView,
}

impl Actor for ClientConn {
    type Context = Context<Self>;

    fn started(&mut self, _: &mut Context<Self>) {
        debug!(
            "[ClientConn] view attached, conn_id={} identity={}",
            self.conn_id, self.identity
        );
    }
}

impl Handler<ServerMessage> for ClientConn {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, _: &mut Context<Self>) -> Self::Result {
        let Ok(mut view) = self.view.lock() else {
            return;
        };
        match msg {
            ServerMessage::State(state) => view.state = Some(state),
            ServerMessage::Error { error } => view.last_error = Some(error),
        }
    }
}
