/// WebSocket connection actor for one client in a match session.
///
/// Relays text frames to the session as raw move submissions and delivers
/// state broadcasts and private errors back to the client. Admission runs
/// before the socket starts; the session owns all game logic.
use actix::prelude::*;
use actix_web::{Error, HttpRequest, HttpResponse, web};
use actix_web_actors::ws;
use std::borrow::Cow;
use uuid::Uuid;

use crate::game::types::{ConnId, PlayerId, SessionId};
use crate::server::directory::messages::ResolveSession;
use crate::server::session::MatchSession;
use crate::server::session::messages::{ConnRef, Join, JoinAttempt, Leave, ServerMessage, SubmitMove};
use crate::server::state::AppState;
use crate::server::ws_error::{http_error_response, ws_error_message};

pub struct MatchSocket {
    pub session_id: SessionId,
    pub conn_id: ConnId,
    pub identity: PlayerId,
    pub session_addr: Addr<MatchSession>,
}

impl Actor for MatchSocket {
    type Context = ws::WebsocketContext<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        log::info!(
            "[MatchSocket] connected, conn_id={} identity={} session_id={}",
            self.conn_id,
            self.identity,
            self.session_id
        );
        self.session_addr.do_send(Join {
            conns: vec![ConnRef {
                conn_id: self.conn_id,
                identity: self.identity,
                addr: ctx.address().recipient(),
            }],
        });
    }

    fn stopped(&mut self, _ctx: &mut Self::Context) {
        self.session_addr.do_send(Leave {
            conn_ids: vec![self.conn_id],
        });
    }
}

impl StreamHandler<Result<ws::Message, ws::ProtocolError>> for MatchSocket {
    fn handle(&mut self, msg: Result<ws::Message, ws::ProtocolError>, ctx: &mut Self::Context) {
        match msg {
            Ok(ws::Message::Text(text)) => {
                // Raw payload goes to the session; malformed input is the
                // session's bad_payload rejection, not a transport error.
                self.session_addr.do_send(SubmitMove {
                    conn_id: self.conn_id,
                    payload: text.to_string(),
                });
            }
            Ok(ws::Message::Ping(msg)) => ctx.pong(&msg),
            Ok(ws::Message::Close(_)) => ctx.stop(),
            _ => (),
        }
    }
}

impl Handler<ServerMessage> for MatchSocket {
    type Result = ();

    fn handle(&mut self, msg: ServerMessage, ctx: &mut Self::Context) {
        match serde_json::to_string(&msg) {
            Ok(text) => ctx.text(text),
            Err(_) => ctx.text(ws_error_message(
                "ENCODE_FAILED",
                "Failed to serialize server message",
                None,
            )),
        }
    }
}

/// WebSocket endpoint for a match session.
///
/// Expects query parameters: `player_id` (stable identity, required) and
/// `name` (display name, optional; registered best-effort).
pub async fn ws_match(
    req: HttpRequest,
    stream: web::Payload,
    data: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let session_id = req
        .match_info()
        .get("session_id")
        .and_then(|raw| Uuid::parse_str(raw).ok());
    let Some(session_id) = session_id else {
        return Ok(http_error_response(
            "INVALID_SESSION_ID",
            "Session id is not a valid uuid",
            None,
            actix_web::http::StatusCode::BAD_REQUEST,
        ));
    };

    let mut identity: Option<PlayerId> = None;
    let mut name = String::new();
    for kv in req.query_string().split('&') {
        let mut split = kv.split('=');
        match (split.next(), split.next()) {
            (Some("player_id"), Some(raw)) => {
                identity = Uuid::parse_str(raw).ok();
            }
            (Some("name"), Some(raw)) => {
                name = urlencoding::decode(raw)
                    .unwrap_or_else(|_| Cow::Borrowed(""))
                    .into_owned();
            }
            _ => {}
        }
    }

    let Some(identity) = identity else {
        return Ok(http_error_response(
            "MISSING_PLAYER_ID",
            "Missing or invalid player_id",
            None,
            actix_web::http::StatusCode::BAD_REQUEST,
        ));
    };

    if !name.is_empty() {
        data.accounts.register(identity, name);
    }

    let session_addr = match data
        .directory_addr
        .send(ResolveSession { session_id })
        .await
    {
        Ok(Some(addr)) => addr,
        _ => {
            return Ok(http_error_response(
                "SESSION_NOT_FOUND",
                "No such session",
                Some(&session_id.to_string()),
                actix_web::http::StatusCode::NOT_FOUND,
            ));
        }
    };

    match session_addr.send(JoinAttempt { identity }).await {
        Ok(Ok(())) => {}
        Ok(Err(reject)) => {
            return Ok(http_error_response(
                "ADMISSION_REJECTED",
                reject.as_code(),
                Some(&session_id.to_string()),
                actix_web::http::StatusCode::CONFLICT,
            ));
        }
        Err(_) => {
            return Ok(http_error_response(
                "SESSION_NOT_FOUND",
                "Session terminated",
                Some(&session_id.to_string()),
                actix_web::http::StatusCode::NOT_FOUND,
            ));
        }
    }

    ws::start(
        MatchSocket {
            session_id,
            conn_id: Uuid::new_v4(),
            identity,
            session_addr,
        },
        &req,
        stream,
    )
}
