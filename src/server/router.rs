//! HTTP and WebSocket routing configuration.
//!
//! Defines the discovery endpoints (list, create-or-get), the score listing,
//! and the per-session WebSocket endpoint.

use actix_web::{HttpResponse, web};
use serde::Deserialize;

use crate::config::game::WINS_BOARD;
use crate::config::matchmaking::DIRECTORY_LIST_LIMIT;
use crate::game::types::GameMode;
use crate::server::directory::messages::{CreateOrGetSession, ListSessions};
use crate::server::matchmaking::messages::PendingCount;
use crate::server::session::socket::ws_match;
use crate::server::state::AppState;
use crate::server::ws_error::http_error_response;

#[derive(Deserialize)]
struct CreateMatchBody {
    mode: Option<GameMode>,
}

/// POST /matches — find-or-create a session for the requested mode.
async fn create_or_join(
    body: web::Json<CreateMatchBody>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let mode = body.mode.unwrap_or(GameMode::Classic);
    match data.directory_addr.send(CreateOrGetSession { mode }).await {
        Ok(session_id) => HttpResponse::Ok().json(serde_json::json!({ "session_id": session_id })),
        Err(_) => http_error_response(
            "DIRECTORY_UNAVAILABLE",
            "Session directory is not responding",
            None,
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
        ),
    }
}

#[derive(Deserialize)]
struct ListMatchesQuery {
    label: String,
    limit: Option<usize>,
}

/// GET /matches?label=&limit= — list joinable sessions by label.
async fn list_matches(query: web::Query<ListMatchesQuery>, data: web::Data<AppState>) -> HttpResponse {
    let limit = query.limit.unwrap_or(DIRECTORY_LIST_LIMIT);
    match data
        .directory_addr
        .send(ListSessions {
            label: query.label.clone(),
            limit,
        })
        .await
    {
        Ok(ids) => HttpResponse::Ok().json(ids),
        Err(_) => http_error_response(
            "DIRECTORY_UNAVAILABLE",
            "Session directory is not responding",
            None,
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
        ),
    }
}

#[derive(Deserialize)]
struct PendingQuery {
    mode: Option<GameMode>,
}

/// GET /matchmaking/pending?mode= — number of tickets currently queued for
/// a mode, for monitoring the negotiation queue.
async fn pending_tickets(
    query: web::Query<PendingQuery>,
    data: web::Data<AppState>,
) -> HttpResponse {
    let mode = query.mode.unwrap_or(GameMode::Classic);
    match data.matchmaker_addr.send(PendingCount { mode }).await {
        Ok(pending) => {
            HttpResponse::Ok().json(serde_json::json!({ "mode": mode, "pending": pending }))
        }
        Err(_) => http_error_response(
            "MATCHMAKER_UNAVAILABLE",
            "Matchmaker is not responding",
            None,
            actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
        ),
    }
}

/// GET /scores — current win counter, highest first.
async fn list_scores(data: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(data.scores.list_board(WINS_BOARD))
}

/// Configure the application's HTTP/WebSocket routes.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/matches")
            .route(web::post().to(create_or_join))
            .route(web::get().to(list_matches)),
    )
    .service(web::resource("/matchmaking/pending").route(web::get().to(pending_tickets)))
    .service(web::resource("/scores").route(web::get().to(list_scores)))
    .service(web::resource("/ws/match/{session_id}").to(ws_match));
}
