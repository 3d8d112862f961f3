//! Main entry point for the backend server.
//!
//! Initializes the actor system, configures application state, and launches
//! the HTTP server with the discovery endpoints and the per-session
//! WebSocket endpoint.

use std::sync::Arc;

use actix::Actor;
use actix_web::{App, HttpServer, web};

use server::directory::SessionDirectory;
use server::matchmaking::Matchmaker;
use services::accounts::InMemoryAccounts;
use services::scores::InMemoryScores;

pub mod client;
pub mod config;
mod game;
mod server;
mod services;

#[cfg(test)]
mod tests;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Initialize logger from environment variable (default to info level).
    env_logger::init();

    // External collaborator boundaries, in-memory for now.
    let accounts: Arc<InMemoryAccounts> = Arc::new(InMemoryAccounts::new());
    let scores: Arc<InMemoryScores> = Arc::new(InMemoryScores::new());

    // Start the session directory actor (owns all match sessions).
    let directory_addr = SessionDirectory::new(accounts.clone(), scores.clone()).start();

    // Start the matchmaker actor (ticket queue, bilateral pairing).
    let matchmaker_addr = Matchmaker::new(directory_addr.clone()).start();

    // Shared application state for HTTP/WebSocket handlers.
    let state = web::Data::new(server::state::AppState::new(
        directory_addr,
        matchmaker_addr,
        accounts,
        scores,
    ));

    // Start the HTTP server with WebSocket endpoints.
    HttpServer::new(move || {
        App::new()
            .wrap(
                actix_web::middleware::DefaultHeaders::new()
                    .add(("Access-Control-Allow-Origin", "*"))
                    .add(("Access-Control-Allow-Headers", "*")),
            )
            .app_data(state.clone())
            .configure(server::router::config)
    })
    .bind(("127.0.0.1", 8080))?
    .run()
    .await
}
