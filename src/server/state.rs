// src/server/state.rs

//! Application state for the backend server.
//!
//! Holds references to the main actor addresses (session directory and
//! matchmaker) and the external service handles. Used to share state
//! between HTTP/WebSocket handlers and the actor system.

use std::sync::Arc;

use actix::Addr;

use crate::server::directory::SessionDirectory;
use crate::server::matchmaking::Matchmaker;
use crate::services::accounts::InMemoryAccounts;
use crate::services::scores::InMemoryScores;

/// Shared application state, injected into HTTP/WebSocket handlers.
pub struct AppState {
    /// Address of the session directory actor (discovery, resolution).
    pub directory_addr: Addr<SessionDirectory>,
    /// Address of the matchmaker actor (ticket queue, pairing).
    pub matchmaker_addr: Addr<Matchmaker>,
    /// Account registry used for display-name resolution.
    pub accounts: Arc<InMemoryAccounts>,
    /// Score store backing the persistent win counter.
    pub scores: Arc<InMemoryScores>,
}

impl AppState {
    pub fn new(
        directory_addr: Addr<SessionDirectory>,
        matchmaker_addr: Addr<Matchmaker>,
        accounts: Arc<InMemoryAccounts>,
        scores: Arc<InMemoryScores>,
    ) -> Self {
        AppState {
            directory_addr,
            matchmaker_addr,
            accounts,
            scores,
        }
    }
}
