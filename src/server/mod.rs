//! Server layer root module.
//!
//! This module organizes the main backend components, including:
//! - Application state management
//! - HTTP/WebSocket routing
//! - Session discovery (directory of live sessions by label)
//! - Matchmaking (ticket queue, bilateral pairing)
//! - Match session orchestration (admission, moves, ticks, forfeits)

pub mod directory;
pub mod matchmaking;
pub mod router;
pub mod session;
pub mod state;
pub mod ws_error;
