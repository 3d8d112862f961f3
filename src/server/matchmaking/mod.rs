/// Matchmaking module: ticket queue and bilateral pairing of two willing
/// players onto one session.

pub mod messages;
pub mod server;
pub mod types;

pub use server::Matchmaker;
