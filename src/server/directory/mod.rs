/// Session directory module: discovery of live sessions by label.

pub mod messages;
pub mod server;

pub use server::SessionDirectory;
