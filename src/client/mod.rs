/// Client module: session acquisition and the local decoded view of
/// authoritative state broadcasts.

pub mod conn;
pub mod coordinator;

pub use coordinator::{AcquireConfig, AcquireError, CancelToken, Coordinator, JoinedMatch};
