use std::collections::HashMap;
use std::sync::RwLock;

use crate::game::types::PlayerId;

/// Display name used when account lookup fails or has no entry.
pub const UNKNOWN_NAME: &str = "Unknown";

/// Best-effort display-name resolution at admission time. Calls must be
/// time-bounded; a failed lookup falls back to [`UNKNOWN_NAME`].
pub trait NameLookup: Send + Sync {
    fn display_name(&self, identity: &PlayerId) -> Option<String>;
}

/// In-memory account registry.
#[derive(Default)]
pub struct InMemoryAccounts {
    names: RwLock<HashMap<PlayerId, String>>,
}

impl InMemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, identity: PlayerId, name: impl Into<String>) {
        if let Ok(mut names) = self.names.write() {
            names.insert(identity, name.into());
        }
    }
}

impl NameLookup for InMemoryAccounts {
    fn display_name(&self, identity: &PlayerId) -> Option<String> {
        self.names.read().ok()?.get(identity).cloned()
    }
}
