/// Matchmaking and session-acquisition configuration constants.
///
/// This module defines the timing parameters of the coordinator's tiered
/// fallback protocol and of the bilateral matchmaking negotiation.

/// Time (in milliseconds) the bilateral matchmaking negotiation is given
/// before the coordinator falls back to directory lookup.
pub const NEGOTIATION_TIMEOUT_MS: u64 = 5_000;

/// Jitter bounds (in milliseconds) applied right after the negotiation
/// timeout, before the first fallback tier runs.
pub const POST_NEGOTIATION_JITTER_MS: (u64, u64) = (200, 800);

/// Jitter bounds (in milliseconds) between the two directory lookups,
/// de-correlating simultaneous callers.
pub const LOOKUP_JITTER_MS: (u64, u64) = (500, 1500);

/// Total attempts for the create-or-get fallback tier.
pub const CREATE_RETRY_ATTEMPTS: u32 = 3;

/// Delay (in milliseconds) between create-or-get retries.
pub const CREATE_RETRY_DELAY_MS: u64 = 500;

/// Maximum number of entries requested from a directory lookup.
pub const DIRECTORY_LIST_LIMIT: usize = 10;
