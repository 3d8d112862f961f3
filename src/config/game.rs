/// Game configuration constants.
///
/// This module defines the main gameplay parameters such as the per-turn
/// clock in timed mode and the session tick interval.

/// Name of the game, used as the prefix of session discovery labels.
pub const GAME_NAME: &str = "ttt";

/// Number of cells on the board (3x3).
pub const BOARD_CELLS: usize = 9;

/// Time (in milliseconds) a player has to move in timed mode.
pub const TURN_TIME_LIMIT_MS: u64 = 30_000;

/// Interval (in seconds) between session ticks. The tick is the only
/// source of time-based state change (timeout forfeits).
pub const TICK_INTERVAL_SECS: u64 = 1;

/// Identifier of the persistent win counter board.
pub const WINS_BOARD: &str = "global_wins";
