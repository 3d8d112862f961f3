use crate::config::game::BOARD_CELLS;
use crate::game::types::{Mark, Outcome};

/// The 3x3 board, cells indexed 0..9 row-major.
pub type Board = [Option<Mark>; BOARD_CELLS];

/// The 8 winning triples (rows, columns, diagonals).
const WIN_LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Evaluates the board for a terminal outcome.
///
/// A uniform non-empty triple wins; if no winner and no empty cell remains
/// the game is a draw; otherwise the game is still open. This is the single
/// source of truth for terminal-state detection.
pub fn check_outcome(board: &Board) -> Option<Outcome> {
    for [a, b, c] in WIN_LINES {
        if let Some(mark) = board[a] {
            if board[b] == Some(mark) && board[c] == Some(mark) {
                return Some(mark.into());
            }
        }
    }

    if board.iter().all(|cell| cell.is_some()) {
        return Some(Outcome::Draw);
    }

    None
}
