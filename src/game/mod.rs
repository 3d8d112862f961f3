/// Game module: pure tic-tac-toe logic, independent of the actor layer.

pub mod board;
pub mod state;
pub mod types;
