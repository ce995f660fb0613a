//! Gomoku game logic: the board model, win detection, a simple heuristic
//! engine, and the LLM move advisor.
//!
//! These are the sandbox's collaborators, not part of the isolation core:
//! they consume [`gomoku_sandbox::MoveCandidate`] values and own the
//! bounds/occupancy validation the extractor contractually skips.

#![warn(clippy::all)]

pub mod advisor;
pub mod board;
pub mod heuristic;

pub use advisor::MoveAdvisor;
pub use board::{Board, Stone, BOARD_SIZE};
pub use heuristic::suggest_move;
