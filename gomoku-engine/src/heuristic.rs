//! Fallback move engine: win if possible, block if necessary, otherwise a
//! random empty cell, defaulting to the centre on a full board.

use crate::board::{Board, Stone};
use rand::seq::SliceRandom;

/// Pick a move for `stone` without any lookahead beyond one ply.
pub fn suggest_move(board: &Board, stone: Stone) -> (usize, usize) {
    if let Some(winning) = immediate_win(board, stone) {
        return winning;
    }
    if let Some(block) = immediate_win(board, stone.opponent()) {
        return block;
    }

    let empties = board.empty_positions();
    if let Some(&pick) = empties.choose(&mut rand::thread_rng()) {
        return pick;
    }

    (7, 7)
}

/// The first cell that would complete five in a row for `stone`, if any.
fn immediate_win(board: &Board, stone: Stone) -> Option<(usize, usize)> {
    let mut scratch = board.clone();
    for (row, col) in board.empty_positions() {
        if scratch.place(row, col, stone).is_ok() {
            let wins = scratch.check_winner(row, col, stone);
            scratch.remove(row, col);
            if wins {
                return Some((row, col));
            }
        }
    }
    None
}
