//! The 15x15 Gomoku board and its rules.

use gomoku_common::{Error, Result};
use gomoku_sandbox::{MoveCandidate, MoveContext};
use serde::{Deserialize, Serialize};

/// Board edge length.
pub const BOARD_SIZE: usize = 15;

/// Cell encoding shared with sandboxed code: 0 empty, 1 black, 2 white.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stone {
    Black,
    White,
}

impl Stone {
    pub fn cell_value(self) -> u8 {
        match self {
            Self::Black => 1,
            Self::White => 2,
        }
    }

    pub fn opponent(self) -> Self {
        match self {
            Self::Black => Self::White,
            Self::White => Self::Black,
        }
    }

    pub fn from_cell_value(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::Black),
            2 => Some(Self::White),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Black => write!(f, "black"),
            Self::White => write!(f, "white"),
        }
    }
}

/// The four scan axes for five-in-a-row, as pairs of opposite directions.
const DIRECTION_PAIRS: [[(i32, i32); 2]; 4] = [
    [(0, 1), (0, -1)],
    [(1, 0), (-1, 0)],
    [(1, 1), (-1, -1)],
    [(1, -1), (-1, 1)],
];

/// A 15x15 Gomoku board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    cells: Vec<Vec<u8>>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: vec![vec![0; BOARD_SIZE]; BOARD_SIZE],
        }
    }

    /// Build a board from raw cells, validating shape and values.
    pub fn from_cells(cells: Vec<Vec<u8>>) -> Result<Self> {
        if cells.len() != BOARD_SIZE || cells.iter().any(|row| row.len() != BOARD_SIZE) {
            return Err(Error::InvalidInput(format!(
                "Board must be {0}x{0}",
                BOARD_SIZE
            )));
        }
        if cells.iter().flatten().any(|&c| c > 2) {
            return Err(Error::InvalidInput("Cell values must be 0, 1, or 2".into()));
        }
        Ok(Self { cells })
    }

    /// Stone at (row, col), if any. `None` for empty or off-board cells.
    pub fn get(&self, row: usize, col: usize) -> Option<Stone> {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .and_then(|&c| Stone::from_cell_value(c))
    }

    pub fn is_empty_at(&self, row: usize, col: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .is_some_and(|&c| c == 0)
    }

    pub fn is_full(&self) -> bool {
        self.cells.iter().flatten().all(|&c| c != 0)
    }

    /// Number of stones already played; move N is `stone_count() + 1`.
    pub fn stone_count(&self) -> usize {
        self.cells.iter().flatten().filter(|&&c| c != 0).count()
    }

    /// Place a stone. Rejects out-of-bounds and occupied cells.
    pub fn place(&mut self, row: usize, col: usize, stone: Stone) -> Result<()> {
        if row >= BOARD_SIZE || col >= BOARD_SIZE {
            return Err(Error::Engine(format!("({row}, {col}) is off the board")));
        }
        if !self.is_empty_at(row, col) {
            return Err(Error::Engine(format!("({row}, {col}) is occupied")));
        }
        self.cells[row][col] = stone.cell_value();
        Ok(())
    }

    /// Clear a cell. Off-board coordinates are a no-op.
    pub fn remove(&mut self, row: usize, col: usize) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = 0;
        }
    }

    /// Whether the stone just placed at (row, col) completes five in a row.
    pub fn check_winner(&self, row: usize, col: usize, stone: Stone) -> bool {
        let value = stone.cell_value();
        for pair in &DIRECTION_PAIRS {
            let mut count = 1;
            for &(dr, dc) in pair {
                let mut r = row as i32 + dr;
                let mut c = col as i32 + dc;
                while (0..BOARD_SIZE as i32).contains(&r)
                    && (0..BOARD_SIZE as i32).contains(&c)
                    && self.cells[r as usize][c as usize] == value
                {
                    count += 1;
                    r += dr;
                    c += dc;
                }
            }
            if count >= 5 {
                return true;
            }
        }
        false
    }

    /// All empty positions, row-major.
    pub fn empty_positions(&self) -> Vec<(usize, usize)> {
        let mut positions = Vec::new();
        for row in 0..BOARD_SIZE {
            for col in 0..BOARD_SIZE {
                if self.is_empty_at(row, col) {
                    positions.push((row, col));
                }
            }
        }
        positions
    }

    /// Snapshot for a sandboxed submission's runtime context.
    pub fn snapshot(&self, player: Stone) -> MoveContext {
        MoveContext::new(self.cells.clone(), player.cell_value())
    }

    /// Validate an extracted candidate against bounds and occupancy. This
    /// is the caller-side check the result extractor deliberately skips.
    pub fn validate_candidate(&self, candidate: &MoveCandidate) -> Option<(usize, usize)> {
        let (row, col) = candidate.pair?;
        if !(0..BOARD_SIZE as i64).contains(&row) || !(0..BOARD_SIZE as i64).contains(&col) {
            return None;
        }
        let (row, col) = (row as usize, col as usize);
        if !self.is_empty_at(row, col) {
            return None;
        }
        Some((row, col))
    }

    /// Numbered-grid rendering used in advisor prompts: `.` empty, `●`
    /// black, `○` white.
    pub fn to_text(&self) -> String {
        let mut lines = Vec::with_capacity(BOARD_SIZE + 2);
        lines.push(format!("Current board ({0}x{0}):", BOARD_SIZE));
        lines.push(format!(
            "   {}",
            (0..BOARD_SIZE)
                .map(|i| format!("{i:2}"))
                .collect::<Vec<_>>()
                .join(" ")
        ));
        for (r, row) in self.cells.iter().enumerate() {
            let mut line = format!("{r:2} ");
            for &cell in row {
                line.push_str(match cell {
                    1 => " ● ",
                    2 => " ○ ",
                    _ => " . ",
                });
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}
