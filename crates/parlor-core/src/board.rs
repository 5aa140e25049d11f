//! Board, cells, and player marks.
//!
//! The board is 9 cells, indices 0–8 mapping to the 3x3 grid row-major.
//! On the wire each cell is a string: `""` for empty, otherwise the mark,
//! so a fresh board serializes as `["","","","","","","","",""]`.

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

/// Number of cells on the board.
pub const BOARD_CELLS: usize = 9;

/// A player mark. `X` always moves first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Mark {
    /// First mover (the session creator's mark).
    X,
    /// Second mover (the joiner's mark).
    O,
}

impl Mark {
    /// The opposing mark.
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }

    /// Wire representation of the mark.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One board cell: empty or holding a mark.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Cell(pub Option<Mark>);

impl Cell {
    /// True if no mark occupies this cell.
    #[must_use]
    pub fn is_empty(self) -> bool {
        self.0.is_none()
    }

    /// The occupying mark, if any.
    #[must_use]
    pub fn mark(self) -> Option<Mark> {
        self.0
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.map_or("", Mark::as_str))
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.as_str() {
            "" => Ok(Self(None)),
            "X" => Ok(Self(Some(Mark::X))),
            "O" => Ok(Self(Some(Mark::O))),
            other => Err(de::Error::custom(format!("invalid cell value {other:?}"))),
        }
    }
}

/// The 3x3 board.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Board {
    cells: [Cell; BOARD_CELLS],
}

impl Board {
    /// An empty board.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The cell at `index`, or `None` when the index is off the board.
    #[must_use]
    pub fn cell(&self, index: usize) -> Option<Cell> {
        self.cells.get(index).copied()
    }

    /// Write `mark` into the cell at `index`.
    ///
    /// Returns false (leaving the board untouched) when the index is off
    /// the board; occupancy is the rule engine's concern, not checked here.
    pub fn set(&mut self, index: usize, mark: Mark) -> bool {
        match self.cells.get_mut(index) {
            Some(cell) => {
                *cell = Cell(Some(mark));
                true
            }
            None => false,
        }
    }

    /// All nine cells, row-major.
    #[must_use]
    pub fn cells(&self) -> &[Cell; BOARD_CELLS] {
        &self.cells
    }

    /// True when every cell is occupied.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.cells.iter().all(|c| !c.is_empty())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
