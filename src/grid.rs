//! Per-side board of cell states.

use core::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::config::GRID_SIZE;

/// State of a single board cell.
///
/// Serialized as its numeric code so stored boards stay a plain matrix of
/// integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Cell {
    #[default]
    Empty = 0,
    ShipBody = 1,
    Hit = 2,
    Miss = 3,
    Sunk = 4,
}

impl Cell {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Cell> {
        match code {
            0 => Some(Cell::Empty),
            1 => Some(Cell::ShipBody),
            2 => Some(Cell::Hit),
            3 => Some(Cell::Miss),
            4 => Some(Cell::Sunk),
            _ => None,
        }
    }

    /// A shot has already landed here.
    pub fn is_resolved(self) -> bool {
        matches!(self, Cell::Hit | Cell::Miss | Cell::Sunk)
    }

    /// Part of a ship, shot or not.
    pub fn is_occupied(self) -> bool {
        matches!(self, Cell::ShipBody | Cell::Hit | Cell::Sunk)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u8(self.code())
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let code = u8::deserialize(d)?;
        Cell::from_code(code).ok_or_else(|| D::Error::custom(format!("invalid cell code {code}")))
    }
}

/// Square matrix of cells, indexed as `(x, y)` = (row, column).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

impl Grid {
    /// An all-`Empty` board.
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; GRID_SIZE]; GRID_SIZE],
        }
    }

    pub fn in_bounds(&self, x: usize, y: usize) -> bool {
        x < GRID_SIZE && y < GRID_SIZE
    }

    /// Cell at (`x`, `y`), or `None` off the board.
    pub fn cell_at(&self, x: usize, y: usize) -> Option<Cell> {
        self.cells.get(x).and_then(|row| row.get(y)).copied()
    }

    /// Overwrite a cell and return its previous value. Transition legality is
    /// the caller's business; returns `None` and leaves the grid untouched when
    /// the coordinate is off the board.
    pub fn set_cell(&mut self, x: usize, y: usize, cell: Cell) -> Option<Cell> {
        let slot = self.cells.get_mut(x)?.get_mut(y)?;
        Some(core::mem::replace(slot, cell))
    }

    /// Row-major iteration over every cell.
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, Cell)> + '_ {
        self.cells
            .iter()
            .enumerate()
            .flat_map(|(x, row)| row.iter().enumerate().map(move |(y, &c)| (x, y, c)))
    }

    pub fn count(&self, cell: Cell) -> usize {
        self.cells().filter(|&(_, _, c)| c == cell).count()
    }

    /// Whether any unshot ship segment remains.
    pub fn has_ship_body(&self) -> bool {
        self.cells().any(|(_, _, c)| c == Cell::ShipBody)
    }

    /// Rows of raw cell codes, the shape external renderers expect.
    pub fn to_codes(&self) -> Vec<Vec<u8>> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|c| c.code()).collect())
            .collect()
    }
}

impl fmt::Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Grid {{")?;
        for row in self.cells.iter() {
            write!(f, "  ")?;
            for c in row.iter() {
                write!(f, "{}", c.code())?;
            }
            writeln!(f)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_cell_reports_previous_value() {
        let mut grid = Grid::new();
        assert_eq!(grid.set_cell(3, 4, Cell::ShipBody), Some(Cell::Empty));
        assert_eq!(grid.set_cell(3, 4, Cell::Hit), Some(Cell::ShipBody));
        assert_eq!(grid.cell_at(3, 4), Some(Cell::Hit));
        assert_eq!(grid.set_cell(10, 0, Cell::Miss), None);
        assert_eq!(grid.cell_at(0, 10), None);
    }

    #[test]
    fn cells_are_row_major() {
        let grid = Grid::new();
        let coords: Vec<_> = grid.cells().take(3).map(|(x, y, _)| (x, y)).collect();
        assert_eq!(coords, vec![(0, 0), (0, 1), (0, 2)]);
        assert_eq!(grid.cells().count(), GRID_SIZE * GRID_SIZE);
    }

    #[test]
    fn codes_round_trip_through_json() {
        let mut grid = Grid::new();
        grid.set_cell(0, 0, Cell::Sunk);
        grid.set_cell(9, 9, Cell::Miss);
        let json = serde_json::to_string(&grid).unwrap();
        assert!(json.starts_with("[[4,0,"));
        let back: Grid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);
        assert!(serde_json::from_str::<Cell>("7").is_err());
    }
}
