//! Ship definitions and placed ship instances.

use serde::{Deserialize, Serialize};

/// Orientation of a ship on the board.
///
/// Horizontal ships extend along `y` (columns), vertical ships along `x` (rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[serde(rename = "H")]
    Horizontal,
    #[serde(rename = "V")]
    Vertical,
}

impl Orientation {
    /// Cells covered by a run of `length` starting at (`x`, `y`). Cells may
    /// fall outside the board; callers check bounds.
    pub fn run(self, x: usize, y: usize, length: usize) -> impl Iterator<Item = (usize, usize)> {
        (0..length).map(move |i| match self {
            Orientation::Horizontal => (x, y + i),
            Orientation::Vertical => (x + i, y),
        })
    }
}

/// Type of ship: name and length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShipType {
    name: &'static str,
    length: usize,
}

impl ShipType {
    /// Create a new ship type.
    pub const fn new(name: &'static str, length: usize) -> Self {
        Self { name, length }
    }

    /// Ship's name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Ship's length.
    pub fn length(&self) -> usize {
        self.length
    }
}

/// A ship committed to one side's board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipInstance {
    pub name: String,
    /// Occupied cells, in placement order from the bow.
    pub positions: Vec<(usize, usize)>,
    pub sunk: bool,
}

impl ShipInstance {
    pub fn new(name: impl Into<String>, positions: Vec<(usize, usize)>) -> Self {
        Self {
            name: name.into(),
            positions,
            sunk: false,
        }
    }

    /// Whether the ship covers (`x`, `y`).
    pub fn contains(&self, x: usize, y: usize) -> bool {
        self.positions.contains(&(x, y))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn runs_follow_orientation() {
        let h: Vec<_> = Orientation::Horizontal.run(2, 3, 3).collect();
        assert_eq!(h, vec![(2, 3), (2, 4), (2, 5)]);
        let v: Vec<_> = Orientation::Vertical.run(2, 3, 2).collect();
        assert_eq!(v, vec![(2, 3), (3, 3)]);
    }

    #[test]
    fn instance_contains_its_cells() {
        let ship = ShipInstance::new("Destroyer", vec![(0, 0), (0, 1)]);
        assert!(ship.contains(0, 1));
        assert!(!ship.contains(1, 0));
        assert!(!ship.sunk);
        assert_eq!(ship.len(), 2);
    }
}
