//! Placement records, placement predicates and automated placement strategies.

use std::collections::BTreeMap;
use std::str::FromStr;

use log::debug;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::common::PlacementError;
use crate::config::{EngineConfig, GRID_SIZE, SHIPS};
use crate::grid::{Cell, Grid};
use crate::ship::{Orientation, ShipInstance, ShipType};

/// Whether every cell of the run is on the board and `Empty`.
pub fn can_place(grid: &Grid, x: usize, y: usize, length: usize, orientation: Orientation) -> bool {
    orientation
        .run(x, y, length)
        .all(|(cx, cy)| grid.cell_at(cx, cy) == Some(Cell::Empty))
}

/// [`can_place`], additionally refusing runs that sit in a disfavored line:
/// the column of a vertical ship or the row of a horizontal one.
pub fn can_place_avoiding_lines(
    grid: &Grid,
    x: usize,
    y: usize,
    length: usize,
    orientation: Orientation,
    lines: &[usize],
) -> bool {
    let line = match orientation {
        Orientation::Vertical => y,
        Orientation::Horizontal => x,
    };
    !lines.contains(&line) && can_place(grid, x, y, length, orientation)
}

/// [`can_place`], additionally refusing runs with a `ShipBody` orthogonally
/// next to any of their cells.
pub fn can_place_apart(grid: &Grid, x: usize, y: usize, length: usize, orientation: Orientation) -> bool {
    can_place(grid, x, y, length, orientation)
        && orientation
            .run(x, y, length)
            .all(|(cx, cy)| !touches_ship(grid, cx, cy))
}

fn touches_ship(grid: &Grid, x: usize, y: usize) -> bool {
    let neighbours = [
        x.checked_sub(1).map(|nx| (nx, y)),
        Some((x + 1, y)),
        y.checked_sub(1).map(|ny| (x, ny)),
        Some((x, y + 1)),
    ];
    neighbours
        .into_iter()
        .flatten()
        .any(|(nx, ny)| grid.cell_at(nx, ny) == Some(Cell::ShipBody))
}

/// One side's board plus its ships, for one match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    grid: Grid,
    ships: BTreeMap<String, ShipInstance>,
}

impl PlacementRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub(crate) fn grid_mut(&mut self) -> &mut Grid {
        &mut self.grid
    }

    pub fn ships(&self) -> &BTreeMap<String, ShipInstance> {
        &self.ships
    }

    pub fn ship(&self, name: &str) -> Option<&ShipInstance> {
        self.ships.get(name)
    }

    /// The ship covering (`x`, `y`), if any.
    pub fn ship_at(&self, x: usize, y: usize) -> Option<&ShipInstance> {
        self.ships.values().find(|s| s.contains(x, y))
    }

    /// Every catalog ship has been placed.
    pub fn fleet_complete(&self) -> bool {
        SHIPS.iter().all(|def| self.ships.contains_key(def.name()))
    }

    /// Place a ship without the adjacency rule.
    pub fn place(
        &mut self,
        x: usize,
        y: usize,
        length: usize,
        orientation: Orientation,
        ship_name: &str,
    ) -> Result<&ShipInstance, PlacementError> {
        self.place_checked(x, y, length, orientation, ship_name, false)
    }

    /// Validate and commit a ship. The grid and the ship map change together
    /// or not at all.
    pub fn place_checked(
        &mut self,
        x: usize,
        y: usize,
        length: usize,
        orientation: Orientation,
        ship_name: &str,
        adjacency_rule: bool,
    ) -> Result<&ShipInstance, PlacementError> {
        if self.ships.contains_key(ship_name) {
            return Err(PlacementError::AlreadyPlaced {
                ship: ship_name.to_string(),
            });
        }
        let fits = if adjacency_rule {
            can_place_apart(&self.grid, x, y, length, orientation)
        } else {
            can_place(&self.grid, x, y, length, orientation)
        };
        if !fits {
            return Err(PlacementError::InvalidPlacement {
                ship: ship_name.to_string(),
                x,
                y,
            });
        }
        let positions: Vec<_> = orientation.run(x, y, length).collect();
        for &(cx, cy) in positions.iter() {
            self.grid.set_cell(cx, cy, Cell::ShipBody);
        }
        debug!("placed {} at {:?}", ship_name, positions);
        let ship = self
            .ships
            .entry(ship_name.to_string())
            .or_insert(ShipInstance::new(ship_name, positions));
        Ok(ship)
    }

    /// Flag a ship sunk and turn all its cells `Sunk`. Returns its cells.
    pub(crate) fn mark_sunk(&mut self, name: &str) -> Option<Vec<(usize, usize)>> {
        let ship = self.ships.get_mut(name)?;
        ship.sunk = true;
        for &(x, y) in ship.positions.iter() {
            self.grid.set_cell(x, y, Cell::Sunk);
        }
        Some(ship.positions.clone())
    }

    /// Undo [`mark_sunk`](Self::mark_sunk): clear the flag and turn `Sunk`
    /// cells back into `Hit`.
    pub(crate) fn mark_afloat(&mut self, name: &str) -> Option<()> {
        let ship = self.ships.get_mut(name)?;
        ship.sunk = false;
        for &(x, y) in ship.positions.iter() {
            if self.grid.cell_at(x, y) == Some(Cell::Sunk) {
                self.grid.set_cell(x, y, Cell::Hit);
            }
        }
        Some(())
    }
}

/// How automated placement picks positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlacementStrategy {
    /// Uniform random position and orientation.
    #[default]
    Random,
    /// Stay out of the edge and centre lines, mostly vertical.
    AvoidMidAndCorner,
    /// Never let two ships touch orthogonally.
    AvoidAdjacent,
}

impl FromStr for PlacementStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace(['-', '_'], " ").as_str() {
            "random" => Ok(PlacementStrategy::Random),
            "avoid mid and corner" => Ok(PlacementStrategy::AvoidMidAndCorner),
            "avoid adjacent" => Ok(PlacementStrategy::AvoidAdjacent),
            other => Err(format!("unknown placement strategy: {other}")),
        }
    }
}

/// Build a fresh record holding the whole fleet, placed in catalog order.
pub fn auto_place<R: Rng + ?Sized>(
    rng: &mut R,
    strategy: PlacementStrategy,
    config: &EngineConfig,
) -> Result<PlacementRecord, PlacementError> {
    let mut record = PlacementRecord::new();
    for def in SHIPS.iter() {
        place_with_strategy(&mut record, rng, *def, strategy, config)?;
    }
    Ok(record)
}

/// Place one ship under `strategy`, falling back to uniform-random placement
/// once the strategy's attempts run out.
pub fn place_with_strategy<R: Rng + ?Sized>(
    record: &mut PlacementRecord,
    rng: &mut R,
    def: ShipType,
    strategy: PlacementStrategy,
    config: &EngineConfig,
) -> Result<(), PlacementError> {
    if strategy != PlacementStrategy::Random {
        let len = def.length();
        for _ in 0..config.placement_attempts {
            let orientation = match strategy {
                PlacementStrategy::AvoidMidAndCorner => {
                    if rng.random_bool(config.vertical_bias.clamp(0.0, 1.0)) {
                        Orientation::Vertical
                    } else {
                        Orientation::Horizontal
                    }
                }
                _ => random_orientation(rng),
            };
            let x = rng.random_range(0..GRID_SIZE);
            let y = rng.random_range(0..GRID_SIZE);
            if strategy_accepts(strategy, record.grid(), x, y, len, orientation, config) {
                record.place(x, y, len, orientation, def.name())?;
                return Ok(());
            }
        }
        debug!("{:?} gave up on {}, falling back to random", strategy, def.name());
    }
    place_randomly(record, rng, def, config)
}

fn strategy_accepts(
    strategy: PlacementStrategy,
    grid: &Grid,
    x: usize,
    y: usize,
    len: usize,
    orientation: Orientation,
    config: &EngineConfig,
) -> bool {
    match strategy {
        PlacementStrategy::Random => can_place(grid, x, y, len, orientation),
        PlacementStrategy::AvoidMidAndCorner => {
            can_place_avoiding_lines(grid, x, y, len, orientation, &config.disfavored_lines)
        }
        PlacementStrategy::AvoidAdjacent => can_place_apart(grid, x, y, len, orientation),
    }
}

fn random_orientation<R: Rng + ?Sized>(rng: &mut R) -> Orientation {
    if rng.random() {
        Orientation::Horizontal
    } else {
        Orientation::Vertical
    }
}

/// Uniform random draws; after a generous budget, the first legal slot in
/// row-major order so the search always terminates.
fn place_randomly<R: Rng + ?Sized>(
    record: &mut PlacementRecord,
    rng: &mut R,
    def: ShipType,
    config: &EngineConfig,
) -> Result<(), PlacementError> {
    let len = def.length();
    let budget = config.placement_attempts.max(1) * 100;
    for _ in 0..budget {
        let orientation = random_orientation(rng);
        let x = rng.random_range(0..GRID_SIZE);
        let y = rng.random_range(0..GRID_SIZE);
        if can_place(record.grid(), x, y, len, orientation) {
            record.place(x, y, len, orientation, def.name())?;
            return Ok(());
        }
    }
    for x in 0..GRID_SIZE {
        for y in 0..GRID_SIZE {
            for orientation in [Orientation::Horizontal, Orientation::Vertical] {
                if can_place(record.grid(), x, y, len, orientation) {
                    record.place(x, y, len, orientation, def.name())?;
                    return Ok(());
                }
            }
        }
    }
    Err(PlacementError::NoRoom {
        ship: def.name().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn run_off_the_edge_is_rejected() {
        let grid = Grid::new();
        assert!(can_place(&grid, 0, 5, 5, Orientation::Horizontal));
        assert!(!can_place(&grid, 0, 6, 5, Orientation::Horizontal));
        assert!(!can_place(&grid, 8, 0, 3, Orientation::Vertical));
    }

    #[test]
    fn disfavored_line_depends_on_orientation() {
        let grid = Grid::new();
        let lines = [0, 4, 5, 9];
        // vertical in column 4 is refused, horizontal in row 2 is fine
        assert!(!can_place_avoiding_lines(&grid, 1, 4, 3, Orientation::Vertical, &lines));
        assert!(can_place_avoiding_lines(&grid, 2, 4, 3, Orientation::Horizontal, &lines));
        assert!(!can_place_avoiding_lines(&grid, 0, 2, 3, Orientation::Horizontal, &lines));
    }

    #[test]
    fn apart_rejects_orthogonal_contact_only() {
        let mut record = PlacementRecord::new();
        record.place(2, 2, 2, Orientation::Horizontal, "Destroyer").unwrap();
        assert!(!can_place_apart(record.grid(), 3, 2, 2, Orientation::Horizontal));
        assert!(can_place(record.grid(), 3, 2, 2, Orientation::Horizontal));
        // diagonal contact is allowed
        assert!(can_place_apart(record.grid(), 3, 4, 2, Orientation::Vertical));
    }

    #[test]
    fn failed_placement_leaves_record_untouched() {
        let mut record = PlacementRecord::new();
        record.place(0, 0, 5, Orientation::Horizontal, "Carrier").unwrap();
        let before = record.clone();
        let err = record.place(0, 4, 3, Orientation::Vertical, "Cruiser").unwrap_err();
        assert!(matches!(err, PlacementError::InvalidPlacement { .. }));
        let err = record.place(5, 5, 5, Orientation::Vertical, "Carrier").unwrap_err();
        assert!(matches!(err, PlacementError::AlreadyPlaced { .. }));
        assert_eq!(record, before);
    }

    #[test]
    fn sunk_flag_round_trips() {
        let mut record = PlacementRecord::new();
        record.place(4, 4, 2, Orientation::Vertical, "Destroyer").unwrap();
        record.grid_mut().set_cell(4, 4, Cell::Hit);
        record.grid_mut().set_cell(5, 4, Cell::Hit);
        assert_eq!(record.mark_sunk("Destroyer"), Some(vec![(4, 4), (5, 4)]));
        assert_eq!(record.grid().count(Cell::Sunk), 2);
        record.mark_afloat("Destroyer").unwrap();
        assert_eq!(record.grid().count(Cell::Hit), 2);
        assert!(!record.ship("Destroyer").unwrap().sunk);
        assert!(record.mark_sunk("Carrier").is_none());
    }

    #[test]
    fn strategies_parse_from_spaced_or_dashed_names() {
        assert_eq!(
            "avoid mid and corner".parse::<PlacementStrategy>(),
            Ok(PlacementStrategy::AvoidMidAndCorner)
        );
        assert_eq!(
            "avoid-adjacent".parse::<PlacementStrategy>(),
            Ok(PlacementStrategy::AvoidAdjacent)
        );
        assert!("cluster".parse::<PlacementStrategy>().is_err());
    }

    #[test]
    fn auto_place_is_reproducible() {
        let config = EngineConfig::default();
        let a = auto_place(&mut SmallRng::seed_from_u64(9), PlacementStrategy::AvoidAdjacent, &config).unwrap();
        let b = auto_place(&mut SmallRng::seed_from_u64(9), PlacementStrategy::AvoidAdjacent, &config).unwrap();
        assert_eq!(a, b);
        assert!(a.fleet_complete());
    }
}
