//! Fleet catalog and engine tuning knobs.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ship::ShipType;

pub const BOARD_SIZE: u8 = 10;
pub const GRID_SIZE: usize = BOARD_SIZE as usize;
pub const NUM_SHIPS: usize = 5;
pub const SHIPS: [ShipType; NUM_SHIPS] = [
    ShipType::new("Carrier", 5),
    ShipType::new("Battleship", 4),
    ShipType::new("Cruiser", 3),
    ShipType::new("Submarine", 3),
    ShipType::new("Destroyer", 2),
];

/// Total number of ship segments used in the standard configuration.
pub const TOTAL_SHIP_CELLS: usize = 5 + 4 + 3 + 3 + 2;

/// Look up a catalog entry by ship name.
pub fn ship_by_name(name: &str) -> Option<ShipType> {
    SHIPS.iter().copied().find(|def| def.name() == name)
}

/// Runtime configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Attempts a constrained placement strategy makes before falling back to
    /// uniform-random placement.
    pub placement_attempts: usize,
    /// How long a computed aggregate density matrix stays fresh.
    #[serde(with = "duration_secs")]
    pub cache_window: Duration,
    /// Weight of the cross-match density in the strategic score.
    pub aggregate_weight: f64,
    /// Weight of the opponent's own density in the strategic score.
    pub personal_weight: f64,
    /// Rows (horizontal ships) or columns (vertical ships) the
    /// mid-and-corner strategy refuses to use.
    pub disfavored_lines: Vec<usize>,
    /// Probability that the mid-and-corner strategy tries a vertical ship.
    pub vertical_bias: f64,
    /// Whether an out-of-bounds shot still discards pending redo moves.
    pub discard_redo_on_out_of_bounds: bool,
    /// Reject manual placements that touch another ship orthogonally.
    pub adjacency_rule: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            placement_attempts: 100,
            cache_window: Duration::from_secs(60),
            aggregate_weight: 0.7,
            personal_weight: 0.3,
            disfavored_lines: vec![0, 4, 5, 9],
            vertical_bias: 0.9,
            discard_redo_on_out_of_bounds: true,
            adjacency_rule: false,
        }
    }
}

impl EngineConfig {
    /// Defaults, overridden by `BROADSIDE_CACHE_SECS` and
    /// `BROADSIDE_DISCARD_REDO_ON_OOB` when they are set and parse.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(secs) = env::var("BROADSIDE_CACHE_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            config.cache_window = Duration::from_secs(secs);
        }
        if let Some(flag) = env::var("BROADSIDE_DISCARD_REDO_ON_OOB")
            .ok()
            .and_then(|v| v.parse::<bool>().ok())
        {
            config.discard_redo_on_out_of_bounds = flag;
        }
        config
    }
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_matches_total() {
        let total: usize = SHIPS.iter().map(|s| s.length()).sum();
        assert_eq!(total, TOTAL_SHIP_CELLS);
        assert_eq!(ship_by_name("Cruiser").map(|s| s.length()), Some(3));
        assert!(ship_by_name("Rowboat").is_none());
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"cache_window": 5, "adjacency_rule": true}"#).unwrap();
        assert_eq!(config.cache_window, Duration::from_secs(5));
        assert!(config.adjacency_rule);
        assert_eq!(config.placement_attempts, 100);
    }
}
