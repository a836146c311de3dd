// Occupancy density heatmaps and the time-bounded aggregate cache.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use log::{debug, info};

use crate::config::GRID_SIZE;
use crate::grid::Grid;
use crate::store::PlayerRecords;

/// Per-cell ship-occupancy density in `[0, 1]`, indexed `[x][y]`.
pub type DensityMatrix = [[f64; GRID_SIZE]; GRID_SIZE];

/// Score given to cells that must never be chosen.
pub const MASKED_SCORE: f64 = -1e9;

/// Element-wise mean of the boards' occupancy masks. A cell counts as
/// occupied when it holds a ship segment in any state. No boards gives an
/// all-zero matrix.
pub fn occupancy_density(grids: &[Grid]) -> DensityMatrix {
    let mut matrix = [[0.0f64; GRID_SIZE]; GRID_SIZE];
    if grids.is_empty() {
        return matrix;
    }
    for grid in grids {
        for (x, y, cell) in grid.cells() {
            if cell.is_occupied() {
                matrix[x][y] += 1.0;
            }
        }
    }
    let n = grids.len() as f64;
    for row in matrix.iter_mut() {
        for v in row.iter_mut() {
            *v /= n;
        }
    }
    matrix
}

/// `aggregate_weight * aggregate + personal_weight * personal`.
pub fn strategic_scores(
    aggregate: &DensityMatrix,
    personal: &DensityMatrix,
    aggregate_weight: f64,
    personal_weight: f64,
) -> DensityMatrix {
    let mut scores = [[0.0f64; GRID_SIZE]; GRID_SIZE];
    for x in 0..GRID_SIZE {
        for y in 0..GRID_SIZE {
            scores[x][y] = aggregate_weight * aggregate[x][y] + personal_weight * personal[x][y];
        }
    }
    scores
}

/// Highest-scoring cell the opponent board still leaves open. Resolved cells
/// are masked out; among equal scores the first in row-major order wins.
pub fn best_target(scores: &DensityMatrix, board: &Grid) -> Option<((usize, usize), f64)> {
    let mut best: Option<((usize, usize), f64)> = None;
    for (x, y, cell) in board.cells() {
        let score = if cell.is_resolved() {
            MASKED_SCORE
        } else {
            scores[x][y]
        };
        if score <= MASKED_SCORE {
            continue;
        }
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some(((x, y), score)),
        }
    }
    best
}

/// Source of monotonic time for cache staleness checks.
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin.
    fn now(&self) -> Duration;
}

/// Wall-clock time measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    nanos: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.as_nanos() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

#[derive(Clone)]
struct Snapshot {
    matrix: DensityMatrix,
    computed_at: Duration,
}

/// Aggregate density over every finished match, recomputed at most once per
/// staleness window. Concurrent refreshes race benignly: the last one stored
/// wins.
pub struct ProbabilityCache {
    clock: Arc<dyn Clock>,
    window: Duration,
    slot: Mutex<Option<Snapshot>>,
}

impl ProbabilityCache {
    pub fn new(clock: Arc<dyn Clock>, window: Duration) -> Self {
        Self {
            clock,
            window,
            slot: Mutex::new(None),
        }
    }

    /// Cached matrix if still fresh, otherwise a freshly computed one.
    pub fn aggregate(&self, records: &dyn PlayerRecords) -> anyhow::Result<DensityMatrix> {
        let now = self.clock.now();
        if let Some(snapshot) = self.fresh(now) {
            debug!("aggregate density served from cache");
            return Ok(snapshot.matrix);
        }
        let grids = records.finished_grids(None)?;
        let matrix = occupancy_density(&grids);
        info!("aggregate density recomputed from {} boards", grids.len());
        self.store(Snapshot {
            matrix,
            computed_at: now,
        });
        Ok(matrix)
    }

    /// Forget the cached matrix.
    pub fn invalidate(&self) {
        match self.slot.lock() {
            Ok(mut slot) => *slot = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
    }

    fn fresh(&self, now: Duration) -> Option<Snapshot> {
        let slot = match self.slot.lock() {
            Ok(slot) => slot,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.as_ref()
            .filter(|s| now.saturating_sub(s.computed_at) < self.window)
            .cloned()
    }

    fn store(&self, snapshot: Snapshot) {
        match self.slot.lock() {
            Ok(mut slot) => *slot = Some(snapshot),
            Err(poisoned) => *poisoned.into_inner() = Some(snapshot),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Cell;

    #[test]
    fn density_averages_masks() {
        let mut a = Grid::new();
        a.set_cell(0, 0, Cell::ShipBody);
        a.set_cell(0, 1, Cell::Miss);
        let mut b = Grid::new();
        b.set_cell(0, 0, Cell::Sunk);
        b.set_cell(1, 1, Cell::Hit);
        let m = occupancy_density(&[a, b]);
        assert_eq!(m[0][0], 1.0);
        assert_eq!(m[1][1], 0.5);
        assert_eq!(m[0][1], 0.0);
        assert_eq!(occupancy_density(&[]), [[0.0; GRID_SIZE]; GRID_SIZE]);
    }

    #[test]
    fn ties_go_to_first_in_row_major_order() {
        let mut scores = [[0.0; GRID_SIZE]; GRID_SIZE];
        scores[3][7] = 0.8;
        scores[5][1] = 0.8;
        let board = Grid::new();
        assert_eq!(best_target(&scores, &board), Some(((3, 7), 0.8)));
    }

    #[test]
    fn resolved_cells_are_never_chosen() {
        let mut scores = [[0.0; GRID_SIZE]; GRID_SIZE];
        scores[0][0] = 1.0;
        let mut board = Grid::new();
        board.set_cell(0, 0, Cell::Miss);
        assert_eq!(best_target(&scores, &board), Some(((0, 1), 0.0)));

        for x in 0..GRID_SIZE {
            for y in 0..GRID_SIZE {
                board.set_cell(x, y, Cell::Miss);
            }
        }
        assert_eq!(best_target(&scores, &board), None);
    }

    #[test]
    fn blend_uses_weights() {
        let mut agg = [[0.0; GRID_SIZE]; GRID_SIZE];
        let mut personal = [[0.0; GRID_SIZE]; GRID_SIZE];
        agg[2][2] = 1.0;
        personal[2][2] = 0.5;
        let s = strategic_scores(&agg, &personal, 0.7, 0.3);
        assert!((s[2][2] - 0.85).abs() < 1e-12);
    }
}
