//! Collaborator contracts for persistence and player records.
//!
//! The engine never owns storage. It reads and writes whole records through
//! these traits; each call is expected to be atomic for the single record it
//! touches.

use serde::{Deserialize, Serialize};

use crate::domain::{Match, MatchId, Move};
use crate::grid::Grid;
use crate::placement::PlacementRecord;

pub mod memory;

pub use memory::MemoryStore;

/// Ordering for ledger queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveOrder {
    OldestFirst,
    NewestFirst,
}

/// Match, placement and move-ledger persistence.
pub trait MatchStore: Send + Sync {
    /// Reserve an id for a new match.
    fn next_match_id(&self) -> anyhow::Result<MatchId>;
    fn load_match(&self, match_id: MatchId) -> anyhow::Result<Option<Match>>;
    fn save_match(&self, game: &Match) -> anyhow::Result<()>;

    fn load_placement(&self, match_id: MatchId, side: &str) -> anyhow::Result<Option<PlacementRecord>>;
    fn save_placement(&self, match_id: MatchId, side: &str, record: &PlacementRecord) -> anyhow::Result<()>;

    /// Append a move, returning it with its store-assigned id.
    fn append_move(&self, mv: Move) -> anyhow::Result<Move>;
    /// Moves of one match, optionally filtered on the `reverted` flag.
    fn query_moves(
        &self,
        match_id: MatchId,
        reverted: Option<bool>,
        order: MoveOrder,
    ) -> anyhow::Result<Vec<Move>>;
    fn update_move(&self, mv: &Move) -> anyhow::Result<()>;
    /// Drop every reverted move of a match. Returns how many were removed.
    fn delete_reverted_moves(&self, match_id: MatchId) -> anyhow::Result<usize>;
}

/// Win/loss counters per identity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
}

impl Tally {
    pub fn win_rate(&self) -> f64 {
        let total = self.wins + self.losses;
        if total == 0 {
            0.0
        } else {
            self.wins as f64 / total as f64
        }
    }
}

/// Player/AI record keeping and match history.
pub trait PlayerRecords: Send + Sync {
    /// Credit a finished match: one win for `winner`, one loss for `loser`.
    fn record_result(&self, winner: &str, loser: &str) -> anyhow::Result<()>;
    /// Take back a previously recorded result.
    fn revoke_result(&self, winner: &str, loser: &str) -> anyhow::Result<()>;
    fn tally(&self, name: &str) -> anyhow::Result<Tally>;
    /// Boards of finished matches, for every side or only for `owner`.
    fn finished_grids(&self, owner: Option<&str>) -> anyhow::Result<Vec<Grid>>;
    fn finished_matches(&self) -> anyhow::Result<Vec<Match>>;
    /// Every match `name` took a side in, newest first, whatever its status.
    fn matches_of(&self, name: &str) -> anyhow::Result<Vec<Match>>;
    /// Distinct human identities that ever took a side.
    fn player_count(&self) -> anyhow::Result<usize>;
}
