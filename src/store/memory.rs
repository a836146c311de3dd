use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use anyhow::anyhow;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::domain::{Match, MatchId, MatchStatus, Move, MoveId};
use crate::grid::Grid;
use crate::placement::PlacementRecord;
use crate::store::{MatchStore, MoveOrder, PlayerRecords, Tally};

/// Process-local record store.
///
/// Rows are kept bincode-encoded, so every load hands out an independent
/// copy the way a database would.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Tables>,
}

#[derive(Default)]
struct Tables {
    next_match: MatchId,
    next_move: MoveId,
    matches: BTreeMap<MatchId, Vec<u8>>,
    placements: BTreeMap<(MatchId, String), Vec<u8>>,
    moves: BTreeMap<MoveId, (MatchId, Vec<u8>)>,
    tallies: HashMap<String, Tally>,
}

fn encode<T: Serialize>(value: &T) -> anyhow::Result<Vec<u8>> {
    Ok(bincode::serialize(value)?)
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> anyhow::Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> anyhow::Result<MutexGuard<'_, Tables>> {
        self.inner.lock().map_err(|_| anyhow!("memory store lock poisoned"))
    }

    /// Number of moves stored for a match, reverted or not.
    pub fn move_count(&self, match_id: MatchId) -> anyhow::Result<usize> {
        let tables = self.tables()?;
        Ok(tables.moves.values().filter(|(m, _)| *m == match_id).count())
    }
}

impl Tables {
    fn finished_ids(&self) -> anyhow::Result<BTreeSet<MatchId>> {
        let mut ids = BTreeSet::new();
        for (id, row) in self.matches.iter() {
            let game: Match = decode(row)?;
            if game.status == MatchStatus::Finished {
                ids.insert(*id);
            }
        }
        Ok(ids)
    }
}

impl MatchStore for MemoryStore {
    fn next_match_id(&self) -> anyhow::Result<MatchId> {
        let mut tables = self.tables()?;
        tables.next_match += 1;
        Ok(tables.next_match)
    }

    fn load_match(&self, match_id: MatchId) -> anyhow::Result<Option<Match>> {
        let tables = self.tables()?;
        tables.matches.get(&match_id).map(|row| decode(row)).transpose()
    }

    fn save_match(&self, game: &Match) -> anyhow::Result<()> {
        let row = encode(game)?;
        self.tables()?.matches.insert(game.id, row);
        Ok(())
    }

    fn load_placement(&self, match_id: MatchId, side: &str) -> anyhow::Result<Option<PlacementRecord>> {
        let tables = self.tables()?;
        tables
            .placements
            .get(&(match_id, side.to_string()))
            .map(|row| decode(row))
            .transpose()
    }

    fn save_placement(&self, match_id: MatchId, side: &str, record: &PlacementRecord) -> anyhow::Result<()> {
        let row = encode(record)?;
        self.tables()?.placements.insert((match_id, side.to_string()), row);
        Ok(())
    }

    fn append_move(&self, mut mv: Move) -> anyhow::Result<Move> {
        let mut tables = self.tables()?;
        tables.next_move += 1;
        mv.id = tables.next_move;
        let row = encode(&mv)?;
        tables.moves.insert(mv.id, (mv.match_id, row));
        Ok(mv)
    }

    fn query_moves(
        &self,
        match_id: MatchId,
        reverted: Option<bool>,
        order: MoveOrder,
    ) -> anyhow::Result<Vec<Move>> {
        let tables = self.tables()?;
        let mut out = Vec::new();
        for (m, row) in tables.moves.values() {
            if *m != match_id {
                continue;
            }
            let mv: Move = decode(row)?;
            if reverted.map_or(true, |flag| mv.reverted == flag) {
                out.push(mv);
            }
        }
        if order == MoveOrder::NewestFirst {
            out.reverse();
        }
        Ok(out)
    }

    fn update_move(&self, mv: &Move) -> anyhow::Result<()> {
        let row = encode(mv)?;
        let mut tables = self.tables()?;
        match tables.moves.get_mut(&mv.id) {
            Some(slot) => {
                *slot = (mv.match_id, row);
                Ok(())
            }
            None => Err(anyhow!("move {} does not exist", mv.id)),
        }
    }

    fn delete_reverted_moves(&self, match_id: MatchId) -> anyhow::Result<usize> {
        let mut tables = self.tables()?;
        let mut doomed = Vec::new();
        for (id, (m, row)) in tables.moves.iter() {
            if *m == match_id && decode::<Move>(row)?.reverted {
                doomed.push(*id);
            }
        }
        for id in doomed.iter() {
            tables.moves.remove(id);
        }
        Ok(doomed.len())
    }
}

impl PlayerRecords for MemoryStore {
    fn record_result(&self, winner: &str, loser: &str) -> anyhow::Result<()> {
        let mut tables = self.tables()?;
        tables.tallies.entry(winner.to_string()).or_default().wins += 1;
        tables.tallies.entry(loser.to_string()).or_default().losses += 1;
        Ok(())
    }

    fn revoke_result(&self, winner: &str, loser: &str) -> anyhow::Result<()> {
        let mut tables = self.tables()?;
        let w = tables.tallies.entry(winner.to_string()).or_default();
        w.wins = w.wins.saturating_sub(1);
        let l = tables.tallies.entry(loser.to_string()).or_default();
        l.losses = l.losses.saturating_sub(1);
        Ok(())
    }

    fn tally(&self, name: &str) -> anyhow::Result<Tally> {
        Ok(self.tables()?.tallies.get(name).copied().unwrap_or_default())
    }

    fn finished_grids(&self, owner: Option<&str>) -> anyhow::Result<Vec<Grid>> {
        let tables = self.tables()?;
        let finished = tables.finished_ids()?;
        let mut grids = Vec::new();
        for ((match_id, side), row) in tables.placements.iter() {
            if !finished.contains(match_id) || owner.is_some_and(|o| o != side.as_str()) {
                continue;
            }
            let record: PlacementRecord = decode(row)?;
            grids.push(record.grid().clone());
        }
        Ok(grids)
    }

    fn finished_matches(&self) -> anyhow::Result<Vec<Match>> {
        let tables = self.tables()?;
        let mut out = Vec::new();
        for row in tables.matches.values() {
            let game: Match = decode(row)?;
            if game.status == MatchStatus::Finished {
                out.push(game);
            }
        }
        Ok(out)
    }

    fn matches_of(&self, name: &str) -> anyhow::Result<Vec<Match>> {
        let tables = self.tables()?;
        let mut out = Vec::new();
        for row in tables.matches.values().rev() {
            let game: Match = decode(row)?;
            if game.side(name).is_some() {
                out.push(game);
            }
        }
        Ok(out)
    }

    fn player_count(&self) -> anyhow::Result<usize> {
        let tables = self.tables()?;
        let mut humans = BTreeSet::new();
        for row in tables.matches.values() {
            let game: Match = decode(row)?;
            for side in game.sides().filter(|s| s.participant.ai_kind().is_none()) {
                humans.insert(side.name().to_string());
            }
        }
        Ok(humans.len())
    }
}
