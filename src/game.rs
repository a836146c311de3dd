use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use log::{debug, info, warn};
use rand::rngs::SmallRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::ai::{occupancy_density, DensityMatrix, ProbabilityCache, SystemClock};
use crate::common::{EngineError, PlacementError, ShotClass};
use crate::config::{ship_by_name, EngineConfig, SHIPS};
use crate::domain::{Match, MatchId, MatchStatus, Move, Participant, ShotReport, Side, SunkShip};
use crate::events::{Event, NotificationSink, NullSink};
use crate::grid::{Cell, Grid};
use crate::placement::{auto_place, PlacementRecord, PlacementStrategy};
use crate::player::{build_ai, AiTurn};
use crate::ship::{Orientation, ShipInstance};
use crate::store::{MatchStore, MemoryStore, MoveOrder, PlayerRecords, Tally};

const OPEN: &[MatchStatus] = &[
    MatchStatus::Pending,
    MatchStatus::Active,
    MatchStatus::Setup,
    MatchStatus::Battle,
];
const PLACING: &[MatchStatus] = &[MatchStatus::Active, MatchStatus::Setup];

/// One mutex per match so shots against the same match are serialized while
/// different matches proceed independently. Entries are weak: a match's
/// mutex lives only while some operation holds or waits on it.
#[derive(Default)]
struct MatchLocks {
    inner: Mutex<HashMap<MatchId, Weak<Mutex<()>>>>,
}

impl MatchLocks {
    fn get(&self, match_id: MatchId) -> Arc<Mutex<()>> {
        let mut map = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(lock) = map.get(&match_id).and_then(Weak::upgrade) {
            return lock;
        }
        map.retain(|_, w| w.strong_count() > 0);
        let lock = Arc::new(Mutex::new(()));
        map.insert(match_id, Arc::downgrade(&lock));
        lock
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

pub(crate) fn hold(lock: &Mutex<()>) -> MutexGuard<'_, ()> {
    lock.lock().unwrap_or_else(|p| p.into_inner())
}

/// Catalog ship and how it is doing on one side's board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShipStatus {
    pub name: String,
    pub length: usize,
    pub placed: bool,
    pub sunk: bool,
}

/// The match rules engine.
///
/// Holds no match state of its own: every operation loads the records it
/// needs from the store, applies the rules and writes them back.
pub struct Engine {
    store: Arc<dyn MatchStore>,
    records: Arc<dyn PlayerRecords>,
    sink: Arc<dyn NotificationSink>,
    cache: Arc<ProbabilityCache>,
    config: EngineConfig,
    locks: MatchLocks,
}

impl Engine {
    pub fn new(
        store: Arc<dyn MatchStore>,
        records: Arc<dyn PlayerRecords>,
        sink: Arc<dyn NotificationSink>,
        cache: Arc<ProbabilityCache>,
        config: EngineConfig,
    ) -> Self {
        Self {
            store,
            records,
            sink,
            cache,
            config,
            locks: MatchLocks::default(),
        }
    }

    /// Engine over a fresh [`MemoryStore`] with a wall-clock cache.
    pub fn in_memory(config: EngineConfig, sink: Arc<dyn NotificationSink>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let cache = Arc::new(ProbabilityCache::new(Arc::new(SystemClock::new()), config.cache_window));
        Self::new(store.clone(), store, sink, cache, config)
    }

    /// [`in_memory`](Self::in_memory) without notifications.
    pub fn quiet(config: EngineConfig) -> Self {
        Self::in_memory(config, Arc::new(NullSink))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub(crate) fn notify(&self, event: Event) {
        self.sink.emit(event);
    }

    pub(crate) fn store(&self) -> &dyn MatchStore {
        self.store.as_ref()
    }

    pub(crate) fn records(&self) -> &dyn PlayerRecords {
        self.records.as_ref()
    }

    pub(crate) fn match_lock(&self, match_id: MatchId) -> Arc<Mutex<()>> {
        self.locks.get(match_id)
    }

    pub(crate) fn load(&self, match_id: MatchId) -> Result<Match, EngineError> {
        self.store
            .load_match(match_id)?
            .ok_or(EngineError::UnknownMatch(match_id))
    }

    pub(crate) fn load_placement(&self, match_id: MatchId, side: &str) -> Result<PlacementRecord, EngineError> {
        self.store
            .load_placement(match_id, side)?
            .ok_or_else(|| EngineError::NoSuchPlacement {
                match_id,
                side: side.to_string(),
            })
    }

    // ---- lifecycle ----

    /// Open a match. It starts `Active` when the guest is bound right away,
    /// `Pending` otherwise.
    pub fn create_match(&self, host: Participant, guest: Option<Participant>) -> Result<Match, EngineError> {
        if let Some(g) = guest.as_ref() {
            ensure_distinct(&host, g)?;
        }
        let game = Match::new(self.store.next_match_id()?, host, guest);
        self.store.save_match(&game)?;
        info!("match {} created by {}", game.id, game.host.name());
        self.notify(Event::MatchCreated {
            match_id: game.id,
            host: game.host.name().to_string(),
        });
        if let Some(g) = game.guest.as_ref() {
            self.notify(Event::SideJoined {
                match_id: game.id,
                side: g.name().to_string(),
            });
        }
        Ok(game)
    }

    /// Bind the second side of a pending match.
    pub fn join_match(&self, match_id: MatchId, guest: Participant) -> Result<Match, EngineError> {
        let lock = self.locks.get(match_id);
        let _guard = hold(&lock);
        let mut game = self.load(match_id)?;
        if game.guest.is_some() {
            return Err(EngineError::SideAlreadyBound { match_id });
        }
        expect_status(&game, &[MatchStatus::Pending])?;
        ensure_distinct(&game.host.participant, &guest)?;
        let name = guest.name().to_string();
        game.guest = Some(Side::new(guest));
        game.status = MatchStatus::Active;
        self.store.save_match(&game)?;
        info!("{} joined match {}", name, match_id);
        self.notify(Event::SideJoined { match_id, side: name });
        Ok(game)
    }

    /// Move an active match into setup.
    pub fn begin_setup(&self, match_id: MatchId) -> Result<Match, EngineError> {
        let lock = self.locks.get(match_id);
        let _guard = hold(&lock);
        let mut game = self.load(match_id)?;
        expect_status(&game, &[MatchStatus::Active])?;
        game.status = MatchStatus::Setup;
        self.store.save_match(&game)?;
        debug!("match {} entered setup", match_id);
        Ok(game)
    }

    /// Signal that `side` has finished placing. Once both sides are ready the
    /// match enters battle with the host to move unless a turn is already set.
    pub fn mark_ready(&self, match_id: MatchId, side: &str) -> Result<Match, EngineError> {
        let lock = self.locks.get(match_id);
        let _guard = hold(&lock);
        let mut game = self.load(match_id)?;
        expect_status(&game, PLACING)?;
        let complete = self
            .store
            .load_placement(match_id, side)?
            .is_some_and(|r| r.fleet_complete());
        let entry = game.side_mut(side).ok_or_else(|| EngineError::UnknownSide {
            match_id,
            side: side.to_string(),
        })?;
        if !complete {
            return Err(EngineError::FleetIncomplete { side: side.to_string() });
        }
        entry.ready = true;
        game.status = MatchStatus::Setup;
        if game.both_ready() {
            game.status = MatchStatus::Battle;
            if game.current_turn.is_none() {
                game.current_turn = Some(game.host.name().to_string());
            }
            info!("match {} enters battle, {:?} to move", match_id, game.current_turn);
            self.notify(Event::BothReady {
                match_id,
                first_turn: game.current_turn.clone(),
            });
        }
        self.store.save_match(&game)?;
        Ok(game)
    }

    /// Withdraw from a match that has not finished.
    pub fn cancel_match(&self, match_id: MatchId) -> Result<Match, EngineError> {
        let lock = self.locks.get(match_id);
        let _guard = hold(&lock);
        let mut game = self.load(match_id)?;
        expect_status(&game, OPEN)?;
        game.status = MatchStatus::Canceled;
        self.store.save_match(&game)?;
        info!("match {} canceled", match_id);
        self.notify(Event::MatchCanceled { match_id });
        Ok(game)
    }

    /// `side` walks away from an unfinished match. A departing guest is
    /// unbound and the match waits for a new one; a departing host cancels it.
    pub fn leave_match(&self, match_id: MatchId, side: &str) -> Result<Match, EngineError> {
        let lock = self.locks.get(match_id);
        let _guard = hold(&lock);
        let mut game = self.load(match_id)?;
        let is_host = game.host.name() == side;
        let is_guest = game.guest.as_ref().is_some_and(|g| g.name() == side);
        if !is_host && !is_guest {
            return Err(EngineError::UnknownSide {
                match_id,
                side: side.to_string(),
            });
        }
        if is_host {
            expect_status(&game, OPEN)?;
            game.status = MatchStatus::Canceled;
        } else {
            expect_status(&game, PLACING)?;
            game.guest = None;
            game.status = MatchStatus::Pending;
            game.current_turn = None;
        }
        self.store.save_match(&game)?;
        info!("{} left match {}, now {:?}", side, match_id, game.status);
        self.notify(Event::SideLeft {
            match_id,
            side: side.to_string(),
        });
        if is_host {
            self.notify(Event::MatchCanceled { match_id });
        }
        Ok(game)
    }

    // ---- placement ----

    /// Place one catalog ship for `side`. The side's placement record is
    /// created on the first attempt, even when that attempt is refused.
    pub fn place_ship(
        &self,
        match_id: MatchId,
        side: &str,
        ship_name: &str,
        x: usize,
        y: usize,
        orientation: Orientation,
    ) -> Result<ShipInstance, EngineError> {
        let lock = self.locks.get(match_id);
        let _guard = hold(&lock);
        let mut game = self.placing_side(match_id, side)?;
        let def = ship_by_name(ship_name).ok_or_else(|| PlacementError::UnknownShip(ship_name.to_string()))?;
        let existing = self.store.load_placement(match_id, side)?;
        let created = existing.is_none();
        let mut record = existing.unwrap_or_default();
        if game.status == MatchStatus::Active {
            game.status = MatchStatus::Setup;
            self.store.save_match(&game)?;
        }
        let placed = record
            .place_checked(x, y, def.length(), orientation, def.name(), self.config.adjacency_rule)
            .cloned();
        let ship = match placed {
            Ok(ship) => ship,
            Err(e) => {
                if created {
                    self.store.save_placement(match_id, side, &record)?;
                }
                debug!("{} refused for {}: {}", ship_name, side, e);
                return Err(e.into());
            }
        };
        self.store.save_placement(match_id, side, &record)?;
        info!("{} placed {} at {:?}", side, ship.name, ship.positions);
        self.notify(Event::ShipPlaced {
            match_id,
            side: side.to_string(),
            ship: ship.name.clone(),
            positions: ship.positions.clone(),
        });
        Ok(ship)
    }

    /// Replace `side`'s board with a freshly generated full fleet.
    pub fn auto_place_ships<R: Rng + ?Sized>(
        &self,
        match_id: MatchId,
        side: &str,
        strategy: PlacementStrategy,
        rng: &mut R,
    ) -> Result<PlacementRecord, EngineError> {
        let lock = self.locks.get(match_id);
        let _guard = hold(&lock);
        let mut game = self.placing_side(match_id, side)?;
        let record = auto_place(rng, strategy, &self.config)?;
        self.store.save_placement(match_id, side, &record)?;
        if game.status == MatchStatus::Active {
            game.status = MatchStatus::Setup;
            self.store.save_match(&game)?;
        }
        info!("{} auto-placed its fleet ({:?})", side, strategy);
        self.notify(Event::FleetPlaced {
            match_id,
            side: side.to_string(),
            strategy,
        });
        Ok(record)
    }

    fn placing_side(&self, match_id: MatchId, side: &str) -> Result<Match, EngineError> {
        let game = self.load(match_id)?;
        if game.side(side).is_none() {
            return Err(EngineError::UnknownSide {
                match_id,
                side: side.to_string(),
            });
        }
        expect_status(&game, PLACING)?;
        Ok(game)
    }

    // ---- battle ----

    /// Fire as `attacker` at the other side. Only allowed in battle and only
    /// for the side holding the turn.
    pub fn fire(&self, match_id: MatchId, attacker: &str, x: usize, y: usize) -> Result<ShotReport, EngineError> {
        let lock = self.locks.get(match_id);
        let _guard = hold(&lock);
        let game = self.load(match_id)?;
        expect_status(&game, &[MatchStatus::Battle])?;
        let target = game
            .opponent_of(attacker)
            .map(|s| s.name().to_string())
            .ok_or_else(|| EngineError::UnknownSide {
                match_id,
                side: attacker.to_string(),
            })?;
        if game.current_turn.as_deref() != Some(attacker) {
            return Err(EngineError::NotYourTurn {
                attacker: attacker.to_string(),
            });
        }
        self.resolve(game, attacker, &target, x, y)
    }

    /// Resolve one shot of `attacker` against `target`'s board.
    ///
    /// Finished and canceled matches are refused. The turn is not checked
    /// here, and only a match in battle can be won; see [`fire`](Self::fire).
    pub fn resolve_shot(
        &self,
        match_id: MatchId,
        attacker: &str,
        target: &str,
        x: usize,
        y: usize,
    ) -> Result<ShotReport, EngineError> {
        let lock = self.locks.get(match_id);
        let _guard = hold(&lock);
        let game = self.load(match_id)?;
        expect_status(&game, OPEN)?;
        for name in [attacker, target] {
            if game.side(name).is_none() {
                return Err(EngineError::UnknownSide {
                    match_id,
                    side: name.to_string(),
                });
            }
        }
        self.resolve(game, attacker, target, x, y)
    }

    /// A fresh shot discards the redo history. Out-of-bounds shots discard it
    /// too unless configured otherwise.
    fn discards_redo_history(&self, in_bounds: bool) -> bool {
        in_bounds || self.config.discard_redo_on_out_of_bounds
    }

    fn resolve(
        &self,
        mut game: Match,
        attacker: &str,
        target: &str,
        x: usize,
        y: usize,
    ) -> Result<ShotReport, EngineError> {
        let match_id = game.id;
        let mut record = self.load_placement(match_id, target)?;
        let prev = record.grid().cell_at(x, y);

        // work on the local copy first so an inconsistency leaves the store untouched
        let (result, sunk) = match prev {
            None => (ShotClass::OutOfBounds, None),
            Some(Cell::Empty) => {
                record.grid_mut().set_cell(x, y, Cell::Miss);
                (ShotClass::Miss, None)
            }
            Some(Cell::ShipBody) => {
                let name = record
                    .ship_at(x, y)
                    .map(|s| s.name.clone())
                    .ok_or_else(|| EngineError::ShipComponentMissing {
                        match_id,
                        side: target.to_string(),
                        x,
                        y,
                    })?;
                record.grid_mut().set_cell(x, y, Cell::Hit);
                if ship_destroyed(&record, &name) {
                    let cells = record.mark_sunk(&name).unwrap_or_default();
                    (ShotClass::Sunk, Some(SunkShip { name, cells }))
                } else {
                    (ShotClass::Hit, None)
                }
            }
            Some(_) => (ShotClass::AlreadyHit, None),
        };

        if self.discards_redo_history(prev.is_some()) {
            let dropped = self.store.delete_reverted_moves(match_id)?;
            if dropped > 0 {
                debug!("match {}: discarded {} reverted moves", match_id, dropped);
            }
        }
        let Some(prev) = prev else {
            info!("{} fired off the board at ({}, {})", attacker, x, y);
            return Ok(ShotReport::out_of_bounds(attacker, target, x, y));
        };

        if result != ShotClass::AlreadyHit {
            self.store.save_placement(match_id, target, &record)?;
        }
        let mv = self.store.append_move(Move {
            id: 0,
            match_id,
            attacker: attacker.to_string(),
            target: target.to_string(),
            x,
            y,
            prev_cell: prev,
            result,
            sunk_ship: sunk.as_ref().map(|s| s.name.clone()),
            turn: game.current_turn.clone(),
            reverted: false,
        })?;
        if let Some(side) = game.side_mut(attacker) {
            side.shots += 1;
        }
        game.current_turn = Some(next_turn(result, attacker, target));

        let mut winner = None;
        if can_finish(&game) && !record.grid().has_ship_body() {
            self.finish(&mut game, attacker, target)?;
            winner = Some(attacker.to_string());
        }
        self.store.save_match(&game)?;

        info!("{} -> {} ({}, {}): {} [move {}]", attacker, target, x, y, result, mv.id);
        let report = ShotReport {
            attacker: attacker.to_string(),
            target: target.to_string(),
            x,
            y,
            result,
            sunk,
            winner,
        };
        self.notify(Event::ShotResolved {
            match_id,
            report: report.clone(),
            next_turn: game.current_turn.clone(),
        });
        if report.winner.is_some() {
            self.notify(Event::MatchFinished {
                match_id,
                winner: attacker.to_string(),
                loser: target.to_string(),
            });
        }
        Ok(report)
    }

    /// Close the match in favour of `winner` and credit the tallies.
    pub(crate) fn finish(&self, game: &mut Match, winner: &str, loser: &str) -> Result<(), EngineError> {
        game.status = MatchStatus::Finished;
        game.winner = Some(winner.to_string());
        self.records.record_result(winner, loser)?;
        info!("match {} won by {}", game.id, winner);
        Ok(())
    }

    // ---- AI sides ----

    /// Let every AI side of the match place its fleet and declare ready.
    pub fn ai_place_ships(&self, match_id: MatchId, rng: &mut SmallRng) -> Result<AiTurn, EngineError> {
        let game = self.load(match_id)?;
        let bots: Vec<_> = game
            .sides()
            .filter_map(|s| s.participant.ai_kind().map(|k| (k, s.name().to_string())))
            .collect();
        if bots.is_empty() {
            warn!("match {} has no AI side to place for", match_id);
            return Ok(AiTurn::NoAiBound);
        }
        for (kind, name) in bots {
            build_ai(kind, name.as_str()).place_ships(rng, self, match_id)?;
            self.mark_ready(match_id, &name)?;
        }
        Ok(AiTurn::Placed)
    }

    /// Take one shot for the AI holding the turn.
    pub fn ai_make_shot(&self, match_id: MatchId, rng: &mut SmallRng) -> Result<AiTurn, EngineError> {
        let game = self.load(match_id)?;
        if !game.has_ai() {
            warn!("match {} has no AI side to shoot for", match_id);
            return Ok(AiTurn::NoAiBound);
        }
        expect_status(&game, &[MatchStatus::Battle])?;
        let Some(turn) = game.current_turn.as_deref() else {
            return Ok(AiTurn::NotAiTurn);
        };
        let Some(kind) = game.side(turn).and_then(|s| s.participant.ai_kind()) else {
            return Ok(AiTurn::NotAiTurn);
        };
        let target = game
            .opponent_of(turn)
            .map(|s| s.name().to_string())
            .ok_or_else(|| EngineError::UnknownSide {
                match_id,
                side: turn.to_string(),
            })?;
        build_ai(kind, turn).make_shot(rng, self, match_id, &target)
    }

    // ---- queries ----

    pub fn match_state(&self, match_id: MatchId) -> Result<Match, EngineError> {
        self.load(match_id)
    }

    pub fn placement(&self, match_id: MatchId, side: &str) -> Result<PlacementRecord, EngineError> {
        self.load_placement(match_id, side)
    }

    /// `side`'s board as currently stored.
    pub fn board(&self, match_id: MatchId, side: &str) -> Result<Grid, EngineError> {
        Ok(self.load_placement(match_id, side)?.grid().clone())
    }

    /// Every catalog ship with its placement and sunk state on `side`'s board.
    pub fn fleet_status(&self, match_id: MatchId, side: &str) -> Result<Vec<ShipStatus>, EngineError> {
        let record = self.load_placement(match_id, side)?;
        Ok(SHIPS
            .iter()
            .map(|def| {
                let ship = record.ship(def.name());
                ShipStatus {
                    name: def.name().to_string(),
                    length: def.length(),
                    placed: ship.is_some(),
                    sunk: ship.is_some_and(|s| s.sunk),
                }
            })
            .collect())
    }

    /// The match's ledger, oldest first, reverted moves included.
    pub fn moves(&self, match_id: MatchId) -> Result<Vec<Move>, EngineError> {
        Ok(self.store.query_moves(match_id, None, MoveOrder::OldestFirst)?)
    }

    /// Cross-match occupancy density, served from the cache when fresh.
    pub fn aggregate_density(&self) -> Result<DensityMatrix, EngineError> {
        Ok(self.cache.aggregate(self.records.as_ref())?)
    }

    /// Occupancy density over `name`'s own boards in finished matches.
    pub fn personal_density(&self, name: &str) -> Result<DensityMatrix, EngineError> {
        Ok(occupancy_density(&self.records.finished_grids(Some(name))?))
    }

    pub fn tally(&self, name: &str) -> Result<Tally, EngineError> {
        Ok(self.records.tally(name)?)
    }
}

/// Turn holder after a resolved shot: a miss hands the turn over.
pub(crate) fn next_turn(result: ShotClass, attacker: &str, target: &str) -> String {
    if result.keeps_turn() {
        attacker.to_string()
    } else {
        target.to_string()
    }
}

/// Only a match in battle without a winner can be won.
pub(crate) fn can_finish(game: &Match) -> bool {
    game.status == MatchStatus::Battle && game.winner.is_none()
}

fn ship_destroyed(record: &PlacementRecord, name: &str) -> bool {
    record.ship(name).is_some_and(|ship| {
        ship.positions
            .iter()
            .all(|&(x, y)| matches!(record.grid().cell_at(x, y), Some(Cell::Hit | Cell::Sunk)))
    })
}

pub(crate) fn expect_status(game: &Match, expected: &'static [MatchStatus]) -> Result<(), EngineError> {
    if expected.contains(&game.status) {
        Ok(())
    } else {
        Err(EngineError::InvalidStatus {
            match_id: game.id,
            found: game.status,
            expected,
        })
    }
}

fn ensure_distinct(host: &Participant, guest: &Participant) -> Result<(), EngineError> {
    if host.name() == guest.name() {
        return Err(EngineError::SameIdentity {
            name: guest.name().to_string(),
        });
    }
    Ok(())
}
