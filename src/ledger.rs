//! Linear undo/redo over a match's move ledger.
//!
//! The cursor is the `reverted` flag: undo flips the newest live move, redo
//! flips back the oldest reverted one. No move is ever invented here; a
//! fresh shot discards the reverted tail (see [`Engine::resolve_shot`]).

use log::info;
use serde::{Deserialize, Serialize};

use crate::common::{EngineError, ShotClass};
use crate::domain::{MatchId, MatchStatus, Move};
use crate::events::Event;
use crate::game::{can_finish, expect_status, hold, next_turn, Engine};
use crate::grid::Cell;
use crate::placement::PlacementRecord;
use crate::store::MoveOrder;

const NOT_CANCELED: &[MatchStatus] = &[
    MatchStatus::Pending,
    MatchStatus::Active,
    MatchStatus::Setup,
    MatchStatus::Battle,
    MatchStatus::Finished,
];

/// What one undo or redo did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerStep {
    /// The move as stored after the step.
    pub mv: Move,
    pub next_turn: Option<String>,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerOutcome {
    Reverted(LedgerStep),
    Replayed(LedgerStep),
    NothingToUndo,
    NothingToRedo,
}

fn missing_ship(mv: &Move) -> EngineError {
    EngineError::ShipComponentMissing {
        match_id: mv.match_id,
        side: mv.target.clone(),
        x: mv.x,
        y: mv.y,
    }
}

impl Engine {
    /// Revert the most recent live move.
    pub fn undo(&self, match_id: MatchId) -> Result<LedgerOutcome, EngineError> {
        let lock = self.match_lock(match_id);
        let _guard = hold(&lock);
        let mut game = self.load(match_id)?;
        expect_status(&game, NOT_CANCELED)?;
        let live = self.store().query_moves(match_id, Some(false), MoveOrder::NewestFirst)?;
        let Some(mut mv) = live.into_iter().next() else {
            info!("match {}: nothing to undo", match_id);
            return Ok(LedgerOutcome::NothingToUndo);
        };

        let mut record = self.load_placement(match_id, &mv.target)?;
        if let Some(name) = mv.sunk_ship.as_deref() {
            record.mark_afloat(name).ok_or_else(|| missing_ship(&mv))?;
        }
        record.grid_mut().set_cell(mv.x, mv.y, mv.prev_cell);

        let reopens = game.status == MatchStatus::Finished
            && game.winner.as_deref() == Some(mv.attacker.as_str())
            && record.grid().has_ship_body();

        self.store().save_placement(match_id, &mv.target, &record)?;
        mv.reverted = true;
        self.store().update_move(&mv)?;
        if let Some(side) = game.side_mut(&mv.attacker) {
            side.shots = side.shots.saturating_sub(1);
        }
        game.current_turn = Some(mv.attacker.clone());
        if reopens {
            game.status = MatchStatus::Battle;
            game.winner = None;
            self.records().revoke_result(&mv.attacker, &mv.target)?;
            info!("match {} reopened, {}'s win taken back", match_id, mv.attacker);
        }
        self.store().save_match(&game)?;

        info!("match {}: undid move {} ({}, {})", match_id, mv.id, mv.x, mv.y);
        self.notify(Event::MoveReverted {
            match_id,
            move_id: mv.id,
            attacker: mv.attacker.clone(),
            x: mv.x,
            y: mv.y,
        });
        Ok(LedgerOutcome::Reverted(LedgerStep {
            mv,
            next_turn: game.current_turn,
            status: game.status,
        }))
    }

    /// Re-apply the oldest reverted move.
    pub fn redo(&self, match_id: MatchId) -> Result<LedgerOutcome, EngineError> {
        let lock = self.match_lock(match_id);
        let _guard = hold(&lock);
        let mut game = self.load(match_id)?;
        expect_status(&game, NOT_CANCELED)?;
        let pending = self.store().query_moves(match_id, Some(true), MoveOrder::OldestFirst)?;
        let Some(mut mv) = pending.into_iter().next() else {
            info!("match {}: nothing to redo", match_id);
            return Ok(LedgerOutcome::NothingToRedo);
        };

        let mut record = self.load_placement(match_id, &mv.target)?;
        replay(&mut record, &mv)?;

        self.store().save_placement(match_id, &mv.target, &record)?;
        mv.reverted = false;
        self.store().update_move(&mv)?;
        if let Some(side) = game.side_mut(&mv.attacker) {
            side.shots += 1;
        }
        game.current_turn = Some(next_turn(mv.result, &mv.attacker, &mv.target));
        let finishes = can_finish(&game) && !record.grid().has_ship_body();
        if finishes {
            self.finish(&mut game, &mv.attacker, &mv.target)?;
        }
        self.store().save_match(&game)?;

        info!("match {}: redid move {} ({}, {}): {}", match_id, mv.id, mv.x, mv.y, mv.result);
        self.notify(Event::MoveReplayed {
            match_id,
            move_id: mv.id,
            attacker: mv.attacker.clone(),
            x: mv.x,
            y: mv.y,
            result: mv.result,
        });
        if finishes {
            self.notify(Event::MatchFinished {
                match_id,
                winner: mv.attacker.clone(),
                loser: mv.target.clone(),
            });
        }
        Ok(LedgerOutcome::Replayed(LedgerStep {
            mv,
            next_turn: game.current_turn,
            status: game.status,
        }))
    }
}

/// Put the effect of a recorded shot back onto the target's record.
fn replay(record: &mut PlacementRecord, mv: &Move) -> Result<(), EngineError> {
    match mv.result {
        ShotClass::Miss => {
            record.grid_mut().set_cell(mv.x, mv.y, Cell::Miss);
        }
        ShotClass::Hit => {
            record.grid_mut().set_cell(mv.x, mv.y, Cell::Hit);
        }
        ShotClass::Sunk => {
            let name = mv.sunk_ship.as_deref().ok_or_else(|| missing_ship(mv))?;
            record.grid_mut().set_cell(mv.x, mv.y, Cell::Hit);
            record.mark_sunk(name).ok_or_else(|| missing_ship(mv))?;
        }
        ShotClass::AlreadyHit | ShotClass::OutOfBounds => {}
    }
    Ok(())
}
