//! Common types: shot classification and the engine error taxonomy.

use core::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{MatchId, MatchStatus};

/// Classification of a single shot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotClass {
    /// Shot landed on open water.
    Miss,
    /// Shot hit a ship that is still afloat.
    Hit,
    /// Shot hit the last intact segment of a ship.
    Sunk,
    /// Cell was already hit, missed or sunk.
    AlreadyHit,
    /// Coordinate is off the board; nothing changed.
    OutOfBounds,
}

impl ShotClass {
    /// Whether the attacker keeps the turn after this result.
    pub fn keeps_turn(self) -> bool {
        !matches!(self, ShotClass::Miss)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ShotClass::Miss => "miss",
            ShotClass::Hit => "hit",
            ShotClass::Sunk => "sunk",
            ShotClass::AlreadyHit => "already_hit",
            ShotClass::OutOfBounds => "out_of_bounds",
        }
    }
}

impl fmt::Display for ShotClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reasons the Placement Engine refuses a ship.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlacementError {
    #[error("{ship} is already placed")]
    AlreadyPlaced { ship: String },
    #[error("{ship} cannot be placed at ({x}, {y})")]
    InvalidPlacement { ship: String, x: usize, y: usize },
    #[error("{0} is not in the fleet catalog")]
    UnknownShip(String),
    #[error("no legal position left for {ship}")]
    NoRoom { ship: String },
}

/// Coarse category of an [`EngineError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The actor asked for something illegal; report it back and carry on.
    User,
    /// Setup state is missing or inconsistent; the operation changed nothing.
    Integrity,
    /// A collaborator (store, record keeper) failed.
    Store,
}

/// Errors returned by [`Engine`](crate::Engine) operations.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Placement(#[from] PlacementError),
    #[error("it is not {attacker}'s turn")]
    NotYourTurn { attacker: String },
    #[error("match {match_id} is {found:?}, expected one of {expected:?}")]
    InvalidStatus {
        match_id: MatchId,
        found: MatchStatus,
        expected: &'static [MatchStatus],
    },
    #[error("match {match_id} already has two sides")]
    SideAlreadyBound { match_id: MatchId },
    #[error("{name} cannot play against itself")]
    SameIdentity { name: String },
    #[error("{side} has not placed the whole fleet")]
    FleetIncomplete { side: String },
    #[error("no placement record for {side} in match {match_id}")]
    NoSuchPlacement { match_id: MatchId, side: String },
    #[error("no ship of {side} covers ({x}, {y}) in match {match_id}")]
    ShipComponentMissing {
        match_id: MatchId,
        side: String,
        x: usize,
        y: usize,
    },
    #[error("match {0} does not exist")]
    UnknownMatch(MatchId),
    #[error("{side} is not part of match {match_id}")]
    UnknownSide { match_id: MatchId, side: String },
    #[error("store failure: {0}")]
    Store(#[from] anyhow::Error),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Placement(_)
            | EngineError::NotYourTurn { .. }
            | EngineError::InvalidStatus { .. }
            | EngineError::SideAlreadyBound { .. }
            | EngineError::SameIdentity { .. }
            | EngineError::FleetIncomplete { .. } => ErrorKind::User,
            EngineError::NoSuchPlacement { .. }
            | EngineError::ShipComponentMissing { .. }
            | EngineError::UnknownMatch(_)
            | EngineError::UnknownSide { .. } => ErrorKind::Integrity,
            EngineError::Store(_) => ErrorKind::Store,
        }
    }

    pub fn is_user_error(&self) -> bool {
        self.kind() == ErrorKind::User
    }
}
