//! Match, move and shot-report records shared with the surrounding system.

use serde::{Deserialize, Serialize};

use crate::common::ShotClass;
use crate::grid::Cell;
use crate::player::AiKind;

pub type MatchId = u64;
pub type MoveId = u64;

/// Who controls a side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    Human { name: String },
    Ai { name: String, kind: AiKind },
}

impl Participant {
    pub fn human(name: impl Into<String>) -> Self {
        Participant::Human { name: name.into() }
    }

    pub fn ai(name: impl Into<String>, kind: AiKind) -> Self {
        Participant::Ai {
            name: name.into(),
            kind,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Participant::Human { name } | Participant::Ai { name, .. } => name,
        }
    }

    pub fn ai_kind(&self) -> Option<AiKind> {
        match self {
            Participant::Ai { kind, .. } => Some(*kind),
            Participant::Human { .. } => None,
        }
    }
}

/// One side of a match with its per-match counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Side {
    pub participant: Participant,
    pub shots: u32,
    pub ready: bool,
}

impl Side {
    pub fn new(participant: Participant) -> Self {
        Self {
            participant,
            shots: 0,
            ready: false,
        }
    }

    pub fn name(&self) -> &str {
        self.participant.name()
    }
}

/// Lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Pending,
    Active,
    Setup,
    Battle,
    Finished,
    Canceled,
}

/// A single match between a host and (eventually) a guest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub host: Side,
    pub guest: Option<Side>,
    pub status: MatchStatus,
    /// Name of the side allowed to fire next.
    pub current_turn: Option<String>,
    pub winner: Option<String>,
}

impl Match {
    pub fn new(id: MatchId, host: Participant, guest: Option<Participant>) -> Self {
        let status = if guest.is_some() {
            MatchStatus::Active
        } else {
            MatchStatus::Pending
        };
        Self {
            id,
            host: Side::new(host),
            guest: guest.map(Side::new),
            status,
            current_turn: None,
            winner: None,
        }
    }

    pub fn sides(&self) -> impl Iterator<Item = &Side> {
        core::iter::once(&self.host).chain(self.guest.iter())
    }

    pub fn side(&self, name: &str) -> Option<&Side> {
        self.sides().find(|s| s.name() == name)
    }

    pub fn side_mut(&mut self, name: &str) -> Option<&mut Side> {
        if self.host.name() == name {
            return Some(&mut self.host);
        }
        self.guest.as_mut().filter(|g| g.name() == name)
    }

    /// The side facing `name`, if both sides are bound.
    pub fn opponent_of(&self, name: &str) -> Option<&Side> {
        let guest = self.guest.as_ref()?;
        if self.host.name() == name {
            Some(guest)
        } else if guest.name() == name {
            Some(&self.host)
        } else {
            None
        }
    }

    pub fn has_ai(&self) -> bool {
        self.sides().any(|s| s.participant.ai_kind().is_some())
    }

    pub fn both_ready(&self) -> bool {
        self.host.ready && self.guest.as_ref().is_some_and(|g| g.ready)
    }

    pub fn total_shots(&self) -> u32 {
        self.sides().map(|s| s.shots).sum()
    }
}

/// One recorded shot in a match's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Move {
    /// Assigned by the store on append; strictly increasing in shot order.
    pub id: MoveId,
    pub match_id: MatchId,
    pub attacker: String,
    pub target: String,
    pub x: usize,
    pub y: usize,
    pub prev_cell: Cell,
    pub result: ShotClass,
    pub sunk_ship: Option<String>,
    /// Whose turn it was when the shot was taken.
    pub turn: Option<String>,
    pub reverted: bool,
}

/// A ship that went down, with every cell it covered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SunkShip {
    pub name: String,
    pub cells: Vec<(usize, usize)>,
}

/// Outcome of a resolved shot, as handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShotReport {
    pub attacker: String,
    pub target: String,
    pub x: usize,
    pub y: usize,
    pub result: ShotClass,
    pub sunk: Option<SunkShip>,
    pub winner: Option<String>,
}

impl ShotReport {
    pub fn out_of_bounds(attacker: &str, target: &str, x: usize, y: usize) -> Self {
        Self {
            attacker: attacker.to_string(),
            target: target.to_string(),
            x,
            y,
            result: ShotClass::OutOfBounds,
            sunk: None,
            winner: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opponent_lookup_needs_both_sides() {
        let mut game = Match::new(1, Participant::human("ann"), None);
        assert_eq!(game.status, MatchStatus::Pending);
        assert!(game.opponent_of("ann").is_none());
        game.guest = Some(Side::new(Participant::ai("bot", AiKind::DensityWeighted)));
        assert_eq!(game.opponent_of("ann").map(Side::name), Some("bot"));
        assert_eq!(game.opponent_of("bot").map(Side::name), Some("ann"));
        assert!(game.opponent_of("zed").is_none());
        assert!(game.has_ai());
    }

    #[test]
    fn side_mut_finds_guest() {
        let mut game = Match::new(
            2,
            Participant::human("ann"),
            Some(Participant::human("ben")),
        );
        assert_eq!(game.status, MatchStatus::Active);
        game.side_mut("ben").unwrap().shots += 2;
        assert_eq!(game.total_shots(), 2);
        assert!(game.side_mut("zed").is_none());
    }
}
