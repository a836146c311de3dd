use log::debug;
use rand::rngs::SmallRng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

use crate::ai::{best_target, strategic_scores};
use crate::common::EngineError;
use crate::domain::{MatchId, ShotReport};
use crate::events::Event;
use crate::game::Engine;
use crate::placement::PlacementStrategy;

/// The closed set of targeting AIs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "std", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum AiKind {
    /// Random placement, uniformly random open cell each turn.
    UniformRandom,
    /// Mid-and-corner placement, fires at the highest strategic score.
    DensityWeighted,
}

impl AiKind {
    /// Placement strategy this AI uses for its own fleet.
    pub fn placement_strategy(self) -> PlacementStrategy {
        match self {
            AiKind::UniformRandom => PlacementStrategy::Random,
            AiKind::DensityWeighted => PlacementStrategy::AvoidMidAndCorner,
        }
    }
}

/// Result of asking the engine to act for an AI side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AiTurn {
    /// Neither side of the match is an AI.
    NoAiBound,
    /// The side holding the turn is not an AI.
    NotAiTurn,
    /// Every AI side has placed its fleet and is ready.
    Placed,
    Fired(ShotReport),
    /// The opponent board has no open cell left.
    NoTarget,
}

/// Interface implemented by every targeting AI.
pub trait TargetingAi: Send {
    fn kind(&self) -> AiKind;

    /// Identity this AI plays under.
    fn name(&self) -> &str;

    /// Place the whole fleet for this AI's side.
    fn place_ships(&mut self, rng: &mut SmallRng, engine: &Engine, match_id: MatchId) -> Result<(), EngineError> {
        engine.auto_place_ships(match_id, self.name(), self.kind().placement_strategy(), rng)?;
        Ok(())
    }

    /// Pick a cell on `target`'s board and fire at it.
    fn make_shot(
        &mut self,
        rng: &mut SmallRng,
        engine: &Engine,
        match_id: MatchId,
        target: &str,
    ) -> Result<AiTurn, EngineError>;
}

/// Fires at a uniformly random cell that has not been resolved yet.
pub struct UniformRandomAi {
    name: String,
}

impl UniformRandomAi {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TargetingAi for UniformRandomAi {
    fn kind(&self) -> AiKind {
        AiKind::UniformRandom
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn make_shot(
        &mut self,
        rng: &mut SmallRng,
        engine: &Engine,
        match_id: MatchId,
        target: &str,
    ) -> Result<AiTurn, EngineError> {
        let board = engine.board(match_id, target)?;
        let open: Vec<(usize, usize)> = board
            .cells()
            .filter(|(_, _, cell)| !cell.is_resolved())
            .map(|(x, y, _)| (x, y))
            .collect();
        let Some(&(x, y)) = open.choose(rng) else {
            return Ok(AiTurn::NoTarget);
        };
        engine.notify(Event::AiTargeted {
            match_id,
            ai: self.name.clone(),
            x,
            y,
            score: None,
        });
        engine.fire(match_id, &self.name, x, y).map(AiTurn::Fired)
    }
}

/// Blends the cross-match aggregate density with the opponent's own history
/// and fires at the best open cell.
pub struct DensityWeightedAi {
    name: String,
}

impl DensityWeightedAi {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl TargetingAi for DensityWeightedAi {
    fn kind(&self) -> AiKind {
        AiKind::DensityWeighted
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn make_shot(
        &mut self,
        _rng: &mut SmallRng,
        engine: &Engine,
        match_id: MatchId,
        target: &str,
    ) -> Result<AiTurn, EngineError> {
        let board = engine.board(match_id, target)?;
        let aggregate = engine.aggregate_density()?;
        let personal = engine.personal_density(target)?;
        let config = engine.config();
        let scores = strategic_scores(&aggregate, &personal, config.aggregate_weight, config.personal_weight);
        let Some(((x, y), score)) = best_target(&scores, &board) else {
            return Ok(AiTurn::NoTarget);
        };
        debug!("{} scores ({}, {}) at {:.3}", self.name, x, y, score);
        engine.notify(Event::AiTargeted {
            match_id,
            ai: self.name.clone(),
            x,
            y,
            score: Some(score),
        });
        engine.fire(match_id, &self.name, x, y).map(AiTurn::Fired)
    }
}

/// The single place an AI is built from its kind.
pub fn build_ai(kind: AiKind, name: impl Into<String>) -> Box<dyn TargetingAi> {
    match kind {
        AiKind::UniformRandom => Box::new(UniformRandomAi::new(name)),
        AiKind::DensityWeighted => Box::new(DensityWeightedAi::new(name)),
    }
}
