//! Match statistics and per-identity history, read from the player records.

use serde::{Deserialize, Serialize};

use crate::common::EngineError;
use crate::domain::{Match, MatchId, MatchStatus};
use crate::game::Engine;
use crate::store::Tally;

/// Statistics over every finished match.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchOverview {
    /// Distinct human identities that ever took a side.
    pub total_players: usize,
    pub finished: usize,
    pub human_vs_human: usize,
    pub human_vs_ai: usize,
    /// Share of finished human vs AI matches the human won, in `[0, 1]`.
    pub human_win_rate_vs_ai: f64,
    pub average_shots: f64,
}

/// How a match ended for one identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchOutcome {
    Won,
    Lost,
    /// Still running, or canceled.
    Undecided,
}

/// One line of an identity's match history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: MatchId,
    /// `None` while nobody has joined.
    pub opponent: Option<String>,
    pub status: MatchStatus,
    pub outcome: MatchOutcome,
}

/// Record of one identity across all its matches.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    pub tally: Tally,
    pub win_rate: f64,
    /// Finished matches the identity took part in.
    pub games_played: usize,
}

fn human_won(game: &Match) -> bool {
    game.sides()
        .find(|s| s.participant.ai_kind().is_none())
        .is_some_and(|human| game.winner.as_deref() == Some(human.name()))
}

fn summarize(game: &Match, name: &str) -> MatchSummary {
    let outcome = match (game.status, game.winner.as_deref()) {
        (MatchStatus::Finished, Some(w)) if w == name => MatchOutcome::Won,
        (MatchStatus::Finished, Some(_)) => MatchOutcome::Lost,
        _ => MatchOutcome::Undecided,
    };
    MatchSummary {
        match_id: game.id,
        opponent: game.opponent_of(name).map(|s| s.name().to_string()),
        status: game.status,
        outcome,
    }
}

impl Engine {
    pub fn overview(&self) -> Result<MatchOverview, EngineError> {
        let finished = self.records().finished_matches()?;
        let mut human_vs_human = 0;
        let mut human_vs_ai = 0;
        let mut human_wins_vs_ai = 0;
        let mut shots = 0u64;
        for game in finished.iter() {
            let ai_sides = game.sides().filter(|s| s.participant.ai_kind().is_some()).count();
            match ai_sides {
                0 => human_vs_human += 1,
                1 => {
                    human_vs_ai += 1;
                    if human_won(game) {
                        human_wins_vs_ai += 1;
                    }
                }
                _ => {}
            }
            shots += u64::from(game.total_shots());
        }
        let average_shots = if finished.is_empty() {
            0.0
        } else {
            shots as f64 / finished.len() as f64
        };
        let human_win_rate_vs_ai = if human_vs_ai == 0 {
            0.0
        } else {
            human_wins_vs_ai as f64 / human_vs_ai as f64
        };
        Ok(MatchOverview {
            total_players: self.records().player_count()?,
            finished: finished.len(),
            human_vs_human,
            human_vs_ai,
            human_win_rate_vs_ai,
            average_shots,
        })
    }

    /// Every match `name` played, newest first.
    pub fn match_history(&self, name: &str) -> Result<Vec<MatchSummary>, EngineError> {
        Ok(self
            .records()
            .matches_of(name)?
            .iter()
            .map(|game| summarize(game, name))
            .collect())
    }

    pub fn player_stats(&self, name: &str) -> Result<PlayerStats, EngineError> {
        let tally = self.records().tally(name)?;
        let games_played = self
            .records()
            .matches_of(name)?
            .iter()
            .filter(|g| g.status == MatchStatus::Finished)
            .count();
        Ok(PlayerStats {
            tally,
            win_rate: tally.win_rate(),
            games_played,
        })
    }
}
