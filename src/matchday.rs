use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{DataFile, Game, GameResult};
use crate::error::Result;
use crate::rounds::next_round;
use crate::simulate::{SimParams, simulate_season};

/// Seed used by the scenario analyses when the caller did not pick one.
pub const DEFAULT_SCENARIO_SEED: u64 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchdayImpactGame {
    pub game: Game,
    pub home_win_odds: f64,
    pub away_win_odds: f64,
    pub better: GameResult,
    pub delta: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchdayImpact {
    pub round_date: String,
    pub games: Vec<MatchdayImpactGame>,
}

/// Odds of `team_id` with each next-round game forced either way. Both branches of a game
/// share one seed so only that game differs between them.
pub fn build_matchday_impact(
    data: &DataFile,
    team_id: &str,
    params: &SimParams,
) -> Result<Option<MatchdayImpact>> {
    params.validate()?;
    let params = &params.focused_on(team_id);
    let Some(round) = next_round(data) else {
        return Ok(None);
    };
    let seed = params.seed.unwrap_or(DEFAULT_SCENARIO_SEED);

    let games = round
        .games
        .par_iter()
        .map(|game| {
            let branch = |result: GameResult| -> Result<f64> {
                let mut forced = params.clone();
                forced.seed = Some(seed);
                forced.forced_outcomes.insert(game.id.clone(), result);
                Ok(simulate_season(data, &forced)?.odds(team_id))
            };
            let home_win_odds = branch(GameResult::Home)?;
            let away_win_odds = branch(GameResult::Away)?;
            Ok(MatchdayImpactGame {
                game: (*game).clone(),
                home_win_odds,
                away_win_odds,
                better: if home_win_odds >= away_win_odds {
                    GameResult::Home
                } else {
                    GameResult::Away
                },
                delta: home_win_odds - away_win_odds,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    info!(
        team = team_id,
        round = %round.round_date,
        games = games.len(),
        "matchday impact computed"
    );
    Ok(Some(MatchdayImpact {
        round_date: round.round_date,
        games,
    }))
}
