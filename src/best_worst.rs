use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::{DataFile, ForcedOutcomes, Game, GameResult};
use crate::error::{OddsError, Result};
use crate::matchday::DEFAULT_SCENARIO_SEED;
use crate::rounds::next_round;
use crate::simulate::{SimParams, simulate_season};

/// Upper bound on `scenario_limit`; the mask is a `u64`.
pub const MAX_SCENARIO_GAMES: usize = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Scenario {
    pub label: String,
    pub odds: f64,
    pub outcomes: ForcedOutcomes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BestWorstResult {
    pub round_date: String,
    pub scenarios: u64,
    pub best: Scenario,
    pub worst: Scenario,
}

/// Every home/away combination of the next round's undetermined games, simulated with seed
/// `base + mask`, reduced to the scenarios with the highest and lowest odds for `team_id`.
pub fn best_worst_next_round(
    data: &DataFile,
    team_id: &str,
    params: &SimParams,
) -> Result<Option<BestWorstResult>> {
    params.validate()?;
    let params = &params.focused_on(team_id);
    let Some(round) = next_round(data) else {
        return Ok(None);
    };

    let undetermined: Vec<&Game> = round
        .games
        .iter()
        .copied()
        .filter(|game| !params.forced_outcomes.contains_key(&game.id))
        .collect();
    let limit = params.scenario_limit.min(MAX_SCENARIO_GAMES);
    if undetermined.len() > limit {
        return Err(OddsError::TooManyScenarios {
            undetermined: undetermined.len(),
            limit,
        });
    }

    let scenarios = 1u64 << undetermined.len();
    let base_seed = params.seed.unwrap_or(DEFAULT_SCENARIO_SEED);

    let evaluated = (0..scenarios)
        .into_par_iter()
        .map(|mask| {
            let outcomes = scenario_outcomes(&params.forced_outcomes, &undetermined, mask);
            let mut scenario_params = params.clone();
            scenario_params.forced_outcomes = outcomes.clone();
            scenario_params.seed = Some(base_seed.wrapping_add(mask));
            let odds = simulate_season(data, &scenario_params)?.odds(team_id);
            Ok(Scenario {
                label: outcome_label(data, &outcomes, &undetermined),
                odds,
                outcomes,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let mut best: Option<&Scenario> = None;
    let mut worst: Option<&Scenario> = None;
    for scenario in &evaluated {
        if best.is_none_or(|b| scenario.odds > b.odds) {
            best = Some(scenario);
        }
        if worst.is_none_or(|w| scenario.odds < w.odds) {
            worst = Some(scenario);
        }
    }
    let (Some(best), Some(worst)) = (best, worst) else {
        return Ok(None);
    };

    info!(
        team = team_id,
        round = %round.round_date,
        scenarios,
        best = best.odds,
        worst = worst.odds,
        "best/worst search finished"
    );
    Ok(Some(BestWorstResult {
        round_date: round.round_date,
        scenarios,
        best: best.clone(),
        worst: worst.clone(),
    }))
}

/// Bit `i` of `mask` set means undetermined game `i` goes to the home team.
fn scenario_outcomes(base: &ForcedOutcomes, undetermined: &[&Game], mask: u64) -> ForcedOutcomes {
    let mut outcomes = base.clone();
    for (i, game) in undetermined.iter().enumerate() {
        let result = if (mask >> i) & 1 == 1 {
            GameResult::Home
        } else {
            GameResult::Away
        };
        outcomes.insert(game.id.clone(), result);
    }
    outcomes
}

fn outcome_label(data: &DataFile, outcomes: &ForcedOutcomes, undetermined: &[&Game]) -> String {
    let parts: Vec<String> = undetermined
        .iter()
        .filter_map(|game| {
            let result = outcomes.get(&game.id)?;
            Some(format!(
                "{} over {}",
                data.team_name(result.winner(game)),
                data.team_name(result.loser(game))
            ))
        })
        .collect();
    if parts.is_empty() {
        "All forced".to_string()
    } else {
        parts.join("; ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_bits_map_to_games_in_order() {
        let data = DataFile::sample();
        let games: Vec<&Game> = data.games.iter().take(2).collect();
        let outcomes = scenario_outcomes(&ForcedOutcomes::new(), &games, 0b01);
        assert_eq!(outcomes[&games[0].id], GameResult::Home);
        assert_eq!(outcomes[&games[1].id], GameResult::Away);
    }

    #[test]
    fn label_names_winner_first() {
        let data = DataFile::sample();
        let games: Vec<&Game> = data.games.iter().take(1).collect();
        let outcomes = scenario_outcomes(&ForcedOutcomes::new(), &games, 0);
        assert_eq!(outcome_label(&data, &outcomes, &games), "Team 4 over SOM Boulogne");
        assert_eq!(outcome_label(&data, &outcomes, &[]), "All forced");
    }
}
