use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::best_worst::{BestWorstResult, best_worst_next_round};
use crate::dataset::{DataFile, ForcedOutcomes, TeamId};
use crate::error::Result;
use crate::odds_cache::OddsCache;
use crate::simulate::{SimParams, simulate_season};

/// Request body of the odds endpoint; absent fields fall back to the serving defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsRequest {
    #[serde(default)]
    pub simulations: Option<i64>,
    #[serde(default)]
    pub k: Option<f64>,
    #[serde(default)]
    pub home_adv: Option<f64>,
    #[serde(default)]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub include_best_worst: bool,
    #[serde(default)]
    pub forced_outcomes: ForcedOutcomes,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsResponse {
    pub top_odds: BTreeMap<TeamId, f64>,
    pub rank_hist: BTreeMap<TeamId, Vec<f64>>,
    pub win_hist: BTreeMap<TeamId, Vec<f64>>,
    pub best_worst: Option<BestWorstResult>,
    /// True when the answer came from the precomputed cache.
    #[serde(default)]
    pub cached: bool,
}

/// Answers an odds request from `cache` when nothing is forced, no best/worst search is
/// asked for and the cache matches the dataset and model; otherwise runs the engine.
pub fn answer_odds_request(
    data: &DataFile,
    cache: Option<&OddsCache>,
    request: &OddsRequest,
    defaults: &SimParams,
    default_team: &str,
) -> Result<OddsResponse> {
    let team_id = request.team_id.as_deref().unwrap_or(default_team);
    let mut params = defaults.clone();
    params.team_id = Some(team_id.to_string());
    if let Some(simulations) = request.simulations {
        params.simulations = simulations;
    }
    if let Some(k) = request.k {
        params.k = k;
    }
    if let Some(home_adv) = request.home_adv {
        params.home_adv = home_adv;
    }
    params.forced_outcomes = request.forced_outcomes.clone();

    let reusable = cache.filter(|cache| {
        request.forced_outcomes.is_empty()
            && !request.include_best_worst
            && cache.is_valid_for(data, team_id, &params)
    });
    if let Some(cache) = reusable {
        debug!(team = team_id, "serving odds from cache");
        return Ok(OddsResponse {
            top_odds: cache.result.top_odds.clone(),
            rank_hist: cache.result.rank_hist.clone(),
            win_hist: cache.result.win_hist.clone(),
            best_worst: None,
            cached: true,
        });
    }

    let result = simulate_season(data, &params)?;
    let best_worst = if request.include_best_worst {
        best_worst_next_round(data, team_id, &params)?
    } else {
        None
    };
    Ok(OddsResponse {
        top_odds: result.top_odds,
        rank_hist: result.rank_hist,
        win_hist: result.win_hist,
        best_worst,
        cached: false,
    })
}
