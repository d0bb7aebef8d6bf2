use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::{DataFile, ForcedOutcomes, GameResult, TeamId};
use crate::error::{OddsError, Result};
use crate::rank::{Ranker, TieBreakPolicy};
use crate::rng::SeasonRng;
use crate::win_prob::{DEFAULT_HOME_ADV, DEFAULT_K, WinModel};

pub const DEFAULT_SIMULATIONS: i64 = 5_000;
pub const DEFAULT_PLAYOFF_SPOTS: usize = 7;
pub const DEFAULT_SCENARIO_LIMIT: usize = 12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimParams {
    pub simulations: i64,
    pub k: f64,
    pub home_adv: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, alias = "sombId", skip_serializing_if = "Option::is_none")]
    pub team_id: Option<TeamId>,
    #[serde(default)]
    pub forced_outcomes: ForcedOutcomes,
    #[serde(default = "default_playoff_spots")]
    pub playoff_spots: usize,
    #[serde(default)]
    pub tie_break: TieBreakPolicy,
    #[serde(default = "default_scenario_limit")]
    pub scenario_limit: usize,
}

fn default_playoff_spots() -> usize {
    DEFAULT_PLAYOFF_SPOTS
}

fn default_scenario_limit() -> usize {
    DEFAULT_SCENARIO_LIMIT
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            simulations: DEFAULT_SIMULATIONS,
            k: DEFAULT_K,
            home_adv: DEFAULT_HOME_ADV,
            seed: None,
            team_id: None,
            forced_outcomes: ForcedOutcomes::new(),
            playoff_spots: DEFAULT_PLAYOFF_SPOTS,
            tie_break: TieBreakPolicy::default(),
            scenario_limit: DEFAULT_SCENARIO_LIMIT,
        }
    }
}

impl SimParams {
    pub fn new(simulations: i64, k: f64, home_adv: f64) -> Self {
        Self {
            simulations,
            k,
            home_adv,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_team(mut self, team_id: impl Into<TeamId>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    /// Copy whose tie-break favours `team_id`, the team an analysis reports on.
    pub fn focused_on(&self, team_id: &str) -> Self {
        let mut params = self.clone();
        params.team_id = Some(team_id.to_string());
        params
    }

    pub fn with_playoff_spots(mut self, spots: usize) -> Self {
        self.playoff_spots = spots;
        self
    }

    pub fn with_forced(mut self, game_id: impl Into<String>, result: GameResult) -> Self {
        self.forced_outcomes.insert(game_id.into(), result);
        self
    }

    pub fn model(&self) -> WinModel {
        WinModel {
            k: self.k,
            home_adv: self.home_adv,
        }
    }

    /// Trial count, never below one.
    pub fn trials(&self) -> usize {
        self.simulations.max(1) as usize
    }

    /// Only non-finite model constants are rejected; a negative `k` is a valid exponent.
    pub fn validate(&self) -> Result<()> {
        if !self.k.is_finite() {
            return Err(OddsError::InvalidParams(format!("k must be finite, got {}", self.k)));
        }
        if !self.home_adv.is_finite() {
            return Err(OddsError::InvalidParams(format!(
                "homeAdv must be finite, got {}",
                self.home_adv
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimResult {
    #[serde(alias = "top7Odds")]
    pub top_odds: BTreeMap<TeamId, f64>,
    pub rank_hist: BTreeMap<TeamId, Vec<f64>>,
    pub win_hist: BTreeMap<TeamId, Vec<f64>>,
}

impl SimResult {
    pub fn odds(&self, team_id: &str) -> f64 {
        self.top_odds.get(team_id).copied().unwrap_or(0.0)
    }
}

struct Fixture {
    home: usize,
    away: usize,
    p_home: f64,
    forced: Option<GameResult>,
}

/// A dataset indexed for repeated trials: unplayed games resolved to team slots with their
/// home-win probability precomputed.
pub(crate) struct SeasonSim<'a> {
    data: &'a DataFile,
    ranker: Ranker<'a>,
    base_wins: Vec<u32>,
    max_wins: Vec<u32>,
    fixtures: Vec<Fixture>,
}

impl<'a> SeasonSim<'a> {
    pub(crate) fn new(data: &'a DataFile, params: &SimParams) -> Result<Self> {
        params.validate()?;

        let index: HashMap<&str, usize> = data
            .teams
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.as_str(), i))
            .collect();
        let slot = |game_id: &str, team: &str| {
            index
                .get(team)
                .copied()
                .ok_or_else(|| OddsError::UnknownTeam {
                    game: game_id.to_string(),
                    team: team.to_string(),
                })
        };

        let model = params.model();
        let mut remaining = vec![0u32; data.teams.len()];
        let mut fixtures = Vec::new();
        let mut matched_forced = 0usize;
        for game in data.remaining_games() {
            let home = slot(&game.id, &game.home)?;
            let away = slot(&game.id, &game.away)?;
            remaining[home] += 1;
            remaining[away] += 1;
            let forced = params.forced_outcomes.get(&game.id).copied();
            if forced.is_some() {
                matched_forced += 1;
            }
            fixtures.push(Fixture {
                home,
                away,
                p_home: model.home_win_prob(&data.teams[home], &data.teams[away]),
                forced,
            });
        }
        let ignored = params.forced_outcomes.len() - matched_forced;
        if ignored > 0 {
            debug!(ignored, "forced outcomes without a matching unplayed game");
        }

        let base_wins: Vec<u32> = data.teams.iter().map(|t| t.wins).collect();
        let max_wins = base_wins
            .iter()
            .zip(&remaining)
            .map(|(w, r)| w + r)
            .collect();
        let total_games = data
            .teams
            .iter()
            .zip(&remaining)
            .map(|(t, r)| t.games_played() + r)
            .collect();

        let tie_break = params.tie_break.resolver(params.team_id.as_deref());
        let ranker = Ranker::new(&data.teams, tie_break.as_ref(), Some(total_games));

        Ok(Self {
            data,
            ranker,
            base_wins,
            max_wins,
            fixtures,
        })
    }

    pub(crate) fn team_count(&self) -> usize {
        self.base_wins.len()
    }

    pub(crate) fn team_index(&self, team_id: &str) -> Option<usize> {
        self.data.teams.iter().position(|t| t.id == team_id)
    }

    pub(crate) fn base_wins(&self, idx: usize) -> u32 {
        self.base_wins[idx]
    }

    /// Resolves every unplayed game once, in dataset order. Forced games draw no variate.
    pub(crate) fn play_trial(&self, rng: &mut SeasonRng, wins: &mut Vec<u32>) {
        wins.clear();
        wins.extend_from_slice(&self.base_wins);
        for fixture in &self.fixtures {
            let result = fixture.forced.unwrap_or_else(|| {
                if rng.uniform() < fixture.p_home {
                    GameResult::Home
                } else {
                    GameResult::Away
                }
            });
            let winner = match result {
                GameResult::Home => fixture.home,
                GameResult::Away => fixture.away,
            };
            wins[winner] += 1;
        }
    }

    pub(crate) fn rank_into(&self, wins: &[u32], order: &mut Vec<usize>) {
        self.ranker.rank_into(wins, order);
    }
}

pub fn simulate_season(data: &DataFile, params: &SimParams) -> Result<SimResult> {
    let sim = SeasonSim::new(data, params)?;
    let trials = params.trials();
    let n = sim.team_count();
    let mut rng = SeasonRng::from_option(params.seed);

    let mut rank_counts = vec![vec![0u64; n]; n];
    let mut win_counts: Vec<Vec<u64>> = sim
        .max_wins
        .iter()
        .map(|&max| vec![0u64; max as usize + 1])
        .collect();
    let mut wins = Vec::with_capacity(n);
    let mut order = Vec::with_capacity(n);

    for _ in 0..trials {
        sim.play_trial(&mut rng, &mut wins);
        sim.rank_into(&wins, &mut order);
        for (pos, &idx) in order.iter().enumerate() {
            rank_counts[idx][pos] += 1;
        }
        for (idx, &total) in wins.iter().enumerate() {
            win_counts[idx][total as usize] += 1;
        }
    }

    let mut result = SimResult {
        top_odds: BTreeMap::new(),
        rank_hist: BTreeMap::new(),
        win_hist: BTreeMap::new(),
    };
    for (idx, team) in data.teams.iter().enumerate() {
        let ranks = normalize(&rank_counts[idx], trials);
        let top = top_n(&ranks, params.playoff_spots);
        result.top_odds.insert(team.id.clone(), top);
        result.rank_hist.insert(team.id.clone(), ranks);
        result
            .win_hist
            .insert(team.id.clone(), normalize(&win_counts[idx], trials));
    }

    debug!(
        trials,
        teams = n,
        remaining = sim.fixtures.len(),
        seed = ?params.seed,
        "season simulated"
    );
    Ok(result)
}

pub(crate) fn normalize(counts: &[u64], total: usize) -> Vec<f64> {
    counts
        .iter()
        .map(|&count| count as f64 / total as f64)
        .collect()
}

/// Sum of the first `n` finishing-position probabilities.
pub fn top_n(rank_probs: &[f64], n: usize) -> f64 {
    rank_probs.iter().take(n).sum()
}
