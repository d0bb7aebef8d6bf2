use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::best_worst::MAX_SCENARIO_GAMES;
use crate::dataset::{DataFile, TeamId, find_team_id};
use crate::rank::TieBreakPolicy;
use crate::simulate::{DEFAULT_PLAYOFF_SPOTS, DEFAULT_SCENARIO_LIMIT, SimParams};
use crate::win_prob::{DEFAULT_HOME_ADV, DEFAULT_K};

pub const DEFAULT_CONFIG_PATH: &str = "league_odds.toml";
const BATCH_SIMULATIONS: i64 = 20_000;
const MAX_SIMULATIONS: i64 = 1_000_000;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub team: TeamConfig,
    pub paths: PathsConfig,
    pub tie_break: TieBreakConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub simulations: i64,
    pub k: f64,
    pub home_adv: f64,
    pub playoff_spots: usize,
    pub seed: Option<u64>,
    pub scenario_limit: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            simulations: BATCH_SIMULATIONS,
            k: DEFAULT_K,
            home_adv: DEFAULT_HOME_ADV,
            playoff_spots: DEFAULT_PLAYOFF_SPOTS,
            seed: None,
            scenario_limit: DEFAULT_SCENARIO_LIMIT,
        }
    }
}

/// How the team of interest is located in the dataset: explicit id, else abbreviation,
/// else a fragment of its name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TeamConfig {
    pub id: Option<TeamId>,
    pub abbr: String,
    pub name_hint: Option<String>,
}

impl Default for TeamConfig {
    fn default() -> Self {
        Self {
            id: None,
            abbr: "SOMB".to_string(),
            name_hint: Some("boulogne".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub dataset: PathBuf,
    pub odds_cache: PathBuf,
    pub team_map: PathBuf,
    /// Extra copy of the cache under the old key names, when set.
    pub legacy_odds: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            dataset: PathBuf::from("data/poule-b.json"),
            odds_cache: PathBuf::from("data/odds.json"),
            team_map: PathBuf::from("data/teams-map.json"),
            legacy_odds: None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TieBreakKind {
    #[default]
    FavorTeam,
    #[serde(alias = "head_to_head")]
    HeadToHead,
}

/// `[tie_break]` section. Opponent lists only apply to the head-to-head policy.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TieBreakConfig {
    pub policy: TieBreakKind,
    #[serde(alias = "winsAgainst")]
    pub wins_against: Vec<TeamId>,
    #[serde(alias = "losesAgainst")]
    pub loses_against: Vec<TeamId>,
}

impl TieBreakConfig {
    pub fn policy(&self) -> TieBreakPolicy {
        match self.policy {
            TieBreakKind::FavorTeam => {
                if !self.wins_against.is_empty() || !self.loses_against.is_empty() {
                    warn!("tie_break opponent lists are ignored by the favorTeam policy");
                }
                TieBreakPolicy::FavorTeam
            }
            TieBreakKind::HeadToHead => TieBreakPolicy::HeadToHead {
                wins_against: self.wins_against.clone(),
                loses_against: self.loses_against.clone(),
            },
        }
    }
}

impl Config {
    /// Reads the TOML file (defaults when it does not exist), then applies `ODDS_*`
    /// environment overrides.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed reading config {}", path.display()))?;
            toml::from_str::<Config>(&raw)
                .with_context(|| format!("invalid config {}", path.display()))?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Config::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let raw = toml::to_string_pretty(self).context("serialize config")?;
        fs::write(path, raw).with_context(|| format!("write config {}", path.display()))?;
        Ok(())
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let sim = &mut self.simulation;
        if let Some(v) = parse_var::<i64>(&lookup, "ODDS_SIMULATIONS") {
            sim.simulations = v.clamp(1, MAX_SIMULATIONS);
        }
        if let Some(v) = parse_var::<f64>(&lookup, "ODDS_K") {
            sim.k = v;
        }
        if let Some(v) = parse_var::<f64>(&lookup, "ODDS_HOME_ADV") {
            sim.home_adv = v;
        }
        if let Some(v) = parse_var::<usize>(&lookup, "ODDS_PLAYOFF_SPOTS") {
            sim.playoff_spots = v.max(1);
        }
        if let Some(v) = parse_var::<u64>(&lookup, "ODDS_SEED") {
            sim.seed = Some(v);
        }
        if let Some(v) = parse_var::<usize>(&lookup, "ODDS_SCENARIO_LIMIT") {
            sim.scenario_limit = v.min(MAX_SCENARIO_GAMES);
        }
        if let Some(v) = lookup("ODDS_DATA_PATH").filter(|v| !v.trim().is_empty()) {
            self.paths.dataset = PathBuf::from(v.trim());
        }
        if let Some(v) = lookup("ODDS_CACHE_PATH").filter(|v| !v.trim().is_empty()) {
            self.paths.odds_cache = PathBuf::from(v.trim());
        }
    }

    pub fn sim_params(&self) -> SimParams {
        let sim = &self.simulation;
        SimParams {
            simulations: sim.simulations,
            k: sim.k,
            home_adv: sim.home_adv,
            seed: sim.seed,
            team_id: self.team.id.clone(),
            forced_outcomes: Default::default(),
            playoff_spots: sim.playoff_spots,
            tie_break: self.tie_break.policy(),
            scenario_limit: sim.scenario_limit,
        }
    }

    pub fn team_of_interest(&self, data: &DataFile) -> Option<TeamId> {
        if let Some(id) = self.team.id.as_deref() {
            if data.team(id).is_some() {
                return Some(id.to_string());
            }
            warn!(team = id, "configured team id not in dataset, falling back to lookup");
        }
        find_team_id(data, &self.team.abbr, self.team.name_hint.as_deref())
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|val| val.trim().parse::<T>().ok())
}
