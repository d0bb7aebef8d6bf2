use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::dataset::{DataFile, TeamId};
use crate::matchday::{MatchdayImpact, build_matchday_impact};
use crate::simulate::{SimParams, SimResult, simulate_season};
use crate::win_table::{WinTable, build_win_table};

/// Precomputed odds for one team of interest. Valid while the dataset fingerprint and the
/// model parameters match. Written with camelCase keys (`topOdds`, `teamId`, `winTable`,
/// `matchdayImpact`); the `top7Odds`/`somb*` names are read as aliases and written only by
/// [`save_legacy_odds`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OddsCache {
    #[serde(flatten)]
    pub result: SimResult,
    pub updated: String,
    pub simulations: i64,
    pub k: f64,
    pub home_adv: f64,
    #[serde(default = "default_playoff_spots")]
    pub playoff_spots: usize,
    #[serde(alias = "sombId")]
    pub team_id: TeamId,
    #[serde(default)]
    pub data_fingerprint: String,
    #[serde(default, alias = "sombWinTable", skip_serializing_if = "Option::is_none")]
    pub win_table: Option<WinTable>,
    #[serde(
        default,
        alias = "sombMatchdayImpact",
        skip_serializing_if = "Option::is_none"
    )]
    pub matchday_impact: Option<MatchdayImpact>,
}

fn default_playoff_spots() -> usize {
    crate::simulate::DEFAULT_PLAYOFF_SPOTS
}

impl OddsCache {
    pub fn is_valid_for(&self, data: &DataFile, team_id: &str, params: &SimParams) -> bool {
        self.team_id == team_id
            && self.playoff_spots == params.playoff_spots
            && self.k == params.k
            && self.home_adv == params.home_adv
            && (self.data_fingerprint.is_empty()
                || self.data_fingerprint == data_fingerprint(data))
    }
}

/// SHA-256 over the dataset's JSON form.
pub fn data_fingerprint(data: &DataFile) -> String {
    let json = serde_json::to_vec(data).unwrap_or_default();
    let digest = Sha256::digest(&json);
    digest.iter().map(|b| format!("{b:02x}")).collect()
}

/// Batch job: season odds plus the team's win table and next-round impact.
pub fn recompute_odds(data: &DataFile, team_id: &str, params: &SimParams) -> Result<OddsCache> {
    let params = params.focused_on(team_id);

    let result = simulate_season(data, &params).context("season simulation failed")?;
    let win_table = build_win_table(data, team_id, &params).context("win table failed")?;
    let matchday_impact =
        build_matchday_impact(data, team_id, &params).context("matchday impact failed")?;

    info!(
        team = team_id,
        simulations = params.trials(),
        odds = result.odds(team_id),
        "odds recomputed"
    );
    Ok(OddsCache {
        result,
        updated: Utc::now().to_rfc3339(),
        simulations: params.simulations,
        k: params.k,
        home_adv: params.home_adv,
        playoff_spots: params.playoff_spots,
        team_id: team_id.to_string(),
        data_fingerprint: data_fingerprint(data),
        win_table: Some(win_table),
        matchday_impact,
    })
}

/// Missing, empty or unparseable cache files read as `None`.
pub fn load_odds_cache(path: &Path) -> Option<OddsCache> {
    let raw = fs::read_to_string(path).ok()?;
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match serde_json::from_str::<OddsCache>(raw) {
        Ok(cache) => Some(cache),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "ignoring unreadable odds cache");
            None
        }
    }
}

pub fn save_odds_cache(path: &Path, cache: &OddsCache) -> Result<()> {
    let json = serde_json::to_string_pretty(cache).context("serialize odds cache")?;
    write_atomic(path, &json)
}

/// Cache under the key names of the first `odds.json` consumers (`top7Odds`, `sombId`,
/// `sombWinTable`, `sombMatchdayImpact`). [`load_odds_cache`] reads it back through aliases.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LegacyOddsFile<'a> {
    #[serde(rename = "top7Odds")]
    top_odds: &'a BTreeMap<TeamId, f64>,
    rank_hist: &'a BTreeMap<TeamId, Vec<f64>>,
    win_hist: &'a BTreeMap<TeamId, Vec<f64>>,
    updated: &'a str,
    simulations: i64,
    k: f64,
    home_adv: f64,
    playoff_spots: usize,
    #[serde(rename = "sombId")]
    team_id: &'a str,
    data_fingerprint: &'a str,
    #[serde(rename = "sombWinTable", skip_serializing_if = "Option::is_none")]
    win_table: Option<&'a WinTable>,
    #[serde(rename = "sombMatchdayImpact", skip_serializing_if = "Option::is_none")]
    matchday_impact: Option<&'a MatchdayImpact>,
}

pub fn legacy_odds_json(cache: &OddsCache) -> Result<String> {
    let legacy = LegacyOddsFile {
        top_odds: &cache.result.top_odds,
        rank_hist: &cache.result.rank_hist,
        win_hist: &cache.result.win_hist,
        updated: &cache.updated,
        simulations: cache.simulations,
        k: cache.k,
        home_adv: cache.home_adv,
        playoff_spots: cache.playoff_spots,
        team_id: &cache.team_id,
        data_fingerprint: &cache.data_fingerprint,
        win_table: cache.win_table.as_ref(),
        matchday_impact: cache.matchday_impact.as_ref(),
    };
    serde_json::to_string_pretty(&legacy).context("serialize legacy odds")
}

pub fn save_legacy_odds(path: &Path, cache: &OddsCache) -> Result<()> {
    write_atomic(path, &legacy_odds_json(cache)?)
}

fn write_atomic(path: &Path, json: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create cache dir {}", parent.display()))?;
        }
    }
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}
