use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::dataset::DataFile;
use crate::error::{OddsError, Result};
use crate::rng::SeasonRng;
use crate::simulate::{SeasonSim, SimParams, normalize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinTableRow {
    pub remaining_wins: u32,
    pub remaining_losses: u32,
    pub wins: u32,
    pub losses: u32,
    pub win_pct: f64,
    pub rank_probs: Vec<f64>,
    pub no_playoffs: f64,
    /// Fraction of all trials that landed in this row.
    #[serde(default)]
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinTable {
    pub remaining_games: u32,
    pub rows: Vec<WinTableRow>,
}

/// Finishing-position distribution of `team_id`, conditioned on how many of its own
/// remaining games it wins. `team_id` is the team of interest for tie-breaks.
pub fn build_win_table(data: &DataFile, team_id: &str, params: &SimParams) -> Result<WinTable> {
    let params = &params.focused_on(team_id);
    let sim = SeasonSim::new(data, params)?;
    let team_idx = sim.team_index(team_id).ok_or_else(|| {
        OddsError::InvalidParams(format!("team of interest {team_id} is not in the dataset"))
    })?;
    let team = &data.teams[team_idx];
    let remaining = data.remaining_games().filter(|g| g.involves(team_id)).count() as u32;

    let trials = params.trials();
    let n = sim.team_count();
    let base = sim.base_wins(team_idx);
    let mut rng = SeasonRng::from_option(params.seed);
    let mut rank_counts = vec![vec![0u64; n]; remaining as usize + 1];
    let mut row_totals = vec![0u64; remaining as usize + 1];
    let mut wins = Vec::with_capacity(n);
    let mut order = Vec::with_capacity(n);

    for _ in 0..trials {
        sim.play_trial(&mut rng, &mut wins);
        sim.rank_into(&wins, &mut order);
        let bucket = (wins[team_idx] - base) as usize;
        if let Some(pos) = order.iter().position(|&idx| idx == team_idx) {
            rank_counts[bucket][pos] += 1;
            row_totals[bucket] += 1;
        }
    }

    let rows = rank_counts
        .iter()
        .enumerate()
        .map(|(bucket, counts)| {
            let remaining_wins = bucket as u32;
            let remaining_losses = remaining - remaining_wins;
            let rank_probs = if row_totals[bucket] == 0 {
                vec![0.0; n]
            } else {
                normalize(counts, row_totals[bucket] as usize)
            };
            let no_playoffs = rank_probs.iter().skip(params.playoff_spots).sum();
            WinTableRow {
                remaining_wins,
                remaining_losses,
                wins: team.wins + remaining_wins,
                losses: team.losses + remaining_losses,
                win_pct: if remaining > 0 {
                    remaining_wins as f64 / remaining as f64
                } else {
                    0.0
                },
                rank_probs,
                no_playoffs,
                share: row_totals[bucket] as f64 / trials as f64,
            }
        })
        .collect();

    debug!(team = team_id, remaining, trials, "win table built");
    Ok(WinTable {
        remaining_games: remaining,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rows_cover_zero_through_remaining() {
        let data = DataFile::sample();
        let params = SimParams::new(400, 2.0, 0.12).with_seed(9).with_team("SOMB");
        let table = build_win_table(&data, "SOMB", &params).unwrap();
        assert_eq!(table.remaining_games, 2);
        assert_eq!(table.rows.len(), 3);
        let last = &table.rows[2];
        assert_eq!((last.wins, last.losses), (12, 6));
        assert_eq!(last.win_pct, 1.0);
        let shares: f64 = table.rows.iter().map(|r| r.share).sum();
        assert!((shares - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_bucket_is_all_zero() {
        let data = DataFile::sample();
        let params = SimParams::new(200, 2.0, 0.12)
            .with_seed(4)
            .with_forced("2026-01-20-SOMB-TEAM4", crate::GameResult::Home)
            .with_forced("2026-01-27-TEAM7-SOMB", crate::GameResult::Away);
        let table = build_win_table(&data, "SOMB", &params).unwrap();
        for row in &table.rows[..2] {
            assert!(row.rank_probs.iter().all(|p| *p == 0.0));
            assert_eq!(row.no_playoffs, 0.0);
            assert_eq!(row.share, 0.0);
        }
        let sum: f64 = table.rows[2].rank_probs.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn unknown_team_is_invalid() {
        let data = DataFile::sample();
        let err = build_win_table(&data, "NOPE", &SimParams::default()).unwrap_err();
        assert!(matches!(err, OddsError::InvalidParams(_)));
    }
}
