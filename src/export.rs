use std::path::Path;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Workbook, Worksheet};

use crate::dataset::DataFile;
use crate::format::{format_delta, format_pct, format_top_odds};
use crate::matchday::MatchdayImpactGame;
use crate::odds_cache::OddsCache;
use crate::win_table::WinTableRow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportReport {
    pub teams: usize,
    pub win_table_rows: usize,
    pub matchday_games: usize,
}

/// Writes the cached odds as a workbook with Odds, FinishDist, WinTable and Matchday sheets.
pub fn export_workbook(path: &Path, data: &DataFile, cache: &OddsCache) -> Result<ExportReport> {
    let odds_rows = odds_rows(data, cache);
    let finish_rows = finish_rows(data, cache);

    let mut table_rows = Vec::new();
    if let Some(table) = &cache.win_table {
        let mut header = vec![
            "RemainingWins".to_string(),
            "RemainingLosses".to_string(),
            "Record".to_string(),
            "WinPct".to_string(),
            "Share".to_string(),
            "NoPlayoffs".to_string(),
        ];
        let positions = table.rows.first().map(|r| r.rank_probs.len()).unwrap_or(0);
        header.extend((1..=positions).map(|pos| format!("P{pos}")));
        table_rows.push(header);
        table_rows.extend(table.rows.iter().map(win_table_row));
    }

    let mut matchday_rows = Vec::new();
    if let Some(impact) = &cache.matchday_impact {
        matchday_rows.push(
            [
                "Round", "Game", "Home", "Away", "HomeWin", "AwayWin", "Better", "Delta",
            ]
            .map(String::from)
            .to_vec(),
        );
        matchday_rows.extend(
            impact
                .games
                .iter()
                .map(|row| matchday_row(data, &impact.round_date, row)),
        );
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Odds")?;
        write_rows(sheet, &odds_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("FinishDist")?;
        write_rows(sheet, &finish_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("WinTable")?;
        write_rows(sheet, &table_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Matchday")?;
        write_rows(sheet, &matchday_rows)?;
    }

    workbook
        .save(path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;

    Ok(ExportReport {
        teams: odds_rows.len().saturating_sub(1),
        win_table_rows: table_rows.len().saturating_sub(1),
        matchday_games: matchday_rows.len().saturating_sub(1),
    })
}

fn odds_rows(data: &DataFile, cache: &OddsCache) -> Vec<Vec<String>> {
    let mut teams: Vec<_> = data.teams.iter().collect();
    teams.sort_by(|a, b| {
        cache
            .result
            .odds(&b.id)
            .total_cmp(&cache.result.odds(&a.id))
            .then_with(|| a.name.cmp(&b.name))
    });

    let mut rows = vec![
        ["Team", "Abbr", "Wins", "Losses", "TopOdds"]
            .map(String::from)
            .to_vec(),
    ];
    rows.extend(teams.into_iter().map(|team| {
        vec![
            team.name.clone(),
            team.abbr.clone(),
            team.wins.to_string(),
            team.losses.to_string(),
            format_top_odds(cache.result.odds(&team.id), 1),
        ]
    }));
    rows
}

fn finish_rows(data: &DataFile, cache: &OddsCache) -> Vec<Vec<String>> {
    let mut header = vec!["Team".to_string()];
    header.extend((1..=data.teams.len()).map(|pos| format!("P{pos}")));
    let mut rows = vec![header];
    for team in &data.teams {
        let mut row = vec![team.name.clone()];
        if let Some(hist) = cache.result.rank_hist.get(&team.id) {
            row.extend(hist.iter().map(|p| format_pct(*p)));
        }
        rows.push(row);
    }
    rows
}

fn win_table_row(row: &WinTableRow) -> Vec<String> {
    let mut out = vec![
        row.remaining_wins.to_string(),
        row.remaining_losses.to_string(),
        format!("{}-{}", row.wins, row.losses),
        format!("{:.3}", row.win_pct),
        format_pct(row.share),
        format_pct(row.no_playoffs),
    ];
    out.extend(row.rank_probs.iter().map(|p| format_pct(*p)));
    out
}

fn matchday_row(data: &DataFile, round_date: &str, row: &MatchdayImpactGame) -> Vec<String> {
    vec![
        round_date.to_string(),
        row.game.id.clone(),
        data.team_name(&row.game.home).to_string(),
        data.team_name(&row.game.away).to_string(),
        format_top_odds(row.home_win_odds, 1),
        format_top_odds(row.away_win_odds, 1),
        data.team_name(row.better.winner(&row.game)).to_string(),
        format_delta(row.delta),
    ]
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::odds_cache::recompute_odds;
    use crate::simulate::SimParams;

    #[test]
    fn workbook_is_written_with_all_sheets() {
        let data = DataFile::sample();
        let params = SimParams::new(300, 2.0, 0.12).with_seed(5);
        let cache = recompute_odds(&data, "SOMB", &params).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("odds.xlsx");
        let report = export_workbook(&path, &data, &cache).unwrap();

        assert!(path.exists());
        assert_eq!(report.teams, data.teams.len());
        assert_eq!(report.matchday_games, 3);
        assert!(report.win_table_rows >= 1);
    }

    #[test]
    fn odds_sheet_is_sorted_by_odds() {
        let data = DataFile::sample();
        let params = SimParams::new(300, 2.0, 0.12).with_seed(5);
        let cache = recompute_odds(&data, "SOMB", &params).unwrap();
        let rows = odds_rows(&data, &cache);
        assert_eq!(rows[0][0], "Team");
        let odds: Vec<f64> = rows[1..]
            .iter()
            .map(|row| {
                let team = data.teams.iter().find(|t| t.name == row[0]).unwrap();
                cache.result.odds(&team.id)
            })
            .collect();
        assert!(odds.windows(2).all(|w| w[0] >= w[1]));
    }
}
