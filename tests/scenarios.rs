use std::fs;
use std::path::PathBuf;

use league_odds::{
    DataFile, GameResult, OddsError, SimParams, best_worst_next_round, build_matchday_impact,
    build_win_table, simulate_season,
};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

fn poule() -> DataFile {
    serde_json::from_str(&read_fixture("poule.json")).expect("fixture should parse")
}

fn three_team() -> DataFile {
    serde_json::from_str(&read_fixture("three_team.json")).expect("fixture should parse")
}

fn params() -> SimParams {
    SimParams::new(800, 2.0, 0.12).with_seed(21).with_team("SOMB")
}

#[test]
fn win_table_shares_rebuild_the_season_distribution() {
    let data = poule();
    let params = params();
    let table = build_win_table(&data, "SOMB", &params).unwrap();
    let season = simulate_season(&data, &params).unwrap();

    assert_eq!(table.remaining_games, 3);
    assert_eq!(table.rows.len(), 4);
    let expected = &season.rank_hist["SOMB"];
    for (pos, want) in expected.iter().enumerate() {
        let rebuilt: f64 = table
            .rows
            .iter()
            .map(|row| row.share * row.rank_probs[pos])
            .sum();
        assert!((rebuilt - want).abs() < 1e-9, "position {pos}: {rebuilt} vs {want}");
    }
    for (bucket, row) in table.rows.iter().enumerate() {
        let want = season.win_hist["SOMB"][10 + bucket];
        assert!((row.share - want).abs() < 1e-9);
    }
}

#[test]
fn matchday_covers_the_earliest_round_only() {
    let data = poule();
    let impact = build_matchday_impact(&data, "SOMB", &params())
        .unwrap()
        .expect("games remain");

    assert_eq!(impact.round_date, "2026-01-24 20:00");
    let ids: Vec<&str> = impact.games.iter().map(|g| g.game.id.as_str()).collect();
    assert_eq!(ids, ["R17-1", "R17-2", "R17-3", "R17-4", "R17-5"]);

    let own = &impact.games[0];
    assert_eq!(own.better, GameResult::Home);
    assert!(own.delta >= 0.0);
    for game in &impact.games {
        assert!((game.delta - (game.home_win_odds - game.away_win_odds)).abs() < 1e-12);
        let better_odds = match game.better {
            GameResult::Home => game.home_win_odds,
            GameResult::Away => game.away_win_odds,
        };
        assert!(better_odds >= game.home_win_odds.min(game.away_win_odds));
    }
}

#[test]
fn matchday_is_reproducible() {
    let data = poule();
    let first = build_matchday_impact(&data, "SOMB", &params()).unwrap();
    let second = build_matchday_impact(&data, "SOMB", &params()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn best_is_never_below_worst() {
    let data = poule();
    let result = best_worst_next_round(&data, "SOMB", &params())
        .unwrap()
        .expect("games remain");

    assert_eq!(result.scenarios, 32);
    assert!(result.best.odds >= result.worst.odds);
    assert!((0.0..=1.0).contains(&result.best.odds));
    assert!((0.0..=1.0).contains(&result.worst.odds));
    assert_eq!(result.best.outcomes.len(), 5);
    assert!(result.best.label.contains(" over "));
}

#[test]
fn forced_round_leaves_a_single_scenario() {
    let data = poule();
    let mut params = params();
    for id in ["R17-1", "R17-2", "R17-3", "R17-4", "R17-5"] {
        params.forced_outcomes.insert(id.to_string(), GameResult::Home);
    }
    let result = best_worst_next_round(&data, "SOMB", &params)
        .unwrap()
        .expect("games remain");
    assert_eq!(result.scenarios, 1);
    assert_eq!(result.best, result.worst);
    assert_eq!(result.best.label, "All forced");
}

#[test]
fn scenario_limit_is_enforced() {
    let data = poule();
    let mut params = params();
    params.scenario_limit = 4;
    let err = best_worst_next_round(&data, "SOMB", &params).unwrap_err();
    assert!(matches!(
        err,
        OddsError::TooManyScenarios {
            undetermined: 5,
            limit: 4
        }
    ));

    params.forced_outcomes.insert("R17-5".to_string(), GameResult::Away);
    let result = best_worst_next_round(&data, "SOMB", &params)
        .unwrap()
        .expect("games remain");
    assert_eq!(result.scenarios, 16);
    for scenario in [&result.best, &result.worst] {
        assert_eq!(scenario.outcomes["R17-5"], GameResult::Away);
        assert_eq!(scenario.label.split("; ").count(), 4);
        assert!(!scenario.label.contains("Angers"));
        assert!(!scenario.label.contains("Caen"));
    }
}

#[test]
fn each_scenario_replays_with_base_plus_mask_seed() {
    let data = poule();
    let params = params();
    let result = best_worst_next_round(&data, "SOMB", &params)
        .unwrap()
        .expect("games remain");

    let round = ["R17-1", "R17-2", "R17-3", "R17-4", "R17-5"];
    for scenario in [&result.best, &result.worst] {
        let mask = round
            .iter()
            .enumerate()
            .filter(|(_, id)| scenario.outcomes[**id] == GameResult::Home)
            .fold(0u64, |mask, (bit, _)| mask | (1u64 << bit));
        let mut replay = params.clone();
        replay.forced_outcomes = scenario.outcomes.clone();
        replay.seed = Some(21 + mask);
        let odds = simulate_season(&data, &replay).unwrap().odds("SOMB");
        assert_eq!(odds, scenario.odds);
    }
}

#[test]
fn analysed_team_wins_ties_without_being_set_in_params() {
    let data = three_team();
    let params = SimParams::new(500, 6.0, 0.25)
        .with_seed(1)
        .with_playoff_spots(2);
    assert!(params.team_id.is_none());

    let impact = build_matchday_impact(&data, "C", &params)
        .unwrap()
        .expect("G1 is unplayed");
    let g1 = &impact.games[0];
    assert_eq!(g1.away_win_odds, 1.0);
    assert_eq!(g1.home_win_odds, 0.0);
    assert_eq!(g1.better, GameResult::Away);

    let table = build_win_table(&data, "C", &params).unwrap();
    let won_out = &table.rows[1];
    assert_eq!(won_out.no_playoffs, 0.0);
    assert!((won_out.rank_probs.iter().sum::<f64>() - 1.0).abs() < 1e-9);

    let result = best_worst_next_round(&data, "C", &params)
        .unwrap()
        .expect("G1 is unplayed");
    assert_eq!(result.best.odds, 1.0);
    assert_eq!(result.worst.odds, 0.0);
}

#[test]
fn finished_season_has_no_next_round() {
    let mut data = poule();
    for game in &mut data.games {
        game.played = true;
    }
    assert!(build_matchday_impact(&data, "SOMB", &params()).unwrap().is_none());
    assert!(best_worst_next_round(&data, "SOMB", &params()).unwrap().is_none());
}
