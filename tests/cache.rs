use std::fs;
use std::path::PathBuf;

use league_odds::odds_cache::{load_odds_cache, recompute_odds, save_odds_cache};
use league_odds::service::{OddsRequest, answer_odds_request};
use league_odds::{DataFile, GameResult, SimParams};

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

fn defaults() -> SimParams {
    SimParams::new(600, 2.0, 0.12).with_seed(11)
}

#[test]
fn cache_survives_a_disk_round_trip() {
    let data = poule();
    let cache = recompute_odds(&data, "SOMB", &defaults()).unwrap();
    assert!(cache.win_table.is_some());
    assert_eq!(
        cache.matchday_impact.as_ref().map(|m| m.games.len()),
        Some(5)
    );

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("odds.json");
    save_odds_cache(&path, &cache).unwrap();
    assert!(!path.with_extension("json.tmp").exists());

    let loaded = load_odds_cache(&path).expect("cache should load");
    assert_eq!(loaded.team_id, cache.team_id);
    assert_eq!(loaded.data_fingerprint, cache.data_fingerprint);
    assert_eq!(loaded.updated, cache.updated);
    for (team, odds) in &cache.result.top_odds {
        assert!((loaded.result.odds(team) - odds).abs() < 1e-12);
    }
    assert!(loaded.is_valid_for(&data, "SOMB", &defaults()));
}

#[test]
fn unreadable_cache_reads_as_none() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("odds.json");
    assert!(load_odds_cache(&path).is_none());
    fs::write(&path, "  \n").unwrap();
    assert!(load_odds_cache(&path).is_none());
    fs::write(&path, "{ not json").unwrap();
    assert!(load_odds_cache(&path).is_none());
}

#[test]
fn cache_goes_stale_when_inputs_change() {
    let data = poule();
    let cache = recompute_odds(&data, "SOMB", &defaults()).unwrap();

    assert!(!cache.is_valid_for(&data, "ORCH", &defaults()));
    assert!(!cache.is_valid_for(&data, "SOMB", &SimParams::new(600, 3.0, 0.12)));
    assert!(!cache.is_valid_for(&data, "SOMB", &defaults().with_playoff_spots(4)));

    let mut played = data.clone();
    played.games[0].played = true;
    assert!(!cache.is_valid_for(&played, "SOMB", &defaults()));
}

#[test]
fn plain_request_is_served_from_cache() {
    let data = poule();
    let cache = recompute_odds(&data, "SOMB", &defaults()).unwrap();
    let response =
        answer_odds_request(&data, Some(&cache), &OddsRequest::default(), &defaults(), "SOMB")
            .unwrap();
    assert!(response.cached);
    assert_eq!(response.top_odds, cache.result.top_odds);
    assert!(response.best_worst.is_none());
}

#[test]
fn forced_or_best_worst_requests_run_the_engine() {
    let data = poule();
    let cache = recompute_odds(&data, "SOMB", &defaults()).unwrap();

    let mut forced = OddsRequest::default();
    forced
        .forced_outcomes
        .insert("R17-1".to_string(), GameResult::Away);
    let response = answer_odds_request(&data, Some(&cache), &forced, &defaults(), "SOMB").unwrap();
    assert!(!response.cached);

    let request: OddsRequest =
        serde_json::from_str(r#"{"includeBestWorst": true, "simulations": 200}"#).unwrap();
    let response = answer_odds_request(&data, Some(&cache), &request, &defaults(), "SOMB").unwrap();
    assert!(!response.cached);
    let best_worst = response.best_worst.expect("next round exists");
    assert!(best_worst.best.odds >= best_worst.worst.odds);
}

#[test]
fn missing_cache_runs_the_engine() {
    let data = poule();
    let request = OddsRequest {
        team_id: Some("ORCH".to_string()),
        ..OddsRequest::default()
    };
    let response = answer_odds_request(&data, None, &request, &defaults(), "SOMB").unwrap();
    assert!(!response.cached);
    let total: f64 = response.rank_hist["ORCH"].iter().sum();
    assert!((total - 1.0).abs() < 1e-9);
}
