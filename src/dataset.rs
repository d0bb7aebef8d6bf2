use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::error::OddsError;

pub type TeamId = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamRecord {
    pub id: TeamId,
    pub name: String,
    #[serde(default)]
    pub abbr: String,
    pub wins: u32,
    pub losses: u32,
}

impl TeamRecord {
    pub fn games_played(&self) -> u32 {
        self.wins + self.losses
    }

    /// Win percentage over played games; 0.5 before the first game.
    pub fn win_pct(&self) -> f64 {
        let games = self.games_played();
        if games > 0 {
            self.wins as f64 / games as f64
        } else {
            0.5
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Game {
    pub id: String,
    pub date: String,
    pub home: TeamId,
    pub away: TeamId,
    pub played: bool,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
}

impl Game {
    pub fn involves(&self, team_id: &str) -> bool {
        self.home == team_id || self.away == team_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameResult {
    Home,
    Away,
}

impl GameResult {
    pub fn winner<'a>(&self, game: &'a Game) -> &'a str {
        match self {
            GameResult::Home => &game.home,
            GameResult::Away => &game.away,
        }
    }

    pub fn loser<'a>(&self, game: &'a Game) -> &'a str {
        match self {
            GameResult::Home => &game.away,
            GameResult::Away => &game.home,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "home" | "h" => Some(GameResult::Home),
            "away" | "a" => Some(GameResult::Away),
            _ => None,
        }
    }
}

pub type ForcedOutcomes = BTreeMap<String, GameResult>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFile {
    pub season: String,
    pub updated: String,
    pub teams: Vec<TeamRecord>,
    pub games: Vec<Game>,
}

impl DataFile {
    /// Structural checks the simulator relies on: unique ids and games between two known teams.
    pub fn validate(&self) -> crate::Result<()> {
        let mut team_ids = HashSet::new();
        for team in &self.teams {
            if !team_ids.insert(team.id.as_str()) {
                return Err(OddsError::DuplicateTeam(team.id.clone()));
            }
        }
        let mut game_ids = HashSet::new();
        for game in &self.games {
            if !game_ids.insert(game.id.as_str()) {
                return Err(OddsError::DuplicateGame(game.id.clone()));
            }
            for side in [&game.home, &game.away] {
                if !team_ids.contains(side.as_str()) {
                    return Err(OddsError::UnknownTeam {
                        game: game.id.clone(),
                        team: side.clone(),
                    });
                }
            }
            if game.home == game.away {
                return Err(OddsError::SelfMatch(game.id.clone()));
            }
        }
        Ok(())
    }

    pub fn remaining_games(&self) -> impl Iterator<Item = &Game> {
        self.games.iter().filter(|game| !game.played)
    }

    pub fn teams_by_id(&self) -> HashMap<&str, &TeamRecord> {
        self.teams.iter().map(|t| (t.id.as_str(), t)).collect()
    }

    pub fn team(&self, id: &str) -> Option<&TeamRecord> {
        self.teams.iter().find(|t| t.id == id)
    }

    pub fn team_name<'a>(&'a self, id: &'a str) -> &'a str {
        self.team(id).map(|t| t.name.as_str()).unwrap_or(id)
    }

    /// Built-in season used when no dataset file is available.
    pub fn sample() -> Self {
        let records: [(&str, &str, &str, u32, u32); 14] = [
            ("SOMB", "SOM Boulogne", "SOMB", 10, 6),
            ("TEAM2", "Team 2", "T2", 11, 5),
            ("TEAM3", "Team 3", "T3", 9, 7),
            ("TEAM4", "Team 4", "T4", 8, 8),
            ("TEAM5", "Team 5", "T5", 8, 8),
            ("TEAM6", "Team 6", "T6", 7, 9),
            ("TEAM7", "Team 7", "T7", 7, 9),
            ("TEAM8", "Team 8", "T8", 6, 10),
            ("TEAM9", "Team 9", "T9", 6, 10),
            ("TEAM10", "Team 10", "T10", 5, 11),
            ("TEAM11", "Team 11", "T11", 5, 11),
            ("TEAM12", "Team 12", "T12", 4, 12),
            ("TEAM13", "Team 13", "T13", 4, 12),
            ("TEAM14", "Team 14", "T14", 3, 13),
        ];
        let fixtures: [(&str, &str, &str); 6] = [
            ("2026-01-20", "SOMB", "TEAM4"),
            ("2026-01-20", "TEAM2", "TEAM3"),
            ("2026-01-20", "TEAM5", "TEAM6"),
            ("2026-01-27", "TEAM7", "SOMB"),
            ("2026-01-27", "TEAM8", "TEAM9"),
            ("2026-01-27", "TEAM10", "TEAM11"),
        ];

        Self {
            season: "2025-2026".to_string(),
            updated: "2026-01-17".to_string(),
            teams: records
                .iter()
                .map(|(id, name, abbr, wins, losses)| TeamRecord {
                    id: id.to_string(),
                    name: name.to_string(),
                    abbr: abbr.to_string(),
                    wins: *wins,
                    losses: *losses,
                })
                .collect(),
            games: fixtures
                .iter()
                .map(|(date, home, away)| Game {
                    id: format!("{date}-{home}-{away}"),
                    date: date.to_string(),
                    home: home.to_string(),
                    away: away.to_string(),
                    played: false,
                    home_score: None,
                    away_score: None,
                })
                .collect(),
        }
    }
}

pub fn load_data(path: &Path) -> Result<DataFile> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed reading dataset {}", path.display()))?;
    let data: DataFile = serde_json::from_str(raw.trim())
        .with_context(|| format!("invalid dataset json in {}", path.display()))?;
    data.validate()
        .with_context(|| format!("dataset {} rejected", path.display()))?;
    Ok(data)
}

/// Missing, empty or unparseable files fall back to [`DataFile::sample`]. A dataset that
/// parses but fails [`DataFile::validate`] is an error.
pub fn load_data_or_default(path: &Path) -> Result<DataFile> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "dataset missing, using built-in sample season");
            return Ok(DataFile::sample());
        }
        Err(err) => {
            return Err(err).with_context(|| format!("failed reading dataset {}", path.display()));
        }
    };
    let raw = raw.trim();
    if raw.is_empty() {
        warn!(path = %path.display(), "dataset empty, using built-in sample season");
        return Ok(DataFile::sample());
    }
    let data: DataFile = match serde_json::from_str(raw) {
        Ok(data) => data,
        Err(err) => {
            warn!(path = %path.display(), error = %err, "dataset unparseable, using built-in sample season");
            return Ok(DataFile::sample());
        }
    };
    data.validate()
        .with_context(|| format!("dataset {} rejected", path.display()))?;
    Ok(data)
}

/// Lowercased, accent-folded form used for tie-break name comparison.
pub fn fold_name(input: &str) -> String {
    input
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Folded name reduced to ascii alphanumerics, for fuzzy lookups.
pub fn normalize_name(input: &str) -> String {
    fold_name(input)
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Team of interest by abbreviation first, then by a name fragment.
pub fn find_team_id(data: &DataFile, abbr: &str, name_hint: Option<&str>) -> Option<TeamId> {
    let abbr = abbr.trim();
    if !abbr.is_empty() {
        if let Some(team) = data
            .teams
            .iter()
            .find(|t| t.abbr.eq_ignore_ascii_case(abbr))
        {
            return Some(team.id.clone());
        }
    }
    let hint = normalize_name(name_hint?);
    if hint.is_empty() {
        return None;
    }
    data.teams
        .iter()
        .find(|t| normalize_name(&t.name).contains(&hint))
        .map(|t| t.id.clone())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMapEntry {
    pub id: TeamId,
    pub abbr: String,
    pub name: String,
}

pub fn team_map(data: &DataFile) -> Vec<TeamMapEntry> {
    data.teams
        .iter()
        .map(|t| TeamMapEntry {
            id: t.id.clone(),
            abbr: t.abbr.clone(),
            name: t.name.clone(),
        })
        .collect()
}
