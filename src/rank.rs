use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::dataset::{TeamId, TeamRecord, fold_name};

/// Competition-specific tie-break. Tiers (lower first) only order the level group that
/// contains the anchor team; every other group, and teams on equal tiers, fall back to folded
/// name, then id. The order is always total.
pub trait TieBreak {
    fn anchor(&self) -> Option<&str>;
    fn tier(&self, team: &TeamRecord) -> i32;
}

/// The team of interest wins every tie.
pub struct FavorTeam<'a> {
    favored: Option<&'a str>,
}

impl<'a> FavorTeam<'a> {
    pub fn new(favored: Option<&'a str>) -> Self {
        Self { favored }
    }
}

impl TieBreak for FavorTeam<'_> {
    fn anchor(&self) -> Option<&str> {
        self.favored
    }

    fn tier(&self, team: &TeamRecord) -> i32 {
        if self.favored == Some(team.id.as_str()) { -1 } else { 0 }
    }
}

/// Known head-to-head results of the team of interest: opponents it loses the tie-break to
/// move above the level group, opponents it beats move below it.
pub struct HeadToHead<'a> {
    team: Option<&'a str>,
    wins_against: HashSet<&'a str>,
    loses_against: HashSet<&'a str>,
}

impl<'a> HeadToHead<'a> {
    pub fn new(
        team: Option<&'a str>,
        wins_against: &'a [TeamId],
        loses_against: &'a [TeamId],
    ) -> Self {
        Self {
            team,
            wins_against: wins_against.iter().map(String::as_str).collect(),
            loses_against: loses_against.iter().map(String::as_str).collect(),
        }
    }
}

impl TieBreak for HeadToHead<'_> {
    fn anchor(&self) -> Option<&str> {
        self.team
    }

    fn tier(&self, team: &TeamRecord) -> i32 {
        let id = team.id.as_str();
        if self.team.is_none() || self.team == Some(id) {
            0
        } else if self.loses_against.contains(id) {
            -1
        } else if self.wins_against.contains(id) {
            1
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "camelCase")]
pub enum TieBreakPolicy {
    #[default]
    FavorTeam,
    #[serde(rename_all = "camelCase")]
    HeadToHead {
        #[serde(default, alias = "wins_against")]
        wins_against: Vec<TeamId>,
        #[serde(default, alias = "loses_against")]
        loses_against: Vec<TeamId>,
    },
}

impl TieBreakPolicy {
    pub fn resolver<'a>(
        &'a self,
        team_of_interest: Option<&'a str>,
    ) -> Box<dyn TieBreak + 'a> {
        match self {
            TieBreakPolicy::FavorTeam => Box::new(FavorTeam::new(team_of_interest)),
            TieBreakPolicy::HeadToHead {
                wins_against,
                loses_against,
            } => Box::new(HeadToHead::new(team_of_interest, wins_against, loses_against)),
        }
    }
}

/// Reusable ordering over a fixed team list. Tiers and folded names are computed once so
/// repeated ranking inside a simulation only compares integers.
pub struct Ranker<'a> {
    teams: &'a [TeamRecord],
    tiers: Vec<i32>,
    anchor: Option<usize>,
    name_rank: Vec<usize>,
    total_games: Option<Vec<u32>>,
}

impl<'a> Ranker<'a> {
    /// With `total_games` the primary key is wins / scheduled games, otherwise raw wins.
    pub fn new(
        teams: &'a [TeamRecord],
        tie_break: &dyn TieBreak,
        total_games: Option<Vec<u32>>,
    ) -> Self {
        let keys: Vec<String> = teams
            .iter()
            .map(|t| {
                let folded = fold_name(t.name.trim());
                if folded.is_empty() { fold_name(&t.id) } else { folded }
            })
            .collect();
        let mut by_name: Vec<usize> = (0..teams.len()).collect();
        by_name.sort_by(|&a, &b| {
            keys[a]
                .cmp(&keys[b])
                .then_with(|| teams[a].id.cmp(&teams[b].id))
        });
        let mut name_rank = vec![0; teams.len()];
        for (pos, idx) in by_name.into_iter().enumerate() {
            name_rank[idx] = pos;
        }

        Self {
            teams,
            tiers: teams.iter().map(|t| tie_break.tier(t)).collect(),
            anchor: tie_break
                .anchor()
                .and_then(|id| teams.iter().position(|t| t.id == id)),
            name_rank,
            total_games,
        }
    }

    /// Writes team indices into `order`, best first. `wins` is indexed like the team list.
    pub fn rank_into(&self, wins: &[u32], order: &mut Vec<usize>) {
        order.clear();
        order.extend(0..self.teams.len());
        order.sort_by(|&a, &b| self.compare(a, b, wins));
    }

    pub fn rank(&self, wins: &[u32]) -> Vec<usize> {
        let mut order = Vec::with_capacity(self.teams.len());
        self.rank_into(wins, &mut order);
        order
    }

    fn compare(&self, a: usize, b: usize, wins: &[u32]) -> Ordering {
        self.primary(a, b, wins)
            .then_with(|| {
                if self.level_with_anchor(a, wins) {
                    self.tiers[a].cmp(&self.tiers[b])
                } else {
                    Ordering::Equal
                }
            })
            .then_with(|| self.name_rank[a].cmp(&self.name_rank[b]))
    }

    fn level_with_anchor(&self, idx: usize, wins: &[u32]) -> bool {
        self.anchor
            .is_some_and(|anchor| self.primary(idx, anchor, wins) == Ordering::Equal)
    }

    fn primary(&self, a: usize, b: usize, wins: &[u32]) -> Ordering {
        let (wa, wb) = (wins[a] as u64, wins[b] as u64);
        match &self.total_games {
            Some(totals) => {
                let (na, da) = fraction(wa, totals[a] as u64);
                let (nb, db) = fraction(wb, totals[b] as u64);
                // Descending by na/da, compared without rounding.
                (nb * da).cmp(&(na * db))
            }
            None => wb.cmp(&wa),
        }
    }
}

fn fraction(wins: u64, games: u64) -> (u64, u64) {
    if games == 0 { (0, 1) } else { (wins, games) }
}

/// Id-keyed ranking with the default tie-break. Missing win entries fall back to the
/// team's recorded wins.
pub fn rank_teams(
    teams: &[TeamRecord],
    wins: &HashMap<TeamId, u32>,
    team_of_interest: Option<&str>,
    total_games: Option<&HashMap<TeamId, u32>>,
) -> Vec<TeamId> {
    let totals = total_games.map(|totals| {
        teams
            .iter()
            .map(|t| totals.get(&t.id).copied().unwrap_or(0))
            .collect()
    });
    let ranker = Ranker::new(teams, &FavorTeam::new(team_of_interest), totals);
    let tallies: Vec<u32> = teams
        .iter()
        .map(|t| wins.get(&t.id).copied().unwrap_or(t.wins))
        .collect();
    ranker
        .rank(&tallies)
        .into_iter()
        .map(|idx| teams[idx].id.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(id: &str, name: &str) -> TeamRecord {
        TeamRecord {
            id: id.to_string(),
            name: name.to_string(),
            abbr: String::new(),
            wins: 0,
            losses: 0,
        }
    }

    fn wins(pairs: &[(&str, u32)]) -> HashMap<TeamId, u32> {
        pairs.iter().map(|(id, w)| (id.to_string(), *w)).collect()
    }

    #[test]
    fn raw_wins_descending() {
        let teams = vec![team("a", "A"), team("b", "B"), team("c", "C")];
        let order = rank_teams(&teams, &wins(&[("a", 1), ("b", 3), ("c", 2)]), None, None);
        assert_eq!(order, vec!["b", "c", "a"]);
    }

    #[test]
    fn percentage_accounts_for_schedule_length() {
        let teams = vec![team("a", "A"), team("b", "B")];
        // 5/8 beats 6/10.
        let totals = wins(&[("a", 8), ("b", 10)]);
        let order = rank_teams(&teams, &wins(&[("a", 5), ("b", 6)]), None, Some(&totals));
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn zero_games_is_zero_percent() {
        let teams = vec![team("a", "A"), team("b", "B")];
        let totals = wins(&[("a", 0), ("b", 4)]);
        let order = rank_teams(&teams, &wins(&[("a", 0), ("b", 1)]), None, Some(&totals));
        assert_eq!(order, vec!["b", "a"]);
    }

    #[test]
    fn favored_team_wins_ties() {
        let teams = vec![team("a", "Alpha"), team("z", "Zulu"), team("m", "Mike")];
        let w = wins(&[("a", 2), ("z", 2), ("m", 2)]);
        let order = rank_teams(&teams, &w, Some("z"), None);
        assert_eq!(order, vec!["z", "a", "m"]);
    }

    #[test]
    fn names_fold_case_and_accents() {
        let teams = vec![team("1", "orléans"), team("2", "Évreux"), team("3", "Blois")];
        let w = wins(&[("1", 1), ("2", 1), ("3", 1)]);
        let order = rank_teams(&teams, &w, None, None);
        assert_eq!(order, vec!["3", "2", "1"]);
    }

    #[test]
    fn empty_names_fall_back_to_id() {
        let teams = vec![team("b", ""), team("a", "")];
        let order = rank_teams(&teams, &wins(&[("a", 0), ("b", 0)]), None, None);
        assert_eq!(order, vec!["a", "b"]);
    }

    #[test]
    fn head_to_head_overrides_name_order() {
        let teams = vec![team("s", "Zed"), team("x", "Alpha"), team("y", "Beta")];
        let beats = vec!["x".to_string()];
        let loses = vec!["y".to_string()];
        let policy = TieBreakPolicy::HeadToHead {
            wins_against: beats,
            loses_against: loses,
        };
        let ranker = Ranker::new(&teams, policy.resolver(Some("s")).as_ref(), None);
        let order = ranker.rank(&[3, 3, 3]);
        // y holds the tie-break over s, s holds it over x.
        let ids: Vec<&str> = order.iter().map(|&i| teams[i].id.as_str()).collect();
        assert_eq!(ids, vec!["y", "s", "x"]);
    }

    #[test]
    fn head_to_head_leaves_other_ties_to_name_order() {
        let teams = vec![team("s", "Mike"), team("x", "Zulu"), team("w", "Alpha")];
        let policy = TieBreakPolicy::HeadToHead {
            wins_against: Vec::new(),
            loses_against: vec!["x".to_string()],
        };
        let ranker = Ranker::new(&teams, policy.resolver(Some("s")).as_ref(), None);
        let ids: Vec<&str> = ranker
            .rank(&[0, 3, 3])
            .iter()
            .map(|&i| teams[i].id.as_str())
            .collect();
        assert_eq!(ids, vec!["w", "x", "s"]);

        // Once s joins the tie, x holds the tie-break over it.
        let ids: Vec<&str> = ranker
            .rank(&[3, 3, 3])
            .iter()
            .map(|&i| teams[i].id.as_str())
            .collect();
        assert_eq!(ids, vec!["x", "w", "s"]);
    }

    #[test]
    fn deterministic_for_identical_inputs() {
        let teams: Vec<TeamRecord> = (0..10).map(|i| team(&format!("t{i}"), "Same")).collect();
        let w: HashMap<TeamId, u32> = teams.iter().map(|t| (t.id.clone(), 4)).collect();
        let first = rank_teams(&teams, &w, None, None);
        for _ in 0..5 {
            assert_eq!(rank_teams(&teams, &w, None, None), first);
        }
    }
}
