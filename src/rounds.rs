use chrono::NaiveDate;

use crate::dataset::{DataFile, Game};

#[derive(Debug, Clone)]
pub struct Round<'a> {
    pub round_date: String,
    pub games: Vec<&'a Game>,
}

/// Calendar day of a schedule entry such as `2026-01-20` or `2026-01-20 20:00`.
/// Placeholders like `TBD` have no key.
pub fn date_key(raw: &str) -> Option<NaiveDate> {
    let day = raw.trim().split([' ', 'T']).next()?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

/// Unplayed games on the earliest upcoming date, in dataset order. Undated games sort last
/// and only group with identical placeholders.
pub fn next_round(data: &DataFile) -> Option<Round<'_>> {
    let mut remaining: Vec<(Option<NaiveDate>, &Game)> = data
        .remaining_games()
        .map(|game| (date_key(&game.date), game))
        .collect();
    remaining.sort_by(|a, b| match (a.0, b.0) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });

    let (first_key, first) = *remaining.first()?;
    let games = remaining
        .iter()
        .filter(|(key, game)| match first_key {
            Some(_) => *key == first_key,
            None => key.is_none() && game.date == first.date,
        })
        .map(|(_, game)| *game)
        .collect();

    Some(Round {
        round_date: first.date.clone(),
        games,
    })
}
