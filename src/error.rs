use thiserror::Error;

#[derive(Debug, Error)]
pub enum OddsError {
    #[error("invalid simulation parameters: {0}")]
    InvalidParams(String),

    #[error("game {game} references unknown team {team}")]
    UnknownTeam { game: String, team: String },

    #[error("team id {0} appears more than once")]
    DuplicateTeam(String),

    #[error("game id {0} appears more than once")]
    DuplicateGame(String),

    #[error("game {0} has the same team at home and away")]
    SelfMatch(String),

    #[error(
        "next round has {undetermined} undetermined games, limit is {limit}; force more outcomes"
    )]
    TooManyScenarios { undetermined: usize, limit: usize },
}

pub type Result<T> = std::result::Result<T, OddsError>;
