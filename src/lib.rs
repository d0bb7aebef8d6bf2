pub mod best_worst;
pub mod config;
pub mod dataset;
pub mod error;
pub mod export;
pub mod format;
pub mod matchday;
pub mod odds_cache;
pub mod rank;
pub mod rng;
pub mod rounds;
pub mod service;
pub mod simulate;
pub mod win_prob;
pub mod win_table;

pub use best_worst::{BestWorstResult, Scenario, best_worst_next_round};
pub use dataset::{DataFile, ForcedOutcomes, Game, GameResult, TeamId, TeamRecord};
pub use error::{OddsError, Result};
pub use matchday::{MatchdayImpact, MatchdayImpactGame, build_matchday_impact};
pub use rank::{TieBreakPolicy, rank_teams};
pub use simulate::{SimParams, SimResult, simulate_season};
pub use win_prob::win_prob;
pub use win_table::{WinTable, WinTableRow, build_win_table};
