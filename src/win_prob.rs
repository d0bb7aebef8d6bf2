use serde::{Deserialize, Serialize};

use crate::dataset::TeamRecord;

// Flat defaults keep outcomes close to 50/50.
pub const DEFAULT_K: f64 = 2.0;
pub const DEFAULT_HOME_ADV: f64 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WinModel {
    pub k: f64,
    pub home_adv: f64,
}

impl Default for WinModel {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            home_adv: DEFAULT_HOME_ADV,
        }
    }
}

impl WinModel {
    pub fn home_win_prob(&self, home: &TeamRecord, away: &TeamRecord) -> f64 {
        win_prob(home.win_pct(), away.win_pct(), self.k, self.home_adv)
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Home-win probability from the two win percentages. `home_adv` is a logit bonus.
pub fn win_prob(wpct_home: f64, wpct_away: f64, k: f64, home_adv: f64) -> f64 {
    let diff = wpct_home - wpct_away;
    sigmoid(k * diff + home_adv)
}
