//! Joint scoreline distribution: independent Poissons over 0..6 goals per
//! side, with a Dixon-Coles bump on the four low-score cells and an optional
//! head-to-head low-score boost on top.

use crate::config::MatrixConfig;
use crate::types::HeadToHeadRecord;

pub const GOALS: usize = 7;

/// Cells indexed `[home_goals][away_goals]`, always normalized to sum 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreMatrix(pub [[f64; GOALS]; GOALS]);

/// Poisson pmf for k = 0..n-1, computed iteratively to avoid factorials.
fn poisson_row(lambda: f64) -> [f64; GOALS] {
    let mut row = [0.0; GOALS];
    let mut p = (-lambda).exp();
    for (k, cell) in row.iter_mut().enumerate() {
        *cell = p;
        p *= lambda / (k as f64 + 1.0);
    }
    row
}

impl ScoreMatrix {
    /// Builds the truncated joint grid and applies the low-score correction.
    pub fn from_lambdas(lambda_home: f64, lambda_away: f64, cfg: &MatrixConfig) -> Self {
        let home = poisson_row(lambda_home);
        let away = poisson_row(lambda_away);

        let mut cells = [[0.0; GOALS]; GOALS];
        for (h, row) in cells.iter_mut().enumerate() {
            for (a, cell) in row.iter_mut().enumerate() {
                *cell = home[h] * away[a];
            }
        }

        let factor = if cfg.dc_league_aware {
            // Low-scoring pairings get a slightly stronger bump.
            let combined = lambda_home + lambda_away;
            let shortfall = ((2.8 - combined) / 2.8).max(0.0).min(1.0);
            cfg.dc_factor + cfg.dc_league_aware_span * shortfall
        } else {
            cfg.dc_factor
        };
        cells[0][0] *= factor;
        cells[1][0] *= factor;
        cells[0][1] *= factor;
        cells[1][1] *= factor;

        let mut m = ScoreMatrix(cells);
        m.normalize();
        m
    }

    fn normalize(&mut self) {
        let total: f64 = self.0.iter().flatten().sum();
        if total > 0.0 {
            for cell in self.0.iter_mut().flatten() {
                *cell /= total;
            }
        }
    }

    /// Adds a flat boost to the four lowest-scoring cells and renormalizes.
    pub fn boost_low_scores(&mut self, boost: f64) {
        self.0[0][0] += boost;
        self.0[1][0] += boost;
        self.0[0][1] += boost;
        self.0[1][1] += boost;
        self.normalize();
    }

    pub fn cell(&self, home: usize, away: usize) -> f64 {
        self.0[home][away]
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().flatten().sum()
    }
}

/// Whether the recent direct meetings between the two sides qualify for the
/// low-score boost: enough finished meetings and either a low combined goal
/// average or enough near-goalless games.
pub fn h2h_low_scoring(
    meetings: &[HeadToHeadRecord],
    home_team_id: u64,
    away_team_id: u64,
    cfg: &MatrixConfig,
) -> bool {
    let involves = |h: &HeadToHeadRecord| {
        (h.home_team_id == home_team_id && h.away_team_id == away_team_id)
            || (h.home_team_id == away_team_id && h.away_team_id == home_team_id)
    };

    let mut recent: Vec<&HeadToHeadRecord> = meetings
        .iter()
        .filter(|h| h.finished && involves(h))
        .collect();
    // Most recent first; undated meetings sort last.
    recent.sort_by(|a, b| b.kickoff_utc.cmp(&a.kickoff_utc));
    recent.truncate(cfg.h2h_recent);

    if recent.len() < cfg.h2h_min_meetings {
        return false;
    }

    let totals: Vec<u32> = recent.iter().map(|h| h.home_goals + h.away_goals).collect();
    let avg = totals.iter().sum::<u32>() as f64 / totals.len() as f64;
    let near_goalless = totals.iter().filter(|t| **t <= cfg.h2h_low_total).count();

    avg < cfg.h2h_low_avg || near_goalless >= cfg.h2h_low_count
}
