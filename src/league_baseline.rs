//! League-average home/away goals (μ), the anchor for all Offense/Defense
//! ratios.

use chrono::{DateTime, Utc};

use crate::types::LeagueBaseline;

pub const DEFAULT_MU_HOME: f64 = 1.60;
pub const DEFAULT_MU_AWAY: f64 = 1.20;

/// One completed match in the league window.
#[derive(Debug, Clone, Copy)]
pub struct CompletedMatch {
    pub kickoff_utc: DateTime<Utc>,
    pub home_goals: u32,
    pub away_goals: u32,
    pub finished: bool,
}

/// Averages goals across completed matches strictly before `as_of` (no
/// lookahead). Falls back to fixed defaults when no match qualifies; callers
/// pass a wider multi-season window when the current season is sparse.
pub fn compute(matches: &[CompletedMatch], as_of: DateTime<Utc>) -> LeagueBaseline {
    let mut n = 0usize;
    let mut home_goals = 0u64;
    let mut away_goals = 0u64;

    for m in matches {
        if !m.finished || m.kickoff_utc >= as_of {
            continue;
        }
        home_goals += m.home_goals as u64;
        away_goals += m.away_goals as u64;
        n += 1;
    }

    if n == 0 {
        return fallback();
    }
    LeagueBaseline {
        mu_home: home_goals as f64 / n as f64,
        mu_away: away_goals as f64 / n as f64,
        sample_matches: n,
    }
}

pub fn fallback() -> LeagueBaseline {
    LeagueBaseline {
        mu_home: DEFAULT_MU_HOME,
        mu_away: DEFAULT_MU_AWAY,
        sample_matches: 0,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::{compute, CompletedMatch, DEFAULT_MU_AWAY, DEFAULT_MU_HOME};

    fn m(day: u32, home: u32, away: u32, finished: bool) -> CompletedMatch {
        CompletedMatch {
            kickoff_utc: Utc.with_ymd_and_hms(2026, 3, day, 15, 0, 0).unwrap(),
            home_goals: home,
            away_goals: away,
            finished,
        }
    }

    #[test]
    fn averages_only_finished_matches() {
        let as_of = Utc.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap();
        let matches = vec![m(1, 2, 0, true), m(2, 1, 2, true), m(3, 4, 4, false)];
        let mu = compute(&matches, as_of);
        assert_eq!(mu.sample_matches, 2);
        assert!((mu.mu_home - 1.5).abs() < 1e-9);
        assert!((mu.mu_away - 1.0).abs() < 1e-9);
    }

    #[test]
    fn excludes_matches_at_or_after_as_of() {
        let as_of = Utc.with_ymd_and_hms(2026, 3, 2, 15, 0, 0).unwrap();
        let matches = vec![m(1, 3, 1, true), m(2, 0, 5, true), m(3, 0, 5, true)];
        let mu = compute(&matches, as_of);
        // Only the March 1 match predates the as-of instant.
        assert_eq!(mu.sample_matches, 1);
        assert!((mu.mu_home - 3.0).abs() < 1e-9);
    }

    #[test]
    fn falls_back_when_nothing_qualifies() {
        let as_of = Utc.with_ymd_and_hms(2026, 3, 20, 0, 0, 0).unwrap();
        let mu = compute(&[], as_of);
        assert_eq!(mu.mu_home, DEFAULT_MU_HOME);
        assert_eq!(mu.mu_away, DEFAULT_MU_AWAY);
        assert_eq!(mu.sample_matches, 0);
    }
}
