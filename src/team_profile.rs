//! Aggregates player ratings and season stats into a team-level profile.

use std::collections::HashMap;

use crate::config::{PositionWeight, TeamProfileConfig};
use crate::ratings::{PlayerRating, PositionGroup};
use crate::types::TeamSeasonStats;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TeamRatingProfile {
    pub offense: f64,
    pub defense: f64,
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

fn weight_for(group: PositionGroup, cfg: &TeamProfileConfig) -> PositionWeight {
    match group {
        PositionGroup::Gk => cfg.keeper,
        PositionGroup::Def => cfg.defender,
        PositionGroup::Mid => cfg.midfielder,
        PositionGroup::Fwd => cfg.forward,
    }
}

/// Weighted-average profile of a lineup. Players without a resolved rating are
/// skipped rather than defaulted, so missing data cannot drag the profile
/// down; when nothing resolves at all the documented fallback applies.
pub fn profile_from_lineup(
    ratings: &HashMap<u64, PlayerRating>,
    lineup: &[u64],
    cfg: &TeamProfileConfig,
) -> TeamRatingProfile {
    let mut off_sum = 0.0;
    let mut off_w = 0.0;
    let mut def_sum = 0.0;
    let mut def_w = 0.0;

    for player_id in lineup {
        let Some(rating) = ratings.get(player_id) else {
            continue;
        };
        let w = weight_for(rating.group, cfg);
        off_sum += rating.offense * w.offense;
        off_w += w.offense;
        def_sum += rating.defense * w.defense;
        def_w += w.defense;
    }

    let offense = if off_w > 0.0 {
        off_sum / off_w
    } else {
        cfg.fallback_score
    };
    let defense = if def_w > 0.0 {
        def_sum / def_w
    } else {
        cfg.fallback_score
    };

    TeamRatingProfile {
        offense: clamp(offense, cfg.clamp_lo, cfg.clamp_hi),
        defense: clamp(defense, cfg.clamp_lo, cfg.clamp_hi),
    }
}

/// The eleven highest-minutes rated players, used when no official lineup
/// exists. Ties break on player id so the synthesized XI is deterministic.
pub fn ideal_eleven(ratings: &HashMap<u64, PlayerRating>) -> Vec<u64> {
    let mut players: Vec<(u64, u32)> = ratings.iter().map(|(id, r)| (*id, r.minutes)).collect();
    players.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    players.into_iter().take(11).map(|(id, _)| id).collect()
}

/// Season-level Offense/Defense from goals for/against relative to the league
/// mean. An Offense of 100 means "scores at exactly the league-average rate".
pub fn season_baseline_profile(
    stats: Option<&TeamSeasonStats>,
    mu_league: f64,
    cfg: &TeamProfileConfig,
) -> TeamRatingProfile {
    let gf = stats
        .and_then(|s| s.goals_for_avg)
        .unwrap_or(cfg.default_goals_avg);
    let ga = stats
        .and_then(|s| s.goals_against_avg)
        .unwrap_or(cfg.default_goals_avg);
    let mu = mu_league.max(1e-9);
    let ga = ga.max(1e-9);

    TeamRatingProfile {
        offense: clamp(gf / mu * 100.0, cfg.clamp_lo, cfg.clamp_hi),
        defense: clamp(mu / ga * 100.0, cfg.clamp_lo, cfg.clamp_hi),
    }
}

/// Blends the lineup-derived profile with the season baseline so no single
/// noisy signal dominates the estimate.
pub fn blend(
    lineup: TeamRatingProfile,
    season: TeamRatingProfile,
    cfg: &TeamProfileConfig,
) -> TeamRatingProfile {
    let w = cfg.lineup_blend;
    TeamRatingProfile {
        offense: w * lineup.offense + (1.0 - w) * season.offense,
        defense: w * lineup.defense + (1.0 - w) * season.defense,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::{blend, ideal_eleven, profile_from_lineup, season_baseline_profile};
    use crate::config::TeamProfileConfig;
    use crate::ratings::{PlayerRating, PositionGroup};
    use crate::types::TeamSeasonStats;

    fn rating(offense: f64, defense: f64, group: PositionGroup, minutes: u32) -> PlayerRating {
        PlayerRating {
            offense,
            defense,
            group,
            minutes,
        }
    }

    #[test]
    fn empty_lineup_falls_back_to_eighty() {
        let cfg = TeamProfileConfig::default();
        let profile = profile_from_lineup(&HashMap::new(), &[1, 2, 3], &cfg);
        assert_eq!(profile.offense, 80.0);
        assert_eq!(profile.defense, 80.0);
    }

    #[test]
    fn keeper_contributes_no_offense_weight() {
        let cfg = TeamProfileConfig::default();
        let mut ratings = HashMap::new();
        ratings.insert(1, rating(20.0, 90.0, PositionGroup::Gk, 900));
        ratings.insert(9, rating(70.0, 30.0, PositionGroup::Fwd, 900));
        let profile = profile_from_lineup(&ratings, &[1, 9], &cfg);
        // Offense is the forward's alone; defense mixes both.
        assert!((profile.offense - 70.0).abs() < 1e-9);
        assert!(profile.defense > 30.0 && profile.defense < 90.0);
    }

    #[test]
    fn unresolved_players_are_skipped_not_zeroed() {
        let cfg = TeamProfileConfig::default();
        let mut ratings = HashMap::new();
        ratings.insert(9, rating(70.0, 50.0, PositionGroup::Fwd, 900));
        let with_ghosts = profile_from_lineup(&ratings, &[9, 100, 101, 102], &cfg);
        let alone = profile_from_lineup(&ratings, &[9], &cfg);
        assert_eq!(with_ghosts.offense, alone.offense);
    }

    #[test]
    fn ideal_eleven_is_minutes_sorted_and_deterministic() {
        let mut ratings = HashMap::new();
        for id in 1..=14u64 {
            let minutes = if id <= 3 { 500 } else { 1000 + id as u32 };
            ratings.insert(id, rating(50.0, 50.0, PositionGroup::Mid, minutes));
        }
        let xi = ideal_eleven(&ratings);
        assert_eq!(xi.len(), 11);
        // The three 500-minute players are squeezed out.
        assert!(!xi.contains(&1) && !xi.contains(&2) && !xi.contains(&3));
        assert_eq!(xi, ideal_eleven(&ratings));
    }

    #[test]
    fn season_baseline_centers_on_hundred() {
        let cfg = TeamProfileConfig::default();
        let stats = TeamSeasonStats {
            goals_for_avg: Some(1.4),
            goals_against_avg: Some(1.4),
            ..Default::default()
        };
        let p = season_baseline_profile(Some(&stats), 1.4, &cfg);
        assert!((p.offense - 100.0).abs() < 1e-9);
        assert!((p.defense - 100.0).abs() < 1e-9);
    }

    #[test]
    fn blend_weights_lineup_sixty_forty() {
        let cfg = TeamProfileConfig::default();
        let lineup = super::TeamRatingProfile {
            offense: 100.0,
            defense: 100.0,
        };
        let season = super::TeamRatingProfile {
            offense: 50.0,
            defense: 150.0,
        };
        let out = blend(lineup, season, &cfg);
        assert!((out.offense - 80.0).abs() < 1e-9);
        assert!((out.defense - 120.0).abs() < 1e-9);
    }
}
