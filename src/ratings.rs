//! Per-player Offense/Defense scores from raw season aggregates.
//!
//! Counting stats are normalized to per-90 rates (per-appearance when a player
//! has appearances but no recorded minutes), combined through a
//! position-specific weight vector, penalized for cards and shrunk toward the
//! neutral 50 when the minutes sample is small.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::{DefenseWeights, OffenseWeights, RatingConfig};
use crate::types::PlayerStatSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PositionGroup {
    Gk,
    Def,
    Mid,
    Fwd,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PlayerRating {
    pub offense: f64,
    pub defense: f64,
    pub group: PositionGroup,
    pub minutes: u32,
}

/// Maps a provider position string ("Goalkeeper", "D", "Attacking Midfield",
/// "LW", ...) onto the four weight groups. Unknown positions rate as midfield.
pub fn position_group(raw: Option<&str>) -> PositionGroup {
    let s = raw.unwrap_or("").trim().to_ascii_uppercase();
    if s.starts_with('G') {
        PositionGroup::Gk
    } else if s.starts_with('D') {
        PositionGroup::Def
    } else if s.starts_with('M') {
        PositionGroup::Mid
    } else if s.starts_with('F') || s.starts_with('A') || s.contains('W') {
        PositionGroup::Fwd
    } else {
        PositionGroup::Mid
    }
}

/// Per-90 rate, falling back to per-appearance when minutes are unrecorded.
fn rate_per_90(value: u32, minutes: u32, appearances: u32) -> f64 {
    if minutes > 0 {
        value as f64 * 90.0 / minutes as f64
    } else if appearances > 0 {
        value as f64 / appearances as f64
    } else {
        0.0
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

fn offense_score(stat: &PlayerStatSnapshot, w: &OffenseWeights) -> f64 {
    let g = rate_per_90(stat.goals, stat.minutes, stat.appearances);
    let a = rate_per_90(stat.assists, stat.minutes, stat.appearances);
    let sot = rate_per_90(stat.shots_on, stat.minutes, stat.appearances);
    let kp = rate_per_90(stat.key_passes, stat.minutes, stat.appearances);
    let dr = rate_per_90(stat.dribbles_success, stat.minutes, stat.appearances);
    let raw = w.goals * g + w.assists * a + w.shots_on * sot + w.key_passes * kp + w.dribbles * dr;
    100.0 * clamp(raw / w.scale, 0.0, 1.0)
}

fn defense_score(stat: &PlayerStatSnapshot, w: &DefenseWeights) -> f64 {
    let tk = rate_per_90(stat.tackles, stat.minutes, stat.appearances);
    let ic = rate_per_90(stat.interceptions, stat.minutes, stat.appearances);
    let bl = rate_per_90(stat.blocks, stat.minutes, stat.appearances);
    let duels_90 = rate_per_90(stat.duels_total, stat.minutes, stat.appearances);
    let duel_win_rate = if stat.duels_total > 0 {
        stat.duels_won as f64 / stat.duels_total as f64
    } else {
        0.0
    };
    let raw = w.tackles * tk + w.interceptions * ic + w.blocks * bl + w.duels * duels_90 * duel_win_rate;
    100.0 * clamp(raw / w.scale, 0.0, 1.0)
}

fn keeper_scores(stat: &PlayerStatSnapshot, cfg: &RatingConfig) -> (f64, f64) {
    let k = &cfg.keeper;
    let shots_faced = stat.saves + stat.conceded;
    let save_pct = if shots_faced > 0 {
        stat.saves as f64 / shots_faced as f64
    } else {
        0.0
    };
    let conceded_90 = rate_per_90(stat.conceded, stat.minutes, stat.appearances);
    let pen_saved_90 = rate_per_90(stat.penalties_saved, stat.minutes, stat.appearances);

    let blended = k.save_pct * save_pct
        + k.conceded * (1.0 - clamp(conceded_90 / k.conceded_cap, 0.0, 1.0))
        + k.penalty_saves * clamp(pen_saved_90 / k.penalty_cap, 0.0, 1.0);

    (k.offense_base, 50.0 + 50.0 * blended)
}

/// Rates one player. Missing stats count as zero; a player with no recorded
/// minutes shrinks fully onto the neutral baseline.
pub fn rate_player(stat: &PlayerStatSnapshot, cfg: &RatingConfig) -> PlayerRating {
    let group = position_group(stat.position.as_deref());

    let (mut offense, mut defense) = match group {
        PositionGroup::Gk => keeper_scores(stat, cfg),
        PositionGroup::Fwd => (
            offense_score(stat, &cfg.fwd_offense),
            defense_score(stat, &cfg.fwd_defense),
        ),
        PositionGroup::Mid => (
            offense_score(stat, &cfg.mid_offense),
            defense_score(stat, &cfg.mid_defense),
        ),
        PositionGroup::Def => (
            offense_score(stat, &cfg.def_offense),
            defense_score(stat, &cfg.def_defense),
        ),
    };

    let discipline = clamp(
        1.0 - cfg.yellow_coef * stat.yellow_cards as f64 - cfg.red_coef * stat.red_cards as f64,
        cfg.discipline_floor,
        1.0,
    );
    offense *= discipline;
    defense *= discipline;

    let shrink = if stat.minutes == 0 {
        0.0
    } else {
        clamp(
            stat.minutes as f64 / cfg.shrink_full_minutes,
            cfg.shrink_floor,
            1.0,
        )
    };
    let neutral = cfg.neutral_score;
    PlayerRating {
        offense: neutral + (offense - neutral) * shrink,
        defense: neutral + (defense - neutral) * shrink,
        group,
        minutes: stat.minutes,
    }
}

/// Rates a whole squad, keyed by player id.
pub fn rate_squad(stats: &[PlayerStatSnapshot], cfg: &RatingConfig) -> HashMap<u64, PlayerRating> {
    let mut out = HashMap::with_capacity(stats.len());
    for stat in stats {
        out.insert(stat.player_id, rate_player(stat, cfg));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{position_group, rate_player, PositionGroup};
    use crate::config::RatingConfig;
    use crate::types::PlayerStatSnapshot;

    fn striker(minutes: u32, goals: u32) -> PlayerStatSnapshot {
        PlayerStatSnapshot {
            player_id: 9,
            position: Some("Attacker".to_string()),
            minutes,
            appearances: minutes / 90,
            goals,
            assists: 3,
            shots_on: 25,
            key_passes: 12,
            ..Default::default()
        }
    }

    #[test]
    fn position_groups_cover_provider_labels() {
        assert_eq!(position_group(Some("Goalkeeper")), PositionGroup::Gk);
        assert_eq!(position_group(Some("Defender")), PositionGroup::Def);
        assert_eq!(position_group(Some("Midfielder")), PositionGroup::Mid);
        assert_eq!(position_group(Some("Attacker")), PositionGroup::Fwd);
        assert_eq!(position_group(Some("LW")), PositionGroup::Fwd);
        assert_eq!(position_group(None), PositionGroup::Mid);
        assert_eq!(position_group(Some("???")), PositionGroup::Mid);
    }

    #[test]
    fn zero_minutes_shrinks_fully_to_neutral() {
        let cfg = RatingConfig::default();
        let stat = PlayerStatSnapshot {
            player_id: 1,
            position: Some("Attacker".to_string()),
            goals: 10,
            appearances: 4,
            ..Default::default()
        };
        let r = rate_player(&stat, &cfg);
        assert_eq!(r.offense, 50.0);
        assert_eq!(r.defense, 50.0);
    }

    #[test]
    fn prolific_forward_outrates_a_quiet_one() {
        let cfg = RatingConfig::default();
        let hot = rate_player(&striker(1800, 15), &cfg);
        let cold = rate_player(&striker(1800, 1), &cfg);
        assert!(hot.offense > cold.offense);
        assert!(hot.offense > 50.0);
    }

    #[test]
    fn discipline_penalty_is_floored() {
        let cfg = RatingConfig::default();
        let mut stat = striker(1800, 15);
        stat.yellow_cards = 20;
        stat.red_cards = 5;
        let dirty = rate_player(&stat, &cfg);
        let clean = rate_player(&striker(1800, 15), &cfg);
        // 1800 minutes means no shrink, so the floored penalty is exactly 0.85.
        assert!((dirty.offense - clean.offense * 0.85).abs() < 1e-9);
        assert!((dirty.defense - clean.defense * 0.85).abs() < 1e-9);
    }

    #[test]
    fn keeper_defense_reflects_save_percentage() {
        let cfg = RatingConfig::default();
        let wall = PlayerStatSnapshot {
            player_id: 1,
            position: Some("Goalkeeper".to_string()),
            minutes: 1800,
            appearances: 20,
            saves: 80,
            conceded: 20,
            ..Default::default()
        };
        let sieve = PlayerStatSnapshot {
            player_id: 2,
            position: Some("Goalkeeper".to_string()),
            minutes: 1800,
            appearances: 20,
            saves: 20,
            conceded: 40,
            ..Default::default()
        };
        let a = rate_player(&wall, &cfg);
        let b = rate_player(&sieve, &cfg);
        assert!(a.defense > b.defense);
        assert!(a.offense < 50.0); // keepers carry near-zero offense
    }

    #[test]
    fn appearance_fallback_applies_without_minutes() {
        // No minutes recorded but real appearances: rates come from
        // per-appearance counts, yet the zero-minute shrink still neutralizes
        // the final score.
        let cfg = RatingConfig::default();
        let stat = PlayerStatSnapshot {
            player_id: 3,
            position: Some("Midfielder".to_string()),
            appearances: 10,
            goals: 5,
            key_passes: 20,
            ..Default::default()
        };
        let r = rate_player(&stat, &cfg);
        assert_eq!(r.offense, 50.0);
        assert_eq!(r.defense, 50.0);
    }
}
