//! Ordered multiplicative adjustments to the two expected-goal rates.
//!
//! Each modifier is a pure function of the prediction context: it inspects one
//! signal, returns a bounded factor per side and the raw value it saw, and
//! yields the neutral 1.0 whenever its signal is absent. No modifier may fail;
//! a missing signal is a valid input. The full audit trail is kept on the
//! result so any λ can be explained after the fact.

use chrono::{DateTime, Utc};

use crate::config::ModifierConfig;
use crate::types::{
    AppliedModifier, HeadToHeadRecord, LineupConfidence, RefereeHistoryRecord, TeamSeasonStats,
    TeamTempoRecord,
};

/// Read-only view of every signal the pipeline may consult.
#[derive(Debug, Clone, Copy)]
pub struct ModifierContext<'a> {
    pub kickoff_utc: DateTime<Utc>,
    pub lineup_confidence: LineupConfidence,
    pub home_team_id: u64,
    pub away_team_id: u64,
    pub league_id: Option<u32>,
    pub home_formation: Option<&'a str>,
    pub away_formation: Option<&'a str>,
    pub home_stats: Option<&'a TeamSeasonStats>,
    pub away_stats: Option<&'a TeamSeasonStats>,
    pub head_to_head: &'a [HeadToHeadRecord],
    pub referee: Option<&'a RefereeHistoryRecord>,
    pub home_tempo: Option<&'a TeamTempoRecord>,
    pub away_tempo: Option<&'a TeamTempoRecord>,
    pub home_last_completed_utc: Option<DateTime<Utc>>,
    pub away_last_completed_utc: Option<DateTime<Utc>>,
    pub home_corners_avg: Option<f64>,
    pub away_corners_avg: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub factor_home: f64,
    pub factor_away: f64,
    pub applied: Vec<AppliedModifier>,
}

type Modifier = fn(&ModifierContext<'_>, &ModifierConfig) -> AppliedModifier;

/// Pipeline order. The product is order-independent; the audit trail is not.
const PIPELINE: &[Modifier] = &[
    lineup_confidence_modifier,
    team_form,
    formation_profile,
    two_leg_context,
    referee_tempo,
    team_tempo,
    rest_profile,
    set_piece_edge,
];

/// Runs every modifier and multiplies the per-side factors together.
pub fn apply_pipeline(ctx: &ModifierContext<'_>, cfg: &ModifierConfig) -> PipelineOutcome {
    let mut factor_home = 1.0;
    let mut factor_away = 1.0;
    let mut applied = Vec::with_capacity(PIPELINE.len());

    for modifier in PIPELINE {
        let m = modifier(ctx, cfg);
        factor_home *= m.factor_home;
        factor_away *= m.factor_away;
        if !m.is_neutral() {
            tracing::debug!(
                name = m.name,
                factor_home = m.factor_home,
                factor_away = m.factor_away,
                "modifier applied"
            );
        }
        applied.push(m);
    }

    PipelineOutcome {
        factor_home,
        factor_away,
        applied,
    }
}

/// Classifies lineup certainty: "high" when both official lineups are known
/// pre-kickoff, "medium" when kickoff is close enough that lineups should
/// exist but do not, "low" otherwise.
pub fn classify_lineup_confidence(
    both_lineups_known: bool,
    as_of: DateTime<Utc>,
    kickoff: DateTime<Utc>,
    cfg: &ModifierConfig,
) -> LineupConfidence {
    if both_lineups_known && kickoff > as_of {
        LineupConfidence::High
    } else if (kickoff - as_of).num_minutes() < cfg.lineup_medium_window_min {
        LineupConfidence::Medium
    } else {
        LineupConfidence::Low
    }
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Linear position of `v` inside [lo, hi], clamped to [0, 1].
fn unit_band(v: f64, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return 0.5;
    }
    clamp((v - lo) / (hi - lo), 0.0, 1.0)
}

fn lineup_confidence_modifier(ctx: &ModifierContext<'_>, cfg: &ModifierConfig) -> AppliedModifier {
    let factor = match ctx.lineup_confidence {
        LineupConfidence::High => 1.0,
        LineupConfidence::Medium => cfg.lineup_medium,
        LineupConfidence::Low => cfg.lineup_low,
    };
    AppliedModifier {
        name: "lineup_confidence",
        raw_home: None,
        raw_away: None,
        factor_home: factor,
        factor_away: factor,
        note: Some(
            match ctx.lineup_confidence {
                LineupConfidence::High => "high",
                LineupConfidence::Medium => "medium",
                LineupConfidence::Low => "low",
            }
            .to_string(),
        ),
    }
}

/// Recent attack/defense form multipliers from the season stats, when the
/// provider supplies them. A strong opposing defensive form suppresses the
/// attacking side's rate and vice versa.
fn team_form(ctx: &ModifierContext<'_>, cfg: &ModifierConfig) -> AppliedModifier {
    let att = |s: Option<&TeamSeasonStats>| s.and_then(|s| s.form_attack);
    let def = |s: Option<&TeamSeasonStats>| s.and_then(|s| s.form_defense);

    let home_att = att(ctx.home_stats);
    let away_att = att(ctx.away_stats);
    let home_def = def(ctx.home_stats);
    let away_def = def(ctx.away_stats);

    if home_att.is_none() && away_att.is_none() && home_def.is_none() && away_def.is_none() {
        return AppliedModifier::neutral("team_form");
    }

    let bound = |v: Option<f64>| clamp(v.unwrap_or(1.0), cfg.form_lo, cfg.form_hi);
    let factor_home = bound(home_att) / bound(away_def);
    let factor_away = bound(away_att) / bound(home_def);

    AppliedModifier {
        name: "team_form",
        raw_home: home_att,
        raw_away: away_att,
        factor_home,
        factor_away,
        note: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Defensive,
    Balanced,
    Attacking,
}

/// Reads a named formation like "4-3-3" or "5-4-1" into a rough shape class.
fn classify_formation(raw: &str) -> Option<Shape> {
    let bands: Vec<u32> = raw
        .split('-')
        .map(str::trim)
        .map(str::parse)
        .collect::<Result<_, _>>()
        .ok()?;
    if bands.len() < 2 || bands.iter().sum::<u32>() > 10 {
        return None;
    }
    let defenders = bands[0];
    let forwards = *bands.last().unwrap_or(&0);
    Some(if defenders >= 5 || forwards == 0 {
        Shape::Defensive
    } else if forwards >= 3 {
        Shape::Attacking
    } else {
        Shape::Balanced
    })
}

fn shape_label(s: Option<Shape>) -> &'static str {
    match s {
        Some(Shape::Defensive) => "defensive",
        Some(Shape::Attacking) => "attacking",
        Some(Shape::Balanced) => "balanced",
        None => "unknown",
    }
}

/// A team's own attacking shape nudges its rate up; a defensive-shaped
/// opponent nudges it down. Bounded to ±2% per effect.
fn formation_profile(ctx: &ModifierContext<'_>, cfg: &ModifierConfig) -> AppliedModifier {
    let home = ctx.home_formation.and_then(classify_formation);
    let away = ctx.away_formation.and_then(classify_formation);
    if home.is_none() && away.is_none() {
        return AppliedModifier::neutral("formation");
    }

    let shift = cfg.formation_shift;
    let own = |shape: Option<Shape>| match shape {
        Some(Shape::Attacking) => 1.0 + shift,
        _ => 1.0,
    };
    let opponent = |shape: Option<Shape>| match shape {
        Some(Shape::Defensive) => 1.0 - shift,
        _ => 1.0,
    };

    AppliedModifier {
        name: "formation",
        raw_home: None,
        raw_away: None,
        factor_home: own(home) * opponent(away),
        factor_away: own(away) * opponent(home),
        note: Some(format!(
            "home={} away={}",
            shape_label(home),
            shape_label(away)
        )),
    }
}

/// Best-effort second-leg detection: a finished reverse fixture between the
/// same two sides, in the same competition when both league ids are known,
/// inside a short window before kickoff. The side trailing on aggregate gets
/// a chase boost scaled by the deficit; the leader sits back slightly.
fn two_leg_context(ctx: &ModifierContext<'_>, cfg: &ModifierConfig) -> AppliedModifier {
    let window = chrono::Duration::days(cfg.two_leg_window_days);
    let first_leg = ctx.head_to_head.iter().find(|h| {
        if !h.finished
            || h.home_team_id != ctx.away_team_id
            || h.away_team_id != ctx.home_team_id
        {
            return false;
        }
        if let (Some(a), Some(b)) = (h.league_id, ctx.league_id) {
            if a != b {
                return false;
            }
        }
        match h.kickoff_utc {
            Some(k) => k < ctx.kickoff_utc && ctx.kickoff_utc - k <= window,
            None => false,
        }
    });

    let Some(leg) = first_leg else {
        return AppliedModifier::neutral("two_leg");
    };

    // First leg was played at the current away side's ground.
    let home_agg = leg.away_goals as i64;
    let away_agg = leg.home_goals as i64;
    let diff = home_agg - away_agg;
    if diff == 0 {
        let mut m = AppliedModifier::neutral("two_leg");
        m.note = Some("second leg, aggregate level".to_string());
        return m;
    }

    let boost = |deficit: i64| {
        1.0 + (cfg.two_leg_boost_per_goal * deficit as f64).min(cfg.two_leg_max_boost)
    };
    let (factor_home, factor_away) = if diff < 0 {
        (boost(-diff), cfg.two_leg_leading)
    } else {
        (cfg.two_leg_leading, boost(diff))
    };

    AppliedModifier {
        name: "two_leg",
        raw_home: Some(home_agg as f64),
        raw_away: Some(away_agg as f64),
        factor_home,
        factor_away,
        note: Some("second leg detected".to_string()),
    }
}

/// Card-happy, foul-heavy referees shave a little off both rates.
fn referee_tempo(ctx: &ModifierContext<'_>, cfg: &ModifierConfig) -> AppliedModifier {
    let Some(referee) = ctx.referee else {
        return AppliedModifier::neutral("referee_tempo");
    };
    if referee.matches < cfg.referee_min_matches {
        return AppliedModifier::neutral("referee_tempo");
    }

    let cards = referee.yellows_per_match + 2.0 * referee.reds_per_match;
    let mut strictness = unit_band(cards, cfg.referee_cards_calm, cfg.referee_cards_strict);
    if let Some(fouls) = referee.fouls_per_match {
        let foul_band = unit_band(fouls, cfg.referee_fouls_calm, cfg.referee_fouls_strict);
        strictness = 0.7 * strictness + 0.3 * foul_band;
    }

    let factor = cfg.referee_hi - (cfg.referee_hi - cfg.referee_lo) * strictness;
    AppliedModifier {
        name: "referee_tempo",
        raw_home: Some(cards),
        raw_away: Some(cards),
        factor_home: factor,
        factor_away: factor,
        note: None,
    }
}

fn tempo_score(record: &TeamTempoRecord, cfg: &ModifierConfig) -> Option<f64> {
    if record.matches < cfg.tempo_min_matches {
        return None;
    }
    let mut parts = Vec::with_capacity(3);
    if let Some(shots) = record.shots_per_match {
        parts.push(unit_band(shots, cfg.tempo_shots_slow, cfg.tempo_shots_fast));
    }
    if let Some(poss) = record.possession_pct {
        parts.push(unit_band(
            poss,
            cfg.tempo_possession_low,
            cfg.tempo_possession_high,
        ));
    }
    if let Some(intensity) = record.attack_intensity {
        parts.push(unit_band(
            intensity,
            cfg.tempo_intensity_slow,
            cfg.tempo_intensity_fast,
        ));
    }
    if parts.is_empty() {
        return None;
    }
    Some(parts.iter().sum::<f64>() / parts.len() as f64)
}

/// Per-side pace from recent shot volume / possession / attack intensity.
fn team_tempo(ctx: &ModifierContext<'_>, cfg: &ModifierConfig) -> AppliedModifier {
    let home = ctx.home_tempo.and_then(|t| tempo_score(t, cfg));
    let away = ctx.away_tempo.and_then(|t| tempo_score(t, cfg));
    if home.is_none() && away.is_none() {
        return AppliedModifier::neutral("team_tempo");
    }

    let factor = |score: Option<f64>| match score {
        Some(s) => cfg.tempo_lo + (cfg.tempo_hi - cfg.tempo_lo) * s,
        None => 1.0,
    };

    AppliedModifier {
        name: "team_tempo",
        raw_home: home,
        raw_away: away,
        factor_home: factor(home),
        factor_away: factor(away),
        note: None,
    }
}

fn rest_factor(days: i64, cfg: &ModifierConfig) -> f64 {
    if days <= cfg.rest_fatigued_days {
        cfg.rest_fatigued
    } else if days >= cfg.rest_fresh_min_days && days <= cfg.rest_fresh_max_days {
        cfg.rest_fresh
    } else {
        1.0
    }
}

/// Days since the last completed match: short turnarounds cost a little,
/// a full week of rest helps a little.
fn rest_profile(ctx: &ModifierContext<'_>, cfg: &ModifierConfig) -> AppliedModifier {
    let days = |last: Option<DateTime<Utc>>| {
        last.map(|l| (ctx.kickoff_utc - l).num_days())
            .filter(|d| *d >= 0)
    };
    let home_days = days(ctx.home_last_completed_utc);
    let away_days = days(ctx.away_last_completed_utc);
    if home_days.is_none() && away_days.is_none() {
        return AppliedModifier::neutral("rest");
    }

    AppliedModifier {
        name: "rest",
        raw_home: home_days.map(|d| d as f64),
        raw_away: away_days.map(|d| d as f64),
        factor_home: home_days.map_or(1.0, |d| rest_factor(d, cfg)),
        factor_away: away_days.map_or(1.0, |d| rest_factor(d, cfg)),
        note: None,
    }
}

/// A materially higher corner average earns a small boost; the other side
/// stays neutral.
fn set_piece_edge(ctx: &ModifierContext<'_>, cfg: &ModifierConfig) -> AppliedModifier {
    let (Some(home), Some(away)) = (ctx.home_corners_avg, ctx.away_corners_avg) else {
        return AppliedModifier::neutral("set_piece");
    };
    let diff = home - away;
    if diff.abs() < cfg.set_piece_min_edge {
        let mut m = AppliedModifier::neutral("set_piece");
        m.raw_home = Some(home);
        m.raw_away = Some(away);
        return m;
    }

    let boost = (1.0 + cfg.set_piece_per_corner * diff.abs()).min(cfg.set_piece_max);
    let (factor_home, factor_away) = if diff > 0.0 {
        (boost, 1.0)
    } else {
        (1.0, boost)
    };

    AppliedModifier {
        name: "set_piece",
        raw_home: Some(home),
        raw_away: Some(away),
        factor_home,
        factor_away,
        note: None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::{
        apply_pipeline, classify_formation, classify_lineup_confidence, ModifierContext, Shape,
    };
    use crate::config::ModifierConfig;
    use crate::types::{HeadToHeadRecord, LineupConfidence, RefereeHistoryRecord, TeamTempoRecord};

    fn kickoff() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 18, 19, 0, 0).unwrap()
    }

    fn bare_ctx(h2h: &[HeadToHeadRecord]) -> ModifierContext<'_> {
        ModifierContext {
            kickoff_utc: kickoff(),
            lineup_confidence: LineupConfidence::High,
            home_team_id: 10,
            away_team_id: 20,
            league_id: Some(39),
            home_formation: None,
            away_formation: None,
            home_stats: None,
            away_stats: None,
            head_to_head: h2h,
            referee: None,
            home_tempo: None,
            away_tempo: None,
            home_last_completed_utc: None,
            away_last_completed_utc: None,
            home_corners_avg: None,
            away_corners_avg: None,
        }
    }

    #[test]
    fn absent_signals_leave_the_pipeline_neutral() {
        let cfg = ModifierConfig::default();
        let out = apply_pipeline(&bare_ctx(&[]), &cfg);
        assert!((out.factor_home - 1.0).abs() < 1e-12);
        assert!((out.factor_away - 1.0).abs() < 1e-12);
        assert_eq!(out.applied.len(), 8);
    }

    #[test]
    fn low_lineup_confidence_costs_six_percent_on_both_sides() {
        let cfg = ModifierConfig::default();
        let mut ctx = bare_ctx(&[]);
        ctx.lineup_confidence = LineupConfidence::Low;
        let out = apply_pipeline(&ctx, &cfg);
        assert!((out.factor_home - 0.94).abs() < 1e-12);
        assert!((out.factor_away - 0.94).abs() < 1e-12);
    }

    #[test]
    fn lineup_confidence_classification_windows() {
        let cfg = ModifierConfig::default();
        let ko = kickoff();
        assert_eq!(
            classify_lineup_confidence(true, ko - Duration::hours(1), ko, &cfg),
            LineupConfidence::High
        );
        assert_eq!(
            classify_lineup_confidence(false, ko - Duration::minutes(30), ko, &cfg),
            LineupConfidence::Medium
        );
        assert_eq!(
            classify_lineup_confidence(false, ko - Duration::hours(8), ko, &cfg),
            LineupConfidence::Low
        );
    }

    #[test]
    fn formation_classes() {
        assert_eq!(classify_formation("4-3-3"), Some(Shape::Attacking));
        assert_eq!(classify_formation("5-4-1"), Some(Shape::Defensive));
        assert_eq!(classify_formation("4-4-2"), Some(Shape::Balanced));
        assert_eq!(classify_formation("4-2-3-1"), Some(Shape::Balanced));
        assert_eq!(classify_formation("lineup pending"), None);
    }

    #[test]
    fn second_leg_boosts_the_trailing_side() {
        let cfg = ModifierConfig::default();
        // First leg two weeks ago at the current away side's ground: 3-0.
        // Today's home side lost it, so they chase.
        let h2h = vec![HeadToHeadRecord {
            kickoff_utc: Some(kickoff() - Duration::days(14)),
            league_id: Some(39),
            season: Some(2025),
            home_team_id: 20,
            away_team_id: 10,
            home_goals: 3,
            away_goals: 0,
            finished: true,
        }];
        let ctx = bare_ctx(&h2h);
        let out = apply_pipeline(&ctx, &cfg);
        let two_leg = out
            .applied
            .iter()
            .find(|m| m.name == "two_leg")
            .expect("two_leg entry");
        assert!((two_leg.factor_home - 1.12).abs() < 1e-9); // capped at max boost
        assert!((two_leg.factor_away - 0.97).abs() < 1e-9);
    }

    #[test]
    fn old_reverse_fixture_is_not_a_second_leg() {
        let cfg = ModifierConfig::default();
        let h2h = vec![HeadToHeadRecord {
            kickoff_utc: Some(kickoff() - Duration::days(200)),
            league_id: Some(39),
            season: Some(2025),
            home_team_id: 20,
            away_team_id: 10,
            home_goals: 3,
            away_goals: 0,
            finished: true,
        }];
        let out = apply_pipeline(&bare_ctx(&h2h), &cfg);
        let two_leg = out.applied.iter().find(|m| m.name == "two_leg").unwrap();
        assert!(two_leg.is_neutral());
    }

    #[test]
    fn strict_referee_suppresses_both_sides_within_bounds() {
        let cfg = ModifierConfig::default();
        let referee = RefereeHistoryRecord {
            matches: 30,
            yellows_per_match: 6.5,
            reds_per_match: 0.4,
            fouls_per_match: Some(31.0),
        };
        let mut ctx = bare_ctx(&[]);
        ctx.referee = Some(&referee);
        let out = apply_pipeline(&ctx, &cfg);
        let m = out.applied.iter().find(|m| m.name == "referee_tempo").unwrap();
        assert!(m.factor_home >= 0.92 && m.factor_home < 1.0);
        assert_eq!(m.factor_home, m.factor_away);
    }

    #[test]
    fn thin_referee_sample_is_ignored() {
        let cfg = ModifierConfig::default();
        let referee = RefereeHistoryRecord {
            matches: 2,
            yellows_per_match: 9.0,
            reds_per_match: 1.0,
            fouls_per_match: None,
        };
        let mut ctx = bare_ctx(&[]);
        ctx.referee = Some(&referee);
        let out = apply_pipeline(&ctx, &cfg);
        assert!(out
            .applied
            .iter()
            .find(|m| m.name == "referee_tempo")
            .unwrap()
            .is_neutral());
    }

    #[test]
    fn fast_tempo_lifts_only_that_side() {
        let cfg = ModifierConfig::default();
        let fast = TeamTempoRecord {
            matches: 6,
            shots_per_match: Some(19.0),
            possession_pct: Some(62.0),
            attack_intensity: None,
        };
        let mut ctx = bare_ctx(&[]);
        ctx.home_tempo = Some(&fast);
        let out = apply_pipeline(&ctx, &cfg);
        let m = out.applied.iter().find(|m| m.name == "team_tempo").unwrap();
        assert!((m.factor_home - 1.06).abs() < 1e-9);
        assert!((m.factor_away - 1.0).abs() < 1e-12);
    }

    #[test]
    fn rest_bands() {
        let cfg = ModifierConfig::default();
        let mut ctx = bare_ctx(&[]);
        let two_days = kickoff() - Duration::days(2);
        let eight_days = kickoff() - Duration::days(8);
        ctx.home_last_completed_utc = Some(two_days);
        ctx.away_last_completed_utc = Some(eight_days);
        let out = apply_pipeline(&ctx, &cfg);
        let m = out.applied.iter().find(|m| m.name == "rest").unwrap();
        assert!((m.factor_home - 0.96).abs() < 1e-12);
        assert!((m.factor_away - 1.01).abs() < 1e-12);
    }

    #[test]
    fn corner_edge_boosts_one_side_only() {
        let cfg = ModifierConfig::default();
        let mut ctx = bare_ctx(&[]);
        ctx.home_corners_avg = Some(7.5);
        ctx.away_corners_avg = Some(4.0);
        let out = apply_pipeline(&ctx, &cfg);
        let m = out.applied.iter().find(|m| m.name == "set_piece").unwrap();
        assert!((m.factor_home - 1.04).abs() < 1e-9); // capped
        assert!((m.factor_away - 1.0).abs() < 1e-12);
    }
}
