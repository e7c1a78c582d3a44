//! Engine coefficients, externalized so recalibration never needs a code change.
//!
//! Every number that shapes the prediction — position weight tables, modifier
//! bounds, the Dixon-Coles factor, blend anchors — lives here with a documented
//! default. `EngineConfig::default()` reproduces the reference behaviour.

/// Per-90 weight vector for an outfield offense score.
#[derive(Debug, Clone, Copy)]
pub struct OffenseWeights {
    pub goals: f64,
    pub assists: f64,
    pub shots_on: f64,
    pub key_passes: f64,
    pub dribbles: f64,
    /// Raw weighted sum is divided by this before mapping onto 0..100.
    pub scale: f64,
}

/// Per-90 weight vector for an outfield defense score.
#[derive(Debug, Clone, Copy)]
pub struct DefenseWeights {
    pub tackles: f64,
    pub interceptions: f64,
    pub blocks: f64,
    /// Applied to duels-per-90 × duel win rate.
    pub duels: f64,
    pub scale: f64,
}

/// Goalkeeper defense blend. Offense for keepers is a flat base.
#[derive(Debug, Clone, Copy)]
pub struct KeeperWeights {
    pub save_pct: f64,
    pub conceded: f64,
    pub penalty_saves: f64,
    /// Goals-conceded-per-90 considered "fully bad".
    pub conceded_cap: f64,
    /// Penalty-saves-per-90 considered "fully good".
    pub penalty_cap: f64,
    pub offense_base: f64,
}

#[derive(Debug, Clone)]
pub struct RatingConfig {
    pub fwd_offense: OffenseWeights,
    pub fwd_defense: DefenseWeights,
    pub mid_offense: OffenseWeights,
    pub mid_defense: DefenseWeights,
    pub def_offense: OffenseWeights,
    pub def_defense: DefenseWeights,
    pub keeper: KeeperWeights,
    /// Discipline penalty: 1 − yellow_coef·yellows − red_coef·reds, floored.
    pub yellow_coef: f64,
    pub red_coef: f64,
    pub discipline_floor: f64,
    /// Minutes at which a rating stops being shrunk toward neutral.
    pub shrink_full_minutes: f64,
    pub shrink_floor: f64,
    pub neutral_score: f64,
}

/// Position weights for aggregating a lineup into a team profile.
#[derive(Debug, Clone, Copy)]
pub struct PositionWeight {
    pub offense: f64,
    pub defense: f64,
}

#[derive(Debug, Clone)]
pub struct TeamProfileConfig {
    pub keeper: PositionWeight,
    pub defender: PositionWeight,
    pub midfielder: PositionWeight,
    pub forward: PositionWeight,
    /// Used when no lineup player resolves to a rating.
    pub fallback_score: f64,
    pub clamp_lo: f64,
    pub clamp_hi: f64,
    /// Weight of the lineup-derived profile; the rest comes from season stats.
    pub lineup_blend: f64,
    /// Assumed goals-for/against average when season stats are missing.
    pub default_goals_avg: f64,
}

#[derive(Debug, Clone)]
pub struct ModifierConfig {
    pub lineup_medium: f64,
    pub lineup_low: f64,
    /// Minutes-to-kickoff threshold separating "medium" from "low" confidence.
    pub lineup_medium_window_min: i64,
    pub form_lo: f64,
    pub form_hi: f64,
    pub formation_shift: f64,
    pub two_leg_window_days: i64,
    pub two_leg_boost_per_goal: f64,
    pub two_leg_max_boost: f64,
    pub two_leg_leading: f64,
    pub referee_lo: f64,
    pub referee_hi: f64,
    pub referee_min_matches: u32,
    /// Cards-per-match band mapped onto the referee factor range.
    pub referee_cards_calm: f64,
    pub referee_cards_strict: f64,
    pub referee_fouls_calm: f64,
    pub referee_fouls_strict: f64,
    pub tempo_lo: f64,
    pub tempo_hi: f64,
    pub tempo_min_matches: u32,
    pub tempo_shots_slow: f64,
    pub tempo_shots_fast: f64,
    pub tempo_possession_low: f64,
    pub tempo_possession_high: f64,
    pub tempo_intensity_slow: f64,
    pub tempo_intensity_fast: f64,
    pub rest_fatigued_days: i64,
    pub rest_fatigued: f64,
    pub rest_fresh_min_days: i64,
    pub rest_fresh_max_days: i64,
    pub rest_fresh: f64,
    pub set_piece_min_edge: f64,
    pub set_piece_per_corner: f64,
    pub set_piece_max: f64,
}

#[derive(Debug, Clone)]
pub struct MatrixConfig {
    /// Low-score correction applied to (0,0),(1,0),(0,1),(1,1).
    pub dc_factor: f64,
    /// When set, the correction grows as combined λ falls below the league norm.
    pub dc_league_aware: bool,
    pub dc_league_aware_span: f64,
    pub h2h_boost: f64,
    pub h2h_recent: usize,
    pub h2h_min_meetings: usize,
    pub h2h_low_avg: f64,
    pub h2h_low_total: u32,
    pub h2h_low_count: usize,
}

#[derive(Debug, Clone)]
pub struct MarketConfig {
    /// Blend weight on the model at/inside `alpha_near_minutes` to kickoff.
    pub alpha_near: f64,
    /// Blend weight on the model at/beyond `alpha_far_minutes` to kickoff.
    pub alpha_far: f64,
    pub alpha_near_minutes: f64,
    pub alpha_far_minutes: f64,
    /// Re-normalize the blended 1X2 triple so it sums to 1. The upstream
    /// behaviour this engine replaces clamped each outcome independently and
    /// could leave the triple off 1.0; keep `false` to reproduce that.
    pub renormalize_blended_1x2: bool,
    pub min_decimal_odds: f64,
    pub calibration_scale_lo: f64,
    pub calibration_scale_hi: f64,
    pub calibration_iterations: u32,
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub rating: RatingConfig,
    pub team: TeamProfileConfig,
    pub modifiers: ModifierConfig,
    pub matrix: MatrixConfig,
    pub market: MarketConfig,
    pub lambda_min: f64,
    pub lambda_max: f64,
    pub top_scorelines: usize,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            fwd_offense: OffenseWeights {
                goals: 0.45,
                assists: 0.20,
                shots_on: 0.15,
                key_passes: 0.12,
                dribbles: 0.08,
                scale: 1.2,
            },
            fwd_defense: DefenseWeights {
                tackles: 0.35,
                interceptions: 0.25,
                blocks: 0.15,
                duels: 0.25,
                scale: 1.0,
            },
            mid_offense: OffenseWeights {
                goals: 0.25,
                assists: 0.25,
                shots_on: 0.15,
                key_passes: 0.20,
                dribbles: 0.15,
                scale: 0.9,
            },
            mid_defense: DefenseWeights {
                tackles: 0.30,
                interceptions: 0.30,
                blocks: 0.15,
                duels: 0.25,
                scale: 1.2,
            },
            def_offense: OffenseWeights {
                goals: 0.0,
                assists: 0.15,
                shots_on: 0.10,
                key_passes: 0.15,
                dribbles: 0.20,
                scale: 0.6,
            },
            def_defense: DefenseWeights {
                tackles: 0.35,
                interceptions: 0.35,
                blocks: 0.15,
                duels: 0.15,
                scale: 1.4,
            },
            keeper: KeeperWeights {
                save_pct: 0.7,
                conceded: 0.2,
                penalty_saves: 0.1,
                conceded_cap: 2.0,
                penalty_cap: 0.2,
                offense_base: 20.0,
            },
            yellow_coef: 0.02,
            red_coef: 0.08,
            discipline_floor: 0.85,
            shrink_full_minutes: 540.0,
            shrink_floor: 0.35,
            neutral_score: 50.0,
        }
    }
}

impl Default for TeamProfileConfig {
    fn default() -> Self {
        Self {
            keeper: PositionWeight {
                offense: 0.0,
                defense: 1.0,
            },
            defender: PositionWeight {
                offense: 0.3,
                defense: 0.9,
            },
            midfielder: PositionWeight {
                offense: 0.6,
                defense: 0.6,
            },
            forward: PositionWeight {
                offense: 1.0,
                defense: 0.4,
            },
            fallback_score: 80.0,
            clamp_lo: 20.0,
            clamp_hi: 180.0,
            lineup_blend: 0.6,
            default_goals_avg: 1.3,
        }
    }
}

impl Default for ModifierConfig {
    fn default() -> Self {
        Self {
            lineup_medium: 0.97,
            lineup_low: 0.94,
            lineup_medium_window_min: 90,
            form_lo: 0.8,
            form_hi: 1.2,
            formation_shift: 0.02,
            two_leg_window_days: 45,
            two_leg_boost_per_goal: 0.04,
            two_leg_max_boost: 0.12,
            two_leg_leading: 0.97,
            referee_lo: 0.92,
            referee_hi: 1.02,
            referee_min_matches: 5,
            referee_cards_calm: 3.0,
            referee_cards_strict: 6.0,
            referee_fouls_calm: 18.0,
            referee_fouls_strict: 30.0,
            tempo_lo: 0.94,
            tempo_hi: 1.06,
            tempo_min_matches: 3,
            tempo_shots_slow: 8.0,
            tempo_shots_fast: 18.0,
            tempo_possession_low: 40.0,
            tempo_possession_high: 60.0,
            tempo_intensity_slow: 2.0,
            tempo_intensity_fast: 3.4,
            rest_fatigued_days: 2,
            rest_fatigued: 0.96,
            rest_fresh_min_days: 7,
            rest_fresh_max_days: 10,
            rest_fresh: 1.01,
            set_piece_min_edge: 1.0,
            set_piece_per_corner: 0.02,
            set_piece_max: 1.04,
        }
    }
}

impl Default for MatrixConfig {
    fn default() -> Self {
        Self {
            dc_factor: 1.06,
            dc_league_aware: false,
            dc_league_aware_span: 0.06,
            h2h_boost: 0.015,
            h2h_recent: 6,
            h2h_min_meetings: 3,
            h2h_low_avg: 1.8,
            h2h_low_total: 1,
            h2h_low_count: 3,
        }
    }
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            alpha_near: 0.55,
            alpha_far: 0.75,
            alpha_near_minutes: 20.0,
            alpha_far_minutes: 720.0,
            renormalize_blended_1x2: true,
            min_decimal_odds: 1.01,
            calibration_scale_lo: 0.6,
            calibration_scale_hi: 1.6,
            calibration_iterations: 16,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            rating: RatingConfig::default(),
            team: TeamProfileConfig::default(),
            modifiers: ModifierConfig::default(),
            matrix: MatrixConfig::default(),
            market: MarketConfig::default(),
            lambda_min: 0.2,
            lambda_max: 3.8,
            top_scorelines: 5,
        }
    }
}
