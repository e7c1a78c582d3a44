//! Input snapshot shapes and the engine's serialized output.
//!
//! Everything the engine consumes arrives in a [`MatchSnapshot`], assembled by
//! the provider layer (or loaded from a captured JSON file). All fields beyond
//! the four fixture identifiers are optional: a missing signal degrades to a
//! documented neutral default, never to an error.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixture header as received from the provider. The engine validates the
/// four structural fields (id, kickoff, both team ids) and aborts without
/// them; everything else is best-effort.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FixtureRecord {
    pub id: Option<u64>,
    pub kickoff_utc: Option<DateTime<Utc>>,
    pub league_id: Option<u32>,
    pub season: Option<u32>,
    pub home_team_id: Option<u64>,
    pub away_team_id: Option<u64>,
    #[serde(default)]
    pub referee_name: Option<String>,
}

/// Team-level season aggregates.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamSeasonStats {
    pub goals_for_avg: Option<f64>,
    pub goals_against_avg: Option<f64>,
    /// Recent attacking form multiplier around 1.0, when the provider has one.
    #[serde(default)]
    pub form_attack: Option<f64>,
    #[serde(default)]
    pub form_defense: Option<f64>,
}

/// Per-player season aggregates. Missing stats are zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerStatSnapshot {
    pub player_id: u64,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub minutes: u32,
    #[serde(default)]
    pub appearances: u32,
    #[serde(default)]
    pub goals: u32,
    #[serde(default)]
    pub assists: u32,
    #[serde(default)]
    pub shots_on: u32,
    #[serde(default)]
    pub key_passes: u32,
    #[serde(default)]
    pub dribbles_success: u32,
    #[serde(default)]
    pub tackles: u32,
    #[serde(default)]
    pub interceptions: u32,
    #[serde(default)]
    pub blocks: u32,
    #[serde(default)]
    pub duels_total: u32,
    #[serde(default)]
    pub duels_won: u32,
    #[serde(default)]
    pub yellow_cards: u32,
    #[serde(default)]
    pub red_cards: u32,
    #[serde(default)]
    pub saves: u32,
    #[serde(default)]
    pub conceded: u32,
    #[serde(default)]
    pub penalties_saved: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LineupRecord {
    pub team_id: u64,
    #[serde(default)]
    pub formation: Option<String>,
    #[serde(default)]
    pub starters: Vec<u64>,
    #[serde(default)]
    pub bench: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjuryRecord {
    pub player_id: u64,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub reported_at: Option<DateTime<Utc>>,
}

/// One bookmaker's raw quotes, grouped by market name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BookmakerOdds {
    pub bookmaker: String,
    #[serde(default)]
    pub bets: Vec<MarketBet>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketBet {
    pub name: String,
    #[serde(default)]
    pub values: Vec<MarketQuote>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketQuote {
    pub label: String,
    pub odds: f64,
}

/// A past direct meeting between the two sides.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeadToHeadRecord {
    #[serde(default)]
    pub kickoff_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub league_id: Option<u32>,
    #[serde(default)]
    pub season: Option<u32>,
    pub home_team_id: u64,
    pub away_team_id: u64,
    #[serde(default)]
    pub home_goals: u32,
    #[serde(default)]
    pub away_goals: u32,
    #[serde(default)]
    pub finished: bool,
}

/// Aggregated card/foul rates over a referee's recent matches.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefereeHistoryRecord {
    pub matches: u32,
    pub yellows_per_match: f64,
    pub reds_per_match: f64,
    #[serde(default)]
    pub fouls_per_match: Option<f64>,
}

/// Recent-match pace signal for one team; any component may be missing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeamTempoRecord {
    pub matches: u32,
    #[serde(default)]
    pub shots_per_match: Option<f64>,
    #[serde(default)]
    pub possession_pct: Option<f64>,
    /// Combined goals per match in the team's recent fixtures — a coarse
    /// pace proxy when shot volume is unavailable.
    #[serde(default)]
    pub attack_intensity: Option<f64>,
}

/// League average home/away goals for the season window.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LeagueBaseline {
    pub mu_home: f64,
    pub mu_away: f64,
    pub sample_matches: usize,
}

/// Third-party prediction carried through verbatim for comparison output.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderPrediction {
    #[serde(default)]
    pub winner: Option<String>,
    #[serde(default)]
    pub win_or_draw: Option<bool>,
    #[serde(default)]
    pub under_over: Option<String>,
    #[serde(default)]
    pub advice: Option<String>,
    #[serde(default)]
    pub probs_1x2: Option<WinProbs>,
}

/// Everything the engine needs for one prediction, captured at `as_of_utc`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub as_of_utc: Option<DateTime<Utc>>,
    pub fixture: FixtureRecord,
    #[serde(default)]
    pub home_stats: Option<TeamSeasonStats>,
    #[serde(default)]
    pub away_stats: Option<TeamSeasonStats>,
    #[serde(default)]
    pub home_players: Vec<PlayerStatSnapshot>,
    #[serde(default)]
    pub away_players: Vec<PlayerStatSnapshot>,
    #[serde(default)]
    pub lineups: Vec<LineupRecord>,
    #[serde(default)]
    pub home_injuries: Vec<InjuryRecord>,
    #[serde(default)]
    pub away_injuries: Vec<InjuryRecord>,
    #[serde(default)]
    pub odds: Vec<BookmakerOdds>,
    #[serde(default)]
    pub head_to_head: Vec<HeadToHeadRecord>,
    #[serde(default)]
    pub referee_history: Option<RefereeHistoryRecord>,
    #[serde(default)]
    pub home_tempo: Option<TeamTempoRecord>,
    #[serde(default)]
    pub away_tempo: Option<TeamTempoRecord>,
    #[serde(default)]
    pub home_last_completed_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub away_last_completed_utc: Option<DateTime<Utc>>,
    #[serde(default)]
    pub home_corners_avg: Option<f64>,
    #[serde(default)]
    pub away_corners_avg: Option<f64>,
    #[serde(default)]
    pub league_baseline: Option<LeagueBaseline>,
    #[serde(default)]
    pub provider_prediction: Option<ProviderPrediction>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WinProbs {
    pub home: f64,
    pub draw: f64,
    pub away: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineupConfidence {
    High,
    Medium,
    Low,
}

/// One applied λ adjustment, kept for explainability.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedModifier {
    pub name: &'static str,
    /// Source signal per side, when the signal is numeric.
    pub raw_home: Option<f64>,
    pub raw_away: Option<f64>,
    pub factor_home: f64,
    pub factor_away: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl AppliedModifier {
    pub fn neutral(name: &'static str) -> Self {
        Self {
            name,
            raw_home: None,
            raw_away: None,
            factor_home: 1.0,
            factor_away: 1.0,
            note: None,
        }
    }

    pub fn is_neutral(&self) -> bool {
        self.factor_home == 1.0 && self.factor_away == 1.0
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScorelineProb {
    pub home_goals: u8,
    pub away_goals: u8,
    pub prob: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TeamRatingOut {
    pub offense: f64,
    pub defense: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub scale: f64,
    pub target_over25: f64,
    pub achieved_over25: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbsenceReport {
    pub home_injury_count: usize,
    pub away_injury_count: usize,
    /// Ideal-XI players missing from the current lineup and on the injury list.
    pub home_key_out: Vec<u64>,
    pub away_key_out: Vec<u64>,
}

/// Current-XI strength relative to the ideal XI, per side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct XiFactors {
    pub home_offense: f64,
    pub home_defense: f64,
    pub away_offense: f64,
    pub away_defense: f64,
}

/// The engine's complete answer for one fixture.
#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub fixture_id: u64,
    pub as_of_utc: DateTime<Utc>,
    pub kickoff_utc: DateTime<Utc>,
    pub league_id: Option<u32>,
    pub season: Option<u32>,
    pub mu_home: f64,
    pub mu_away: f64,
    pub lambda_home: f64,
    pub lambda_away: f64,
    pub home_rating: TeamRatingOut,
    pub away_rating: TeamRatingOut,
    pub win_probs_model: WinProbs,
    pub win_probs_blended: WinProbs,
    pub btts_yes: f64,
    pub over25: f64,
    pub under25: f64,
    pub top_scores: Vec<ScorelineProb>,
    /// Row = home goals 0..6, column = away goals 0..6.
    pub score_matrix: Vec<Vec<f64>>,
    pub lineup_confidence: LineupConfidence,
    pub modifiers: Vec<AppliedModifier>,
    pub h2h_low_boost_applied: bool,
    pub xi_factors: XiFactors,
    pub absences: AbsenceReport,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_1x2: Option<WinProbs>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_over25: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub calibration: Option<CalibrationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_prediction: Option<ProviderPrediction>,
}

/// Output rounding, applied only when building the serialized result.
pub fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

pub fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}
