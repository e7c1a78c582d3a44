//! Prediction orchestrator.
//!
//! Takes one [`MatchSnapshot`] and produces a [`PredictionResult`]. Only a
//! structurally broken fixture header is an error; every other missing signal
//! degrades to its documented neutral default so a sparse snapshot still
//! yields a usable answer.

use chrono::Utc;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::league_baseline;
use crate::market;
use crate::modifiers::{self, ModifierContext};
use crate::outcomes;
use crate::ratings;
use crate::score_matrix::{self, ScoreMatrix, GOALS};
use crate::team_profile::{self, TeamRatingProfile};
use crate::types::{
    round1, round3, round6, AbsenceReport, CalibrationReport, MatchSnapshot, PredictionResult,
    ScorelineProb, TeamRatingOut, WinProbs, XiFactors,
};

/// Structural failures that make a prediction meaningless.
#[derive(Debug, Error)]
pub enum PredictError {
    #[error("fixture has no id")]
    MissingFixtureId,
    #[error("fixture {0} has no kickoff time")]
    MissingKickoff(u64),
    #[error("fixture {0} is missing a team id")]
    MissingTeamIds(u64),
}

struct SidePrep {
    current_xi: Vec<u64>,
    ideal_xi: Vec<u64>,
    formation: Option<String>,
    lineup_official: bool,
    profile: TeamRatingProfile,
    xi_offense: f64,
    xi_defense: f64,
}

fn prepare_side(
    players: &[crate::types::PlayerStatSnapshot],
    lineup: Option<&crate::types::LineupRecord>,
    stats: Option<&crate::types::TeamSeasonStats>,
    mu_league: f64,
    cfg: &EngineConfig,
) -> SidePrep {
    let player_ratings = ratings::rate_squad(players, &cfg.rating);
    let ideal_xi = team_profile::ideal_eleven(&player_ratings);

    let (current_xi, formation, lineup_official) = match lineup {
        Some(l) if !l.starters.is_empty() => (l.starters.clone(), l.formation.clone(), true),
        _ => (ideal_xi.clone(), None, false),
    };

    let current = team_profile::profile_from_lineup(&player_ratings, &current_xi, &cfg.team);
    let ideal = team_profile::profile_from_lineup(&player_ratings, &ideal_xi, &cfg.team);
    let season = team_profile::season_baseline_profile(stats, mu_league, &cfg.team);
    let profile = team_profile::blend(current, season, &cfg.team);

    let ratio = |cur: f64, best: f64| if best > 0.0 { cur / best } else { 1.0 };
    SidePrep {
        current_xi,
        ideal_xi,
        formation,
        lineup_official,
        profile,
        xi_offense: ratio(current.offense, ideal.offense),
        xi_defense: ratio(current.defense, ideal.defense),
    }
}

fn key_absentees(
    side: &SidePrep,
    injuries: &[crate::types::InjuryRecord],
) -> Vec<u64> {
    side.ideal_xi
        .iter()
        .filter(|id| !side.current_xi.contains(id))
        .filter(|id| injuries.iter().any(|i| i.player_id == **id))
        .copied()
        .collect()
}

fn clamp(v: f64, lo: f64, hi: f64) -> f64 {
    v.max(lo).min(hi)
}

/// Runs the full pipeline for one snapshot.
pub fn predict(
    snapshot: &MatchSnapshot,
    cfg: &EngineConfig,
) -> Result<PredictionResult, PredictError> {
    let fixture = &snapshot.fixture;
    let fixture_id = fixture.id.ok_or(PredictError::MissingFixtureId)?;
    let kickoff = fixture
        .kickoff_utc
        .ok_or(PredictError::MissingKickoff(fixture_id))?;
    let (home_id, away_id) = fixture
        .home_team_id
        .zip(fixture.away_team_id)
        .ok_or(PredictError::MissingTeamIds(fixture_id))?;

    let as_of = snapshot.as_of_utc.unwrap_or_else(Utc::now);
    tracing::info!(fixture_id, %kickoff, "predicting");

    let mu = snapshot
        .league_baseline
        .unwrap_or_else(league_baseline::fallback);

    let home_lineup = snapshot.lineups.iter().find(|l| l.team_id == home_id);
    let away_lineup = snapshot.lineups.iter().find(|l| l.team_id == away_id);

    // Both season baselines anchor on the league mean, not the per-venue μ:
    // an Offense of 100 means league-average scoring regardless of venue, and
    // home advantage enters once, through μ_home/μ_away in the base rates.
    let mu_league = (mu.mu_home + mu.mu_away) / 2.0;

    let home = prepare_side(
        &snapshot.home_players,
        home_lineup,
        snapshot.home_stats.as_ref(),
        mu_league,
        cfg,
    );
    let away = prepare_side(
        &snapshot.away_players,
        away_lineup,
        snapshot.away_stats.as_ref(),
        mu_league,
        cfg,
    );

    let lineup_confidence = modifiers::classify_lineup_confidence(
        home.lineup_official && away.lineup_official,
        as_of,
        kickoff,
        &cfg.modifiers,
    );

    // Base rates from the rating ratios, before any contextual adjustment.
    let base_home = mu.mu_home * (home.profile.offense / 100.0) * (100.0 / away.profile.defense);
    let base_away = mu.mu_away * (away.profile.offense / 100.0) * (100.0 / home.profile.defense);

    let ctx = ModifierContext {
        kickoff_utc: kickoff,
        lineup_confidence,
        home_team_id: home_id,
        away_team_id: away_id,
        league_id: fixture.league_id,
        home_formation: home.formation.as_deref(),
        away_formation: away.formation.as_deref(),
        home_stats: snapshot.home_stats.as_ref(),
        away_stats: snapshot.away_stats.as_ref(),
        head_to_head: &snapshot.head_to_head,
        referee: snapshot.referee_history.as_ref(),
        home_tempo: snapshot.home_tempo.as_ref(),
        away_tempo: snapshot.away_tempo.as_ref(),
        home_last_completed_utc: snapshot.home_last_completed_utc,
        away_last_completed_utc: snapshot.away_last_completed_utc,
        home_corners_avg: snapshot.home_corners_avg,
        away_corners_avg: snapshot.away_corners_avg,
    };
    let pipeline = modifiers::apply_pipeline(&ctx, &cfg.modifiers);

    let mut lambda_home = clamp(
        base_home * pipeline.factor_home,
        cfg.lambda_min,
        cfg.lambda_max,
    );
    let mut lambda_away = clamp(
        base_away * pipeline.factor_away,
        cfg.lambda_min,
        cfg.lambda_max,
    );

    // Market views, when odds exist.
    let market_1x2 = market::implied_one_x_two(&snapshot.odds, &cfg.market);
    let market_over25 = market::implied_over25(&snapshot.odds, &cfg.market);

    let calibration = market_over25.map(|target| {
        let out = market::calibrate_lambdas(
            lambda_home,
            lambda_away,
            target,
            cfg.lambda_min,
            cfg.lambda_max,
            &cfg.market,
            &cfg.matrix,
        );
        lambda_home = out.lambda_home;
        lambda_away = out.lambda_away;
        CalibrationReport {
            scale: out.scale,
            target_over25: target,
            achieved_over25: out.achieved_over25,
        }
    });

    let mut matrix = ScoreMatrix::from_lambdas(lambda_home, lambda_away, &cfg.matrix);

    let h2h_low_boost_applied =
        score_matrix::h2h_low_scoring(&snapshot.head_to_head, home_id, away_id, &cfg.matrix);
    if h2h_low_boost_applied {
        matrix.boost_low_scores(cfg.matrix.h2h_boost);
    }

    let model_1x2 = outcomes::one_x_two(&matrix);
    let btts = outcomes::btts_yes(&matrix);
    let (over25, under25) = outcomes::over_under_25(&matrix);
    let top = outcomes::top_scorelines(&matrix, cfg.top_scorelines);

    let blended_1x2 = match market_1x2 {
        Some(market_probs) => {
            let minutes_out = (kickoff - as_of).num_minutes().max(0) as f64;
            let alpha = market::blend_alpha(minutes_out, &cfg.market);
            market::blend_one_x_two(model_1x2, market_probs, alpha, &cfg.market)
        }
        None => model_1x2,
    };

    let absences = AbsenceReport {
        home_injury_count: snapshot.home_injuries.len(),
        away_injury_count: snapshot.away_injuries.len(),
        home_key_out: key_absentees(&home, &snapshot.home_injuries),
        away_key_out: key_absentees(&away, &snapshot.away_injuries),
    };

    let round_probs = |p: WinProbs| WinProbs {
        home: round3(p.home),
        draw: round3(p.draw),
        away: round3(p.away),
    };

    Ok(PredictionResult {
        fixture_id,
        as_of_utc: as_of,
        kickoff_utc: kickoff,
        league_id: fixture.league_id,
        season: fixture.season,
        mu_home: round3(mu.mu_home),
        mu_away: round3(mu.mu_away),
        lambda_home: round3(lambda_home),
        lambda_away: round3(lambda_away),
        home_rating: TeamRatingOut {
            offense: round1(home.profile.offense),
            defense: round1(home.profile.defense),
        },
        away_rating: TeamRatingOut {
            offense: round1(away.profile.offense),
            defense: round1(away.profile.defense),
        },
        win_probs_model: round_probs(model_1x2),
        win_probs_blended: round_probs(blended_1x2),
        btts_yes: round3(btts),
        over25: round3(over25),
        under25: round3(under25),
        top_scores: top
            .into_iter()
            .map(|s| ScorelineProb {
                prob: round3(s.prob),
                ..s
            })
            .collect(),
        score_matrix: (0..GOALS)
            .map(|h| (0..GOALS).map(|a| round6(matrix.cell(h, a))).collect())
            .collect(),
        lineup_confidence,
        modifiers: pipeline.applied,
        h2h_low_boost_applied,
        xi_factors: XiFactors {
            home_offense: round3(home.xi_offense),
            home_defense: round3(home.xi_defense),
            away_offense: round3(away.xi_offense),
            away_defense: round3(away.xi_defense),
        },
        absences,
        market_1x2: market_1x2.map(round_probs),
        market_over25: market_over25.map(round3),
        calibration: calibration.map(|c| CalibrationReport {
            scale: round3(c.scale),
            target_over25: round3(c.target_over25),
            achieved_over25: round3(c.achieved_over25),
        }),
        provider_prediction: snapshot.provider_prediction.clone(),
    })
}
