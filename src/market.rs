//! Bookmaker odds parsing and the model/market blend.
//!
//! Per bookmaker: pick the right market by name, invert decimal odds to
//! implied probabilities and strip the overround by normalizing. Consensus is
//! the plain average across bookmakers that produced a complete set.

use crate::config::{MarketConfig, MatrixConfig};
use crate::outcomes;
use crate::score_matrix::ScoreMatrix;
use crate::types::{BookmakerOdds, MarketBet, WinProbs};

const MATCH_WINNER_ALLOW: &[&str] = &["match winner", "full time result", "1x2"];
const MATCH_WINNER_BLOCK: &[&str] = &[
    "qualify",
    "double chance",
    "draw no bet",
    "handicap",
    "asian",
    "half",
    "overtime",
    "extra time",
    "penalt",
];
const OVER_UNDER_ALLOW: &[&str] = &["goals over/under", "over/under", "total goals"];
const OVER_UNDER_BLOCK: &[&str] = &["1st", "2nd", "half", "corner", "card", "team", "asian"];

fn market_matches(name: &str, allow: &[&str], block: &[&str]) -> bool {
    let lower = name.to_ascii_lowercase();
    allow.iter().any(|k| lower.contains(k)) && !block.iter().any(|k| lower.contains(k))
}

fn find_market<'a>(
    bookmaker: &'a BookmakerOdds,
    allow: &[&str],
    block: &[&str],
) -> Option<&'a MarketBet> {
    bookmaker
        .bets
        .iter()
        .find(|bet| market_matches(&bet.name, allow, block))
}

fn quote(bet: &MarketBet, labels: &[&str], min_odds: f64) -> Option<f64> {
    bet.values
        .iter()
        .find(|v| {
            let l = v.label.trim().to_ascii_lowercase();
            labels.iter().any(|want| l == *want)
        })
        .map(|v| v.odds)
        .filter(|odds| *odds >= min_odds)
}

/// De-vigged 1X2 consensus across bookmakers. A bookmaker contributes only
/// when all three outcomes are quoted; returns `None` when no bookmaker does.
pub fn implied_one_x_two(odds: &[BookmakerOdds], cfg: &MarketConfig) -> Option<WinProbs> {
    let mut sum = WinProbs::default();
    let mut n = 0usize;

    for bookmaker in odds {
        let Some(bet) = find_market(bookmaker, MATCH_WINNER_ALLOW, MATCH_WINNER_BLOCK) else {
            continue;
        };
        let home = quote(bet, &["home", "1"], cfg.min_decimal_odds);
        let draw = quote(bet, &["draw", "x"], cfg.min_decimal_odds);
        let away = quote(bet, &["away", "2"], cfg.min_decimal_odds);
        let (Some(home), Some(draw), Some(away)) = (home, draw, away) else {
            continue;
        };

        let (h, d, a) = (1.0 / home, 1.0 / draw, 1.0 / away);
        let total = h + d + a;
        sum.home += h / total;
        sum.draw += d / total;
        sum.away += a / total;
        n += 1;
    }

    if n == 0 {
        return None;
    }
    Some(WinProbs {
        home: sum.home / n as f64,
        draw: sum.draw / n as f64,
        away: sum.away / n as f64,
    })
}

fn is_line_25(label: &str, side: &str) -> bool {
    let l = label.trim().to_ascii_lowercase();
    l.starts_with(side) && l.contains("2.5")
}

/// De-vigged Over-2.5 consensus. Both sides of the line must be quoted.
pub fn implied_over25(odds: &[BookmakerOdds], cfg: &MarketConfig) -> Option<f64> {
    let mut sum = 0.0;
    let mut n = 0usize;

    for bookmaker in odds {
        let Some(bet) = find_market(bookmaker, OVER_UNDER_ALLOW, OVER_UNDER_BLOCK) else {
            continue;
        };
        let over = bet
            .values
            .iter()
            .find(|v| is_line_25(&v.label, "over"))
            .map(|v| v.odds)
            .filter(|o| *o >= cfg.min_decimal_odds);
        let under = bet
            .values
            .iter()
            .find(|v| is_line_25(&v.label, "under"))
            .map(|v| v.odds)
            .filter(|o| *o >= cfg.min_decimal_odds);
        let (Some(over), Some(under)) = (over, under) else {
            continue;
        };

        let (o, u) = (1.0 / over, 1.0 / under);
        sum += o / (o + u);
        n += 1;
    }

    if n == 0 {
        return None;
    }
    Some(sum / n as f64)
}

/// Model weight for the 1X2 blend, linear in minutes to kickoff between the
/// near and far anchors. Close to kickoff the market knows more.
pub fn blend_alpha(minutes_to_kickoff: f64, cfg: &MarketConfig) -> f64 {
    if minutes_to_kickoff <= cfg.alpha_near_minutes {
        cfg.alpha_near
    } else if minutes_to_kickoff >= cfg.alpha_far_minutes {
        cfg.alpha_far
    } else {
        let t = (minutes_to_kickoff - cfg.alpha_near_minutes)
            / (cfg.alpha_far_minutes - cfg.alpha_near_minutes);
        cfg.alpha_near + (cfg.alpha_far - cfg.alpha_near) * t
    }
}

/// α·model + (1−α)·market, per outcome, clamped to [0, 1] and then
/// renormalized to a proper triple when configured.
pub fn blend_one_x_two(
    model: WinProbs,
    market: WinProbs,
    alpha: f64,
    cfg: &MarketConfig,
) -> WinProbs {
    let mix = |m: f64, k: f64| (alpha * m + (1.0 - alpha) * k).max(0.0).min(1.0);
    let mut out = WinProbs {
        home: mix(model.home, market.home),
        draw: mix(model.draw, market.draw),
        away: mix(model.away, market.away),
    };
    if cfg.renormalize_blended_1x2 {
        let total = out.home + out.draw + out.away;
        if total > 0.0 {
            out.home /= total;
            out.draw /= total;
            out.away /= total;
        }
    }
    out
}

/// Result of nudging both λs toward the market's total-goals view.
#[derive(Debug, Clone, Copy)]
pub struct CalibratedLambdas {
    pub lambda_home: f64,
    pub lambda_away: f64,
    pub scale: f64,
    pub achieved_over25: f64,
}

fn over25_at(
    lambda_home: f64,
    lambda_away: f64,
    scale: f64,
    lambda_min: f64,
    lambda_max: f64,
    matrix_cfg: &MatrixConfig,
) -> f64 {
    let clamp = |v: f64| v.max(lambda_min).min(lambda_max);
    let m = ScoreMatrix::from_lambdas(
        clamp(lambda_home * scale),
        clamp(lambda_away * scale),
        matrix_cfg,
    );
    outcomes::over_under_25(&m).0
}

/// Bisects a common λ scale so the corrected grid's Over-2.5 meets the market
/// target. The objective is monotone in the scale, so plain bisection
/// converges; λ clamps can flatten it at the edges, in which case the nearest
/// achievable probability wins.
pub fn calibrate_lambdas(
    lambda_home: f64,
    lambda_away: f64,
    target_over25: f64,
    lambda_min: f64,
    lambda_max: f64,
    cfg: &MarketConfig,
    matrix_cfg: &MatrixConfig,
) -> CalibratedLambdas {
    let mut lo = cfg.calibration_scale_lo;
    let mut hi = cfg.calibration_scale_hi;

    let eval = |scale: f64| {
        over25_at(
            lambda_home,
            lambda_away,
            scale,
            lambda_min,
            lambda_max,
            matrix_cfg,
        )
    };

    // Target outside the reachable band: take the boundary.
    if eval(lo) >= target_over25 {
        hi = lo;
    } else if eval(hi) <= target_over25 {
        lo = hi;
    } else {
        for _ in 0..cfg.calibration_iterations {
            let mid = 0.5 * (lo + hi);
            if eval(mid) < target_over25 {
                lo = mid;
            } else {
                hi = mid;
            }
        }
    }

    let scale = 0.5 * (lo + hi);
    let clamp = |v: f64| v.max(lambda_min).min(lambda_max);
    CalibratedLambdas {
        lambda_home: clamp(lambda_home * scale),
        lambda_away: clamp(lambda_away * scale),
        scale,
        achieved_over25: eval(scale),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        blend_alpha, blend_one_x_two, calibrate_lambdas, implied_one_x_two, implied_over25,
    };
    use crate::config::{MarketConfig, MatrixConfig};
    use crate::types::{BookmakerOdds, MarketBet, MarketQuote, WinProbs};

    fn quote(label: &str, odds: f64) -> MarketQuote {
        MarketQuote {
            label: label.to_string(),
            odds,
        }
    }

    fn bookmaker(name: &str, bets: Vec<MarketBet>) -> BookmakerOdds {
        BookmakerOdds {
            bookmaker: name.to_string(),
            bets,
        }
    }

    #[test]
    fn de_vig_removes_the_overround() {
        let cfg = MarketConfig::default();
        let odds = vec![bookmaker(
            "bet365",
            vec![MarketBet {
                name: "Match Winner".to_string(),
                values: vec![quote("Home", 2.0), quote("Draw", 3.5), quote("Away", 4.0)],
            }],
        )];
        let p = implied_one_x_two(&odds, &cfg).unwrap();
        assert!((p.home + p.draw + p.away - 1.0).abs() < 1e-12);
        // 1/2.0 dominates the book, so home stays the largest share.
        assert!(p.home > p.draw && p.home > p.away);
    }

    #[test]
    fn blocked_market_names_are_skipped() {
        let cfg = MarketConfig::default();
        let odds = vec![bookmaker(
            "bet365",
            vec![MarketBet {
                name: "1x2 - First Half".to_string(),
                values: vec![quote("Home", 2.0), quote("Draw", 3.5), quote("Away", 4.0)],
            }],
        )];
        assert!(implied_one_x_two(&odds, &cfg).is_none());
    }

    #[test]
    fn incomplete_books_do_not_contribute() {
        let cfg = MarketConfig::default();
        let odds = vec![bookmaker(
            "partial",
            vec![MarketBet {
                name: "Match Winner".to_string(),
                values: vec![quote("Home", 2.0), quote("Away", 4.0)],
            }],
        )];
        assert!(implied_one_x_two(&odds, &cfg).is_none());
    }

    #[test]
    fn over25_needs_both_sides_of_the_line() {
        let cfg = MarketConfig::default();
        let both = vec![bookmaker(
            "bet365",
            vec![MarketBet {
                name: "Goals Over/Under".to_string(),
                values: vec![
                    quote("Over 2.5", 1.8),
                    quote("Under 2.5", 2.0),
                    quote("Over 3.5", 3.2),
                ],
            }],
        )];
        let p = implied_over25(&both, &cfg).unwrap();
        // 1/1.8 vs 1/2.0: over holds slightly more implied mass.
        assert!(p > 0.5 && p < 0.6);

        let one_sided = vec![bookmaker(
            "thin",
            vec![MarketBet {
                name: "Goals Over/Under".to_string(),
                values: vec![quote("Over 2.5", 1.8)],
            }],
        )];
        assert!(implied_over25(&one_sided, &cfg).is_none());
    }

    #[test]
    fn alpha_interpolates_between_anchors() {
        let cfg = MarketConfig::default();
        assert_eq!(blend_alpha(5.0, &cfg), 0.55);
        assert_eq!(blend_alpha(2000.0, &cfg), 0.75);
        let mid = blend_alpha(370.0, &cfg);
        assert!(mid > 0.55 && mid < 0.75);
    }

    #[test]
    fn blended_triple_sums_to_one() {
        let cfg = MarketConfig::default();
        let model = WinProbs {
            home: 0.5,
            draw: 0.3,
            away: 0.2,
        };
        let market = WinProbs {
            home: 0.4,
            draw: 0.3,
            away: 0.3,
        };
        let out = blend_one_x_two(model, market, 0.6, &cfg);
        assert!((out.home + out.draw + out.away - 1.0).abs() < 1e-12);
        assert!(out.home > market.home && out.home < model.home);
    }

    #[test]
    fn over25_is_monotone_in_the_lambda_scale() {
        let matrix = MatrixConfig::default();
        let over = |scale: f64| {
            let m = crate::score_matrix::ScoreMatrix::from_lambdas(
                1.3 * scale,
                1.1 * scale,
                &matrix,
            );
            crate::outcomes::over_under_25(&m).0
        };
        assert!(over(0.8) < over(1.0));
        assert!(over(1.0) < over(1.2));
        assert!(over(1.2) < over(1.5));
    }

    #[test]
    fn calibration_hits_a_reachable_target() {
        let market = MarketConfig::default();
        let matrix = MatrixConfig::default();
        // Model sees Over-2.5 ≈ 0.40 at these rates; market says 0.55.
        let out = calibrate_lambdas(1.25, 1.0, 0.55, 0.2, 3.8, &market, &matrix);
        assert!((out.achieved_over25 - 0.55).abs() < 0.002);
        assert!(out.scale > 1.0 && out.scale < 1.6);
        assert!(out.lambda_home > 1.25 && out.lambda_away > 1.0);
    }

    #[test]
    fn unreachable_target_stops_at_the_scale_bound() {
        let market = MarketConfig::default();
        let matrix = MatrixConfig::default();
        let out = calibrate_lambdas(0.8, 0.7, 0.99, 0.2, 3.8, &market, &matrix);
        assert!((out.scale - 1.6).abs() < 1e-9);
        assert!(out.achieved_over25 < 0.99);
    }
}
