//! Aggregates read off the scoreline grid.

use crate::score_matrix::{ScoreMatrix, GOALS};
use crate::types::{ScorelineProb, WinProbs};

pub fn one_x_two(m: &ScoreMatrix) -> WinProbs {
    let mut probs = WinProbs::default();
    for h in 0..GOALS {
        for a in 0..GOALS {
            let p = m.cell(h, a);
            if h > a {
                probs.home += p;
            } else if h == a {
                probs.draw += p;
            } else {
                probs.away += p;
            }
        }
    }
    probs
}

pub fn btts_yes(m: &ScoreMatrix) -> f64 {
    let mut p = 0.0;
    for h in 1..GOALS {
        for a in 1..GOALS {
            p += m.cell(h, a);
        }
    }
    p
}

/// (over, under) for the 2.5 line. Under is the complement, so the pair
/// always sums to 1 even on the truncated grid.
pub fn over_under_25(m: &ScoreMatrix) -> (f64, f64) {
    let mut over = 0.0;
    for h in 0..GOALS {
        for a in 0..GOALS {
            if h + a >= 3 {
                over += m.cell(h, a);
            }
        }
    }
    (over, 1.0 - over)
}

/// The `n` most likely scorelines, probability-descending. Equal-probability
/// cells keep row-major (home-goals-first) order, so output is deterministic.
pub fn top_scorelines(m: &ScoreMatrix, n: usize) -> Vec<ScorelineProb> {
    let mut cells = Vec::with_capacity(GOALS * GOALS);
    for h in 0..GOALS {
        for a in 0..GOALS {
            cells.push(ScorelineProb {
                home_goals: h as u8,
                away_goals: a as u8,
                prob: m.cell(h, a),
            });
        }
    }
    cells.sort_by(|a, b| b.prob.partial_cmp(&a.prob).unwrap_or(std::cmp::Ordering::Equal));
    cells.truncate(n);
    cells
}
