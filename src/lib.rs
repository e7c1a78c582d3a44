//! fixturecast: pre-match score-probability engine.
//!
//! The pipeline turns one fixture's signals (player season stats, lineups,
//! odds, head-to-head history) into a Dixon-Coles-corrected Poisson scoreline
//! grid and the 1X2 / BTTS / Over-Under probabilities read off it. The
//! [`provider`] module assembles snapshots from api-football; [`engine`]
//! consumes them offline, so captured snapshots replay deterministically.

pub mod cache;
pub mod config;
pub mod engine;
pub mod league_baseline;
pub mod market;
pub mod modifiers;
pub mod outcomes;
pub mod provider;
pub mod ratings;
pub mod score_matrix;
pub mod team_profile;
pub mod types;
