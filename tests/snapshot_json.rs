//! Captured-snapshot replay: a snapshot serialized to JSON must load back and
//! predict, with absent sections defaulting instead of failing.

use fixturecast::config::EngineConfig;
use fixturecast::engine::predict;
use fixturecast::types::MatchSnapshot;

const MINIMAL: &str = r#"{
    "as_of_utc": "2026-04-18T12:00:00Z",
    "fixture": {
        "id": 868023,
        "kickoff_utc": "2026-04-18T19:00:00Z",
        "league_id": 39,
        "season": 2025,
        "home_team_id": 42,
        "away_team_id": 49
    }
}"#;

const RICH: &str = r#"{
    "as_of_utc": "2026-04-18T12:00:00Z",
    "fixture": {
        "id": 868023,
        "kickoff_utc": "2026-04-18T19:00:00Z",
        "league_id": 39,
        "season": 2025,
        "home_team_id": 42,
        "away_team_id": 49,
        "referee_name": "M. Oliver"
    },
    "home_stats": { "goals_for_avg": 2.1, "goals_against_avg": 0.9 },
    "away_stats": { "goals_for_avg": 1.2, "goals_against_avg": 1.6 },
    "home_players": [
        { "player_id": 101, "position": "Attacker", "minutes": 1700,
          "appearances": 19, "goals": 14, "assists": 5, "shots_on": 31 }
    ],
    "odds": [
        {
            "bookmaker": "bet365",
            "bets": [
                {
                    "name": "Match Winner",
                    "values": [
                        { "label": "Home", "odds": 1.65 },
                        { "label": "Draw", "odds": 3.9 },
                        { "label": "Away", "odds": 5.5 }
                    ]
                },
                {
                    "name": "Goals Over/Under",
                    "values": [
                        { "label": "Over 2.5", "odds": 1.75 },
                        { "label": "Under 2.5", "odds": 2.1 }
                    ]
                }
            ]
        }
    ],
    "head_to_head": [
        { "kickoff_utc": "2025-11-02T16:30:00Z", "league_id": 39,
          "home_team_id": 49, "away_team_id": 42,
          "home_goals": 0, "away_goals": 0, "finished": true }
    ],
    "referee_history": { "matches": 24, "yellows_per_match": 4.1, "reds_per_match": 0.1 },
    "home_tempo": { "matches": 5, "shots_per_match": 16.2, "attack_intensity": 3.1 },
    "home_last_completed_utc": "2026-04-11T14:00:00Z",
    "away_last_completed_utc": "2026-04-16T19:45:00Z",
    "home_corners_avg": 6.8,
    "away_corners_avg": 4.2,
    "league_baseline": { "mu_home": 1.55, "mu_away": 1.25, "sample_matches": 310 },
    "provider_prediction": { "winner": "Home", "advice": "Home and over 1.5" }
}"#;

#[test]
fn minimal_snapshot_loads_and_predicts() {
    let snapshot: MatchSnapshot = serde_json::from_str(MINIMAL).unwrap();
    assert!(snapshot.odds.is_empty());
    assert!(snapshot.league_baseline.is_none());

    let result = predict(&snapshot, &EngineConfig::default()).unwrap();
    assert_eq!(result.fixture_id, 868023);
}

#[test]
fn rich_snapshot_exercises_every_optional_section() {
    let snapshot: MatchSnapshot = serde_json::from_str(RICH).unwrap();
    let result = predict(&snapshot, &EngineConfig::default()).unwrap();

    // The supplied baseline overrides the fallback.
    assert!((result.mu_home - 1.55).abs() < 1e-9);
    assert!(result.market_1x2.is_some());
    assert!(result.calibration.is_some());

    // One past meeting is below the minimum for the low-score boost.
    assert!(!result.h2h_low_boost_applied);

    // Two-day away turnaround shows in the audit trail.
    let rest = result.modifiers.iter().find(|m| m.name == "rest").unwrap();
    assert!(rest.factor_away < 1.0);

    // Corner edge favours home.
    let set_piece = result
        .modifiers
        .iter()
        .find(|m| m.name == "set_piece")
        .unwrap();
    assert!(set_piece.factor_home > 1.0);
    assert!((set_piece.factor_away - 1.0).abs() < 1e-12);

    assert_eq!(
        result.provider_prediction.as_ref().unwrap().winner.as_deref(),
        Some("Home")
    );
}

#[test]
fn prediction_result_serializes_cleanly() {
    let snapshot: MatchSnapshot = serde_json::from_str(RICH).unwrap();
    let result = predict(&snapshot, &EngineConfig::default()).unwrap();
    let json: serde_json::Value =
        serde_json::from_str(&serde_json::to_string(&result).unwrap()).unwrap();

    assert_eq!(json["fixture_id"], 868023);
    assert_eq!(json["lineup_confidence"], "low");
    assert_eq!(json["score_matrix"].as_array().unwrap().len(), 7);
    assert_eq!(json["top_scores"].as_array().unwrap().len(), 5);
    // Optional sections absent from this run never appear as null keys.
    assert!(json.get("market_over25").is_some());
}
