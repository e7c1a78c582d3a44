//! api-football client: fetches everything a prediction needs and assembles
//! it into one [`MatchSnapshot`].
//!
//! Only the fixture header fetch can fail the assembly. Every other endpoint
//! degrades to an empty or absent signal with a warning, matching the
//! engine's missing-data defaults. League baselines and per-team recent-form
//! lookups are cached with a TTL and de-duplicated across threads.

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use once_cell::sync::OnceCell;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::cache::TtlCache;
use crate::league_baseline::{self, CompletedMatch};
use crate::types::{
    BookmakerOdds, FixtureRecord, HeadToHeadRecord, InjuryRecord, LeagueBaseline, LineupRecord,
    MarketBet, MarketQuote, MatchSnapshot, PlayerStatSnapshot, ProviderPrediction, WinProbs,
};

const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";
const API_KEY_HEADER: &str = "x-apisports-key";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const BASELINE_TTL_SECS: u64 = 3600;
const TEAM_FORM_TTL_SECS: u64 = 900;
const RECENT_FIXTURES: u32 = 5;
const MIN_BASELINE_SAMPLE: usize = 40;

static CLIENT: OnceCell<Client> = OnceCell::new();

fn http_client() -> Result<&'static Client> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .context("failed to build http client")
    })
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: String,
    pub base_url: String,
}

impl ProviderConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("APIFOOTBALL_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .context("APIFOOTBALL_KEY is not set")?;
        let base_url = env::var("FIXTURECAST_BASE_URL")
            .ok()
            .map(|s| s.trim().trim_end_matches('/').to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        Ok(Self { api_key, base_url })
    }
}

/// Per-process caches for signals shared across fixtures.
struct ProviderCaches {
    league_baseline: TtlCache<(u32, u32), LeagueBaseline>,
    recent_form: TtlCache<u64, RecentForm>,
}

#[derive(Debug, Clone, Default)]
struct RecentForm {
    matches: u32,
    goals_per_match: Option<f64>,
    last_completed_utc: Option<DateTime<Utc>>,
}

pub struct Provider {
    cfg: ProviderConfig,
    caches: ProviderCaches,
}

// ---------------------------------------------------------------------------
// Wire shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    // Path-form default: the derive must not infer a `T: Default` bound.
    #[serde(default = "Vec::new")]
    response: Vec<T>,
    #[serde(default)]
    paging: Option<Paging>,
}

#[derive(Debug, Deserialize)]
struct Paging {
    current: u32,
    total: u32,
}

/// Numbers that arrive as either JSON numbers or strings ("1.6", "45%").
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum Flexible {
    Num(f64),
    Str(String),
}

impl Flexible {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Flexible::Num(n) => Some(*n),
            Flexible::Str(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct WireFixture {
    fixture: WireFixtureCore,
    #[serde(default)]
    league: Option<WireLeague>,
    #[serde(default)]
    teams: Option<WireTeams>,
    #[serde(default)]
    goals: Option<WireGoals>,
}

#[derive(Debug, Deserialize)]
struct WireFixtureCore {
    id: Option<u64>,
    date: Option<DateTime<Utc>>,
    #[serde(default)]
    referee: Option<String>,
    #[serde(default)]
    status: Option<WireStatus>,
}

#[derive(Debug, Deserialize)]
struct WireStatus {
    #[serde(default)]
    short: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireLeague {
    id: Option<u32>,
    season: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireTeams {
    home: Option<WireTeamRef>,
    away: Option<WireTeamRef>,
}

#[derive(Debug, Deserialize)]
struct WireTeamRef {
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct WireGoals {
    home: Option<u32>,
    away: Option<u32>,
}

const FINISHED_STATUSES: &[&str] = &["FT", "AET", "PEN"];

impl WireFixture {
    fn is_finished(&self) -> bool {
        self.fixture
            .status
            .as_ref()
            .and_then(|s| s.short.as_deref())
            .map(|s| FINISHED_STATUSES.contains(&s))
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
struct WirePlayerEntry {
    player: WirePlayerRef,
    #[serde(default)]
    statistics: Vec<WirePlayerStats>,
}

#[derive(Debug, Deserialize)]
struct WirePlayerRef {
    id: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerStats {
    #[serde(default)]
    games: WirePlayerGames,
    #[serde(default)]
    goals: WirePlayerGoals,
    #[serde(default)]
    shots: WirePlayerShots,
    #[serde(default)]
    passes: WirePlayerPasses,
    #[serde(default)]
    dribbles: WirePlayerDribbles,
    #[serde(default)]
    tackles: WirePlayerTackles,
    #[serde(default)]
    duels: WirePlayerDuels,
    #[serde(default)]
    cards: WirePlayerCards,
    #[serde(default)]
    penalty: WirePlayerPenalty,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerGames {
    minutes: Option<u32>,
    #[serde(rename = "appearences")]
    appearances: Option<u32>,
    position: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerGoals {
    total: Option<u32>,
    assists: Option<u32>,
    conceded: Option<u32>,
    saves: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerShots {
    on: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerPasses {
    key: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerDribbles {
    success: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerTackles {
    total: Option<u32>,
    blocks: Option<u32>,
    interceptions: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerDuels {
    total: Option<u32>,
    won: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerCards {
    yellow: Option<u32>,
    red: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct WirePlayerPenalty {
    saved: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct WireLineup {
    team: WireTeamRef,
    #[serde(default)]
    formation: Option<String>,
    #[serde(default, rename = "startXI")]
    start_xi: Vec<WireLineupSlot>,
    #[serde(default)]
    substitutes: Vec<WireLineupSlot>,
}

#[derive(Debug, Deserialize)]
struct WireLineupSlot {
    player: WirePlayerRef,
}

#[derive(Debug, Deserialize)]
struct WireInjury {
    player: WireInjuredPlayer,
    #[serde(default)]
    team: Option<WireTeamRef>,
}

#[derive(Debug, Deserialize)]
struct WireInjuredPlayer {
    id: Option<u64>,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireOddsFixture {
    #[serde(default)]
    bookmakers: Vec<WireBookmaker>,
}

#[derive(Debug, Deserialize)]
struct WireBookmaker {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    bets: Vec<WireBet>,
}

#[derive(Debug, Deserialize)]
struct WireBet {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    values: Vec<WireQuote>,
}

#[derive(Debug, Deserialize)]
struct WireQuote {
    #[serde(default)]
    value: Option<Flexible>,
    /// Decimal odds, quoted as a string by this provider.
    #[serde(default)]
    odd: Option<Flexible>,
}

#[derive(Debug, Deserialize)]
struct WireTeamStatistics {
    #[serde(default)]
    goals: Option<WireTeamGoals>,
}

#[derive(Debug, Deserialize)]
struct WireTeamGoals {
    #[serde(rename = "for")]
    scored: Option<WireTeamGoalSide>,
    against: Option<WireTeamGoalSide>,
}

#[derive(Debug, Deserialize)]
struct WireTeamGoalSide {
    #[serde(default)]
    average: Option<WireGoalAverage>,
}

#[derive(Debug, Deserialize)]
struct WireGoalAverage {
    #[serde(default)]
    total: Option<Flexible>,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl Provider {
    pub fn new(cfg: ProviderConfig) -> Self {
        Self {
            cfg,
            caches: ProviderCaches {
                league_baseline: TtlCache::new(Duration::from_secs(BASELINE_TTL_SECS)),
                recent_form: TtlCache::new(Duration::from_secs(TEAM_FORM_TTL_SECS)),
            },
        }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(ProviderConfig::from_env()?))
    }

    fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
        page: u32,
    ) -> Result<Envelope<T>> {
        let client = http_client()?;
        let url = format!("{}/{}", self.cfg.base_url, path);
        let mut request = client
            .get(&url)
            .header(API_KEY_HEADER, &self.cfg.api_key)
            .query(params);
        if page > 1 {
            request = request.query(&[("page", page.to_string())]);
        }
        let envelope = request
            .send()
            .with_context(|| format!("{path} request failed"))?
            .error_for_status()
            .with_context(|| format!("{path} returned an error status"))?
            .json::<Envelope<T>>()
            .with_context(|| format!("{path} returned invalid json"))?;
        Ok(envelope)
    }

    /// Fetches every page of a paginated endpoint.
    fn get_all<T: DeserializeOwned>(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>> {
        let first = self.get_page::<T>(path, params, 1)?;
        let total_pages = first.paging.as_ref().map(|p| p.total).unwrap_or(1);
        let mut items = first.response;

        for page in 2..=total_pages {
            let envelope = self.get_page::<T>(path, params, page)?;
            if envelope
                .paging
                .as_ref()
                .map(|p| p.current != page)
                .unwrap_or(false)
            {
                break; // provider stopped advancing
            }
            if envelope.response.is_empty() {
                break;
            }
            items.extend(envelope.response);
        }
        Ok(items)
    }

    fn fetch_fixture(&self, fixture_id: u64) -> Result<(FixtureRecord, u64, u64)> {
        let fixtures: Vec<WireFixture> =
            self.get_all("fixtures", &[("id", fixture_id.to_string())])?;
        let wire = fixtures
            .into_iter()
            .next()
            .with_context(|| format!("fixture {fixture_id} not found"))?;

        let record = FixtureRecord {
            id: wire.fixture.id,
            kickoff_utc: wire.fixture.date,
            league_id: wire.league.as_ref().and_then(|l| l.id),
            season: wire.league.as_ref().and_then(|l| l.season),
            home_team_id: wire.teams.as_ref().and_then(|t| t.home.as_ref()?.id),
            away_team_id: wire.teams.as_ref().and_then(|t| t.away.as_ref()?.id),
            referee_name: wire.fixture.referee,
        };
        let home = record.home_team_id.context("fixture has no home team id")?;
        let away = record.away_team_id.context("fixture has no away team id")?;
        Ok((record, home, away))
    }

    fn fetch_players(&self, team_id: u64, season: u32) -> Result<Vec<PlayerStatSnapshot>> {
        let entries: Vec<WirePlayerEntry> = self.get_all(
            "players",
            &[
                ("team", team_id.to_string()),
                ("season", season.to_string()),
            ],
        )?;

        let mut players = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(player_id) = entry.player.id else {
                continue;
            };
            let stats = entry.statistics.into_iter().next().unwrap_or_default();
            players.push(PlayerStatSnapshot {
                player_id,
                position: stats.games.position,
                minutes: stats.games.minutes.unwrap_or(0),
                appearances: stats.games.appearances.unwrap_or(0),
                goals: stats.goals.total.unwrap_or(0),
                assists: stats.goals.assists.unwrap_or(0),
                shots_on: stats.shots.on.unwrap_or(0),
                key_passes: stats.passes.key.unwrap_or(0),
                dribbles_success: stats.dribbles.success.unwrap_or(0),
                tackles: stats.tackles.total.unwrap_or(0),
                interceptions: stats.tackles.interceptions.unwrap_or(0),
                blocks: stats.tackles.blocks.unwrap_or(0),
                duels_total: stats.duels.total.unwrap_or(0),
                duels_won: stats.duels.won.unwrap_or(0),
                yellow_cards: stats.cards.yellow.unwrap_or(0),
                red_cards: stats.cards.red.unwrap_or(0),
                saves: stats.goals.saves.unwrap_or(0),
                conceded: stats.goals.conceded.unwrap_or(0),
                penalties_saved: stats.penalty.saved.unwrap_or(0),
            });
        }
        Ok(players)
    }

    fn fetch_lineups(&self, fixture_id: u64) -> Result<Vec<LineupRecord>> {
        let lineups: Vec<WireLineup> =
            self.get_all("fixtures/lineups", &[("fixture", fixture_id.to_string())])?;
        Ok(lineups
            .into_iter()
            .filter_map(|l| {
                let team_id = l.team.id?;
                Some(LineupRecord {
                    team_id,
                    formation: l.formation,
                    starters: l.start_xi.iter().filter_map(|s| s.player.id).collect(),
                    bench: l.substitutes.iter().filter_map(|s| s.player.id).collect(),
                })
            })
            .collect())
    }

    fn fetch_injuries(&self, fixture_id: u64) -> Result<Vec<(Option<u64>, InjuryRecord)>> {
        let injuries: Vec<WireInjury> =
            self.get_all("injuries", &[("fixture", fixture_id.to_string())])?;
        Ok(injuries
            .into_iter()
            .filter_map(|i| {
                let player_id = i.player.id?;
                Some((
                    i.team.and_then(|t| t.id),
                    InjuryRecord {
                        player_id,
                        reason: i.player.reason,
                        reported_at: None,
                    },
                ))
            })
            .collect())
    }

    fn fetch_odds(&self, fixture_id: u64) -> Result<Vec<BookmakerOdds>> {
        let fixtures: Vec<WireOddsFixture> =
            self.get_all("odds", &[("fixture", fixture_id.to_string())])?;
        let mut odds = Vec::new();
        for fixture in fixtures {
            for bookmaker in fixture.bookmakers {
                let bets = bookmaker
                    .bets
                    .into_iter()
                    .filter_map(|bet| {
                        let name = bet.name?;
                        let values = bet
                            .values
                            .into_iter()
                            .filter_map(|q| {
                                let label = match q.value? {
                                    Flexible::Str(s) => s,
                                    Flexible::Num(n) => n.to_string(),
                                };
                                let odds = q.odd?.as_f64()?;
                                Some(MarketQuote { label, odds })
                            })
                            .collect::<Vec<_>>();
                        Some(MarketBet { name, values })
                    })
                    .collect();
                odds.push(BookmakerOdds {
                    bookmaker: bookmaker.name.unwrap_or_default(),
                    bets,
                });
            }
        }
        Ok(odds)
    }

    fn fetch_head_to_head(&self, home_id: u64, away_id: u64) -> Result<Vec<HeadToHeadRecord>> {
        let fixtures: Vec<WireFixture> = self.get_all(
            "fixtures/headtohead",
            &[("h2h", format!("{home_id}-{away_id}"))],
        )?;
        Ok(fixtures
            .into_iter()
            .filter_map(|f| {
                let teams = f.teams.as_ref()?;
                let record = HeadToHeadRecord {
                    kickoff_utc: f.fixture.date,
                    league_id: f.league.as_ref().and_then(|l| l.id),
                    season: f.league.as_ref().and_then(|l| l.season),
                    home_team_id: teams.home.as_ref()?.id?,
                    away_team_id: teams.away.as_ref()?.id?,
                    home_goals: f.goals.as_ref().and_then(|g| g.home).unwrap_or(0),
                    away_goals: f.goals.as_ref().and_then(|g| g.away).unwrap_or(0),
                    finished: f.is_finished(),
                };
                Some(record)
            })
            .collect())
    }

    fn fetch_team_stats(
        &self,
        team_id: u64,
        league_id: u32,
        season: u32,
    ) -> Result<crate::types::TeamSeasonStats> {
        #[derive(Debug, Deserialize)]
        struct StatsEnvelope {
            #[serde(default)]
            response: Option<WireTeamStatistics>,
        }

        // This endpoint returns an object, not a list.
        let client = http_client()?;
        let url = format!("{}/teams/statistics", self.cfg.base_url);
        let envelope: StatsEnvelope = client
            .get(&url)
            .header(API_KEY_HEADER, &self.cfg.api_key)
            .query(&[
                ("team", team_id.to_string()),
                ("league", league_id.to_string()),
                ("season", season.to_string()),
            ])
            .send()
            .context("teams/statistics request failed")?
            .error_for_status()
            .context("teams/statistics returned an error status")?
            .json()
            .context("teams/statistics returned invalid json")?;

        let goals = envelope.response.and_then(|r| r.goals);
        let avg = |side: Option<&WireTeamGoalSide>| {
            side.and_then(|s| s.average.as_ref())
                .and_then(|a| a.total.as_ref())
                .and_then(Flexible::as_f64)
        };
        Ok(crate::types::TeamSeasonStats {
            goals_for_avg: avg(goals.as_ref().and_then(|g| g.scored.as_ref())),
            goals_against_avg: avg(goals.as_ref().and_then(|g| g.against.as_ref())),
            form_attack: None,
            form_defense: None,
        })
    }

    fn season_completed_matches(&self, league_id: u32, season: u32) -> Result<Vec<CompletedMatch>> {
        let fixtures: Vec<WireFixture> = self.get_all(
            "fixtures",
            &[
                ("league", league_id.to_string()),
                ("season", season.to_string()),
                ("status", "FT".to_string()),
            ],
        )?;
        Ok(fixtures
            .iter()
            .filter_map(|f| {
                Some(CompletedMatch {
                    kickoff_utc: f.fixture.date?,
                    home_goals: f.goals.as_ref().and_then(|g| g.home)?,
                    away_goals: f.goals.as_ref().and_then(|g| g.away)?,
                    finished: f.is_finished(),
                })
            })
            .collect())
    }

    /// League-average goals across the season's finished fixtures, cached.
    /// A sparse early-season sample widens to include the previous season.
    fn league_baseline(&self, league_id: u32, season: u32) -> Result<LeagueBaseline> {
        self.caches
            .league_baseline
            .get_or_fetch((league_id, season), || {
                let mut completed = self.season_completed_matches(league_id, season)?;
                if completed.len() < MIN_BASELINE_SAMPLE && season > 0 {
                    completed.extend(self.season_completed_matches(league_id, season - 1)?);
                }
                Ok(league_baseline::compute(&completed, Utc::now()))
            })
    }

    /// Goals-per-match pace and the last completed kickoff over a team's
    /// recent fixtures, cached.
    fn recent_form(&self, team_id: u64) -> Result<RecentForm> {
        self.caches.recent_form.get_or_fetch(team_id, || {
            let fixtures: Vec<WireFixture> = self.get_all(
                "fixtures",
                &[
                    ("team", team_id.to_string()),
                    ("last", RECENT_FIXTURES.to_string()),
                ],
            )?;

            let mut total_goals = 0u32;
            let mut matches = 0u32;
            let mut last_completed = None;
            for f in fixtures.iter().filter(|f| f.is_finished()) {
                let Some(goals) = f.goals.as_ref() else {
                    continue;
                };
                total_goals += goals.home.unwrap_or(0) + goals.away.unwrap_or(0);
                matches += 1;
                if let Some(date) = f.fixture.date {
                    if last_completed.map(|prev| date > prev).unwrap_or(true) {
                        last_completed = Some(date);
                    }
                }
            }

            Ok(RecentForm {
                matches,
                goals_per_match: (matches > 0).then(|| total_goals as f64 / matches as f64),
                last_completed_utc: last_completed,
            })
        })
    }

    fn fetch_provider_prediction(&self, fixture_id: u64) -> Result<Option<ProviderPrediction>> {
        let raw: Vec<serde_json::Value> =
            self.get_all("predictions", &[("fixture", fixture_id.to_string())])?;
        Ok(raw.first().and_then(parse_provider_prediction))
    }

    /// Pulls everything for one fixture and builds the snapshot. Failures
    /// beyond the fixture header itself degrade with a warning.
    pub fn assemble_snapshot(&self, fixture_id: u64) -> Result<MatchSnapshot> {
        let (fixture, home_id, away_id) = self.fetch_fixture(fixture_id)?;
        let season = fixture.season.unwrap_or(0);
        let league_id = fixture.league_id;

        let ((home_players, away_players), (lineups, odds)) = rayon::join(
            || {
                rayon::join(
                    || self.fetch_players(home_id, season),
                    || self.fetch_players(away_id, season),
                )
            },
            || {
                rayon::join(
                    || self.fetch_lineups(fixture_id),
                    || self.fetch_odds(fixture_id),
                )
            },
        );
        let ((head_to_head, injuries), (home_stats, away_stats)) = rayon::join(
            || {
                rayon::join(
                    || self.fetch_head_to_head(home_id, away_id),
                    || self.fetch_injuries(fixture_id),
                )
            },
            || match league_id {
                Some(league) => rayon::join(
                    || self.fetch_team_stats(home_id, league, season).map(Some),
                    || self.fetch_team_stats(away_id, league, season).map(Some),
                ),
                None => (Ok(None), Ok(None)),
            },
        );
        let ((baseline, prediction), (home_form, away_form)) = rayon::join(
            || {
                rayon::join(
                    || match league_id {
                        Some(league) => self.league_baseline(league, season).map(Some),
                        None => Ok(None),
                    },
                    || self.fetch_provider_prediction(fixture_id),
                )
            },
            || {
                rayon::join(
                    || self.recent_form(home_id),
                    || self.recent_form(away_id),
                )
            },
        );

        let mut injuries = degrade(fixture_id, "injuries", injuries).unwrap_or_default();
        // Injuries the provider attributes to neither side are dropped.
        injuries.retain(|(team, _)| matches!(team, Some(t) if *t == home_id || *t == away_id));
        let (home_injuries, away_injuries): (Vec<_>, Vec<_>) = injuries
            .into_iter()
            .partition(|(team, _)| *team == Some(home_id));

        let to_tempo = |form: &RecentForm| crate::types::TeamTempoRecord {
            matches: form.matches,
            shots_per_match: None,
            possession_pct: None,
            attack_intensity: form.goals_per_match,
        };
        let home_form = degrade(fixture_id, "home recent form", home_form);
        let away_form = degrade(fixture_id, "away recent form", away_form);

        Ok(MatchSnapshot {
            as_of_utc: Some(Utc::now()),
            fixture,
            home_stats: degrade(fixture_id, "home stats", home_stats).flatten(),
            away_stats: degrade(fixture_id, "away stats", away_stats).flatten(),
            home_players: degrade(fixture_id, "home players", home_players).unwrap_or_default(),
            away_players: degrade(fixture_id, "away players", away_players).unwrap_or_default(),
            lineups: degrade(fixture_id, "lineups", lineups).unwrap_or_default(),
            home_injuries: home_injuries.into_iter().map(|(_, i)| i).collect(),
            away_injuries: away_injuries.into_iter().map(|(_, i)| i).collect(),
            odds: degrade(fixture_id, "odds", odds).unwrap_or_default(),
            head_to_head: degrade(fixture_id, "head to head", head_to_head).unwrap_or_default(),
            referee_history: None,
            home_tempo: home_form.as_ref().map(to_tempo),
            away_tempo: away_form.as_ref().map(to_tempo),
            home_last_completed_utc: home_form.as_ref().and_then(|f| f.last_completed_utc),
            away_last_completed_utc: away_form.as_ref().and_then(|f| f.last_completed_utc),
            home_corners_avg: None,
            away_corners_avg: None,
            league_baseline: degrade(fixture_id, "league baseline", baseline).flatten(),
            provider_prediction: degrade(fixture_id, "provider prediction", prediction).flatten(),
        })
    }
}

/// Logs a failed side-channel fetch and degrades it to "signal absent".
fn degrade<T>(fixture_id: u64, what: &'static str, res: Result<T>) -> Option<T> {
    match res {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(fixture_id, what, %err, "signal unavailable, degrading");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// Provider prediction parsing
// ---------------------------------------------------------------------------

/// The predictions endpoint has shipped several shapes over time: the payload
/// of interest may sit at the top level, under `predictions`, under
/// `prediction`, or under `data.predictions`, and win percentages arrive as
/// "45%" strings or plain numbers. Absent or unparseable pieces are dropped.
pub fn parse_provider_prediction(raw: &serde_json::Value) -> Option<ProviderPrediction> {
    let node = ["predictions", "prediction"]
        .iter()
        .find_map(|key| raw.get(key))
        .or_else(|| raw.get("data").and_then(|d| d.get("predictions")))
        .unwrap_or(raw);
    let node = if node.is_array() { node.get(0)? } else { node };

    let text = |v: &serde_json::Value| match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Object(o) => o.get("name").and_then(|n| n.as_str()).map(str::to_string),
        _ => None,
    };
    let percent = |v: &serde_json::Value| match v {
        serde_json::Value::Number(n) => n.as_f64().map(|p| p / 100.0),
        serde_json::Value::String(s) => s
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .ok()
            .map(|p| p / 100.0),
        _ => None,
    };

    let probs = node.get("percent").and_then(|p| {
        let home = p.get("home").and_then(percent)?;
        let draw = p.get("draw").and_then(percent)?;
        let away = p.get("away").and_then(percent)?;
        Some(WinProbs { home, draw, away })
    });

    let prediction = ProviderPrediction {
        winner: node.get("winner").and_then(|w| text(w)),
        win_or_draw: node.get("win_or_draw").and_then(|v| v.as_bool()),
        under_over: node.get("under_over").and_then(|v| text(v)),
        advice: node.get("advice").and_then(|v| text(v)),
        probs_1x2: probs,
    };

    let empty = prediction.winner.is_none()
        && prediction.win_or_draw.is_none()
        && prediction.under_over.is_none()
        && prediction.advice.is_none()
        && prediction.probs_1x2.is_none();
    (!empty).then_some(prediction)
}
