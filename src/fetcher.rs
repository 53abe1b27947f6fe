use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::error::{AppError, Result};
use crate::types::{Position, RosterEntry};

/// Supplies the picks of one fantasy team for a gameweek.
#[async_trait]
pub trait RosterProvider: Send + Sync {
    async fn fetch_roster(&self, entry_id: u64, gameweek: u32) -> Result<Vec<RosterEntry>>;
}

/// Resolves the gameweek currently in progress.
#[async_trait]
pub trait GameweekResolver: Send + Sync {
    async fn current_gameweek(&self) -> Result<u32>;
}

/// Maps a manager's name and team name to an FPL entry id.
#[async_trait]
pub trait PlayerLookup: Send + Sync {
    async fn lookup_entry_id(&self, player_name: &str, team_name: &str) -> Result<Option<u64>>;
}

/// Fantasy Premier League REST client.
pub struct FplClient {
    client: reqwest::Client,
    base_url: String,
    lookup_url: Option<String>,
}

impl FplClient {
    pub fn new(cfg: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.http_timeout_secs))
            .user_agent(concat!("fpl-betbuilder/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url: cfg.fpl_api_url.clone(),
            lookup_url: cfg.player_lookup_url.clone(),
        })
    }

    async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        debug!("GET {url}");
        let resp = self.client.get(url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("{url} returned {status}")));
        }
        Ok(resp.json().await?)
    }

    async fn bootstrap(&self) -> Result<serde_json::Value> {
        self.get_json(&format!("{}/bootstrap-static/", self.base_url)).await
    }
}

#[async_trait]
impl GameweekResolver for FplClient {
    async fn current_gameweek(&self) -> Result<u32> {
        let bootstrap = self.bootstrap().await?;
        parse_current_gameweek(&bootstrap)
            .ok_or_else(|| AppError::Upstream("no current event in bootstrap-static".to_string()))
    }
}

#[async_trait]
impl RosterProvider for FplClient {
    async fn fetch_roster(&self, entry_id: u64, gameweek: u32) -> Result<Vec<RosterEntry>> {
        let picks_url = format!("{}/entry/{entry_id}/event/{gameweek}/picks/", self.base_url);
        let (bootstrap, picks) = tokio::try_join!(self.bootstrap(), self.get_json(&picks_url))?;

        let players = PlayerIndex::from_bootstrap(&bootstrap);
        let roster = parse_roster(&picks, &players);
        info!(
            entry_id,
            gameweek,
            players = roster.len(),
            known_elements = players.len(),
            "Fetched roster"
        );
        Ok(roster)
    }
}

#[async_trait]
impl PlayerLookup for FplClient {
    async fn lookup_entry_id(&self, player_name: &str, team_name: &str) -> Result<Option<u64>> {
        let Some(base) = &self.lookup_url else {
            return Err(AppError::LookupUnavailable(
                "PLAYER_LOOKUP_URL is not configured".to_string(),
            ));
        };

        let resp = self
            .client
            .get(base)
            .query(&[("teamName", team_name), ("playerName", player_name)])
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(AppError::Upstream(format!("player lookup returned {status}")));
        }
        let body: serde_json::Value = resp.json().await?;
        Ok(parse_lookup_id(&body))
    }
}

/// `id` of the first event flagged `is_current`.
pub fn parse_current_gameweek(bootstrap: &serde_json::Value) -> Option<u32> {
    bootstrap
        .get("events")?
        .as_array()?
        .iter()
        .find(|e| e.get("is_current").and_then(|c| c.as_bool()).unwrap_or(false))
        .and_then(|e| e.get("id"))
        .and_then(|id| id.as_u64())
        .map(|id| id as u32)
}

/// The lookup service answers `{"Player ID": 12345}`; the id may also arrive as a string.
pub fn parse_lookup_id(body: &serde_json::Value) -> Option<u64> {
    let v = body.get("Player ID")?;
    v.as_u64().or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
}

/// Bootstrap data needed to turn a pick into a roster entry.
#[derive(Debug, Clone)]
pub struct PlayerInfo {
    pub name: String,
    pub team_name: String,
    pub position: Position,
    pub total_points: i32,
}

#[derive(Debug, Default)]
pub struct PlayerIndex {
    players: HashMap<u32, PlayerInfo>,
}

impl PlayerIndex {
    pub fn from_bootstrap(bootstrap: &serde_json::Value) -> Self {
        let teams: HashMap<u64, String> = bootstrap
            .get("teams")
            .and_then(|t| t.as_array())
            .map(|teams| {
                teams
                    .iter()
                    .filter_map(|t| {
                        let id = t.get("id")?.as_u64()?;
                        let name = t
                            .get("short_name")
                            .or_else(|| t.get("name"))
                            .and_then(|n| n.as_str())?;
                        Some((id, name.to_string()))
                    })
                    .collect()
            })
            .unwrap_or_default();

        let players = bootstrap
            .get("elements")
            .and_then(|e| e.as_array())
            .map(|elements| {
                elements
                    .iter()
                    .filter_map(|e| {
                        let id = e.get("id")?.as_u64()? as u32;
                        let info = PlayerInfo {
                            name: display_name(e),
                            team_name: e
                                .get("team")
                                .and_then(|t| t.as_u64())
                                .and_then(|t| teams.get(&t).cloned())
                                .unwrap_or_else(|| "Unknown".to_string()),
                            position: e
                                .get("element_type")
                                .and_then(|p| p.as_i64())
                                .map(Position::from)
                                .unwrap_or_default(),
                            total_points: e
                                .get("total_points")
                                .and_then(|p| p.as_i64())
                                .unwrap_or(0) as i32,
                        };
                        Some((id, info))
                    })
                    .collect()
            })
            .unwrap_or_default();

        Self { players }
    }

    pub fn get(&self, id: u32) -> Option<&PlayerInfo> {
        self.players.get(&id)
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }
}

/// "First Second" when both are present, else `web_name`. The full name is what
/// the curated-name classifier matches against.
fn display_name(element: &serde_json::Value) -> String {
    let first = element.get("first_name").and_then(|n| n.as_str()).unwrap_or("").trim();
    let second = element.get("second_name").and_then(|n| n.as_str()).unwrap_or("").trim();
    if !first.is_empty() && !second.is_empty() {
        return format!("{first} {second}");
    }
    element
        .get("web_name")
        .and_then(|n| n.as_str())
        .unwrap_or("")
        .to_string()
}

/// Join `picks` with bootstrap player data. Missing fields default permissively:
/// position → goalkeeper, points → 0, multiplier → 1, flags → false. Picks
/// without an element id are dropped.
pub fn parse_roster(picks: &serde_json::Value, players: &PlayerIndex) -> Vec<RosterEntry> {
    let Some(items) = picks.get("picks").and_then(|p| p.as_array()) else {
        warn!("picks response has no picks array");
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|pick| {
            let id = pick.get("element").and_then(|e| e.as_u64())? as u32;
            let info = players.get(id);
            if info.is_none() {
                debug!(element = id, "pick not found in bootstrap elements");
            }
            let flag = |key: &str| pick.get(key).and_then(|v| v.as_bool()).unwrap_or(false);

            Some(RosterEntry {
                id,
                name: info.map(|i| i.name.clone()).unwrap_or_default(),
                team_name: info
                    .map(|i| i.team_name.clone())
                    .unwrap_or_else(|| "Unknown".to_string()),
                element_type: info
                    .map(|i| i.position)
                    .or_else(|| pick.get("element_type").and_then(|p| p.as_i64()).map(Position::from))
                    .unwrap_or_default(),
                is_captain: flag("is_captain"),
                is_vice_captain: flag("is_vice_captain"),
                multiplier: pick
                    .get("multiplier")
                    .and_then(|m| m.as_u64())
                    .map(|m| m.min(u64::from(u8::MAX)) as u8)
                    .unwrap_or(1),
                total_points: info.map(|i| i.total_points).unwrap_or(0),
            })
        })
        .collect()
}
