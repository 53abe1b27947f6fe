use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};

use crate::api::latency::LatencyStats;
use crate::engine::odds::{self, OddsBreakdown};
use crate::engine::BetGenerator;
use crate::error::{AppError, Result};
use crate::fetcher::{PlayerLookup, RosterProvider};
use crate::gameweek_refresh::GameweekCache;
use crate::state::history::UserSummary;
use crate::state::HistoryTracker;
use crate::types::{BetRecord, BetSuggestionResult, BetSummary, BetType, RosterEntry, SlotKind};

/// Everything a request handler needs, shared behind one `Arc`.
pub struct BetService {
    generator: BetGenerator,
    history: Arc<HistoryTracker>,
    rosters: Arc<dyn RosterProvider>,
    lookup: Arc<dyn PlayerLookup>,
    gameweek: Arc<GameweekCache>,
    latency: LatencyStats,
}

/// Odds intermediates for one suggested leg.
#[derive(Debug, Clone, Serialize)]
pub struct LegBreakdown {
    pub id: String,
    pub player: String,
    pub slot: SlotKind,
    pub bet_type: BetType,
    #[serde(flatten)]
    pub odds: OddsBreakdown,
}

#[derive(Debug, Clone, Serialize)]
pub struct OddsReport {
    pub player_id: String,
    pub luck_level: i32,
    pub bet_count: usize,
    pub recent_luck_average: Option<f64>,
    pub baseline_odds: f64,
    pub legs: Vec<LegBreakdown>,
    pub total_odds: f64,
}

impl BetService {
    pub fn new(
        generator: BetGenerator,
        history: Arc<HistoryTracker>,
        rosters: Arc<dyn RosterProvider>,
        lookup: Arc<dyn PlayerLookup>,
        gameweek: Arc<GameweekCache>,
    ) -> Self {
        Self {
            generator,
            history,
            rosters,
            lookup,
            gameweek,
            latency: LatencyStats::new(),
        }
    }

    pub fn history_tracker(&self) -> &HistoryTracker {
        &self.history
    }

    pub fn latency(&self) -> &LatencyStats {
        &self.latency
    }

    pub fn cached_gameweek(&self) -> Option<u32> {
        self.gameweek.cached()
    }

    /// Slip for an already fetched roster, biased by the user's history.
    pub fn generate_suggestions(
        &self,
        roster: &[RosterEntry],
        user_id: &str,
        luck_level: i32,
    ) -> BetSuggestionResult {
        let baseline = self.history.baseline_odds(user_id);
        self.generator.generate(roster, luck_level, baseline)
    }

    /// Roster of `user_id` for the current gameweek.
    pub async fn team_for(&self, user_id: &str) -> Result<Vec<RosterEntry>> {
        let entry_id = parse_entry_id(user_id)?;
        let gameweek = self.gameweek.current().await?;
        self.rosters.fetch_roster(entry_id, gameweek).await
    }

    pub async fn suggestions_for(&self, user_id: &str, luck_level: i32) -> Result<BetSuggestionResult> {
        let started = Instant::now();
        let roster = self.team_for(user_id).await?;
        if roster.is_empty() {
            return Err(AppError::NotFound("Team data not found.".to_string()));
        }

        let result = self.generate_suggestions(&roster, user_id, luck_level);
        self.latency.record(started.elapsed());
        info!(
            user_id,
            luck_level,
            legs = result.bet_legs.len(),
            total_odds = result.total_odds,
            "Bet suggestions ready"
        );
        Ok(result)
    }

    pub async fn lookup_player(&self, player_name: &str, team_name: &str) -> Result<u64> {
        match self.lookup.lookup_entry_id(player_name, team_name).await? {
            Some(id) => Ok(id),
            None => {
                warn!(player_name, team_name, "Player lookup found no match");
                Err(AppError::NotFound("Player ID not found".to_string()))
            }
        }
    }

    /// Stores a placed bet. A summary without a bet id gets a fresh UUID.
    pub async fn record_bet(&self, user_id: &str, mut summary: BetSummary) -> BetRecord {
        if summary.bet_id.is_none() {
            summary.bet_id = Some(uuid::Uuid::new_v4().to_string());
        }
        self.history.record(user_id, &summary).await
    }

    pub fn history(&self, user_id: &str) -> Vec<BetRecord> {
        self.history.history(user_id)
    }

    pub fn baseline_odds(&self, user_id: &str) -> f64 {
        self.history.baseline_odds(user_id)
    }

    pub fn history_summaries(&self) -> Vec<UserSummary> {
        self.history.summaries()
    }

    pub async fn reload_history(&self) {
        self.history.reload().await;
    }

    /// Recomputes the slip for `user_id` and reports every odds intermediate.
    pub async fn odds_breakdown(&self, user_id: &str, luck_level: i32) -> Result<OddsReport> {
        let result = self.suggestions_for(user_id, luck_level).await?;
        let records = self.history.history(user_id);
        let baseline = odds::baseline_odds(&records);

        let legs = result
            .bet_legs
            .iter()
            .map(|leg| LegBreakdown {
                id: leg.id.clone(),
                player: leg.player.clone(),
                slot: leg.slot,
                bet_type: leg.bet_type,
                odds: odds::breakdown(leg.base_odds, luck_level, baseline),
            })
            .collect();

        Ok(OddsReport {
            player_id: user_id.to_string(),
            luck_level,
            bet_count: records.len(),
            recent_luck_average: odds::recent_luck_average(&records),
            baseline_odds: baseline,
            legs,
            total_odds: result.total_odds,
        })
    }
}

/// FPL entry ids are positive integers.
pub fn parse_entry_id(user_id: &str) -> Result<u64> {
    match user_id.trim().parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(AppError::BadRequest(format!("Invalid playerId: {user_id:?}"))),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::store::JsonFileStore;
    use crate::fetcher::GameweekResolver;
    use crate::types::Position;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub(crate) struct FixedRoster {
        pub roster: Vec<RosterEntry>,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl RosterProvider for FixedRoster {
        async fn fetch_roster(&self, entry_id: u64, gameweek: u32) -> Result<Vec<RosterEntry>> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            assert_eq!(gameweek, 5);
            if entry_id == 404 {
                return Ok(Vec::new());
            }
            Ok(self.roster.clone())
        }
    }

    pub(crate) struct FixedGameweek;

    #[async_trait]
    impl GameweekResolver for FixedGameweek {
        async fn current_gameweek(&self) -> Result<u32> {
            Ok(5)
        }
    }

    pub(crate) struct FixedLookup;

    #[async_trait]
    impl PlayerLookup for FixedLookup {
        async fn lookup_entry_id(&self, player_name: &str, _team_name: &str) -> Result<Option<u64>> {
            Ok((player_name == "Alex").then_some(1234))
        }
    }

    fn entry(id: u32, name: &str, position: i64, points: i32) -> RosterEntry {
        RosterEntry {
            id,
            name: name.to_string(),
            team_name: "TST".to_string(),
            element_type: Position::from(position),
            is_captain: false,
            is_vice_captain: false,
            multiplier: 1,
            total_points: points,
        }
    }

    pub(crate) fn four_man_roster() -> Vec<RosterEntry> {
        let mut roster = vec![
            entry(1, "Jordan Pickford", 1, 5),
            entry(2, "van dijk", 2, 8),
            entry(3, "salah", 3, 3),
            entry(4, "Chris Wood", 4, 0),
        ];
        roster[2].is_captain = true;
        roster[3].is_vice_captain = true;
        roster
    }

    /// Service over a JSON store in `dir`, the four-man roster and gameweek 5.
    pub(crate) async fn service_in(dir: &std::path::Path) -> BetService {
        let store = Arc::new(JsonFileStore::new(dir.join("history.json")));
        let history = HistoryTracker::load(store).await;
        let rosters = Arc::new(FixedRoster {
            roster: four_man_roster(),
            calls: AtomicUsize::new(0),
        });
        BetService::new(
            BetGenerator::default(),
            history,
            rosters,
            Arc::new(FixedLookup),
            GameweekCache::new(Arc::new(FixedGameweek)),
        )
    }

    fn placed(luck_level: i32) -> BetSummary {
        BetSummary {
            luck_level,
            total_odds: 3.0,
            total_stake: 5.0,
            potential_win: 15.0,
            ..BetSummary::default()
        }
    }

    #[test]
    fn entry_id_must_be_positive_integer() {
        assert_eq!(parse_entry_id("1234").unwrap(), 1234);
        assert_eq!(parse_entry_id(" 77 ").unwrap(), 77);
        assert!(matches!(parse_entry_id("abc"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_entry_id("0"), Err(AppError::BadRequest(_))));
        assert!(matches!(parse_entry_id("-3"), Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn suggestions_for_known_user() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path()).await;

        let result = service.suggestions_for("1234", 0).await.unwrap();
        let ids: Vec<_> = result.bet_legs.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["captain_3", "vc_4", "high_2", "extra_1"]);
        assert!((result.total_odds - 16.2).abs() < 1e-9);
        assert_eq!(service.latency().snapshot().samples, 1);
        assert_eq!(service.cached_gameweek(), Some(5));
    }

    #[tokio::test]
    async fn empty_roster_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path()).await;
        let err = service.suggestions_for("404", 1).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn history_shifts_quoted_odds() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path()).await;
        let before = service.suggestions_for("1234", 0).await.unwrap();

        for _ in 0..10 {
            service.record_bet("1234", placed(3)).await;
        }
        assert!((service.baseline_odds("1234") - 2.1).abs() < 1e-9);

        let after = service.suggestions_for("1234", 0).await.unwrap();
        assert_eq!(before.bet_legs.len(), after.bet_legs.len());
        for (b, a) in before.bet_legs.iter().zip(&after.bet_legs) {
            assert_eq!(a.id, b.id);
            assert!(a.odds >= b.odds, "{}: {} < {}", a.id, a.odds, b.odds);
        }
    }

    #[tokio::test]
    async fn record_bet_assigns_uuid_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path()).await;

        let rec = service.record_bet("55", placed(-1)).await;
        assert_eq!(rec.bet_id.len(), 36);
        assert!(uuid::Uuid::parse_str(&rec.bet_id).is_ok());

        let kept = service
            .record_bet(
                "55",
                BetSummary {
                    bet_id: Some("slip-1".to_string()),
                    ..placed(2)
                },
            )
            .await;
        assert_eq!(kept.bet_id, "slip-1");
        assert_eq!(service.history("55").len(), 2);

        // A second service over the same file sees both bets.
        let reopened = service_in(dir.path()).await;
        assert_eq!(reopened.history("55").len(), 2);
    }

    #[tokio::test]
    async fn breakdown_matches_quoted_legs() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path()).await;
        service.record_bet("1234", placed(2)).await;

        let quoted = service.suggestions_for("1234", 2).await.unwrap();
        let report = service.odds_breakdown("1234", 2).await.unwrap();

        assert_eq!(report.bet_count, 1);
        assert_eq!(report.recent_luck_average, Some(2.0));
        assert!((report.baseline_odds - 1.8).abs() < 1e-9);
        assert_eq!(report.legs.len(), quoted.bet_legs.len());
        for (row, leg) in report.legs.iter().zip(&quoted.bet_legs) {
            assert_eq!(row.id, leg.id);
            assert_eq!(row.odds.odds, leg.odds);
            assert_eq!(row.odds.max_odds, 8.0);
        }
    }

    #[tokio::test]
    async fn lookup_miss_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = service_in(dir.path()).await;
        assert_eq!(service.lookup_player("Alex", "Alex FC").await.unwrap(), 1234);
        assert!(matches!(
            service.lookup_player("Sam", "Sam FC").await,
            Err(AppError::NotFound(_))
        ));
    }
}
