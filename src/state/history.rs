use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{Local, SubsecRound};
use dashmap::DashMap;
use serde::Serialize;
use tracing::{error, info, warn};

use crate::config::HISTORY_CAP;
use crate::db::store::{HistoryMap, HistoryStore};
use crate::engine::odds;
use crate::types::{BetRecord, BetSummary};

/// Per-user bet history, held in memory and written through to the store.
///
/// Writes are read-modify-write of the full mapping with no lock around the
/// store: two concurrent `record` calls each save their own snapshot and the
/// last save wins on disk.
pub struct HistoryTracker {
    /// user_id → records, oldest first, at most `HISTORY_CAP`
    records: DashMap<String, Vec<BetRecord>>,
    store: Arc<dyn HistoryStore>,
    save_failures: AtomicU64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub player_id: String,
    pub bet_count: usize,
    pub baseline_odds: f64,
    pub last_bet_at: Option<String>,
}

impl HistoryTracker {
    /// Load history from the store. An unreadable store starts empty.
    pub async fn load(store: Arc<dyn HistoryStore>) -> Arc<Self> {
        let tracker = Arc::new(Self {
            records: DashMap::new(),
            store,
            save_failures: AtomicU64::new(0),
        });
        tracker.reload().await;
        tracker
    }

    /// Replace the in-memory mapping with the store's contents.
    pub async fn reload(&self) {
        match self.store.load().await {
            Ok(history) => {
                self.records.clear();
                for (user, records) in history {
                    self.records.insert(user, records);
                }
                info!(
                    users = self.records.len(),
                    store = %self.store.describe(),
                    "User history loaded"
                );
            }
            Err(e) => {
                error!(store = %self.store.describe(), "Error loading user history: {e}");
            }
        }
    }

    pub fn history(&self, user_id: &str) -> Vec<BetRecord> {
        self.records
            .get(user_id)
            .map(|r| r.value().clone())
            .unwrap_or_default()
    }

    pub fn bet_count(&self, user_id: &str) -> usize {
        self.records.get(user_id).map(|r| r.len()).unwrap_or(0)
    }

    pub fn baseline_odds(&self, user_id: &str) -> f64 {
        match self.records.get(user_id) {
            Some(records) => odds::baseline_odds(records.value()),
            None => odds::baseline_odds(&[]),
        }
    }

    /// Append a bet, cap the user's history and persist the full mapping.
    /// A failed save is logged and counted, never returned.
    pub async fn record(&self, user_id: &str, summary: &BetSummary) -> BetRecord {
        let record = BetRecord {
            timestamp: Local::now().naive_local().trunc_subsecs(6),
            total_odds: summary.total_odds,
            luck_level: summary.luck_level,
            stake: summary.total_stake,
            potential_win: summary.potential_win,
            legs_count: summary.legs.len(),
            bet_id: summary
                .bet_id
                .clone()
                .unwrap_or_else(|| "unknown".to_string()),
        };

        let total = {
            let mut entry = self.records.entry(user_id.to_string()).or_insert_with(|| {
                info!(user_id, "Created new history for player");
                Vec::new()
            });
            entry.push(record.clone());
            if entry.len() > HISTORY_CAP {
                let excess = entry.len() - HISTORY_CAP;
                entry.drain(..excess);
            }
            entry.len()
        };

        let snapshot = self.snapshot();
        if let Err(e) = self.store.save(&snapshot).await {
            self.save_failures.fetch_add(1, Ordering::Relaxed);
            warn!(user_id, store = %self.store.describe(), "Error saving user history: {e}");
        }

        info!(
            user_id,
            bet_id = %record.bet_id,
            luck_level = record.luck_level,
            total_odds = record.total_odds,
            total_bets = total,
            "Recorded bet"
        );
        record
    }

    pub fn snapshot(&self) -> HistoryMap {
        self.records
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect()
    }

    pub fn user_count(&self) -> usize {
        self.records.len()
    }

    pub fn save_failures(&self) -> u64 {
        self.save_failures.load(Ordering::Relaxed)
    }

    pub fn store_label(&self) -> String {
        self.store.describe()
    }

    /// Per-user counts for the debug endpoint, sorted by user id.
    pub fn summaries(&self) -> Vec<UserSummary> {
        let mut out: Vec<UserSummary> = self
            .records
            .iter()
            .map(|e| UserSummary {
                player_id: e.key().clone(),
                bet_count: e.value().len(),
                baseline_odds: odds::baseline_odds(e.value()),
                last_bet_at: e.value().last().map(|r| r.timestamp.to_string()),
            })
            .collect();
        out.sort_by(|a, b| a.player_id.cmp(&b.player_id));
        out
    }
}
