//! Snapshot served by the /health endpoint.

use serde::Serialize;

use crate::service::BetService;

#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub history_store: String,
    pub history_users: usize,
    /// Saves that failed since startup. History stays in memory when this grows.
    pub history_save_failures: u64,
    /// None until the first successful gameweek resolve.
    pub current_gameweek: Option<u32>,
    pub suggestion_requests: u64,
}

impl HealthReport {
    pub fn collect(service: &BetService) -> Self {
        let history = service.history_tracker();
        let save_failures = history.save_failures();
        let gameweek = service.cached_gameweek();
        let status = if save_failures > 0 || gameweek.is_none() { "degraded" } else { "ok" };

        Self {
            status,
            history_store: history.store_label(),
            history_users: history.user_count(),
            history_save_failures: save_failures,
            current_gameweek: gameweek,
            suggestion_requests: service.latency().snapshot().samples,
        }
    }
}
