mod api;
mod config;
mod db;
mod engine;
mod error;
mod fetcher;
mod gameweek_refresh;
mod service;
mod state;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::{Config, HistoryBackend};
use crate::db::{HistoryStore, JsonFileStore, SqliteHistoryStore};
use crate::engine::BetGenerator;
use crate::error::Result;
use crate::fetcher::FplClient;
use crate::gameweek_refresh::{GameweekCache, GameweekWatcher};
use crate::service::BetService;
use crate::state::HistoryTracker;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- History store ---
    let store: Arc<dyn HistoryStore> = match cfg.history_backend {
        HistoryBackend::Json => Arc::new(JsonFileStore::new(&cfg.history_path)),
        HistoryBackend::Sqlite => Arc::new(SqliteHistoryStore::open(&cfg.db_path).await?),
    };
    info!(backend = %cfg.history_backend, store = %store.describe(), "History store selected");
    let history = HistoryTracker::load(store).await;

    // --- FPL client ---
    let fpl = Arc::new(FplClient::new(&cfg)?);
    if cfg.player_lookup_url.is_none() {
        info!("PLAYER_LOOKUP_URL not set; /api/get_player_id/ will answer 503");
    }

    // Gameweek watcher (background, every GAMEWEEK_REFRESH_SECS)
    let gameweek = GameweekCache::new(fpl.clone());
    let watcher = GameweekWatcher::new(
        Arc::clone(&gameweek),
        Duration::from_secs(cfg.gameweek_refresh_secs.max(1)),
    );
    tokio::spawn(async move { watcher.run().await });

    let service = Arc::new(BetService::new(
        BetGenerator::default(),
        history,
        fpl.clone(),
        fpl,
        gameweek,
    ));

    // HTTP API server
    let app = router(ApiState { service });
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
