use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::interval;
use tracing::{error, info};

use crate::error::Result;
use crate::fetcher::GameweekResolver;

/// Last known current gameweek. 0 means not resolved yet.
pub struct GameweekCache {
    current: AtomicU32,
    resolver: Arc<dyn GameweekResolver>,
}

impl GameweekCache {
    pub fn new(resolver: Arc<dyn GameweekResolver>) -> Arc<Self> {
        Arc::new(Self {
            current: AtomicU32::new(0),
            resolver,
        })
    }

    pub fn cached(&self) -> Option<u32> {
        match self.current.load(Ordering::Relaxed) {
            0 => None,
            gw => Some(gw),
        }
    }

    /// Cached value, or a live resolve when nothing is cached yet.
    pub async fn current(&self) -> Result<u32> {
        if let Some(gw) = self.cached() {
            return Ok(gw);
        }
        self.refresh().await
    }

    /// Resolve from upstream and store the result.
    pub async fn refresh(&self) -> Result<u32> {
        let gw = self.resolver.current_gameweek().await?;
        let previous = self.current.swap(gw, Ordering::Relaxed);
        if previous != gw {
            info!(previous, gameweek = gw, "Current gameweek updated");
        }
        Ok(gw)
    }
}

/// Background task keeping `GameweekCache` fresh.
pub struct GameweekWatcher {
    cache: Arc<GameweekCache>,
    period: Duration,
}

impl GameweekWatcher {
    pub fn new(cache: Arc<GameweekCache>, period: Duration) -> Self {
        Self { cache, period }
    }

    pub async fn run(self) {
        let mut ticker = interval(self.period);
        loop {
            // First tick fires immediately, so the cache warms at startup.
            ticker.tick().await;
            if let Err(e) = self.cache.refresh().await {
                error!("Gameweek refresh failed: {e}");
            }
        }
    }
}
