use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::Result;
use crate::types::BetRecord;

/// user id → bet records, oldest first.
pub type HistoryMap = BTreeMap<String, Vec<BetRecord>>;

/// Whole-value persistence for user bet history. `save` always receives the
/// complete mapping.
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn load(&self) -> Result<HistoryMap>;
    async fn save(&self, history: &HistoryMap) -> Result<()>;
    /// Short label for logs and the health endpoint.
    fn describe(&self) -> String;
}

/// Pretty-printed JSON object keyed by user id. Saves are serialized so only
/// one writer touches the temp file at a time.
pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl HistoryStore for JsonFileStore {
    async fn load(&self) -> Result<HistoryMap> {
        if !tokio::fs::try_exists(&self.path).await? {
            info!("No existing user history file found at {}", self.path.display());
            return Ok(HistoryMap::new());
        }
        let raw = tokio::fs::read_to_string(&self.path).await?;
        let history: HistoryMap = serde_json::from_str(&raw)?;
        info!("Loaded user history from {}: {} users", self.path.display(), history.len());
        Ok(history)
    }

    async fn save(&self, history: &HistoryMap) -> Result<()> {
        let json = serde_json::to_string_pretty(history)?;
        let _guard = self.write_lock.lock().await;
        let tmp = self.tmp_path();
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!("Saved user history to {}: {} users", self.path.display(), history.len());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}
