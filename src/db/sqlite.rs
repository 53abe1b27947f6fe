use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::models::BetRecordRow;
use crate::db::store::{HistoryMap, HistoryStore};
use crate::error::Result;

/// History kept in SQLite. `save` rewrites the whole table in one transaction,
/// matching the whole-value contract of the JSON store.
pub struct SqliteHistoryStore {
    pool: SqlitePool,
    label: String,
}

impl SqliteHistoryStore {
    /// Open (creating if needed) the database file and apply migrations.
    pub async fn open(db_path: &str) -> Result<Self> {
        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        let store = Self::from_pool(pool, format!("sqlite:{db_path}")).await?;
        info!("History database ready at {db_path}");
        Ok(store)
    }

    pub async fn from_pool(pool: SqlitePool, label: String) -> Result<Self> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool, label })
    }
}

#[async_trait]
impl HistoryStore for SqliteHistoryStore {
    async fn load(&self) -> Result<HistoryMap> {
        let rows = sqlx::query_as::<_, BetRecordRow>(
            r#"
            SELECT user_id, timestamp, total_odds, luck_level, stake,
                   potential_win, legs_count, bet_id
            FROM bet_history
            ORDER BY user_id, seq
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut history = HistoryMap::new();
        for row in rows {
            history
                .entry(row.user_id.clone())
                .or_default()
                .push(row.into_record());
        }
        info!("Loaded user history from {}: {} users", self.label, history.len());
        Ok(history)
    }

    async fn save(&self, history: &HistoryMap) -> Result<()> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM bet_history").execute(&mut *tx).await?;

        for (user_id, records) in history {
            for (seq, r) in records.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO bet_history (
                        user_id, seq, timestamp, total_odds, luck_level, stake,
                        potential_win, legs_count, bet_id
                    ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                    "#,
                )
                .bind(user_id)
                .bind(seq as i64)
                .bind(r.timestamp)
                .bind(r.total_odds)
                .bind(i64::from(r.luck_level))
                .bind(r.stake)
                .bind(r.potential_win)
                .bind(r.legs_count as i64)
                .bind(&r.bet_id)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        debug!("Saved user history to {}: {} users", self.label, history.len());
        Ok(())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}
