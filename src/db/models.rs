//! Row type for the `bet_history` table (see migrations/).
use chrono::NaiveDateTime;

use crate::types::BetRecord;

#[derive(Debug, sqlx::FromRow)]
pub struct BetRecordRow {
    pub user_id: String,
    pub timestamp: NaiveDateTime,
    pub total_odds: f64,
    pub luck_level: i64,
    pub stake: f64,
    pub potential_win: f64,
    pub legs_count: i64,
    pub bet_id: String,
}

impl BetRecordRow {
    pub fn into_record(self) -> BetRecord {
        BetRecord {
            timestamp: self.timestamp,
            total_odds: self.total_odds,
            luck_level: self.luck_level as i32,
            stake: self.stake,
            potential_win: self.potential_win,
            legs_count: self.legs_count.max(0) as usize,
            bet_id: self.bet_id,
        }
    }
}
