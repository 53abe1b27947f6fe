//! Odds adjustment and history baseline.
//!
//! Quoted odds are a pure function of (base odds, luck level, baseline). The
//! arithmetic order below is observable in the quoted values and must not be
//! reshuffled.

use serde::Serialize;

use crate::config::odds::*;
use crate::config::BASELINE_WINDOW;
use crate::types::BetRecord;

/// Every intermediate of one odds adjustment. `odds` is the quoted value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OddsBreakdown {
    pub base_odds: f64,
    /// After the luck-level multiplier.
    pub luck_adjusted: f64,
    /// `baseline / DEFAULT_BASELINE`.
    pub history_multiplier: f64,
    pub unclamped: f64,
    pub min_odds: f64,
    pub max_odds: f64,
    pub odds: f64,
}

pub fn breakdown(base_odds: f64, luck_level: i32, baseline_odds: f64) -> OddsBreakdown {
    let luck = f64::from(luck_level);
    let luck_adjusted = if luck_level > 0 {
        base_odds * (1.0 + luck * LUCKY_STEP)
    } else if luck_level < 0 {
        base_odds * (1.0 + luck * SAFE_STEP)
    } else {
        base_odds
    };

    let history_multiplier = baseline_odds / DEFAULT_BASELINE;
    let unclamped = luck_adjusted * history_multiplier;

    let max_odds = if luck_level > 0 { MAX_ODDS_LUCKY } else { MAX_ODDS };
    let odds = MIN_ODDS.max(max_odds.min(unclamped));

    OddsBreakdown {
        base_odds,
        luck_adjusted,
        history_multiplier,
        unclamped,
        min_odds: MIN_ODDS,
        max_odds,
        odds,
    }
}

/// Final quoted odds for a leg.
pub fn adjust(base_odds: f64, luck_level: i32, baseline_odds: f64) -> f64 {
    breakdown(base_odds, luck_level, baseline_odds).odds
}

/// Mean luck level over the most recent `BASELINE_WINDOW` records.
pub fn recent_luck_average(history: &[BetRecord]) -> Option<f64> {
    if history.is_empty() {
        return None;
    }
    let recent = &history[history.len().saturating_sub(BASELINE_WINDOW)..];
    let sum: f64 = recent.iter().map(|r| f64::from(r.luck_level)).sum();
    Some(sum / recent.len() as f64)
}

/// Baseline odds for a user: short odds for newcomers, drifting with the
/// average luck level the user picked recently.
pub fn baseline_odds(history: &[BetRecord]) -> f64 {
    let Some(avg) = recent_luck_average(history) else {
        return DEFAULT_BASELINE;
    };

    let baseline = if avg > 0.0 {
        DEFAULT_BASELINE + avg * BASELINE_LUCKY_STEP
    } else if avg < 0.0 {
        DEFAULT_BASELINE + avg * BASELINE_SAFE_STEP
    } else {
        NEUTRAL_BASELINE
    };

    BASELINE_MIN.max(BASELINE_MAX.min(baseline))
}
